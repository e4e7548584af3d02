//! # Busca em Grade com Validação Cruzada
//!
//! Avalia exaustivamente o produto cartesiano de uma [`ParamGrid`]:
//!
//! 1. cada combinação vira um pipeline via [`ModelPipeline::with_params`];
//! 2. o pipeline é ajustado e pontuado em cada dobra de um k-fold estratificado;
//! 3. o candidato vencedor é o de maior média (empate: o primeiro na ordem da grade).
//!
//! As combinações são avaliadas em paralelo num pool rayon de `n_jobs`
//! threads (0 = padrão do rayon). O pool é criado e descartado dentro da
//! chamada; o resultado não depende do número de threads.

use std::collections::BTreeMap;
use std::fmt;

use ndarray::{Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ArgMineError, Result};
use crate::labels::TaskType;
use crate::metrics::{accuracy, positive_margin, precision_recall_f1, roc_auc, Average};
use crate::observe::RunLog;
use crate::pipeline::ModelPipeline;
use crate::split::stratified_kfold;

/// Espaço de hiperparâmetros: nome → valores candidatos.
///
/// As chaves seguem o roteamento do pipeline (`alpha`, `classifier__C`,
/// `reducer__n_components`, ...) e são percorridas em ordem alfabética.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamGrid {
    params: BTreeMap<String, Vec<Value>>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<Value>) {
        self.params.insert(name.into(), values);
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Número de combinações.
    pub fn n_candidates(&self) -> usize {
        if self.params.is_empty() {
            0
        } else {
            self.params.values().map(Vec::len).product()
        }
    }

    /// Todas as combinações; a última chave varia mais rápido.
    pub fn candidates(&self) -> Result<Vec<Map<String, Value>>> {
        if self.params.is_empty() || self.params.values().any(Vec::is_empty) {
            return Err(ArgMineError::EmptyParamGrid);
        }
        let mut combos = vec![Map::new()];
        for (name, values) in &self.params {
            combos = combos
                .into_iter()
                .flat_map(|combo| {
                    values.iter().map(move |value| {
                        let mut next = combo.clone();
                        next.insert(name.clone(), value.clone());
                        next
                    })
                })
                .collect();
        }
        Ok(combos)
    }
}

/// Métrica usada para comparar candidatos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    Accuracy,
    F1,
    F1Micro,
    F1Macro,
    F1Weighted,
    Precision,
    Recall,
    RocAuc,
}

impl Scoring {
    /// F1 ponderado na detecção, F1 micro nas demais tarefas.
    pub fn default_for(task: TaskType) -> Self {
        if task.is_binary() {
            Scoring::F1Weighted
        } else {
            Scoring::F1Micro
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scoring::Accuracy => "accuracy",
            Scoring::F1 => "f1",
            Scoring::F1Micro => "f1_micro",
            Scoring::F1Macro => "f1_macro",
            Scoring::F1Weighted => "f1_weighted",
            Scoring::Precision => "precision",
            Scoring::Recall => "recall",
            Scoring::RocAuc => "roc_auc",
        }
    }

    fn requires_binary(&self) -> bool {
        matches!(
            self,
            Scoring::F1 | Scoring::Precision | Scoring::Recall | Scoring::RocAuc
        )
    }

    pub fn score(&self, y_true: &[usize], y_pred: &[usize], scores: &Array2<f64>, n_classes: usize) -> f64 {
        match self {
            Scoring::Accuracy => accuracy(y_true, y_pred),
            Scoring::F1 => precision_recall_f1(y_true, y_pred, n_classes, Average::Binary).2,
            Scoring::F1Micro => precision_recall_f1(y_true, y_pred, n_classes, Average::Micro).2,
            Scoring::F1Macro => precision_recall_f1(y_true, y_pred, n_classes, Average::Macro).2,
            Scoring::F1Weighted => precision_recall_f1(y_true, y_pred, n_classes, Average::Weighted).2,
            Scoring::Precision => precision_recall_f1(y_true, y_pred, n_classes, Average::Binary).0,
            Scoring::Recall => precision_recall_f1(y_true, y_pred, n_classes, Average::Binary).1,
            Scoring::RocAuc => roc_auc(y_true, &positive_margin(scores)),
        }
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resultado de um candidato da grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: Map<String, Value>,
    pub fold_scores: Vec<f64>,
    pub mean: f64,
    pub std: f64,
}

/// Resumo da validação cruzada.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvSummary {
    pub scoring: Scoring,
    pub folds: usize,
    pub candidates: Vec<CandidateScore>,
    pub best_index: usize,
}

impl CvSummary {
    pub fn best(&self) -> &CandidateScore {
        &self.candidates[self.best_index]
    }
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn score_candidate(
    base: &ModelPipeline,
    params: Map<String, Value>,
    x: &Array2<f64>,
    y: &[usize],
    folds: &[(Vec<usize>, Vec<usize>)],
    scoring: Scoring,
) -> Result<CandidateScore> {
    let pipeline = base.with_params(&params)?;
    let n_classes = pipeline.n_classes();

    let mut fold_scores = Vec::with_capacity(folds.len());
    for (train, valid) in folds {
        let x_train = x.select(Axis(0), train);
        let y_train: Vec<usize> = train.iter().map(|&i| y[i]).collect();
        let x_valid = x.select(Axis(0), valid);
        let y_valid: Vec<usize> = valid.iter().map(|&i| y[i]).collect();

        let fitted = pipeline.fit(&x_train, &y_train)?;
        let scores = fitted.decision_scores(&x_valid)?;
        let predicted = crate::estimators::argmax_rows(&scores);
        fold_scores.push(scoring.score(&y_valid, &predicted, &scores, n_classes));
    }

    let (mean, std) = mean_std(&fold_scores);
    Ok(CandidateScore {
        params,
        fold_scores,
        mean,
        std,
    })
}

/// Pontua todas as combinações de `grid` por validação cruzada.
#[allow(clippy::too_many_arguments)]
pub fn grid_search(
    pipeline: &ModelPipeline,
    x: &Array2<f64>,
    y: &[usize],
    grid: &ParamGrid,
    cv_folds: usize,
    scoring: Scoring,
    n_jobs: usize,
    seed: u64,
    log: &RunLog,
) -> Result<CvSummary> {
    let candidates = grid.candidates()?;
    if scoring.requires_binary() && pipeline.n_classes() != 2 {
        return Err(ArgMineError::param(
            "scoring",
            format!("{scoring} exige tarefa binária"),
        ));
    }
    let folds = stratified_kfold(y, cv_folds, seed)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_jobs)
        .build()
        .map_err(|e| ArgMineError::Fit(format!("pool de threads: {e}")))?;

    let total = candidates.len();
    tracing::info!(parent: log.span(), candidates = total, folds = cv_folds, %scoring, n_jobs, "iniciando busca em grade");

    let scored: Vec<CandidateScore> = pool.install(|| {
        candidates
            .into_par_iter()
            .enumerate()
            .map(|(i, params)| {
                let candidate = score_candidate(pipeline, params, x, y, &folds, scoring)?;
                tracing::debug!(
                    parent: log.span(),
                    candidate = i + 1,
                    total,
                    mean = candidate.mean,
                    std = candidate.std,
                    params = %serde_json::Value::Object(candidate.params.clone()),
                    "candidato avaliado"
                );
                Ok(candidate)
            })
            .collect::<Result<Vec<_>>>()
    })?;

    // Maior média; empate fica com o primeiro da grade
    let best_index = scored
        .iter()
        .enumerate()
        .fold(0, |best, (i, c)| if c.mean > scored[best].mean { i } else { best });

    tracing::info!(
        parent: log.span(),
        best_score = scored[best_index].mean,
        best_params = %serde_json::Value::Object(scored[best_index].params.clone()),
        "busca em grade concluída"
    );

    Ok(CvSummary {
        scoring,
        folds: cv_folds,
        candidates: scored,
        best_index,
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use ndarray::Array2;

    /// Contagens esparsas: a feature 0 marca a classe 0, a feature 1 marca a
    /// classe 1 e a feature 2 é ruído.
    pub fn indicator_data() -> (Array2<f64>, Vec<usize>) {
        let n = 12;
        let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            0 => f64::from(u8::from(i % 2 == 0)),
            1 => f64::from(u8::from(i % 2 == 1)),
            _ => f64::from(u8::from(i % 3 == 0)),
        });
        let y = (0..n).map(|i| i % 2).collect();
        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::indicator_data;
    use super::*;
    use crate::estimators::ClassifierKind;
    use crate::labels::LabelDict;
    use crate::pipeline::{build, PipelineConfig};
    use serde_json::json;

    fn nb_pipeline() -> ModelPipeline {
        let config = PipelineConfig {
            classifier: ClassifierKind::NaiveBayes,
            ..Default::default()
        };
        build(&config, &Map::new(), &LabelDict::new(["no", "yes"])).unwrap()
    }

    fn alpha_grid() -> ParamGrid {
        let mut grid = ParamGrid::new();
        grid.insert("alpha", vec![json!(0.1), json!(1.0)]);
        grid
    }

    #[test]
    fn test_candidates_cartesian_sorted() {
        let mut grid = ParamGrid::new();
        grid.insert("max_iter", vec![json!(10), json!(20)]);
        grid.insert("classifier__C", vec![json!(0.5), json!(1.0), json!(2.0)]);
        assert_eq!(grid.n_candidates(), 6);

        let combos = grid.candidates().unwrap();
        assert_eq!(combos.len(), 6);
        assert_eq!(combos[0]["classifier__C"], json!(0.5));
        assert_eq!(combos[0]["max_iter"], json!(10));
        assert_eq!(combos[1]["max_iter"], json!(20));
        let keys: Vec<&String> = combos[0].keys().collect();
        assert_eq!(keys, vec!["classifier__C", "max_iter"]);
    }

    #[test]
    fn test_empty_grid() {
        assert!(matches!(
            ParamGrid::new().candidates(),
            Err(ArgMineError::EmptyParamGrid)
        ));
        let mut grid = ParamGrid::new();
        grid.insert("alpha", vec![]);
        assert!(matches!(grid.candidates(), Err(ArgMineError::EmptyParamGrid)));
    }

    #[test]
    fn test_grid_search_ties_keep_first() {
        let (x, y) = indicator_data();
        let summary = grid_search(
            &nb_pipeline(),
            &x,
            &y,
            &alpha_grid(),
            3,
            Scoring::Accuracy,
            1,
            42,
            &RunLog::detached(),
        )
        .unwrap();
        assert_eq!(summary.candidates.len(), 2);
        assert_eq!(summary.candidates[0].fold_scores.len(), 3);
        assert_eq!(summary.candidates[0].mean, 1.0);
        assert_eq!(summary.candidates[0].std, 0.0);
        assert_eq!(summary.best_index, 0);
        assert_eq!(summary.best().params["alpha"], json!(0.1));
    }

    #[test]
    fn test_thread_count_does_not_change_result() {
        let (x, y) = indicator_data();
        let run = |n_jobs| {
            grid_search(
                &nb_pipeline(),
                &x,
                &y,
                &alpha_grid(),
                3,
                Scoring::F1Weighted,
                n_jobs,
                7,
                &RunLog::detached(),
            )
            .unwrap()
        };
        assert_eq!(run(1), run(2));
    }

    #[test]
    fn test_invalid_param_propagates() {
        let (x, y) = indicator_data();
        let mut grid = ParamGrid::new();
        grid.insert("alpha", vec![json!(-1.0)]);
        let result = grid_search(
            &nb_pipeline(),
            &x,
            &y,
            &grid,
            3,
            Scoring::Accuracy,
            1,
            0,
            &RunLog::detached(),
        );
        assert!(matches!(result, Err(ArgMineError::InvalidParam { .. })));
    }

    #[test]
    fn test_default_scoring() {
        assert_eq!(Scoring::default_for(TaskType::Detection), Scoring::F1Weighted);
        assert_eq!(Scoring::default_for(TaskType::Relation), Scoring::F1Micro);
        let s: Scoring = serde_json::from_str("\"f1_weighted\"").unwrap();
        assert_eq!(s, Scoring::F1Weighted);
    }
}
