//! # Treinamento e Avaliação
//!
//! - [`train_direct`]: ajusta o pipeline com os hiperparâmetros fixos.
//! - [`train_tuned`]: busca em grade + reajuste do melhor candidato sobre
//!   todo o conjunto de treino.
//! - [`evaluate`]: métricas no conjunto de teste e análise de erros.
//! - [`cross_validate`]: predições validadas por k-fold sobre o treino.
//!
//! ## Análise de erros
//!
//! | Tarefa      | Estrutura              | Conteúdo                                        |
//! |-------------|------------------------|-------------------------------------------------|
//! | Binária     | [`MislabeledIndex`]    | tipo 1 (predito 1, real 0), tipo 2 (predito 0, real 1) |
//! | Multiclasse | [`ConfusionBreakdown`] | `(real, predito)` fora da diagonal → registros  |
//!
//! Os índices são os das linhas originais do dataset. A análise é refeita
//! a cada chamada e não é persistida.

use std::collections::{BTreeMap, BTreeSet};

use ndarray::{Array2, Axis};
use serde_json::{Map, Value};

use crate::error::{ArgMineError, Result};
use crate::estimators::argmax_rows;
use crate::labels::TaskType;
use crate::metrics::Metrics;
use crate::observe::RunLog;
use crate::pipeline::{FittedPipeline, ModelPipeline};
use crate::search::{grid_search, CvSummary, ParamGrid, Scoring};
use crate::split::stratified_kfold;

/// Ajusta `pipeline` sem busca de hiperparâmetros.
pub fn train_direct(pipeline: &ModelPipeline, x: &Array2<f64>, y: &[usize]) -> Result<FittedPipeline> {
    pipeline.fit(x, y)
}

/// Modelo vencedor da busca em grade.
#[derive(Debug, Clone)]
pub struct TunedModel {
    pub fitted: FittedPipeline,
    pub best_params: Map<String, Value>,
    pub cv: CvSummary,
}

/// Busca em grade e reajuste do melhor candidato.
#[allow(clippy::too_many_arguments)]
pub fn train_tuned(
    pipeline: &ModelPipeline,
    x: &Array2<f64>,
    y: &[usize],
    grid: &ParamGrid,
    cv_folds: usize,
    scoring: Scoring,
    n_jobs: usize,
    seed: u64,
    log: &RunLog,
) -> Result<TunedModel> {
    let cv = grid_search(pipeline, x, y, grid, cv_folds, scoring, n_jobs, seed, log)?;
    let best_params = cv.best().params.clone();
    let fitted = pipeline.with_params(&best_params)?.fit(x, y)?;
    Ok(TunedModel {
        fitted,
        best_params,
        cv,
    })
}

/// Falsos positivos (tipo 1) e falsos negativos (tipo 2) de uma avaliação binária.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MislabeledIndex {
    pub type1: BTreeSet<usize>,
    pub type2: BTreeSet<usize>,
}

impl MislabeledIndex {
    pub fn build(y_true: &[usize], y_pred: &[usize], record_ids: &[usize]) -> Self {
        let mut index = Self::default();
        for ((&actual, &predicted), &id) in y_true.iter().zip(y_pred).zip(record_ids) {
            match (actual, predicted) {
                (0, 1) => {
                    index.type1.insert(id);
                }
                (1, 0) => {
                    index.type2.insert(id);
                }
                _ => {}
            }
        }
        index
    }
}

/// Confusões fora da diagonal: `(real, predito)` → registros.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfusionBreakdown {
    pub pairs: BTreeMap<(usize, usize), Vec<usize>>,
}

impl ConfusionBreakdown {
    pub fn build(y_true: &[usize], y_pred: &[usize], record_ids: &[usize]) -> Self {
        let mut pairs: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();
        for ((&actual, &predicted), &id) in y_true.iter().zip(y_pred).zip(record_ids) {
            if actual != predicted {
                pairs.entry((actual, predicted)).or_default().push(id);
            }
        }
        Self { pairs }
    }

    pub fn total(&self) -> usize {
        self.pairs.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorAnalysis {
    Binary(MislabeledIndex),
    MultiClass(ConfusionBreakdown),
}

/// Resultado de [`evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub metrics: Metrics,
    pub predictions: Vec<usize>,
    pub errors: ErrorAnalysis,
}

/// Avalia `fitted` no conjunto de teste.
///
/// `record_ids` traz o índice original de cada linha de `x_test`.
pub fn evaluate(
    fitted: &FittedPipeline,
    x_test: &Array2<f64>,
    y_test: &[usize],
    record_ids: &[usize],
    task: TaskType,
    class_names: &[String],
) -> Result<Evaluation> {
    if x_test.nrows() != y_test.len() || y_test.len() != record_ids.len() {
        return Err(ArgMineError::InvalidDataset(format!(
            "avaliação com {} linhas, {} rótulos e {} índices",
            x_test.nrows(),
            y_test.len(),
            record_ids.len()
        )));
    }
    let scores = fitted.decision_scores(x_test)?;
    let predictions = argmax_rows(&scores);

    let binary = task.is_binary() && class_names.len() == 2;
    let metrics = Metrics::compute(y_test, &predictions, &scores, binary, class_names);
    let errors = if class_names.len() == 2 {
        ErrorAnalysis::Binary(MislabeledIndex::build(y_test, &predictions, record_ids))
    } else {
        ErrorAnalysis::MultiClass(ConfusionBreakdown::build(y_test, &predictions, record_ids))
    };

    Ok(Evaluation {
        metrics,
        predictions,
        errors,
    })
}

/// Predições de validação cruzada: cada linha é predita pelo modelo que
/// não a viu no treino.
pub fn cross_validate(pipeline: &ModelPipeline, x: &Array2<f64>, y: &[usize], folds: usize, seed: u64) -> Result<Vec<usize>> {
    let mut predictions = vec![0usize; y.len()];
    for (train, valid) in stratified_kfold(y, folds, seed)? {
        let x_train = x.select(Axis(0), &train);
        let y_train: Vec<usize> = train.iter().map(|&i| y[i]).collect();
        let fitted = pipeline.fit(&x_train, &y_train)?;
        let predicted = fitted.predict(&x.select(Axis(0), &valid))?;
        for (&i, p) in valid.iter().zip(predicted) {
            predictions[i] = p;
        }
    }
    Ok(predictions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::ClassifierKind;
    use crate::labels::LabelDict;
    use crate::pipeline::{build, PipelineConfig};
    use crate::search::testing::indicator_data;
    use serde_json::json;

    fn names(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    fn nb_pipeline() -> ModelPipeline {
        let config = PipelineConfig {
            classifier: ClassifierKind::NaiveBayes,
            ..Default::default()
        };
        build(&config, &Map::new(), &LabelDict::new(["no", "yes"])).unwrap()
    }

    #[test]
    fn test_mislabeled_index_disjoint() {
        let y_true = [0, 1, 0, 1, 1, 0, 0];
        let y_pred = [1, 0, 0, 1, 0, 1, 0];
        let ids = [10, 11, 12, 13, 14, 15, 16];
        let index = MislabeledIndex::build(&y_true, &y_pred, &ids);
        assert_eq!(index.type1, BTreeSet::from([10, 15]));
        assert_eq!(index.type2, BTreeSet::from([11, 14]));
        assert!(index.type1.is_disjoint(&index.type2));
    }

    #[test]
    fn test_confusion_breakdown() {
        let y_true = [0, 1, 2, 2, 1];
        let y_pred = [0, 2, 1, 1, 1];
        let ids = [3, 4, 5, 6, 7];
        let breakdown = ConfusionBreakdown::build(&y_true, &y_pred, &ids);
        assert_eq!(breakdown.pairs[&(1, 2)], vec![4]);
        assert_eq!(breakdown.pairs[&(2, 1)], vec![5, 6]);
        assert_eq!(breakdown.total(), 3);
    }

    #[test]
    fn test_direct_train_and_evaluate() {
        let (x, y) = indicator_data();
        let fitted = train_direct(&nb_pipeline(), &x, &y).unwrap();
        let ids: Vec<usize> = (100..112).collect();
        let eval = evaluate(&fitted, &x, &y, &ids, TaskType::Detection, &names(&["no", "yes"])).unwrap();
        assert_eq!(eval.predictions, y);
        assert_eq!(eval.metrics.accuracy, 1.0);
        assert_eq!(eval.metrics.roc_auc, 1.0);
        assert_eq!(eval.errors, ErrorAnalysis::Binary(MislabeledIndex::default()));
    }

    #[test]
    fn test_roc_auc_with_documents_of_different_length() {
        // colunas: marcador positivo, marcador negativo, 8 neutras equilibradas
        let x = ndarray::array![
            [1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
            [1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0],
            [0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0],
        ];
        let y = vec![1, 1, 1, 0, 0, 0];
        let fitted = train_direct(&nb_pipeline(), &x, &y).unwrap();

        // positivo longo e negativo curto
        let x_test = ndarray::array![
            [1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
            [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ];
        let y_test = [1, 0];
        let scores = fitted.decision_scores(&x_test).unwrap();
        assert!(scores[[0, 1]] < scores[[1, 1]]);

        let eval = evaluate(&fitted, &x_test, &y_test, &[0, 1], TaskType::Detection, &names(&["no", "yes"])).unwrap();
        assert_eq!(eval.predictions, vec![1, 0]);
        assert_eq!(eval.metrics.roc_auc, 1.0);
        assert_eq!(
            Scoring::RocAuc.score(&y_test, &eval.predictions, &scores, 2),
            1.0
        );
    }

    #[test]
    fn test_evaluate_length_mismatch() {
        let (x, y) = indicator_data();
        let fitted = train_direct(&nb_pipeline(), &x, &y).unwrap();
        let result = evaluate(&fitted, &x, &y, &[1, 2], TaskType::Detection, &names(&["no", "yes"]));
        assert!(matches!(result, Err(ArgMineError::InvalidDataset(_))));
    }

    #[test]
    fn test_tuned_refits_best() {
        let (x, y) = indicator_data();
        let mut grid = ParamGrid::new();
        grid.insert("alpha", vec![json!(0.5), json!(2.0)]);
        let tuned = train_tuned(
            &nb_pipeline(),
            &x,
            &y,
            &grid,
            3,
            Scoring::F1Weighted,
            0,
            1,
            &RunLog::detached(),
        )
        .unwrap();
        assert_eq!(tuned.best_params["alpha"], json!(0.5));
        assert_eq!(tuned.fitted.effective_params()["classifier"]["alpha"], json!(0.5));
        assert_eq!(tuned.fitted.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_cross_validate_predicts_every_row() {
        let (x, y) = indicator_data();
        let predictions = cross_validate(&nb_pipeline(), &x, &y, 3, 5).unwrap();
        assert_eq!(predictions, y);
    }
}
