//! # Construtor do Pipeline de Modelo
//!
//! Um pipeline é uma sequência ordenada de estágios nomeados que termina em
//! um classificador:
//!
//! ```text
//! [scaler?] → [reducer?] → [binarizer?] → classifier
//! ```
//!
//! | Estágio      | Origem                                             |
//! |--------------|----------------------------------------------------|
//! | `scaler`     | `scaling`: `min_max` ou `standard`                  |
//! | `reducer`    | `reduction`: `pca`, `truncated_svd` ou `lda`        |
//! | `binarizer`  | inserido automaticamente antes do Naive Bayes       |
//! | `classifier` | `classifier` + hiperparâmetros                      |
//!
//! ## Roteamento de hiperparâmetros
//!
//! Chaves simples e chaves `classifier__*` vão para o classificador;
//! `reducer__n_components` substitui o tamanho do redutor. Qualquer outro
//! prefixo `<estágio>__` é rejeitado. A busca em grade usa o mesmo
//! roteamento via [`ModelPipeline::with_params`].

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{ArgMineError, Result};
use crate::estimators::{Classifier, ClassifierKind, Estimator};
use crate::labels::LabelDict;
use crate::preprocess::{Binarizer, Lda, MinMaxScaler, Pca, StandardScaler, Transformer, TruncatedSvd};

/// Tamanho padrão de PCA/SVD quando nada é configurado.
pub const DEFAULT_COMPONENTS: usize = 2;

const CLASSIFIER_PREFIX: &str = "classifier__";
const REDUCER_COMPONENTS: &str = "reducer__n_components";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scaling {
    #[default]
    None,
    #[serde(alias = "normalize", alias = "minmax")]
    MinMax,
    #[serde(alias = "standardize")]
    Standard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    #[default]
    None,
    Pca,
    #[serde(alias = "svd")]
    TruncatedSvd,
    Lda,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub scaling: Scaling,
    pub reduction: Reduction,
    pub n_components: Option<usize>,
    pub classifier: ClassifierKind,
}

/// Estágio de transformação do pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    MinMaxScaler(MinMaxScaler),
    StandardScaler(StandardScaler),
    Pca(Pca),
    TruncatedSvd(TruncatedSvd),
    Lda(Lda),
    Binarizer(Binarizer),
}

impl Stage {
    /// Nome do papel do estágio no pipeline.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::MinMaxScaler(_) | Stage::StandardScaler(_) => "scaler",
            Stage::Pca(_) | Stage::TruncatedSvd(_) | Stage::Lda(_) => "reducer",
            Stage::Binarizer(_) => "binarizer",
        }
    }

    fn n_components(&self) -> Option<usize> {
        match self {
            Stage::Pca(p) => Some(p.n_components),
            Stage::TruncatedSvd(s) => Some(s.n_components),
            Stage::Lda(l) => l.n_components,
            _ => None,
        }
    }
}

impl Transformer for Stage {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<()> {
        match self {
            Stage::MinMaxScaler(s) => s.fit(x, y),
            Stage::StandardScaler(s) => s.fit(x, y),
            Stage::Pca(s) => s.fit(x, y),
            Stage::TruncatedSvd(s) => s.fit(x, y),
            Stage::Lda(s) => s.fit(x, y),
            Stage::Binarizer(s) => s.fit(x, y),
        }
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        match self {
            Stage::MinMaxScaler(s) => s.transform(x),
            Stage::StandardScaler(s) => s.transform(x),
            Stage::Pca(s) => s.transform(x),
            Stage::TruncatedSvd(s) => s.transform(x),
            Stage::Lda(s) => s.transform(x),
            Stage::Binarizer(s) => s.transform(x),
        }
    }
}

/// Pipeline montado e ainda não ajustado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPipeline {
    config: PipelineConfig,
    /// Hiperparâmetros como recebidos, antes do roteamento.
    params: Map<String, Value>,
    n_classes: usize,
    stages: Vec<Stage>,
    estimator: Estimator,
}

/// Monta o pipeline descrito por `config` para as classes de `labels`.
pub fn build(config: &PipelineConfig, params: &Map<String, Value>, labels: &LabelDict) -> Result<ModelPipeline> {
    assemble(config, params.clone(), labels.len())
}

struct Routed {
    estimator: Map<String, Value>,
    n_components: Option<usize>,
}

fn route(params: &Map<String, Value>) -> Result<Routed> {
    let mut estimator = Map::new();
    let mut n_components = None;
    for (key, value) in params {
        if key == REDUCER_COMPONENTS {
            let n = value
                .as_u64()
                .filter(|&n| n > 0)
                .ok_or_else(|| ArgMineError::param(key.as_str(), "esperado inteiro positivo"))?;
            n_components = Some(n as usize);
        } else if let Some(name) = key.strip_prefix(CLASSIFIER_PREFIX) {
            estimator.insert(name.to_string(), value.clone());
        } else if key.contains("__") {
            return Err(ArgMineError::param(key.as_str(), "estágio desconhecido"));
        } else {
            estimator.insert(key.clone(), value.clone());
        }
    }
    Ok(Routed {
        estimator,
        n_components,
    })
}

fn assemble(config: &PipelineConfig, params: Map<String, Value>, n_classes: usize) -> Result<ModelPipeline> {
    if n_classes < 2 {
        return Err(ArgMineError::InvalidDataset(format!(
            "são necessárias ao menos 2 classes, encontrada(s) {n_classes}"
        )));
    }
    let routed = route(&params)?;
    let seed = routed
        .estimator
        .get("random_state")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let mut stages = Vec::new();
    match config.scaling {
        Scaling::None => {}
        Scaling::MinMax => stages.push(Stage::MinMaxScaler(MinMaxScaler::default())),
        Scaling::Standard => stages.push(Stage::StandardScaler(StandardScaler::default())),
    }

    let n_components = routed.n_components.or(config.n_components);
    if n_components == Some(0) {
        return Err(ArgMineError::param("n_components", "deve ser maior que zero"));
    }
    match config.reduction {
        Reduction::None => {
            if routed.n_components.is_some() {
                return Err(ArgMineError::param(REDUCER_COMPONENTS, "pipeline sem redutor"));
            }
        }
        Reduction::Pca => stages.push(Stage::Pca(Pca::new(
            n_components.unwrap_or(DEFAULT_COMPONENTS),
            seed,
        ))),
        Reduction::TruncatedSvd => stages.push(Stage::TruncatedSvd(TruncatedSvd::new(
            n_components.unwrap_or(DEFAULT_COMPONENTS),
            seed,
        ))),
        Reduction::Lda => {
            let cap = n_classes - 1;
            let k = n_components.map_or(cap, |n| n.min(cap));
            stages.push(Stage::Lda(Lda::new(Some(k))));
        }
    }

    if config.classifier == ClassifierKind::NaiveBayes {
        stages.push(Stage::Binarizer(Binarizer::default()));
    }

    let estimator = Estimator::from_params(config.classifier, &routed.estimator, n_classes)?;
    Ok(ModelPipeline {
        config: config.clone(),
        params,
        n_classes,
        stages,
        estimator,
    })
}

impl ModelPipeline {
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    /// Nomes dos estágios na ordem de execução, terminando em `classifier`.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages
            .iter()
            .map(Stage::name)
            .chain(std::iter::once("classifier"))
            .collect()
    }

    /// Novo pipeline com `overrides` sobrepostos aos hiperparâmetros atuais.
    pub fn with_params(&self, overrides: &Map<String, Value>) -> Result<Self> {
        let mut params = self.params.clone();
        for (key, value) in overrides {
            params.insert(key.clone(), value.clone());
        }
        assemble(&self.config, params, self.n_classes)
    }

    /// Hiperparâmetros efetivos: os do classificador e o tamanho do redutor.
    pub fn effective_params(&self) -> Value {
        let reducer = self.stages.iter().find_map(Stage::n_components);
        json!({
            "classifier": self.estimator.params_json(),
            "n_components": reducer,
        })
    }

    /// Ajusta cada estágio na ordem e, por fim, o classificador.
    pub fn fit(&self, x: &Array2<f64>, y: &[usize]) -> Result<FittedPipeline> {
        let mut pipeline = self.clone();
        let mut data = x.clone();
        for stage in &mut pipeline.stages {
            data = stage.fit_transform(&data, y)?;
        }
        pipeline.estimator.fit(&data, y, pipeline.n_classes)?;
        Ok(FittedPipeline { pipeline })
    }
}

/// Pipeline ajustado, pronto para predição e persistência.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FittedPipeline {
    pipeline: ModelPipeline,
}

impl FittedPipeline {
    pub fn config(&self) -> &PipelineConfig {
        &self.pipeline.config
    }

    pub fn n_classes(&self) -> usize {
        self.pipeline.n_classes
    }

    pub fn algorithm(&self) -> ClassifierKind {
        self.pipeline.estimator.kind()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.pipeline.stage_names()
    }

    pub fn effective_params(&self) -> Value {
        self.pipeline.effective_params()
    }

    /// Aplica os estágios de transformação, sem o classificador.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let mut data = x.clone();
        for stage in &self.pipeline.stages {
            data = stage.transform(&data)?;
        }
        Ok(data)
    }

    pub fn decision_scores(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.pipeline.estimator.decision_scores(&self.transform(x)?)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        self.pipeline.estimator.predict(&self.transform(x)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::testing::{three_blobs, two_blobs};

    fn binary() -> LabelDict {
        LabelDict::new(["no", "yes"])
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_naive_bayes_gets_binarizer_last() {
        let config = PipelineConfig {
            scaling: Scaling::MinMax,
            reduction: Reduction::Pca,
            n_components: Some(5),
            classifier: ClassifierKind::NaiveBayes,
        };
        let pipeline = build(&config, &params(json!({"random_state": 7})), &binary()).unwrap();
        assert_eq!(
            pipeline.stage_names(),
            vec!["scaler", "reducer", "binarizer", "classifier"]
        );
        assert!(pipeline.estimator().params_json().get("random_state").is_none());
    }

    #[test]
    fn test_plain_pipeline_is_only_classifier() {
        let config = PipelineConfig {
            classifier: ClassifierKind::Svm,
            ..Default::default()
        };
        let pipeline = build(&config, &Map::new(), &binary()).unwrap();
        assert_eq!(pipeline.stage_names(), vec!["classifier"]);
    }

    #[test]
    fn test_lda_capped_by_classes() {
        let config = PipelineConfig {
            reduction: Reduction::Lda,
            n_components: Some(10),
            classifier: ClassifierKind::LogisticRegression,
            ..Default::default()
        };
        let labels = LabelDict::new(["claim", "premise", "none"]);
        let pipeline = build(&config, &Map::new(), &labels).unwrap();
        assert_eq!(pipeline.effective_params()["n_components"], json!(2));
    }

    #[test]
    fn test_parameter_routing() {
        let config = PipelineConfig {
            reduction: Reduction::Pca,
            classifier: ClassifierKind::LogisticRegression,
            ..Default::default()
        };
        let pipeline = build(
            &config,
            &params(json!({"classifier__C": 3.0, "max_iter": 50, "reducer__n_components": 4})),
            &binary(),
        )
        .unwrap();
        let effective = pipeline.effective_params();
        assert_eq!(effective["classifier"]["c"], json!(3.0));
        assert_eq!(effective["classifier"]["max_iter"], json!(50));
        assert_eq!(effective["n_components"], json!(4));
    }

    #[test]
    fn test_unknown_stage_prefix_rejected() {
        let err = build(
            &PipelineConfig::default(),
            &params(json!({"scaler__with_mean": false})),
            &binary(),
        )
        .unwrap_err();
        assert!(matches!(err, ArgMineError::InvalidParam { .. }));
    }

    #[test]
    fn test_reducer_param_without_reducer() {
        let err = build(
            &PipelineConfig::default(),
            &params(json!({"reducer__n_components": 3})),
            &binary(),
        )
        .unwrap_err();
        assert!(matches!(err, ArgMineError::InvalidParam { .. }));
    }

    #[test]
    fn test_single_class_rejected() {
        let labels = LabelDict::new(["claim"]);
        assert!(build(&PipelineConfig::default(), &Map::new(), &labels).is_err());
    }

    #[test]
    fn test_with_params_overrides() {
        let config = PipelineConfig {
            classifier: ClassifierKind::NaiveBayes,
            ..Default::default()
        };
        let base = build(&config, &params(json!({"alpha": 1.0})), &binary()).unwrap();
        let tuned = base.with_params(&params(json!({"classifier__alpha": 0.1}))).unwrap();
        assert_eq!(tuned.effective_params()["classifier"]["alpha"], json!(0.1));
        assert_eq!(base.effective_params()["classifier"]["alpha"], json!(1.0));
    }

    #[test]
    fn test_fit_predict_and_persist() {
        let (x, y) = two_blobs();
        let config = PipelineConfig {
            scaling: Scaling::Standard,
            classifier: ClassifierKind::LogisticRegression,
            ..Default::default()
        };
        let pipeline = build(&config, &params(json!({"max_iter": 300})), &binary()).unwrap();
        let fitted = pipeline.fit(&x, &y).unwrap();
        assert_eq!(fitted.predict(&x).unwrap(), y);

        let text = serde_json::to_string(&fitted).unwrap();
        let back: FittedPipeline = serde_json::from_str(&text).unwrap();
        assert_eq!(back.predict(&x).unwrap(), y);
        assert_eq!(back.stage_names(), vec!["scaler", "classifier"]);
    }

    #[test]
    fn test_lda_pipeline_multiclass() {
        let (x, y) = three_blobs();
        let config = PipelineConfig {
            reduction: Reduction::Lda,
            classifier: ClassifierKind::GradientBoosting,
            ..Default::default()
        };
        let labels = LabelDict::new(["a", "b", "c"]);
        let pipeline = build(&config, &params(json!({"n_estimators": 10})), &labels).unwrap();
        let fitted = pipeline.fit(&x, &y).unwrap();
        assert_eq!(fitted.transform(&x).unwrap().ncols(), 2);
        assert_eq!(fitted.predict(&x).unwrap(), y);
    }
}
