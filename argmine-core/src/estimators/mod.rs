//! # Classificadores
//!
//! Quatro famílias de classificadores clássicos, todas implementando
//! [`Classifier`]:
//!
//! | Variante              | Modelo                                             |
//! |-----------------------|----------------------------------------------------|
//! | `naive_bayes` (`nb`)  | Naive Bayes multinomial com suavização de Laplace  |
//! | `logistic_regression` (`lr`) | regressão logística (sigmoide, OvR ou softmax) |
//! | `svm`                 | SVM linear (Pegasos, um-contra-todos)              |
//! | `gradient_boosting` (`gb`) | boosting de árvores de regressão (log-loss)   |
//!
//! Cada variante tem sua própria struct de parâmetros. Os parâmetros chegam
//! como um objeto JSON e são resolvidos uma única vez em
//! [`Estimator::from_params`]; chaves desconhecidas são rejeitadas.

pub mod boosting;
pub mod logistic;
pub mod naive_bayes;
pub mod svm;
pub mod tree;

use std::fmt;

use ndarray::{Array2, Axis};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ArgMineError, Result};

pub use boosting::{GradientBoosting, GradientBoostingParams};
pub use logistic::{LogisticRegression, LogisticRegressionParams, MultiClass};
pub use naive_bayes::{NaiveBayes, NaiveBayesParams};
pub use svm::{LinearSvm, SvmParams};

/// Classificador treinável sobre uma matriz densa.
pub trait Classifier {
    /// Ajusta o modelo. Os rótulos são códigos em `0..n_classes`.
    fn fit(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<()>;

    /// Escores por classe (`n × n_classes`); maior escore = classe predita.
    fn decision_scores(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        Ok(argmax_rows(&self.decision_scores(x)?))
    }
}

/// Família do classificador, escolhida na configuração do pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    #[default]
    #[serde(alias = "nb")]
    NaiveBayes,
    #[serde(alias = "lr")]
    LogisticRegression,
    #[serde(alias = "support_vector_machine")]
    Svm,
    #[serde(alias = "gb")]
    GradientBoosting,
}

impl ClassifierKind {
    pub fn name(&self) -> &'static str {
        match self {
            ClassifierKind::NaiveBayes => "naive_bayes",
            ClassifierKind::LogisticRegression => "logistic_regression",
            ClassifierKind::Svm => "svm",
            ClassifierKind::GradientBoosting => "gradient_boosting",
        }
    }

    /// Nome curto usado em nomes de arquivo.
    pub fn short_name(&self) -> &'static str {
        match self {
            ClassifierKind::NaiveBayes => "nb",
            ClassifierKind::LogisticRegression => "lr",
            ClassifierKind::Svm => "svm",
            ClassifierKind::GradientBoosting => "gb",
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classificador com parâmetros resolvidos e, após o ajuste, seu estado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum Estimator {
    NaiveBayes(NaiveBayes),
    LogisticRegression(LogisticRegression),
    Svm(LinearSvm),
    GradientBoosting(GradientBoosting),
}

impl Estimator {
    /// Resolve os parâmetros da família `kind`.
    ///
    /// O Naive Bayes ignora `random_state`. A regressão logística passa a
    /// multinomial quando há mais de duas classes.
    pub fn from_params(kind: ClassifierKind, params: &Map<String, Value>, n_classes: usize) -> Result<Self> {
        let estimator = match kind {
            ClassifierKind::NaiveBayes => {
                let mut params = params.clone();
                params.remove("random_state");
                let params: NaiveBayesParams = parse_params(kind, params)?;
                params.validate()?;
                Estimator::NaiveBayes(NaiveBayes::new(params))
            }
            ClassifierKind::LogisticRegression => {
                let mut params: LogisticRegressionParams = parse_params(kind, params.clone())?;
                params.validate()?;
                if n_classes > 2 {
                    params.multi_class = MultiClass::Multinomial;
                }
                Estimator::LogisticRegression(LogisticRegression::new(params))
            }
            ClassifierKind::Svm => {
                let params: SvmParams = parse_params(kind, params.clone())?;
                params.validate()?;
                Estimator::Svm(LinearSvm::new(params))
            }
            ClassifierKind::GradientBoosting => {
                let params: GradientBoostingParams = parse_params(kind, params.clone())?;
                params.validate()?;
                Estimator::GradientBoosting(GradientBoosting::new(params))
            }
        };
        Ok(estimator)
    }

    pub fn kind(&self) -> ClassifierKind {
        match self {
            Estimator::NaiveBayes(_) => ClassifierKind::NaiveBayes,
            Estimator::LogisticRegression(_) => ClassifierKind::LogisticRegression,
            Estimator::Svm(_) => ClassifierKind::Svm,
            Estimator::GradientBoosting(_) => ClassifierKind::GradientBoosting,
        }
    }

    /// Parâmetros efetivos, como objeto JSON.
    pub fn params_json(&self) -> Value {
        let value = match self {
            Estimator::NaiveBayes(m) => serde_json::to_value(&m.params),
            Estimator::LogisticRegression(m) => serde_json::to_value(&m.params),
            Estimator::Svm(m) => serde_json::to_value(&m.params),
            Estimator::GradientBoosting(m) => serde_json::to_value(&m.params),
        };
        value.unwrap_or(Value::Null)
    }

    fn as_classifier(&self) -> &dyn Classifier {
        match self {
            Estimator::NaiveBayes(m) => m,
            Estimator::LogisticRegression(m) => m,
            Estimator::Svm(m) => m,
            Estimator::GradientBoosting(m) => m,
        }
    }

    fn as_classifier_mut(&mut self) -> &mut dyn Classifier {
        match self {
            Estimator::NaiveBayes(m) => m,
            Estimator::LogisticRegression(m) => m,
            Estimator::Svm(m) => m,
            Estimator::GradientBoosting(m) => m,
        }
    }
}

impl Classifier for Estimator {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<()> {
        self.as_classifier_mut().fit(x, y, n_classes)
    }

    fn decision_scores(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.as_classifier().decision_scores(x)
    }
}

fn parse_params<P: DeserializeOwned>(kind: ClassifierKind, params: Map<String, Value>) -> Result<P> {
    serde_json::from_value(Value::Object(params))
        .map_err(|e| ArgMineError::param(kind.name(), e.to_string()))
}

/// Índice do maior valor de cada linha; empate fica com o menor índice.
pub fn argmax_rows(scores: &Array2<f64>) -> Vec<usize> {
    scores
        .axis_iter(Axis(0))
        .map(|row| {
            let mut best = 0;
            for (j, &v) in row.iter().enumerate() {
                if v > row[best] {
                    best = j;
                }
            }
            best
        })
        .collect()
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Softmax numericamente estável, linha a linha, no próprio array.
pub(crate) fn softmax_rows(scores: &mut Array2<f64>) {
    for mut row in scores.axis_iter_mut(Axis(0)) {
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        if sum > 0.0 {
            row.mapv_inplace(|v| v / sum);
        }
    }
}

/// Validação comum da entrada de `fit`.
pub(crate) fn check_fit_input(name: &str, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<()> {
    if x.nrows() == 0 {
        return Err(ArgMineError::Fit(format!("{name}: conjunto de treino vazio")));
    }
    if x.nrows() != y.len() {
        return Err(ArgMineError::Fit(format!(
            "{name}: {} linhas para {} rótulos",
            x.nrows(),
            y.len()
        )));
    }
    if n_classes < 2 {
        return Err(ArgMineError::Fit(format!(
            "{name}: são necessárias ao menos 2 classes"
        )));
    }
    if let Some(&bad) = y.iter().find(|&&c| c >= n_classes) {
        return Err(ArgMineError::Fit(format!(
            "{name}: rótulo {bad} fora de 0..{n_classes}"
        )));
    }
    Ok(())
}

pub(crate) fn check_predict_input(name: &str, expected: Option<usize>, x: &Array2<f64>) -> Result<()> {
    match expected {
        None => Err(ArgMineError::Fit(format!("{name} usado antes do ajuste"))),
        Some(d) if d != x.ncols() => Err(ArgMineError::Fit(format!(
            "{name}: esperado {d} colunas, recebido {}",
            x.ncols()
        ))),
        Some(_) => Ok(()),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_kind_aliases() {
        let kind: ClassifierKind = serde_json::from_str("\"nb\"").unwrap();
        assert_eq!(kind, ClassifierKind::NaiveBayes);
        let kind: ClassifierKind = serde_json::from_str("\"gradient_boosting\"").unwrap();
        assert_eq!(kind, ClassifierKind::GradientBoosting);
    }

    #[test]
    fn test_naive_bayes_drops_random_state() {
        let estimator = Estimator::from_params(
            ClassifierKind::NaiveBayes,
            &params(json!({"alpha": 0.5, "random_state": 42})),
            2,
        )
        .unwrap();
        assert_eq!(estimator.params_json()["alpha"], json!(0.5));
        assert!(estimator.params_json().get("random_state").is_none());
    }

    #[test]
    fn test_unknown_param_rejected() {
        let err = Estimator::from_params(
            ClassifierKind::Svm,
            &params(json!({"kernel": "rbf"})),
            2,
        )
        .unwrap_err();
        assert!(matches!(err, ArgMineError::InvalidParam { .. }));
    }

    #[test]
    fn test_logistic_multinomial_for_many_classes() {
        let estimator =
            Estimator::from_params(ClassifierKind::LogisticRegression, &Map::new(), 3).unwrap();
        match estimator {
            Estimator::LogisticRegression(m) => {
                assert_eq!(m.params.multi_class, MultiClass::Multinomial)
            }
            other => panic!("variante inesperada: {other:?}"),
        }
    }

    #[test]
    fn test_argmax_first_wins_ties() {
        let scores = array![[0.5, 0.5], [0.1, 0.9], [2.0, -1.0]];
        assert_eq!(argmax_rows(&scores), vec![0, 1, 0]);
    }

    #[test]
    fn test_estimator_serde_tag() {
        let estimator =
            Estimator::from_params(ClassifierKind::GradientBoosting, &Map::new(), 2).unwrap();
        let value = serde_json::to_value(&estimator).unwrap();
        assert_eq!(value["algorithm"], json!("gradient_boosting"));
        let back: Estimator = serde_json::from_value(value).unwrap();
        assert_eq!(back.kind(), ClassifierKind::GradientBoosting);
    }
}
