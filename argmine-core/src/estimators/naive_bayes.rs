//! # Naive Bayes Multinomial
//!
//! $$ \log P(c \mid x) \propto \log P(c) + \sum_j x_j \log \theta_{cj},
//! \qquad \theta_{cj} = \frac{N_{cj} + \alpha}{N_c + \alpha d} $$
//!
//! Exige entrada não negativa; no pipeline ele sempre vem depois de um
//! `Binarizer`.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::{check_fit_input, check_predict_input, Classifier};
use crate::error::{ArgMineError, Result};

/// Log-prior atribuído a classes sem exemplos de treino (finito para o JSON).
const ABSENT_CLASS_LOG_PRIOR: f64 = -1e300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NaiveBayesParams {
    /// Suavização aditiva.
    pub alpha: f64,
    /// Usa as frequências de classe como prior; senão prior uniforme.
    pub fit_prior: bool,
}

impl Default for NaiveBayesParams {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            fit_prior: true,
        }
    }
}

impl NaiveBayesParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha >= 0.0) {
            return Err(ArgMineError::param("alpha", "deve ser não negativo"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaiveBayes {
    pub params: NaiveBayesParams,
    class_log_prior: Option<Array1<f64>>,
    /// `n_classes × d`
    feature_log_prob: Option<Array2<f64>>,
}

impl NaiveBayes {
    pub fn new(params: NaiveBayesParams) -> Self {
        Self {
            params,
            class_log_prior: None,
            feature_log_prob: None,
        }
    }
}

impl Classifier for NaiveBayes {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<()> {
        check_fit_input("NaiveBayes", x, y, n_classes)?;
        if x.iter().any(|&v| v < 0.0) {
            return Err(ArgMineError::Fit(
                "NaiveBayes: entrada com valores negativos".into(),
            ));
        }

        let d = x.ncols();
        let mut counts = Array2::<f64>::zeros((n_classes, d));
        let mut class_count = vec![0usize; n_classes];
        for (row, &class) in x.axis_iter(Axis(0)).zip(y) {
            counts.row_mut(class).scaled_add(1.0, &row);
            class_count[class] += 1;
        }

        let alpha = self.params.alpha.max(1e-10);
        let mut log_prob = Array2::<f64>::zeros((n_classes, d));
        for c in 0..n_classes {
            let total = counts.row(c).sum() + alpha * d as f64;
            for j in 0..d {
                log_prob[[c, j]] = ((counts[[c, j]] + alpha) / total).ln();
            }
        }

        let n = y.len() as f64;
        let prior = Array1::from_shape_fn(n_classes, |c| {
            if !self.params.fit_prior {
                -(n_classes as f64).ln()
            } else if class_count[c] == 0 {
                ABSENT_CLASS_LOG_PRIOR
            } else {
                (class_count[c] as f64 / n).ln()
            }
        });

        self.class_log_prior = Some(prior);
        self.feature_log_prob = Some(log_prob);
        Ok(())
    }

    /// Log-verossimilhança conjunta por classe.
    fn decision_scores(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        check_predict_input(
            "NaiveBayes",
            self.feature_log_prob.as_ref().map(|p| p.ncols()),
            x,
        )?;
        let (prior, log_prob) = match (&self.class_log_prior, &self.feature_log_prob) {
            (Some(prior), Some(log_prob)) => (prior, log_prob),
            _ => return Err(ArgMineError::Fit("NaiveBayes usado antes do ajuste".into())),
        };
        Ok(x.dot(&log_prob.t()) + prior)
    }
}
