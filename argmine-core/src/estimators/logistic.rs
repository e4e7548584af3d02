//! # Regressão Logística
//!
//! Modelo log-linear treinado por gradiente descendente em lote completo,
//! minimizando a log-loss média com penalidade L2:
//!
//! $$ J(W) = \frac{1}{n} \sum_i \ell(x_i, y_i; W) + \frac{1}{2 C n} \|W\|^2 $$
//!
//! Três modos:
//! - **Binário**: um vetor de pesos com sigmoide (duas classes).
//! - **OvR**: um classificador binário por classe.
//! - **Multinomial**: softmax sobre `K` vetores de pesos.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::{check_fit_input, check_predict_input, sigmoid, softmax_rows, Classifier};
use crate::error::{ArgMineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiClass {
    /// Binário para duas classes, multinomial acima disso.
    #[default]
    Auto,
    Ovr,
    Multinomial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogisticRegressionParams {
    /// Inverso da força de regularização.
    #[serde(alias = "C")]
    pub c: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
    /// Critério de parada: maior componente do gradiente.
    pub tol: f64,
    pub fit_intercept: bool,
    pub multi_class: MultiClass,
    /// Aceito por compatibilidade; o treinamento é determinístico.
    pub random_state: Option<u64>,
}

impl Default for LogisticRegressionParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            learning_rate: 0.1,
            tol: 1e-4,
            fit_intercept: true,
            multi_class: MultiClass::Auto,
            random_state: None,
        }
    }
}

impl LogisticRegressionParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.c > 0.0) {
            return Err(ArgMineError::param("C", "deve ser positivo"));
        }
        if !(self.learning_rate > 0.0) {
            return Err(ArgMineError::param("learning_rate", "deve ser positivo"));
        }
        if self.max_iter == 0 {
            return Err(ArgMineError::param("max_iter", "deve ser positivo"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Mode {
    Binary,
    Ovr,
    Multinomial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub params: LogisticRegressionParams,
    mode: Option<Mode>,
    n_classes: usize,
    /// Uma linha por vetor de pesos (`1 × d` no modo binário).
    weights: Option<Array2<f64>>,
    intercepts: Option<Array1<f64>>,
}

impl LogisticRegression {
    pub fn new(params: LogisticRegressionParams) -> Self {
        Self {
            params,
            mode: None,
            n_classes: 0,
            weights: None,
            intercepts: None,
        }
    }

    /// Gradiente descendente sobre `targets` (`n × k`).
    ///
    /// `softmax` escolhe entre probabilidades multinomiais e sigmoides
    /// independentes por coluna.
    fn descend(&self, x: &Array2<f64>, targets: &Array2<f64>, softmax: bool) -> (Array2<f64>, Array1<f64>) {
        let (n, d) = x.dim();
        let k = targets.ncols();
        let n_f = n as f64;
        let lambda = 1.0 / (self.params.c * n_f);
        let lr = self.params.learning_rate;

        let mut w = Array2::<f64>::zeros((k, d));
        let mut b = Array1::<f64>::zeros(k);

        for _ in 0..self.params.max_iter {
            let mut probs = x.dot(&w.t()) + &b;
            if softmax {
                softmax_rows(&mut probs);
            } else {
                probs.mapv_inplace(sigmoid);
            }
            let error = probs - targets;

            let grad_w = error.t().dot(x) / n_f + &w * lambda;
            let grad_b = error.sum_axis(Axis(0)) / n_f;

            let mut max_grad = grad_w.iter().fold(0.0_f64, |m, g| m.max(g.abs()));
            if self.params.fit_intercept {
                max_grad = grad_b.iter().fold(max_grad, |m, g| m.max(g.abs()));
            }

            w.scaled_add(-lr, &grad_w);
            if self.params.fit_intercept {
                b.scaled_add(-lr, &grad_b);
            }
            if max_grad < self.params.tol {
                break;
            }
        }
        (w, b)
    }
}

fn one_hot(y: &[usize], n_classes: usize) -> Array2<f64> {
    let mut out = Array2::<f64>::zeros((y.len(), n_classes));
    for (i, &c) in y.iter().enumerate() {
        out[[i, c]] = 1.0;
    }
    out
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<()> {
        check_fit_input("LogisticRegression", x, y, n_classes)?;

        let mode = match self.params.multi_class {
            MultiClass::Auto if n_classes == 2 => Mode::Binary,
            MultiClass::Auto | MultiClass::Multinomial => Mode::Multinomial,
            MultiClass::Ovr if n_classes == 2 => Mode::Binary,
            MultiClass::Ovr => Mode::Ovr,
        };

        let (w, b) = match mode {
            Mode::Binary => {
                let targets = Array2::from_shape_fn((y.len(), 1), |(i, _)| {
                    if y[i] == 1 {
                        1.0
                    } else {
                        0.0
                    }
                });
                self.descend(x, &targets, false)
            }
            Mode::Ovr => self.descend(x, &one_hot(y, n_classes), false),
            Mode::Multinomial => self.descend(x, &one_hot(y, n_classes), true),
        };

        self.mode = Some(mode);
        self.n_classes = n_classes;
        self.weights = Some(w);
        self.intercepts = Some(b);
        Ok(())
    }

    /// Probabilidades por classe (no modo OvR, sigmoides não normalizadas).
    fn decision_scores(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        check_predict_input(
            "LogisticRegression",
            self.weights.as_ref().map(|w| w.ncols()),
            x,
        )?;
        let (mode, w, b) = match (self.mode, &self.weights, &self.intercepts) {
            (Some(mode), Some(w), Some(b)) => (mode, w, b),
            _ => {
                return Err(ArgMineError::Fit(
                    "LogisticRegression usado antes do ajuste".into(),
                ))
            }
        };

        let mut z = x.dot(&w.t()) + b;
        match mode {
            Mode::Binary => {
                let mut out = Array2::<f64>::zeros((x.nrows(), self.n_classes));
                for (i, &zi) in z.column(0).iter().enumerate() {
                    let p = sigmoid(zi);
                    out[[i, 0]] = 1.0 - p;
                    out[[i, 1]] = p;
                }
                Ok(out)
            }
            Mode::Ovr => {
                z.mapv_inplace(sigmoid);
                Ok(z)
            }
            Mode::Multinomial => {
                softmax_rows(&mut z);
                Ok(z)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::testing::{three_blobs, two_blobs};

    fn params(max_iter: usize, learning_rate: f64) -> LogisticRegressionParams {
        LogisticRegressionParams {
            c: 10.0,
            max_iter,
            learning_rate,
            ..Default::default()
        }
    }

    #[test]
    fn test_binary_separable() {
        let (x, y) = two_blobs();
        let mut lr = LogisticRegression::new(params(500, 0.5));
        lr.fit(&x, &y, 2).unwrap();
        assert_eq!(lr.predict(&x).unwrap(), y);

        let scores = lr.decision_scores(&x).unwrap();
        for row in scores.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_multinomial_three_classes() {
        let (x, y) = three_blobs();
        let mut lr = LogisticRegression::new(LogisticRegressionParams {
            multi_class: MultiClass::Multinomial,
            ..params(500, 0.5)
        });
        lr.fit(&x, &y, 3).unwrap();
        assert_eq!(lr.predict(&x).unwrap(), y);
        assert_eq!(lr.mode, Some(Mode::Multinomial));
    }

    #[test]
    fn test_ovr_three_classes() {
        let (x, y) = three_blobs();
        let mut lr = LogisticRegression::new(LogisticRegressionParams {
            multi_class: MultiClass::Ovr,
            ..params(800, 0.5)
        });
        lr.fit(&x, &y, 3).unwrap();
        assert_eq!(lr.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let (x, _) = two_blobs();
        let lr = LogisticRegression::new(LogisticRegressionParams::default());
        assert!(lr.predict(&x).is_err());
    }

    #[test]
    fn test_invalid_c() {
        let p = LogisticRegressionParams {
            c: 0.0,
            ..Default::default()
        };
        assert!(matches!(p.validate(), Err(ArgMineError::InvalidParam { .. })));
    }
}
