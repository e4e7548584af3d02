//! # SVM Linear (Pegasos)
//!
//! Minimiza a hinge loss regularizada por gradiente sub-estocástico:
//!
//! $$ \min_w \frac{\lambda}{2}\|w\|^2 + \frac{1}{n}\sum_i \max(0,\ 1 - y_i\, w^T x_i),
//! \qquad \lambda = \frac{1}{C n} $$
//!
//! Passo $\eta_t = 1/(\lambda t)$ seguido da projeção na bola de raio
//! $1/\sqrt{\lambda}$. O viés entra como uma feature constante. Para mais de
//! duas classes treina um modelo por classe (um-contra-todos).
//!
//! O peso é mantido como `escala · v`, o que torna o encolhimento
//! $(1 - \eta_t \lambda)$ uma operação O(1).

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::{check_fit_input, check_predict_input, Classifier};
use crate::error::{ArgMineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SvmParams {
    #[serde(alias = "C")]
    pub c: f64,
    /// Número máximo de épocas.
    pub max_iter: usize,
    /// Parada quando a variação relativa dos pesos numa época fica abaixo disso.
    pub tol: f64,
    pub random_state: Option<u64>,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            tol: 1e-4,
            random_state: None,
        }
    }
}

impl SvmParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.c > 0.0) {
            return Err(ArgMineError::param("C", "deve ser positivo"));
        }
        if self.max_iter == 0 {
            return Err(ArgMineError::param("max_iter", "deve ser positivo"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSvm {
    pub params: SvmParams,
    n_classes: usize,
    /// Uma linha por modelo binário; a última coluna é o viés.
    weights: Option<Array2<f64>>,
}

impl LinearSvm {
    pub fn new(params: SvmParams) -> Self {
        Self {
            params,
            n_classes: 0,
            weights: None,
        }
    }

    /// Pegasos para alvos `±1`. Retorna `d + 1` pesos (viés por último).
    fn pegasos(&self, x: &Array2<f64>, targets: &[f64], rng: &mut ChaCha8Rng) -> Array1<f64> {
        let (n, d) = x.dim();
        let lambda = 1.0 / (self.params.c * n as f64);
        let radius = 1.0 / lambda.sqrt();

        let mut v = Array1::<f64>::zeros(d + 1);
        let mut scale = 1.0_f64;
        let mut order: Vec<usize> = (0..n).collect();
        let mut t = 0usize;

        let margin = |v: &Array1<f64>, row: ArrayView1<f64>| -> f64 {
            row.dot(&v.slice(ndarray::s![..d])) + v[d]
        };

        for _epoch in 0..self.params.max_iter {
            let before = &v * scale;
            order.shuffle(rng);

            for &i in &order {
                t += 1;
                let eta = 1.0 / (lambda * t as f64);
                let row = x.row(i);
                let violated = targets[i] * scale * margin(&v, row) < 1.0;

                // w ← (1 - ηλ) w
                let shrink = 1.0 - eta * lambda;
                if shrink <= 0.0 {
                    v.fill(0.0);
                    scale = 1.0;
                } else {
                    scale *= shrink;
                }

                if violated {
                    let step = eta * targets[i] / scale;
                    v.slice_mut(ndarray::s![..d]).scaled_add(step, &row);
                    v[d] += step;
                }

                let w_norm = scale * v.dot(&v).sqrt();
                if w_norm > radius {
                    scale *= radius / w_norm;
                }
                if scale < 1e-9 {
                    v *= scale;
                    scale = 1.0;
                }
            }

            let after = &v * scale;
            let change = (&after - &before).mapv(f64::abs).sum();
            let size = after.mapv(f64::abs).sum().max(1e-12);
            if change / size < self.params.tol {
                break;
            }
        }
        v * scale
    }
}

impl Classifier for LinearSvm {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<()> {
        check_fit_input("LinearSvm", x, y, n_classes)?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.params.random_state.unwrap_or(0));
        let d = x.ncols();

        // Duas classes: um único modelo para a classe 1
        let positives: Vec<usize> = if n_classes == 2 {
            vec![1]
        } else {
            (0..n_classes).collect()
        };

        let mut weights = Array2::<f64>::zeros((positives.len(), d + 1));
        for (row, &class) in positives.iter().enumerate() {
            let targets: Vec<f64> = y
                .iter()
                .map(|&c| if c == class { 1.0 } else { -1.0 })
                .collect();
            weights.row_mut(row).assign(&self.pegasos(x, &targets, &mut rng));
        }

        self.n_classes = n_classes;
        self.weights = Some(weights);
        Ok(())
    }

    /// Margens `w·x + b`; no caso binário, `[-m, m]`.
    fn decision_scores(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        check_predict_input(
            "LinearSvm",
            self.weights.as_ref().map(|w| w.ncols() - 1),
            x,
        )?;
        let weights = self
            .weights
            .as_ref()
            .ok_or_else(|| ArgMineError::Fit("LinearSvm usado antes do ajuste".into()))?;
        let d = x.ncols();

        let coef = weights.slice(ndarray::s![.., ..d]);
        let bias = weights.column(d);
        let margins = x.dot(&coef.t()) + &bias;

        if self.n_classes == 2 {
            let m = margins.index_axis(Axis(1), 0);
            let mut out = Array2::<f64>::zeros((x.nrows(), 2));
            out.column_mut(0).assign(&m.mapv(|v| -v));
            out.column_mut(1).assign(&m);
            Ok(out)
        } else {
            Ok(margins)
        }
    }
}
