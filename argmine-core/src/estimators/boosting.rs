//! # Gradient Boosting (log-loss)
//!
//! Boosting de Friedman com árvores de regressão rasas:
//!
//! - **Binário**: $F_0 = \log\frac{p}{1-p}$; a cada rodada uma árvore é
//!   ajustada a $r_i = y_i - \sigma(F_i)$ e cada folha recebe o passo de Newton
//!   $\gamma = \sum r_i / \sum p_i(1-p_i)$.
//! - **Multiclasse**: $F_{k,0} = \log \pi_k$; `K` árvores por rodada, uma por
//!   classe, com $\gamma = \frac{K-1}{K} \sum r_{ik} / \sum |r_{ik}|(1-|r_{ik}|)$.
//!
//! Com `subsample < 1` cada rodada usa uma amostra sem reposição das linhas
//! (boosting estocástico), sorteada com semente.

use ndarray::{Array1, Array2, Axis};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::tree::{RegressionTree, TreeParams};
use super::{check_fit_input, check_predict_input, sigmoid, softmax_rows, Classifier};
use crate::error::{ArgMineError, Result};

const PROB_EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GradientBoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Fração das linhas usada em cada rodada.
    pub subsample: f64,
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
            subsample: 1.0,
            random_state: None,
        }
    }
}

impl GradientBoostingParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ArgMineError::param("n_estimators", "deve ser positivo"));
        }
        if !(self.learning_rate > 0.0) {
            return Err(ArgMineError::param("learning_rate", "deve ser positivo"));
        }
        if self.max_depth == 0 {
            return Err(ArgMineError::param("max_depth", "deve ser positivo"));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(ArgMineError::param("subsample", "deve estar em (0, 1]"));
        }
        Ok(())
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub params: GradientBoostingParams,
    n_classes: usize,
    n_features: Option<usize>,
    /// Escore inicial por saída (1 no caso binário, `K` no multiclasse).
    init: Vec<f64>,
    /// Árvores por rodada: `stages[m][k]`.
    stages: Vec<Vec<RegressionTree>>,
}

impl GradientBoosting {
    pub fn new(params: GradientBoostingParams) -> Self {
        Self {
            params,
            n_classes: 0,
            n_features: None,
            init: Vec::new(),
            stages: Vec::new(),
        }
    }

    pub fn n_stages(&self) -> usize {
        self.stages.len()
    }

    fn round_rows(&self, n: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
        if self.params.subsample >= 1.0 {
            return (0..n).collect();
        }
        let size = ((self.params.subsample * n as f64).round() as usize).clamp(1, n);
        let mut rows = sample(rng, n, size).into_vec();
        rows.sort_unstable();
        rows
    }

    /// Escores brutos `F` (`n × saídas`).
    fn raw_scores(&self, x: &Array2<f64>) -> Array2<f64> {
        let outputs = self.init.len();
        let mut f = Array2::<f64>::zeros((x.nrows(), outputs));
        for (k, &init) in self.init.iter().enumerate() {
            f.column_mut(k).fill(init);
        }
        let lr = self.params.learning_rate;
        for (i, row) in x.axis_iter(Axis(0)).enumerate() {
            for stage in &self.stages {
                for (k, tree) in stage.iter().enumerate() {
                    f[[i, k]] += lr * tree.predict_row(row);
                }
            }
        }
        f
    }

    fn fit_binary(&mut self, x: &Array2<f64>, y: &[usize], rng: &mut ChaCha8Rng) {
        let n = y.len();
        let target: Vec<f64> = y.iter().map(|&c| if c == 1 { 1.0 } else { 0.0 }).collect();
        let p = (target.iter().sum::<f64>() / n as f64).clamp(PROB_EPS, 1.0 - PROB_EPS);
        let init = (p / (1.0 - p)).ln();

        let mut f = Array1::<f64>::from_elem(n, init);
        let tree_params = self.params.tree_params();
        let lr = self.params.learning_rate;

        for _ in 0..self.params.n_estimators {
            let probs: Vec<f64> = f.iter().map(|&v| sigmoid(v)).collect();
            let residuals: Vec<f64> = target.iter().zip(&probs).map(|(t, p)| t - p).collect();
            let rows = self.round_rows(n, rng);

            let tree = RegressionTree::fit(x, &residuals, &rows, &tree_params, |leaf| {
                let num: f64 = leaf.iter().map(|&i| residuals[i]).sum();
                let den: f64 = leaf.iter().map(|&i| probs[i] * (1.0 - probs[i])).sum();
                if den.abs() < PROB_EPS {
                    0.0
                } else {
                    num / den
                }
            });
            for (i, row) in x.axis_iter(Axis(0)).enumerate() {
                f[i] += lr * tree.predict_row(row);
            }
            self.stages.push(vec![tree]);
        }
        self.init = vec![init];
    }

    fn fit_multiclass(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize, rng: &mut ChaCha8Rng) {
        let n = y.len();
        let k_f = n_classes as f64;
        let mut counts = vec![0usize; n_classes];
        for &c in y {
            counts[c] += 1;
        }
        let init: Vec<f64> = counts
            .iter()
            .map(|&c| (c as f64 / n as f64).max(PROB_EPS).ln())
            .collect();

        let mut f = Array2::<f64>::zeros((n, n_classes));
        for (k, &v) in init.iter().enumerate() {
            f.column_mut(k).fill(v);
        }
        let tree_params = self.params.tree_params();
        let lr = self.params.learning_rate;

        for _ in 0..self.params.n_estimators {
            let mut probs = f.clone();
            softmax_rows(&mut probs);
            let rows = self.round_rows(n, rng);

            let mut stage = Vec::with_capacity(n_classes);
            for k in 0..n_classes {
                let residuals: Vec<f64> = (0..n)
                    .map(|i| f64::from(u8::from(y[i] == k)) - probs[[i, k]])
                    .collect();
                let tree = RegressionTree::fit(x, &residuals, &rows, &tree_params, |leaf| {
                    let num: f64 = leaf.iter().map(|&i| residuals[i]).sum();
                    let den: f64 = leaf
                        .iter()
                        .map(|&i| residuals[i].abs() * (1.0 - residuals[i].abs()))
                        .sum();
                    if den.abs() < PROB_EPS {
                        0.0
                    } else {
                        (k_f - 1.0) / k_f * num / den
                    }
                });
                for (i, row) in x.axis_iter(Axis(0)).enumerate() {
                    f[[i, k]] += lr * tree.predict_row(row);
                }
                stage.push(tree);
            }
            self.stages.push(stage);
        }
        self.init = init;
    }
}

impl Classifier for GradientBoosting {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<()> {
        check_fit_input("GradientBoosting", x, y, n_classes)?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.params.random_state.unwrap_or(0));

        self.stages.clear();
        if n_classes == 2 {
            self.fit_binary(x, y, &mut rng);
        } else {
            self.fit_multiclass(x, y, n_classes, &mut rng);
        }
        self.n_classes = n_classes;
        self.n_features = Some(x.ncols());
        Ok(())
    }

    /// Probabilidades por classe.
    fn decision_scores(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        check_predict_input("GradientBoosting", self.n_features, x)?;
        let raw = self.raw_scores(x);

        if self.n_classes == 2 {
            let mut out = Array2::<f64>::zeros((x.nrows(), 2));
            for (i, &v) in raw.column(0).iter().enumerate() {
                let p = sigmoid(v);
                out[[i, 0]] = 1.0 - p;
                out[[i, 1]] = p;
            }
            Ok(out)
        } else {
            let mut probs = raw;
            softmax_rows(&mut probs);
            Ok(probs)
        }
    }
}
