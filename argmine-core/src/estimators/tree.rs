//! # Árvore de Regressão
//!
//! Árvore binária de profundidade limitada ajustada aos resíduos do boosting.
//! O critério de divisão é a redução do erro quadrático:
//!
//! $$ \text{ganho} = \frac{S_L^2}{n_L} + \frac{S_R^2}{n_R} - \frac{S^2}{n} $$
//!
//! A busca da melhor divisão avalia as features em paralelo (rayon); o valor
//! de cada folha é calculado por uma função fornecida pelo chamador (passo
//! de Newton no boosting).

use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Ajusta a árvore às `residuals` das linhas `rows` de `x`.
    pub fn fit<F>(x: &Array2<f64>, residuals: &[f64], rows: &[usize], params: &TreeParams, leaf_value: F) -> Self
    where
        F: Fn(&[usize]) -> f64,
    {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, residuals, rows.to_vec(), 0, params, &leaf_value);
        tree
    }

    fn grow<F>(
        &mut self,
        x: &Array2<f64>,
        residuals: &[f64],
        rows: Vec<usize>,
        depth: usize,
        params: &TreeParams,
        leaf_value: &F,
    ) -> usize
    where
        F: Fn(&[usize]) -> f64,
    {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: leaf_value(&rows),
        });

        if depth >= params.max_depth || rows.len() < params.min_samples_split.max(2) {
            return id;
        }
        let Some(best) = best_split(x, residuals, &rows, params.min_samples_leaf.max(1)) else {
            return id;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&i| x[[i, best.feature]] <= best.threshold);

        let left = self.grow(x, residuals, left_rows, depth + 1, params, leaf_value);
        let right = self.grow(x, residuals, right_rows, depth + 1, params, leaf_value);
        self.nodes[id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        id
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }
}

/// Melhor divisão entre todas as features; empates ficam com a menor feature.
fn best_split(x: &Array2<f64>, residuals: &[f64], rows: &[usize], min_leaf: usize) -> Option<Candidate> {
    let n = rows.len();
    let total: f64 = rows.iter().map(|&i| residuals[i]).sum();
    let parent = total * total / n as f64;

    let per_feature: Vec<Option<Candidate>> = (0..x.ncols())
        .into_par_iter()
        .map(|feature| {
            let mut sorted: Vec<(f64, f64)> = rows
                .iter()
                .map(|&i| (x[[i, feature]], residuals[i]))
                .collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut best: Option<Candidate> = None;
            let mut left_sum = 0.0;
            for k in 0..n - 1 {
                left_sum += sorted[k].1;
                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                if sorted[k].0 == sorted[k + 1].0 {
                    continue;
                }
                let right_sum = total - left_sum;
                let gain = left_sum * left_sum / n_left as f64
                    + right_sum * right_sum / n_right as f64
                    - parent;
                if gain > 1e-12 && best.map_or(true, |b| gain > b.gain) {
                    best = Some(Candidate {
                        feature,
                        threshold: (sorted[k].0 + sorted[k + 1].0) / 2.0,
                        gain,
                    });
                }
            }
            best
        })
        .collect();

    per_feature
        .into_iter()
        .flatten()
        .fold(None, |acc: Option<Candidate>, c| match acc {
            Some(a) if a.gain >= c.gain => Some(a),
            _ => Some(c),
        })
}
