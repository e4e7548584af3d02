//! # Métricas de Classificação
//!
//! | Métrica    | Definição                                            |
//! |------------|------------------------------------------------------|
//! | Acurácia   | $\frac{\#\{\hat y_i = y_i\}}{n}$                     |
//! | Precisão   | $\frac{TP}{TP + FP}$                                 |
//! | Revocação  | $\frac{TP}{TP + FN}$                                 |
//! | F1         | $\frac{2PR}{P + R}$                                  |
//! | ROC-AUC    | estatística de Mann–Whitney sobre os escores         |
//!
//! Divisões por zero resultam em `0.0`. As médias seguem [`Average`]:
//! `Binary` olha só a classe positiva (código 1), `Micro` soma os contadores
//! de todas as classes, `Macro` e `Weighted` combinam as métricas por classe
//! (sem peso e com peso pelo suporte).

use std::fmt::Write as _;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Average {
    Binary,
    Micro,
    Macro,
    Weighted,
}

/// Matriz `real × predito`.
pub fn confusion_matrix(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Vec<Vec<usize>> {
    let mut matrix = vec![vec![0usize; n_classes]; n_classes];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if t < n_classes && p < n_classes {
            matrix[t][p] += 1;
        }
    }
    matrix
}

pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let hits = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    hits as f64 / y_true.len() as f64
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

fn f1_of(precision: f64, recall: f64) -> f64 {
    ratio(2.0 * precision * recall, precision + recall)
}

/// Contadores e métricas de uma classe.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ClassStats {
    tp: usize,
    fp: usize,
    fn_: usize,
    support: usize,
}

impl ClassStats {
    fn precision(&self) -> f64 {
        ratio(self.tp as f64, (self.tp + self.fp) as f64)
    }

    fn recall(&self) -> f64 {
        ratio(self.tp as f64, (self.tp + self.fn_) as f64)
    }

    fn f1(&self) -> f64 {
        f1_of(self.precision(), self.recall())
    }
}

fn class_stats(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Vec<ClassStats> {
    let matrix = confusion_matrix(y_true, y_pred, n_classes);
    (0..n_classes)
        .map(|c| {
            let tp = matrix[c][c];
            let support: usize = matrix[c].iter().sum();
            let predicted: usize = matrix.iter().map(|row| row[c]).sum();
            ClassStats {
                tp,
                fp: predicted - tp,
                fn_: support - tp,
                support,
            }
        })
        .collect()
}

/// `(precisão, revocação, f1)` com a média escolhida.
pub fn precision_recall_f1(y_true: &[usize], y_pred: &[usize], n_classes: usize, average: Average) -> (f64, f64, f64) {
    let stats = class_stats(y_true, y_pred, n_classes);
    match average {
        Average::Binary => {
            let Some(pos) = stats.get(1) else {
                return (0.0, 0.0, 0.0);
            };
            (pos.precision(), pos.recall(), pos.f1())
        }
        Average::Micro => {
            let tp: usize = stats.iter().map(|s| s.tp).sum();
            let fp: usize = stats.iter().map(|s| s.fp).sum();
            let fn_: usize = stats.iter().map(|s| s.fn_).sum();
            let p = ratio(tp as f64, (tp + fp) as f64);
            let r = ratio(tp as f64, (tp + fn_) as f64);
            (p, r, f1_of(p, r))
        }
        Average::Macro | Average::Weighted => {
            // Só entram classes presentes no real ou no predito
            let present: Vec<&ClassStats> = stats
                .iter()
                .filter(|s| s.support > 0 || s.tp + s.fp > 0)
                .collect();
            let weights: Vec<f64> = if average == Average::Macro {
                vec![1.0; present.len()]
            } else {
                present.iter().map(|s| s.support as f64).collect()
            };
            let total: f64 = weights.iter().sum();
            let mean = |f: fn(&ClassStats) -> f64| -> f64 {
                ratio(
                    present.iter().zip(&weights).map(|(s, w)| f(s) * w).sum(),
                    total,
                )
            };
            (
                mean(ClassStats::precision),
                mean(ClassStats::recall),
                mean(ClassStats::f1),
            )
        }
    }
}

/// ROC-AUC binária pela estatística U de Mann–Whitney, com postos médios
/// nos empates:
///
/// $$ AUC = \frac{R_+ - n_+(n_+ + 1)/2}{n_+ n_-} $$
///
/// Retorna `0.0` quando só uma classe está presente.
pub fn roc_auc(y_true: &[usize], scores: &[f64]) -> f64 {
    let n_pos = y_true.iter().filter(|&&c| c == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.0;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // postos 1-based de start+1 a end
        let rank = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }

    let rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|&(&c, _)| c == 1)
        .map(|(_, r)| r)
        .sum();
    let n_pos_f = n_pos as f64;
    (rank_sum - n_pos_f * (n_pos_f + 1.0) / 2.0) / (n_pos_f * n_neg as f64)
}

/// Escore da classe positiva por linha, como margem `s₁ − s₀`.
///
/// Os escores de decisão nem sempre são probabilidades (o Naive Bayes
/// devolve log-verossimilhanças conjuntas, que caem com o tamanho do
/// documento); a margem cancela o termo comum à linha.
pub fn positive_margin(scores: &Array2<f64>) -> Vec<f64> {
    match scores.ncols() {
        0 => vec![0.0; scores.nrows()],
        1 => scores.column(0).to_vec(),
        _ => scores
            .rows()
            .into_iter()
            .map(|row| row[1] - row[0])
            .collect(),
    }
}

/// Relatório textual por classe, no formato consagrado de
/// precisão/revocação/F1/suporte.
pub fn classification_report(y_true: &[usize], y_pred: &[usize], class_names: &[String]) -> String {
    let n_classes = class_names.len();
    let stats = class_stats(y_true, y_pred, n_classes);
    let width = class_names
        .iter()
        .map(String::len)
        .chain(std::iter::once("weighted avg".len()))
        .max()
        .unwrap_or(12);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>width$} {:>9} {:>9} {:>9} {:>9}\n",
        "", "precision", "recall", "f1-score", "support"
    );
    for (name, s) in class_names.iter().zip(&stats) {
        let _ = writeln!(
            out,
            "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
            name,
            s.precision(),
            s.recall(),
            s.f1(),
            s.support
        );
    }

    let total = y_true.len();
    let _ = writeln!(
        out,
        "\n{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
        "accuracy",
        "",
        "",
        accuracy(y_true, y_pred),
        total
    );
    for (label, average) in [("macro avg", Average::Macro), ("weighted avg", Average::Weighted)] {
        let (p, r, f) = precision_recall_f1(y_true, y_pred, n_classes, average);
        let _ = writeln!(
            out,
            "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
            label, p, r, f, total
        );
    }
    out
}

/// Métricas de uma avaliação.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub confusion_matrix: Vec<Vec<usize>>,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub roc_auc: f64,
    pub report: String,
}

impl Metrics {
    /// Calcula todas as métricas.
    ///
    /// Em tarefas binárias a média é `Binary` e a ROC-AUC usa a margem
    /// [`positive_margin`]; nas demais a média é `Micro` e a ROC-AUC fica em zero.
    pub fn compute(
        y_true: &[usize],
        y_pred: &[usize],
        scores: &Array2<f64>,
        binary: bool,
        class_names: &[String],
    ) -> Self {
        let n_classes = class_names.len();
        let average = if binary {
            Average::Binary
        } else {
            Average::Micro
        };
        let (precision, recall, f1) = precision_recall_f1(y_true, y_pred, n_classes, average);
        let roc_auc = if binary && scores.ncols() > 1 {
            roc_auc(y_true, &positive_margin(scores))
        } else {
            0.0
        };
        Self {
            confusion_matrix: confusion_matrix(y_true, y_pred, n_classes),
            accuracy: accuracy(y_true, y_pred),
            precision,
            recall,
            f1,
            roc_auc,
            report: classification_report(y_true, y_pred, class_names),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const Y_TRUE: [usize; 6] = [0, 0, 1, 1, 1, 0];
    const Y_PRED: [usize; 6] = [0, 1, 1, 0, 1, 0];

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_confusion_matrix() {
        let m = confusion_matrix(&Y_TRUE, &Y_PRED, 2);
        assert_eq!(m, vec![vec![2, 1], vec![1, 2]]);
    }

    #[test]
    fn test_binary_average() {
        let (p, r, f) = precision_recall_f1(&Y_TRUE, &Y_PRED, 2, Average::Binary);
        assert!(close(p, 2.0 / 3.0));
        assert!(close(r, 2.0 / 3.0));
        assert!(close(f, 2.0 / 3.0));
        assert!(close(accuracy(&Y_TRUE, &Y_PRED), 4.0 / 6.0));
    }

    #[test]
    fn test_micro_equals_accuracy() {
        let y_true = [0, 1, 2, 2, 1, 0, 2];
        let y_pred = [0, 2, 2, 1, 1, 0, 2];
        let (p, r, f) = precision_recall_f1(&y_true, &y_pred, 3, Average::Micro);
        let acc = accuracy(&y_true, &y_pred);
        assert!(close(p, acc) && close(r, acc) && close(f, acc));
    }

    #[test]
    fn test_macro_skips_absent_classes() {
        let y_true = [0, 0, 1, 1];
        let y_pred = [0, 0, 1, 1];
        let (p, _, _) = precision_recall_f1(&y_true, &y_pred, 3, Average::Macro);
        assert!(close(p, 1.0));
    }

    #[test]
    fn test_zero_division() {
        let (p, r, f) = precision_recall_f1(&[0, 0], &[0, 0], 2, Average::Binary);
        assert_eq!((p, r, f), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_roc_auc_mann_whitney() {
        assert!(close(roc_auc(&[0, 0, 1, 1], &[0.1, 0.4, 0.35, 0.8]), 0.75));
        assert!(close(roc_auc(&[0, 1], &[0.2, 0.9]), 1.0));
        assert!(close(roc_auc(&[0, 1, 0, 1], &[0.5, 0.5, 0.5, 0.5]), 0.5));
        assert_eq!(roc_auc(&[1, 1, 1], &[0.1, 0.2, 0.3]), 0.0);
    }

    #[test]
    fn test_positive_margin_ignores_row_offset() {
        // log-verossimilhanças: a linha longa (positiva) tem escores menores
        let scores = array![[-26.33, -23.94], [-9.10, -11.50], [-30.0, -25.0], [-8.0, -9.0]];
        assert_eq!(positive_margin(&scores).len(), 4);

        let y_true = [1, 0, 1, 0];
        assert!(close(roc_auc(&y_true, &scores.column(1).to_vec()), 0.0));
        let metrics = Metrics::compute(
            &y_true,
            &[1, 0, 1, 0],
            &scores,
            true,
            &["no".to_string(), "yes".to_string()],
        );
        assert!(close(metrics.roc_auc, 1.0));
    }

    #[test]
    fn test_report_lists_classes() {
        let names = vec!["no".to_string(), "yes".to_string()];
        let report = classification_report(&Y_TRUE, &Y_PRED, &names);
        assert!(report.contains("precision"));
        assert!(report.lines().any(|l| l.trim_start().starts_with("no ")));
        assert!(report.contains("weighted avg"));
        assert!(report.contains("accuracy"));
    }

    #[test]
    fn test_compute_multiclass_has_no_auc() {
        let names: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let scores = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let metrics = Metrics::compute(&[0, 1, 2], &[0, 1, 2], &scores, false, &names);
        assert_eq!(metrics.roc_auc, 0.0);
        assert!(close(metrics.f1, 1.0));
    }
}
