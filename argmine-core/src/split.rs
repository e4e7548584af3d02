//! # Partição Treino/Teste
//!
//! Particiona o conjunto de treinamento de forma reprodutível (semente
//! `ChaCha8`). A versão estratificada calcula a cota de teste de cada classe
//! pelo método do maior resto e embaralha cada classe separadamente, de modo
//! que as proporções de classes se mantêm nas duas partições.
//!
//! Também fornece [`stratified_kfold`], usado na validação cruzada da busca
//! de hiperparâmetros.

use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::{ArgMineError, Result};
use crate::labels::EncodedLabels;

/// Matriz de features com rótulos codificados.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSet {
    pub columns: Vec<String>,
    pub x: Array2<f64>,
    pub y: Vec<usize>,
    pub n_classes: usize,
}

impl TrainingSet {
    pub fn new(dataset: &Dataset, labels: &EncodedLabels) -> Result<Self> {
        if dataset.n_rows() == 0 {
            return Err(ArgMineError::InvalidDataset("dataset vazio".into()));
        }
        if labels.codes.len() != dataset.n_rows() {
            return Err(ArgMineError::InvalidDataset(format!(
                "{} linhas para {} rótulos codificados",
                dataset.n_rows(),
                labels.codes.len()
            )));
        }
        Ok(Self {
            columns: dataset.columns.clone(),
            x: dataset.features.clone(),
            y: labels.codes.clone(),
            n_classes: labels.dict.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// Partições com os índices originais das linhas.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Vec<usize>,
    pub y_test: Vec<usize>,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Divide `data` em treino e teste.
///
/// `n_test = ceil(test_fraction · n)`, limitado a `[1, n - 1]`.
pub fn split(data: &TrainingSet, test_fraction: f64, seed: u64, stratified: bool) -> Result<Split> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ArgMineError::param(
            "test_fraction",
            format!("{test_fraction} fora do intervalo (0, 1)"),
        ));
    }
    let n = data.len();
    if n < 2 {
        return Err(ArgMineError::InvalidDataset(format!(
            "{n} registro(s) não permitem partição"
        )));
    }

    let n_test = ((test_fraction * n as f64).ceil() as usize).clamp(1, n - 1);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let (mut train_indices, mut test_indices) = if stratified {
        stratified_partition(&data.y, n_test, &mut rng)
    } else {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut rng);
        let train = order.split_off(n_test);
        (train, order)
    };
    train_indices.shuffle(&mut rng);
    test_indices.shuffle(&mut rng);

    Ok(Split {
        x_train: data.x.select(Axis(0), &train_indices),
        x_test: data.x.select(Axis(0), &test_indices),
        y_train: train_indices.iter().map(|&i| data.y[i]).collect(),
        y_test: test_indices.iter().map(|&i| data.y[i]).collect(),
        train_indices,
        test_indices,
    })
}

/// Índices de cada classe, em ordem de código.
fn class_members(y: &[usize]) -> Vec<Vec<usize>> {
    let n_classes = y.iter().max().map_or(0, |m| m + 1);
    let mut members = vec![Vec::new(); n_classes];
    for (i, &class) in y.iter().enumerate() {
        members[class].push(i);
    }
    members
}

fn stratified_partition(y: &[usize], n_test: usize, rng: &mut ChaCha8Rng) -> (Vec<usize>, Vec<usize>) {
    let n = y.len() as f64;
    let members = class_members(y);

    // Cotas pelo maior resto; empate favorece a classe de menor código
    let exact: Vec<f64> = members
        .iter()
        .map(|m| n_test as f64 * m.len() as f64 / n)
        .collect();
    let mut quotas: Vec<usize> = exact.iter().map(|q| q.floor() as usize).collect();
    let mut remaining = n_test - quotas.iter().sum::<usize>();
    let mut by_remainder: Vec<usize> = (0..members.len()).collect();
    by_remainder.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });
    for class in by_remainder {
        if remaining == 0 {
            break;
        }
        if quotas[class] < members[class].len() {
            quotas[class] += 1;
            remaining -= 1;
        }
    }

    let mut train = Vec::new();
    let mut test = Vec::new();
    for (mut indices, quota) in members.into_iter().zip(quotas) {
        indices.shuffle(rng);
        let rest = indices.split_off(quota.min(indices.len()));
        test.extend(indices);
        train.extend(rest);
    }
    (train, test)
}

/// Folds estratificados: pares `(treino, validação)` com índices ordenados.
///
/// Os membros de cada classe são embaralhados e distribuídos em rodízio,
/// continuando o rodízio entre classes para equilibrar o tamanho dos folds.
pub fn stratified_kfold(y: &[usize], k: usize, seed: u64) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
    if k < 2 {
        return Err(ArgMineError::param("cv_folds", "são necessários ao menos 2 folds"));
    }
    if k > y.len() {
        return Err(ArgMineError::param(
            "cv_folds",
            format!("{k} folds para {} registros", y.len()),
        ));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut assignment = vec![0usize; y.len()];
    let mut next_fold = 0;
    for mut indices in class_members(y) {
        indices.shuffle(&mut rng);
        for i in indices {
            assignment[i] = next_fold;
            next_fold = (next_fold + 1) % k;
        }
    }

    Ok((0..k)
        .map(|fold| {
            let (valid, train): (Vec<usize>, Vec<usize>) =
                (0..y.len()).partition(|&i| assignment[i] == fold);
            (train, valid)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn training_set(y: Vec<usize>) -> TrainingSet {
        let n = y.len();
        let x = Array2::from_shape_fn((n, 2), |(i, j)| (i * 10 + j) as f64);
        let n_classes = y.iter().max().map_or(0, |m| m + 1);
        TrainingSet {
            columns: vec!["a".into(), "b".into()],
            x,
            y,
            n_classes,
        }
    }

    fn unbalanced() -> TrainingSet {
        training_set((0..40).map(|i| usize::from(i % 4 == 0)).collect())
    }

    #[test]
    fn test_split_is_reproducible() {
        let data = unbalanced();
        for stratified in [false, true] {
            let a = split(&data, 0.25, 7, stratified).unwrap();
            let b = split(&data, 0.25, 7, stratified).unwrap();
            assert_eq!(a, b);
        }
        let c = split(&data, 0.25, 8, false).unwrap();
        assert_ne!(c.test_indices, split(&data, 0.25, 7, false).unwrap().test_indices);
    }

    #[test]
    fn test_partitions_cover_all_rows_once() {
        let data = unbalanced();
        let s = split(&data, 0.25, 1, true).unwrap();
        let mut all: Vec<usize> = s.train_indices.iter().chain(&s.test_indices).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..40).collect::<Vec<_>>());
        assert_eq!(s.test_indices.len(), 10);

        // As linhas seguem os índices originais
        let first = s.test_indices[0];
        assert_eq!(s.x_test[[0, 0]], (first * 10) as f64);
        assert_eq!(s.y_test[0], data.y[first]);
    }

    #[test]
    fn test_stratified_preserves_proportions() {
        let data = unbalanced();
        let s = split(&data, 0.2, 3, true).unwrap();
        let positives = s.y_test.iter().filter(|&&c| c == 1).count();
        assert_eq!(s.y_test.len(), 8);
        assert_eq!(positives, 2);
    }

    #[test]
    fn test_fraction_bounds() {
        let data = unbalanced();
        assert!(split(&data, 0.0, 1, false).is_err());
        assert!(split(&data, 1.0, 1, false).is_err());
        let tiny = split(&training_set(vec![0, 1, 0]), 0.01, 1, false).unwrap();
        assert_eq!(tiny.test_indices.len(), 1);
    }

    #[test]
    fn test_kfold_folds_are_disjoint_and_balanced() {
        let y: Vec<usize> = (0..20).map(|i| i % 2).collect();
        let folds = stratified_kfold(&y, 5, 11).unwrap();
        assert_eq!(folds.len(), 5);

        let mut seen = vec![0; 20];
        for (train, valid) in &folds {
            assert_eq!(valid.len(), 4);
            assert_eq!(train.len() + valid.len(), 20);
            assert_eq!(valid.iter().filter(|&&i| y[i] == 1).count(), 2);
            for &i in valid {
                seen[i] += 1;
                assert!(!train.contains(&i));
            }
        }
        assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_kfold_rejects_bad_k() {
        assert!(stratified_kfold(&[0, 1, 0], 1, 0).is_err());
        assert!(stratified_kfold(&[0, 1, 0], 4, 0).is_err());
    }
}
