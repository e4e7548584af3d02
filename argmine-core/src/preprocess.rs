//! # Estágios de Pré-processamento
//!
//! Transformações que antecedem o classificador no pipeline:
//!
//! | Estágio         | Papel                                                   |
//! |-----------------|---------------------------------------------------------|
//! | `MinMaxScaler`  | reescala cada coluna para `[0, 1]`                      |
//! | `StandardScaler`| centraliza e divide pelo desvio padrão                  |
//! | `Binarizer`     | `x > 0 → 1`, senão `0` (entrada do Naive Bayes)         |
//! | `Pca`           | projeção nas componentes principais (dados centrados)   |
//! | `TruncatedSvd`  | projeção nos vetores singulares (dados não centrados)   |
//! | `Lda`           | direções discriminantes de Fisher (supervisionado)      |
//!
//! Todos os estágios são serializáveis: o estado ajustado faz parte do
//! artefato do modelo.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ArgMineError, Result};
use crate::linalg::{conjugate_gradient, jacobi_eigen, normalize_sign, top_eigenpairs};

/// Estágio ajustável que transforma a matriz de features.
pub trait Transformer {
    /// Ajusta o estado do estágio. `y` só é usado por estágios supervisionados.
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<()>;

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    fn fit_transform(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<Array2<f64>> {
        self.fit(x, y)?;
        self.transform(x)
    }
}

fn not_fitted(stage: &str) -> ArgMineError {
    ArgMineError::Fit(format!("{stage} usado antes do ajuste"))
}

fn check_width(stage: &str, expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(ArgMineError::Fit(format!(
            "{stage}: esperado {expected} colunas, recebido {}",
            x.ncols()
        )));
    }
    Ok(())
}

fn check_not_empty(stage: &str, x: &Array2<f64>) -> Result<()> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ArgMineError::Fit(format!("{stage}: matriz vazia")));
    }
    Ok(())
}

// ============================================================
// Escalonadores
// ============================================================

/// `x' = (x - min) / (max - min)`; colunas constantes são apenas deslocadas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl Transformer for MinMaxScaler {
    fn fit(&mut self, x: &Array2<f64>, _y: &[usize]) -> Result<()> {
        check_not_empty("MinMaxScaler", x)?;
        let min = x.fold_axis(Axis(0), f64::INFINITY, |a, &b| a.min(b));
        let max = x.fold_axis(Axis(0), f64::NEG_INFINITY, |a, &b| a.max(b));
        let range = &max - &min;
        self.scale = Some(range.mapv(|r| if r > 0.0 { 1.0 / r } else { 1.0 }));
        self.min = Some(min);
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (min, scale) = match (&self.min, &self.scale) {
            (Some(min), Some(scale)) => (min, scale),
            _ => return Err(not_fitted("MinMaxScaler")),
        };
        check_width("MinMaxScaler", min.len(), x)?;
        Ok((x - min) * scale)
    }
}

/// `x' = (x - média) / desvio`; desvio nulo é tratado como 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    std: Option<Array1<f64>>,
}

impl Transformer for StandardScaler {
    fn fit(&mut self, x: &Array2<f64>, _y: &[usize]) -> Result<()> {
        check_not_empty("StandardScaler", x)?;
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| ArgMineError::Fit("StandardScaler: matriz vazia".into()))?;
        let std = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 0.0 { s } else { 1.0 });
        self.mean = Some(mean);
        self.std = Some(std);
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, std) = match (&self.mean, &self.std) {
            (Some(mean), Some(std)) => (mean, std),
            _ => return Err(not_fitted("StandardScaler")),
        };
        check_width("StandardScaler", mean.len(), x)?;
        Ok((x - mean) / std)
    }
}

/// `x > threshold → 1`, senão `0`. O limiar padrão é zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Binarizer {
    pub threshold: f64,
}

impl Transformer for Binarizer {
    fn fit(&mut self, _x: &Array2<f64>, _y: &[usize]) -> Result<()> {
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let threshold = self.threshold;
        Ok(x.mapv(|v| if v > threshold { 1.0 } else { 0.0 }))
    }
}

// ============================================================
// Redutores
// ============================================================

/// Análise de Componentes Principais.
///
/// Os autovetores da covariância $C = X_c^T X_c / (n-1)$ são obtidos por
/// iteração de potência sobre o operador implícito, sem formar $C$.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pca {
    pub n_components: usize,
    pub random_state: u64,
    mean: Option<Array1<f64>>,
    /// Componentes nas linhas (`k × d`).
    components: Option<Array2<f64>>,
    explained_variance: Vec<f64>,
}

impl Pca {
    pub fn new(n_components: usize, random_state: u64) -> Self {
        Self {
            n_components,
            random_state,
            mean: None,
            components: None,
            explained_variance: Vec::new(),
        }
    }

    pub fn explained_variance(&self) -> &[f64] {
        &self.explained_variance
    }
}

impl Transformer for Pca {
    fn fit(&mut self, x: &Array2<f64>, _y: &[usize]) -> Result<()> {
        check_not_empty("PCA", x)?;
        let (n, d) = x.dim();
        let k = self.n_components.min(n).min(d);
        if k == 0 {
            return Err(ArgMineError::param("n_components", "deve ser maior que zero"));
        }

        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| ArgMineError::Fit("PCA: matriz vazia".into()))?;
        let centered = x - &mean;
        let denom = if n > 1 { (n - 1) as f64 } else { 1.0 };

        let pairs = top_eigenpairs(
            |v| centered.t().dot(&centered.dot(v)) / denom,
            d,
            k,
            self.random_state,
        );
        self.components = Some(stack_rows(pairs.iter().map(|p| &p.vector), d));
        self.explained_variance = pairs.iter().map(|p| p.value).collect();
        self.mean = Some(mean);
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, components) = match (&self.mean, &self.components) {
            (Some(mean), Some(components)) => (mean, components),
            _ => return Err(not_fitted("PCA")),
        };
        check_width("PCA", mean.len(), x)?;
        Ok((x - mean).dot(&components.t()))
    }
}

/// SVD truncada: vetores singulares à direita de $X$ via $X^T X$.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruncatedSvd {
    pub n_components: usize,
    pub random_state: u64,
    components: Option<Array2<f64>>,
    singular_values: Vec<f64>,
}

impl TruncatedSvd {
    pub fn new(n_components: usize, random_state: u64) -> Self {
        Self {
            n_components,
            random_state,
            components: None,
            singular_values: Vec::new(),
        }
    }

    pub fn singular_values(&self) -> &[f64] {
        &self.singular_values
    }
}

impl Transformer for TruncatedSvd {
    fn fit(&mut self, x: &Array2<f64>, _y: &[usize]) -> Result<()> {
        check_not_empty("TruncatedSVD", x)?;
        let (n, d) = x.dim();
        let k = self.n_components.min(n).min(d);
        if k == 0 {
            return Err(ArgMineError::param("n_components", "deve ser maior que zero"));
        }

        let pairs = top_eigenpairs(|v| x.t().dot(&x.dot(v)), d, k, self.random_state);
        self.components = Some(stack_rows(pairs.iter().map(|p| &p.vector), d));
        self.singular_values = pairs.iter().map(|p| p.value.sqrt()).collect();
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let components = self
            .components
            .as_ref()
            .ok_or_else(|| not_fitted("TruncatedSVD"))?;
        check_width("TruncatedSVD", components.ncols(), x)?;
        Ok(x.dot(&components.t()))
    }
}

/// Análise Discriminante Linear (Fisher).
///
/// Resolve o problema generalizado $S_b w = \lambda S_w w$ no subespaço
/// gerado por $Z = S_w^{-1} M$, em que as colunas de $M$ são
/// $\sqrt{n_c / n}\,(\mu_c - \mu)$:
///
/// 1. $S_w z_c = m_c$ por gradiente conjugado ($S_w$ regularizada);
/// 2. $G = M^T Z$ ($K \times K$, simétrica) decomposta por Jacobi;
/// 3. $w = Z a / \sqrt{\lambda}$, de modo que $w^T S_w w = 1$.
///
/// No máximo `n_classes - 1` componentes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lda {
    pub n_components: Option<usize>,
    mean: Option<Array1<f64>>,
    /// Direções nas colunas (`d × k`).
    scalings: Option<Array2<f64>>,
}

impl Lda {
    pub fn new(n_components: Option<usize>) -> Self {
        Self {
            n_components,
            mean: None,
            scalings: None,
        }
    }

    pub fn n_fitted_components(&self) -> usize {
        self.scalings.as_ref().map_or(0, |s| s.ncols())
    }
}

impl Transformer for Lda {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<()> {
        check_not_empty("LDA", x)?;
        let (n, d) = x.dim();
        if y.len() != n {
            return Err(ArgMineError::Fit(format!(
                "LDA: {n} linhas para {} rótulos",
                y.len()
            )));
        }

        let n_classes = y.iter().max().map_or(0, |m| m + 1);
        let mut sums = Array2::<f64>::zeros((n_classes, d));
        let mut counts = vec![0usize; n_classes];
        for (row, &class) in x.rows().into_iter().zip(y) {
            sums.row_mut(class).scaled_add(1.0, &row);
            counts[class] += 1;
        }
        let present: Vec<usize> = (0..n_classes).filter(|&c| counts[c] > 0).collect();
        if present.len() < 2 {
            return Err(ArgMineError::Fit("LDA exige ao menos duas classes".into()));
        }

        let mut class_means = sums;
        for &c in &present {
            class_means.row_mut(c).mapv_inplace(|v| v / counts[c] as f64);
        }
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| ArgMineError::Fit("LDA: matriz vazia".into()))?;

        // Dados centrados na média da própria classe
        let mut within = x.clone();
        for (mut row, &class) in within.rows_mut().into_iter().zip(y) {
            row -= &class_means.row(class);
        }
        let trace = within.mapv(|v| v * v).sum() / n as f64;
        let reg = 1e-4 * trace / d as f64 + 1e-9;
        let sw = |v: &Array1<f64>| within.t().dot(&within.dot(v)) / n as f64 + v * reg;

        let k = present.len();
        let mut m = Array2::<f64>::zeros((d, k));
        for (j, &c) in present.iter().enumerate() {
            let weight = (counts[c] as f64 / n as f64).sqrt();
            let diff = (&class_means.row(c) - &mean) * weight;
            m.column_mut(j).assign(&diff);
        }

        let max_iter = (2 * d).max(50);
        let mut z = Array2::<f64>::zeros((d, k));
        for j in 0..k {
            let b = m.column(j).to_owned();
            z.column_mut(j)
                .assign(&conjugate_gradient(&sw, &b, 1e-10, max_iter));
        }

        let g = m.t().dot(&z);
        let g = (&g + &g.t()) / 2.0;
        let (values, vectors) = jacobi_eigen(&g);

        let wanted = self.n_components.unwrap_or(k - 1).min(k - 1);
        let mut directions: Vec<Array1<f64>> = Vec::with_capacity(wanted);
        for (i, &lambda) in values.iter().enumerate().take(wanted) {
            if lambda <= 1e-12 {
                break;
            }
            let mut w = z.dot(&vectors.column(i)) / lambda.sqrt();
            normalize_sign(&mut w);
            directions.push(w);
        }
        if directions.is_empty() {
            return Err(ArgMineError::Fit(
                "LDA sem direções discriminantes (médias de classe coincidentes)".into(),
            ));
        }

        let scalings = stack_rows(directions.iter(), d).reversed_axes();
        self.scalings = Some(scalings);
        self.mean = Some(mean);
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, scalings) = match (&self.mean, &self.scalings) {
            (Some(mean), Some(scalings)) => (mean, scalings),
            _ => return Err(not_fitted("LDA")),
        };
        check_width("LDA", mean.len(), x)?;
        Ok((x - mean).dot(scalings))
    }
}

/// Empilha vetores de tamanho `d` como linhas.
fn stack_rows<'a, I>(rows: I, d: usize) -> Array2<f64>
where
    I: Iterator<Item = &'a Array1<f64>>,
{
    let rows: Vec<&Array1<f64>> = rows.collect();
    let mut out = Array2::<f64>::zeros((rows.len(), d));
    for (i, row) in rows.iter().enumerate() {
        out.row_mut(i).assign(*row);
    }
    out
}
