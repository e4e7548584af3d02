//! # Dataset Tabular e Cache em Disco
//!
//! O [`Dataset`] é a tabela produzida pelo montador de features: uma coluna
//! por token observado no corpus (por grupo), colunas de estatísticas e a
//! coluna de rótulo `label`. O esquema depende do corpus e da configuração de
//! features, por isso o cache em disco carrega uma **impressão digital**
//! (SHA-256 da configuração efetiva) num arquivo lateral `<csv>.meta.json`.
//!
//! ## Política do cache
//!
//! | Situação                                   | Resultado                        |
//! |--------------------------------------------|----------------------------------|
//! | CSV ausente ou reconstrução forçada        | constrói e grava CSV + metadados |
//! | CSV presente, fingerprint igual            | lê o CSV                         |
//! | CSV presente, fingerprint diferente/ausente| `StaleCache`                     |

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{ArgMineError, Result};
use crate::observe::RunLog;

/// Nome reservado da coluna de rótulo.
pub const LABEL_COLUMN: &str = "label";

/// Tabela de features com rótulos em texto (minúsculos).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub features: Array2<f64>,
    pub labels: Vec<String>,
}

impl Dataset {
    /// Valida as dimensões e a unicidade dos nomes de coluna.
    pub fn new(columns: Vec<String>, features: Array2<f64>, labels: Vec<String>) -> Result<Self> {
        if features.ncols() != columns.len() {
            return Err(ArgMineError::InvalidDataset(format!(
                "{} colunas nomeadas para {} colunas de dados",
                columns.len(),
                features.ncols()
            )));
        }
        if features.nrows() != labels.len() {
            return Err(ArgMineError::InvalidDataset(format!(
                "{} linhas para {} rótulos",
                features.nrows(),
                labels.len()
            )));
        }
        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if name == LABEL_COLUMN || !seen.insert(name.as_str()) {
                return Err(ArgMineError::InvalidDataset(format!(
                    "coluna duplicada `{name}`"
                )));
            }
        }
        Ok(Self {
            columns,
            features,
            labels,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_columns(&self) -> usize {
        self.features.ncols()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Fração de células zeradas da matriz de features.
    pub fn sparsity(&self) -> f64 {
        let total = self.features.len();
        if total == 0 {
            return 0.0;
        }
        let zeros = self.features.iter().filter(|v| **v == 0.0).count();
        zeros as f64 / total as f64
    }

    /// Grava em CSV (colunas de features seguidas de `label`).
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path).map_err(|e| ArgMineError::csv(path, e))?;

        let header = self
            .columns
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(LABEL_COLUMN));
        writer
            .write_record(header)
            .map_err(|e| ArgMineError::csv(path, e))?;

        for (row, label) in self.features.rows().into_iter().zip(&self.labels) {
            let mut record: Vec<String> = row.iter().map(|v| format_value(*v)).collect();
            record.push(label.clone());
            writer
                .write_record(&record)
                .map_err(|e| ArgMineError::csv(path, e))?;
        }
        writer.flush().map_err(|e| ArgMineError::io(path, e))
    }

    /// Lê um CSV gravado por [`Dataset::write_csv`].
    ///
    /// A coluna `label` pode estar em qualquer posição, mas precisa existir.
    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| ArgMineError::csv(path, e))?;
        let headers = reader
            .headers()
            .map_err(|e| ArgMineError::csv(path, e))?
            .clone();

        let label_idx = headers
            .iter()
            .position(|h| h == LABEL_COLUMN)
            .ok_or_else(|| {
                ArgMineError::InvalidDataset(format!(
                    "{} sem coluna `{LABEL_COLUMN}`",
                    path.display()
                ))
            })?;

        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != label_idx)
            .map(|(_, h)| h.to_string())
            .collect();

        let mut values = Vec::new();
        let mut labels = Vec::new();
        for (row_idx, record) in reader.records().enumerate() {
            let record = record.map_err(|e| ArgMineError::csv(path, e))?;
            for (i, cell) in record.iter().enumerate() {
                if i == label_idx {
                    labels.push(cell.to_string());
                    continue;
                }
                let value: f64 = cell.trim().parse().map_err(|_| {
                    ArgMineError::InvalidDataset(format!(
                        "valor não numérico `{cell}` na linha {} de {}",
                        row_idx + 1,
                        path.display()
                    ))
                })?;
                values.push(value);
            }
        }

        let n_rows = labels.len();
        let features = Array2::from_shape_vec((n_rows, columns.len()), values)
            .map_err(|e| ArgMineError::InvalidDataset(e.to_string()))?;
        Self::new(columns, features, labels)
    }
}

/// Inteiros sem casa decimal; demais valores na representação mais curta.
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// SHA-256 (hex) da serialização JSON de `value`.
pub fn fingerprint<T: Serialize>(value: &T) -> Result<String> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| ArgMineError::Config(format!("configuração não serializável: {e}")))?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheMeta {
    fingerprint: String,
    rows: usize,
    columns: usize,
    created_at: DateTime<Utc>,
}

/// Cache do dataset em CSV com metadados de validação.
#[derive(Debug, Clone)]
pub struct DatasetCache {
    csv_path: PathBuf,
}

impl DatasetCache {
    pub fn new(csv_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
        }
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn meta_path(&self) -> PathBuf {
        let mut name = self.csv_path.as_os_str().to_owned();
        name.push(".meta.json");
        PathBuf::from(name)
    }

    pub fn exists(&self) -> bool {
        self.csv_path.exists()
    }

    /// Lê o cache, exigindo que o fingerprint gravado seja `fingerprint`.
    pub fn load(&self, fingerprint: &str) -> Result<Dataset> {
        let meta_path = self.meta_path();
        let found = match fs::read_to_string(&meta_path) {
            Ok(content) => {
                let meta: CacheMeta = serde_json::from_str(&content)
                    .map_err(|e| ArgMineError::json(&meta_path, e))?;
                meta.fingerprint
            }
            Err(_) => "<sem metadados>".to_string(),
        };

        if found != fingerprint {
            return Err(ArgMineError::StaleCache {
                path: self.csv_path.clone(),
                expected: fingerprint.to_string(),
                found,
            });
        }
        Dataset::read_csv(&self.csv_path)
    }

    /// Grava CSV e metadados, criando o diretório se necessário.
    pub fn store(&self, dataset: &Dataset, fingerprint: &str) -> Result<()> {
        if let Some(parent) = self.csv_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ArgMineError::io(parent, e))?;
        }
        dataset.write_csv(&self.csv_path)?;

        let meta = CacheMeta {
            fingerprint: fingerprint.to_string(),
            rows: dataset.n_rows(),
            columns: dataset.n_columns(),
            created_at: Utc::now(),
        };
        let meta_path = self.meta_path();
        let content =
            serde_json::to_string_pretty(&meta).map_err(|e| ArgMineError::json(&meta_path, e))?;
        fs::write(&meta_path, content).map_err(|e| ArgMineError::io(&meta_path, e))
    }

    /// Usa o cache quando válido; senão executa `build` e grava o resultado.
    ///
    /// Retorna o dataset e se ele veio do cache.
    pub fn load_or_build<F>(
        &self,
        fingerprint: &str,
        force: bool,
        log: &RunLog,
        build: F,
    ) -> Result<(Dataset, bool)>
    where
        F: FnOnce() -> Result<Dataset>,
    {
        if !force && self.exists() {
            let dataset = self.load(fingerprint)?;
            let _guard = log.enter();
            info!(path = %self.csv_path.display(), rows = dataset.n_rows(), "dataset lido do cache");
            return Ok((dataset, true));
        }

        if force && self.exists() {
            let _guard = log.enter();
            warn!(path = %self.csv_path.display(), "reconstrução forçada do dataset");
        }

        let dataset = build()?;
        self.store(&dataset, fingerprint)?;
        let _guard = log.enter();
        info!(path = %self.csv_path.display(), "dataset gravado no cache");
        Ok((dataset, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn small_dataset() -> Dataset {
        Dataset::new(
            vec!["a".into(), "b".into(), "avg".into()],
            array![[1.0, 0.0, 2.5], [0.0, 0.0, 3.0]],
            vec!["claim".into(), "premise".into()],
        )
        .unwrap()
    }

    #[test]
    fn test_sparsity() {
        let ds = small_dataset();
        assert!((ds.sparsity() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let err = Dataset::new(
            vec!["x".into(), "x".into()],
            Array2::zeros((1, 2)),
            vec!["a".into()],
        )
        .unwrap_err();
        assert!(matches!(err, ArgMineError::InvalidDataset(_)));
    }

    #[test]
    fn test_csv_roundtrip_and_integer_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.csv");
        let ds = small_dataset();
        ds.write_csv(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("a,b,avg,label\n1,0,2.5,claim\n"));

        let back = Dataset::read_csv(&path).unwrap();
        assert_eq!(back, ds);
    }

    #[test]
    fn test_read_csv_without_label_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.csv");
        fs::write(&path, "a,b\n1,2\n").unwrap();
        let err = Dataset::read_csv(&path).unwrap_err();
        assert!(matches!(err, ArgMineError::InvalidDataset(_)));
    }

    #[test]
    fn test_fingerprint_is_stable_and_sensitive() {
        let a = fingerprint(&serde_json::json!({"unigrams": true})).unwrap();
        let b = fingerprint(&serde_json::json!({"unigrams": true})).unwrap();
        let c = fingerprint(&serde_json::json!({"unigrams": false})).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_cache_detects_stale_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DatasetCache::new(dir.path().join("data").join("dataset.csv"));
        let log = RunLog::detached();

        let (_, cached) = cache
            .load_or_build("fp-1", false, &log, || Ok(small_dataset()))
            .unwrap();
        assert!(!cached);

        let (ds, cached) = cache
            .load_or_build("fp-1", false, &log, || panic!("não deve reconstruir"))
            .unwrap();
        assert!(cached);
        assert_eq!(ds, small_dataset());

        let err = cache
            .load_or_build("fp-2", false, &log, || Ok(small_dataset()))
            .unwrap_err();
        assert!(matches!(err, ArgMineError::StaleCache { .. }));

        // Reconstrução forçada substitui o cache
        let (_, cached) = cache
            .load_or_build("fp-2", true, &log, || Ok(small_dataset()))
            .unwrap();
        assert!(!cached);
        assert!(cache.load("fp-2").is_ok());
    }

    #[test]
    fn test_cache_without_metadata_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.csv");
        small_dataset().write_csv(&path).unwrap();

        let err = DatasetCache::new(&path).load("fp").unwrap_err();
        assert!(matches!(err, ArgMineError::StaleCache { .. }));
    }
}
