//! # Registro de Métricas
//!
//! Arquivo CSV só de acréscimo, uma linha por execução:
//!
//! | Coluna       | Conteúdo                                              |
//! |--------------|-------------------------------------------------------|
//! | `id`         | maior id existente + 1 (1 num registro novo)          |
//! | `task`       | tarefa (`detection`, `classification`, `relation`)    |
//! | `dataset`    | tag da configuração de features                       |
//! | `config`     | pipeline + hiperparâmetros efetivos, como string JSON |
//! | métricas     | `accuracy`, `precision`, `recall`, `f1`, `roc_auc`    |
//! | `created_at` | instante UTC em RFC 3339                              |

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{ArgMineError, Result};
use crate::metrics::Metrics;

pub const COLUMNS: [&str; 10] = [
    "id",
    "task",
    "dataset",
    "config",
    "accuracy",
    "precision",
    "recall",
    "f1",
    "roc_auc",
    "created_at",
];

/// Uma linha do registro, antes de receber o id.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub task: String,
    pub dataset: String,
    pub config: String,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub roc_auc: f64,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(task: &str, dataset: &str, config: &Value, metrics: &Metrics) -> Self {
        Self {
            task: task.to_string(),
            dataset: dataset.to_string(),
            config: config.to_string(),
            accuracy: metrics.accuracy,
            precision: metrics.precision,
            recall: metrics.recall,
            f1: metrics.f1,
            roc_auc: metrics.roc_auc,
            created_at: Utc::now(),
        }
    }

    fn to_record(&self, id: u64) -> [String; 10] {
        [
            id.to_string(),
            self.task.clone(),
            self.dataset.clone(),
            self.config.clone(),
            self.accuracy.to_string(),
            self.precision.to_string(),
            self.recall.to_string(),
            self.f1.to_string(),
            self.roc_auc.to_string(),
            self.created_at.to_rfc3339(),
        ]
    }
}

/// Linha lida do registro.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    pub id: u64,
    pub entry: LedgerEntry,
}

#[derive(Debug, Clone)]
pub struct MetricsLedger {
    path: PathBuf,
}

impl MetricsLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_fresh(&self) -> bool {
        fs::metadata(&self.path).map_or(true, |m| m.len() == 0)
    }

    /// Acrescenta `entry` e devolve o id atribuído.
    pub fn append(&self, entry: &LedgerEntry) -> Result<u64> {
        let fresh = self.is_fresh();
        let id = if fresh {
            1
        } else {
            self.entries()?.iter().map(|row| row.id).max().map_or(1, |m| m + 1)
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ArgMineError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ArgMineError::io(&self.path, e))?;

        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if fresh {
            writer
                .write_record(COLUMNS)
                .map_err(|e| ArgMineError::csv(&self.path, e))?;
        }
        writer
            .write_record(entry.to_record(id))
            .map_err(|e| ArgMineError::csv(&self.path, e))?;
        writer.flush().map_err(|e| ArgMineError::io(&self.path, e))?;
        Ok(id)
    }

    /// Todas as linhas, na ordem do arquivo. Registro ausente → vazio.
    pub fn entries(&self) -> Result<Vec<LedgerRow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| ArgMineError::csv(&self.path, e))?;
        let headers = reader
            .headers()
            .map_err(|e| ArgMineError::csv(&self.path, e))?
            .clone();
        if headers.iter().ne(COLUMNS.iter().copied()) {
            return Err(self.invalid(format!("cabeçalho inesperado: {headers:?}")));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ArgMineError::csv(&self.path, e))?;
            let text = |i: usize| record.get(i).unwrap_or_default();
            let number = |i: usize| -> Result<f64> {
                text(i)
                    .parse()
                    .map_err(|_| self.invalid(format!("{} não numérico: {:?}", COLUMNS[i], text(i))))
            };
            let id = text(0)
                .parse()
                .map_err(|_| self.invalid(format!("id inválido: {:?}", text(0))))?;
            let created_at = DateTime::parse_from_rfc3339(text(9))
                .map_err(|e| self.invalid(format!("created_at inválido: {e}")))?
                .with_timezone(&Utc);
            rows.push(LedgerRow {
                id,
                entry: LedgerEntry {
                    task: text(1).to_string(),
                    dataset: text(2).to_string(),
                    config: text(3).to_string(),
                    accuracy: number(4)?,
                    precision: number(5)?,
                    recall: number(6)?,
                    f1: number(7)?,
                    roc_auc: number(8)?,
                    created_at,
                },
            });
        }
        Ok(rows)
    }

    fn invalid(&self, reason: String) -> ArgMineError {
        ArgMineError::InvalidDataset(format!("registro {}: {reason}", self.path.display()))
    }
}
