//! # Erros do Pipeline de Experimentos
//!
//! Um único enum cobre todas as falhas que a biblioteca pode reportar.
//! A categoria do erro define o que o chamador deve fazer:
//!
//! | Categoria              | Variantes                                   | Efeito na execução          |
//! |------------------------|---------------------------------------------|-----------------------------|
//! | Entrada/Saída          | `Io`, `Json`, `Csv`                         | execução abortada           |
//! | Alinhamento de dados   | `DataMismatch`, `MissingLabel`              | nenhum dataset é produzido  |
//! | Dataset                | `InvalidDataset`, `StaleCache`              | execução abortada           |
//! | Modelo                 | `InvalidParam`, `EmptyParamGrid`, `Fit`     | execução abortada           |
//! | Configuração           | `Config`                                    | execução ignorada           |

use std::path::PathBuf;

use thiserror::Error;

/// Erros produzidos pelo `argmine-core`.
#[derive(Debug, Error)]
pub enum ArgMineError {
    #[error("falha de E/S em {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON inválido em {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV inválido em {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Quantidade de registros de features e de rótulos diferem.
    #[error("{features} registros de features para {labels} registros de rótulos")]
    DataMismatch { features: usize, labels: usize },

    /// Um registro de features não tem rótulo correspondente.
    #[error("registro {id} sem rótulo correspondente")]
    MissingLabel { id: String },

    /// O mesmo id aparece em mais de uma linha do arquivo de rótulos.
    #[error("rótulo {id} aparece mais de uma vez")]
    DuplicateLabel { id: String },

    #[error("dataset inválido: {0}")]
    InvalidDataset(String),

    /// O cache em disco foi construído com outra configuração.
    #[error("cache {path} desatualizado: esperado {expected}, encontrado {found}")]
    StaleCache {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("parâmetro inválido `{name}`: {reason}")]
    InvalidParam { name: String, reason: String },

    #[error("grade de hiperparâmetros vazia")]
    EmptyParamGrid,

    #[error("falha no treinamento: {0}")]
    Fit(String),

    #[error("configuração inválida: {0}")]
    Config(String),
}

impl ArgMineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn param(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParam {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ArgMineError>;
