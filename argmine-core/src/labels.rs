//! # Codificação de Rótulos
//!
//! Converte rótulos textuais em códigos inteiros densos conforme a tarefa:
//!
//! | Tarefa           | Regra                                                    |
//! |------------------|----------------------------------------------------------|
//! | `detection`      | `"no"` → 0, qualquer outro texto → 1                     |
//! | `classification` | ordem de primeira ocorrência dos rótulos em minúsculas   |
//! | `relation`       | idem                                                     |
//!
//! A ordem de primeira ocorrência torna o dicionário dependente da ordem do
//! corpus. Para reaproveitar códigos entre execuções, persista o
//! [`LabelDict`] e crie o codec com [`LabelCodec::with_ordering`].
//! [`LabelOrderings`] guarda um dicionário por par `(tarefa, campo alvo)`,
//! de modo que execuções de tarefas diferentes não herdem classes alheias.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ArgMineError, Result};
use crate::observe::RunLog;

/// Rótulo negativo da tarefa de detecção (comparação sensível a caixa).
pub const NEGATIVE_LABEL: &str = "no";
pub const POSITIVE_LABEL: &str = "yes";

/// Granularidade do problema de classificação.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Argumento vs. não-argumento.
    #[default]
    Detection,
    /// Tipo de componente argumentativo.
    Classification,
    /// Tipo de relação entre componentes.
    Relation,
}

impl TaskType {
    pub fn name(&self) -> &'static str {
        match self {
            TaskType::Detection => "detection",
            TaskType::Classification => "classification",
            TaskType::Relation => "relation",
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, TaskType::Detection)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mapa código → rótulo, com os códigos densos `0..len`.
///
/// Serializa como lista ordenada pelo código.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelDict {
    labels: Vec<String>,
}

impl LabelDict {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn decode(&self, code: usize) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }

    pub fn code_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Pares `(código, rótulo)` em ordem de código.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.labels.iter().map(String::as_str).enumerate()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    fn push(&mut self, label: String) -> usize {
        self.labels.push(label);
        self.labels.len() - 1
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ArgMineError::io(parent, e))?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| ArgMineError::json(path, e))?;
        fs::write(path, content).map_err(|e| ArgMineError::io(path, e))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ArgMineError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| ArgMineError::json(path, e))
    }
}

/// Ordens de rótulos persistidas, uma por `(tarefa, campo alvo)`.
///
/// Serializa como objeto JSON com chaves `"<tarefa>:<campo>"`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelOrderings {
    entries: BTreeMap<String, LabelDict>,
}

impl LabelOrderings {
    fn key(task: TaskType, target_field: &str) -> String {
        format!("{}:{target_field}", task.name())
    }

    pub fn get(&self, task: TaskType, target_field: &str) -> Option<&LabelDict> {
        self.entries.get(&Self::key(task, target_field))
    }

    pub fn insert(&mut self, task: TaskType, target_field: &str, dict: LabelDict) {
        self.entries.insert(Self::key(task, target_field), dict);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Arquivo ausente resulta em um conjunto vazio.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| ArgMineError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| ArgMineError::json(path, e))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ArgMineError::io(parent, e))?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| ArgMineError::json(path, e))?;
        fs::write(path, content).map_err(|e| ArgMineError::io(path, e))
    }
}

/// Resultado da codificação.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedLabels {
    pub dict: LabelDict,
    pub codes: Vec<usize>,
}

/// Codificador de rótulos, opcionalmente preso a uma ordem persistida.
#[derive(Debug, Clone, Default)]
pub struct LabelCodec {
    ordering: Option<LabelDict>,
}

impl LabelCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reaproveita os códigos de `dict`; rótulos novos recebem códigos após os existentes.
    pub fn with_ordering(dict: LabelDict) -> Self {
        Self {
            ordering: Some(dict),
        }
    }

    pub fn encode(&self, task: TaskType, raw: &[String], log: &RunLog) -> Result<EncodedLabels> {
        let _guard = log.enter();
        if raw.is_empty() {
            return Err(ArgMineError::InvalidDataset(
                "nenhum rótulo para codificar".into(),
            ));
        }

        let encoded = match task {
            TaskType::Detection => Self::encode_detection(raw),
            TaskType::Classification | TaskType::Relation => self.encode_first_seen(raw),
        };

        info!(
            task = %task,
            classes = encoded.dict.len(),
            dict = ?encoded.dict.labels(),
            "rótulos codificados"
        );
        Ok(encoded)
    }

    fn encode_detection(raw: &[String]) -> EncodedLabels {
        let codes = raw
            .iter()
            .map(|label| usize::from(label != NEGATIVE_LABEL))
            .collect();
        EncodedLabels {
            dict: LabelDict::new([NEGATIVE_LABEL, POSITIVE_LABEL]),
            codes,
        }
    }

    fn encode_first_seen(&self, raw: &[String]) -> EncodedLabels {
        let mut dict = self.ordering.clone().unwrap_or_default();
        let preset = dict.len();
        let mut index: HashMap<String, usize> =
            dict.iter().map(|(code, label)| (label.to_string(), code)).collect();

        let codes = raw
            .iter()
            .map(|label| {
                let label = label.to_lowercase();
                match index.get(&label) {
                    Some(code) => *code,
                    None => {
                        let code = dict.push(label.clone());
                        index.insert(label, code);
                        code
                    }
                }
            })
            .collect();

        if self.ordering.is_some() && dict.len() > preset {
            warn!(
                new = ?&dict.labels()[preset..],
                "rótulos ausentes da ordem persistida foram anexados"
            );
        }
        EncodedLabels { dict, codes }
    }
}
