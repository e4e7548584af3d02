//! # Artefato do Modelo
//!
//! Um arquivo JSON por execução em `<dir>/<model_id>_<algoritmo>_model.json`,
//! com o pipeline ajustado e o dicionário de rótulos usado no treino.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ArgMineError, Result};
use crate::estimators::ClassifierKind;
use crate::labels::{LabelDict, TaskType};
use crate::pipeline::FittedPipeline;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model_id: u64,
    pub algorithm: ClassifierKind,
    pub task: TaskType,
    pub label_dict: LabelDict,
    pub pipeline: FittedPipeline,
    pub created_at: DateTime<Utc>,
}

impl ModelArtifact {
    pub fn new(model_id: u64, task: TaskType, label_dict: LabelDict, pipeline: FittedPipeline) -> Self {
        Self {
            model_id,
            algorithm: pipeline.algorithm(),
            task,
            label_dict,
            pipeline,
            created_at: Utc::now(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}_{}_model.json", self.model_id, self.algorithm.short_name())
    }

    /// Grava em `dir` (criado se preciso) e devolve o caminho do arquivo.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| ArgMineError::io(dir, e))?;
        let path = dir.join(self.file_name());
        let content = serde_json::to_string(self).map_err(|e| ArgMineError::json(&path, e))?;
        fs::write(&path, content).map_err(|e| ArgMineError::io(&path, e))?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ArgMineError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| ArgMineError::json(path, e))
    }
}
