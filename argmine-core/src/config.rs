//! # Configuração do Experimento
//!
//! Lida de um arquivo JSON (`config/config.json` por padrão). Todas as
//! seções têm valores padrão, então um objeto parcial (ou `{}`) é válido:
//!
//! ```json
//! {
//!   "data": { "dir": "data", "features_file": "features.json" },
//!   "task": { "type": "classification", "target_field": "sent_label" },
//!   "features": { "unigrams": true, "bigrams": true, "struct_stats": true },
//!   "pipeline": { "scaling": "standard", "classifier": "lr" },
//!   "model_params": { "C": 2.0, "max_iter": 300 },
//!   "tuning": { "enabled": true, "param_grid": { "C": [0.5, 1.0, 2.0] } }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ArgMineError, Result};
use crate::features::FeatureConfig;
use crate::labels::TaskType;
use crate::lexicon::Language;
use crate::pipeline::PipelineConfig;
use crate::search::{ParamGrid, Scoring};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub dir: PathBuf,
    pub features_file: String,
    pub labels_file: String,
    /// Cache do dataset montado (CSV), relativo a `dir`.
    pub dataset_file: String,
    pub force_rebuild: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            features_file: "features.json".into(),
            labels_file: "labels.csv".into(),
            dataset_file: "dataset.csv".into(),
            force_rebuild: false,
        }
    }
}

impl DataConfig {
    pub fn features_path(&self) -> PathBuf {
        self.dir.join(&self.features_file)
    }

    pub fn labels_path(&self) -> PathBuf {
        self.dir.join(&self.labels_file)
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.dir.join(&self.dataset_file)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexiconConfig {
    pub language: Language,
    /// Diretório com um `<idioma>.txt` por idioma.
    pub stopwords_dir: PathBuf,
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            stopwords_dir: PathBuf::from("data/stopwords"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    #[serde(rename = "type")]
    pub task_type: TaskType,
    /// Coluna do arquivo de rótulos usada como alvo.
    pub target_field: String,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            task_type: TaskType::default(),
            target_field: "sent_label".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub test_fraction: f64,
    pub seed: u64,
    pub stratified: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            stratified: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    pub enabled: bool,
    pub param_grid: ParamGrid,
    pub cv_folds: usize,
    /// Ausente: F1 ponderado na detecção, F1 micro nas demais tarefas.
    pub scoring: Option<Scoring>,
    /// Threads da busca em grade; 0 usa o padrão do rayon.
    pub n_jobs: usize,
    /// Relatório de validação cruzada sobre o treino antes do teste.
    pub validation_report: bool,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            param_grid: ParamGrid::default(),
            cv_folds: 5,
            scoring: None,
            n_jobs: 0,
            validation_report: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub model_dir: PathBuf,
    pub ledger: PathBuf,
    /// Ordem canônica de rótulos: lida se existir, gravada após o treino.
    pub label_dict: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            ledger: PathBuf::from("results/metrics.csv"),
            label_dict: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub data: DataConfig,
    pub lexicon: LexiconConfig,
    pub task: TaskConfig,
    pub features: FeatureConfig,
    pub split: SplitConfig,
    pub pipeline: PipelineConfig,
    pub model_params: Map<String, Value>,
    pub tuning: TuningConfig,
    pub output: OutputConfig,
    /// Arquivo de log detalhado (nível `debug`).
    pub log_file: Option<PathBuf>,
}

impl ExperimentConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ArgMineError::io(path, e))?;
        let config: Self = serde_json::from_str(&content).map_err(|e| ArgMineError::json(path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Verificações que o serde sozinho não cobre.
    pub fn validate(&self) -> Result<()> {
        let fraction = self.split.test_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(ArgMineError::Config(format!(
                "split.test_fraction deve estar em (0, 1), recebido {fraction}"
            )));
        }
        if self.task.target_field.trim().is_empty() {
            return Err(ArgMineError::Config("task.target_field vazio".into()));
        }
        if self.tuning.enabled {
            if self.tuning.param_grid.n_candidates() == 0 {
                return Err(ArgMineError::Config(
                    "tuning.enabled exige tuning.param_grid não vazia".into(),
                ));
            }
            if self.tuning.cv_folds < 2 {
                return Err(ArgMineError::Config("tuning.cv_folds deve ser ao menos 2".into()));
            }
        }
        Ok(())
    }

    pub fn scoring(&self) -> Scoring {
        self.tuning
            .scoring
            .unwrap_or_else(|| Scoring::default_for(self.task.task_type))
    }
}
