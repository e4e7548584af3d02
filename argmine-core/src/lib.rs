//! # argmine-core — Pipeline de Experimentos de Mineração de Argumentos
//!
//! Este crate transforma features linguísticas pré-computadas de sentenças
//! em datasets tabulares, treina classificadores clássicos e registra os
//! resultados de cada experimento.
//!
//! ## Arquitetura
//!
//! Cada execução percorre as etapas abaixo, em ordem:
//!
//! 1.  **Leitura** ([`corpus`]): features (JSON) e rótulos (CSV) alinhados por id.
//! 2.  **Montagem** ([`features`], [`lexicon`]): grupos de tokens vetorizados
//!     (com stopwords e stemming opcionais) + estatísticas numéricas.
//! 3.  **Cache** ([`dataset`]): o dataset é gravado em CSV com a impressão
//!     digital da configuração que o gerou.
//! 4.  **Rótulos** ([`labels`]): texto → códigos inteiros, por tarefa.
//! 5.  **Partição** ([`split`]): treino/teste reprodutível, opcionalmente estratificado.
//! 6.  **Pipeline** ([`pipeline`], [`preprocess`], [`estimators`]):
//!     escalonador → redutor → binarizador → classificador.
//! 7.  **Treino e avaliação** ([`search`], [`evaluate`], [`metrics`]).
//! 8.  **Persistência** ([`ledger`], [`artifact`]).
//!
//! O [`experiment`] orquestra tudo e emite eventos de progresso; o
//! [`observe::RunLog`] leva o contexto de log a cada componente.
//!
//! ## Exemplo de Uso
//!
//! ```rust,no_run
//! use std::path::Path;
//! use argmine_core::{Experiment, ExperimentConfig, RunLog};
//!
//! let config = ExperimentConfig::load(Path::new("config/config.json"))?;
//! let log = RunLog::new(config.task.task_type.name(), &config.features.tag());
//!
//! let outcome = Experiment::new(config).run(&log)?;
//! println!("modelo {}: F1 = {:.3}", outcome.model_id, outcome.evaluation.metrics.f1);
//! # Ok::<(), argmine_core::ArgMineError>(())
//! ```

pub mod artifact;
pub mod config;
pub mod corpus;
pub mod dataset;
pub mod error;
pub mod estimators;
pub mod evaluate;
pub mod experiment;
pub mod features;
pub mod labels;
pub mod ledger;
pub mod lexicon;
pub mod linalg;
pub mod metrics;
pub mod observe;
pub mod pipeline;
pub mod preprocess;
pub mod search;
pub mod split;

pub use config::ExperimentConfig;
pub use dataset::Dataset;
pub use error::{ArgMineError, Result};
pub use estimators::{Classifier, ClassifierKind, Estimator};
pub use experiment::{Experiment, ExperimentEvent, RunOutcome};
pub use features::FeatureConfig;
pub use labels::{LabelDict, LabelOrderings, TaskType};
pub use observe::RunLog;
pub use pipeline::{FittedPipeline, ModelPipeline, PipelineConfig};
