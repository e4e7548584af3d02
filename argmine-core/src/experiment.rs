//! # Orquestrador de Experimentos
//!
//! Executa uma rodada completa e emite um [`ExperimentEvent`] a cada etapa
//! concluída, via canal `mpsc`:
//!
//! ```text
//! dataset (cache ou montagem) → rótulos → partição → pipeline
//!     → treino (direto ou busca em grade) → [validação cruzada]
//!     → avaliação → registro de métricas → artefato
//! ```
//!
//! Cada etapa loga dentro do seu próprio span, filho do [`RunLog`] recebido.

use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::artifact::ModelArtifact;
use crate::config::ExperimentConfig;
use crate::corpus::{read_feature_store, read_label_store};
use crate::dataset::{fingerprint, Dataset, DatasetCache};
use crate::error::Result;
use crate::evaluate::{cross_validate, evaluate, train_direct, train_tuned, ErrorAnalysis, Evaluation};
use crate::features::{FeatureAssembler, FeatureConfig};
use crate::labels::{LabelCodec, LabelDict, LabelOrderings};
use crate::ledger::{LedgerEntry, MetricsLedger};
use crate::lexicon::{Language, Lexicon};
use crate::metrics::classification_report;
use crate::observe::RunLog;
use crate::pipeline::{self, FittedPipeline};
use crate::search::CvSummary;
use crate::split::{split, TrainingSet};

/// Eventos emitidos durante a execução.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ExperimentEvent {
    DatasetReady {
        rows: usize,
        columns: usize,
        sparsity: f64,
        from_cache: bool,
    },
    LabelsEncoded {
        labels: Vec<String>,
    },
    SplitDone {
        train: usize,
        test: usize,
    },
    CandidateScored {
        index: usize,
        total: usize,
        params: Value,
        mean: f64,
        std: f64,
    },
    ModelTrained {
        algorithm: String,
        stages: Vec<String>,
        params: Value,
    },
    /// Relatório de validação cruzada sobre o conjunto de treino.
    CrossValidated {
        report: String,
    },
    Evaluated {
        accuracy: f64,
        precision: f64,
        recall: f64,
        f1: f64,
        roc_auc: f64,
        report: String,
    },
    Persisted {
        model_id: u64,
        artifact: PathBuf,
        elapsed_ms: u64,
    },
}

/// Resultado de uma execução completa.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub model_id: u64,
    pub artifact_path: PathBuf,
    pub dataset_from_cache: bool,
    pub label_dict: LabelDict,
    pub best_params: Option<Map<String, Value>>,
    pub cv: Option<CvSummary>,
    pub evaluation: Evaluation,
}

/// O que define o conteúdo do dataset em cache.
#[derive(Serialize)]
struct DatasetIdentity<'a> {
    features: &'a FeatureConfig,
    target_field: &'a str,
    language: Language,
}

pub struct Experiment {
    config: ExperimentConfig,
}

impl Experiment {
    pub fn new(config: ExperimentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Impressão digital da configuração que gera o dataset.
    pub fn dataset_fingerprint(&self) -> Result<String> {
        fingerprint(&DatasetIdentity {
            features: &self.config.features,
            target_field: &self.config.task.target_field,
            language: self.config.lexicon.language,
        })
    }

    /// Lê o dataset do cache ou o monta a partir do corpus.
    ///
    /// Retorna o dataset e se ele veio do cache.
    pub fn build_dataset(&self, log: &RunLog) -> Result<(Dataset, bool)> {
        let stage = log.stage("dataset");
        let data = &self.config.data;
        let cache = DatasetCache::new(data.dataset_path());

        let (dataset, from_cache) =
            cache.load_or_build(&self.dataset_fingerprint()?, data.force_rebuild, &stage, || {
                let features = read_feature_store(&data.features_path())?;
                let labels = read_label_store(&data.labels_path())?;
                let lexicon = Lexicon::load(
                    &self.config.lexicon.stopwords_dir,
                    self.config.lexicon.language,
                    &stage,
                );
                FeatureAssembler::new(&self.config.features, &lexicon).build(
                    &features,
                    &labels.records,
                    &self.config.task.target_field,
                    &stage,
                )
            })?;

        let _guard = stage.enter();
        info!(
            rows = dataset.n_rows(),
            columns = dataset.n_columns(),
            sparsity = dataset.sparsity(),
            from_cache,
            "dataset pronto"
        );
        Ok((dataset, from_cache))
    }

    /// Executa sem consumidor de eventos.
    pub fn run(&self, log: &RunLog) -> Result<RunOutcome> {
        let (tx, _rx) = mpsc::channel();
        self.run_streaming(log, tx)
    }

    pub fn run_streaming(&self, log: &RunLog, tx: mpsc::Sender<ExperimentEvent>) -> Result<RunOutcome> {
        let start = Instant::now();
        let config = &self.config;
        let task = config.task.task_type;

        // 1. Dataset
        let (dataset, from_cache) = self.build_dataset(log)?;
        let _ = tx.send(ExperimentEvent::DatasetReady {
            rows: dataset.n_rows(),
            columns: dataset.n_columns(),
            sparsity: dataset.sparsity(),
            from_cache,
        });

        // 2. Rótulos
        let labels_log = log.stage("labels");
        let target_field = config.task.target_field.as_str();
        let mut orderings = match &config.output.label_dict {
            Some(path) => LabelOrderings::load(path)?,
            None => LabelOrderings::default(),
        };
        let codec = match orderings.get(task, target_field) {
            Some(dict) => {
                let _guard = labels_log.enter();
                info!(target_field, "usando ordem de rótulos persistida");
                LabelCodec::with_ordering(dict.clone())
            }
            None => LabelCodec::new(),
        };
        let encoded = codec.encode(task, &dataset.labels, &labels_log)?;
        let class_names = encoded.dict.labels().to_vec();
        let _ = tx.send(ExperimentEvent::LabelsEncoded {
            labels: class_names.clone(),
        });

        // 3. Partição
        let data = TrainingSet::new(&dataset, &encoded)?;
        let parts = split(
            &data,
            config.split.test_fraction,
            config.split.seed,
            config.split.stratified,
        )?;
        {
            let split_log = log.stage("split");
            let _guard = split_log.enter();
            info!(
                train = parts.y_train.len(),
                test = parts.y_test.len(),
                stratified = config.split.stratified,
                "partição concluída"
            );
        }
        let _ = tx.send(ExperimentEvent::SplitDone {
            train: parts.y_train.len(),
            test: parts.y_test.len(),
        });

        // 4. Pipeline e treino
        let train_log = log.stage("train");
        let base = pipeline::build(&config.pipeline, &config.model_params, &encoded.dict)?;
        let (fitted, best_params, cv): (FittedPipeline, Option<Map<String, Value>>, Option<CvSummary>) =
            if config.tuning.enabled {
                let tuned = train_tuned(
                    &base,
                    &parts.x_train,
                    &parts.y_train,
                    &config.tuning.param_grid,
                    config.tuning.cv_folds,
                    config.scoring(),
                    config.tuning.n_jobs,
                    config.split.seed,
                    &train_log,
                )?;
                let total = tuned.cv.candidates.len();
                for (index, candidate) in tuned.cv.candidates.iter().enumerate() {
                    let _ = tx.send(ExperimentEvent::CandidateScored {
                        index,
                        total,
                        params: Value::Object(candidate.params.clone()),
                        mean: candidate.mean,
                        std: candidate.std,
                    });
                }
                (tuned.fitted, Some(tuned.best_params), Some(tuned.cv))
            } else {
                (train_direct(&base, &parts.x_train, &parts.y_train)?, None, None)
            };

        let stages: Vec<String> = fitted.stage_names().iter().map(|s| s.to_string()).collect();
        {
            let _guard = train_log.enter();
            info!(
                algorithm = %fitted.algorithm(),
                stages = %stages.join(" → "),
                params = %fitted.effective_params(),
                "modelo treinado"
            );
        }
        let _ = tx.send(ExperimentEvent::ModelTrained {
            algorithm: fitted.algorithm().to_string(),
            stages,
            params: fitted.effective_params(),
        });

        // 5. Validação cruzada opcional sobre o treino
        if config.tuning.validation_report {
            let tuned_base = match &best_params {
                Some(params) => base.with_params(params)?,
                None => base.clone(),
            };
            let predicted = cross_validate(
                &tuned_base,
                &parts.x_train,
                &parts.y_train,
                config.tuning.cv_folds,
                config.split.seed,
            )?;
            let report = classification_report(&parts.y_train, &predicted, &class_names);
            {
                let _guard = train_log.enter();
                info!("validação cruzada no treino:\n{report}");
            }
            let _ = tx.send(ExperimentEvent::CrossValidated { report });
        }

        // 6. Avaliação
        let eval_log = log.stage("evaluate");
        let evaluation = evaluate(
            &fitted,
            &parts.x_test,
            &parts.y_test,
            &parts.test_indices,
            task,
            &class_names,
        )?;
        {
            let _guard = eval_log.enter();
            let m = &evaluation.metrics;
            info!(
                accuracy = m.accuracy,
                precision = m.precision,
                recall = m.recall,
                f1 = m.f1,
                roc_auc = m.roc_auc,
                "avaliação no teste"
            );
            debug!("matriz de confusão: {:?}", m.confusion_matrix);
            debug!("relatório de classificação:\n{}", m.report);
            match &evaluation.errors {
                ErrorAnalysis::Binary(index) => info!(
                    type1 = index.type1.len(),
                    type2 = index.type2.len(),
                    "registros mal rotulados"
                ),
                ErrorAnalysis::MultiClass(breakdown) => {
                    info!(errors = breakdown.total(), "confusões entre classes");
                    for ((actual, predicted), ids) in &breakdown.pairs {
                        debug!(
                            actual = %class_names[*actual],
                            predicted = %class_names[*predicted],
                            count = ids.len(),
                            "confusão"
                        );
                    }
                }
            }
        }
        let m = &evaluation.metrics;
        let _ = tx.send(ExperimentEvent::Evaluated {
            accuracy: m.accuracy,
            precision: m.precision,
            recall: m.recall,
            f1: m.f1,
            roc_auc: m.roc_auc,
            report: m.report.clone(),
        });

        // 7. Persistência
        let persist_log = log.stage("persist");
        let ledger = MetricsLedger::new(&config.output.ledger);
        let ledger_config = json!({
            "pipeline": config.pipeline,
            "params": fitted.effective_params(),
            "tuned": best_params.is_some(),
        });
        let entry = LedgerEntry::new(task.name(), &config.features.tag(), &ledger_config, m);
        let model_id = ledger.append(&entry)?;

        let artifact = ModelArtifact::new(model_id, task, encoded.dict.clone(), fitted);
        let artifact_path = artifact.save(&config.output.model_dir)?;
        let dict_path = config
            .output
            .model_dir
            .join(format!("{model_id}_{}_labels.json", artifact.algorithm.short_name()));
        encoded.dict.save(&dict_path)?;
        if let Some(path) = &config.output.label_dict {
            orderings.insert(task, target_field, encoded.dict.clone());
            orderings.save(path)?;
        }
        {
            let _guard = persist_log.enter();
            info!(
                model_id,
                ledger = %ledger.path().display(),
                artifact = %artifact_path.display(),
                "resultados persistidos"
            );
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let _ = tx.send(ExperimentEvent::Persisted {
            model_id,
            artifact: artifact_path.clone(),
            elapsed_ms,
        });

        Ok(RunOutcome {
            model_id,
            artifact_path,
            dataset_from_cache: from_cache,
            label_dict: encoded.dict,
            best_params,
            cv,
            evaluation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataConfig, OutputConfig};
    use crate::dataset::LABEL_COLUMN;
    use crate::error::ArgMineError;
    use crate::labels::TaskType;
    use crate::ledger::MetricsLedger;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Corpus de detecção com vocabulários disjuntos por classe.
    fn write_corpus(dir: &Path) {
        let mut features = Vec::new();
        let mut labels = String::from("sent_id,sent_text,sent_label\n");
        for i in 0..12 {
            let id = format!("s{i}");
            let (tokens, label) = if i % 2 == 0 {
                (vec!["because", "therefore", "must"], "yes")
            } else {
                (vec!["hello", "weather", "today"], "no")
            };
            features.push(json!({ "id": id, "unigrams": tokens }));
            labels.push_str(&format!("{id},texto {i},{label}\n"));
        }
        fs::write(dir.join("features.json"), Value::Array(features).to_string()).unwrap();
        fs::write(dir.join("labels.csv"), labels).unwrap();
    }

    fn config_in(dir: &Path) -> ExperimentConfig {
        let mut config = ExperimentConfig {
            data: DataConfig {
                dir: dir.join("data"),
                ..Default::default()
            },
            output: OutputConfig {
                model_dir: dir.join("models"),
                ledger: dir.join("results").join("metrics.csv"),
                label_dict: Some(dir.join("models").join("labels.json")),
            },
            ..Default::default()
        };
        config.split.test_fraction = 0.25;
        config.lexicon.stopwords_dir = dir.join("stopwords");
        config
    }

    #[test]
    fn test_full_run_and_cache_reuse() {
        let tmp = TempDir::new().unwrap();
        let data_dir = tmp.path().join("data");
        fs::create_dir_all(&data_dir).unwrap();
        write_corpus(&data_dir);

        let experiment = Experiment::new(config_in(tmp.path()));
        let (tx, rx) = mpsc::channel();
        let outcome = experiment.run_streaming(&RunLog::detached(), tx).unwrap();

        assert_eq!(outcome.model_id, 1);
        assert!(!outcome.dataset_from_cache);
        assert!(outcome.artifact_path.ends_with("1_nb_model.json"));
        assert_eq!(outcome.label_dict.labels(), ["no", "yes"]);
        assert_eq!(outcome.evaluation.metrics.accuracy, 1.0);
        assert_eq!(outcome.evaluation.predictions.len(), 3);

        let events: Vec<ExperimentEvent> = rx.try_iter().collect();
        assert!(matches!(events.first(), Some(ExperimentEvent::DatasetReady { rows: 12, .. })));
        assert!(matches!(events.last(), Some(ExperimentEvent::Persisted { model_id: 1, .. })));

        let loaded = ModelArtifact::load(&outcome.artifact_path).unwrap();
        assert_eq!(loaded.label_dict, outcome.label_dict);
        assert!(tmp.path().join("models").join("1_nb_labels.json").exists());
        assert!(tmp.path().join("models").join("labels.json").exists());

        let dataset = Dataset::read_csv(&data_dir.join("dataset.csv")).unwrap();
        assert_eq!(dataset.n_rows(), 12);
        assert!(dataset.column_index(LABEL_COLUMN).is_none());

        let second = experiment.run(&RunLog::detached()).unwrap();
        assert_eq!(second.model_id, 2);
        assert!(second.dataset_from_cache);

        let rows = MetricsLedger::new(tmp.path().join("results").join("metrics.csv"))
            .entries()
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].entry.task, "detection");
        assert_eq!(rows[0].entry.dataset, "uni");
    }

    #[test]
    fn test_changed_features_make_cache_stale() {
        let tmp = TempDir::new().unwrap();
        let data_dir = tmp.path().join("data");
        fs::create_dir_all(&data_dir).unwrap();
        write_corpus(&data_dir);

        let config = config_in(tmp.path());
        Experiment::new(config.clone())
            .build_dataset(&RunLog::detached())
            .unwrap();

        let mut changed = config.clone();
        changed.features.bigrams = true;
        let err = Experiment::new(changed.clone())
            .build_dataset(&RunLog::detached())
            .unwrap_err();
        assert!(matches!(err, ArgMineError::StaleCache { .. }));

        changed.data.force_rebuild = true;
        let (_, from_cache) = Experiment::new(changed)
            .build_dataset(&RunLog::detached())
            .unwrap();
        assert!(!from_cache);
    }

    #[test]
    fn test_tuned_run_reports_candidates() {
        let tmp = TempDir::new().unwrap();
        let data_dir = tmp.path().join("data");
        fs::create_dir_all(&data_dir).unwrap();
        write_corpus(&data_dir);

        let mut config = config_in(tmp.path());
        config.tuning.enabled = true;
        config.tuning.cv_folds = 3;
        config.tuning.validation_report = true;
        config
            .tuning
            .param_grid
            .insert("alpha", vec![json!(0.5), json!(1.0)]);

        let (tx, rx) = mpsc::channel();
        let outcome = Experiment::new(config)
            .run_streaming(&RunLog::detached(), tx)
            .unwrap();
        assert_eq!(outcome.cv.as_ref().map(|cv| cv.candidates.len()), Some(2));
        assert!(outcome.best_params.is_some());

        let events: Vec<ExperimentEvent> = rx.try_iter().collect();
        let scored = events
            .iter()
            .filter(|e| matches!(e, ExperimentEvent::CandidateScored { .. }))
            .count();
        assert_eq!(scored, 2);
        assert!(events
            .iter()
            .any(|e| matches!(e, ExperimentEvent::CrossValidated { .. })));
    }

    #[test]
    fn test_label_ordering_is_not_shared_across_tasks() {
        let tmp = TempDir::new().unwrap();
        let data_dir = tmp.path().join("data");
        fs::create_dir_all(&data_dir).unwrap();
        write_corpus(&data_dir);

        let config = config_in(tmp.path());
        let detection = Experiment::new(config.clone()).run(&RunLog::detached()).unwrap();
        assert_eq!(detection.label_dict.labels(), ["no", "yes"]);

        // mesmo corpus, agora com tipos de componente argumentativo
        let mut labels = String::from("sent_id,sent_text,sent_label\n");
        for i in 0..12 {
            let kind = if i % 2 == 0 { "claim" } else { "premise" };
            labels.push_str(&format!("s{i},texto {i},{kind}\n"));
        }
        fs::write(data_dir.join("labels.csv"), labels).unwrap();

        let mut classification = config.clone();
        classification.task.task_type = TaskType::Classification;
        classification.data.force_rebuild = true;
        let outcome = Experiment::new(classification.clone())
            .run(&RunLog::detached())
            .unwrap();
        assert_eq!(outcome.label_dict.labels(), ["claim", "premise"]);
        assert_eq!(outcome.evaluation.metrics.confusion_matrix.len(), 2);

        let stored = LabelOrderings::load(&tmp.path().join("models").join("labels.json")).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(
            stored.get(TaskType::Detection, "sent_label").map(LabelDict::labels),
            Some(&["no".to_string(), "yes".to_string()][..])
        );

        let again = Experiment::new(classification).run(&RunLog::detached()).unwrap();
        assert_eq!(again.label_dict.labels(), ["claim", "premise"]);
    }

    #[test]
    fn test_missing_corpus_fails() {
        let tmp = TempDir::new().unwrap();
        let err = Experiment::new(config_in(tmp.path()))
            .run(&RunLog::detached())
            .unwrap_err();
        assert!(matches!(err, ArgMineError::Io { .. }));
    }
}
