//! CLI do argmine: carrega a configuração JSON, instala o subscriber de
//! tracing e executa um experimento, exibindo os eventos de progresso.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Mutex};
use std::thread;

use anyhow::{Context, Result};
use argmine_core::{Experiment, ExperimentConfig, ExperimentEvent, RunLog};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Experimentos de mineração de argumentos sobre features pré-computadas
#[derive(Parser, Debug)]
#[command(name = "argmine")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log em nível debug no console
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Executa um experimento completo: dataset, treino, avaliação e persistência
    Run(ConfigArgs),
    /// Apenas monta (ou lê do cache) o dataset e mostra sua forma
    Dataset(ConfigArgs),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Arquivo de configuração JSON
    #[arg(short, long, default_value = "config/config.json")]
    config: PathBuf,

    /// Ignora o dataset em cache e o remonta
    #[arg(long)]
    force_rebuild: bool,
}

impl Command {
    fn args(&self) -> &ConfigArgs {
        match self {
            Command::Run(args) | Command::Dataset(args) => args,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let args = cli.command.args();

    let loaded = ExperimentConfig::load(&args.config);
    let log_file = loaded.as_ref().ok().and_then(|c| c.log_file.clone());
    init_tracing(cli.verbose, log_file.as_deref())?;

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!("configuração indisponível, execução ignorada: {e}");
            return Ok(());
        }
    };
    config.data.force_rebuild |= args.force_rebuild;

    let log = RunLog::new(config.task.task_type.name(), &config.features.tag());
    let experiment = Experiment::new(config);

    match cli.command {
        Command::Run(_) => run(&experiment, &log),
        Command::Dataset(_) => dataset(&experiment, &log),
    }
}

/// Console em `info` (ou `debug` com `--verbose`; `RUST_LOG` prevalece) e,
/// se configurado, um arquivo recebendo tudo a partir de `debug`.
fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let console = fmt::layer().with_writer(std::io::stderr).with_filter(filter);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("criando diretório de log {}", parent.display()))?;
            }
            let file = File::create(path).with_context(|| format!("abrindo log {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry().with(console).with(file_layer).init();
    Ok(())
}

fn run(experiment: &Experiment, log: &RunLog) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let renderer = thread::spawn(move || {
        for event in rx {
            render(&event);
        }
    });

    let outcome = experiment.run_streaming(log, tx);
    // O sender foi consumido pela execução; o renderizador termina sozinho.
    let _ = renderer.join();

    let outcome = outcome.context("falha na execução do experimento")?;
    info!(
        model_id = outcome.model_id,
        artifact = %outcome.artifact_path.display(),
        "experimento concluído"
    );
    Ok(())
}

fn dataset(experiment: &Experiment, log: &RunLog) -> Result<()> {
    let (dataset, from_cache) = experiment
        .build_dataset(log)
        .context("falha ao montar o dataset")?;
    println!(
        "dataset: {} linhas × {} colunas, esparsidade {:.2}%{}",
        dataset.n_rows(),
        dataset.n_columns(),
        dataset.sparsity() * 100.0,
        if from_cache { " (cache)" } else { "" }
    );
    Ok(())
}

fn render(event: &ExperimentEvent) {
    match event {
        ExperimentEvent::DatasetReady {
            rows,
            columns,
            sparsity,
            from_cache,
        } => println!(
            "📦 dataset {rows}×{columns}, esparsidade {:.2}%{}",
            sparsity * 100.0,
            if *from_cache { " (cache)" } else { "" }
        ),
        ExperimentEvent::LabelsEncoded { labels } => {
            println!("🏷️  rótulos: {}", labels.join(", "))
        }
        ExperimentEvent::SplitDone { train, test } => println!("✂️  treino {train} / teste {test}"),
        ExperimentEvent::CandidateScored {
            index,
            total,
            params,
            mean,
            std,
        } => println!("🔎 [{}/{total}] {params} → {mean:.4} ± {std:.4}", index + 1),
        ExperimentEvent::ModelTrained {
            algorithm,
            stages,
            params,
        } => {
            println!("🧠 {algorithm}: {}", stages.join(" → "));
            if let Ok(pretty) = serde_json::to_string_pretty(params) {
                println!("{pretty}");
            }
        }
        ExperimentEvent::CrossValidated { report } => {
            println!("🔁 validação cruzada no treino:\n{report}")
        }
        ExperimentEvent::Evaluated {
            accuracy,
            precision,
            recall,
            f1,
            roc_auc,
            report,
        } => {
            println!(
                "📊 acc {accuracy:.4}  prec {precision:.4}  rec {recall:.4}  f1 {f1:.4}  auc {roc_auc:.4}"
            );
            println!("{report}");
        }
        ExperimentEvent::Persisted {
            model_id,
            artifact,
            elapsed_ms,
        } => println!("💾 modelo {model_id} em {} ({elapsed_ms} ms)", artifact.display()),
    }
}
