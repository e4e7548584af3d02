//! # Handle de Observabilidade por Execução
//!
//! Em vez de um logger global, cada execução cria um [`RunLog`] e o repassa
//! explicitamente a todos os componentes que emitem diagnósticos.
//! O handle carrega um `tracing::Span` com o contexto da execução (tarefa e
//! tag do dataset); cada estágio abre um span filho via [`RunLog::stage`].
//!
//! ```rust
//! use argmine_core::observe::RunLog;
//!
//! let log = RunLog::new("detection", "uni+bi+stats");
//! let split_log = log.stage("split");
//! let _guard = split_log.enter();
//! tracing::info!(train = 80, test = 20, "partição concluída");
//! ```

use tracing::span::Entered;
use tracing::Span;

/// Contexto de log de uma execução. Barato de clonar.
#[derive(Debug, Clone)]
pub struct RunLog {
    span: Span,
}

impl RunLog {
    /// Cria o span raiz de uma execução.
    pub fn new(task: &str, dataset_tag: &str) -> Self {
        Self {
            span: tracing::info_span!("experiment", task, dataset = dataset_tag),
        }
    }

    /// Handle sem span (testes e uso avulso da biblioteca).
    pub fn detached() -> Self {
        Self { span: Span::none() }
    }

    /// Span filho para um estágio do pipeline.
    pub fn stage(&self, name: &'static str) -> RunLog {
        Self {
            span: tracing::info_span!(parent: &self.span, "stage", name),
        }
    }

    /// Entra no span; os eventos emitidos enquanto o guard vive ficam associados a ele.
    pub fn enter(&self) -> Entered<'_> {
        self.span.enter()
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::detached()
    }
}
