use statespace_core::StepError;
use statespace_script::ModelError;
use thiserror::Error;

use crate::export::ExportError;

/// Errors surfaced by an exploration run.
#[derive(Error, Debug)]
pub enum ExploreError {
    /// A collaborator failed on the caller's thread.
    #[error("exploration step failed: {0}")]
    Step(#[from] StepError),

    /// The first collaborator failure raised by a worker thread.
    #[error("exploration worker {worker} failed")]
    Worker {
        worker: usize,
        #[source]
        source: StepError,
    },

    #[error("failed to spawn exploration worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("export error: {0}")]
    Export(#[from] ExportError),
}

impl ExploreError {
    /// The collaborator failure behind this error, if there is one.
    pub fn step_error(&self) -> Option<&StepError> {
        match self {
            ExploreError::Step(source) | ExploreError::Worker { source, .. } => Some(source),
            _ => None,
        }
    }
}
