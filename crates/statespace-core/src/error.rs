use thiserror::Error;

/// Failures a collaborator can report from a step.
#[derive(Error, Debug)]
pub enum StepError {
    /// Cooperative cancellation. Engines stop cleanly and do not mark the
    /// exploration done.
    #[error("exploration aborted")]
    Aborted,

    /// The abstraction cannot decide something needed to continue.
    #[error("insufficient precision: {0}")]
    InsufficientPrecision(String),

    #[error("model error: {0}")]
    Model(String),
}

impl StepError {
    pub fn is_abort(&self) -> bool {
        matches!(self, StepError::Aborted)
    }
}
