use statespace_core::TimeError;
use thiserror::Error;

/// Errors from loading or validating a scripted model.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("time error: {0}")]
    Time(#[from] TimeError),

    #[error("duplicate process '{0}'")]
    DuplicateProcess(String),

    #[error("unknown function '{name}' called from {location}")]
    UnknownFunction { name: String, location: String },

    #[error("jump target {target} out of range at {location}")]
    JumpOutOfRange { target: usize, location: String },

    #[error("invalid statement at {location}: {reason}")]
    InvalidStatement { location: String, reason: String },
}
