//! Top-level error for CLI flows.

use qg_core::SpecError;

use crate::client::ClientError;
use crate::document::ReadError;
use crate::limits::ConfigError;
use crate::logging::LoggingError;
use crate::pipeline::GenerationFailure;
use crate::report::WriteError;

/// Any error a generation command can end with.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("Specification error: {0}")]
    Spec(#[from] SpecError),

    #[error("Document error: {0}")]
    Read(#[from] ReadError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error(transparent)]
    Generation(#[from] GenerationFailure),

    #[error("Output error: {0}")]
    Write(#[from] WriteError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("User story has no \"As a ..., I want to ..., So that ...\" statement")]
    NoStory,
}

impl GeneratorError {
    /// Failing specification index and type, when a generation run failed.
    #[must_use]
    pub fn failed_specification(&self) -> Option<(usize, &str)> {
        match self {
            GeneratorError::Generation(failure) => Some((failure.index, failure.case_type.as_str())),
            _ => None,
        }
    }
}
