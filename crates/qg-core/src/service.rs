//! The external text generation service, as the pipeline sees it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

/// Why a generation request failed.
///
/// The adapter for a concrete service decides the kind at the boundary
/// (HTTP status, provider error code). The pipeline branches on this and
/// nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceErrorKind {
    /// Quota or request rate exhausted; retryable
    Throttling,
    /// Anything else; not retryable
    Fatal,
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceErrorKind::Throttling => write!(f, "throttled"),
            ServiceErrorKind::Fatal => write!(f, "service error"),
        }
    }
}

/// A failed call to the generation service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl ServiceError {
    /// Quota or rate exhaustion.
    pub fn throttled(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Throttling,
            message: message.into(),
        }
    }

    /// Non-retryable failure.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Fatal,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_throttling(&self) -> bool {
        self.kind == ServiceErrorKind::Throttling
    }
}

/// Capability to turn a prompt into generated text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError>;

    /// Short name for logs.
    fn name(&self) -> &str {
        "generator"
    }
}

#[async_trait]
impl<G: TextGenerator + ?Sized> TextGenerator for Arc<G> {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        (**self).generate(prompt).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
