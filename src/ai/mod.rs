#![forbid(unsafe_code)]

//! Turning a free-text goal into a batch of to-do items with an LLM.
//!
//! The request asks the service for schema-constrained JSON rather than
//! prose, and every way the call can go wrong collapses into one
//! [`GenerationError`] whose message is fit to show the user.

pub mod gemini;
pub mod schema;

use async_trait::async_trait;
use thiserror::Error;

pub use gemini::GeminiClient;

/// One validated item from a generation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedTask {
    pub text: String,
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationFailureKind {
    /// Transport failure or a non-success status from the service.
    Service,
    EmptyResponse,
    /// Not JSON, or JSON without a `tasks` array.
    MalformedResponse,
}

impl GenerationFailureKind {
    #[must_use]
    pub fn user_message(self) -> &'static str {
        match self {
            Self::Service => {
                "Failed to generate tasks. The AI service might be unavailable or the API key may be invalid."
            }
            Self::EmptyResponse => "Failed to generate tasks. Received an empty response from the AI.",
            Self::MalformedResponse => {
                "Failed to generate tasks. The AI response was not in the expected format."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .kind.user_message())]
pub struct GenerationError {
    pub kind: GenerationFailureKind,
    /// Low-level cause, for the log only.
    pub detail: String,
}

impl GenerationError {
    pub fn service(detail: impl Into<String>) -> Self {
        Self {
            kind: GenerationFailureKind::Service,
            detail: detail.into(),
        }
    }

    pub fn empty_response() -> Self {
        Self {
            kind: GenerationFailureKind::EmptyResponse,
            detail: "response text was empty".to_owned(),
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self {
            kind: GenerationFailureKind::MalformedResponse,
            detail: detail.into(),
        }
    }
}

/// Anything that can expand a goal into tasks. Implementations make exactly
/// one attempt per call.
#[async_trait]
pub trait TaskGenerator: Send + Sync {
    async fn generate(&self, goal: &str) -> Result<Vec<GeneratedTask>, GenerationError>;
}
