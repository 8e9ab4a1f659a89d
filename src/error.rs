use thiserror::Error;

use crate::llm::{LlmError, ParseError};
use crate::stage::Stage;

#[derive(Debug, Error)]
pub enum AdvisorError {
    /// Bad caller input; nothing was written.
    #[error("invalid input: {0}")]
    Validation(String),
    /// Scoring was asked for something that is not set up, e.g. an unnamed aspiration.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("operation requires {required:?} but the advisor is in {current:?}")]
    Stage { current: Stage, required: Stage },
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("could not parse model response: {0}")]
    Parse(String),
    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl AdvisorError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        AdvisorError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Text suitable for a user-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            AdvisorError::Llm(err) => err.user_message(),
            AdvisorError::Storage(_) => "Could not save your data. Storage may be full.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<ParseError> for AdvisorError {
    fn from(err: ParseError) -> Self {
        AdvisorError::Parse(err.to_string())
    }
}

pub type AdvisorResult<T> = Result<T, AdvisorError>;
