//! Error taxonomy shared by the history store and the detail composer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failure reported by the backend-as-a-service.
///
/// The message is kept exactly as the backend produced it; this crate never
/// rewrites backend text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), code: None }
    }

    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self { message: message.into(), code: Some(code.into()) }
    }
}

/// Local persistence failure. History treats these as best effort.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("storage error: {0}")]
pub struct StorageError(pub String);

impl From<lmdb::Error> for StorageError {
    fn from(err: lmdb::Error) -> Self {
        StorageError(format!("LMDB error: {err}"))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError(format!("JSON serialization error: {err}"))
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError(format!("IO error: {err}"))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// The requested row does not exist. Expected, rendered as a placeholder.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation needs a signed-in user.
    #[error("sign-in required")]
    AuthRequired,

    /// Bad input caught before any network call.
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CoreError {
    /// Message suitable for an alert or inline hint.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Backend(err) => err.message.clone(),
            other => other.to_string(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
