use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeError;

use crate::error::{CoreError, StorageError};

/// JSON envelope returned across the FFI boundary.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum AppResponse {
    StorageError(String),
    SerializationError(String),
    NotFound(String),
    AuthRequired(String),
    ValidationError(String),
    BackendError(String),
    BadRequest(String),
    Ok(String),
}

impl Display for AppResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AppResponse::StorageError(msg) => write!(f, "Storage error: {}", msg),
            AppResponse::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppResponse::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppResponse::AuthRequired(msg) => write!(f, "Sign-in required: {}", msg),
            AppResponse::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppResponse::BackendError(msg) => write!(f, "{}", msg),
            AppResponse::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppResponse::Ok(msg) => write!(f, "Ok: {}", msg),
        }
    }
}

impl From<CoreError> for AppResponse {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(what) => AppResponse::NotFound(what),
            CoreError::AuthRequired => AppResponse::AuthRequired("no active session".to_string()),
            CoreError::Validation(msg) => AppResponse::ValidationError(msg),
            CoreError::Backend(err) => AppResponse::BackendError(err.message),
            CoreError::Storage(err) => AppResponse::StorageError(err.0),
        }
    }
}

impl From<StorageError> for AppResponse {
    fn from(err: StorageError) -> Self {
        AppResponse::StorageError(err.0)
    }
}

impl From<SerdeError> for AppResponse {
    fn from(err: SerdeError) -> Self {
        AppResponse::SerializationError(format!("JSON serialization error: {}", err))
    }
}

impl AppResponse {
    pub fn success(msg: impl Into<String>) -> Self {
        AppResponse::Ok(msg.into())
    }

    /// Wraps `value` as JSON in an `Ok` envelope.
    pub fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(json) => AppResponse::Ok(json),
            Err(e) => AppResponse::from(e),
        }
    }
}
