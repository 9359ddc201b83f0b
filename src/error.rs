//! Error types for the query gateway.

use serde::{Deserialize, Serialize};

use crate::backend::DatabaseKind;

/// Gateway error type.
///
/// Every failure a request can hit is one of these variants. The REST layer
/// maps them to a status code via [`GatewayError::is_client_error`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum GatewayError {
    // Request Errors
    /// Malformed or out-of-range request input
    #[error("{message}")]
    Validation { message: String },

    /// `database` is not one of the supported backends
    #[error("Unsupported database type '{value}'. Valid options are: {}", valid.join(", "))]
    UnsupportedBackend { value: String, valid: Vec<String> },

    // Backend Errors
    /// Engine construction or connection failed
    #[error("Failed to connect to {backend}: {reason}")]
    ConnectionAcquisition {
        backend: DatabaseKind,
        reason: String,
    },

    /// The statement failed while executing or materializing rows
    #[error("Query execution failed: {message}")]
    QueryExecution { message: String },

    // Cache Errors
    /// Cache store unreachable or payload unreadable. Never fatal to a request.
    #[error("Cache error: {message}")]
    Cache { message: String },

    // Server Errors
    /// Background worker panicked or was cancelled
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        GatewayError::Validation {
            message: message.into(),
        }
    }

    pub fn unsupported_backend(value: impl Into<String>) -> Self {
        GatewayError::UnsupportedBackend {
            value: value.into(),
            valid: DatabaseKind::ALL
                .iter()
                .map(|kind| kind.as_str().to_string())
                .collect(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        GatewayError::QueryExecution {
            message: message.into(),
        }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        GatewayError::Cache {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Validation { .. } => "VALIDATION_ERROR",
            GatewayError::UnsupportedBackend { .. } => "UNSUPPORTED_BACKEND",
            GatewayError::ConnectionAcquisition { .. } => "CONNECTION_FAILED",
            GatewayError::QueryExecution { .. } => "QUERY_EXECUTION_FAILED",
            GatewayError::Cache { .. } => "CACHE_ERROR",
            GatewayError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Input and configuration problems are the caller's to fix (400);
    /// everything else is a server-side failure (500).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GatewayError::Validation { .. }
                | GatewayError::UnsupportedBackend { .. }
                | GatewayError::ConnectionAcquisition { .. }
        )
    }
}

impl From<postgres::Error> for GatewayError {
    fn from(e: postgres::Error) -> Self {
        GatewayError::execution(e.to_string())
    }
}

impl From<oracle::Error> for GatewayError {
    fn from(e: oracle::Error) -> Self {
        GatewayError::execution(e.to_string())
    }
}

impl From<redis::RedisError> for GatewayError {
    fn from(e: redis::RedisError) -> Self {
        GatewayError::cache(e.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::cache(format!("payload serialization: {e}"))
    }
}

impl From<tokio::task::JoinError> for GatewayError {
    fn from(e: tokio::task::JoinError) -> Self {
        GatewayError::Internal {
            message: format!("query worker failed: {e}"),
        }
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
