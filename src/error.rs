//! Error types for the SQL bridge engine.
//!
//! Four categories cover every failure the engine can surface:
//! configuration, validation, execution, and connection. The engine never
//! retries internally - every error carries the store's native diagnostic
//! and is passed through to the caller, which owns retry policy.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed or out-of-range pool settings, or an unrecognized
    /// isolation level. Never partially applied.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Missing/unsupported method or empty SQL payload. Surfaced before
    /// any store round-trip.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Store-reported syntax or runtime failure. For transactions this
    /// always implies a completed rollback.
    #[error("Execution error: {message}")]
    Execution {
        message: String,
        /// e.g. "42601" for a syntax error
        sql_state: Option<String>,
    },

    /// Malformed connection string, unreachable store, pool exhaustion,
    /// or a deadline exceeded while acquiring or using a connection.
    #[error("Connection error: {message}")]
    Connection { message: String },
}

impl EngineError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an execution error with optional SQLSTATE.
    pub fn execution(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Execution {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a connection error for an exceeded deadline.
    pub fn deadline(operation: &str) -> Self {
        Self::Connection {
            message: format!("deadline exceeded during {operation}"),
        }
    }

    /// The SQLSTATE code reported by the store, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Execution { sql_state, .. } => sql_state.as_deref(),
            _ => None,
        }
    }
}

/// Convert sqlx errors to EngineError, wrapping the native diagnostic.
impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => {
                EngineError::connection(format!("invalid connection string: {msg}"))
            }
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                EngineError::execution(db_err.message().to_string(), code)
            }
            sqlx::Error::PoolTimedOut => {
                EngineError::connection("timed out acquiring a connection from the pool")
            }
            sqlx::Error::PoolClosed => EngineError::connection("connection pool is closed"),
            sqlx::Error::Io(io_err) => EngineError::connection(format!("I/O error: {io_err}")),
            sqlx::Error::Tls(tls_err) => EngineError::connection(format!("TLS error: {tls_err}")),
            sqlx::Error::Protocol(msg) => EngineError::connection(format!("protocol error: {msg}")),
            sqlx::Error::ColumnDecode { index, source } => {
                EngineError::execution(format!("failed to decode column {index}: {source}"), None)
            }
            sqlx::Error::Decode(source) => {
                EngineError::execution(format!("decode error: {source}"), None)
            }
            sqlx::Error::WorkerCrashed => EngineError::connection("database worker crashed"),
            other => EngineError::execution(other.to_string(), None),
        }
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::connection("store unreachable");
        assert!(err.to_string().contains("Connection error"));
        assert!(err.to_string().contains("store unreachable"));
    }

    #[test]
    fn test_execution_sql_state() {
        let err = EngineError::execution("syntax error", Some("42601".to_string()));
        assert_eq!(err.sql_state(), Some("42601"));
        assert_eq!(EngineError::validation("empty").sql_state(), None);
    }

    #[test]
    fn test_deadline_is_connection_error() {
        let err = EngineError::deadline("statement execution");
        assert!(matches!(err, EngineError::Connection { .. }));
        assert!(err.to_string().contains("statement execution"));
    }

    #[test]
    fn test_pool_timeout_maps_to_connection() {
        let err = EngineError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, EngineError::Connection { .. }));
    }

    #[test]
    fn test_row_not_found_maps_to_execution() {
        let err = EngineError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, EngineError::Execution { .. }));
    }
}
