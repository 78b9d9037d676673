use serde::Serialize;
use thiserror::Error;

use crate::domains::export::types::ExportError;

/// Provider codes reported by the reference data source.
pub const PROVIDER_INVALID_DATABASE: i64 = 4060;
pub const PROVIDER_AUTHENTICATION_FAILED: i64 = 18456;
pub const PROVIDER_SERVER_NOT_FOUND: i64 = 53;
pub const PROVIDER_CONNECTION_TIMEOUT: i64 = 40;

/// SQLite primary result codes that carry the same meaning.
pub const SQLITE_BUSY: i64 = 5;
pub const SQLITE_CANTOPEN: i64 = 14;
pub const SQLITE_AUTH: i64 = 23;

/// Database errors raised at the query executor boundary
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Provider error {code}: {message}")]
    Provider { code: i64, message: String },

    #[error("Could not decode column '{column}': {reason}")]
    Decode { column: String, reason: String },

    #[error("Database error: {0}")]
    Other(String),
}

/// Human readable category for a failed connection or query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionFailure {
    InvalidDatabase,
    AuthenticationFailed,
    ServerUnreachable,
    Timeout,
    Other,
}

impl ConnectionFailure {
    pub fn from_code(code: i64) -> Self {
        match code {
            PROVIDER_INVALID_DATABASE | SQLITE_CANTOPEN => ConnectionFailure::InvalidDatabase,
            PROVIDER_AUTHENTICATION_FAILED | SQLITE_AUTH => ConnectionFailure::AuthenticationFailed,
            PROVIDER_SERVER_NOT_FOUND => ConnectionFailure::ServerUnreachable,
            PROVIDER_CONNECTION_TIMEOUT | SQLITE_BUSY => ConnectionFailure::Timeout,
            _ => ConnectionFailure::Other,
        }
    }

    /// Message shown to the operator. `None` for uncategorised failures, where
    /// the provider's own text is used instead.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            ConnectionFailure::InvalidDatabase => Some("Invalid database"),
            ConnectionFailure::AuthenticationFailed => Some("Authentication failed - check credentials"),
            ConnectionFailure::ServerUnreachable => {
                Some("Server not found - check server name and network connectivity")
            }
            ConnectionFailure::Timeout => Some("Connection timeout - Server may be busy or unreachable"),
            ConnectionFailure::Other => None,
        }
    }
}

impl DbError {
    /// Classify this error into a connection failure category.
    pub fn failure(&self) -> ConnectionFailure {
        match self {
            DbError::Provider { code, .. } => ConnectionFailure::from_code(*code),
            DbError::Sqlx(err) => match err {
                sqlx::Error::Database(db) => db
                    .code()
                    .and_then(|c| c.parse::<i64>().ok())
                    // extended result codes keep the primary code in the low byte
                    .map(|c| ConnectionFailure::from_code(c & 0xff))
                    .unwrap_or(ConnectionFailure::Other),
                sqlx::Error::Io(_) => ConnectionFailure::ServerUnreachable,
                sqlx::Error::PoolTimedOut => ConnectionFailure::Timeout,
                sqlx::Error::Configuration(_) => ConnectionFailure::InvalidDatabase,
                _ => ConnectionFailure::Other,
            },
            _ => ConnectionFailure::Other,
        }
    }

    /// Operator-facing description: the categorised message when one applies,
    /// else the raw detail text.
    pub fn describe(&self) -> String {
        match self.failure().message() {
            Some(msg) => msg.to_string(),
            None => self.to_string(),
        }
    }
}

impl serde::Serialize for DbError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("DbError", 3)?;
        let kind = match self {
            DbError::Sqlx(_) => "Sqlx",
            DbError::Query(_) => "Query",
            DbError::Provider { .. } => "Provider",
            DbError::Decode { .. } => "Decode",
            DbError::Other(_) => "Other",
        };
        state.serialize_field("type", kind)?;
        state.serialize_field("category", &self.failure())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Manual Clone implementation for DbError
impl Clone for DbError {
    fn clone(&self) -> Self {
        match self {
            DbError::Sqlx(err) => {
                // keep the provider code so the clone classifies the same way
                if let sqlx::Error::Database(db) = err {
                    if let Some(code) = db.code().and_then(|c| c.parse::<i64>().ok()) {
                        return DbError::Provider { code: code & 0xff, message: db.message().to_string() };
                    }
                }
                DbError::Other(format!("SQLx error: {}", err))
            }
            DbError::Query(s) => DbError::Query(s.clone()),
            DbError::Provider { code, message } => DbError::Provider { code: *code, message: message.clone() },
            DbError::Decode { column, reason } => DbError::Decode { column: column.clone(), reason: reason.clone() },
            DbError::Other(s) => DbError::Other(s.clone()),
        }
    }
}

/// Domain-level errors
#[derive(Debug, Error, Clone, Serialize)]
pub enum DomainError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ExportError> for DomainError {
    fn from(error: ExportError) -> Self {
        DomainError::Export(error.to_string())
    }
}

/// Service-level errors (application specific)
#[derive(Debug, Error, Clone, Serialize)]
pub enum ServiceError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Request rejected: {}", .0.join("; "))]
    Rejected(Vec<String>),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ExportError> for ServiceError {
    fn from(error: ExportError) -> Self {
        match error {
            ExportError::Validation(errors) => ServiceError::Rejected(errors),
            other => ServiceError::Export(other.to_string()),
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(error: DbError) -> Self {
        ServiceError::Domain(DomainError::Database(error))
    }
}
