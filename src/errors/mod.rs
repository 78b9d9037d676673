mod error;

pub use error::{ConnectionFailure, DbError, DomainError, ServiceError};
pub use error::{
    PROVIDER_AUTHENTICATION_FAILED, PROVIDER_CONNECTION_TIMEOUT, PROVIDER_INVALID_DATABASE,
    PROVIDER_SERVER_NOT_FOUND, SQLITE_AUTH, SQLITE_BUSY, SQLITE_CANTOPEN,
};

pub use crate::domains::export::types::ExportError;

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type for export engine operations
pub type ExportResult<T> = Result<T, ExportError>;
