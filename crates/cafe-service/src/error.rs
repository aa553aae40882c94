//! # Service Error Types
//!
//! The error taxonomy every exposed operation returns.
//!
//! ## Error Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  source                              │ ServiceError          │ kind()   │
//! ├──────────────────────────────────────┼───────────────────────┼──────────┤
//! │  ValidationError                     │ Validation            │ validation
//! │  missing order / table               │ NotFound              │ not_found
//! │  CoreError::InvalidTransition        │ Conflict              │ conflict
//! │  access policy said no               │ Unauthorized          │ unauthorized
//! │  DbError, timeout                    │ Persistence           │ persistence
//! │  CoreError::UnsupportedBucket        │ UnsupportedParameter  │ unsupported_parameter
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mapping `kind()` to a status code is the transport adapter's job.
//! Nothing in this crate retries: a transient persistence failure surfaces
//! immediately.

use std::time::Duration;

use thiserror::Error;

use cafe_core::{CoreError, ValidationError};
use cafe_db::DbError;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors returned by the order lifecycle and analytics services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Bad, missing or out-of-range input.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Missing table or order, or a table close that matched nothing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The order exists but its state forbids the transition.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Wrong role, or not the owner of the requested resource.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// I/O failure or timeout in the persistence layer.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// A parameter outside the supported set (e.g. bucket granularity).
    #[error("Unsupported {name}: '{value}'")]
    UnsupportedParameter { name: &'static str, value: String },
}

/// Persistence-layer failures.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Database(#[from] DbError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Stable machine-readable error code.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation",
            ServiceError::NotFound { .. } => "not_found",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::Persistence(_) => "persistence",
            ServiceError::UnsupportedParameter { .. } => "unsupported_parameter",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ServiceError::Persistence(PersistenceError::Timeout(_)))
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        ServiceError::Persistence(PersistenceError::Database(err))
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidTransition { .. } => ServiceError::Conflict(err.to_string()),
            CoreError::UnsupportedBucket(value) => ServiceError::UnsupportedParameter {
                name: "bucket",
                value,
            },
            CoreError::UnknownRole(role) => {
                ServiceError::Unauthorized(format!("unknown staff role '{role}'"))
            }
            CoreError::Validation(e) => ServiceError::Validation(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafe_core::OrderState;

    #[test]
    fn test_core_error_mapping() {
        let conflict: ServiceError = CoreError::InvalidTransition {
            order_id: "o-1".to_string(),
            state: OrderState::Served,
            action: "serve",
        }
        .into();
        assert_eq!(conflict.kind(), "conflict");
        assert_eq!(conflict.to_string(), "Conflict: Order o-1 is served, cannot serve");

        let bucket: ServiceError = CoreError::UnsupportedBucket("year".to_string()).into();
        assert_eq!(bucket.kind(), "unsupported_parameter");
    }

    #[test]
    fn test_timeout_is_persistence() {
        let err: ServiceError = PersistenceError::Timeout(Duration::from_millis(5)).into();
        assert_eq!(err.kind(), "persistence");
        assert!(err.is_timeout());

        let db: ServiceError = DbError::PoolExhausted.into();
        assert_eq!(db.kind(), "persistence");
        assert!(!db.is_timeout());
    }
}
