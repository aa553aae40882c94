//! # Error Types
//!
//! Domain-specific error types for cafe-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cafe-core errors (this file)                                          │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  cafe-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  cafe-service errors                                                   │
//! │  └── ServiceError     - The taxonomy callers see                       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → adapter            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::OrderState;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The requested lifecycle transition is not allowed from the order's
    /// current state.
    ///
    /// ## When This Occurs
    /// - Serving an order that was already served
    /// - Closing an order that was never served
    /// - Editing the items of a closed order
    #[error("Order {order_id} is {state}, cannot {action}")]
    InvalidTransition {
        order_id: String,
        state: OrderState,
        action: &'static str,
    },

    /// A statistics grouping that is not day, week or month.
    #[error("Unsupported bucket '{0}': expected day, week or month")]
    UnsupportedBucket(String),

    /// A staff role that is not admin, waiter or cashier.
    #[error("Unknown staff role '{0}'")]
    UnknownRole(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Every variant names the offending field so the adapter can report it
/// next to the right form input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A specific order line failed validation.
    #[error("Validation failed for item {index} ({name}): {source}")]
    Item {
        index: usize,
        name: String,
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    /// Wraps this error with the position and name of the order line it
    /// belongs to.
    pub fn for_item(self, index: usize, name: impl Into<String>) -> Self {
        ValidationError::Item {
            index,
            name: name.into(),
            source: Box::new(self),
        }
    }

    /// Returns the name of the field that failed, looking through item
    /// wrappers.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. } => field,
            ValidationError::Item { source, .. } => source.field(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_error_message() {
        let err = CoreError::InvalidTransition {
            order_id: "o-1".to_string(),
            state: OrderState::Open,
            action: "close",
        };
        assert_eq!(err.to_string(), "Order o-1 is open, cannot close");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "items".to_string(),
        };
        assert_eq!(err.to_string(), "items is required");

        let err = ValidationError::TooShort {
            field: "name".to_string(),
            min: 2,
        };
        assert_eq!(err.to_string(), "name must be at least 2 characters");
    }

    #[test]
    fn test_item_wrapper_keeps_field() {
        let err = ValidationError::MustBePositive {
            field: "price".to_string(),
        }
        .for_item(1, "Latte");

        assert_eq!(err.field(), "price");
        assert_eq!(
            err.to_string(),
            "Validation failed for item 1 (Latte): price must be positive"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "table_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
