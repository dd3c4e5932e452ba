//! Domain errors raised by the role gate, the ledger primitive and the
//! confirmation workflow.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::Role;

/// Failures surfaced by inventory operations.
///
/// Every variant is raised before any state is changed; callers never need
/// to undo partial work.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// The acting principal lacks the role required, or holds it but is not
    /// the principal the record is assigned to.
    #[error("Role violation: {action} requires {required}")]
    RoleViolation { required: Role, action: String },

    #[error("{0} has already been confirmed")]
    AlreadyConfirmed(String),

    #[error("Insufficient {resource}: available {available}, requested {requested}")]
    InsufficientInventory {
        resource: String,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Chicken house capacity exceeded: capacity {capacity}, would hold {requested}")]
    CapacityExceeded { capacity: i32, requested: i64 },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },
}

impl InventoryError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        InventoryError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// True for failures a caller may retry once stock is replenished.
    pub fn is_retryable(&self) -> bool {
        matches!(self, InventoryError::InsufficientInventory { .. })
    }
}

/// Returned when a persisted enum column holds an unknown value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
