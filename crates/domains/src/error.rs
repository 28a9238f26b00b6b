//! # AppError
//!
//! Centralized error handling for the Warren ecosystem.
//! Maps domain-specific failures to actionable error types.

use serde::Serialize;
use thiserror::Error;

/// A business-rule failure tagged with the input field that caused it.
/// Collected into lists so a caller can render every problem at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// The primary error type for all warren operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Referenced entity (post, community, user, parent comment) does not exist.
    #[error("{entity} not found with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// Input fails a length/format/business rule. Field-tagged, never retried.
    #[error("validation failed: {}", format_fields(.0))]
    Validation(Vec<FieldError>),

    /// Caller lacks the session, membership, moderator or ownership the
    /// operation requires. Fixed message per guard type.
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    /// Uniqueness violation (duplicate community name, username, email).
    #[error("conflict on {field}: {message}")]
    Conflict { field: &'static str, message: String },

    /// A multi-step write failed partway; the enclosing transaction was
    /// rolled back in full.
    #[error("transaction aborted: {0}")]
    Transaction(String),

    /// Infrastructure failure (DB down, cache unreachable, disk full).
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        AppError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn conflict(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Conflict {
            field,
            message: message.into(),
        }
    }
}

fn format_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// A specialized Result type for warren logic.
pub type Result<T> = std::result::Result<T, AppError>;
