//! # AuthContext
//!
//! The caller's identity, resolved from the session by the transport layer
//! and threaded explicitly through every service call. Keeping it a plain
//! value makes every authorization guard a unit-test target.

use domains::{AppError, Result};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Option<Uuid>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    /// Guard for authenticated-only operations.
    pub fn require_user(&self) -> Result<Uuid> {
        self.user_id
            .ok_or(AppError::Unauthorized("Please login first."))
    }
}
