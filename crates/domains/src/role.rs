//! # Membership Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-user-per-community membership and moderation flags.
///
/// Rows are upserted on join and soft-cleared on leave: `is_member` flips to
/// false while the row (and any moderator flag) survives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub user_id: Uuid,
    pub community_id: Uuid,
    pub is_member: bool,
    pub is_moderator: bool,
    pub joined_at: DateTime<Utc>,
}
