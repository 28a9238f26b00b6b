//! # Vote Ledger Model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row per (user, post) pair. A cancelled vote keeps its row with
/// `value = 0`; absence means the user never voted. Both map to the same
/// "no standing vote" state when computing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    pub user_id: Uuid,
    pub post_id: Uuid,
    /// -1, 0 or +1.
    pub value: i16,
}
