//! # Community & Topic Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named community posts belong to (e.g. "cats").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Community {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Unique across the system.
    pub name: String,
    pub description: String,
    pub background: String,
    pub background_color: String,
    pub banner_color: String,
    pub icon: String,
    pub banner: String,
}

/// Default appearance applied to freshly created communities.
pub const DEFAULT_BACKGROUND_COLOR: &str = "#DAE0E6";
pub const DEFAULT_BANNER_COLOR: &str = "#33a8ff";

/// Mutable appearance fields, all optional so a moderator can change one
/// without resending the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityAppearance {
    pub background: Option<String>,
    pub background_color: Option<String>,
    pub banner_color: Option<String>,
    pub icon: Option<String>,
    pub banner: Option<String>,
}

/// A tag communities are categorized under.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub creator_id: Uuid,
}

/// A community with its topics and membership count resolved for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityDetail {
    pub community: Community,
    pub topics: Vec<Topic>,
    pub total_memberships: i64,
}
