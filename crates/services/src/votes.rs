//! # Voting Ledger
//!
//! At most one vote per (user, post); the stored value transitions through
//! {-1, 0, +1} and every transition carries a points delta applied to the
//! post inside the same transaction as the vote upsert.

use std::sync::Arc;

use domains::{AppError, ContentRepo, Result, VoteRecord, VoteRepo};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::context::AuthContext;

/// Computes the vote transition.
///
/// `current` is the standing stored value; a missing row and a stored 0 are
/// the same state (no standing vote). `raw_value == -1` means downvote,
/// anything else upvote. Returns `(stored_value, points_delta)`:
///
/// | current | incoming | stored | delta |
/// |---------|----------|--------|-------|
/// | none    | up       | +1     | +1    |
/// | none    | down     | -1     | -1    |
/// | +1      | up       | 0      | -1    |
/// | +1      | down     | -1     | -2    |
/// | -1      | down     | 0      | +1    |
/// | -1      | up       | +1     | +2    |
pub fn transition(current: Option<i16>, raw_value: i32) -> (i16, i32) {
    let real: i16 = if raw_value == -1 { -1 } else { 1 };
    let current = current.unwrap_or(0);

    if current == real {
        // Voting the same way again cancels the standing vote.
        (0, -i32::from(real))
    } else if current == -real {
        // Reversal swings the score by two.
        (real, i32::from(real) * 2)
    } else {
        (real, i32::from(real))
    }
}

pub struct VoteService {
    votes: Arc<dyn VoteRepo>,
    content: Arc<dyn ContentRepo>,
}

impl VoteService {
    pub fn new(votes: Arc<dyn VoteRepo>, content: Arc<dyn ContentRepo>) -> Self {
        Self { votes, content }
    }

    /// Casts, reverses or cancels the caller's vote on a post. Returns the
    /// points delta that was applied, or 0 when the write failed.
    #[instrument(skip(self, ctx))]
    pub async fn vote(&self, ctx: &AuthContext, post_id: Uuid, raw_value: i32) -> Result<i32> {
        let user_id = ctx.require_user()?;

        self.content
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| AppError::not_found("post", post_id))?;

        let current = self
            .votes
            .find_vote(user_id, post_id)
            .await?
            .map(|v| v.value);
        let (value, delta) = transition(current, raw_value);

        let record = VoteRecord {
            user_id,
            post_id,
            value,
        };
        match self.votes.apply_vote(&record, delta).await {
            Ok(()) => Ok(delta),
            Err(err) => {
                // The transaction rolled back; report "no effect" rather
                // than retrying.
                warn!(%post_id, error = %err, "vote transaction failed");
                Ok(0)
            }
        }
    }

    /// The caller's standing vote on a post, if any.
    pub async fn find_vote(&self, ctx: &AuthContext, post_id: Uuid) -> Result<Option<VoteRecord>> {
        let user_id = ctx.require_user()?;
        self.votes.find_vote(user_id, post_id).await
    }

    /// Posts the caller voted on with the given value (+1 or -1).
    pub async fn voted_post_ids(&self, ctx: &AuthContext, value: i16) -> Result<Vec<Uuid>> {
        let user_id = ctx.require_user()?;
        self.votes.find_voted_post_ids(user_id, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{ContentItem, ContentKind, ContentStatus, MockContentRepo, MockVoteRepo};

    fn post() -> ContentItem {
        let now = Utc::now();
        ContentItem {
            id: Uuid::now_v7(),
            created_at: now,
            updated_at: now,
            title: Some("t".into()),
            body: Some("b".into()),
            kind: ContentKind::TextPost,
            status: ContentStatus::Active,
            points: 0,
            creator_id: Uuid::now_v7(),
            community_id: Uuid::now_v7(),
            parent_id: None,
            ancestor_id: None,
            layer: 0,
        }
    }

    #[test]
    fn transition_table() {
        assert_eq!(transition(None, 1), (1, 1));
        assert_eq!(transition(None, -1), (-1, -1));
        assert_eq!(transition(Some(1), 1), (0, -1));
        assert_eq!(transition(Some(1), -1), (-1, -2));
        assert_eq!(transition(Some(-1), -1), (0, 1));
        assert_eq!(transition(Some(-1), 1), (1, 2));
    }

    #[test]
    fn cancelled_row_counts_as_no_vote() {
        // A persisted value=0 row must transition exactly like a missing row.
        assert_eq!(transition(Some(0), 1), transition(None, 1));
        assert_eq!(transition(Some(0), -1), transition(None, -1));
    }

    #[test]
    fn any_non_minus_one_raw_value_is_an_upvote() {
        assert_eq!(transition(None, 0), (1, 1));
        assert_eq!(transition(None, 7), (1, 1));
    }

    #[tokio::test]
    async fn vote_on_missing_post_is_not_found() {
        let mut content = MockContentRepo::new();
        content.expect_find_by_id().returning(|_| Ok(None));

        let svc = VoteService::new(Arc::new(MockVoteRepo::new()), Arc::new(content));
        let result = svc
            .vote(&AuthContext::for_user(Uuid::now_v7()), Uuid::now_v7(), 1)
            .await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn upvote_then_upvote_cancels() {
        let user = Uuid::now_v7();
        let item = post();
        let post_id = item.id;

        let mut content = MockContentRepo::new();
        content
            .expect_find_by_id()
            .returning(move |_| Ok(Some(item.clone())));

        let mut votes = MockVoteRepo::new();
        votes.expect_find_vote().returning(move |u, p| {
            Ok(Some(VoteRecord {
                user_id: u,
                post_id: p,
                value: 1,
            }))
        });
        votes
            .expect_apply_vote()
            .withf(|record, delta| record.value == 0 && *delta == -1)
            .returning(|_, _| Ok(()));

        let svc = VoteService::new(Arc::new(votes), Arc::new(content));
        let delta = svc
            .vote(&AuthContext::for_user(user), post_id, 1)
            .await
            .unwrap();
        assert_eq!(delta, -1);
    }

    #[tokio::test]
    async fn downvote_over_upvote_swings_by_two() {
        let user = Uuid::now_v7();
        let item = post();
        let post_id = item.id;

        let mut content = MockContentRepo::new();
        content
            .expect_find_by_id()
            .returning(move |_| Ok(Some(item.clone())));

        let mut votes = MockVoteRepo::new();
        votes.expect_find_vote().returning(move |u, p| {
            Ok(Some(VoteRecord {
                user_id: u,
                post_id: p,
                value: 1,
            }))
        });
        votes
            .expect_apply_vote()
            .withf(|record, delta| record.value == -1 && *delta == -2)
            .returning(|_, _| Ok(()));

        let svc = VoteService::new(Arc::new(votes), Arc::new(content));
        let delta = svc
            .vote(&AuthContext::for_user(user), post_id, -1)
            .await
            .unwrap();
        assert_eq!(delta, -2);
    }

    #[tokio::test]
    async fn failed_write_reports_zero_delta() {
        let item = post();
        let post_id = item.id;

        let mut content = MockContentRepo::new();
        content
            .expect_find_by_id()
            .returning(move |_| Ok(Some(item.clone())));

        let mut votes = MockVoteRepo::new();
        votes.expect_find_vote().returning(|_, _| Ok(None));
        votes
            .expect_apply_vote()
            .returning(|_, _| Err(AppError::Transaction("deadlock".into())));

        let svc = VoteService::new(Arc::new(votes), Arc::new(content));
        let delta = svc
            .vote(&AuthContext::for_user(Uuid::now_v7()), post_id, 1)
            .await
            .unwrap();
        assert_eq!(delta, 0);
    }
}
