//! # Topic Service

use std::sync::Arc;

use chrono::Utc;
use domains::{Result, Topic, TopicRepo};
use tracing::instrument;
use uuid::Uuid;

use crate::context::AuthContext;
use crate::validate::{Validator, TOPIC_TITLE_MAX_LEN};

pub struct TopicService {
    topics: Arc<dyn TopicRepo>,
}

impl TopicService {
    pub fn new(topics: Arc<dyn TopicRepo>) -> Self {
        Self { topics }
    }

    #[instrument(skip(self, ctx))]
    pub async fn create(&self, ctx: &AuthContext, title: String) -> Result<Topic> {
        let creator_id = ctx.require_user()?;

        let mut v = Validator::new();
        v.check(!title.trim().is_empty(), "title", "Title is required.")
            .check(
                title.chars().count() <= TOPIC_TITLE_MAX_LEN,
                "title",
                "Title must be at most 50 characters.",
            );
        v.finish()?;

        let topic = Topic {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            title,
            creator_id,
        };
        self.topics.insert(&topic).await?;
        Ok(topic)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Topic>> {
        self.topics.find_by_id(id).await
    }

    pub async fn list(&self) -> Result<Vec<Topic>> {
        self.topics.find_all().await
    }
}
