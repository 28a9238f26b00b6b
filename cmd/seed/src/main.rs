//! # Seed Binary
//!
//! Inserts a demo user, a few topics, a community and a first post so a
//! fresh database has something to render. Safe to re-run: existing rows
//! are detected by their unique keys and skipped.

use std::sync::Arc;

use anyhow::Context;
use auth_adapters::ArgonPasswordHasher;
use configs::Settings;
use domains::AppError;
use secrecy::ExposeSecret;
use services::communities::{CommunityService, CreateCommunityInput};
use services::content::{ContentService, CreateTextPostInput};
use services::topics::TopicService;
use services::users::{RegisterInput, UserService};
use services::AuthContext;
use sqlx::postgres::PgPoolOptions;
use storage_adapters::postgres::{
    PgCommunityRepo, PgContentRepo, PgRoleRepo, PgTopicRepo, PgUserRepo,
};
use storage_adapters::{MemoryStore, TracingMailer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load().context("loading settings")?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(settings.database.url.expose_secret())
        .await
        .context("connecting to postgres")?;
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("running migrations")?;

    let user_repo = Arc::new(PgUserRepo::new(pool.clone()));
    let topic_repo = Arc::new(PgTopicRepo::new(pool.clone()));
    let community_repo = Arc::new(PgCommunityRepo::new(pool.clone()));
    let role_repo = Arc::new(PgRoleRepo::new(pool.clone()));
    let content_repo = Arc::new(PgContentRepo::new(pool.clone()));

    // Seeding needs no redis; an in-memory token cache satisfies the port.
    let users = UserService::new(
        user_repo.clone(),
        Arc::new(ArgonPasswordHasher::new()),
        Arc::new(MemoryStore::new()),
        Arc::new(TracingMailer::new()),
    );
    let topics = TopicService::new(topic_repo.clone());
    let communities = CommunityService::new(community_repo.clone(), topic_repo, role_repo.clone());
    let content = ContentService::new(content_repo, role_repo);

    let demo = match users
        .register(RegisterInput {
            username: "demo".into(),
            email: "demo@warren.local".into(),
            password: "demo1234".into(),
        })
        .await
    {
        Ok(user) => user,
        Err(AppError::Conflict { .. }) => {
            info!("demo user already present, nothing to seed");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    let ctx = AuthContext::for_user(demo.id);

    let mut topic_ids = Vec::new();
    for title in ["pets", "programming", "cooking"] {
        let topic = topics.create(&ctx, title.into()).await?;
        topic_ids.push(topic.id);
    }

    let community = communities
        .create(
            &ctx,
            CreateCommunityInput {
                name: "warren".into(),
                description: "The default community.".into(),
                topic_ids: topic_ids.clone(),
            },
        )
        .await?;

    content
        .create_text_post(
            &ctx,
            CreateTextPostInput {
                title: "Welcome to Warren".into(),
                body: "Say hi, join a community, post something.".into(),
                community_id: community.community.id,
                parent_id: None,
            },
        )
        .await?;

    info!(user = %demo.id, community = %community.community.id, "seed complete");
    Ok(())
}
