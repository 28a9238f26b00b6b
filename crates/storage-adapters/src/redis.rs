//! # Redis Token Cache
//!
//! Opaque, short-lived tokens (password reset, sessions) behind the
//! `TokenCache` port. Values are plain strings; expiry is redis-side TTL.

use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::Pool;
use domains::{AppError, Result, TokenCache};

pub struct RedisTokenCache {
    pool: Pool,
}

impl RedisTokenCache {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn cache_err(err: impl std::fmt::Display) -> AppError {
    AppError::Internal(format!("token cache: {err}"))
}

#[async_trait]
impl TokenCache for RedisTokenCache {
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.pool.get().await.map_err(cache_err)?;
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .map_err(cache_err)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.pool.get().await.map_err(cache_err)?;
        let value: Option<String> = conn.get(key).await.map_err(cache_err)?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.pool.get().await.map_err(cache_err)?;
        conn.del::<_, ()>(key).await.map_err(cache_err)?;
        Ok(())
    }
}
