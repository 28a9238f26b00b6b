//! # Outbound Mail
//!
//! Real delivery is out of scope; this adapter logs the reset token so the
//! flow is observable in development.

use async_trait::async_trait;
use domains::{Mailer, Result};
use tracing::info;

#[derive(Default)]
pub struct TracingMailer;

impl TracingMailer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mailer for TracingMailer {
    async fn send_password_reset(&self, email: &str, token: &str) -> Result<()> {
        info!(%email, %token, "password reset mail (stub delivery)");
        Ok(())
    }
}
