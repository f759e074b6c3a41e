//! Outbound mail hand-off.
//!
//! Delivery itself is an external collaborator; the trait only models the
//! hand-off. `send` failing means the message never left the process, which
//! the password-reset flow uses to roll back an issued reset token.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Hand a password-reset link to the delivery channel.
    async fn send_password_reset(&self, to: &str, name: &str, reset_url: &str) -> Result<()>;

    /// Welcome note for a freshly provisioned account. Best effort.
    async fn send_welcome(&self, to: &str, name: &str) -> Result<()>;
}

/// Logs instead of delivering. Used in development and tests.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, to: &str, _name: &str, reset_url: &str) -> Result<()> {
        info!("Password reset requested for {to}: {reset_url}");
        Ok(())
    }

    async fn send_welcome(&self, to: &str, name: &str) -> Result<()> {
        info!("Welcome email for {name} <{to}>");
        Ok(())
    }
}
