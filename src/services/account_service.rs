//! Domain service for authentication and account management.
//!
//! Covers credential verification with lockout, password changes, the
//! password-reset flow, and super-admin account administration. Session
//! tokens are a separate concern ([`crate::services::token`]); handlers issue
//! them after this service grants a login.

use thiserror::Error;

use crate::models::{Account, NewAccount};

/// Every authentication attempt resolves to exactly one of these or a
/// granted [`Account`]; there is no partial-success state.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is temporarily locked due to multiple failed login attempts")]
    AccountLocked,

    #[error("Account is deactivated")]
    AccountDeactivated,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Invalid or expired reset token")]
    ResetTokenInvalid,

    #[error("An account with this email already exists")]
    DuplicateEmail,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Domain service trait for account authentication and management.
#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// Verifies credentials, applying the lockout policy.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] for an unknown email or wrong
    /// password (indistinguishable to the caller), [`AuthError::AccountLocked`]
    /// while a lockout is in force, [`AuthError::AccountDeactivated`] for
    /// inactive accounts. A wrong password counts toward lockout before the
    /// error is returned.
    async fn login(&self, email: &str, password: &str) -> Result<Account, AuthError>;

    /// Fetches an account by id (used by the auth gate and `/auth/me`).
    async fn get_account(&self, id: i32) -> Result<Account, AuthError>;

    /// Updates the account's own display name.
    async fn update_profile(&self, id: i32, name: &str) -> Result<Account, AuthError>;

    /// Changes a password after re-verifying the current one.
    ///
    /// # Errors
    ///
    /// [`AuthError::Validation`] when the current password is wrong or the
    /// new password equals the old one.
    async fn change_password(
        &self,
        id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;

    /// Creates a new account with `require_password_change` set.
    /// Authorization (super-admin only) is enforced at the route.
    async fn register(&self, input: NewAccount) -> Result<Account, AuthError>;

    /// Issues a single-use reset token for the account matching `email`.
    /// Returns the account and the plaintext token; only the token's SHA-256
    /// digest is persisted.
    async fn create_reset_token(&self, email: &str) -> Result<(Account, String), AuthError>;

    /// Rolls back an issued reset token (used when mail hand-off fails).
    async fn clear_reset_token(&self, id: i32) -> Result<(), AuthError>;

    /// Redeems a reset token: sets the new password, clears the reset fields
    /// and `require_password_change`. Single-use by construction.
    async fn reset_password(&self, token: &str, new_password: &str) -> Result<Account, AuthError>;

    /// Paginated account listing, newest first. Returns `(accounts, total)`.
    async fn list_accounts(&self, page: u64, limit: u64) -> Result<(Vec<Account>, u64), AuthError>;

    /// Activates or deactivates an account. Rejects targeting the actor's own
    /// account.
    async fn set_active(
        &self,
        actor_id: i32,
        target_id: i32,
        is_active: bool,
    ) -> Result<Account, AuthError>;

    /// Deletes an account. Rejects targeting the actor's own account.
    async fn delete_account(&self, actor_id: i32, target_id: i32) -> Result<(), AuthError>;
}
