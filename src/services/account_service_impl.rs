//! `SeaORM` implementation of the `AccountService` trait.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::config::{AuthConfig, SecurityConfig};
use crate::db::Store;
use crate::models::{Account, NewAccount};
use crate::services::account_service::{AccountService, AuthError};
use crate::services::lockout::LockoutPolicy;

pub struct SeaOrmAccountService {
    store: Store,
    policy: LockoutPolicy,
    security: SecurityConfig,
    reset_token_expiry: Duration,
}

impl SeaOrmAccountService {
    #[must_use]
    pub fn new(store: Store, auth: &AuthConfig, security: SecurityConfig) -> Self {
        Self {
            store,
            policy: LockoutPolicy::from_config(&auth.lockout),
            security,
            reset_token_expiry: Duration::minutes(auth.reset_token_expiry_minutes),
        }
    }
}

#[async_trait]
impl AccountService for SeaOrmAccountService {
    async fn login(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        // Unknown email and wrong password produce the same error; only lock
        // and deactivation states are distinguishable, and those are checked
        // before the password so a locked account reveals nothing about it.
        let account = self
            .store
            .get_account_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if account.is_locked() {
            return Err(AuthError::AccountLocked);
        }

        if !account.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        let is_valid = self
            .store
            .verify_account_password(account.id, password)
            .await?;

        if !is_valid {
            let updated = self
                .store
                .record_failed_login(account.id, &self.policy)
                .await?;
            if let Some(updated) = updated
                && updated.is_locked()
            {
                warn!("Account {} locked after repeated failures", updated.email);
            }
            return Err(AuthError::InvalidCredentials);
        }

        self.store.record_successful_login(account.id).await?;

        // Re-fetch for the cleared counters and fresh last_login.
        self.store
            .get_account_by_id(account.id)
            .await?
            .ok_or(AuthError::AccountNotFound)
    }

    async fn get_account(&self, id: i32) -> Result<Account, AuthError> {
        self.store
            .get_account_by_id(id)
            .await?
            .ok_or(AuthError::AccountNotFound)
    }

    async fn update_profile(&self, id: i32, name: &str) -> Result<Account, AuthError> {
        self.store
            .update_account_name(id, name)
            .await?
            .ok_or(AuthError::AccountNotFound)
    }

    async fn change_password(
        &self,
        id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if current_password == new_password {
            return Err(AuthError::Validation(
                "New password must be different from current password".to_string(),
            ));
        }

        let is_valid = self
            .store
            .verify_account_password(id, current_password)
            .await?;

        if !is_valid {
            return Err(AuthError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        self.store
            .update_account_password(id, new_password, &self.security, true)
            .await?;

        Ok(())
    }

    async fn register(&self, input: NewAccount) -> Result<Account, AuthError> {
        // The unique index on email is the authority; a check-then-insert
        // would let a concurrent duplicate slip past the check.
        match self.store.create_account(&input, &self.security).await {
            Ok(account) => Ok(account),
            Err(err) if is_unique_violation(&err) => Err(AuthError::DuplicateEmail),
            Err(err) => Err(err.into()),
        }
    }

    async fn create_reset_token(&self, email: &str) -> Result<(Account, String), AuthError> {
        let account = self
            .store
            .get_account_by_email(email)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        let token = generate_reset_token();
        let digest = hash_reset_token(&token);
        let expiry = (Utc::now() + self.reset_token_expiry).to_rfc3339();

        self.store
            .set_reset_token(account.id, &digest, &expiry)
            .await?;

        Ok((account, token))
    }

    async fn clear_reset_token(&self, id: i32) -> Result<(), AuthError> {
        self.store.clear_reset_token(id).await?;
        Ok(())
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<Account, AuthError> {
        let digest = hash_reset_token(token);
        let now = Utc::now().to_rfc3339();

        let account = self
            .store
            .find_account_by_reset_token(&digest, &now)
            .await?
            .ok_or(AuthError::ResetTokenInvalid)?;

        self.store
            .complete_password_reset(account.id, new_password, &self.security)
            .await?;

        self.store
            .get_account_by_id(account.id)
            .await?
            .ok_or(AuthError::AccountNotFound)
    }

    async fn list_accounts(&self, page: u64, limit: u64) -> Result<(Vec<Account>, u64), AuthError> {
        let result = self.store.list_accounts(page, limit).await?;
        Ok(result)
    }

    async fn set_active(
        &self,
        actor_id: i32,
        target_id: i32,
        is_active: bool,
    ) -> Result<Account, AuthError> {
        if actor_id == target_id {
            return Err(AuthError::Validation(
                "Cannot deactivate your own account".to_string(),
            ));
        }

        self.store
            .set_account_active(target_id, is_active)
            .await?
            .ok_or(AuthError::AccountNotFound)
    }

    async fn delete_account(&self, actor_id: i32, target_id: i32) -> Result<(), AuthError> {
        if actor_id == target_id {
            return Err(AuthError::Validation(
                "Cannot delete your own account".to_string(),
            ));
        }

        let deleted = self.store.delete_account(target_id).await?;
        if !deleted {
            return Err(AuthError::AccountNotFound);
        }

        Ok(())
    }
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sea_orm::DbErr>()
        .and_then(sea_orm::DbErr::sql_err)
        .is_some_and(|sql_err| matches!(sql_err, sea_orm::SqlErr::UniqueConstraintViolation(_)))
}

/// Random reset token (64 character hex string). The plaintext goes into the
/// reset link; only its digest is stored.
#[must_use]
pub fn generate_reset_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

/// SHA-256 hex digest of a reset token, as persisted.
#[must_use]
pub fn hash_reset_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());

    digest.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_token_is_hex() {
        let token = generate_reset_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_reset_tokens_are_unique() {
        assert_ne!(generate_reset_token(), generate_reset_token());
    }

    #[test]
    fn test_hash_reset_token_is_stable() {
        let token = "a".repeat(64);
        assert_eq!(hash_reset_token(&token), hash_reset_token(&token));
        assert_ne!(hash_reset_token(&token), hash_reset_token("other"));
        assert_eq!(hash_reset_token(&token).len(), 64);
    }
}
