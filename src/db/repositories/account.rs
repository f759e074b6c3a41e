use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::accounts;
use crate::models::{Account, NewAccount};
use crate::services::lockout::LockoutPolicy;

pub struct AccountRepository {
    conn: DatabaseConnection,
}

impl AccountRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<Account>> {
        let account = accounts::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account by ID")?;

        Ok(account.map(Account::from))
    }

    /// Emails are stored lowercased; lookups normalize the same way.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<Account>> {
        let account = accounts::Entity::find()
            .filter(accounts::Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.conn)
            .await
            .context("Failed to query account by email")?;

        Ok(account.map(Account::from))
    }

    /// Verify a password against the stored hash.
    /// Note: This uses `spawn_blocking` because Argon2 hashing is CPU-intensive
    /// and would block the async runtime if run directly.
    pub async fn verify_password(&self, id: i32, password: &str) -> Result<bool> {
        let account = accounts::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account for password verification")?;

        let Some(account) = account else {
            return Ok(false);
        };

        let password_hash = account.password_hash;
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            let argon2 = Argon2::default();
            Ok::<bool, anyhow::Error>(
                argon2
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(is_valid)
    }

    pub async fn create(&self, input: &NewAccount, config: &SecurityConfig) -> Result<Account> {
        let password = input.password.clone();
        let config = config.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let active = accounts::ActiveModel {
            name: Set(input.name.trim().to_string()),
            email: Set(input.email.trim().to_lowercase()),
            password_hash: Set(password_hash),
            role: Set(input.role.as_str().to_string()),
            permissions: Set("[]".to_string()),
            is_active: Set(true),
            failed_login_count: Set(0),
            locked_until: Set(None),
            reset_token_hash: Set(None),
            reset_token_expiry: Set(None),
            require_password_change: Set(true),
            last_login: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert account")?;

        Ok(Account::from(model))
    }

    /// Paginated listing, newest first. `page` is 1-based.
    pub async fn list(&self, page: u64, limit: u64) -> Result<(Vec<Account>, u64)> {
        let paginator = accounts::Entity::find()
            .order_by_desc(accounts::Column::CreatedAt)
            .paginate(&self.conn, limit);

        let total = paginator
            .num_items()
            .await
            .context("Failed to count accounts")?;

        let models = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to fetch account page")?;

        Ok((models.into_iter().map(Account::from).collect(), total))
    }

    pub async fn set_active(&self, id: i32, is_active: bool) -> Result<Option<Account>> {
        let account = accounts::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account for status update")?;

        let Some(account) = account else {
            return Ok(None);
        };

        let mut active: accounts::ActiveModel = account.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        let model = active.update(&self.conn).await?;

        Ok(Some(Account::from(model)))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = accounts::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete account")?;

        Ok(result.rows_affected > 0)
    }

    /// Record one failed login attempt as a single conditional UPDATE so
    /// concurrent failures against the same account cannot under-count.
    /// When the incremented count reaches the policy threshold the lock
    /// timestamp is set in the same statement.
    pub async fn record_failed_login(
        &self,
        id: i32,
        policy: &LockoutPolicy,
    ) -> Result<Option<Account>> {
        let now = chrono::Utc::now();
        let lock_until = (now + policy.lock_duration).to_rfc3339();

        let incremented = Expr::col(accounts::Column::FailedLoginCount).add(1);

        accounts::Entity::update_many()
            .col_expr(accounts::Column::FailedLoginCount, incremented.clone())
            .col_expr(
                accounts::Column::LockedUntil,
                Expr::case(
                    Expr::expr(incremented).gte(policy.max_attempts),
                    Expr::value(lock_until),
                )
                .finally(Expr::col(accounts::Column::LockedUntil))
                .into(),
            )
            .col_expr(accounts::Column::UpdatedAt, Expr::value(now.to_rfc3339()))
            .filter(accounts::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to record failed login")?;

        self.get_by_id(id).await
    }

    /// A successful login clears the failure counter and any lock.
    pub async fn record_successful_login(&self, id: i32) -> Result<()> {
        let account = accounts::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account for login bookkeeping")?;

        let Some(account) = account else {
            return Ok(());
        };

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: accounts::ActiveModel = account.into();
        active.failed_login_count = Set(0);
        active.locked_until = Set(None);
        active.last_login = Set(Some(now.clone()));
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Force a lock timestamp without going through the failure path.
    pub async fn set_locked_until(&self, id: i32, locked_until: Option<String>) -> Result<()> {
        let account = accounts::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account for lock update")?
            .ok_or_else(|| anyhow::anyhow!("Account not found: {id}"))?;

        let mut active: accounts::ActiveModel = account.into();
        active.locked_until = Set(locked_until);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn update_name(&self, id: i32, name: &str) -> Result<Option<Account>> {
        let account = accounts::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account for profile update")?;

        let Some(account) = account else {
            return Ok(None);
        };

        let mut active: accounts::ActiveModel = account.into();
        active.name = Set(name.trim().to_string());
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        let model = active.update(&self.conn).await?;

        Ok(Some(Account::from(model)))
    }

    /// Update password (hashes the new password). Clears
    /// `require_password_change` when `clear_require_change` is set.
    pub async fn update_password(
        &self,
        id: i32,
        new_password: &str,
        config: &SecurityConfig,
        clear_require_change: bool,
    ) -> Result<()> {
        let account = accounts::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account for password update")?
            .ok_or_else(|| anyhow::anyhow!("Account not found: {id}"))?;

        let password = new_password.to_string();
        let config = config.clone();
        let new_hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .context("Password hashing task panicked")??;

        let mut active: accounts::ActiveModel = account.into();
        active.password_hash = Set(new_hash);
        if clear_require_change {
            active.require_password_change = Set(false);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Store the digest of an issued reset token together with its expiry.
    pub async fn set_reset_token(&self, id: i32, digest: &str, expiry: &str) -> Result<()> {
        let account = accounts::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account for reset token")?
            .ok_or_else(|| anyhow::anyhow!("Account not found: {id}"))?;

        let mut active: accounts::ActiveModel = account.into();
        active.reset_token_hash = Set(Some(digest.to_string()));
        active.reset_token_expiry = Set(Some(expiry.to_string()));
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn clear_reset_token(&self, id: i32) -> Result<()> {
        let account = accounts::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account for reset token cleanup")?;

        let Some(account) = account else {
            return Ok(());
        };

        let mut active: accounts::ActiveModel = account.into();
        active.reset_token_hash = Set(None);
        active.reset_token_expiry = Set(None);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Find the account holding an unexpired reset token with this digest.
    /// RFC 3339 strings in a fixed offset compare correctly as text.
    pub async fn find_by_reset_token(&self, digest: &str, now: &str) -> Result<Option<Account>> {
        let account = accounts::Entity::find()
            .filter(accounts::Column::ResetTokenHash.eq(digest))
            .filter(accounts::Column::ResetTokenExpiry.gt(now))
            .one(&self.conn)
            .await
            .context("Failed to query account by reset token")?;

        Ok(account.map(Account::from))
    }

    /// Redeem a reset: new password hash, reset fields cleared, the forced
    /// password-change flag lifted. One statement path so the token cannot be
    /// replayed after success.
    pub async fn complete_password_reset(
        &self,
        id: i32,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<()> {
        let account = accounts::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account for password reset")?
            .ok_or_else(|| anyhow::anyhow!("Account not found: {id}"))?;

        let password = new_password.to_string();
        let config = config.clone();
        let new_hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .context("Password hashing task panicked")??;

        let mut active: accounts::ActiveModel = account.into();
        active.password_hash = Set(new_hash);
        active.reset_token_hash = Set(None);
        active.reset_token_expiry = Set(None);
        active.require_password_change = Set(false);
        active.failed_login_count = Set(0);
        active.locked_until = Set(None);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(&self.conn).await?;

        Ok(())
    }
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses the library defaults.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None, // output length (use default)
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}
