use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::models::{Account, NewAccount};
use crate::services::lockout::LockoutPolicy;

pub mod migrator;
pub mod repositories;

pub use migrator::m20260805_add_accounts::{BOOTSTRAP_ADMIN_EMAIL, BOOTSTRAP_ADMIN_PASSWORD};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.starts_with(":memory:") && !db_url.contains("::memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn account_repo(&self) -> repositories::account::AccountRepository {
        repositories::account::AccountRepository::new(self.conn.clone())
    }

    pub async fn get_account_by_id(&self, id: i32) -> Result<Option<Account>> {
        self.account_repo().get_by_id(id).await
    }

    pub async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.account_repo().get_by_email(email).await
    }

    pub async fn verify_account_password(&self, id: i32, password: &str) -> Result<bool> {
        self.account_repo().verify_password(id, password).await
    }

    pub async fn create_account(
        &self,
        input: &NewAccount,
        config: &SecurityConfig,
    ) -> Result<Account> {
        self.account_repo().create(input, config).await
    }

    pub async fn list_accounts(&self, page: u64, limit: u64) -> Result<(Vec<Account>, u64)> {
        self.account_repo().list(page, limit).await
    }

    pub async fn set_account_active(&self, id: i32, is_active: bool) -> Result<Option<Account>> {
        self.account_repo().set_active(id, is_active).await
    }

    pub async fn delete_account(&self, id: i32) -> Result<bool> {
        self.account_repo().delete(id).await
    }

    pub async fn record_failed_login(
        &self,
        id: i32,
        policy: &LockoutPolicy,
    ) -> Result<Option<Account>> {
        self.account_repo().record_failed_login(id, policy).await
    }

    pub async fn record_successful_login(&self, id: i32) -> Result<()> {
        self.account_repo().record_successful_login(id).await
    }

    pub async fn set_account_locked_until(
        &self,
        id: i32,
        locked_until: Option<String>,
    ) -> Result<()> {
        self.account_repo().set_locked_until(id, locked_until).await
    }

    pub async fn update_account_name(&self, id: i32, name: &str) -> Result<Option<Account>> {
        self.account_repo().update_name(id, name).await
    }

    pub async fn update_account_password(
        &self,
        id: i32,
        new_password: &str,
        config: &SecurityConfig,
        clear_require_change: bool,
    ) -> Result<()> {
        self.account_repo()
            .update_password(id, new_password, config, clear_require_change)
            .await
    }

    pub async fn set_reset_token(&self, id: i32, digest: &str, expiry: &str) -> Result<()> {
        self.account_repo().set_reset_token(id, digest, expiry).await
    }

    pub async fn clear_reset_token(&self, id: i32) -> Result<()> {
        self.account_repo().clear_reset_token(id).await
    }

    pub async fn find_account_by_reset_token(
        &self,
        digest: &str,
        now: &str,
    ) -> Result<Option<Account>> {
        self.account_repo().find_by_reset_token(digest, now).await
    }

    pub async fn complete_password_reset(
        &self,
        id: i32,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<()> {
        self.account_repo()
            .complete_password_reset(id, new_password, config)
            .await
    }
}
