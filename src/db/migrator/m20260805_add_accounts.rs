use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Bootstrap super admin credentials. The account is created with
/// `require_password_change` set, so the password must be rotated on first
/// login.
pub const BOOTSTRAP_ADMIN_EMAIL: &str = "admin@venue.local";
pub const BOOTSTRAP_ADMIN_PASSWORD: &str = "change-me-now";

/// Hash the bootstrap password using Argon2id
fn hash_bootstrap_password() -> String {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
    };

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(BOOTSTRAP_ADMIN_PASSWORD.as_bytes(), &salt)
        .expect("Failed to hash bootstrap password")
        .to_string()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Accounts)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Seed the bootstrap super admin so a fresh install is reachable
        let now = chrono::Utc::now().to_rfc3339();
        let password_hash = hash_bootstrap_password();

        let insert = sea_orm_migration::sea_query::Query::insert()
            .into_table(Accounts)
            .columns([
                crate::entities::accounts::Column::Name,
                crate::entities::accounts::Column::Email,
                crate::entities::accounts::Column::PasswordHash,
                crate::entities::accounts::Column::Role,
                crate::entities::accounts::Column::Permissions,
                crate::entities::accounts::Column::IsActive,
                crate::entities::accounts::Column::FailedLoginCount,
                crate::entities::accounts::Column::RequirePasswordChange,
                crate::entities::accounts::Column::CreatedAt,
                crate::entities::accounts::Column::UpdatedAt,
            ])
            .values_panic([
                "Site Administrator".into(),
                BOOTSTRAP_ADMIN_EMAIL.into(),
                password_hash.into(),
                "super_admin".into(),
                "[]".into(),
                true.into(),
                0.into(),
                true.into(),
                now.clone().into(),
                now.into(),
            ])
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Accounts).to_owned())
            .await?;

        Ok(())
    }
}
