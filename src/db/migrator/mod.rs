use sea_orm_migration::prelude::*;

pub mod m20260805_add_accounts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20260805_add_accounts::Migration)]
    }
}
