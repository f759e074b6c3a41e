use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    /// Stored lowercased; lookups normalize before querying.
    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash (PHC string). Never leaves the db layer.
    pub password_hash: String,

    /// `admin` or `super_admin`.
    pub role: String,

    /// JSON array of `{resource, action}` capability pairs.
    pub permissions: String,

    pub is_active: bool,

    pub failed_login_count: i32,

    /// RFC 3339; a future value blocks login regardless of credentials.
    pub locked_until: Option<String>,

    /// SHA-256 hex digest of the outstanding reset token, if any.
    /// Set and cleared together with `reset_token_expiry`.
    pub reset_token_hash: Option<String>,

    pub reset_token_expiry: Option<String>,

    /// Set on admin-provisioned creation, cleared by an explicit password change.
    pub require_password_change: bool,

    pub last_login: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
