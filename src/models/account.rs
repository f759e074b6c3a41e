use serde::{Deserialize, Serialize};

use crate::entities::accounts;
use crate::services::lockout;

/// Closed role set. `SuperAdmin` implicitly holds every capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    SuperAdmin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// Unknown strings map to the least-privileged role.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "super_admin" => Self::SuperAdmin,
            _ => Self::Admin,
        }
    }
}

/// A single grantable permission: a (resource, action) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub resource: String,
    pub action: String,
}

impl Capability {
    #[must_use]
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
        }
    }
}

/// Account data as it crosses the db boundary (without the password hash).
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub permissions: Vec<Capability>,
    pub is_active: bool,
    pub failed_login_count: i32,
    pub locked_until: Option<String>,
    pub require_password_change: bool,
    pub last_login: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Account {
    /// Re-evaluated on every call; a `locked_until` in the past no longer locks
    /// even when the column was never cleared.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        lockout::is_locked(self.locked_until.as_deref(), chrono::Utc::now())
    }

    /// True when the account's explicit grants contain the pair, or the role
    /// is `super_admin`.
    #[must_use]
    pub fn has_capability(&self, resource: &str, action: &str) -> bool {
        if self.role == Role::SuperAdmin {
            return true;
        }
        self.permissions
            .iter()
            .any(|c| c.resource == resource && c.action == action)
    }
}

/// Input for provisioning a new account. The password is plaintext here and
/// hashed at the repository boundary.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl From<accounts::Model> for Account {
    fn from(model: accounts::Model) -> Self {
        let permissions: Vec<Capability> =
            serde_json::from_str(&model.permissions).unwrap_or_default();

        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: Role::parse(&model.role),
            permissions,
            is_active: model.is_active,
            failed_login_count: model.failed_login_count,
            locked_until: model.locked_until,
            require_password_change: model.require_password_change,
            last_login: model.last_login,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_with(role: Role, permissions: Vec<Capability>) -> Account {
        Account {
            id: 1,
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            role,
            permissions,
            is_active: true,
            failed_login_count: 0,
            locked_until: None,
            require_password_change: false,
            last_login: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("super_admin"), Role::SuperAdmin);
        assert_eq!(Role::parse("something_else"), Role::Admin);
        assert_eq!(Role::parse(Role::SuperAdmin.as_str()), Role::SuperAdmin);
    }

    #[test]
    fn test_super_admin_has_all_capabilities() {
        let account = account_with(Role::SuperAdmin, vec![]);
        assert!(account.has_capability("contacts", "read"));
        assert!(account.has_capability("gallery", "delete"));
    }

    #[test]
    fn test_explicit_capability_match() {
        let account = account_with(Role::Admin, vec![Capability::new("contacts", "read")]);
        assert!(account.has_capability("contacts", "read"));
        assert!(!account.has_capability("contacts", "write"));
        assert!(!account.has_capability("gallery", "read"));
    }

    #[test]
    fn test_past_lock_is_not_locked() {
        let mut account = account_with(Role::Admin, vec![]);
        account.locked_until = Some("2020-01-01T00:00:00+00:00".to_string());
        assert!(!account.is_locked());
    }
}
