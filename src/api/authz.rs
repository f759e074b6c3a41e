//! Authorization checks applied after the auth gate has attached an identity.

use super::ApiError;
use crate::models::{Account, Role};

/// Role gate. `super_admin` passes every role check.
pub fn restrict_to(account: &Account, roles: &[Role]) -> Result<(), ApiError> {
    if account.role == Role::SuperAdmin || roles.contains(&account.role) {
        return Ok(());
    }
    Err(ApiError::Forbidden(
        "You do not have permission to perform this action".to_string(),
    ))
}

/// Capability gate with OR semantics: the account needs at least one of the
/// listed (resource, action) pairs, not all of them.
pub fn authorize_any(account: &Account, capabilities: &[(&str, &str)]) -> Result<(), ApiError> {
    if capabilities
        .iter()
        .any(|(resource, action)| account.has_capability(resource, action))
    {
        return Ok(());
    }
    Err(ApiError::Forbidden(
        "You do not have the required permissions for this action".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Capability;

    fn account(role: Role, permissions: Vec<Capability>) -> Account {
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
    fn test_restrict_to_matching_role() {
        let admin = account(Role::Admin, vec![]);
        assert!(restrict_to(&admin, &[Role::Admin]).is_ok());
        assert!(restrict_to(&admin, &[Role::SuperAdmin]).is_err());
    }

    #[test]
    fn test_restrict_to_super_admin_bypass() {
        let root = account(Role::SuperAdmin, vec![]);
        assert!(restrict_to(&root, &[Role::Admin]).is_ok());
        assert!(restrict_to(&root, &[]).is_ok());
    }

    #[test]
    fn test_authorize_any_needs_one_match() {
        let admin = account(Role::Admin, vec![Capability::new("gallery", "write")]);

        // One listed capability held is enough.
        assert!(authorize_any(&admin, &[("gallery", "write"), ("content", "write")]).is_ok());
        assert!(authorize_any(&admin, &[("content", "write"), ("gallery", "write")]).is_ok());

        // None held fails even when the account has other grants.
        assert!(authorize_any(&admin, &[("content", "write"), ("contacts", "read")]).is_err());
        assert!(authorize_any(&admin, &[]).is_err());
    }

    #[test]
    fn test_authorize_any_super_admin_bypass() {
        let root = account(Role::SuperAdmin, vec![]);
        assert!(authorize_any(&root, &[("anything", "at-all")]).is_ok());
    }
}
