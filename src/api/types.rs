use serde::Serialize;

use crate::models::{Account, Capability};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Account as exposed over the API. Never carries the password hash or the
/// reset-token fields.
#[derive(Debug, Serialize)]
pub struct AccountDto {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
    pub permissions: Vec<Capability>,
    pub is_active: bool,
    pub is_locked: bool,
    pub failed_login_count: i32,
    pub require_password_change: bool,
    pub last_login: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Account> for AccountDto {
    fn from(account: Account) -> Self {
        let is_locked = account.is_locked();
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            role: account.role.as_str().to_string(),
            permissions: account.permissions,
            is_active: account.is_active,
            is_locked,
            failed_login_count: account.failed_login_count,
            require_password_change: account.require_password_change,
            last_login: account.last_login,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountListDto {
    pub accounts: Vec<AccountDto>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
