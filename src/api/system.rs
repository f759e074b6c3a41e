use axum::{Extension, Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiResponse, AppState};
use crate::api::types::AccountDto;
use crate::models::Account;

#[derive(Serialize)]
pub struct StatusDto {
    pub version: String,
    pub uptime_seconds: u64,
    pub database: String,
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountDto>,
}

/// GET /system/status
/// Served through the optional auth gate: anonymous callers get the plain
/// health view, signed-in callers additionally see who they are.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    account: Option<Extension<Account>>,
) -> Json<ApiResponse<StatusDto>> {
    let database = match state.store.ping().await {
        Ok(()) => "ok".to_string(),
        Err(e) => {
            tracing::error!("Database ping failed: {e}");
            "error".to_string()
        }
    };

    let account = account.map(|Extension(account)| account);

    Json(ApiResponse::success(StatusDto {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        database,
        authenticated: account.is_some(),
        account: account.map(AccountDto::from),
    }))
}
