//! Admin account management. Every route here is super-admin only, and the
//! service refuses status changes or deletion aimed at the caller's own
//! account.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentAdmin;
use super::{ApiError, ApiResponse, AppState, MessageResponse, authz, validation};
use crate::api::types::{AccountDto, AccountListDto};
use crate::models::Role;

#[derive(Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub is_active: bool,
}

/// GET /admins
pub async fn list_admins(
    State(state): State<Arc<AppState>>,
    CurrentAdmin(actor): CurrentAdmin,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<AccountListDto>>, ApiError> {
    authz::restrict_to(&actor, &[Role::SuperAdmin])?;

    let (page, limit) = validation::clamp_pagination(query.page, query.limit);
    let (accounts, total) = state.accounts.list_accounts(page, limit).await?;

    Ok(Json(ApiResponse::success(AccountListDto {
        accounts: accounts.into_iter().map(AccountDto::from).collect(),
        total,
        page,
        limit,
    })))
}

/// PUT /admins/{id}/status
pub async fn set_admin_status(
    State(state): State<Arc<AppState>>,
    CurrentAdmin(actor): CurrentAdmin,
    Path(id): Path<i32>,
    Json(payload): Json<StatusRequest>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    authz::restrict_to(&actor, &[Role::SuperAdmin])?;

    let account = state
        .accounts
        .set_active(actor.id, id, payload.is_active)
        .await?;

    tracing::info!(
        "Account {} {} by {}",
        account.email,
        if payload.is_active {
            "activated"
        } else {
            "deactivated"
        },
        actor.email
    );

    Ok(Json(ApiResponse::success(AccountDto::from(account))))
}

/// DELETE /admins/{id}
pub async fn delete_admin(
    State(state): State<Arc<AppState>>,
    CurrentAdmin(actor): CurrentAdmin,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    authz::restrict_to(&actor, &[Role::SuperAdmin])?;

    state.accounts.delete_account(actor.id, id).await?;

    tracing::info!("Account {id} deleted by {}", actor.email);

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Account deleted".to_string(),
    })))
}
