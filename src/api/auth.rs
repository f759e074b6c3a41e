use axum::{
    Json,
    extract::{FromRequestParts, Path, Request, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
    middleware::Next,
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MessageResponse, types::AccountDto, validation};
use crate::models::{Account, NewAccount, Role};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub account: AccountDto,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

// ============================================================================
// Token extraction
// ============================================================================

/// Pull a session token from the request, preferring the Authorization
/// header over the session cookie. Browser clients sometimes serialize an
/// absent token as the literal strings "null" or "undefined"; both are
/// treated as no token at all.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        let token = token.trim();
        if is_usable_token(token) {
            return Some(token.to_string());
        }
    }

    if let Some(cookie_header) = headers.get(header::COOKIE)
        && let Ok(cookie_str) = cookie_header.to_str()
    {
        for pair in cookie_str.split(';') {
            if let Some(value) = pair.trim().strip_prefix("token=") {
                let value = value.trim();
                if is_usable_token(value) {
                    return Some(value.to_string());
                }
            }
        }
    }

    None
}

fn is_usable_token(token: &str) -> bool {
    !token.is_empty() && token != "null" && token != "undefined"
}

// ============================================================================
// Middleware
// ============================================================================

/// Full identity resolution: token -> verified claims -> live account.
/// The account state is re-checked on every request, so deactivation and
/// lockout take effect immediately even though tokens are stateless.
async fn resolve_identity(state: &AppState, headers: &HeaderMap) -> Result<Account, ApiError> {
    let token = extract_token(headers)
        .ok_or_else(|| ApiError::unauthorized("Not authorized, no token provided"))?;

    let account_id = state
        .tokens
        .verify(&token)
        .ok_or_else(|| ApiError::unauthorized("Not authorized, invalid token"))?;

    let account = state
        .store
        .get_account_by_id(account_id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

    if !account.is_active {
        return Err(ApiError::unauthorized("Account is deactivated"));
    }

    if account.is_locked() {
        return Err(ApiError::Locked(
            "Account is temporarily locked due to multiple failed login attempts".to_string(),
        ));
    }

    Ok(account)
}

/// Auth gate for protected routes. Attaches the resolved [`Account`] to the
/// request extensions for handlers and extractors downstream.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let account = resolve_identity(&state, request.headers()).await?;

    tracing::Span::current().record("account_id", account.id);
    request.extensions_mut().insert(account);

    Ok(next.run(request).await)
}

/// Auth gate variant for routes that serve both anonymous and signed-in
/// callers. A valid token attaches the identity; a missing or bad token just
/// leaves the request anonymous. Infrastructure failures still surface.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match resolve_identity(&state, request.headers()).await {
        Ok(account) => {
            request.extensions_mut().insert(account);
        }
        Err(err @ (ApiError::DatabaseError(_) | ApiError::InternalError(_))) => return Err(err),
        Err(_) => {}
    }

    Ok(next.run(request).await)
}

/// Extractor for the account attached by [`require_auth`].
pub struct CurrentAdmin(pub Account);

impl<S> FromRequestParts<S> for CurrentAdmin
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Account>()
            .cloned()
            .map(Self)
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
    }
}

// ============================================================================
// Cookies
// ============================================================================

fn session_cookie(token: &str, max_age_seconds: i64, secure: bool) -> String {
    let mut cookie =
        format!("token={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age_seconds}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

/// Issue a session token and hand it out both in the body (for API clients)
/// and as an HttpOnly cookie (for the browser UI).
fn session_response(state: &AppState, account: Account) -> Result<Response, ApiError> {
    let token = state.tokens.issue(account.id)?;
    let cookie = session_cookie(
        &token,
        state.tokens.expiry_seconds(),
        state.config.server.secure_cookies,
    );

    let body = Json(ApiResponse::success(SessionResponse {
        token,
        account: AccountDto::from(account),
    }));

    Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), body).into_response())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
/// Authenticate with email and password; issues a session token on success.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Please provide email and password"));
    }

    let account = state.accounts.login(&payload.email, &payload.password).await?;

    tracing::info!("Login for {}", account.email);
    session_response(&state, account)
}

/// POST /auth/logout
/// Stateless tokens cannot be revoked server-side; logout just expires the
/// cookie so the browser stops presenting the token.
pub async fn logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cookie = clear_session_cookie(state.config.server.secure_cookies);

    (
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(ApiResponse::success(MessageResponse {
            message: "Logged out".to_string(),
        })),
    )
}

/// GET /auth/me
/// Current account information (requires authentication).
pub async fn get_current_account(
    CurrentAdmin(account): CurrentAdmin,
) -> Json<ApiResponse<AccountDto>> {
    Json(ApiResponse::success(AccountDto::from(account)))
}

/// GET /auth/verify-token
/// Reaching this handler at all means the auth gate accepted the token; the
/// body echoes the account so clients can refresh their cached identity.
pub async fn verify_token(CurrentAdmin(account): CurrentAdmin) -> Json<ApiResponse<AccountDto>> {
    Json(ApiResponse::success(AccountDto::from(account)))
}

/// PUT /auth/profile
/// Update the signed-in account's display name.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    CurrentAdmin(account): CurrentAdmin,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let name = validation::validate_name(&payload.name)?;

    let updated = state.accounts.update_profile(account.id, name).await?;

    Ok(Json(ApiResponse::success(AccountDto::from(updated))))
}

/// PUT /auth/change-password
/// Change password after re-verifying the current one. Also clears the
/// forced-change flag set on provisioned accounts.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    CurrentAdmin(account): CurrentAdmin,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    validation::validate_password_strength(&payload.new_password)?;

    state
        .accounts
        .change_password(account.id, &payload.current_password, &payload.new_password)
        .await?;

    tracing::info!("Password changed for {}", account.email);

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Password updated successfully".to_string(),
    })))
}

/// POST /auth/forgot-password
/// Issues a single-use reset token and hands the reset link to the mailer.
/// When the hand-off fails, the token is rolled back so the stored state
/// never references a link nobody received.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let email = validation::validate_email(&payload.email)?;

    let (account, token) = state.accounts.create_reset_token(&email).await?;

    let reset_url = format!(
        "{}/admin/reset-password/{token}",
        state.config.server.public_url.trim_end_matches('/')
    );

    if let Err(e) = state
        .mailer
        .send_password_reset(&account.email, &account.name, &reset_url)
        .await
    {
        tracing::error!("Failed to send reset email to {}: {e}", account.email);
        state.accounts.clear_reset_token(account.id).await?;
        return Err(ApiError::internal("Email could not be sent"));
    }

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Password reset email sent".to_string(),
    })))
}

/// PUT /auth/reset-password/{token}
/// Redeems a reset token and signs the account in with a fresh session.
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Response, ApiError> {
    validation::validate_password_strength(&payload.password)?;

    let account = state.accounts.reset_password(&token, &payload.password).await?;

    tracing::info!("Password reset completed for {}", account.email);
    session_response(&state, account)
}

/// POST /auth/register
/// Provision a new admin account. Super-admin only; the new account must
/// change its password on first login.
pub async fn register(
    State(state): State<Arc<AppState>>,
    CurrentAdmin(actor): CurrentAdmin,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AccountDto>>), ApiError> {
    super::authz::restrict_to(&actor, &[Role::SuperAdmin])?;

    let name = validation::validate_name(&payload.name)?;
    let email = validation::validate_email(&payload.email)?;
    validation::validate_password_strength(&payload.password)?;

    let role = match payload.role.as_deref() {
        None | Some("admin") => Role::Admin,
        Some("super_admin") => Role::SuperAdmin,
        Some(other) => {
            return Err(ApiError::validation(format!("Unknown role: {other}")));
        }
    };

    let account = state
        .accounts
        .register(NewAccount {
            name: name.to_string(),
            email,
            password: payload.password,
            role,
        })
        .await?;

    tracing::info!("Account {} created by {}", account.email, actor.email);

    // Best effort; account creation already succeeded.
    if let Err(e) = state
        .mailer
        .send_welcome(&account.email, &account.name)
        .await
    {
        tracing::warn!("Failed to send welcome email to {}: {e}", account.email);
    }

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(AccountDto::from(account))),
    ))
}
