use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AccountService, LogMailer, Mailer, SeaOrmAccountService, TokenIssuer,
};

mod admins;
pub mod auth;
pub mod authz;
mod error;
mod system;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

pub struct AppState {
    pub store: Store,

    pub config: Config,

    pub accounts: Arc<dyn AccountService>,

    pub tokens: Arc<TokenIssuer>,

    pub mailer: Arc<dyn Mailer>,

    pub start_time: std::time::Instant,
}

pub async fn create_app_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    let store = Store::new(&config.general.database_path).await?;

    let accounts: Arc<dyn AccountService> = Arc::new(SeaOrmAccountService::new(
        store.clone(),
        &config.auth,
        config.security.clone(),
    ));

    let tokens = Arc::new(TokenIssuer::new(
        &config.auth.jwt_secret,
        config.auth.token_expiry_days,
    ));

    let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);

    Ok(Arc::new(AppState {
        store,
        config,
        accounts,
        tokens,
        mailer,
        start_time: std::time::Instant::now(),
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config.server.cors_allowed_origins.clone();

    let protected_routes = create_protected_router(state.clone());
    let optional_routes = create_optional_router(state.clone());

    let api_router = Router::new()
        .merge(protected_routes)
        .merge(optional_routes)
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password/{token}", put(auth::reset_password))
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(auth::get_current_account))
        .route("/auth/verify-token", get(auth::verify_token))
        .route("/auth/profile", put(auth::update_profile))
        .route("/auth/change-password", put(auth::change_password))
        .route("/auth/register", post(auth::register))
        .route("/admins", get(admins::list_admins))
        .route("/admins/{id}/status", put(admins::set_admin_status))
        .route("/admins/{id}", delete(admins::delete_admin))
        .route_layer(middleware::from_fn_with_state(state, auth::require_auth))
}

fn create_optional_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/system/status", get(system::get_status))
        .route_layer(middleware::from_fn_with_state(state, auth::optional_auth))
}
