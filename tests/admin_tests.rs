use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use atrium::api::{self, AppState};
use atrium::config::Config;
use atrium::db::{BOOTSTRAP_ADMIN_EMAIL, BOOTSTRAP_ADMIN_PASSWORD, Store};
use atrium::services::{AccountService, LogMailer, Mailer, SeaOrmAccountService, TokenIssuer};

async fn spawn_app() -> (Router, Arc<AppState>) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.auth.jwt_secret = "integration-test-secret-integration-test".to_string();
    config.server.secure_cookies = false;
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;

    // Single connection so the in-memory database is shared.
    let store = Store::with_pool_options(&config.general.database_path, 1, 1)
        .await
        .expect("Failed to open store");

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

    let state = Arc::new(AppState {
        store,
        config,
        accounts,
        tokens,
        mailer,
        start_time: std::time::Instant::now(),
    });

    (api::router(state.clone()), state)
}

fn authed_json(method: &str, uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn login_token(app: &Router, email: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({ "email": email, "password": password }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["data"]["token"].as_str().unwrap().to_string()
}

async fn super_admin_token(app: &Router) -> String {
    login_token(app, BOOTSTRAP_ADMIN_EMAIL, BOOTSTRAP_ADMIN_PASSWORD).await
}

/// Create an account through the API and return its id.
async fn register_account(app: &Router, token: &str, name: &str, email: &str) -> i32 {
    let response = app
        .clone()
        .oneshot(authed_json(
            "POST",
            "/api/auth/register",
            token,
            serde_json::json!({
                "name": name,
                "email": email,
                "password": "Provision3d-Pw",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    i32::try_from(body["data"]["id"].as_i64().unwrap()).unwrap()
}

#[tokio::test]
async fn test_register_creates_provisioned_account() {
    let (app, _state) = spawn_app().await;
    let token = super_admin_token(&app).await;

    let response = app
        .clone()
        .oneshot(authed_json(
            "POST",
            "/api/auth/register",
            &token,
            serde_json::json!({
                "name": "Box Office",
                "email": "BoxOffice@Venue.Local",
                "password": "Provision3d-Pw",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;

    // Email is normalized, the role defaults to admin, and the account must
    // rotate its password on first login.
    assert_eq!(body["data"]["email"], "boxoffice@venue.local");
    assert_eq!(body["data"]["role"], "admin");
    assert_eq!(body["data"]["require_password_change"], true);

    // The provisioned credentials work immediately.
    let _ = login_token(&app, "boxoffice@venue.local", "Provision3d-Pw").await;
}

#[tokio::test]
async fn test_register_requires_super_admin() {
    let (app, _state) = spawn_app().await;
    let root_token = super_admin_token(&app).await;

    register_account(&app, &root_token, "Plain Admin", "plain@venue.local").await;
    let admin_token = login_token(&app, "plain@venue.local", "Provision3d-Pw").await;

    let response = app
        .clone()
        .oneshot(authed_json(
            "POST",
            "/api/auth/register",
            &admin_token,
            serde_json::json!({
                "name": "Should Fail",
                "email": "nope@venue.local",
                "password": "Provision3d-Pw",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_bad_input() {
    let (app, _state) = spawn_app().await;
    let token = super_admin_token(&app).await;

    // The bootstrap account already owns this address.
    let response = app
        .clone()
        .oneshot(authed_json(
            "POST",
            "/api/auth/register",
            &token,
            serde_json::json!({
                "name": "Clone",
                "email": BOOTSTRAP_ADMIN_EMAIL,
                "password": "Provision3d-Pw",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(authed_json(
            "POST",
            "/api/auth/register",
            &token,
            serde_json::json!({
                "name": "Weak",
                "email": "weak@venue.local",
                "password": "tooweak",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(authed_json(
            "POST",
            "/api/auth/register",
            &token,
            serde_json::json!({
                "name": "Bad Email",
                "email": "not-an-email",
                "password": "Provision3d-Pw",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(authed_json(
            "POST",
            "/api/auth/register",
            &token,
            serde_json::json!({
                "name": "Odd Role",
                "email": "odd@venue.local",
                "password": "Provision3d-Pw",
                "role": "owner",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_admins_pagination() {
    let (app, _state) = spawn_app().await;
    let token = super_admin_token(&app).await;

    for i in 1..=3 {
        register_account(
            &app,
            &token,
            &format!("Admin {i}"),
            &format!("admin{i}@venue.local"),
        )
        .await;
    }

    let response = app
        .clone()
        .oneshot(authed("GET", "/api/admins?page=1&limit=2", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["data"]["total"], 4);
    assert_eq!(body["data"]["limit"], 2);
    assert_eq!(body["data"]["accounts"].as_array().unwrap().len(), 2);

    let response = app
        .clone()
        .oneshot(authed("GET", "/api/admins?page=2&limit=2", &token))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["accounts"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_list_admins_forbidden_for_plain_admin() {
    let (app, _state) = spawn_app().await;
    let root_token = super_admin_token(&app).await;

    register_account(&app, &root_token, "Plain Admin", "plain@venue.local").await;
    let admin_token = login_token(&app, "plain@venue.local", "Provision3d-Pw").await;

    let response = app
        .clone()
        .oneshot(authed("GET", "/api/admins", &admin_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cannot_target_own_account() {
    let (app, _state) = spawn_app().await;
    let token = super_admin_token(&app).await;

    // The bootstrap super admin is account 1.
    let response = app
        .clone()
        .oneshot(authed_json(
            "PUT",
            "/api/admins/1/status",
            &token,
            serde_json::json!({ "is_active": false }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(authed("DELETE", "/api/admins/1", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Still alive and signed in after both attempts.
    let response = app
        .clone()
        .oneshot(authed("GET", "/api/auth/me", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_deactivate_and_delete_other_account() {
    let (app, _state) = spawn_app().await;
    let token = super_admin_token(&app).await;

    let id = register_account(&app, &token, "Temp Admin", "temp@venue.local").await;

    let response = app
        .clone()
        .oneshot(authed_json(
            "PUT",
            &format!("/api/admins/{id}/status"),
            &token,
            serde_json::json!({ "is_active": false }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["is_active"], false);

    // A deactivated account cannot sign in.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "email": "temp@venue.local",
                        "password": "Provision3d-Pw",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(authed("DELETE", &format!("/api/admins/{id}"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Deleting again reports the account as gone.
    let response = app
        .clone()
        .oneshot(authed("DELETE", &format!("/api/admins/{id}"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
