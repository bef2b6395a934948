mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{StatusCode, header};
use serde_json::json;

use common::{TestApp, generate_unique_email, session_cookie};
use dentra::modules::notifications::{DispatchError, EmailDispatcher};
use dentra_auth::{
    create_access_token, create_email_verification_token, verify_email_verification_token,
};
use dentra_core::Clock;
use dentra_db::{BlacklistStore, UserRepository};
use dentra_models::{EmailMessage, EmailType};

#[tokio::test]
async fn test_login_sets_http_only_cookie() {
    let app = TestApp::new();
    let email = generate_unique_email();
    app.create_user(&email, "testpass123").await;

    let response = app
        .post_json(
            "/api/auth/login",
            json!({ "email": email, "password": "testpass123" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["user"]["email"], email);
    assert!(response.body["user"].get("password_hash").is_none());

    let set_cookie = response
        .headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(set_cookie.starts_with("access_token="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(!set_cookie.contains("Secure"));
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let app = TestApp::new();
    let email = generate_unique_email();
    app.create_user(&email, "testpass123").await;

    let wrong_password = app
        .post_json(
            "/api/auth/login",
            json!({ "email": email, "password": "wrongpass" }),
        )
        .await;
    let unknown = app
        .post_json(
            "/api/auth/login",
            json!({ "email": generate_unique_email(), "password": "testpass123" }),
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown.body);
    assert!(session_cookie(&wrong_password.headers).is_none());
}

#[tokio::test]
async fn test_login_inactive_user() {
    let app = TestApp::new();
    let email = generate_unique_email();
    let mut user = app.create_user(&email, "testpass123").await;
    user.is_active = false;
    app.users.insert(user).await;

    let response = app
        .post_json(
            "/api/auth/login",
            json!({ "email": email, "password": "testpass123" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_validation_error() {
    let app = TestApp::new();

    let response = app
        .post_json(
            "/api/auth/login",
            json!({ "email": "invalid-email", "password": "testpass123" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "A valid email is required");
}

#[tokio::test]
async fn test_me_with_cookie_and_bearer() {
    let app = TestApp::new();
    let email = generate_unique_email();
    app.create_user(&email, "testpass123").await;
    let token = app.login(&email, "testpass123").await;

    let with_cookie = app.request("GET", "/api/auth/me", None, Some(&token)).await;
    assert_eq!(with_cookie.status, StatusCode::OK);
    assert_eq!(with_cookie.body["email"], email);

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/api/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_me_requires_authentication() {
    let app = TestApp::new();

    let missing = app.request("GET", "/api/auth/me", None, None).await;
    let garbage = app
        .request("GET", "/api/auth/me", None, Some("not-a-jwt"))
        .await;

    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_blacklists_token() {
    let app = TestApp::new();
    let email = generate_unique_email();
    app.create_user(&email, "testpass123").await;
    let token = app.login(&email, "testpass123").await;

    let response = app
        .request("POST", "/api/auth/logout", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let cleared = response
        .headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(cleared.starts_with("access_token="));
    assert!(cleared.contains("Max-Age=0") || cleared.contains("expires="));

    assert!(app.blacklist.is_blacklisted(&token).await.unwrap());
    let me = app.request("GET", "/api/auth/me", None, Some(&token)).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_blacklisted_token_is_rejected_but_others_are_not() {
    let app = TestApp::new();
    let email = generate_unique_email();
    app.create_user(&email, "testpass123").await;
    let revoked = app.login(&email, "testpass123").await;
    let other = app.login(&email, "testpass123").await;

    let in_24h = app.clock.now().timestamp() + 24 * 3600;
    app.blacklist.insert(&revoked, in_24h).await.unwrap();

    let rejected = app
        .request("GET", "/api/auth/me", None, Some(&revoked))
        .await;
    let accepted = app.request("GET", "/api/auth/me", None, Some(&other)).await;

    assert_eq!(rejected.status, StatusCode::UNAUTHORIZED);
    assert_eq!(accepted.status, StatusCode::OK);
}

#[tokio::test]
async fn test_send_verification_email_queues_message() {
    let app = TestApp::new();
    let email = generate_unique_email();
    let user = app.create_user(&email, "testpass123").await;
    let token = app.login(&email, "testpass123").await;

    let response = app
        .request("POST", "/api/auth/send-verification-email", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Verification email sent");

    let records = app.broker.records("email.verification");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key, email);
    assert_eq!(records[0].header("type"), Some("verification"));

    let message = EmailMessage::from_json(&records[0].payload).unwrap();
    assert_eq!(message.kind(), EmailType::Verification);
    let claims =
        verify_email_verification_token(message.get("token").unwrap(), &app.jwt_config).unwrap();
    assert_eq!(claims.sub, user.id.to_string());
}

#[tokio::test]
async fn test_send_verification_email_reports_dispatch_failure() {
    let app = TestApp::new();
    let email = generate_unique_email();
    app.create_user(&email, "testpass123").await;
    let token = app.login(&email, "testpass123").await;
    app.broker.set_unavailable(true);

    let response = app
        .request("POST", "/api/auth/send-verification-email", None, Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(
        response.body["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to send verification email")
    );
}

#[tokio::test]
async fn test_verify_email_marks_user_verified() {
    let app = TestApp::new();
    let email = generate_unique_email();
    let user = app.create_user(&email, "testpass123").await;
    let token = create_email_verification_token(user.id, &email, &app.jwt_config).unwrap();

    let response = app
        .post_json("/api/auth/verify-email", json!({ "token": token }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let stored = app.users.find_by_id(user.id).await.unwrap().unwrap();
    assert!(stored.email_verified);
}

#[tokio::test]
async fn test_verify_email_rejects_session_token() {
    let app = TestApp::new();
    let email = generate_unique_email();
    let user = app.create_user(&email, "testpass123").await;
    let session = app.login(&email, "testpass123").await;

    let response = app
        .post_json("/api/auth/verify-email", json!({ "token": session }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["error"],
        "Invalid or expired verification token"
    );
    let stored = app.users.find_by_id(user.id).await.unwrap().unwrap();
    assert!(!stored.email_verified);
}

struct StalledDispatcher;

#[async_trait]
impl EmailDispatcher for StalledDispatcher {
    async fn send_verification_email(&self, _: &str, _: &str) -> Result<(), DispatchError> {
        std::future::pending().await
    }

    async fn send_password_reset_email(&self, _: &str, _: &str) -> Result<(), DispatchError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_slow_request_times_out_with_504() {
    let app = TestApp::with_dispatcher(Arc::new(StalledDispatcher), Duration::from_millis(200));
    let email = generate_unique_email();
    let user = app.create_user(&email, "testpass123").await;
    let token = create_access_token(user.id, &email, None, &app.jwt_config).unwrap();

    let response = app
        .request("POST", "/api/auth/send-verification-email", None, Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(response.body["error"], "Request timed out");
}
