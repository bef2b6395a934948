#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use chrono::Utc;
use fake::Fake;
use fake::faker::internet::en::SafeEmail;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use dentra::modules::notifications::{EmailDispatcher, QueueEmailDispatcher};
use dentra::modules::password_reset::PasswordResetService;
use dentra::router::init_router;
use dentra::state::AppState;
use dentra_config::{CorsConfig, JwtConfig, QueueConfig, ServerConfig};
use dentra_core::{FixedClock, hash_password};
use dentra_db::{
    MemoryBlacklistStore, MemoryPasswordResetStore, MemoryTokenStore, MemoryUserRepository,
};
use dentra_models::User;
use dentra_queue::MemoryBroker;

pub const TEST_SECRET: &str = "test-secret-that-is-at-least-32-bytes-long";

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: TEST_SECRET.to_string(),
        previous_secrets: vec![],
        access_token_expiry: 86400,
        verification_token_expiry: 86400,
        cookie_secure: false,
    }
}

pub fn generate_unique_email() -> String {
    let email: String = SafeEmail().fake();
    format!("{}-{}", uuid::Uuid::new_v4().simple(), email)
}

/// Router wired to in-memory stores, a [`MemoryBroker`] and a
/// [`FixedClock`] shared by every store.
pub struct TestApp {
    pub router: Router,
    pub users: MemoryUserRepository,
    pub tokens: MemoryTokenStore,
    pub blacklist: MemoryBlacklistStore,
    pub broker: MemoryBroker,
    pub clock: FixedClock,
    pub jwt_config: JwtConfig,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub raw: Vec<u8>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(ServerConfig::default(), None)
    }

    /// Same app with a custom dispatcher and request timeout.
    pub fn with_dispatcher(dispatcher: Arc<dyn EmailDispatcher>, request_timeout: Duration) -> Self {
        let server_config = ServerConfig {
            request_timeout,
            ..ServerConfig::default()
        };
        Self::build(server_config, Some(dispatcher))
    }

    fn build(server_config: ServerConfig, dispatcher: Option<Arc<dyn EmailDispatcher>>) -> Self {
        let clock = FixedClock::new(Utc::now());
        let users = MemoryUserRepository::new();
        let tokens = MemoryTokenStore::new(Arc::new(clock.clone()), chrono::Duration::hours(1));
        let blacklist = MemoryBlacklistStore::new(Arc::new(clock.clone()));
        let broker = MemoryBroker::new(4);

        let dispatcher = dispatcher.unwrap_or_else(|| {
            Arc::new(QueueEmailDispatcher::new(
                Arc::new(broker.clone()),
                &QueueConfig::default(),
            ))
        });

        let password_reset = PasswordResetService::new(
            Arc::new(users.clone()),
            Arc::new(tokens.clone()),
            Arc::new(MemoryPasswordResetStore::new(users.clone(), tokens.clone())),
            dispatcher.clone(),
        );

        let jwt_config = test_jwt_config();
        let state = AppState::new(
            Arc::new(users.clone()),
            Arc::new(blacklist.clone()),
            dispatcher,
            password_reset,
            jwt_config.clone(),
            server_config,
            CorsConfig {
                allowed_origins: vec!["http://localhost:5173".to_string()],
            },
        );

        Self {
            router: init_router(state, None),
            users,
            tokens,
            blacklist,
            broker,
            clock,
            jwt_config,
        }
    }

    pub async fn create_user(&self, email: &str, password: &str) -> User {
        let user = User::new(email, hash_password(password).unwrap(), "Test", "User");
        self.users.insert(user.clone()).await;
        user
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, format!("access_token={}", cookie));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let raw = response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        let body = serde_json::from_slice(&raw).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
            raw,
        }
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> TestResponse {
        self.request("POST", uri, Some(body), None).await
    }

    /// Logs in and returns the `access_token` cookie value.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post_json(
                "/api/auth/login",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);
        session_cookie(&response.headers).expect("login sets the access_token cookie")
    }

    /// Value of the most recently issued reset token for `email`.
    pub async fn latest_reset_token(&self, email: &str) -> String {
        self.tokens
            .tokens_for(email)
            .await
            .last()
            .map(|t| t.token.clone())
            .expect("a reset token was issued")
    }
}

/// Extracts the `access_token` value from `Set-Cookie` headers.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| v.strip_prefix("access_token="))
        .map(|v| v.split(';').next().unwrap_or_default().to_string())
}
