//! Shared fixtures for the integration tests: a throwaway SQLite database and
//! image directory per test, and helpers for driving the router.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use sea_orm::{Database, DatabaseConnection};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use tag_registry::db::enums::Role;
use tag_registry::db::entities::user;
use tag_registry::db::schema::sync_schema;
use tag_registry::server::config::ServerConfig;
use tag_registry::services::auth_service::{self, NewIdentity};
use tag_registry::web::{AppState, create_axum_router};

pub const TEST_SECRET: &str = "integration-test-secret";
pub const TEST_BASE_URL: &str = "http://localhost:8080/";

pub struct TestApp {
    pub state: Arc<AppState>,
    pub router: Router,
    _temp_dir: TempDir,
}

impl TestApp {
    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db_pool
    }

    /// Registers an identity directly through the service layer.
    pub async fn seed_user(&self, email: &str, password: &str, name: &str, role: Role) -> user::Model {
        auth_service::register_user(
            self.db(),
            self.state.password_hasher,
            NewIdentity {
                email: email.to_string(),
                password: password.to_string(),
                name: name.to_string(),
                role,
                image: None,
            },
        )
        .await
        .expect("Failed to seed user")
    }

    /// A valid session cookie header value for `user_id`.
    pub fn session_cookie(&self, user_id: i32) -> String {
        let token = self
            .state
            .token_codec
            .issue(user_id, chrono::Utc::now())
            .expect("Failed to issue token");
        format!("Authorization={token}")
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed to respond");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        TestResponse { status, headers, body, bytes: bytes.to_vec() }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub bytes: Vec<u8>,
}

impl TestResponse {
    pub fn set_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

pub fn test_config(temp_dir: &TempDir) -> ServerConfig {
    let db_path = temp_dir.path().join("test.db");
    ServerConfig {
        jwt_secret: TEST_SECRET.to_string(),
        base_url: TEST_BASE_URL.to_string(),
        database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
        listen_addr: "127.0.0.1:0".to_string(),
        image_dir: temp_dir.path().join("images").display().to_string(),
        log_dir: temp_dir.path().join("logs").display().to_string(),
        password_cost: 4,
    }
}

pub async fn spawn_app() -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = Arc::new(test_config(&temp_dir));

    let db = Database::connect(config.database_url.as_str())
        .await
        .expect("Failed to open test database");
    sync_schema(&db).await.expect("Failed to create schema");

    let state = Arc::new(AppState::new(db, config).expect("Failed to build app state"));
    state
        .image_store
        .ensure_dirs()
        .await
        .expect("Failed to create image dirs");
    let router = create_axum_router(state.clone());

    TestApp { state, router, _temp_dir: temp_dir }
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub const MULTIPART_BOUNDARY: &str = "X-TEST-BOUNDARY";

/// Builds a multipart body with text `fields` and an optional `Image` file.
pub fn multipart_request(
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    fields: &[(&str, &str)],
    image: Option<(&str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"Image\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder().method(method).uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
    );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}
