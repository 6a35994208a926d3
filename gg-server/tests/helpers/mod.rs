//! Test Helper Utilities
//!
//! Shared app state and request builders for the gamegen HTTP tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use gg_common::config::{CliOverrides, Settings, TomlConfig};
use gg_common::db::{self, game_data, roles, users};
use gg_common::RoleName;
use gg_server::storage::FsStore;
use gg_server::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BASE: &str = "http://localhost";

/// App state over an in-memory database and a temporary object store
///
/// Keep the returned directory alive for the duration of the test.
pub async fn test_state() -> (AppState, TempDir) {
    let pool = db::init_memory_database().await.unwrap();
    roles::insert_roles(&pool).await.unwrap();
    game_data::insert_game_data(&pool).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let toml = TomlConfig {
        public_url: Some(BASE.to_string()),
        database_path: Some(dir.path().join("test.db")),
        ..Default::default()
    };
    let settings = Settings::from_sources(&CliOverrides::default(), &toml).unwrap();
    let store = Arc::new(FsStore::new(dir.path().join("objects"), None));
    let state = AppState::new(pool, settings, "test-secret", store);
    (state, dir)
}

pub fn app(state: &AppState) -> Router {
    build_router(state.clone())
}

/// Create a confirmed user whose password is `cat`
pub async fn add_user(state: &AppState, username: &str, role: RoleName) -> users::User {
    users::create(
        &state.db,
        users::NewUser {
            email: Some(format!("{}@example.com", username)),
            username: Some(username.to_string()),
            password: Some("cat".to_string()),
            role: Some(role),
            confirmed: true,
            ..Default::default()
        },
        None,
    )
    .await
    .unwrap()
}

pub fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
}

/// JSON request with optional Basic credentials `(username, password)`
pub fn json_request(method: &str, uri: &str, auth: Option<(&str, &str)>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::ACCEPT, "application/json")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some((username, password)) = auth {
        builder = builder.header(header::AUTHORIZATION, basic(username, password));
    }
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

/// Send a JSON request and return status plus parsed body (Null when empty)
pub async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<(&str, &str)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let response = send(app, json_request(method, uri, auth, body)).await;
    let status = response.status();
    let bytes = body_bytes(response).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
