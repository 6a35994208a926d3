//! gamegen server library
//!
//! JSON API under `/api/v1.0`, server-rendered admin views, object storage
//! and the background statistics export.

use std::sync::Arc;

use axum::http::{header, HeaderMap};
use axum::Router;
use gg_common::auth::TokenSigner;
use gg_common::config::Settings;
use sqlx::SqlitePool;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod import;
pub mod jobs;
pub mod storage;
pub mod views;

use storage::ObjectStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Resolved settings
    pub settings: Arc<Settings>,
    /// Signs API tokens, session cookies and upload URLs
    pub signer: Arc<TokenSigner>,
    /// Asset, game data and export storage
    pub store: Arc<dyn ObjectStore>,
}

impl AppState {
    pub fn new(db: SqlitePool, settings: Settings, secret_key: &str, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            db,
            settings: Arc::new(settings),
            signer: Arc::new(TokenSigner::new(secret_key)),
            store,
        }
    }

    /// Scheme and host for absolute links: `public_url`, else `http://<Host>`
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(url) = &self.settings.public_url {
            return url.trim_end_matches('/').to_string();
        }
        let host = headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("localhost");
        format!("http://{}", host)
    }

    /// Absolute URL for a path on this server
    pub fn external_url(&self, headers: &HeaderMap, path: &str) -> String {
        format!("{}{}", self.base_url(headers), path)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;

    let api = api::routes().layer(middleware::from_fn_with_state(
        state.clone(),
        api::auth_middleware,
    ));

    let mut app = Router::new()
        .nest(api::PREFIX, api)
        .merge(views::routes())
        .merge(api::health_routes());

    if let Some(root) = state.store.local_root() {
        app = app.nest_service(storage::FS_MOUNT, ServeDir::new(root));
    }

    app.fallback(api::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
