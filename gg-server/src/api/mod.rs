//! JSON API handlers (`/api/v1.0`)

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use gg_common::pagination::{PageLinks, Pagination};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::ApiError;
use crate::AppState;

pub mod assets;
pub mod auth;
pub mod game_data;
pub mod health;
pub mod jobs;
pub mod lessons;
pub mod schools;
pub mod scores;
pub mod screens;
pub mod users;

pub use auth::{auth_middleware, Caller};
pub use health::health_routes;

/// Mount point of the API
pub const PREFIX: &str = "/api/v1.0";

/// API routes, relative to [`PREFIX`]
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/token", get(auth::get_token))
        .route("/login", post(auth::login))
        .route("/users/:user", get(users::get_user).post(users::post_user))
        .route("/users/:user/schools/", get(users::get_user_schools))
        .route("/users/:user/students/", get(users::get_user_students))
        .route("/users/:user/games/:game/max_score", get(users::get_user_game_max_score))
        .route("/users/:user/games/:game/scores", get(users::get_user_game_scores))
        .route("/users/:user/scores/best", get(users::get_user_best_scores))
        .route("/users/:user/scores/last", get(users::get_user_last_scores))
        .route("/schools/", get(schools::get_schools).post(schools::new_school))
        .route("/schools/:id", get(schools::get_school).put(schools::edit_school))
        .route(
            "/schools/:id/teachers/",
            get(schools::get_teachers).put(schools::add_teacher_to_school),
        )
        .route(
            "/schools/:id/students/",
            get(schools::get_students).put(schools::add_student_to_school),
        )
        .route("/scores/", post(scores::create_score))
        .route("/scores/:id", get(scores::get_score))
        .route("/lessons/", post(lessons::create_lesson))
        .route("/lessons/finished", get(lessons::get_finished_lessons))
        .route("/lessons/:id", get(lessons::get_lesson))
        .route("/screens/", post(screens::create_screen))
        .route("/screens/:id", get(screens::get_screen))
        .route("/assets/", get(assets::list_assets).post(assets::new_asset))
        .route("/assets/:id", get(assets::get_asset))
        .route("/assets/:id/content", put(assets::upload_asset_content))
        .route("/game_data/", get(game_data::list_game_data))
        .route(
            "/game_data/:name",
            get(game_data::get_game_data).put(game_data::put_game_data),
        )
        .route("/jobs/game-stats", post(jobs::start_game_stats))
        .route("/jobs/:id", get(jobs::get_job))
}

/// Fallback for unknown routes: JSON for API clients, HTML otherwise
pub async fn not_found(uri: Uri, headers: HeaderMap) -> Response {
    let wants_json = uri.path().starts_with(PREFIX)
        || headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .map(|accept| accept.contains("application/json"))
            .unwrap_or(false);

    if wants_json {
        (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response()
    } else {
        (StatusCode::NOT_FOUND, Html(crate::views::layout::not_found_page())).into_response()
    }
}

/// JSON request body; malformed input is a 400 in the API error shape
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| ApiError::BadRequest(e.body_text()))?;
        Ok(JsonBody(value))
    }
}

/// Parse an integer path segment; anything else is a 404
pub(crate) fn path_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::not_found(format!("'{}' is not an id", raw)))
}

/// `{<key>: [...], prev, next, count}` with absolute page links
pub(crate) fn page_envelope<T: Serialize>(
    state: &AppState,
    headers: &HeaderMap,
    path: &str,
    key: &str,
    items: Vec<T>,
    pagination: &Pagination,
    per_page: Option<i64>,
) -> Json<Value> {
    let base = state.external_url(headers, path);
    let links = PageLinks::build(pagination, |n| match per_page {
        Some(_) => format!("{}?page={}&per_page={}", base, n, pagination.per_page),
        None => format!("{}?page={}", base, n),
    });

    let mut body = Map::new();
    body.insert(key.to_string(), json!(items));
    body.insert("prev".to_string(), json!(links.prev));
    body.insert("next".to_string(), json!(links.next));
    body.insert("count".to_string(), json!(links.count));
    Json(Value::Object(body))
}

/// 201 with a Location header pointing at the new resource
pub(crate) fn created<T: Serialize>(location: String, body: T) -> Response {
    (StatusCode::CREATED, [(header::LOCATION, location)], Json(body)).into_response()
}
