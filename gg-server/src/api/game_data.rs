//! Game data files served to the client

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::NaiveDateTime;
use gg_common::db::game_data::{self, GameData};
use gg_common::time::http_date_format;
use gg_common::Permission;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use super::Caller;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct GameDataJson {
    pub file_name: String,
    pub url: String,
    #[serde(with = "http_date_format")]
    pub created: NaiveDateTime,
}

fn game_data_json(state: &AppState, row: &GameData) -> GameDataJson {
    GameDataJson {
        file_name: row.file_name.clone(),
        url: state.store.public_url(&row.storage_key()),
        created: row.created,
    }
}

async fn load(state: &AppState, name: &str) -> ApiResult<GameData> {
    game_data::get(&state.db, name)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Game data {}", name)))
}

/// GET /game_data/
pub async fn list_game_data(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<Value>> {
    caller.require(Permission::EXIST)?;
    let items: Vec<_> = game_data::list(&state.db)
        .await?
        .iter()
        .map(|row| game_data_json(&state, row))
        .collect();
    Ok(Json(json!({ "game_data": items })))
}

/// GET /game_data/:name
///
/// Returns the stored file content.
pub async fn get_game_data(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(name): Path<String>,
) -> ApiResult<Response> {
    caller.require(Permission::EXIST)?;
    let row = load(&state, &name).await?;
    let content = state
        .store
        .get(&row.storage_key())
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No content uploaded for {}", name)))?;
    Ok(([(header::CONTENT_TYPE, "application/json")], content).into_response())
}

/// PUT /game_data/:name
pub async fn put_game_data(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(name): Path<String>,
    body: Bytes,
) -> ApiResult<Json<GameDataJson>> {
    let me = caller.require(Permission::ADMINISTER)?;
    let row = load(&state, &name).await?;
    serde_json::from_slice::<Value>(&body)
        .map_err(|e| ApiError::BadRequest(format!("{} is not valid JSON: {}", name, e)))?;
    state
        .store
        .put(&row.storage_key(), body.to_vec(), "application/json")
        .await?;
    info!(file = %name, by = me.id, "Game data updated");
    Ok(Json(game_data_json(&state, &row)))
}
