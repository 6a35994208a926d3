//! Score endpoints

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
    Extension, Json,
};
use gg_common::db::scores::{self, Score, ScoreInput};
use gg_common::Permission;
use tracing::debug;

use super::{created, path_id, Caller, JsonBody, PREFIX};
use crate::error::ApiResult;
use crate::AppState;

/// POST /scores/
///
/// The score belongs to the caller regardless of the body.
pub async fn create_score(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    JsonBody(input): JsonBody<ScoreInput>,
) -> ApiResult<Response> {
    let me = caller.require(Permission::EXIST)?;
    let score = scores::create(&state.db, me.id, &input).await?;
    debug!(score_id = score.id, user_id = me.id, game = ?score.game, "Score recorded");
    let location = state.external_url(&headers, &format!("{}/scores/{}", PREFIX, score.id));
    Ok(created(location, score))
}

/// GET /scores/:id
pub async fn get_score(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> ApiResult<Json<Score>> {
    caller.require(Permission::EXIST)?;
    let score = scores::get_required(&state.db, path_id(&id)?).await?;
    Ok(Json(score))
}
