//! Screen visit endpoints

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
    Extension, Json,
};
use gg_common::db::screens::{self, Screen, ScreenInput};
use gg_common::Permission;

use super::{created, path_id, Caller, JsonBody, PREFIX};
use crate::error::ApiResult;
use crate::AppState;

/// POST /screens/
pub async fn create_screen(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    JsonBody(input): JsonBody<ScreenInput>,
) -> ApiResult<Response> {
    let me = caller.require(Permission::EXIST)?;
    let screen = screens::create(&state.db, me.id, &input).await?;
    let location = state.external_url(&headers, &format!("{}/screens/{}", PREFIX, screen.id));
    Ok(created(location, screen))
}

/// GET /screens/:id
pub async fn get_screen(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> ApiResult<Json<Screen>> {
    caller.require(Permission::EXIST)?;
    Ok(Json(screens::get_required(&state.db, path_id(&id)?).await?))
}
