//! Lesson endpoints

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
    Extension, Json,
};
use gg_common::db::lessons::{self, Lesson, LessonInput};
use gg_common::Permission;
use tracing::debug;

use super::{created, path_id, Caller, JsonBody, PREFIX};
use crate::error::ApiResult;
use crate::AppState;

/// POST /lessons/
pub async fn create_lesson(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    JsonBody(input): JsonBody<LessonInput>,
) -> ApiResult<Response> {
    let me = caller.require(Permission::EXIST)?;
    let lesson = lessons::create(&state.db, me.id, &input).await?;
    debug!(lesson_id = lesson.id, user_id = me.id, "Lesson recorded");
    let location = state.external_url(&headers, &format!("{}/lessons/{}", PREFIX, lesson.id));
    Ok(created(location, lesson))
}

/// GET /lessons/:id
pub async fn get_lesson(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> ApiResult<Json<Lesson>> {
    caller.require(Permission::EXIST)?;
    let lesson = lessons::get_required(&state.db, path_id(&id)?).await?;
    Ok(Json(lesson))
}

/// GET /lessons/finished
///
/// Lesson id to whether the caller finished any attempt of it.
pub async fn get_finished_lessons(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<BTreeMap<String, bool>>> {
    let me = caller.require(Permission::EXIST)?;
    Ok(Json(lessons::get_finished_lessons(&state.db, me.id).await?))
}
