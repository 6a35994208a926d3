//! User endpoints: profile, updates, memberships and score reports

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Extension, Json,
};
use gg_common::db::users::{self, User, UserJson};
use gg_common::db::{schools, scores};
use gg_common::pagination::PageQuery;
use gg_common::Permission;
use serde_json::{json, Map, Value};
use tracing::info;

use super::{page_envelope, path_id, Caller, JsonBody, PREFIX};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Per-page default for a user's game scores
const GAME_SCORES_PER_PAGE: i64 = 10;

async fn load_user(state: &AppState, raw_id: &str) -> ApiResult<User> {
    let id = path_id(raw_id)?;
    Ok(users::get_required(&state.db, id).await?)
}

async fn load_user_by_name(state: &AppState, username: &str) -> ApiResult<User> {
    users::get_by_username(&state.db, username)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User {}", username)))
}

fn is_self_or_admin(caller: &User, target: &User) -> bool {
    caller.id == target.id || caller.is_administrator()
}

/// The caller may see `owner`'s scores: self, administrator or assigned teacher
fn can_view_scores(caller: &User, owner: &User) -> bool {
    is_self_or_admin(caller, owner) || owner.teacher_id == Some(caller.id)
}

/// Resolve the score owner and check the caller may see their results
async fn score_owner(state: &AppState, caller: &Caller, username: &str) -> ApiResult<User> {
    let me = caller.require(Permission::EXIST)?;
    let owner = load_user_by_name(state, username).await?;
    if !can_view_scores(me, &owner) {
        return Err(ApiError::forbidden());
    }
    Ok(owner)
}

/// GET /users/:id
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<UserJson>> {
    let user = load_user(&state, &id).await?;
    Ok(Json(user.to_json()))
}

/// POST /users/:id
///
/// Self-service update; role and confirmation changes need an administrator.
pub async fn post_user(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Map<String, Value>>,
) -> ApiResult<Json<UserJson>> {
    let me = caller.require(Permission::EXIST)?;
    let target = load_user(&state, &id).await?;
    if !is_self_or_admin(me, &target) {
        return Err(ApiError::forbidden());
    }

    let changes = users::parse_changes(&body)?;
    if !me.is_administrator() && changes.iter().any(|(field, _)| field.is_privileged()) {
        return Err(ApiError::forbidden());
    }
    let user = users::apply_changes(&state.db, target.id, &changes).await?;
    info!(user_id = user.id, by = me.id, fields = changes.len(), "User updated");
    Ok(Json(user.to_json()))
}

/// GET /users/:id/schools/
pub async fn get_user_schools(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Value>> {
    let user = load_user(&state, &id).await?;
    let page = schools::list_for_user(&state.db, user.id, query.page, state.settings.posts_per_page).await?;
    let path = format!("{}/users/{}/schools/", PREFIX, user.id);
    let items: Vec<_> = page.items.iter().map(|s| s.to_json()).collect();
    Ok(page_envelope(&state, &headers, &path, "schools", items, &page.pagination, None))
}

/// GET /users/:id/students/
///
/// Students assigned to a teacher.
pub async fn get_user_students(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Value>> {
    let me = caller.require(Permission::EXIST)?;
    let teacher = load_user(&state, &id).await?;
    if !is_self_or_admin(me, &teacher) {
        return Err(ApiError::forbidden());
    }
    let per_page = query.per_page.unwrap_or(state.settings.posts_per_page);
    let page = users::my_students(&state.db, teacher.id, query.page, per_page).await?;
    let path = format!("{}/users/{}/students/", PREFIX, teacher.id);
    let items: Vec<_> = page.items.iter().map(|u| u.to_json()).collect();
    Ok(page_envelope(&state, &headers, &path, "students", items, &page.pagination, query.per_page))
}

/// GET /users/:username/games/:game/max_score
pub async fn get_user_game_max_score(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((username, game)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let owner = score_owner(&state, &caller, &username).await?;
    let max_score = scores::max_score_by_user_and_game(&state.db, owner.id, &game)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No scores for {} in {}", username, game)))?;
    Ok(Json(json!({ "max_score": max_score })))
}

/// GET /users/:username/games/:game/scores
///
/// Oldest first; `per_page` defaults to 10.
pub async fn get_user_game_scores(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    Path((username, game)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Value>> {
    let owner = score_owner(&state, &caller, &username).await?;
    let per_page = query.per_page.unwrap_or(GAME_SCORES_PER_PAGE);
    let page = scores::scores_by_user_and_game(&state.db, owner.id, &game, query.page, per_page).await?;
    let path = format!("{}/users/{}/games/{}/scores", PREFIX, username, game);
    Ok(page_envelope(&state, &headers, &path, "scores", page.items, &page.pagination, query.per_page))
}

/// GET /users/:username/scores/best
pub async fn get_user_best_scores(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(username): Path<String>,
) -> ApiResult<Json<Value>> {
    let owner = score_owner(&state, &caller, &username).await?;
    let best = scores::best_scores(&state.db, owner.id).await?;
    Ok(Json(json!({ "scores": best })))
}

/// GET /users/:username/scores/last
pub async fn get_user_last_scores(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(username): Path<String>,
) -> ApiResult<Json<Value>> {
    let owner = score_owner(&state, &caller, &username).await?;
    let last = scores::last_scores(&state.db, owner.id).await?;
    Ok(Json(json!({ "scores": last })))
}
