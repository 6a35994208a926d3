//! School endpoints and teacher/student rosters

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
    Extension, Json,
};
use gg_common::db::schools::{self, School, SchoolInput, SchoolJson};
use gg_common::db::users::{self, User};
use gg_common::pagination::{Page, PageQuery};
use gg_common::Permission;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{created, page_envelope, path_id, Caller, JsonBody, PREFIX};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

async fn load_school(state: &AppState, raw_id: &str) -> ApiResult<School> {
    let id = path_id(raw_id)?;
    Ok(schools::get_required(&state.db, id).await?)
}

/// GET /schools/
pub async fn get_schools(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Value>> {
    let page = schools::list(&state.db, query.page, state.settings.posts_per_page).await?;
    let path = format!("{}/schools/", PREFIX);
    let items: Vec<_> = page.items.iter().map(School::to_json).collect();
    Ok(page_envelope(&state, &headers, &path, "schools", items, &page.pagination, None))
}

/// GET /schools/:id
pub async fn get_school(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> ApiResult<Json<SchoolJson>> {
    caller.require(Permission::EXIST)?;
    let school = load_school(&state, &id).await?;
    Ok(Json(school.to_json()))
}

/// POST /schools/
pub async fn new_school(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    JsonBody(input): JsonBody<SchoolInput>,
) -> ApiResult<Response> {
    let me = caller.require(Permission::CREATE_SCHOOLS)?;
    let school = schools::create_from_json(&state.db, &input).await?;
    info!(school_id = school.id, by = me.id, "School created");
    let location = state.external_url(&headers, &format!("{}/schools/{}", PREFIX, school.id));
    Ok(created(location, school.to_json()))
}

/// PUT /schools/:id
///
/// Renames the school; a body without a name leaves it unchanged.
pub async fn edit_school(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<SchoolInput>,
) -> ApiResult<Json<SchoolJson>> {
    caller.require(Permission::CREATE_SCHOOLS)?;
    let school = load_school(&state, &id).await?;
    let school = match input.name.as_deref() {
        Some(name) if !name.is_empty() => schools::rename(&state.db, school.id, name).await?,
        _ => school,
    };
    Ok(Json(school.to_json()))
}

fn roster(
    state: &AppState,
    headers: &HeaderMap,
    school: &School,
    key: &str,
    page: Page<User>,
) -> Json<Value> {
    let path = format!("{}/schools/{}/{}/", PREFIX, school.id, key);
    let items: Vec<_> = page.items.iter().map(User::to_json).collect();
    page_envelope(state, headers, &path, key, items, &page.pagination, None)
}

/// GET /schools/:id/teachers/
pub async fn get_teachers(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Value>> {
    caller.require(Permission::EXIST)?;
    let school = load_school(&state, &id).await?;
    let page = schools::teachers(&state.db, school.id, query.page, state.settings.posts_per_page).await?;
    Ok(roster(&state, &headers, &school, "teachers", page))
}

/// GET /schools/:id/students/
pub async fn get_students(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Value>> {
    caller.require(Permission::EXIST)?;
    let school = load_school(&state, &id).await?;
    let page = schools::students(&state.db, school.id, query.page, state.settings.posts_per_page).await?;
    Ok(roster(&state, &headers, &school, "students", page))
}

/// `{"id": <user id>}` body of roster additions
#[derive(Debug, Deserialize)]
pub struct MemberRequest {
    #[serde(default, deserialize_with = "gg_common::validate::lenient_i64")]
    pub id: Option<i64>,
}

async fn load_member(state: &AppState, request: &MemberRequest) -> ApiResult<User> {
    let id = request
        .id
        .ok_or_else(|| ApiError::not_found("User without id"))?;
    Ok(users::get_required(&state.db, id).await?)
}

/// PUT /schools/:id/teachers/
pub async fn add_teacher_to_school(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<MemberRequest>,
) -> ApiResult<Json<Value>> {
    caller.require(Permission::CREATE_SCHOOLS)?;
    let school = load_school(&state, &id).await?;
    let teacher = load_member(&state, &request).await?;
    schools::add_teacher(&state.db, school.id, &teacher).await?;
    info!(school_id = school.id, user_id = teacher.id, "Teacher added to school");
    Ok(Json(json!({ "school": school.to_json() })))
}

/// PUT /schools/:id/students/
pub async fn add_student_to_school(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<MemberRequest>,
) -> ApiResult<Json<Value>> {
    caller.require(Permission::CREATE_SCHOOLS)?;
    let school = load_school(&state, &id).await?;
    let student = load_member(&state, &request).await?;
    schools::add_student(&state.db, school.id, &student).await?;
    info!(school_id = school.id, user_id = student.id, "Student added to school");
    Ok(Json(json!({ "school": school.to_json() })))
}
