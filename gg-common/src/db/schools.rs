//! Schools and their teacher/student rosters

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::auth::permission::RoleName;
use crate::db::users::User;
use crate::pagination::Page;
use crate::time::{http_date_format, now};
use crate::validate;
use crate::{Error, Result};

const SCHOOL_COLUMNS: &str =
    "id, enabled, name, address, email, description, created, updated";

#[derive(Debug, Clone, FromRow)]
pub struct School {
    pub id: i64,
    pub enabled: bool,
    pub name: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    pub created: NaiveDateTime,
    pub updated: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchoolJson {
    pub id: i64,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(with = "http_date_format")]
    pub created: NaiveDateTime,
    #[serde(with = "http_date_format")]
    pub updated: NaiveDateTime,
}

impl School {
    pub fn to_json(&self) -> SchoolJson {
        SchoolJson {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            created: self.created,
            updated: self.updated,
        }
    }
}

/// School body accepted by the API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchoolInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl SchoolInput {
    /// The validated name
    pub fn name(&self) -> Result<&str> {
        validate::required(self.name.as_deref(), "school does not have a name")
    }
}

/// Full attribute set edited from the admin views
#[derive(Debug, Clone, Default)]
pub struct SchoolEdit {
    pub name: String,
    pub enabled: bool,
    pub address: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
}

pub async fn create(pool: &SqlitePool, name: &str, description: Option<&str>) -> Result<School> {
    let ts = now();
    let result = sqlx::query(
        "INSERT INTO schools (name, description, created, updated) VALUES (?, ?, ?, ?)",
    )
    .bind(name)
    .bind(description)
    .bind(ts)
    .bind(ts)
    .execute(pool)
    .await?;
    let id = result.last_insert_rowid();
    debug!(school_id = id, name = %name, "School created");
    get_required(pool, id).await
}

/// Create a school from an API body; a missing or empty name is rejected
pub async fn create_from_json(pool: &SqlitePool, input: &SchoolInput) -> Result<School> {
    let name = input.name()?;
    create(pool, name, input.description.as_deref()).await
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<School>> {
    let sql = format!("SELECT {} FROM schools WHERE id = ?", SCHOOL_COLUMNS);
    let school = sqlx::query_as::<_, School>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(school)
}

pub async fn get_required(pool: &SqlitePool, id: i64) -> Result<School> {
    get(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("School {}", id)))
}

pub async fn rename(pool: &SqlitePool, id: i64, name: &str) -> Result<School> {
    sqlx::query("UPDATE schools SET name = ?, updated = ? WHERE id = ?")
        .bind(name)
        .bind(now())
        .bind(id)
        .execute(pool)
        .await?;
    get_required(pool, id).await
}

/// Overwrite every editable attribute
pub async fn edit(pool: &SqlitePool, id: i64, edit: &SchoolEdit) -> Result<School> {
    sqlx::query(
        r#"
        UPDATE schools
        SET name = ?, enabled = ?, address = ?, email = ?, description = ?, updated = ?
        WHERE id = ?
        "#,
    )
    .bind(&edit.name)
    .bind(edit.enabled)
    .bind(&edit.address)
    .bind(&edit.email)
    .bind(&edit.description)
    .bind(now())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| Error::from(e).or_conflict("Email"))?;
    get_required(pool, id).await
}

pub async fn get_by_name(pool: &SqlitePool, name: &str) -> Result<Option<School>> {
    let sql = format!("SELECT {} FROM schools WHERE name = ? ORDER BY id LIMIT 1", SCHOOL_COLUMNS);
    let school = sqlx::query_as::<_, School>(&sql)
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(school)
}

pub async fn get_by_email(pool: &SqlitePool, email: &str) -> Result<Option<School>> {
    let sql = format!("SELECT {} FROM schools WHERE email = ?", SCHOOL_COLUMNS);
    let school = sqlx::query_as::<_, School>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(school)
}

/// All schools, newest first
pub async fn list(pool: &SqlitePool, page: i64, per_page: i64) -> Result<Page<School>> {
    let page_sql = format!(
        "SELECT {} FROM schools ORDER BY created DESC, id DESC LIMIT ? OFFSET ?",
        SCHOOL_COLUMNS
    );
    crate::db::paginate(pool, "SELECT COUNT(*) FROM schools", &page_sql, None, page, per_page).await
}

/// Schools a user belongs to, newest first
pub async fn list_for_user(pool: &SqlitePool, user_id: i64, page: i64, per_page: i64) -> Result<Page<School>> {
    let page_sql = r#"
        SELECT s.id, s.enabled, s.name, s.address, s.email, s.description, s.created, s.updated
        FROM schools s
        JOIN users_schools us ON us.school_id = s.id
        WHERE us.user_id = ?
        ORDER BY s.created DESC, s.id DESC
        LIMIT ? OFFSET ?
    "#;
    crate::db::paginate(
        pool,
        "SELECT COUNT(*) FROM users_schools WHERE user_id = ?",
        page_sql,
        Some(user_id),
        page,
        per_page,
    )
    .await
}

async fn add_member(pool: &SqlitePool, school_id: i64, user_id: i64) -> Result<()> {
    let ts = now();
    sqlx::query(
        "INSERT OR IGNORE INTO users_schools (user_id, school_id, created, updated) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(school_id)
    .bind(ts)
    .bind(ts)
    .execute(pool)
    .await?;
    Ok(())
}

/// Add a teacher; adding twice is a no-op
pub async fn add_teacher(pool: &SqlitePool, school_id: i64, user: &User) -> Result<()> {
    if !user.is_teacher() {
        return Err(Error::InvalidInput("User is not a teacher".to_string()));
    }
    add_member(pool, school_id, user.id).await
}

/// Add a student; adding twice is a no-op
pub async fn add_student(pool: &SqlitePool, school_id: i64, user: &User) -> Result<()> {
    if !user.is_student() {
        return Err(Error::InvalidInput("User is not a student".to_string()));
    }
    add_member(pool, school_id, user.id).await
}

async fn members(
    pool: &SqlitePool,
    school_id: i64,
    role: RoleName,
    page: i64,
    per_page: i64,
) -> Result<Page<User>> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM users_schools us
        JOIN users u ON u.id = us.user_id
        JOIN roles r ON r.id = u.role_id
        WHERE us.school_id = ? AND r.name = ?
        "#,
    )
    .bind(school_id)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    let pagination = crate::pagination::Pagination::new(count, page, per_page);
    let items = sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.email, u.username, u.role_id, u.teacher_id,
               u.password_hash, u.password_salt, u.confirmed, u.tutorial_completed,
               u.exam_points, u.name, u.gender, u.avatar_hash, u.created, u.updated,
               r.name AS role_name, r.permissions AS permissions
        FROM users_schools us
        JOIN users u ON u.id = us.user_id
        JOIN roles r ON r.id = u.role_id
        WHERE us.school_id = ? AND r.name = ?
        ORDER BY us.rowid
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(school_id)
    .bind(role.as_str())
    .bind(pagination.per_page)
    .bind(pagination.offset)
    .fetch_all(pool)
    .await?;

    Ok(Page { items, pagination })
}

/// Teachers of a school in the order they were added
pub async fn teachers(pool: &SqlitePool, school_id: i64, page: i64, per_page: i64) -> Result<Page<User>> {
    members(pool, school_id, RoleName::Teacher, page, per_page).await
}

/// Students of a school in the order they were added
pub async fn students(pool: &SqlitePool, school_id: i64, page: i64, per_page: i64) -> Result<Page<User>> {
    members(pool, school_id, RoleName::Student, page, per_page).await
}
