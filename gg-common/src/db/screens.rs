//! Screen visits

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::time::{http_date_format, now};
use crate::validate::lenient_i64;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Screen {
    pub id: i64,
    pub user_id: Option<i64>,
    pub name: Option<String>,
    pub action: Option<String>,
    pub duration: Option<i64>,
    #[serde(with = "http_date_format")]
    pub created: NaiveDateTime,
}

/// No field is required
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScreenInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub duration: Option<i64>,
}

pub async fn create(pool: &SqlitePool, user_id: i64, input: &ScreenInput) -> Result<Screen> {
    let result = sqlx::query(
        "INSERT INTO screens (user_id, name, action, duration, created) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(&input.name)
    .bind(&input.action)
    .bind(input.duration)
    .bind(now())
    .execute(pool)
    .await?;
    get_required(pool, result.last_insert_rowid()).await
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<Screen>> {
    let screen = sqlx::query_as::<_, Screen>(
        "SELECT id, user_id, name, action, duration, created FROM screens WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(screen)
}

pub async fn get_required(pool: &SqlitePool, id: i64) -> Result<Screen> {
    get(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Screen {}", id)))
}
