//! Lesson attempts

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::time::{http_date_format, now};
use crate::validate::{self, lenient_bool, lenient_i64};
use crate::{Error, Result};

const LESSON_COLUMNS: &str = "id, user_id, lesson, total_pages_viewed, clicks_forward, \
     clicks_backward, clicks_menu, clicks_lesson_repeat, way_exit, is_finished, duration, created";

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Lesson {
    pub id: i64,
    pub user_id: Option<i64>,
    pub lesson: Option<String>,
    pub total_pages_viewed: Option<i64>,
    pub clicks_forward: Option<i64>,
    pub clicks_backward: Option<i64>,
    pub clicks_menu: Option<i64>,
    pub clicks_lesson_repeat: Option<i64>,
    pub way_exit: Option<String>,
    pub is_finished: bool,
    pub duration: Option<i64>,
    #[serde(with = "http_date_format")]
    pub created: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LessonInput {
    #[serde(default)]
    pub lesson: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_pages_viewed: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub clicks_forward: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub clicks_backward: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub clicks_menu: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub clicks_lesson_repeat: Option<i64>,
    #[serde(default)]
    pub way_exit: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_finished: Option<bool>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub duration: Option<i64>,
}

pub async fn create(pool: &SqlitePool, user_id: i64, input: &LessonInput) -> Result<Lesson> {
    validate::required(input.lesson.as_deref(), "lesson does not have a valid lesson id")?;
    let result = sqlx::query(
        r#"
        INSERT INTO lessons (user_id, lesson, total_pages_viewed, clicks_forward, clicks_backward,
                             clicks_menu, clicks_lesson_repeat, way_exit, is_finished, duration, created)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(&input.lesson)
    .bind(input.total_pages_viewed)
    .bind(input.clicks_forward)
    .bind(input.clicks_backward)
    .bind(input.clicks_menu)
    .bind(input.clicks_lesson_repeat)
    .bind(&input.way_exit)
    .bind(input.is_finished.unwrap_or(false))
    .bind(input.duration)
    .bind(now())
    .execute(pool)
    .await?;
    get_required(pool, result.last_insert_rowid()).await
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<Lesson>> {
    let sql = format!("SELECT {} FROM lessons WHERE id = ?", LESSON_COLUMNS);
    let lesson = sqlx::query_as::<_, Lesson>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(lesson)
}

pub async fn get_required(pool: &SqlitePool, id: i64) -> Result<Lesson> {
    get(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Lesson {}", id)))
}

/// Map of lesson id to whether any attempt was finished
pub async fn get_finished_lessons(pool: &SqlitePool, user_id: i64) -> Result<BTreeMap<String, bool>> {
    let rows: Vec<(String, bool)> = sqlx::query_as(
        r#"
        SELECT lesson, MAX(is_finished)
        FROM lessons
        WHERE user_id = ? AND lesson IS NOT NULL
        GROUP BY lesson
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}
