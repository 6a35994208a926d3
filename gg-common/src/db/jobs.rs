//! Background export job records
//!
//! A job moves queued -> running -> finished | failed and is never retried.

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::time::now;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Finished,
    Failed,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Finished => "finished",
            JobState::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct ExportJob {
    pub id: String,
    pub kind: String,
    pub state: String,
    pub result_key: Option<String>,
    pub error: Option<String>,
    pub created: NaiveDateTime,
    pub finished: Option<NaiveDateTime>,
}

/// Record a new queued job and return it
pub async fn enqueue(pool: &SqlitePool, kind: &str) -> Result<ExportJob> {
    let id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO export_jobs (id, kind, state, created) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(kind)
        .bind(JobState::Queued.as_str())
        .bind(now())
        .execute(pool)
        .await?;
    get_required(pool, &id).await
}

pub async fn get(pool: &SqlitePool, id: &str) -> Result<Option<ExportJob>> {
    let job = sqlx::query_as::<_, ExportJob>(
        "SELECT id, kind, state, result_key, error, created, finished FROM export_jobs WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(job)
}

pub async fn get_required(pool: &SqlitePool, id: &str) -> Result<ExportJob> {
    get(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Job {}", id)))
}

pub async fn mark_running(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("UPDATE export_jobs SET state = ? WHERE id = ?")
        .bind(JobState::Running.as_str())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_finished(pool: &SqlitePool, id: &str, result_key: &str) -> Result<()> {
    sqlx::query("UPDATE export_jobs SET state = ?, result_key = ?, finished = ? WHERE id = ?")
        .bind(JobState::Finished.as_str())
        .bind(result_key)
        .bind(now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_failed(pool: &SqlitePool, id: &str, error: &str) -> Result<()> {
    sqlx::query("UPDATE export_jobs SET state = ?, error = ?, finished = ? WHERE id = ?")
        .bind(JobState::Failed.as_str())
        .bind(error)
        .bind(now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;

    #[tokio::test]
    async fn test_job_lifecycle() {
        let pool = init_memory_database().await.unwrap();
        let job = enqueue(&pool, "game-stats").await.unwrap();
        assert_eq!(job.state, "queued");
        assert!(job.finished.is_none());

        mark_running(&pool, &job.id).await.unwrap();
        assert_eq!(get_required(&pool, &job.id).await.unwrap().state, "running");

        mark_finished(&pool, &job.id, "jobs/x.csv").await.unwrap();
        let done = get_required(&pool, &job.id).await.unwrap();
        assert_eq!(done.state, "finished");
        assert_eq!(done.result_key.as_deref(), Some("jobs/x.csv"));
        assert!(done.finished.is_some());
    }

    #[tokio::test]
    async fn test_failed_job_keeps_error() {
        let pool = init_memory_database().await.unwrap();
        let job = enqueue(&pool, "game-stats").await.unwrap();
        mark_failed(&pool, &job.id, "bucket unreachable").await.unwrap();
        let failed = get_required(&pool, &job.id).await.unwrap();
        assert_eq!(failed.state, "failed");
        assert_eq!(failed.error.as_deref(), Some("bucket unreachable"));
        assert!(get(&pool, "missing").await.unwrap().is_none());
    }
}
