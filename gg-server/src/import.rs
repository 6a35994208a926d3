//! Student import from a local file or an http(s) URL

use anyhow::{Context, Result};
use gg_common::db::users::{self, ImportSummary};
use sqlx::SqlitePool;
use tracing::info;

/// Fetch the CSV text behind `source`
pub async fn read_source(source: &str) -> Result<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let text = reqwest::get(source)
            .await
            .with_context(|| format!("Failed to fetch {}", source))?
            .error_for_status()
            .with_context(|| format!("Failed to fetch {}", source))?
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", source))?;
        Ok(text)
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("Failed to read {}", source))
    }
}

/// Import `username,password,teacher_username` rows from `source`
pub async fn import_students(pool: &SqlitePool, source: &str) -> Result<ImportSummary> {
    let data = read_source(source).await?;
    let summary = users::import_students_from_data(pool, &data, b',').await?;
    info!(
        source,
        imported = summary.imported,
        skipped = summary.skipped,
        "Student import finished"
    );
    Ok(summary)
}
