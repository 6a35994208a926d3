//! Per-user usage statistics report
//!
//! One tab-separated row per user covering lessons, games, quizzes and
//! screens from the configured catalogue. Missing values render as 0 (or
//! an empty string for names). The header row is always present.

use sqlx::SqlitePool;
use tracing::debug;

use crate::config::StatsCatalogue;
use crate::{Error, Result};

/// Column names in output order
pub fn header(catalogue: &StatsCatalogue) -> Vec<String> {
    let mut cols: Vec<String> = ["user_id", "school", "teacher", "username"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for lesson in &catalogue.lessons {
        cols.push(format!("lessons-{}-num_accesses", lesson));
        cols.push(format!("lessons-{}-total_duration", lesson));
    }
    for game in &catalogue.games {
        for metric in [
            "first_game_score",
            "last_game_score",
            "avg_game_score",
            "num_accesses",
            "total_duration",
        ] {
            cols.push(format!("games-{}-{}", game, metric));
        }
    }
    for quiz in &catalogue.quizzes {
        cols.push(format!("quizes-{}-perc_score", quiz));
        cols.push(format!("quizes-{}-total_duration", quiz));
    }
    for screen in &catalogue.screens {
        cols.push(format!("screens-{}-num_accesses", screen));
        cols.push(format!("screens-{}-total_duration", screen));
    }
    for total in [
        "total_lessons-num_accesses",
        "total_lessons-total_duration",
        "total_games-num_accesses",
        "total_games-total_duration",
        "total_games-avg_game_score",
        "total_quizes-total_duration",
        "total_quizes-avg_quiz_score",
        "total_app-total_duration",
        "total_app-num_accesses",
    ] {
        cols.push(total.to_string());
    }
    cols
}

/// Build the complete report as TSV bytes
pub async fn game_stats_report(pool: &SqlitePool, catalogue: &StatsCatalogue) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(Vec::new());
    writer.write_record(header(catalogue)).map_err(csv_error)?;

    let user_ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM users ORDER BY id")
        .fetch_all(pool)
        .await?;

    for user_id in &user_ids {
        let row = user_row(pool, *user_id, catalogue).await?;
        writer.write_record(&row).map_err(csv_error)?;
    }

    debug!(users = user_ids.len(), "Statistics report built");
    writer
        .into_inner()
        .map_err(|e| Error::Internal(format!("Failed to flush report: {}", e)))
}

fn csv_error(e: csv::Error) -> Error {
    Error::Internal(format!("Failed to write report: {}", e))
}

async fn user_row(pool: &SqlitePool, user_id: i64, catalogue: &StatsCatalogue) -> Result<Vec<String>> {
    let mut row = vec![
        user_id.to_string(),
        school_name(pool, user_id).await?,
        teacher_username(pool, user_id).await?,
        username(pool, user_id).await?,
    ];

    for lesson in &catalogue.lessons {
        row.push(int(pool, "SELECT COUNT(*) FROM lessons WHERE user_id = ? AND lesson = ?", user_id, lesson).await?);
        row.push(int(pool, "SELECT SUM(duration) FROM lessons WHERE user_id = ? AND lesson = ?", user_id, lesson).await?);
    }

    for game in &catalogue.games {
        row.push(int(pool, FIRST_SCORE, user_id, game).await?);
        row.push(int(pool, LAST_SCORE, user_id, game).await?);
        row.push(int(pool, AVG_FIRST_THREE, user_id, game).await?);
        row.push(int(pool, "SELECT COUNT(score) FROM scores WHERE user_id = ? AND game = ?", user_id, game).await?);
        row.push(int(pool, "SELECT SUM(duration) FROM scores WHERE user_id = ? AND game = ?", user_id, game).await?);
    }

    for quiz in &catalogue.quizzes {
        row.push(int(pool, LAST_SCORE, user_id, quiz).await?);
        row.push(int(pool, LAST_DURATION, user_id, quiz).await?);
    }

    for screen in &catalogue.screens {
        row.push(int(pool, "SELECT COUNT(*) FROM screens WHERE user_id = ? AND name = ?", user_id, screen).await?);
        row.push(int(pool, "SELECT SUM(duration) FROM screens WHERE user_id = ? AND name = ?", user_id, screen).await?);
    }

    for sql in [
        "SELECT SUM(total_pages_viewed) FROM lessons WHERE user_id = ?",
        "SELECT SUM(duration) FROM lessons WHERE user_id = ?",
        "SELECT COUNT(*) FROM scores WHERE user_id = ? AND is_exam = 0",
        "SELECT SUM(duration) FROM scores WHERE user_id = ? AND is_exam = 0",
        "SELECT CAST(ROUND(AVG(score)) AS INTEGER) FROM scores WHERE user_id = ? AND is_exam = 0",
        "SELECT SUM(duration) FROM scores WHERE user_id = ? AND is_exam = 1",
        "SELECT CAST(ROUND(AVG(score)) AS INTEGER) FROM scores WHERE user_id = ? AND is_exam = 1",
        "SELECT SUM(duration) FROM screens WHERE user_id = ?",
        "SELECT COUNT(*) FROM screens WHERE user_id = ? AND name = 'Login'",
    ] {
        row.push(user_int(pool, sql, user_id).await?);
    }

    Ok(row)
}

const FIRST_SCORE: &str =
    "SELECT score FROM scores WHERE user_id = ? AND game = ? ORDER BY created ASC, id ASC LIMIT 1";
const LAST_SCORE: &str =
    "SELECT score FROM scores WHERE user_id = ? AND game = ? ORDER BY created DESC, id DESC LIMIT 1";
const LAST_DURATION: &str =
    "SELECT duration FROM scores WHERE user_id = ? AND game = ? ORDER BY created DESC, id DESC LIMIT 1";
const AVG_FIRST_THREE: &str = r#"
    SELECT CAST(ROUND(AVG(score)) AS INTEGER) FROM (
        SELECT score FROM scores
        WHERE user_id = ? AND game = ?
        ORDER BY created ASC, id ASC
        LIMIT 3
    )
"#;

/// Run a single-value query; NULL or no row renders as "0"
async fn int(pool: &SqlitePool, sql: &str, user_id: i64, key: &str) -> Result<String> {
    let value: Option<Option<i64>> = sqlx::query_scalar(sql)
        .bind(user_id)
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(render(value.flatten()))
}

async fn user_int(pool: &SqlitePool, sql: &str, user_id: i64) -> Result<String> {
    let value: Option<Option<i64>> = sqlx::query_scalar(sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(render(value.flatten()))
}

fn render(value: Option<i64>) -> String {
    value.unwrap_or(0).to_string()
}

async fn school_name(pool: &SqlitePool, user_id: i64) -> Result<String> {
    let name: Option<Option<String>> = sqlx::query_scalar(
        r#"
        SELECT s.name
        FROM schools s
        JOIN users_schools us ON us.school_id = s.id
        WHERE us.user_id = ?
        ORDER BY us.rowid
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(name.flatten().unwrap_or_default())
}

async fn teacher_username(pool: &SqlitePool, user_id: i64) -> Result<String> {
    let name: Option<Option<String>> = sqlx::query_scalar(
        "SELECT t.username FROM users u JOIN users t ON t.id = u.teacher_id WHERE u.id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(name.flatten().unwrap_or_default())
}

async fn username(pool: &SqlitePool, user_id: i64) -> Result<String> {
    let name: Option<Option<String>> = sqlx::query_scalar("SELECT username FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(name.flatten().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let cols = header(&StatsCatalogue::default());
        assert_eq!(&cols[..4], &["user_id", "school", "teacher", "username"]);
        assert_eq!(cols[4], "lessons-lesson_danger-num_accesses");
        assert!(cols.contains(&"games-game_danger-avg_game_score".to_string()));
        assert!(cols.contains(&"quizes-quiz_danger-perc_score".to_string()));
        assert!(cols.contains(&"screens-DressingRoom-num_accesses".to_string()));
        assert_eq!(cols.last().map(String::as_str), Some("total_app-num_accesses"));
        // 4 + 13*2 + 13*5 + 13*2 + 3*2 + 9
        assert_eq!(cols.len(), 136);
    }

    #[test]
    fn test_render_defaults_to_zero() {
        assert_eq!(render(None), "0");
        assert_eq!(render(Some(12)), "12");
    }
}
