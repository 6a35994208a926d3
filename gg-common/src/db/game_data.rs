//! Game data files; the content lives in object storage under `game_data/`

use chrono::NaiveDateTime;
use sqlx::{FromRow, SqlitePool};

use crate::time::now;
use crate::Result;

/// Files every deployment serves
pub const GAME_DATA_FILES: [&str; 5] = [
    "animations_3d.json",
    "lessons.json",
    "localization.json",
    "quiz.json",
    "rooms.json",
];

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct GameData {
    pub id: i64,
    pub file_name: String,
    pub created: NaiveDateTime,
}

impl GameData {
    pub fn storage_key(&self) -> String {
        format!("game_data/{}", self.file_name)
    }
}

/// Register the standard game data files; existing rows are kept
pub async fn insert_game_data(pool: &SqlitePool) -> Result<()> {
    for file_name in GAME_DATA_FILES {
        sqlx::query("INSERT OR IGNORE INTO game_data (file_name, created) VALUES (?, ?)")
            .bind(file_name)
            .bind(now())
            .execute(pool)
            .await?;
    }
    Ok(())
}

pub async fn get(pool: &SqlitePool, file_name: &str) -> Result<Option<GameData>> {
    let row = sqlx::query_as::<_, GameData>(
        "SELECT id, file_name, created FROM game_data WHERE file_name = ?",
    )
    .bind(file_name)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<GameData>> {
    let rows = sqlx::query_as::<_, GameData>(
        "SELECT id, file_name, created FROM game_data ORDER BY file_name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
