//! Asset records; the bytes live in object storage under `assets/`

use chrono::NaiveDateTime;
use serde::Deserialize;
use sqlx::{FromRow, SqlitePool};

use crate::time::now;
use crate::validate;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Asset {
    pub id: i64,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub created: NaiveDateTime,
}

impl Asset {
    /// Object storage key for this asset's content
    pub fn storage_key(&self) -> String {
        format!("assets/{}", self.file_name.as_deref().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetInput {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
}

pub async fn create(pool: &SqlitePool, input: &AssetInput) -> Result<Asset> {
    let file_name = validate::required(input.file_name.as_deref(), "asset does not have a file name")?;
    if file_name.contains('/') || file_name.contains("..") {
        return Err(Error::InvalidInput("asset file name must not contain a path".to_string()));
    }
    let result = sqlx::query("INSERT INTO assets (file_name, file_type, created) VALUES (?, ?, ?)")
        .bind(file_name)
        .bind(&input.file_type)
        .bind(now())
        .execute(pool)
        .await?;
    get_required(pool, result.last_insert_rowid()).await
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<Asset>> {
    let asset = sqlx::query_as::<_, Asset>(
        "SELECT id, file_name, file_type, created FROM assets WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(asset)
}

pub async fn get_required(pool: &SqlitePool, id: i64) -> Result<Asset> {
    get(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Asset {}", id)))
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<Asset>> {
    let assets = sqlx::query_as::<_, Asset>(
        "SELECT id, file_name, file_type, created FROM assets ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(assets)
}
