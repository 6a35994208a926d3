//! Key-value settings and the application secret key

use crate::auth::password::to_hex;
use crate::Result;
use rand::RngCore;
use sqlx::SqlitePool;
use tracing::info;

const SECRET_KEY: &str = "secret_key";

pub async fn get(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value.flatten())
}

pub async fn set(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

/// Load the token signing secret, generating one on first start
pub async fn load_secret_key(pool: &SqlitePool) -> Result<String> {
    match get(pool, SECRET_KEY).await? {
        Some(secret) if !secret.is_empty() => Ok(secret),
        _ => initialize_secret_key(pool).await,
    }
}

/// Generate and store a random 32-byte secret
pub async fn initialize_secret_key(pool: &SqlitePool) -> Result<String> {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let secret = to_hex(&bytes);

    set(pool, SECRET_KEY, &secret).await?;
    info!("Generated new secret key");
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_secret_key_is_stable() {
        let pool = crate::db::init_memory_database().await.unwrap();
        let first = load_secret_key(&pool).await.unwrap();
        assert_eq!(first.len(), 64);
        let second = load_secret_key(&pool).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let pool = crate::db::init_memory_database().await.unwrap();
        set(&pool, "k", "a").await.unwrap();
        set(&pool, "k", "b").await.unwrap();
        assert_eq!(get(&pool, "k").await.unwrap().as_deref(), Some("b"));
        assert_eq!(get(&pool, "missing").await.unwrap(), None);
    }
}
