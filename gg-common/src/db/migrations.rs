//! Database schema migrations
//!
//! Databases created by earlier releases lack columns and tables that the
//! base schema now declares. Each migration checks for its change before
//! applying it, so fresh and legacy databases converge on the same schema.
//!
//! Never modify an existing migration; append a new one and bump
//! [`CURRENT_SCHEMA_VERSION`].

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
const CURRENT_SCHEMA_VERSION: i32 = 5;

/// Latest applied version, 0 for an untracked database
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
    }
    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
    }
    if current_version < 3 {
        migrate_v3(pool).await?;
        set_schema_version(pool, 3).await?;
    }
    if current_version < 4 {
        migrate_v4(pool).await?;
        set_schema_version(pool, 4).await?;
    }
    if current_version < 5 {
        migrate_v5(pool).await?;
        set_schema_version(pool, 5).await?;
    }

    info!("All migrations completed successfully");
    Ok(())
}

async fn has_column(pool: &SqlitePool, table: &str, column: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?")
            .bind(table)
            .bind(column)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

/// Migration v1: assign students to a teacher
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    if !has_column(pool, "users", "teacher_id").await? {
        sqlx::query("ALTER TABLE users ADD COLUMN teacher_id INTEGER REFERENCES users(id)")
            .execute(pool)
            .await?;
        info!("Migration v1: added users.teacher_id");
    }
    Ok(())
}

/// Migration v2: creation time on assets
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    if !has_column(pool, "assets", "created").await? {
        // ALTER TABLE cannot add a column with a non-constant default
        sqlx::query("ALTER TABLE assets ADD COLUMN created TIMESTAMP")
            .execute(pool)
            .await?;
        sqlx::query("UPDATE assets SET created = CURRENT_TIMESTAMP WHERE created IS NULL")
            .execute(pool)
            .await?;
        info!("Migration v2: added assets.created");
    }
    Ok(())
}

/// Migration v3: game data files
async fn migrate_v3(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS game_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_name TEXT UNIQUE,
            created TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Migration v4: screen usage tracking
async fn migrate_v4(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS screens (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER REFERENCES users(id) ON DELETE CASCADE,
            name TEXT,
            action TEXT,
            duration INTEGER,
            created TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_screens_user ON screens(user_id, name)")
        .execute(pool)
        .await?;
    Ok(())
}

/// Migration v5: user gender
async fn migrate_v5(pool: &SqlitePool) -> Result<()> {
    if !has_column(pool, "users", "gender").await? {
        sqlx::query("ALTER TABLE users ADD COLUMN gender TEXT NOT NULL DEFAULT 'undefined'")
            .execute(pool)
            .await?;
        info!("Migration v5: added users.gender");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn legacy_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        // Shape of a database from before teacher assignment existed
        sqlx::query(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT UNIQUE, username TEXT UNIQUE, \
             role_id INTEGER, password_hash TEXT NOT NULL DEFAULT '', password_salt TEXT NOT NULL DEFAULT '', \
             confirmed INTEGER NOT NULL DEFAULT 0, tutorial_completed INTEGER NOT NULL DEFAULT 0, \
             exam_points INTEGER NOT NULL DEFAULT 0, name TEXT, avatar_hash TEXT, \
             created TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP, updated TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("CREATE TABLE assets (id INTEGER PRIMARY KEY, file_name TEXT, file_type TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO users (username) VALUES ('old')")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_legacy_database_converges() {
        let pool = legacy_pool().await;
        crate::db::init::create_schema(&pool).await.unwrap();

        assert!(has_column(&pool, "users", "teacher_id").await.unwrap());
        assert!(has_column(&pool, "users", "gender").await.unwrap());
        assert!(has_column(&pool, "assets", "created").await.unwrap());
        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);

        let gender: String = sqlx::query_scalar("SELECT gender FROM users WHERE username = 'old'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(gender, "undefined");
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = crate::db::init_memory_database().await.unwrap();
        run_migrations(&pool).await.unwrap();
        migrate_v1(&pool).await.unwrap();
        migrate_v5(&pool).await.unwrap();
        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
    }
}
