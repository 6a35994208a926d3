//! Database access
//!
//! One module per table family. Every query takes a `&SqlitePool` and
//! returns [`crate::Result`].

pub mod assets;
pub mod game_data;
pub mod init;
pub mod jobs;
pub mod lessons;
pub mod migrations;
pub mod roles;
pub mod schools;
pub mod scores;
pub mod screens;
pub mod settings;
pub mod users;

pub use init::{init_database, init_memory_database};

use crate::pagination::{Page, Pagination};
use crate::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqlitePool};

/// Run a COUNT query and a LIMIT/OFFSET query for one page
///
/// `key`, when present, is bound as the first parameter of both
/// statements. The page statement must end with `LIMIT ? OFFSET ?`.
pub(crate) async fn paginate<T>(
    pool: &SqlitePool,
    count_sql: &str,
    page_sql: &str,
    key: Option<i64>,
    page: i64,
    per_page: i64,
) -> Result<Page<T>>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let mut count = sqlx::query_scalar::<_, i64>(count_sql);
    if let Some(k) = key {
        count = count.bind(k);
    }
    let total = count.fetch_one(pool).await?;

    let pagination = Pagination::new(total, page, per_page);

    let mut rows = sqlx::query_as::<_, T>(page_sql);
    if let Some(k) = key {
        rows = rows.bind(k);
    }
    let items = rows
        .bind(pagination.per_page)
        .bind(pagination.offset)
        .fetch_all(pool)
        .await?;

    Ok(Page { items, pagination })
}
