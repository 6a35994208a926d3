//! Background statistics export
//!
//! A job builds the usage report, uploads it to `jobs/<id>.csv` and records
//! its outcome in `export_jobs`. Jobs run once on the tokio runtime; a
//! failed job stays failed.

use gg_common::config::StatsCatalogue;
use gg_common::db::jobs;
use gg_common::stats;
use gg_common::Result;
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::storage::ObjectStore;
use crate::AppState;

/// `export_jobs.kind` of the usage statistics export
pub const GAME_STATS: &str = "game_stats";

/// Storage key of a job's report
pub fn result_key(job_id: &str) -> String {
    format!("jobs/{}.csv", job_id)
}

/// Run a queued game-stats job in the background
pub fn spawn_game_stats(state: AppState, job_id: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let outcome = run_game_stats(&state.db, state.store.as_ref(), &state.settings.stats, &job_id).await;
        if let Err(e) = outcome {
            error!(job_id = %job_id, "Game stats export failed: {}", e);
        }
    })
}

/// Build and upload the report for `job_id`, tracking state transitions
pub async fn run_game_stats(
    pool: &SqlitePool,
    store: &dyn ObjectStore,
    catalogue: &StatsCatalogue,
    job_id: &str,
) -> Result<String> {
    jobs::mark_running(pool, job_id).await?;
    info!(job_id = %job_id, "Game stats export started");

    match export(pool, store, catalogue, job_id).await {
        Ok(key) => {
            jobs::mark_finished(pool, job_id, &key).await?;
            info!(job_id = %job_id, key = %key, "Game stats export finished");
            Ok(key)
        }
        Err(e) => {
            jobs::mark_failed(pool, job_id, &e.to_string()).await?;
            Err(e)
        }
    }
}

async fn export(
    pool: &SqlitePool,
    store: &dyn ObjectStore,
    catalogue: &StatsCatalogue,
    job_id: &str,
) -> Result<String> {
    let report = stats::game_stats_report(pool, catalogue).await?;
    let key = result_key(job_id);
    store.put(&key, report, "text/csv").await?;
    Ok(key)
}
