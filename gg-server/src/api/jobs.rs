//! Background job endpoints

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use gg_common::db::jobs::{self, ExportJob};
use gg_common::time::http_date;
use gg_common::Permission;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use super::{Caller, PREFIX};
use crate::error::ApiResult;
use crate::AppState;

/// POST /jobs/game-stats
///
/// Queues the usage statistics export and returns immediately.
pub async fn start_game_stats(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let me = caller.require(Permission::ADMINISTER)?;
    let job = jobs::enqueue(&state.db, crate::jobs::GAME_STATS).await?;
    info!(job_id = %job.id, by = me.id, "Game stats export queued");
    crate::jobs::spawn_game_stats(state.clone(), job.id.clone());

    let status_url = state.external_url(&headers, &format!("{}/jobs/{}", PREFIX, job.id));
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "job_id": job.id,
            "state": job.state,
            "status_url": status_url,
        })),
    ))
}

#[derive(Debug, Serialize)]
pub struct JobJson {
    pub id: String,
    pub kind: String,
    pub state: String,
    pub error: Option<String>,
    pub result_url: Option<String>,
    pub created: String,
    pub finished: Option<String>,
}

fn job_json(state: &AppState, job: ExportJob) -> JobJson {
    JobJson {
        result_url: job.result_key.as_deref().map(|k| state.store.public_url(k)),
        created: http_date(&job.created),
        finished: job.finished.as_ref().map(http_date),
        id: job.id,
        kind: job.kind,
        state: job.state,
        error: job.error,
    }
}

/// GET /jobs/:id
pub async fn get_job(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobJson>> {
    caller.require(Permission::ADMINISTER)?;
    let job = jobs::get_required(&state.db, &id).await?;
    Ok(Json(job_json(&state, job)))
}
