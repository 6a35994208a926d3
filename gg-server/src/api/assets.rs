//! Asset endpoints and signed content uploads
//!
//! Registering an asset returns an `upload_url` carrying a token scoped to
//! that asset. The holder PUTs the bytes there without other credentials.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::Response,
    Extension, Json,
};
use chrono::NaiveDateTime;
use gg_common::auth::TokenKind;
use gg_common::db::assets::{self, Asset, AssetInput};
use gg_common::time::http_date_format;
use gg_common::Permission;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{created, path_id, Caller, JsonBody, PREFIX};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AssetJson {
    pub id: i64,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub url: String,
    #[serde(with = "http_date_format")]
    pub created: NaiveDateTime,
}

fn asset_json(state: &AppState, asset: &Asset) -> AssetJson {
    AssetJson {
        id: asset.id,
        file_name: asset.file_name.clone(),
        file_type: asset.file_type.clone(),
        url: state.store.public_url(&asset.storage_key()),
        created: asset.created,
    }
}

/// GET /assets/
pub async fn list_assets(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<Value>> {
    caller.require(Permission::EXIST)?;
    let items: Vec<_> = assets::list(&state.db)
        .await?
        .iter()
        .map(|a| asset_json(&state, a))
        .collect();
    Ok(Json(json!({ "assets": items })))
}

/// GET /assets/:id
pub async fn get_asset(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> ApiResult<Json<AssetJson>> {
    caller.require(Permission::EXIST)?;
    let asset = assets::get_required(&state.db, path_id(&id)?).await?;
    Ok(Json(asset_json(&state, &asset)))
}

#[derive(Debug, Serialize)]
pub struct NewAssetResponse {
    #[serde(flatten)]
    pub asset: AssetJson,
    pub upload_url: String,
}

/// POST /assets/
pub async fn new_asset(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    JsonBody(input): JsonBody<AssetInput>,
) -> ApiResult<Response> {
    let me = caller.require(Permission::ADMINISTER)?;
    let asset = assets::create(&state.db, &input).await?;
    let token = state
        .signer
        .issue(TokenKind::AssetUpload, asset.id, state.settings.token_ttl_secs)?;
    let upload_url = state.external_url(
        &headers,
        &format!("{}/assets/{}/content?token={}", PREFIX, asset.id, token),
    );
    info!(asset_id = asset.id, by = me.id, "Asset registered");

    let location = state.external_url(&headers, &format!("{}/assets/{}", PREFIX, asset.id));
    Ok(created(
        location,
        NewAssetResponse {
            asset: asset_json(&state, &asset),
            upload_url,
        },
    ))
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub token: Option<String>,
}

/// PUT /assets/:id/content
///
/// Accepts the upload token issued for this asset, or administrator
/// credentials.
pub async fn upload_asset_content(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> ApiResult<Json<AssetJson>> {
    let asset = assets::get_required(&state.db, path_id(&id)?).await?;

    let token_ok = query
        .token
        .as_deref()
        .map(|t| state.signer.subject(t, TokenKind::AssetUpload).ok() == Some(asset.id))
        .unwrap_or(false);
    if !token_ok {
        caller.require(Permission::ADMINISTER)?;
    }
    if body.is_empty() {
        return Err(ApiError::BadRequest("empty upload".to_string()));
    }

    let content_type = asset
        .file_type
        .clone()
        .or_else(|| {
            headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let size = body.len();
    state
        .store
        .put(&asset.storage_key(), body.to_vec(), &content_type)
        .await?;
    info!(asset_id = asset.id, bytes = size, "Asset content stored");
    Ok(Json(asset_json(&state, &asset)))
}
