//! HTTP Basic authentication for the API
//!
//! The Authorization header carries either `username:password`, `token:`
//! (a token from `GET /token` with an empty password) or `:` for an
//! anonymous caller. A request without the header is anonymous.
//! Authenticated accounts must be confirmed.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use gg_common::db::users::{self, User, UserJson};
use gg_common::Permission;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::JsonBody;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Identity resolved for the current request
#[derive(Debug, Clone, Default)]
pub struct Caller {
    /// None for anonymous callers
    pub user: Option<User>,
    /// Authenticated with a token instead of a password
    pub token_used: bool,
}

impl Caller {
    /// The calling user when their role grants `p`, else 403
    pub fn require(&self, p: Permission) -> ApiResult<&User> {
        match &self.user {
            Some(user) if user.can(p) => Ok(user),
            _ => Err(ApiError::forbidden()),
        }
    }
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid credentials".to_string())
}

/// Decode `Authorization: Basic ...`; None when the header is absent
fn basic_credentials(headers: &HeaderMap) -> ApiResult<Option<(String, String)>> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| invalid_credentials())?;
    let encoded = value
        .strip_prefix("Basic ")
        .ok_or_else(invalid_credentials)?;
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| invalid_credentials())?;
    let decoded = String::from_utf8(decoded).map_err(|_| invalid_credentials())?;
    let (username, password) = decoded.split_once(':').ok_or_else(invalid_credentials)?;
    Ok(Some((username.to_string(), password.to_string())))
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> ApiResult<Caller> {
    let Some((username, password)) = basic_credentials(headers)? else {
        return Ok(Caller::default());
    };
    if username.is_empty() {
        return Ok(Caller::default());
    }

    if password.is_empty() {
        let user = users::verify_auth_token(&state.db, &state.signer, &username)
            .await?
            .ok_or_else(invalid_credentials)?;
        return Ok(Caller {
            user: Some(user),
            token_used: true,
        });
    }

    let user = match users::get_by_username(&state.db, &username).await? {
        Some(user) => Some(user),
        None => users::get_by_email(&state.db, &username).await?,
    };
    match user {
        Some(user) if user.verify_password(&password) => Ok(Caller {
            user: Some(user),
            token_used: false,
        }),
        _ => {
            debug!(username = %username, "Rejected API credentials");
            Err(invalid_credentials())
        }
    }
}

/// Resolve the caller and attach it to the request as a [`Caller`] extension
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = authenticate(&state, request.headers()).await?;

    if let Some(user) = &caller.user {
        if !user.confirmed {
            return Err(ApiError::Forbidden("Unconfirmed account".to_string()));
        }
    }

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expiration: i64,
}

/// GET /token
///
/// Requires password authentication; a token cannot mint another token.
pub async fn get_token(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<TokenResponse>> {
    let user = match (&caller.user, caller.token_used) {
        (Some(user), false) => user,
        _ => return Err(invalid_credentials()),
    };
    let expiration = state.settings.token_ttl_secs;
    let token = user.generate_auth_token(&state.signer, expiration)?;
    Ok(Json(TokenResponse { token, expiration }))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// POST /login
///
/// Checks a username/password pair from the body and returns the user.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> ApiResult<Json<UserJson>> {
    let user = users::get_by_username(&state.db, &body.username)
        .await?
        .filter(|u| u.verify_password(&body.password))
        .ok_or_else(|| {
            warn!(username = %body.username, "Failed login");
            invalid_credentials()
        })?;

    let remote_addr = connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default();
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    users::save_login_info(&state.db, user.id, &remote_addr, user_agent).await?;

    info!(user_id = user.id, "User logged in");
    Ok(Json(user.to_json()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_basic_credentials() {
        assert_eq!(basic_credentials(&HeaderMap::new()).unwrap(), None);

        let encoded = STANDARD.encode("john:cat");
        let creds = basic_credentials(&headers(&format!("Basic {}", encoded))).unwrap();
        assert_eq!(creds, Some(("john".to_string(), "cat".to_string())));

        let encoded = STANDARD.encode("token-value:");
        let creds = basic_credentials(&headers(&format!("Basic {}", encoded))).unwrap();
        assert_eq!(creds, Some(("token-value".to_string(), String::new())));
    }

    #[test]
    fn test_malformed_header_is_rejected() {
        assert!(basic_credentials(&headers("Bearer abc")).is_err());
        assert!(basic_credentials(&headers("Basic !!!")).is_err());
        let no_colon = STANDARD.encode("john");
        assert!(basic_credentials(&headers(&format!("Basic {}", no_colon))).is_err());
    }

    #[test]
    fn test_anonymous_caller_has_no_permissions() {
        let caller = Caller::default();
        assert!(caller.require(Permission::EXIST).is_err());
    }
}
