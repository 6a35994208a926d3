//! Server-rendered admin views
//!
//! A signed `session` cookie identifies the logged-in user. Flash messages
//! travel in a short-lived `flash` cookie that is cleared once displayed.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use gg_common::auth::TokenKind;
use gg_common::db::users::{self, User};
use gg_common::Permission;
use tracing::{error, warn};

use crate::AppState;

pub mod auth;
pub mod forms;
pub mod layout;
pub mod pages;

pub const SESSION_COOKIE: &str = "session";
pub const FLASH_COOKIE: &str = "flash";

/// Lifetime of a login session
pub const SESSION_TTL_SECS: i64 = 12 * 3600;

const FLASH_TTL_SECS: i64 = 60;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::index).post(pages::index))
        .route("/user/:username", get(pages::user_profile))
        .route("/schools", get(pages::schools).post(pages::create_school))
        .route("/school/:id", get(pages::school))
        .route("/scores", get(pages::scores))
        .route("/users", get(pages::users).post(pages::create_user))
        .route("/add-user", get(pages::add_user_form).post(pages::add_user))
        .route("/edit-profile", get(pages::edit_profile_form).post(pages::edit_profile))
        .route(
            "/edit-profile/:id",
            get(pages::edit_profile_admin_form).post(pages::edit_profile_admin),
        )
        .route(
            "/edit-school/:id",
            get(pages::edit_school_form).post(pages::edit_school),
        )
        .route("/auth/login", get(auth::login_form).post(auth::login))
        .route("/auth/logout", get(auth::logout))
}

/// Failure outcomes of a view handler
#[derive(Debug)]
pub enum ViewError {
    /// Send this response as-is (redirects)
    Respond(Response),
    NotFound,
    Forbidden,
    Internal(String),
}

impl From<gg_common::Error> for ViewError {
    fn from(e: gg_common::Error) -> Self {
        match e {
            gg_common::Error::NotFound(_) => ViewError::NotFound,
            e => ViewError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ViewError {
    fn into_response(self) -> Response {
        match self {
            ViewError::Respond(response) => response,
            ViewError::NotFound => (StatusCode::NOT_FOUND, Html(layout::not_found_page())).into_response(),
            ViewError::Forbidden => (StatusCode::FORBIDDEN, Html(layout::forbidden_page(None))).into_response(),
            ViewError::Internal(msg) => {
                error!("View failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, Html(layout::page(
                    "Error",
                    None,
                    &[],
                    "<h1>Internal Server Error</h1>",
                )))
                    .into_response()
            }
        }
    }
}

pub type ViewResult = Result<Response, ViewError>;

/// Value of cookie `name` from the request headers
pub fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

fn set_cookie(response: &mut Response, name: &str, value: &str, max_age: i64) {
    let cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        name, value, max_age
    );
    match HeaderValue::from_str(&cookie) {
        Ok(v) => {
            response.headers_mut().append(header::SET_COOKIE, v);
        }
        Err(e) => warn!(cookie = name, "Dropping unencodable cookie: {}", e),
    }
}

pub fn set_session(response: &mut Response, token: &str) {
    set_cookie(response, SESSION_COOKIE, token, SESSION_TTL_SECS);
}

pub fn clear_session(response: &mut Response) {
    set_cookie(response, SESSION_COOKIE, "", 0);
}

fn encode_flash(messages: &[String]) -> String {
    URL_SAFE_NO_PAD.encode(messages.join("\n"))
}

fn decode_flash(value: &str) -> Vec<String> {
    URL_SAFE_NO_PAD
        .decode(value)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .map(|s| s.lines().filter(|l| !l.is_empty()).map(str::to_string).collect())
        .unwrap_or_default()
}

/// See-other redirect that shows `message` on the next page
pub fn redirect_with_flash(location: &str, message: &str) -> Response {
    let mut response = Redirect::to(location).into_response();
    set_cookie(&mut response, FLASH_COOKIE, &encode_flash(&[message.to_string()]), FLASH_TTL_SECS);
    response
}

/// Percent-encode a path for the `next` query parameter
fn encode_next(path: &str) -> String {
    path.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'/' | b'-' | b'_' | b'.' => (b as char).to_string(),
            b => format!("%{:02X}", b),
        })
        .collect()
}

/// The visitor of an admin page
#[derive(Debug, Default)]
pub struct Viewer {
    pub user: Option<User>,
    /// Flash messages waiting to be shown
    pub flashes: Vec<String>,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Viewer {
    type Rejection = ViewError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = match cookie(&parts.headers, SESSION_COOKIE) {
            Some(token) if !token.is_empty() => match state.signer.subject(&token, TokenKind::Session) {
                Ok(id) => users::get(&state.db, id).await?,
                Err(_) => None,
            },
            _ => None,
        };
        let flashes = cookie(&parts.headers, FLASH_COOKIE)
            .map(|v| decode_flash(&v))
            .unwrap_or_default();
        Ok(Self { user, flashes })
    }
}

impl Viewer {
    /// Render a page, consuming any pending flash messages
    pub fn render(&self, title: &str, body: &str) -> Response {
        self.render_status(StatusCode::OK, title, body)
    }

    pub fn render_status(&self, status: StatusCode, title: &str, body: &str) -> Response {
        let html = layout::page(title, self.user.as_ref(), &self.flashes, body);
        let mut response = (status, Html(html)).into_response();
        if !self.flashes.is_empty() {
            set_cookie(&mut response, FLASH_COOKIE, "", 0);
        }
        response
    }

    /// The logged-in user, or a redirect to the login page
    pub fn require_login(&self, path: &str) -> Result<&User, ViewError> {
        self.user.as_ref().ok_or_else(|| {
            ViewError::Respond(
                Redirect::to(&format!("/auth/login?next={}", encode_next(path))).into_response(),
            )
        })
    }

    /// The logged-in user when their role grants `p`
    pub fn require(&self, path: &str, p: Permission) -> Result<&User, ViewError> {
        let user = self.require_login(path)?;
        if !user.can(p) {
            return Err(ViewError::Forbidden);
        }
        Ok(user)
    }

    pub fn require_admin(&self, path: &str) -> Result<&User, ViewError> {
        self.require(path, Permission::ADMINISTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("a=1; session=tok.sig; flash=x"));
        assert_eq!(cookie(&headers, SESSION_COOKIE).as_deref(), Some("tok.sig"));
        assert_eq!(cookie(&headers, "a").as_deref(), Some("1"));
        assert_eq!(cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_flash_encoding() {
        let messages = vec!["The school has been updated.".to_string(), "Second".to_string()];
        assert_eq!(decode_flash(&encode_flash(&messages)), messages);
        assert!(decode_flash("%%%").is_empty());
    }

    #[test]
    fn test_encode_next() {
        assert_eq!(encode_next("/edit-profile/3"), "/edit-profile/3");
        assert_eq!(encode_next("/scores?page=2"), "/scores%3Fpage%3D2");
    }

    #[test]
    fn test_redirect_with_flash_sets_cookie() {
        let response = redirect_with_flash("/users", "The user ana has been created");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("flash="));
    }
}
