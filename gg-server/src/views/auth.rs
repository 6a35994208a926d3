//! Admin view login and logout

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect},
    Form,
};
use gg_common::auth::TokenKind;
use gg_common::db::users;
use serde::Deserialize;
use tracing::{info, warn};

use super::forms::LoginForm;
use super::layout::{esc, errors, password_input, text_input};
use super::{clear_session, redirect_with_flash, set_session, ViewResult, Viewer, SESSION_TTL_SECS};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Only local absolute paths are followed after login
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path,
        _ => "/",
    }
}

fn login_body(username: &str, next: &str, problems: &[String]) -> String {
    format!(
        r#"<h1>Login</h1>
{errors}
<form method="post" action="/auth/login">
    {username}
    {password}
    <input type="hidden" name="next" value="{next}">
    <p><input type="submit" value="Log In"></p>
</form>"#,
        errors = errors(problems),
        username = text_input("Username or email", "username", username),
        password = password_input("Password", "password"),
        next = esc(next),
    )
}

/// GET /auth/login
pub async fn login_form(viewer: Viewer, Query(query): Query<NextQuery>) -> ViewResult {
    let next = safe_next(query.next.as_deref());
    Ok(viewer.render("Login", &login_body("", next, &[])))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    viewer: Viewer,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Form(form): Form<LoginForm>,
) -> ViewResult {
    let next = safe_next(form.next.as_deref()).to_string();

    let user = match users::get_by_username(&state.db, &form.username).await? {
        Some(user) => Some(user),
        None => users::get_by_email(&state.db, &form.username).await?,
    };
    let Some(user) = user.filter(|u| u.verify_password(&form.password)) else {
        warn!(username = %form.username, "Failed admin login");
        let body = login_body(&form.username, &next, &["Invalid username or password.".to_string()]);
        return Ok(viewer.render("Login", &body));
    };
    if !user.confirmed {
        warn!(user_id = user.id, "Admin login by unconfirmed account");
        let body = login_body(&form.username, &next, &["Your account has not been confirmed.".to_string()]);
        return Ok(viewer.render("Login", &body));
    }

    let token = state.signer.issue(TokenKind::Session, user.id, SESSION_TTL_SECS)?;
    let remote_addr = connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default();
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    users::save_login_info(&state.db, user.id, &remote_addr, user_agent).await?;
    users::ping(&state.db, user.id).await?;
    info!(user_id = user.id, "Admin session started");

    let mut response = Redirect::to(&next).into_response();
    set_session(&mut response, &token);
    Ok(response)
}

/// GET /auth/logout
pub async fn logout() -> ViewResult {
    let mut response = redirect_with_flash("/", "You have been logged out.");
    clear_session(&mut response);
    Ok(response)
}
