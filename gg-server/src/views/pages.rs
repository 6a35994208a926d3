//! Admin pages

use axum::{
    extract::{Path, Query, State},
    Form,
};
use gg_common::db::roles::{self, Role};
use gg_common::db::schools::{self, School};
use gg_common::db::users::{self, NewUser, User};
use gg_common::db::scores;
use gg_common::pagination::PageQuery;
use gg_common::time::http_date;
use gg_common::Permission;
use tracing::info;

use super::forms::{ProfileAdminForm, ProfileForm, SchoolEditForm, SchoolForm, UserForm};
use super::layout::{checkbox, errors, esc, esc_opt, pagination_links, password_input, select, text_input, textarea};
use super::{redirect_with_flash, ViewError, ViewResult, Viewer};
use crate::AppState;

fn parse_id(raw: &str) -> Result<i64, ViewError> {
    raw.parse().map_err(|_| ViewError::NotFound)
}

/// Roles `granter` may hand out: those whose permissions are a subset of theirs
async fn role_options(state: &AppState, granter: &User) -> Result<Vec<(i64, String)>, ViewError> {
    let mut roles: Vec<Role> = roles::list(&state.db).await?;
    roles.retain(|r| granter.can(r.permission()));
    roles.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(roles.into_iter().map(|r| (r.id, r.name)).collect())
}

/// `/` (GET and POST)
pub async fn index(viewer: Viewer) -> ViewResult {
    let name = match &viewer.user {
        Some(user) => user.display_name(),
        None => "Stranger".to_string(),
    };
    let body = format!("<h1>Hello, {}!</h1>", esc(&name));
    Ok(viewer.render("Home", &body))
}

/// `/user/:username`
pub async fn user_profile(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
) -> ViewResult {
    let user = users::get_by_username(&state.db, &username)
        .await?
        .ok_or(ViewError::NotFound)?;
    let best = scores::best_scores(&state.db, user.id).await?;

    let mut body = format!(
        r#"<img src="{avatar}" alt="avatar" width="128" height="128">
<h1>{username}</h1>
<p>{name}</p>
<p>Role: {role} | Member since {created} | Last seen {updated}</p>"#,
        avatar = esc(&user.gravatar(128, "identicon", "g", true)),
        username = esc(&user.display_name()),
        name = esc_opt(user.name.as_deref()),
        role = esc_opt(user.role_name.as_deref()),
        created = http_date(&user.created),
        updated = http_date(&user.updated),
    );

    if let Some(me) = &viewer.user {
        if me.id == user.id {
            body.push_str(r#"<p><a href="/edit-profile">Edit Profile</a></p>"#);
        }
        if me.is_administrator() {
            body.push_str(&format!(r#"<p><a href="/edit-profile/{}">Edit Profile [Admin]</a></p>"#, user.id));
        }
    }

    body.push_str("<h2>Best scores</h2>");
    if best.is_empty() {
        body.push_str("<p>No scores yet.</p>");
    } else {
        body.push_str("<table><tr><th>Game</th><th>Score</th><th>Max score</th><th>Date</th></tr>");
        for score in &best {
            body.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                esc_opt(score.game.as_deref()),
                score.score.unwrap_or_default(),
                score.max_score.unwrap_or_default(),
                http_date(&score.created),
            ));
        }
        body.push_str("</table>");
    }

    Ok(viewer.render(&user.display_name(), &body))
}

async fn schools_page(
    state: &AppState,
    viewer: &Viewer,
    user: &User,
    page: i64,
    form: &SchoolForm,
    problems: &[String],
) -> ViewResult {
    let listing = schools::list(&state.db, page, state.settings.posts_per_page).await?;

    let mut body = String::from("<h1>Schools</h1>");
    if user.can(Permission::CREATE_SCHOOLS) {
        body.push_str(&format!(
            r#"{errors}<form method="post" action="/schools">{name}{description}<p><input type="submit" value="Submit"></p></form>"#,
            errors = errors(problems),
            name = text_input("Name of the school", "name", &form.name),
            description = textarea("Description", "description", &form.description),
        ));
    }
    body.push_str("<ul>");
    for school in &listing.items {
        body.push_str(&format!(
            r#"<li><a href="/school/{}">{}</a> <small>{}</small></li>"#,
            school.id,
            esc_opt(school.name.as_deref()),
            http_date(&school.created),
        ));
    }
    body.push_str("</ul>");
    body.push_str(&pagination_links("/schools", &listing.pagination));
    Ok(viewer.render("Schools", &body))
}

/// GET `/schools`
pub async fn schools(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<PageQuery>,
) -> ViewResult {
    let user = viewer.require_login("/schools")?;
    schools_page(&state, &viewer, user, query.page, &SchoolForm::default(), &[]).await
}

/// POST `/schools`
pub async fn create_school(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<SchoolForm>,
) -> ViewResult {
    let user = viewer.require("/schools", Permission::CREATE_SCHOOLS)?;
    let problems = form.validate();
    if !problems.is_empty() {
        return schools_page(&state, &viewer, user, 1, &form, &problems).await;
    }
    let name = form.name.trim();
    let school = schools::create(&state.db, name, Some(form.description.as_str())).await?;
    info!(school_id = school.id, by = user.id, "School created from admin view");
    Ok(redirect_with_flash("/schools", "The school has been created."))
}

fn member_list(title: &str, members: &[User]) -> String {
    let mut out = format!("<h2>{}</h2>", esc(title));
    if members.is_empty() {
        out.push_str("<p>None.</p>");
        return out;
    }
    out.push_str("<ul>");
    for member in members {
        let name = member.display_name();
        out.push_str(&format!(
            r#"<li><a href="/user/{}">{}</a></li>"#,
            esc(&name),
            esc(&name)
        ));
    }
    out.push_str("</ul>");
    out
}

/// `/school/:id`
pub async fn school(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> ViewResult {
    let user = viewer.require_login(&format!("/school/{}", id))?;
    let school: School = schools::get_required(&state.db, parse_id(&id)?).await?;
    let per_page = state.settings.posts_per_page;
    let teachers = schools::teachers(&state.db, school.id, 1, per_page).await?;
    let students = schools::students(&state.db, school.id, 1, per_page).await?;

    let mut body = format!(
        r#"<h1>{name}</h1>
<p>{description}</p>
<p>Address: {address}<br>Email: {email}<br>Enabled: {enabled}</p>"#,
        name = esc_opt(school.name.as_deref()),
        description = esc_opt(school.description.as_deref()),
        address = esc_opt(school.address.as_deref()),
        email = esc_opt(school.email.as_deref()),
        enabled = if school.enabled { "yes" } else { "no" },
    );
    if user.is_administrator() {
        body.push_str(&format!(r#"<p><a href="/edit-school/{}">Edit School [Admin]</a></p>"#, school.id));
    }
    body.push_str(&member_list(
        &format!("Teachers ({})", teachers.pagination.total),
        &teachers.items,
    ));
    body.push_str(&member_list(
        &format!("Students ({})", students.pagination.total),
        &students.items,
    ));

    let title = school.name.clone().unwrap_or_else(|| format!("School {}", school.id));
    Ok(viewer.render(&title, &body))
}

/// `/scores`, newest first
pub async fn scores(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<PageQuery>,
) -> ViewResult {
    viewer.require_login("/scores")?;
    let listing = scores::list(&state.db, query.page, state.settings.posts_per_page).await?;

    let mut body = String::from(
        "<h1>Scores</h1><table><tr><th>User</th><th>Game</th><th>State</th><th>Score</th>\
         <th>Max score</th><th>Exam</th><th>Duration</th><th>Date</th></tr>",
    );
    for score in &listing.items {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            score.user_id.map(|id| id.to_string()).unwrap_or_default(),
            esc_opt(score.game.as_deref()),
            esc_opt(score.state.as_deref()),
            score.score.unwrap_or_default(),
            score.max_score.unwrap_or_default(),
            if score.is_exam { "yes" } else { "no" },
            score.duration.unwrap_or_default(),
            http_date(&score.created),
        ));
    }
    body.push_str("</table>");
    body.push_str(&pagination_links("/scores", &listing.pagination));
    Ok(viewer.render("Scores", &body))
}

fn user_form(action: &str, form: &UserForm, roles: &[(i64, String)], problems: &[String]) -> String {
    format!(
        r#"{errors}<form method="post" action="{action}">{username}{password}{role}<p><input type="submit" value="Submit"></p></form>"#,
        errors = errors(problems),
        action = action,
        username = text_input("Username", "username", &form.username),
        password = password_input("Password", "password"),
        role = select("Role", "role", roles, form.role.parse().ok()),
    )
}

async fn users_page(
    state: &AppState,
    viewer: &Viewer,
    user: &User,
    page: i64,
    form: &UserForm,
    problems: &[String],
) -> ViewResult {
    let listing = users::list(&state.db, page, state.settings.posts_per_page).await?;

    let mut body = String::from("<h1>Users</h1>");
    if user.can(Permission::CREATE_USERS) {
        let roles = role_options(state, user).await?;
        body.push_str(&user_form("/users", form, &roles, problems));
    }
    body.push_str("<table><tr><th>Username</th><th>Name</th><th>Role</th><th>Confirmed</th><th>Created</th></tr>");
    for u in &listing.items {
        let name = u.display_name();
        body.push_str(&format!(
            r#"<tr><td><a href="/user/{}">{}</a></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
            esc(&name),
            esc(&name),
            esc_opt(u.name.as_deref()),
            esc_opt(u.role_name.as_deref()),
            if u.confirmed { "yes" } else { "no" },
            http_date(&u.created),
        ));
    }
    body.push_str("</table>");
    body.push_str(&pagination_links("/users", &listing.pagination));
    Ok(viewer.render("Users", &body))
}

/// GET `/users`, newest first
pub async fn users(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<PageQuery>,
) -> ViewResult {
    let user = viewer.require_login("/users")?;
    users_page(&state, &viewer, user, query.page, &UserForm::default(), &[]).await
}

async fn insert_user(state: &AppState, form: &UserForm, role: &Role, confirmed: bool) -> Result<User, ViewError> {
    let new = NewUser {
        username: Some(form.username.trim().to_string()),
        password: Some(form.password.clone()),
        role: role.role_name(),
        confirmed,
        ..Default::default()
    };
    Ok(users::create(&state.db, new, None).await?)
}

/// POST `/users`
pub async fn create_user(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<UserForm>,
) -> ViewResult {
    let me = viewer.require("/users", Permission::CREATE_USERS)?;
    let (problems, role) = form.validate(&state.db, me).await?;
    let Some(role) = role.filter(|_| problems.is_empty()) else {
        return users_page(&state, &viewer, me, 1, &form, &problems).await;
    };
    let user = insert_user(&state, &form, &role, false).await?;
    info!(user_id = user.id, by = me.id, "User created from admin view");
    Ok(redirect_with_flash(
        "/users",
        &format!("The user {} has been created", user.display_name()),
    ))
}

/// GET `/add-user`
pub async fn add_user_form(State(state): State<AppState>, viewer: Viewer) -> ViewResult {
    let me = viewer.require_admin("/add-user")?;
    let roles = role_options(&state, me).await?;
    let body = format!("<h1>Add user</h1>{}", user_form("/add-user", &UserForm::default(), &roles, &[]));
    Ok(viewer.render("Add user", &body))
}

/// POST `/add-user`; the account starts confirmed
pub async fn add_user(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<UserForm>,
) -> ViewResult {
    let me = viewer.require_admin("/add-user")?;
    let (problems, role) = form.validate(&state.db, me).await?;
    let Some(role) = role.filter(|_| problems.is_empty()) else {
        let roles = role_options(&state, me).await?;
        let body = format!("<h1>Add user</h1>{}", user_form("/add-user", &form, &roles, &problems));
        return Ok(viewer.render("Add user", &body));
    };
    let user = insert_user(&state, &form, &role, true).await?;
    info!(user_id = user.id, by = me.id, "User added by administrator");
    Ok(redirect_with_flash(
        "/users",
        &format!("The user {} has been created", user.display_name()),
    ))
}

fn profile_body(form: &ProfileForm, problems: &[String]) -> String {
    format!(
        r#"<h1>Edit Your Profile</h1>{errors}<form method="post" action="/edit-profile">{name}<p><input type="submit" value="Submit"></p></form>"#,
        errors = errors(problems),
        name = text_input("Real name", "name", &form.name),
    )
}

/// GET `/edit-profile`
pub async fn edit_profile_form(viewer: Viewer) -> ViewResult {
    let me = viewer.require_login("/edit-profile")?;
    let form = ProfileForm {
        name: me.name.clone().unwrap_or_default(),
    };
    Ok(viewer.render("Edit Profile", &profile_body(&form, &[])))
}

/// POST `/edit-profile`
pub async fn edit_profile(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<ProfileForm>,
) -> ViewResult {
    let me = viewer.require_login("/edit-profile")?;
    let problems = form.validate();
    if !problems.is_empty() {
        return Ok(viewer.render("Edit Profile", &profile_body(&form, &problems)));
    }
    let user = users::apply_changes(&state.db, me.id, &form.changes()).await?;
    Ok(redirect_with_flash(
        &format!("/user/{}", user.display_name()),
        "Your profile has been updated.",
    ))
}

fn profile_admin_body(user: &User, form: &ProfileAdminForm, roles: &[(i64, String)], problems: &[String]) -> String {
    format!(
        r#"<h1>Edit Profile of {who}</h1>{errors}<form method="post" action="/edit-profile/{id}">{email}{username}{confirmed}{role}{name}<p><input type="submit" value="Submit"></p></form>"#,
        who = esc(&user.display_name()),
        errors = errors(problems),
        id = user.id,
        email = text_input("Email", "email", &form.email),
        username = text_input("Username", "username", &form.username),
        confirmed = checkbox("Confirmed", "confirmed", form.confirmed.is_some()),
        role = select("Role", "role", roles, form.role_id()),
        name = text_input("Real name", "name", &form.name),
    )
}

/// GET `/edit-profile/:id`
pub async fn edit_profile_admin_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> ViewResult {
    let me = viewer.require_admin(&format!("/edit-profile/{}", id))?;
    let user = users::get_required(&state.db, parse_id(&id)?).await?;
    let roles = role_options(&state, me).await?;
    let body = profile_admin_body(&user, &ProfileAdminForm::from_user(&user), &roles, &[]);
    Ok(viewer.render("Edit Profile", &body))
}

/// POST `/edit-profile/:id`
pub async fn edit_profile_admin(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
    Form(form): Form<ProfileAdminForm>,
) -> ViewResult {
    let me = viewer.require_admin(&format!("/edit-profile/{}", id))?;
    let user = users::get_required(&state.db, parse_id(&id)?).await?;
    let problems = form.validate(&state.db, &user).await?;
    if !problems.is_empty() {
        let roles = role_options(&state, me).await?;
        let body = profile_admin_body(&user, &form, &roles, &problems);
        return Ok(viewer.render("Edit Profile", &body));
    }
    let user = users::apply_changes(&state.db, user.id, &form.changes()).await?;
    info!(user_id = user.id, by = me.id, "Profile updated by administrator");
    Ok(redirect_with_flash(
        &format!("/user/{}", user.display_name()),
        "The profile has been updated.",
    ))
}

fn school_edit_body(school: &School, form: &SchoolEditForm, problems: &[String]) -> String {
    format!(
        r#"<h1>Edit School</h1>{errors}<form method="post" action="/edit-school/{id}">{name}{enabled}{address}{email}{description}<p><input type="submit" value="Submit"></p></form>"#,
        errors = errors(problems),
        id = school.id,
        name = text_input("Name", "name", &form.name),
        enabled = checkbox("Enabled", "enabled", form.enabled.is_some()),
        address = text_input("Address", "address", &form.address),
        email = text_input("Email", "email", &form.email),
        description = textarea("Description", "description", &form.description),
    )
}

/// GET `/edit-school/:id`
pub async fn edit_school_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> ViewResult {
    viewer.require_admin(&format!("/edit-school/{}", id))?;
    let school = schools::get_required(&state.db, parse_id(&id)?).await?;
    let body = school_edit_body(&school, &SchoolEditForm::from_school(&school), &[]);
    Ok(viewer.render("Edit School", &body))
}

/// POST `/edit-school/:id`
pub async fn edit_school(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
    Form(form): Form<SchoolEditForm>,
) -> ViewResult {
    let me = viewer.require_admin(&format!("/edit-school/{}", id))?;
    let school = schools::get_required(&state.db, parse_id(&id)?).await?;
    let problems = form.validate(&state.db, &school).await?;
    if !problems.is_empty() {
        return Ok(viewer.render("Edit School", &school_edit_body(&school, &form, &problems)));
    }
    let school = schools::edit(&state.db, school.id, &form.to_edit()).await?;
    info!(school_id = school.id, by = me.id, "School updated by administrator");
    Ok(redirect_with_flash(
        &format!("/school/{}", school.id),
        "The school has been updated.",
    ))
}
