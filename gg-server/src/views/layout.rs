//! Page chrome and HTML helpers for the admin views

use gg_common::db::users::User;
use gg_common::pagination::Pagination;
use gg_common::Permission;

/// Escape text for HTML element and attribute content
pub fn esc(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

pub fn esc_opt(value: Option<&str>) -> String {
    esc(value.unwrap_or_default())
}

fn nav(user: Option<&User>) -> String {
    let mut links = vec![r#"<a href="/">Home</a>"#.to_string()];
    match user {
        Some(user) => {
            links.push(r#"<a href="/schools">Schools</a>"#.to_string());
            links.push(r#"<a href="/scores">Scores</a>"#.to_string());
            links.push(r#"<a href="/users">Users</a>"#.to_string());
            if user.can(Permission::ADMINISTER) {
                links.push(r#"<a href="/add-user">Add user</a>"#.to_string());
            }
            let name = user.display_name();
            links.push(format!(
                r#"<a href="/user/{}">Profile</a>"#,
                esc(&name)
            ));
            links.push(r#"<a href="/auth/logout">Log Out</a>"#.to_string());
        }
        None => links.push(r#"<a href="/auth/login">Log In</a>"#.to_string()),
    }
    links.join(" | ")
}

/// Full HTML document around `body`
pub fn page(title: &str, user: Option<&User>, flashes: &[String], body: &str) -> String {
    let flashes: String = flashes
        .iter()
        .map(|m| format!(r#"<div class="flash">{}</div>"#, esc(m)))
        .collect();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>gamegen - {title}</title>
    <style>
        body {{
            font-family: system-ui, -apple-system, sans-serif;
            max-width: 960px;
            margin: 40px auto;
            padding: 0 20px;
            line-height: 1.6;
        }}
        nav {{ border-bottom: 2px solid #0066cc; padding-bottom: 8px; margin-bottom: 20px; }}
        table {{ border-collapse: collapse; width: 100%; }}
        th, td {{ border-bottom: 1px solid #ddd; padding: 4px 8px; text-align: left; }}
        .flash {{ background: #e8f0fe; border: 1px solid #0066cc; padding: 8px; margin-bottom: 10px; }}
        .error {{ color: #b00020; }}
        .pagination a {{ margin-right: 8px; }}
    </style>
</head>
<body>
    <nav>{nav}</nav>
    {flashes}
    {body}
</body>
</html>"#,
        title = esc(title),
        nav = nav(user),
        flashes = flashes,
        body = body,
    )
}

pub fn not_found_page() -> String {
    page(
        "Not Found",
        None,
        &[],
        "<h1>Not Found</h1><p>The page you are looking for does not exist.</p>",
    )
}

pub fn forbidden_page(user: Option<&User>) -> String {
    page(
        "Forbidden",
        user,
        &[],
        "<h1>Forbidden</h1><p>You do not have access to this page.</p>",
    )
}

/// Previous/next links for a paginated listing at `path`
pub fn pagination_links(path: &str, p: &Pagination) -> String {
    let mut out = String::from(r#"<div class="pagination">"#);
    if p.has_prev() {
        out.push_str(&format!(r#"<a href="{}?page={}">&laquo; Newer</a>"#, path, p.page - 1));
    }
    out.push_str(&format!("Page {} of {}", p.page, p.pages().max(1)));
    if p.has_next() {
        out.push_str(&format!(r#" <a href="{}?page={}">Older &raquo;</a>"#, path, p.page + 1));
    }
    out.push_str("</div>");
    out
}

/// Bullet list of validation errors; empty when there are none
pub fn errors(errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let items: String = errors
        .iter()
        .map(|e| format!("<li>{}</li>", esc(e)))
        .collect();
    format!(r#"<ul class="error">{}</ul>"#, items)
}

pub fn text_input(label: &str, name: &str, value: &str) -> String {
    format!(
        r#"<p><label>{label}<br><input type="text" name="{name}" value="{value}"></label></p>"#,
        label = esc(label),
        name = name,
        value = esc(value),
    )
}

pub fn password_input(label: &str, name: &str) -> String {
    format!(
        r#"<p><label>{}<br><input type="password" name="{}"></label></p>"#,
        esc(label),
        name
    )
}

pub fn textarea(label: &str, name: &str, value: &str) -> String {
    format!(
        r#"<p><label>{}<br><textarea name="{}" rows="4" cols="60">{}</textarea></label></p>"#,
        esc(label),
        name,
        esc(value)
    )
}

pub fn checkbox(label: &str, name: &str, checked: bool) -> String {
    format!(
        r#"<p><label><input type="checkbox" name="{}" value="y"{}> {}</label></p>"#,
        name,
        if checked { " checked" } else { "" },
        esc(label)
    )
}

/// `<select>` over `(value, label)` options
pub fn select(label: &str, name: &str, options: &[(i64, String)], selected: Option<i64>) -> String {
    let options: String = options
        .iter()
        .map(|(value, text)| {
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                value,
                if Some(*value) == selected { " selected" } else { "" },
                esc(text)
            )
        })
        .collect();
    format!(
        r#"<p><label>{}<br><select name="{}">{}</select></label></p>"#,
        esc(label),
        name,
        options
    )
}
