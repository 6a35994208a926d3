//! Users: accounts, credentials, tokens, teacher assignment and school
//! membership

use std::collections::HashMap;

use chrono::NaiveDateTime;
use md5::{Digest, Md5};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info, warn};

use crate::auth::password::{hash_password, to_hex, verify_password};
use crate::auth::permission::{Permission, RoleName};
use crate::auth::token::{TokenKind, TokenSigner};
use crate::db::roles;
use crate::pagination::Page;
use crate::time::{http_date_format, now};
use crate::{Error, Result};

/// Columns selected for every [`User`] load
const USER_SELECT: &str = r#"
    SELECT u.id, u.email, u.username, u.role_id, u.teacher_id,
           u.password_hash, u.password_salt, u.confirmed, u.tutorial_completed,
           u.exam_points, u.name, u.gender, u.avatar_hash, u.created, u.updated,
           r.name AS role_name, r.permissions AS permissions
    FROM users u
    LEFT JOIN roles r ON r.id = u.role_id
"#;

/// A user row joined with its role
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: Option<String>,
    pub username: Option<String>,
    pub role_id: Option<i64>,
    pub teacher_id: Option<i64>,
    pub password_hash: String,
    pub password_salt: String,
    pub confirmed: bool,
    pub tutorial_completed: bool,
    pub exam_points: i64,
    pub name: Option<String>,
    pub gender: String,
    pub avatar_hash: Option<String>,
    pub created: NaiveDateTime,
    pub updated: NaiveDateTime,
    pub role_name: Option<String>,
    pub permissions: Option<i64>,
}

/// Public JSON representation
#[derive(Debug, Clone, Serialize)]
pub struct UserJson {
    pub id: i64,
    pub username: Option<String>,
    pub tutorial_completed: bool,
    pub exam_points: i64,
    pub gender: String,
    pub role: Option<String>,
    #[serde(with = "http_date_format")]
    pub created: NaiveDateTime,
    #[serde(with = "http_date_format")]
    pub updated: NaiveDateTime,
}

impl User {
    /// True when the user's role grants every bit of `p`
    pub fn can(&self, p: Permission) -> bool {
        self.permissions
            .map(|bits| Permission(bits).contains(p))
            .unwrap_or(false)
    }

    pub fn is_administrator(&self) -> bool {
        self.can(Permission::ADMINISTER)
    }

    pub fn role(&self) -> Option<RoleName> {
        self.role_name.as_deref().and_then(RoleName::parse)
    }

    pub fn is_student(&self) -> bool {
        self.role() == Some(RoleName::Student)
    }

    pub fn is_teacher(&self) -> bool {
        self.role() == Some(RoleName::Teacher)
    }

    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash, &self.password_salt)
    }

    /// Username, falling back to `#<id>` for rows without one
    pub fn display_name(&self) -> String {
        self.username
            .clone()
            .unwrap_or_else(|| format!("#{}", self.id))
    }

    pub fn to_json(&self) -> UserJson {
        UserJson {
            id: self.id,
            username: self.username.clone(),
            tutorial_completed: self.tutorial_completed,
            exam_points: self.exam_points,
            gender: self.gender.clone(),
            role: self.role_name.clone(),
            created: self.created,
            updated: self.updated,
        }
    }

    /// Gravatar URL; hash is avatar_hash, else md5(email), else md5(username)
    pub fn gravatar(&self, size: u32, default: &str, rating: &str, secure: bool) -> String {
        let url = if secure {
            "https://secure.gravatar.com/avatar"
        } else {
            "http://www.gravatar.com/avatar"
        };
        let hash = match (&self.email, &self.avatar_hash) {
            (Some(_), Some(hash)) => hash.clone(),
            (Some(email), None) => md5_hex(email),
            (None, _) => md5_hex(self.username.as_deref().unwrap_or_default()),
        };
        format!("{}/{}?s={}&d={}&r={}", url, hash, size, default, rating)
    }

    pub fn generate_auth_token(&self, signer: &TokenSigner, ttl_secs: i64) -> Result<String> {
        signer.issue(TokenKind::Auth, self.id, ttl_secs)
    }

    pub fn generate_confirmation_token(&self, signer: &TokenSigner, ttl_secs: i64) -> Result<String> {
        signer.issue(TokenKind::Confirm, self.id, ttl_secs)
    }

    pub fn generate_reset_token(&self, signer: &TokenSigner, ttl_secs: i64) -> Result<String> {
        signer.issue(TokenKind::Reset, self.id, ttl_secs)
    }

    pub fn generate_email_change_token(
        &self,
        signer: &TokenSigner,
        new_email: &str,
        ttl_secs: i64,
    ) -> Result<String> {
        let mut extra = Map::new();
        extra.insert("new_email".to_string(), Value::from(new_email));
        signer.issue_with(TokenKind::ChangeEmail, self.id, extra, ttl_secs)
    }
}

pub(crate) fn md5_hex(value: &str) -> String {
    to_hex(&Md5::digest(value.as_bytes()))
}

/// Fields for [`create`]
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// None: administrator when email matches the admin address, else default role
    pub role: Option<RoleName>,
    pub teacher_id: Option<i64>,
    pub confirmed: bool,
    pub name: Option<String>,
    pub gender: Option<String>,
}

/// Insert a user and return it with its role
pub async fn create(pool: &SqlitePool, new: NewUser, admin_email: Option<&str>) -> Result<User> {
    let role = match new.role {
        Some(name) => roles::get(pool, name.as_str()).await?,
        None => {
            let is_admin = match (&new.email, admin_email) {
                (Some(email), Some(admin)) => email == admin,
                _ => false,
            };
            let admin_role = if is_admin {
                roles::administrator_role(pool).await?
            } else {
                None
            };
            match admin_role {
                Some(role) => Some(role),
                None => roles::default_role(pool).await?,
            }
        }
    };

    let avatar_hash = new.email.as_deref().map(md5_hex);
    let (password_hash, password_salt) = match new.password.as_deref() {
        Some(pw) => {
            let hashed = hash_password(pw);
            (hashed.hash, hashed.salt)
        }
        None => (String::new(), String::new()),
    };
    let ts = now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (email, username, role_id, teacher_id, password_hash, password_salt,
                           confirmed, name, gender, avatar_hash, created, updated)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new.email)
    .bind(&new.username)
    .bind(role.as_ref().map(|r| r.id))
    .bind(new.teacher_id)
    .bind(password_hash)
    .bind(password_salt)
    .bind(new.confirmed)
    .bind(&new.name)
    .bind(new.gender.as_deref().unwrap_or("undefined"))
    .bind(avatar_hash)
    .bind(ts)
    .bind(ts)
    .execute(pool)
    .await
    .map_err(|e| Error::from(e).or_conflict("Email or username"))?;

    let id = result.last_insert_rowid();
    debug!(user_id = id, role = ?role.as_ref().map(|r| &r.name), "User created");
    get_required(pool, id).await
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let sql = format!("{} WHERE u.id = ?", USER_SELECT);
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn get_required(pool: &SqlitePool, id: i64) -> Result<User> {
    get(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User {}", id)))
}

pub async fn get_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let sql = format!("{} WHERE u.username = ?", USER_SELECT);
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn get_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let sql = format!("{} WHERE u.email = ?", USER_SELECT);
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Resolve an auth token to its user
pub async fn verify_auth_token(
    pool: &SqlitePool,
    signer: &TokenSigner,
    token: &str,
) -> Result<Option<User>> {
    match signer.subject(token, TokenKind::Auth) {
        Ok(id) => get(pool, id).await,
        Err(_) => Ok(None),
    }
}

/// Mark the account confirmed when `token` is a confirmation token for it
pub async fn confirm(pool: &SqlitePool, signer: &TokenSigner, user: &User, token: &str) -> Result<bool> {
    match signer.subject(token, TokenKind::Confirm) {
        Ok(id) if id == user.id => {
            sqlx::query("UPDATE users SET confirmed = 1, updated = ? WHERE id = ?")
                .bind(now())
                .bind(user.id)
                .execute(pool)
                .await?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Replace the password when `token` is a reset token for this user
pub async fn reset_password(
    pool: &SqlitePool,
    signer: &TokenSigner,
    user: &User,
    token: &str,
    new_password: &str,
) -> Result<bool> {
    match signer.subject(token, TokenKind::Reset) {
        Ok(id) if id == user.id => {
            set_password(pool, user.id, new_password).await?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Apply an email change token; rejects missing or already-used addresses
pub async fn change_email(pool: &SqlitePool, signer: &TokenSigner, user: &User, token: &str) -> Result<bool> {
    let claims = match signer.verify(token) {
        Ok(claims) => claims,
        Err(_) => return Ok(false),
    };
    if claims.get(TokenKind::ChangeEmail.claim()).and_then(Value::as_i64) != Some(user.id) {
        return Ok(false);
    }
    let Some(new_email) = claims.get("new_email").and_then(Value::as_str) else {
        return Ok(false);
    };
    if get_by_email(pool, new_email).await?.is_some() {
        return Ok(false);
    }
    sqlx::query("UPDATE users SET email = ?, avatar_hash = ?, updated = ? WHERE id = ?")
        .bind(new_email)
        .bind(md5_hex(new_email))
        .bind(now())
        .bind(user.id)
        .execute(pool)
        .await?;
    Ok(true)
}

pub async fn set_password(pool: &SqlitePool, id: i64, password: &str) -> Result<()> {
    let hashed = hash_password(password);
    sqlx::query("UPDATE users SET password_hash = ?, password_salt = ?, updated = ? WHERE id = ?")
        .bind(hashed.hash)
        .bind(hashed.salt)
        .bind(now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Refresh the `updated` timestamp
pub async fn ping(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("UPDATE users SET updated = ? WHERE id = ?")
        .bind(now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Writable user attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    Email,
    Username,
    RoleId,
    TeacherId,
    Password,
    Confirmed,
    TutorialCompleted,
    ExamPoints,
    Name,
    Gender,
    AvatarHash,
}

/// Attributes that exist on a user but cannot be assigned
const READ_ONLY_FIELDS: [&str; 5] = ["id", "created", "updated", "password_hash", "password_salt"];

impl UserField {
    pub fn parse(key: &str) -> Option<UserField> {
        Some(match key {
            "email" => UserField::Email,
            "username" => UserField::Username,
            "role_id" => UserField::RoleId,
            "teacher_id" => UserField::TeacherId,
            "password" => UserField::Password,
            "confirmed" => UserField::Confirmed,
            "tutorial_completed" => UserField::TutorialCompleted,
            "exam_points" => UserField::ExamPoints,
            "name" => UserField::Name,
            "gender" => UserField::Gender,
            "avatar_hash" => UserField::AvatarHash,
            _ => return None,
        })
    }

    fn column(self) -> &'static str {
        match self {
            UserField::Email => "email",
            UserField::Username => "username",
            UserField::RoleId => "role_id",
            UserField::TeacherId => "teacher_id",
            UserField::Password => "password_hash",
            UserField::Confirmed => "confirmed",
            UserField::TutorialCompleted => "tutorial_completed",
            UserField::ExamPoints => "exam_points",
            UserField::Name => "name",
            UserField::Gender => "gender",
            UserField::AvatarHash => "avatar_hash",
        }
    }

    /// Only administrators may assign these
    pub fn is_privileged(self) -> bool {
        matches!(self, UserField::RoleId | UserField::Confirmed)
    }
}

/// A typed value for one [`UserField`]
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(Option<String>),
    Int(Option<i64>),
    Bool(bool),
}

/// Validate a JSON object of attribute updates
///
/// Every key must name a user attribute. Integer fields accept numeric
/// strings; boolean fields accept 0/1.
pub fn parse_changes(data: &Map<String, Value>) -> Result<Vec<(UserField, FieldValue)>> {
    let mut changes = Vec::with_capacity(data.len());
    for (key, value) in data {
        let field = match UserField::parse(key) {
            Some(field) => field,
            None if READ_ONLY_FIELDS.contains(&key.as_str()) => {
                return Err(Error::InvalidInput(format!("Field '{}' is read-only", key)));
            }
            None => {
                return Err(Error::InvalidInput(format!("Field '{}' is not part of User", key)));
            }
        };
        let invalid = || Error::InvalidInput(format!("Field '{}' has an invalid value", key));
        let typed = match field {
            UserField::Email
            | UserField::Username
            | UserField::Name
            | UserField::Gender
            | UserField::AvatarHash => match value {
                Value::Null => FieldValue::Text(None),
                Value::String(s) => FieldValue::Text(Some(s.clone())),
                _ => return Err(invalid()),
            },
            UserField::Password => match value {
                Value::String(s) if !s.is_empty() => FieldValue::Text(Some(s.clone())),
                _ => return Err(invalid()),
            },
            UserField::RoleId | UserField::TeacherId | UserField::ExamPoints => match value {
                Value::Null if field != UserField::ExamPoints => FieldValue::Int(None),
                Value::Number(n) => FieldValue::Int(Some(n.as_i64().ok_or_else(invalid)?)),
                Value::String(s) => FieldValue::Int(Some(s.trim().parse().map_err(|_| invalid())?)),
                _ => return Err(invalid()),
            },
            UserField::Confirmed | UserField::TutorialCompleted => match value {
                Value::Bool(b) => FieldValue::Bool(*b),
                Value::Number(n) => FieldValue::Bool(n.as_i64().unwrap_or(0) != 0),
                _ => return Err(invalid()),
            },
        };
        changes.push((field, typed));
    }
    Ok(changes)
}

/// Apply attribute changes in one transaction and return the updated user
///
/// A new email refreshes the avatar hash unless one is supplied.
pub async fn apply_changes(
    pool: &SqlitePool,
    id: i64,
    changes: &[(UserField, FieldValue)],
) -> Result<User> {
    let mut tx = pool.begin().await?;

    for (field, value) in changes {
        match (field, value) {
            (UserField::Password, FieldValue::Text(Some(password))) => {
                let hashed = hash_password(password);
                sqlx::query("UPDATE users SET password_hash = ?, password_salt = ? WHERE id = ?")
                    .bind(hashed.hash)
                    .bind(hashed.salt)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            (field, value) => {
                let sql = format!("UPDATE users SET {} = ? WHERE id = ?", field.column());
                let query = sqlx::query(&sql);
                let query = match value {
                    FieldValue::Text(v) => query.bind(v.clone()),
                    FieldValue::Int(v) => query.bind(*v),
                    FieldValue::Bool(v) => query.bind(*v),
                };
                query
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| Error::from(e).or_conflict("Email or username"))?;
            }
        }
    }

    let email_changed = changes.iter().find_map(|(f, v)| match (f, v) {
        (UserField::Email, FieldValue::Text(email)) => Some(email.clone()),
        _ => None,
    });
    let avatar_given = changes.iter().any(|(f, _)| *f == UserField::AvatarHash);
    if let (Some(email), false) = (email_changed, avatar_given) {
        sqlx::query("UPDATE users SET avatar_hash = ? WHERE id = ?")
            .bind(email.as_deref().map(md5_hex))
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query("UPDATE users SET updated = ? WHERE id = ?")
        .bind(now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    get_required(pool, id).await
}

/// Validate and apply a JSON update
pub async fn update(pool: &SqlitePool, id: i64, data: &Map<String, Value>) -> Result<User> {
    let changes = parse_changes(data)?;
    apply_changes(pool, id, &changes).await
}

async fn users_with_role(pool: &SqlitePool, role: RoleName) -> Result<Vec<User>> {
    let sql = format!("{} WHERE r.name = ? ORDER BY u.id", USER_SELECT);
    let users = sqlx::query_as::<_, User>(&sql)
        .bind(role.as_str())
        .fetch_all(pool)
        .await?;
    Ok(users)
}

pub async fn teachers(pool: &SqlitePool) -> Result<Vec<User>> {
    users_with_role(pool, RoleName::Teacher).await
}

pub async fn students(pool: &SqlitePool) -> Result<Vec<User>> {
    users_with_role(pool, RoleName::Student).await
}

/// Users assigned to `teacher_id`, oldest first
pub async fn my_students(pool: &SqlitePool, teacher_id: i64, page: i64, per_page: i64) -> Result<Page<User>> {
    let page_sql = format!("{} WHERE u.teacher_id = ? ORDER BY u.id LIMIT ? OFFSET ?", USER_SELECT);
    crate::db::paginate(
        pool,
        "SELECT COUNT(*) FROM users WHERE teacher_id = ?",
        &page_sql,
        Some(teacher_id),
        page,
        per_page,
    )
    .await
}

/// Every user, newest first
pub async fn list(pool: &SqlitePool, page: i64, per_page: i64) -> Result<Page<User>> {
    let page_sql = format!("{} ORDER BY u.created DESC, u.id DESC LIMIT ? OFFSET ?", USER_SELECT);
    crate::db::paginate(pool, "SELECT COUNT(*) FROM users", &page_sql, None, page, per_page).await
}

pub async fn have_scores(pool: &SqlitePool, id: i64) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM scores WHERE user_id = ?)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct GameMaxScore {
    pub game: String,
    pub score: Option<i64>,
}

/// Highest score per game for one user
pub async fn max_score_by_game(pool: &SqlitePool, id: i64) -> Result<Vec<GameMaxScore>> {
    let rows = sqlx::query_as::<_, GameMaxScore>(
        r#"
        SELECT game, MAX(score) AS score
        FROM scores
        WHERE user_id = ? AND game IS NOT NULL
        GROUP BY game
        ORDER BY game
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Replace the user's school memberships with `school_ids`
pub async fn add_to_schools(pool: &SqlitePool, user_id: i64, school_ids: &[i64]) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM users_schools WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    let ts = now();
    for school_id in school_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO users_schools (user_id, school_id, created, updated) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(school_id)
        .bind(ts)
        .bind(ts)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn remove_from_school(pool: &SqlitePool, user_id: i64, school_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM users_schools WHERE user_id = ? AND school_id = ?")
        .bind(user_id)
        .bind(school_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn member_of_school(pool: &SqlitePool, user_id: i64, school_id: i64) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users_schools WHERE user_id = ? AND school_id = ?)",
    )
    .bind(user_id)
    .bind(school_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Record the origin of a successful login
pub async fn save_login_info(
    pool: &SqlitePool,
    user_id: i64,
    remote_addr: &str,
    user_agent: &str,
) -> Result<()> {
    sqlx::query("INSERT INTO login_info (user_id, remote_addr, user_agent, created) VALUES (?, ?, ?, ?)")
        .bind(user_id)
        .bind(remote_addr)
        .bind(user_agent)
        .bind(now())
        .execute(pool)
        .await?;
    Ok(())
}

/// Outcome of a student import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Import students from `username,password,teacher_username` rows
///
/// Imported users are confirmed Students named after their username and
/// assigned to the named teacher when one exists. Rows that collide with an
/// existing user or have the wrong number of fields are skipped.
pub async fn import_students_from_data(pool: &SqlitePool, data: &str, delimiter: u8) -> Result<ImportSummary> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(data.as_bytes());

    let mut summary = ImportSummary::default();
    let mut teacher_ids: HashMap<String, Option<i64>> = HashMap::new();

    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| Error::InvalidInput(format!("CSV line {}: {}", line + 1, e)))?;
        if record.len() != 3 {
            warn!(line = line + 1, fields = record.len(), "Skipping malformed student row");
            summary.skipped += 1;
            continue;
        }
        let (username, password, teacher) = (&record[0], &record[1], &record[2]);

        let teacher_id = match teacher_ids.get(teacher) {
            Some(id) => *id,
            None => {
                let id = get_by_username(pool, teacher).await?.map(|t| t.id);
                teacher_ids.insert(teacher.to_string(), id);
                id
            }
        };

        let new = NewUser {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            role: Some(RoleName::Student),
            teacher_id,
            confirmed: true,
            name: Some(username.to_string()),
            ..Default::default()
        };
        match create(pool, new, None).await {
            Ok(user) => {
                debug!(user_id = user.id, username = %username, "Student imported");
                summary.imported += 1;
            }
            Err(Error::Conflict(_)) => {
                debug!(username = %username, "Student already exists, skipping");
                summary.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(imported = summary.imported, skipped = summary.skipped, "Student import finished");
    Ok(summary)
}
