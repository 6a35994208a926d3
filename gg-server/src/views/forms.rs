//! Admin view forms and their validation
//!
//! `validate` returns every problem found so the form can be shown again
//! with all messages at once.

use gg_common::db::roles::{self, Role};
use gg_common::db::schools::{self, School, SchoolEdit};
use gg_common::db::users::{self, FieldValue, User, UserField};
use gg_common::validate;
use gg_common::Result;
use serde::Deserialize;
use sqlx::SqlitePool;

const USERNAME_PATTERN_MSG: &str = "Usernames must have only letters, numbers, dots or underscores";
const SCHOOL_NAME_PATTERN_MSG: &str = "Names must have only letters, numbers, dots or underscores";
const INVALID_EMAIL_MSG: &str = "Invalid email address.";

fn check_length(errors: &mut Vec<String>, field: &str, value: &str, min: usize, max: usize) {
    if let Err(e) = validate::length(field, value, min, max) {
        errors.push(e.to_string());
    }
}

fn check_required(errors: &mut Vec<String>, field: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.push(format!("{} is required", field));
        return false;
    }
    true
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// New school from the schools page
#[derive(Debug, Default, Deserialize)]
pub struct SchoolForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl SchoolForm {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        check_length(&mut errors, "Name", &self.name, 0, 64);
        check_required(&mut errors, "Description", &self.description);
        errors
    }
}

/// New user from the users and add-user pages
#[derive(Debug, Default, Deserialize)]
pub struct UserForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
}

impl UserForm {
    /// Validated role; pushes an error when the choice is unknown or grants
    /// more than `granter` holds
    pub async fn validate(&self, pool: &SqlitePool, granter: &User) -> Result<(Vec<String>, Option<Role>)> {
        let mut errors = Vec::new();
        if check_required(&mut errors, "Username", &self.username) {
            check_length(&mut errors, "Username", &self.username, 1, 64);
            if !validate::identifier(&self.username) {
                errors.push(USERNAME_PATTERN_MSG.to_string());
            } else if users::get_by_username(pool, &self.username).await?.is_some() {
                errors.push("Username already in use.".to_string());
            }
        }
        check_required(&mut errors, "Password", &self.password);
        let role = match self.role.trim().parse::<i64>() {
            Ok(id) => roles::get_by_id(pool, id)
                .await?
                .filter(|r| granter.can(r.permission())),
            Err(_) => None,
        };
        if role.is_none() {
            errors.push("Not a valid choice for Role".to_string());
        }
        Ok((errors, role))
    }
}

/// Own profile
#[derive(Debug, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub name: String,
}

impl ProfileForm {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        check_length(&mut errors, "Real name", &self.name, 0, 64);
        errors
    }

    pub fn changes(&self) -> Vec<(UserField, FieldValue)> {
        vec![(UserField::Name, FieldValue::Text(non_empty(&self.name)))]
    }
}

/// Any user's profile, edited by an administrator
#[derive(Debug, Default, Deserialize)]
pub struct ProfileAdminForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub confirmed: Option<String>,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub name: String,
}

impl ProfileAdminForm {
    pub fn from_user(user: &User) -> Self {
        Self {
            email: user.email.clone().unwrap_or_default(),
            username: user.username.clone().unwrap_or_default(),
            confirmed: user.confirmed.then(|| "y".to_string()),
            role: user.role_id.map(|id| id.to_string()).unwrap_or_default(),
            name: user.name.clone().unwrap_or_default(),
        }
    }

    pub fn role_id(&self) -> Option<i64> {
        self.role.trim().parse().ok()
    }

    pub async fn validate(&self, pool: &SqlitePool, user: &User) -> Result<Vec<String>> {
        let mut errors = Vec::new();

        if check_required(&mut errors, "Email", &self.email) {
            check_length(&mut errors, "Email", &self.email, 1, 64);
            if !validate::email(&self.email) {
                errors.push(INVALID_EMAIL_MSG.to_string());
            } else if user.email.as_deref() != Some(self.email.as_str())
                && users::get_by_email(pool, &self.email).await?.is_some()
            {
                errors.push("Email already registered.".to_string());
            }
        }

        if check_required(&mut errors, "Username", &self.username) {
            check_length(&mut errors, "Username", &self.username, 1, 64);
            if !validate::identifier(&self.username) {
                errors.push(USERNAME_PATTERN_MSG.to_string());
            } else if user.username.as_deref() != Some(self.username.as_str())
                && users::get_by_username(pool, &self.username).await?.is_some()
            {
                errors.push("Username already in use.".to_string());
            }
        }

        let role = match self.role_id() {
            Some(id) => roles::get_by_id(pool, id).await?,
            None => None,
        };
        if role.is_none() {
            errors.push("Not a valid choice for Role".to_string());
        }

        check_length(&mut errors, "Real name", &self.name, 0, 64);
        Ok(errors)
    }

    pub fn changes(&self) -> Vec<(UserField, FieldValue)> {
        vec![
            (UserField::Email, FieldValue::Text(Some(self.email.trim().to_string()))),
            (UserField::Username, FieldValue::Text(Some(self.username.trim().to_string()))),
            (UserField::Confirmed, FieldValue::Bool(self.confirmed.is_some())),
            (UserField::RoleId, FieldValue::Int(self.role_id())),
            (UserField::Name, FieldValue::Text(non_empty(&self.name))),
        ]
    }
}

/// School attributes edited by an administrator
#[derive(Debug, Default, Deserialize)]
pub struct SchoolEditForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enabled: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub description: String,
}

impl SchoolEditForm {
    pub fn from_school(school: &School) -> Self {
        Self {
            name: school.name.clone().unwrap_or_default(),
            enabled: school.enabled.then(|| "y".to_string()),
            address: school.address.clone().unwrap_or_default(),
            email: school.email.clone().unwrap_or_default(),
            description: school.description.clone().unwrap_or_default(),
        }
    }

    pub async fn validate(&self, pool: &SqlitePool, school: &School) -> Result<Vec<String>> {
        let mut errors = Vec::new();

        if check_required(&mut errors, "Name", &self.name) {
            check_length(&mut errors, "Name", &self.name, 1, 64);
            if !validate::identifier(&self.name) {
                errors.push(SCHOOL_NAME_PATTERN_MSG.to_string());
            } else if school.name.as_deref() != Some(self.name.as_str())
                && schools::get_by_name(pool, &self.name).await?.is_some()
            {
                errors.push("School name already in use.".to_string());
            }
        }

        check_length(&mut errors, "Address", &self.address, 0, 254);

        if check_required(&mut errors, "Email", &self.email) {
            check_length(&mut errors, "Email", &self.email, 1, 64);
            if !validate::email(&self.email) {
                errors.push(INVALID_EMAIL_MSG.to_string());
            } else if school.email.as_deref() != Some(self.email.as_str())
                && schools::get_by_email(pool, &self.email).await?.is_some()
            {
                errors.push("Email already registered.".to_string());
            }
        }

        check_length(&mut errors, "Description", &self.description, 0, 254);
        Ok(errors)
    }

    pub fn to_edit(&self) -> SchoolEdit {
        SchoolEdit {
            name: self.name.trim().to_string(),
            enabled: self.enabled.is_some(),
            address: non_empty(&self.address),
            email: non_empty(&self.email),
            description: non_empty(&self.description),
        }
    }
}
