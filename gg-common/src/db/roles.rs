//! Roles and their permission bitmasks

use crate::auth::permission::{Permission, RoleName};
use crate::Result;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub is_default: bool,
    pub permissions: i64,
}

impl Role {
    pub fn permission(&self) -> Permission {
        Permission(self.permissions)
    }

    pub fn role_name(&self) -> Option<RoleName> {
        RoleName::parse(&self.name)
    }
}

/// Create or refresh the three built-in roles
pub async fn insert_roles(pool: &SqlitePool) -> Result<()> {
    for role in RoleName::ALL {
        let (permissions, is_default) = role.defaults();
        sqlx::query(
            r#"
            INSERT INTO roles (name, is_default, permissions) VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                is_default = excluded.is_default,
                permissions = excluded.permissions
            "#,
        )
        .bind(role.as_str())
        .bind(is_default)
        .bind(permissions.bits())
        .execute(pool)
        .await?;
        debug!(role = %role, permissions = permissions.bits(), "Role upserted");
    }
    Ok(())
}

/// Look up a role by exact name
pub async fn get(pool: &SqlitePool, name: &str) -> Result<Option<Role>> {
    let role = sqlx::query_as::<_, Role>(
        "SELECT id, name, is_default, permissions FROM roles WHERE name = ?",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;
    Ok(role)
}

pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Role>> {
    let role = sqlx::query_as::<_, Role>(
        "SELECT id, name, is_default, permissions FROM roles WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(role)
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<Role>> {
    let roles = sqlx::query_as::<_, Role>(
        "SELECT id, name, is_default, permissions FROM roles ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(roles)
}

/// Role flagged as default, assigned to new users
pub async fn default_role(pool: &SqlitePool) -> Result<Option<Role>> {
    let role = sqlx::query_as::<_, Role>(
        "SELECT id, name, is_default, permissions FROM roles WHERE is_default = 1 ORDER BY id LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(role)
}

/// Role holding every permission bit
pub async fn administrator_role(pool: &SqlitePool) -> Result<Option<Role>> {
    let role = sqlx::query_as::<_, Role>(
        "SELECT id, name, is_default, permissions FROM roles WHERE permissions = ? ORDER BY id LIMIT 1",
    )
    .bind(Permission::ALL.bits())
    .fetch_optional(pool)
    .await?;
    Ok(role)
}
