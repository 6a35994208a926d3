//! # gamegen common library
//!
//! Shared code for the gamegen backend binaries:
//! - Database initialization, migrations, models and queries
//! - Roles and permission bitmasks
//! - Password hashing and signed tokens
//! - Configuration loading
//! - Pagination, input validation and the usage statistics report

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod pagination;
pub mod stats;
pub mod time;
pub mod validate;

pub use auth::permission::{Permission, RoleName};
pub use error::{Error, Result};
