//! Authentication primitives
//!
//! Pure functions only. HTTP extraction lives in the server crate.

pub mod password;
pub mod permission;
pub mod token;

pub use password::{hash_password, verify_password, PasswordHash};
pub use permission::{Permission, RoleName};
pub use token::{TokenKind, TokenSigner};
