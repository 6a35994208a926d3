//! Salted password hashing
//!
//! Stored as two columns (`password_hash`, `password_salt`). The hash is
//! SHA-256 over salt and password, re-hashed `ROUNDS` times.

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const ROUNDS: u32 = 10_000;
const SALT_BYTES: usize = 16;

/// Hash and salt pair as persisted in `users`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    pub hash: String,
    pub salt: String,
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> PasswordHash {
    let mut salt = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = to_hex(&salt);
    let hash = digest(&salt, password);
    PasswordHash { hash, salt }
}

/// Check a password against a stored hash and salt
///
/// Empty stored hashes never verify.
pub fn verify_password(password: &str, hash: &str, salt: &str) -> bool {
    if hash.is_empty() {
        return false;
    }
    let calculated = digest(salt, password);
    calculated.as_bytes().ct_eq(hash.as_bytes()).into()
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    let mut out = hasher.finalize();
    for _ in 1..ROUNDS {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(out);
        out = hasher.finalize();
    }
    to_hex(&out)
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
