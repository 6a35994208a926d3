//! Embeds the commit and build time reported by `gamegen` at startup and
//! by `/health`.
//!
//! `GAMEGEN_COMMIT` in the build environment wins over `git`, for builds
//! made from a source archive.

use std::env;
use std::process::Command;

fn git_commit() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string())
}

fn main() {
    println!("cargo:rerun-if-env-changed=GAMEGEN_COMMIT");
    println!("cargo:rerun-if-changed=../.git/HEAD");

    let commit = env::var("GAMEGEN_COMMIT")
        .ok()
        .filter(|c| !c.is_empty())
        .or_else(git_commit)
        .unwrap_or_else(|| "unknown".to_string());
    let built = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

    println!("cargo:rustc-env=GAMEGEN_COMMIT={}", commit);
    println!("cargo:rustc-env=GAMEGEN_BUILT={}", built);
}
