//! Configuration resolution tests
//!
//! Tests that set GAMEGEN_* variables are marked #[serial] so they never
//! observe each other's environment.

use gg_common::config::{load_toml, CliOverrides, Settings, TomlConfig, DEFAULT_PORT};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

const VARS: [&str; 7] = [
    "GAMEGEN_DATABASE",
    "GAMEGEN_BIND",
    "GAMEGEN_PORT",
    "GAMEGEN_PUBLIC_URL",
    "GAMEGEN_SECRET_KEY",
    "GAMEGEN_ADMIN",
    "GAMEGEN_CONFIG",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults_without_any_source() {
    clear_env();
    let settings = Settings::from_sources(&CliOverrides::default(), &TomlConfig::default()).unwrap();
    assert_eq!(settings.port, DEFAULT_PORT);
    assert_eq!(settings.bind, "127.0.0.1");
    assert_eq!(settings.posts_per_page, 20);
    assert_eq!(settings.slow_query_ms, 500);
    assert_eq!(settings.token_ttl_secs, 3600);
    assert_eq!(settings.logging.level, "info");
    assert!(settings.secret_key.is_none());
    assert!(settings.database_path.ends_with("gamegen.db"));
}

#[test]
#[serial]
fn test_priority_cli_over_env_over_toml() {
    clear_env();
    let toml: TomlConfig = toml::from_str(
        r#"
        port = 6000
        bind = "0.0.0.0"
        database_path = "/tmp/from-toml.db"
        admin_email = "toml@example.com"
        "#,
    )
    .unwrap();

    env::set_var("GAMEGEN_PORT", "6100");
    env::set_var("GAMEGEN_DATABASE", "/tmp/from-env.db");
    env::set_var("GAMEGEN_ADMIN", "env@example.com");

    let cli = CliOverrides {
        port: Some(6200),
        ..Default::default()
    };
    let settings = Settings::from_sources(&cli, &toml).unwrap();

    assert_eq!(settings.port, 6200);
    assert_eq!(settings.database_path, PathBuf::from("/tmp/from-env.db"));
    assert_eq!(settings.bind, "0.0.0.0");
    assert_eq!(settings.admin_email.as_deref(), Some("env@example.com"));

    clear_env();
}

#[test]
#[serial]
fn test_invalid_port_env_is_rejected() {
    clear_env();
    env::set_var("GAMEGEN_PORT", "eighty");
    let result = Settings::from_sources(&CliOverrides::default(), &TomlConfig::default());
    assert!(result.is_err());
    clear_env();
}

#[test]
fn test_missing_toml_yields_defaults() {
    let config = load_toml(std::path::Path::new("/nonexistent/gamegen.toml")).unwrap();
    assert!(config.port.is_none());
}

#[test]
fn test_malformed_toml_is_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "port = [not valid").unwrap();
    assert!(load_toml(file.path()).is_err());
}

#[test]
#[serial]
fn test_resolve_reads_config_file() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        posts_per_page = 5
        public_url = "https://gamegen.example.org"

        [logging]
        level = "debug"

        [stats]
        screens = ["Login"]
        "#
    )
    .unwrap();

    let cli = CliOverrides {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let settings = Settings::resolve(&cli).unwrap();
    assert_eq!(settings.posts_per_page, 5);
    assert_eq!(settings.public_url.as_deref(), Some("https://gamegen.example.org"));
    assert_eq!(settings.logging.level, "debug");
    assert_eq!(settings.stats.screens, vec!["Login"]);
    // Unset catalogue lists keep their defaults
    assert_eq!(settings.stats.games.len(), 13);
}

#[test]
#[serial]
fn test_storage_root_defaults_next_to_database() {
    clear_env();
    let toml: TomlConfig = toml::from_str(r#"database_path = "/srv/gamegen/gamegen.db""#).unwrap();
    let settings = Settings::from_sources(&CliOverrides::default(), &toml).unwrap();
    assert_eq!(settings.storage_root(), PathBuf::from("/srv/gamegen/objects"));
}
