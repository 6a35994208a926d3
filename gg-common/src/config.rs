//! Configuration loading
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`GAMEGEN_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Missing or unreadable TOML files never abort startup; they log a warning
//! and the remaining tiers apply.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "GAMEGEN_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub bind: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    /// Absolute base used in Location headers and pagination links
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Users created with this email become administrators
    #[serde(default)]
    pub admin_email: Option<String>,
    #[serde(default)]
    pub posts_per_page: Option<i64>,
    #[serde(default)]
    pub slow_query_ms: Option<u64>,
    #[serde(default)]
    pub token_ttl_secs: Option<i64>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub stats: StatsCatalogue,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Object storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Objects live under a local directory
    #[default]
    Fs,
    /// Objects are PUT/GET against an S3-compatible HTTP endpoint
    Http,
}

/// Object storage configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Directory for the fs backend (default: `<database dir>/objects`)
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Bucket endpoint for the http backend, e.g. `https://s3.amazonaws.com/gamegen`
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Public URL prefix for asset and game data links
    #[serde(default)]
    pub public_base: Option<String>,
}

/// Content catalogue reported by the usage statistics export
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StatsCatalogue {
    #[serde(default = "default_lessons")]
    pub lessons: Vec<String>,
    #[serde(default = "default_games")]
    pub games: Vec<String>,
    #[serde(default = "default_quizzes")]
    pub quizzes: Vec<String>,
    #[serde(default = "default_screens")]
    pub screens: Vec<String>,
}

const TOPICS: [&str; 13] = [
    "danger",
    "labtools",
    "atom_rutherford",
    "atom_atomic_number",
    "atom_isotops",
    "matter1_levels",
    "matter1_table",
    "matter1_connection",
    "matter2_mol",
    "matter2_mass",
    "matter2_stoichiometry",
    "change_reaction",
    "change_adjustment",
];

fn topics(prefix: &str) -> Vec<String> {
    TOPICS.iter().map(|t| format!("{}_{}", prefix, t)).collect()
}

fn default_lessons() -> Vec<String> {
    topics("lesson")
}

fn default_games() -> Vec<String> {
    topics("game")
}

fn default_quizzes() -> Vec<String> {
    topics("quiz")
}

fn default_screens() -> Vec<String> {
    ["PanelTabOrganigram", "PanelTabQuiz", "DressingRoom"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for StatsCatalogue {
    fn default() -> Self {
        Self {
            lessons: default_lessons(),
            games: default_games(),
            quizzes: default_quizzes(),
            screens: default_screens(),
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: PathBuf,
    pub bind: String,
    pub port: u16,
    pub public_url: Option<String>,
    /// None means: load or generate from the database `settings` table
    pub secret_key: Option<String>,
    pub admin_email: Option<String>,
    pub posts_per_page: i64,
    pub slow_query_ms: u64,
    pub token_ttl_secs: i64,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub stats: StatsCatalogue,
}

pub const DEFAULT_PORT: u16 = 5780;
pub const DEFAULT_POSTS_PER_PAGE: i64 = 20;
pub const DEFAULT_SLOW_QUERY_MS: u64 = 500;
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

impl Settings {
    /// Resolve settings from CLI, environment, TOML and defaults
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let toml = match config_file_path(cli.config.as_deref()) {
            Some(path) => load_toml(&path)?,
            None => TomlConfig::default(),
        };
        Self::from_sources(cli, &toml)
    }

    /// Merge already-loaded sources; environment is read here
    pub fn from_sources(cli: &CliOverrides, toml: &TomlConfig) -> Result<Self> {
        let database_path = cli
            .database
            .clone()
            .or_else(|| env_var("GAMEGEN_DATABASE").map(PathBuf::from))
            .or_else(|| toml.database_path.clone())
            .unwrap_or_else(default_database_path);

        let bind = cli
            .bind
            .clone()
            .or_else(|| env_var("GAMEGEN_BIND"))
            .or_else(|| toml.bind.clone())
            .unwrap_or_else(|| "127.0.0.1".to_string());

        let port = match cli.port {
            Some(p) => p,
            None => match env_var("GAMEGEN_PORT") {
                Some(raw) => raw
                    .parse()
                    .map_err(|e| Error::Config(format!("Invalid GAMEGEN_PORT '{}': {}", raw, e)))?,
                None => toml.port.unwrap_or(DEFAULT_PORT),
            },
        };

        let posts_per_page = toml.posts_per_page.unwrap_or(DEFAULT_POSTS_PER_PAGE);
        if posts_per_page < 1 {
            return Err(Error::Config("posts_per_page must be at least 1".to_string()));
        }

        Ok(Self {
            database_path,
            bind,
            port,
            public_url: env_var("GAMEGEN_PUBLIC_URL").or_else(|| toml.public_url.clone()),
            secret_key: env_var("GAMEGEN_SECRET_KEY").or_else(|| toml.secret_key.clone()),
            admin_email: env_var("GAMEGEN_ADMIN").or_else(|| toml.admin_email.clone()),
            posts_per_page,
            slow_query_ms: toml.slow_query_ms.unwrap_or(DEFAULT_SLOW_QUERY_MS),
            token_ttl_secs: toml.token_ttl_secs.unwrap_or(DEFAULT_TOKEN_TTL_SECS),
            logging: toml.logging.clone(),
            storage: toml.storage.clone(),
            stats: toml.stats.clone(),
        })
    }

    /// Directory used by the fs storage backend
    pub fn storage_root(&self) -> PathBuf {
        self.storage.root.clone().unwrap_or_else(|| {
            self.database_path
                .parent()
                .map(|p| p.join("objects"))
                .unwrap_or_else(|| PathBuf::from("objects"))
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Pick the TOML file to read, if any
fn config_file_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env_var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    let user_config = dirs::config_dir()?.join("gamegen").join("config.toml");
    user_config.exists().then_some(user_config)
}

/// Load a TOML config file
///
/// A missing file yields defaults with a warning; a malformed file is an error.
pub fn load_toml(path: &Path) -> Result<TomlConfig> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let config = toml::from_str(&content).map_err(|e| {
                Error::Config(format!("Failed to parse {}: {}", path.display(), e))
            })?;
            info!("Loaded config file: {}", path.display());
            Ok(config)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Config file not found: {} (using defaults)", path.display());
            Ok(TomlConfig::default())
        }
        Err(e) => Err(Error::Io(e)),
    }
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("gamegen"))
        .unwrap_or_else(|| PathBuf::from("./gamegen_data"))
        .join("gamegen.db")
}
