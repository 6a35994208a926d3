//! gamegen - main entry point
//!
//! Serves the JSON API and admin views, and runs the maintenance commands
//! (deploy, add-user, import-students, export-stats).

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gg_common::config::{CliOverrides, Settings};
use gg_common::db::{self, game_data, jobs as job_rows, roles, settings as db_settings, users};
use gg_common::RoleName;
use sqlx::SqlitePool;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gg_server::{build_router, import, jobs, storage, AppState};

/// Command-line arguments for gamegen
#[derive(Parser, Debug)]
#[command(name = "gamegen")]
#[command(about = "Educational game backend: API, admin views and maintenance commands")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long, global = true, env = "GAMEGEN_CONFIG")]
    config: Option<PathBuf>,

    /// Path to SQLite database file
    #[arg(short, long, global = true, env = "GAMEGEN_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Address to bind
        #[arg(long, env = "GAMEGEN_BIND")]
        bind: Option<String>,

        /// Port to listen on
        #[arg(short, long, env = "GAMEGEN_PORT")]
        port: Option<u16>,
    },

    /// Bring the schema up to date and insert roles and game data
    Deploy,

    /// Create a user account
    AddUser {
        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        email: Option<String>,

        /// Student, Teacher or Administrator
        #[arg(long)]
        role: Option<String>,

        /// Mark the account as confirmed
        #[arg(long)]
        confirmed: bool,
    },

    /// Import students from a CSV file or http(s) URL
    ImportStudents {
        /// Path or URL of the CSV data
        source: String,
    },

    /// Build the game statistics report now and upload it
    ExportStats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (bind, port) = match &args.command {
        Some(Command::Serve { bind, port }) => (bind.clone(), *port),
        _ => (None, None),
    };
    let overrides = CliOverrides {
        config: args.config.clone(),
        database: args.database.clone(),
        bind,
        port,
    };
    let settings = Settings::resolve(&overrides).context("Failed to resolve configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "gamegen v{} [{}] built {}{}",
        env!("CARGO_PKG_VERSION"),
        env!("GAMEGEN_COMMIT"),
        env!("GAMEGEN_BUILT"),
        if cfg!(debug_assertions) { " (debug)" } else { "" }
    );
    info!("Database: {}", settings.database_path.display());

    let pool = db::init_database(&settings.database_path, settings.slow_query_ms)
        .await
        .context("Failed to initialize database")?;

    match args.command.unwrap_or(Command::Serve { bind: None, port: None }) {
        Command::Serve { .. } => serve(pool, settings).await,
        Command::Deploy => deploy(&pool).await,
        Command::AddUser {
            username,
            password,
            email,
            role,
            confirmed,
        } => add_user(&pool, &settings, username, password, email, role, confirmed).await,
        Command::ImportStudents { source } => {
            let summary = import::import_students(&pool, &source).await?;
            println!("Imported {} students, skipped {}", summary.imported, summary.skipped);
            Ok(())
        }
        Command::ExportStats => export_stats(pool, settings).await,
    }
}

async fn app_state(pool: SqlitePool, settings: Settings) -> Result<AppState> {
    let secret_key = match &settings.secret_key {
        Some(key) => key.clone(),
        None => db_settings::load_secret_key(&pool)
            .await
            .context("Failed to load secret key")?,
    };
    let store = storage::from_settings(&settings).context("Failed to configure storage")?;
    Ok(AppState::new(pool, settings, &secret_key, store))
}

async fn serve(pool: SqlitePool, settings: Settings) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", settings.bind, settings.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", settings.bind, settings.port))?;

    let state = app_state(pool, settings).await?;
    let app = build_router(state);

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn deploy(pool: &SqlitePool) -> Result<()> {
    roles::insert_roles(pool).await.context("Failed to insert roles")?;
    game_data::insert_game_data(pool)
        .await
        .context("Failed to insert game data")?;
    info!("Deploy complete");
    Ok(())
}

async fn add_user(
    pool: &SqlitePool,
    settings: &Settings,
    username: String,
    password: String,
    email: Option<String>,
    role: Option<String>,
    confirmed: bool,
) -> Result<()> {
    let role = match role {
        Some(name) => Some(
            RoleName::parse(&name).with_context(|| format!("Unknown role '{}'", name))?,
        ),
        None => None,
    };
    let new = users::NewUser {
        email,
        username: Some(username),
        password: Some(password),
        role,
        confirmed,
        ..Default::default()
    };
    let user = users::create(pool, new, settings.admin_email.as_deref()).await?;
    println!(
        "Created user {} (id {}, role {})",
        user.display_name(),
        user.id,
        user.role_name.as_deref().unwrap_or("none")
    );
    Ok(())
}

async fn export_stats(pool: SqlitePool, settings: Settings) -> Result<()> {
    let state = app_state(pool, settings).await?;
    let job = job_rows::enqueue(&state.db, jobs::GAME_STATS).await?;
    let key = jobs::run_game_stats(&state.db, state.store.as_ref(), &state.settings.stats, &job.id)
        .await
        .with_context(|| format!("Export job {} failed", job.id))?;
    println!("{}", state.store.public_url(&key));
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
