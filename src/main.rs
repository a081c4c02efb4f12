use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jukebox_server::catalog::{load_catalog, Catalog};
use jukebox_server::config::{AppConfig, CliConfig, FileConfig};
use jukebox_server::persistence::JsonUserStore;
use jukebox_server::server::{run_server, ServerState};
use jukebox_server::user::{AttemptTracker, AuthManager};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the JSON file holding the user records.
    #[clap(long, value_parser = parse_path, default_value = "users.json")]
    pub store: PathBuf,

    /// Catalog source: a JSON file with song records or a media directory.
    #[clap(long, value_parser = parse_path)]
    pub catalog: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 5555)]
    pub port: u16,

    /// The address to bind.
    #[clap(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// Maximum number of concurrently served connections.
    #[clap(long, default_value_t = 64)]
    pub max_connections: usize,

    /// Close sessions idle for this many seconds. 0 disables it.
    #[clap(long, default_value_t = 0)]
    pub idle_timeout_sec: u64,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            store_path: self.store.clone(),
            catalog_path: self.catalog.clone(),
            bind_address: self.bind.clone(),
            port: self.port,
            max_connections: self.max_connections,
            idle_timeout_sec: self.idle_timeout_sec,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to install the tracing subscriber")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    let catalog = match &config.catalog_path {
        Some(path) => {
            info!("Loading catalog from {:?}...", path);
            load_catalog(path)?
        }
        None => {
            warn!("No catalog configured, serving an empty catalog");
            Catalog::default()
        }
    };

    info!("Opening user store at {:?}...", config.store_path);
    let user_store = Arc::new(
        JsonUserStore::open(&config.store_path)
            .with_context(|| format!("Could not open user store {:?}", config.store_path))?,
    );
    info!("User store holds {} users", user_store.load_all()?.len());

    let auth_manager = AuthManager::new(
        user_store.clone(),
        AttemptTracker::new(config.auth.attempts.clone()),
        config.auth.hashing,
        config.auth.min_password_len,
    );
    let state = ServerState::new(config.server.clone(), Arc::new(catalog), user_store, auth_manager);

    run_server(state).await
}
