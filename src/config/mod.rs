mod file_config;

pub use file_config::{AuthFileConfig, FileConfig, ServerFileConfig, StorageFileConfig};

use crate::server::ServerConfig;
use crate::user::{AttemptTrackerConfig, HashingParams, DEFAULT_MIN_PASSWORD_LEN};
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be overridden by the TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub store_path: PathBuf,
    pub catalog_path: Option<PathBuf>,
    pub bind_address: String,
    pub port: u16,
    pub max_connections: usize,
    pub idle_timeout_sec: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        let server = ServerConfig::default();
        Self {
            store_path: PathBuf::from("users.json"),
            catalog_path: None,
            bind_address: server.bind_address,
            port: server.port,
            max_connections: server.max_connections,
            idle_timeout_sec: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub attempts: AttemptTrackerConfig,
    pub hashing: HashingParams,
    pub min_password_len: usize,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            attempts: AttemptTrackerConfig::default(),
            hashing: HashingParams::default(),
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_path: PathBuf,
    pub catalog_path: Option<PathBuf>,
    pub server: ServerConfig,
    pub auth: AuthSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();
        let server_file = file.server.unwrap_or_default();
        let auth_file = file.auth.unwrap_or_default();
        let storage_file = file.storage.unwrap_or_default();

        let store_path = storage_file
            .store_path
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.store_path.clone());
        if store_path.is_dir() {
            bail!("User store path is a directory: {:?}", store_path);
        }

        let catalog_path = storage_file
            .catalog_path
            .map(PathBuf::from)
            .or_else(|| cli.catalog_path.clone());
        if let Some(path) = &catalog_path {
            if !path.exists() {
                bail!("Catalog path does not exist: {:?}", path);
            }
        }

        let max_connections = server_file.max_connections.unwrap_or(cli.max_connections);
        if max_connections == 0 {
            bail!("max_connections must be at least 1");
        }
        let idle_timeout_sec = server_file.idle_timeout_sec.unwrap_or(cli.idle_timeout_sec);
        let server = ServerConfig {
            bind_address: server_file
                .bind_address
                .unwrap_or_else(|| cli.bind_address.clone()),
            port: server_file.port.unwrap_or(cli.port),
            max_connections,
            idle_timeout: if idle_timeout_sec == 0 {
                None
            } else {
                Some(Duration::from_secs(idle_timeout_sec))
            },
        };

        let auth = Self::resolve_auth(auth_file)?;

        Ok(Self {
            store_path,
            catalog_path,
            server,
            auth,
        })
    }

    fn resolve_auth(file: AuthFileConfig) -> Result<AuthSettings> {
        let defaults = AuthSettings::default();

        let max_failures = file
            .max_failed_attempts
            .unwrap_or(defaults.attempts.max_failures);
        if max_failures == 0 {
            bail!("max_failed_attempts must be at least 1");
        }
        let attempts = AttemptTrackerConfig {
            max_failures,
            reset_window: file
                .attempt_window_sec
                .map(Duration::from_secs)
                .unwrap_or(defaults.attempts.reset_window),
            lockout_duration: file
                .lockout_sec
                .map(Duration::from_secs)
                .unwrap_or(defaults.attempts.lockout_duration),
        };

        let hashing = HashingParams {
            memory_kib: file.argon2_memory_kib.unwrap_or(defaults.hashing.memory_kib),
            iterations: file.argon2_iterations.unwrap_or(defaults.hashing.iterations),
            parallelism: file
                .argon2_parallelism
                .unwrap_or(defaults.hashing.parallelism),
        };
        if let Err(err) = argon2::Params::new(
            hashing.memory_kib,
            hashing.iterations,
            hashing.parallelism,
            None,
        ) {
            bail!("Invalid argon2 parameters: {}", err);
        }

        let min_password_len = file.min_password_len.unwrap_or(defaults.min_password_len);
        if min_password_len == 0 {
            bail!("min_password_len must be at least 1");
        }

        Ok(AuthSettings {
            attempts,
            hashing,
            min_password_len,
        })
    }
}
