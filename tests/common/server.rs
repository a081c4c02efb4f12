//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test servers.
//! Each test gets an isolated server with its own catalog and user store.

use super::fixtures::{create_test_catalog, create_test_store_with_users, test_hashing_params};
use jukebox_server::catalog::load_catalog;
use jukebox_server::persistence::JsonUserStore;
use jukebox_server::server::{serve, ServerConfig, ServerState};
use jukebox_server::user::{AttemptTracker, AttemptTrackerConfig, AuthManager};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Knobs for servers that need non-default limits.
#[derive(Clone)]
pub struct TestServerOptions {
    pub max_connections: usize,
    pub idle_timeout: Option<Duration>,
    pub attempts: AttemptTrackerConfig,
}

impl Default for TestServerOptions {
    fn default() -> Self {
        Self {
            max_connections: 16,
            idle_timeout: None,
            attempts: AttemptTrackerConfig::default(),
        }
    }
}

/// Test server instance with isolated catalog and user store
///
/// When dropped, the server stops accepting connections and temp resources
/// are cleaned up.
pub struct TestServer {
    /// Address the server is listening on
    pub addr: SocketAddr,

    /// User store for direct access in tests
    pub user_store: Arc<JsonUserStore>,

    /// Path of the JSON store file
    pub store_path: PathBuf,

    // Private fields - keep resources alive until drop
    _temp_catalog_dir: TempDir,
    _temp_store_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if fixture creation or port binding fails.
    pub async fn spawn() -> Self {
        Self::spawn_with(TestServerOptions::default()).await
    }

    pub async fn spawn_with(options: TestServerOptions) -> Self {
        let (temp_catalog_dir, catalog_path) =
            create_test_catalog().expect("Failed to create test catalog");
        let (temp_store_dir, store_path) =
            create_test_store_with_users().expect("Failed to create test store");

        let catalog = Arc::new(load_catalog(&catalog_path).expect("Failed to load catalog"));
        let user_store =
            Arc::new(JsonUserStore::open(&store_path).expect("Failed to open user store"));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().expect("Failed to get local address");

        let config = ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: addr.port(),
            max_connections: options.max_connections,
            idle_timeout: options.idle_timeout,
        };
        let auth_manager = AuthManager::new(
            user_store.clone(),
            AttemptTracker::new(options.attempts),
            test_hashing_params(),
            6,
        );
        let state = ServerState::new(config, catalog, user_store.clone(), auth_manager);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            serve(listener, state, async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed");
        });

        Self {
            addr,
            user_store,
            store_path,
            _temp_catalog_dir: temp_catalog_dir,
            _temp_store_dir: temp_store_dir,
            _shutdown_tx: Some(shutdown_tx),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
