use super::session::run_session;
use super::state::ServerState;
use anyhow::{Context, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

async fn accept_loop(listener: TcpListener, state: ServerState, permits: Arc<Semaphore>) {
    loop {
        // Wait for a free slot before taking the next connection off the backlog.
        let permit = match permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                error!("Connection pool closed, no longer accepting connections");
                return;
            }
        };
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!("Failed to accept connection: {}", err);
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };
        info!("Accepted connection from {}", addr);
        let session_state = state.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let peer = addr.to_string();
            match run_session(stream, session_state, peer).await {
                Ok(()) => info!("Connection from {} closed", addr),
                Err(err) => warn!("Connection from {} dropped: {}", addr, err),
            }
        });
    }
}

/// Serves connections from `listener` until `shutdown` completes.
///
/// Accepting runs in its own task; each session runs in a task of its own
/// holding one of `max_connections` permits.
pub async fn serve<F>(listener: TcpListener, state: ServerState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    let max_connections = state.config.max_connections.max(1);
    debug!("Serving with up to {} concurrent sessions", max_connections);
    let permits = Arc::new(Semaphore::new(max_connections));
    let mut accept_task = tokio::spawn(accept_loop(listener, state, permits));

    tokio::select! {
        _ = shutdown => {
            info!("Shutdown requested, no longer accepting connections");
            accept_task.abort();
        }
        joined = &mut accept_task => {
            joined.context("Accept loop panicked")?;
        }
    }
    Ok(())
}

pub async fn bind(state: &ServerState) -> Result<(TcpListener, SocketAddr)> {
    let address = state.config.listen_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Could not bind to {}", address))?;
    let local = listener.local_addr()?;
    Ok((listener, local))
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn run_server(state: ServerState) -> Result<()> {
    let (listener, local) = bind(&state).await?;
    info!("Ready to serve at {}!", local);
    serve(listener, state, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Could not listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    })
    .await
}
