//! Jukebox Server Library
//!
//! Multi-user audio catalog server speaking a line protocol over TCP. The
//! modules are exposed for the binaries and the integration tests.

pub mod catalog;
pub mod config;
pub mod persistence;
pub mod playback;
pub mod server;
pub mod user;

pub use catalog::{load_catalog, Catalog, Song};
pub use persistence::JsonUserStore;
pub use server::{run_server, ServerConfig, ServerState};
