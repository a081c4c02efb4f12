pub mod config;
pub mod protocol;
#[allow(clippy::module_inception)]
pub mod server;
pub mod session;
pub mod state;

pub use config::ServerConfig;
pub use protocol::{Command, PlayerCommand, ProtocolError, Response, END};
pub use server::{run_server, serve};
pub use session::{run_session, Flow, SessionHandler};
pub use state::ServerState;
