use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Upper bound on concurrently served sessions.
    pub max_connections: usize,
    /// Sessions silent for longer than this are closed. `None` disables it.
    pub idle_timeout: Option<Duration>,
}

impl ServerConfig {
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: "0.0.0.0".to_string(),
            port: 5555,
            max_connections: 64,
            idle_timeout: None,
        }
    }
}
