//! # WebSocket Gateway
//!
//! Serves console sessions over WebSocket. Every text frame is one command
//! line and every reply goes back as text frames. Each connection owns its
//! own [`Session`](crate::session::Session); the [`ConnectionManager`]
//! tracks live connections so shutdown can say goodbye to each of them.

mod connection;
mod server;

pub use connection::{ConnectionInfo, ConnectionManager};
pub use server::{GatewayState, SharedGateway, router as gateway_router, run as run_gateway};

use serde::{Deserialize, Serialize};

/// Configuration for the WebSocket gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Time given to goodbye frames to reach the clients on shutdown.
    pub goodbye_grace_ms: u64,
    /// Output chunks queued per connection before further output is dropped.
    pub outbound_queue: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9003,
            max_connections: 64,
            goodbye_grace_ms: 500,
            outbound_queue: 1024,
        }
    }
}

impl GatewayConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_config_default() {
        let config = GatewayConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9003);
        assert_eq!(config.max_connections, 64);
        assert_eq!(config.goodbye_grace_ms, 500);
        assert_eq!(config.outbound_queue, 1024);
        assert_eq!(config.bind_address(), "0.0.0.0:9003");
    }

    #[test]
    fn test_gateway_config_serialization() {
        let config = GatewayConfig {
            host: "127.0.0.1".into(),
            port: 9090,
            max_connections: 2,
            goodbye_grace_ms: 0,
            outbound_queue: 16,
        };
        let json = serde_json::to_string(&config).unwrap();
        let restored: GatewayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);

        let partial: GatewayConfig = serde_json::from_str(r#"{"port": 9100}"#).unwrap();
        assert_eq!(partial.port, 9100);
        assert_eq!(partial.max_connections, 64);
    }
}
