//! WebSocket connection management.

use crate::output::OutputFormatter;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// A connected WebSocket client.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub connection_id: Uuid,
    pub peer: String,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// The session's formatter, used to say goodbye on shutdown.
    pub output: Arc<OutputFormatter>,
}

/// Registry of active WebSocket connections.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    connections: HashMap<Uuid, ConnectionInfo>,
    max_connections: usize,
}

impl ConnectionManager {
    /// Create a new connection manager with the given capacity limit.
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: HashMap::new(),
            max_connections,
        }
    }

    /// Register a new connection. Returns `None` if the limit is reached.
    pub fn add_connection(&mut self, peer: &str, output: Arc<OutputFormatter>) -> Option<Uuid> {
        if self.connections.len() >= self.max_connections {
            return None;
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        self.connections.insert(
            id,
            ConnectionInfo {
                connection_id: id,
                peer: peer.to_string(),
                connected_at: now,
                last_activity: now,
                output,
            },
        );
        Some(id)
    }

    pub fn remove_connection(&mut self, id: &Uuid) -> bool {
        self.connections.remove(id).is_some()
    }

    /// Update the last activity timestamp for a connection.
    pub fn touch(&mut self, id: &Uuid) {
        if let Some(conn) = self.connections.get_mut(id) {
            conn.last_activity = Utc::now();
        }
    }

    #[cfg(test)]
    fn get(&self, id: &Uuid) -> Option<&ConnectionInfo> {
        self.connections.get(id)
    }

    pub fn active_count(&self) -> usize {
        self.connections.len()
    }

    /// Formatters of every live connection, taken so goodbyes can be written
    /// without holding the registry lock.
    pub fn snapshot(&self) -> Vec<Arc<OutputFormatter>> {
        self.connections
            .values()
            .map(|c| Arc::clone(&c.output))
            .collect()
    }
}
