//! Connection state and information types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Adapter;

/// Information about a client known to the context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Platform the client speaks
    pub adapter: Adapter,
    /// Account id of the client
    pub self_id: String,
    /// When the connection was reported
    pub connected_at: DateTime<Utc>,
    /// Current connection state
    pub state: ConnectionState,
    /// Number of targets the client reported reachable on its last refresh
    pub reachable_targets: Option<usize>,
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum ConnectionState {
    /// Currently connecting/authenticating
    Connecting,
    /// Successfully connected and authenticated
    Connected,
    /// Connection is being closed
    Disconnecting,
    /// Not connected
    #[default]
    Disconnected,
}

impl ConnectionInfo {
    /// Create a new connection info
    pub fn new(adapter: Adapter, self_id: impl Into<String>) -> Self {
        ConnectionInfo {
            adapter,
            self_id: self_id.into(),
            connected_at: Utc::now(),
            state: ConnectionState::Connected,
            reachable_targets: None,
        }
    }

    /// Set connection state
    pub fn with_state(mut self, state: ConnectionState) -> Self {
        self.state = state;
        self
    }

    /// Check if connection is active (connected state)
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_info_creation() {
        let info = ConnectionInfo::new(Adapter::Telegram, "bot-1");
        assert_eq!(info.adapter, Adapter::Telegram);
        assert_eq!(info.self_id, "bot-1");
        assert_eq!(info.state, ConnectionState::Connected);
        assert!(info.is_connected());
        assert!(info.reachable_targets.is_none());
    }

    #[test]
    fn test_connection_states() {
        let info = ConnectionInfo::new(Adapter::QQ, "1").with_state(ConnectionState::Disconnecting);
        assert!(!info.is_connected());
    }
}
