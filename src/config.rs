//! Context configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;
use crate::serialization::Source;

/// Options read once when a [`Context`](crate::Context) is created
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Enable automatic client selection when the context is initialized
    pub auto_select_bot: bool,
    /// Lifetime of cached direct-message sessions in seconds; `None` keeps
    /// them until the client disconnects
    pub direct_session_ttl_secs: Option<u64>,
    /// Message id platform senders may attach to proactive sends on
    /// platforms that only accept replies
    pub magic_message_id: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a JSON string or value; missing keys keep their defaults
    pub fn from_json(source: impl Into<Source>) -> Result<Self> {
        let map = source.into().into_object()?;
        Ok(serde_json::from_value(serde_json::Value::Object(map))?)
    }

    pub fn with_auto_select_bot(mut self, enabled: bool) -> Self {
        self.auto_select_bot = enabled;
        self
    }

    pub fn with_direct_session_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.direct_session_ttl_secs = ttl.map(|ttl| ttl.as_secs());
        self
    }

    pub fn with_magic_message_id(mut self, id: impl Into<String>) -> Self {
        self.magic_message_id = Some(id.into());
        self
    }

    pub fn direct_session_ttl(&self) -> Option<Duration> {
        self.direct_session_ttl_secs.map(Duration::from_secs)
    }
}
