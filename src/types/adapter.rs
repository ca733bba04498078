//! Platform tags
//!
//! Every client handle reports exactly one [`Adapter`]; all per-platform
//! registries are keyed by it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat platform integration a client belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Adapter {
    #[serde(rename = "OneBot V11")]
    OneBotV11,
    #[serde(rename = "OneBot V12")]
    OneBotV12,
    #[serde(rename = "Kaiheila")]
    Kaiheila,
    #[serde(rename = "Telegram")]
    Telegram,
    #[serde(rename = "Feishu")]
    Feishu,
    #[serde(rename = "RedProtocol")]
    Red,
    #[serde(rename = "DoDo")]
    DoDo,
    #[serde(rename = "QQ")]
    QQ,
    #[serde(rename = "Satori")]
    Satori,
    #[serde(rename = "Discord")]
    Discord,
    #[serde(rename = "Kritor")]
    Kritor,
}

impl Adapter {
    /// Wire name of the platform tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Adapter::OneBotV11 => "OneBot V11",
            Adapter::OneBotV12 => "OneBot V12",
            Adapter::Kaiheila => "Kaiheila",
            Adapter::Telegram => "Telegram",
            Adapter::Feishu => "Feishu",
            Adapter::Red => "RedProtocol",
            Adapter::DoDo => "DoDo",
            Adapter::QQ => "QQ",
            Adapter::Satori => "Satori",
            Adapter::Discord => "Discord",
            Adapter::Kritor => "Kritor",
        }
    }
}

impl fmt::Display for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
