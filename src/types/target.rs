//! Addressable destinations
//!
//! A [`Target`] names one place a message can be delivered to, independent
//! of which client ends up delivering it. The set of kinds is closed: every
//! kind is declared once in the `define_targets!` invocation below, which
//! generates the per-kind struct, the tagged [`Target`] enum and the list of
//! discriminants from that single declaration.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::platforms::ClientHandle;
use crate::serialization::{split_discriminant, Source, Tagged};

macro_rules! define_targets {
    ($(
        $(#[$meta:meta])*
        $variant:ident($ty:ident) = $tag:literal {
            $( $(#[$fmeta:meta])* $field:ident : $fty:ty ),* $(,)?
        }
    ),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
            pub struct $ty {
                $( $(#[$fmeta])* pub $field: $fty, )*
            }

            impl From<$ty> for Target {
                fn from(target: $ty) -> Self {
                    Target::$variant(target)
                }
            }
        )*

        /// Any known destination, tagged by `platform_type`
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(tag = "platform_type")]
        pub enum Target {
            $( #[serde(rename = $tag)] $variant($ty), )*
        }

        impl Target {
            /// Discriminants of every known kind, in declaration order
            pub const KINDS: &'static [&'static str] = &[$($tag),*];

            /// Discriminant of this target
            pub fn kind(&self) -> &'static str {
                match self {
                    $( Target::$variant(_) => $tag, )*
                }
            }
        }
    };
}

/// Telegram chats are addressed by numeric id or by `@username`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    Id(i64),
    Username(String),
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        ChatId::Id(id)
    }
}

impl From<&str> for ChatId {
    fn from(name: &str) -> Self {
        ChatId::Username(name.to_string())
    }
}

/// Conversation type of a OneBot v12 destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailType {
    Private,
    Group,
    Channel,
}

define_targets! {
    /// QQ group
    QQGroup(TargetQQGroup) = "QQ Group" { group_id: i64 },
    /// QQ private chat
    QQPrivate(TargetQQPrivate) = "QQ Private" { user_id: i64 },
    /// QQ group addressed by open id, only reachable through the bot that saw it
    QQGroupOpenId(TargetQQGroupOpenId) = "QQ Group OpenID" { bot_id: String, group_openid: String },
    /// QQ private chat addressed by open id
    QQPrivateOpenId(TargetQQPrivateOpenId) = "QQ Private OpenID" { bot_id: String, user_openid: String },
    /// QQ guild sub-channel
    QQGuildChannel(TargetQQGuildChannel) = "QQ Guild Channel" { channel_id: i64 },
    /// QQ guild direct message; needs a session handshake before sending
    QQGuildDirect(TargetQQGuildDirect) = "QQ Guild Direct" { recipient_id: i64, source_guild_id: i64 },
    /// Kaiheila channel
    KaiheilaChannel(TargetKaiheilaChannel) = "Kaiheila Channel" { channel_id: String },
    /// Kaiheila private chat
    KaiheilaPrivate(TargetKaiheilaPrivate) = "Kaiheila Private" { user_id: String },
    /// OneBot v12 destination on a platform without a dedicated kind
    OB12Unknown(TargetOB12Unknown) = "Unknow Onebot 12 Platform" {
        platform: String,
        detail_type: DetailType,
        user_id: Option<String>,
        group_id: Option<String>,
        guild_id: Option<String>,
        channel_id: Option<String>,
    },
    /// Satori destination on a platform without a dedicated kind
    SatoriUnknown(TargetSatoriUnknown) = "Unknown Satori Platform" {
        platform: String,
        user_id: Option<String>,
        guild_id: Option<String>,
        channel_id: Option<String>,
    },
    /// Telegram private chat, group or channel
    TelegramCommon(TargetTelegramCommon) = "Telegram Common" { chat_id: ChatId },
    /// Telegram forum topic
    TelegramForum(TargetTelegramForum) = "Telegram Forum" { chat_id: i64, message_thread_id: i64 },
    /// Feishu private chat
    FeishuPrivate(TargetFeishuPrivate) = "Feishu Private" { open_id: String },
    /// Feishu group
    FeishuGroup(TargetFeishuGroup) = "Feishu Group" { chat_id: String },
    /// DoDo channel, optionally narrowed to one member
    DoDoChannel(TargetDoDoChannel) = "DoDo Channel" { channel_id: String, dodo_source_id: Option<String> },
    /// DoDo private chat inside an island
    DoDoPrivate(TargetDoDoPrivate) = "DoDo Private" { island_source_id: String, dodo_source_id: String },
    /// Discord channel
    DiscordChannel(TargetDiscordChannel) = "Discord Channel" { channel_id: String },
}

impl Tagged for Target {
    const INDEX_KEY: &'static str = "platform_type";

    fn discriminant(&self) -> &'static str {
        self.kind()
    }
}

impl Target {
    /// Decode a target from its flat encoding
    ///
    /// An unknown discriminant is reported as [`Error::UnknownDiscriminant`];
    /// it means the producer and this build disagree on the set of kinds.
    pub fn decode(source: impl Into<Source>) -> Result<Target> {
        let (key, map) = split_discriminant(source, Self::INDEX_KEY)?;
        if !Self::KINDS.contains(&key.as_str()) {
            return Err(Error::UnknownDiscriminant {
                index_key: Self::INDEX_KEY,
                value: key,
            });
        }
        Ok(serde_json::from_value(Value::Object(map))?)
    }

    /// Whether reachability can only be known after a platform handshake
    ///
    /// Such targets are never resolved through the auto-select cache.
    pub fn requires_handshake(&self) -> bool {
        matches!(self, Target::QQGuildDirect(_))
    }

    /// Keyword arguments the live client's platform expects for this target
    pub fn arg_dict(
        &self,
        ctx: &Context,
        client: &ClientHandle,
    ) -> Result<serde_json::Map<String, Value>> {
        ctx.registries().args.convert(self, client.adapter())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(encoded) => f.write_str(&encoded),
            Err(_) => f.write_str(self.kind()),
        }
    }
}
