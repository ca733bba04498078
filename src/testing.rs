//! Mock platform used by the unit tests

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::auto_select::AutoSelect;
use crate::config::Config;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::platforms::{downcast_client, downcast_event, Client, ClientHandle, Event};
use crate::registry::{tagged_value, Builder, Extractor, NativeMessage, Receipt};
use crate::types::{
    kind, Adapter, ConnectionState, MessageId, NativeSegment, Segment, Target, TargetQQGroup,
    TargetQQPrivate,
};

/// Install a fmt subscriber once; `RUST_LOG` controls the output
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct MockClient {
    adapter: Adapter,
    self_id: String,
    connected: AtomicBool,
    calls: Mutex<Vec<String>>,
    sent: Mutex<Vec<(Target, NativeMessage)>>,
}

impl MockClient {
    pub fn new(adapter: Adapter, self_id: &str) -> Self {
        MockClient {
            adapter,
            self_id: self_id.to_string(),
            connected: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn handle(adapter: Adapter, self_id: &str) -> ClientHandle {
        Arc::new(MockClient::new(adapter, self_id))
    }

    pub fn of(client: &ClientHandle) -> &MockClient {
        downcast_client::<MockClient>(client).unwrap()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    pub fn calls(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    fn record_sent(&self, target: Target, message: NativeMessage) {
        self.record("send");
        self.sent.lock().unwrap().push((target, message));
    }
}

impl Client for MockClient {
    fn adapter(&self) -> Adapter {
        self.adapter
    }

    fn self_id(&self) -> &str {
        &self.self_id
    }

    fn connection_state(&self) -> ConnectionState {
        if self.connected.load(Ordering::SeqCst) {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Everything a mock client has sent, in order
pub fn sent_messages(client: &ClientHandle) -> Vec<(Target, NativeMessage)> {
    MockClient::of(client).sent.lock().unwrap().clone()
}

pub struct MockEvent {
    pub event_type: String,
    pub user_id: String,
    pub group_id: Option<i64>,
    pub message_id: Option<MessageId>,
}

impl MockEvent {
    pub fn group(event_type: &str, group_id: i64, user_id: &str) -> Self {
        MockEvent {
            event_type: event_type.to_string(),
            user_id: user_id.to_string(),
            group_id: Some(group_id),
            message_id: Some(ob11_message_id(group_id)),
        }
    }

    pub fn private(event_type: &str, user_id: &str) -> Self {
        MockEvent {
            event_type: event_type.to_string(),
            user_id: user_id.to_string(),
            group_id: None,
            message_id: Some(ob11_message_id(0)),
        }
    }
}

impl Event for MockEvent {
    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn user_id(&self) -> Option<String> {
        Some(self.user_id.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn ob11_message_id(id: i64) -> MessageId {
    let mut data = Map::new();
    data.insert("message_id".into(), json!(id));
    MessageId::new(Adapter::OneBotV11, data)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockReceipt {
    #[serde(rename = "adapter_name")]
    pub adapter: Adapter,
    pub client_id: String,
    pub message_id: i64,
}

#[async_trait]
impl Receipt for MockReceipt {
    fn adapter(&self) -> Adapter {
        self.adapter
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn raw_message_id(&self) -> Result<MessageId> {
        Ok(ob11_message_id(self.message_id))
    }

    fn to_value(&self) -> Result<Value> {
        tagged_value(self.adapter, self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn text_builder() -> Builder {
    Builder::pure_sync(|segment: &Segment| {
        Ok(NativeSegment::new(
            "text",
            json!({"text": segment.as_text().unwrap_or_default()}),
        ))
    })
}

/// Initialized context with a OneBot V11 mock platform, plus text-only
/// Telegram builders and a QQ direct-session handshake
pub fn mock_context() -> Context {
    init_tracing();
    let mut ctx =
        Context::new("test", Config::default()).with_auto_select(AutoSelect::with_seed(0));
    ctx.initialize().unwrap();

    let registries = ctx.registries_mut();
    let builders = &mut registries.builders;
    builders.register(kind::TEXT, Adapter::OneBotV11, text_builder());
    builders.register(
        kind::MENTION,
        Adapter::OneBotV11,
        Builder::pure_sync(|segment: &Segment| {
            Ok(NativeSegment::new("at", json!({"qq": segment.get("user_id")})))
        }),
    );
    builders.register(
        kind::REPLY,
        Adapter::OneBotV11,
        Builder::pure_sync(|segment: &Segment| {
            let id = segment.reply_id()?;
            id.expect(Adapter::OneBotV11)?;
            Ok(NativeSegment::new("reply", json!({"id": id.get_str("message_id")})))
        }),
    );
    builders.register(
        kind::IMAGE,
        Adapter::OneBotV11,
        Builder::pure_sync(|segment: &Segment| {
            Ok(NativeSegment::new("image", json!({"file": segment.get("image")})))
        }),
    );
    builders.register(kind::TEXT, Adapter::Telegram, text_builder());
    builders.register_default_message(Adapter::OneBotV11);
    builders.register_default_message(Adapter::Telegram);
    builders.register_default_message(Adapter::QQ);

    registries.extractors.register(
        "mock.message.group",
        Extractor::event(|event| {
            let event = downcast_event::<MockEvent>(event)?;
            let group_id = event
                .group_id
                .ok_or_else(|| Error::invalid_argument("group event without group id"))?;
            Ok(TargetQQGroup { group_id }.into())
        }),
    );
    registries.extractors.register(
        "mock.message.private",
        Extractor::event(|event| {
            let event = downcast_event::<MockEvent>(event)?;
            let user_id = event.user_id.parse().map_err(Error::invalid_argument)?;
            Ok(TargetQQPrivate { user_id }.into())
        }),
    );
    registries.message_ids.register("mock.message", |event| {
        downcast_event::<MockEvent>(event).ok()?.message_id.clone()
    });

    registries.senders.register(Adapter::OneBotV11, |ctx, request| {
        async move {
            let native = request.build(ctx).await?;
            let mock = MockClient::of(&request.client);
            mock.record_sent(request.target.clone(), native);
            let receipt = MockReceipt {
                adapter: Adapter::OneBotV11,
                client_id: mock.self_id.clone(),
                message_id: mock.calls("send") as i64,
            };
            Ok(Box::new(receipt) as Box<dyn Receipt>)
        }
        .boxed()
    });
    registries.senders.register_editor(Adapter::OneBotV11, |ctx, request| {
        async move {
            request.build(ctx).await?;
            MockClient::of(&request.client).record("edit");
            Ok(())
        }
        .boxed()
    });
    registries.receipts.register::<MockReceipt>(Adapter::OneBotV11);

    registries.list_targets.register(Adapter::OneBotV11, |_client| async {
        Ok(vec![
            TargetQQGroup { group_id: 2233 }.into(),
            TargetQQPrivate { user_id: 1122 }.into(),
        ])
    });
    registries.args.register("QQ Group", Adapter::OneBotV11, |target| {
        let mut args = Map::new();
        if let Target::QQGroup(group) = target {
            args.insert("message_type".into(), json!("group"));
            args.insert("group_id".into(), json!(group.group_id));
        }
        Ok(args)
    });
    registries
        .direct_sessions
        .register("QQ Guild Direct", Adapter::QQ, |client, target| async move {
            MockClient::of(&client).record("open_direct");
            match target {
                Target::QQGuildDirect(direct) => Ok(format!(
                    "dms-{}-{}",
                    direct.recipient_id, direct.source_guild_id
                )),
                other => Err(Error::invalid_argument(other.kind())),
            }
        });

    ctx
}
