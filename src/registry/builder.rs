//! Segment builder tables and native-message constructors

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::platforms::ClientHandle;
use crate::types::{Adapter, NativeSegment, Segment};

type RenderFuture = BoxFuture<'static, Result<NativeSegment>>;

/// Render function for one (segment kind, platform) pair
///
/// The shape is fixed when the builder is registered: pure builders never
/// see the client, client builders get the live handle for follow-up
/// platform calls such as uploads.
#[derive(Clone)]
pub enum Builder {
    Pure(Arc<dyn Fn(Segment) -> RenderFuture + Send + Sync>),
    WithClient(Arc<dyn Fn(Segment, ClientHandle) -> RenderFuture + Send + Sync>),
}

impl Builder {
    /// Async builder that only needs the segment
    pub fn pure<F, Fut>(f: F) -> Self
    where
        F: Fn(Segment) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<NativeSegment>> + Send + 'static,
    {
        Builder::Pure(Arc::new(move |segment| f(segment).boxed()))
    }

    /// Synchronous builder that only needs the segment
    pub fn pure_sync<F>(f: F) -> Self
    where
        F: Fn(&Segment) -> Result<NativeSegment> + Send + Sync + 'static,
    {
        Builder::Pure(Arc::new(move |segment| {
            futures::future::ready(f(&segment)).boxed()
        }))
    }

    /// Async builder that needs the live client
    pub fn with_client<F, Fut>(f: F) -> Self
    where
        F: Fn(Segment, ClientHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<NativeSegment>> + Send + 'static,
    {
        Builder::WithClient(Arc::new(move |segment, client| f(segment, client).boxed()))
    }

    pub(crate) fn invoke(&self, segment: Segment, client: ClientHandle) -> RenderFuture {
        match self {
            Builder::Pure(f) => f(segment),
            Builder::WithClient(f) => f(segment, client),
        }
    }
}

/// A platform's assembled outgoing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeMessage {
    pub adapter: Adapter,
    pub segments: Vec<NativeSegment>,
}

impl NativeMessage {
    pub fn new(adapter: Adapter, segments: Vec<NativeSegment>) -> Self {
        NativeMessage { adapter, segments }
    }
}

/// Assembles rendered segments into one platform message
pub type MessageConstructor = Arc<dyn Fn(Vec<NativeSegment>) -> Result<NativeMessage> + Send + Sync>;

/// (segment kind, platform) → builder, and platform → message constructor
#[derive(Default)]
pub struct BuilderRegistry {
    builders: HashMap<(String, Adapter), Builder>,
    messages: HashMap<Adapter, MessageConstructor>,
}

impl BuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the builder for `kind` on `adapter`, replacing any previous one
    pub fn register(&mut self, kind: impl Into<String>, adapter: Adapter, builder: Builder) {
        let kind = kind.into();
        debug!(%adapter, kind = %kind, "register segment builder");
        self.builders.insert((kind, adapter), builder);
    }

    pub fn get(&self, kind: &str, adapter: Adapter) -> Option<Builder> {
        self.builders.get(&(kind.to_string(), adapter)).cloned()
    }

    /// Register how rendered segments become one message on `adapter`
    pub fn register_message<F>(&mut self, adapter: Adapter, constructor: F)
    where
        F: Fn(Vec<NativeSegment>) -> Result<NativeMessage> + Send + Sync + 'static,
    {
        debug!(%adapter, "register native message constructor");
        self.messages.insert(adapter, Arc::new(constructor));
    }

    /// Register the plain "list of segments" constructor for `adapter`
    pub fn register_default_message(&mut self, adapter: Adapter) {
        self.register_message(adapter, move |segments| {
            Ok(NativeMessage::new(adapter, segments))
        });
    }

    pub fn message_constructor(&self, adapter: Adapter) -> Option<MessageConstructor> {
        self.messages.get(&adapter).cloned()
    }

    pub fn clear(&mut self) {
        self.builders.clear();
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockClient;
    use serde_json::json;

    #[tokio::test]
    async fn test_pure_and_client_shapes() {
        let mut registry = BuilderRegistry::new();
        registry.register(
            "text",
            Adapter::Telegram,
            Builder::pure_sync(|s: &Segment| {
                Ok(NativeSegment::new("text", json!({"text": s.as_text()})))
            }),
        );
        registry.register(
            "mention",
            Adapter::Telegram,
            Builder::with_client(|s: Segment, client: ClientHandle| async move {
                Ok(NativeSegment::new(
                    "mention",
                    json!({"user": s.get("user_id"), "by": client.self_id()}),
                ))
            }),
        );

        let client = MockClient::handle(Adapter::Telegram, "bot");
        let text = registry.get("text", Adapter::Telegram).unwrap();
        let native = text.invoke(Segment::text("x"), client.clone()).await.unwrap();
        assert_eq!(native.data, json!({"text": "x"}));

        let mention = registry.get("mention", Adapter::Telegram).unwrap();
        let native = mention
            .invoke(Segment::mention("u"), client)
            .await
            .unwrap();
        assert_eq!(native.data, json!({"user": "u", "by": "bot"}));

        assert!(registry.get("text", Adapter::QQ).is_none());
    }

    #[test]
    fn test_default_message_constructor() {
        let mut registry = BuilderRegistry::new();
        registry.register_default_message(Adapter::QQ);
        let ctor = registry.message_constructor(Adapter::QQ).unwrap();
        let msg = ctor(vec![NativeSegment::new("text", json!({"text": "a"}))]).unwrap();
        assert_eq!(msg.adapter, Adapter::QQ);
        assert_eq!(msg.segments.len(), 1);
        assert!(registry.message_constructor(Adapter::Kritor).is_none());
    }
}
