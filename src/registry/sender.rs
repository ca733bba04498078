//! Per-platform send, aggregate-send and edit functions

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::context::Context;
use crate::error::Result;
use crate::platforms::{ClientHandle, EventHandle};
use crate::registry::{NativeMessage, Receipt};
use crate::types::{Adapter, AggregatedMessage, Message, MessageId, Segment, Target};

/// Everything a platform needs to deliver one message
#[derive(Clone)]
pub struct SendRequest {
    pub client: ClientHandle,
    pub message: Message,
    pub target: Target,
    /// Event being handled, absent for unsolicited sends
    pub event: Option<EventHandle>,
    pub at_sender: bool,
    pub reply: bool,
}

impl SendRequest {
    /// Final content: reply marker, then mention, then the message itself
    ///
    /// The reply marker needs a message id for the event and the mention an
    /// event author; either is skipped when unavailable.
    pub fn assemble(&self, ctx: &Context) -> Message {
        let mut full = Message::new();
        if let Some(event) = &self.event {
            if self.reply {
                if let Some(id) = ctx.registries().message_ids.get(event.as_ref()) {
                    full.append(Segment::reply(&id));
                }
            }
            if self.at_sender {
                if let Some(user_id) = event.user_id() {
                    full.append(Segment::mention(user_id));
                }
            }
        }
        full.extend(self.message.iter().cloned());
        full
    }

    /// Assemble and render for the request's client
    pub async fn build(&self, ctx: &Context) -> Result<NativeMessage> {
        self.assemble(ctx).build(ctx, &self.client).await
    }
}

/// A batch of messages to deliver as one unit
#[derive(Clone)]
pub struct AggregateRequest {
    pub client: ClientHandle,
    pub messages: AggregatedMessage,
    pub target: Target,
    pub event: Option<EventHandle>,
}

/// Replacement content for an already sent message
#[derive(Clone)]
pub struct EditRequest {
    pub client: ClientHandle,
    pub message: Message,
    pub message_id: MessageId,
    pub target: Target,
    pub event: Option<EventHandle>,
    pub at_sender: bool,
    pub reply: bool,
}

impl EditRequest {
    /// Same assembly as a send, applied to the replacement content
    pub async fn build(&self, ctx: &Context) -> Result<NativeMessage> {
        let request = SendRequest {
            client: self.client.clone(),
            message: self.message.clone(),
            target: self.target.clone(),
            event: self.event.clone(),
            at_sender: self.at_sender,
            reply: self.reply,
        };
        request.build(ctx).await
    }
}

pub type Sender = Arc<
    dyn for<'a> Fn(&'a Context, SendRequest) -> BoxFuture<'a, Result<Box<dyn Receipt>>>
        + Send
        + Sync,
>;

/// May return [`Error::FallbackToDefault`](crate::Error::FallbackToDefault)
/// to have each message sent on its own instead
pub type AggregateSender =
    Arc<dyn for<'a> Fn(&'a Context, AggregateRequest) -> BoxFuture<'a, Result<()>> + Send + Sync>;

pub type Editor =
    Arc<dyn for<'a> Fn(&'a Context, EditRequest) -> BoxFuture<'a, Result<()>> + Send + Sync>;

#[derive(Default)]
pub struct SenderRegistry {
    senders: HashMap<Adapter, Sender>,
    aggregate_senders: HashMap<Adapter, AggregateSender>,
    editors: HashMap<Adapter, Editor>,
}

impl SenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, adapter: Adapter, sender: F)
    where
        F: for<'a> Fn(&'a Context, SendRequest) -> BoxFuture<'a, Result<Box<dyn Receipt>>>
            + Send
            + Sync
            + 'static,
    {
        debug!(%adapter, "register sender");
        self.senders.insert(adapter, Arc::new(sender));
    }

    pub fn register_aggregate<F>(&mut self, adapter: Adapter, sender: F)
    where
        F: for<'a> Fn(&'a Context, AggregateRequest) -> BoxFuture<'a, Result<()>>
            + Send
            + Sync
            + 'static,
    {
        debug!(%adapter, "register aggregate sender");
        self.aggregate_senders.insert(adapter, Arc::new(sender));
    }

    pub fn register_editor<F>(&mut self, adapter: Adapter, editor: F)
    where
        F: for<'a> Fn(&'a Context, EditRequest) -> BoxFuture<'a, Result<()>>
            + Send
            + Sync
            + 'static,
    {
        debug!(%adapter, "register editor");
        self.editors.insert(adapter, Arc::new(editor));
    }

    pub fn get(&self, adapter: Adapter) -> Option<Sender> {
        self.senders.get(&adapter).cloned()
    }

    pub fn aggregate(&self, adapter: Adapter) -> Option<AggregateSender> {
        self.aggregate_senders.get(&adapter).cloned()
    }

    pub fn editor(&self, adapter: Adapter) -> Option<Editor> {
        self.editors.get(&adapter).cloned()
    }

    pub fn clear(&mut self) {
        self.senders.clear();
        self.aggregate_senders.clear();
        self.editors.clear();
    }
}
