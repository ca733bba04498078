//! Batches of independent messages

use std::convert::Infallible;
use tracing::debug;

use crate::context::Context;
use crate::error::{ControlFlow, Error, Result};
use crate::override_chain::OverrideChain;
use crate::platforms::{ClientHandle, EventHandle};
use crate::registry::AggregateRequest;
use crate::types::{Message, SendOptions, Target};

/// Messages delivered together, e.g. as a forwarded bundle
///
/// Platforms with a native bundle format register an aggregate sender;
/// everywhere else each message is sent on its own, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedMessage {
    messages: Vec<Message>,
}

impl AggregatedMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message; a bare segment or string becomes a one-segment message
    pub fn push(&mut self, message: impl Into<Message>) -> &mut Self {
        self.messages.push(message.into());
        self
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Send to the event being handled by the current task
    pub async fn send(&self, ctx: &Context) -> Result<()> {
        let scope = Context::current().ok_or(Error::NoEventContext)?;
        let target = ctx.extract_target(scope.event.as_ref(), Some(&scope.client))?;
        self.dispatch(ctx, scope.client, target, Some(scope.event))
            .await
    }

    /// Send to `target`, picking a live client when none is given
    pub async fn send_to(
        &self,
        ctx: &Context,
        target: &Target,
        client: Option<ClientHandle>,
    ) -> Result<()> {
        let client = match client {
            Some(client) => client,
            None => ctx.resolve_client(target).await?,
        };
        self.dispatch(ctx, client, target.clone(), None).await
    }

    async fn dispatch(
        &self,
        ctx: &Context,
        client: ClientHandle,
        target: Target,
        event: Option<EventHandle>,
    ) -> Result<()> {
        let adapter = client.adapter();
        let custom = ctx.registries().senders.aggregate(adapter).map(|sender| {
            let request = AggregateRequest {
                client: client.clone(),
                messages: self.clone(),
                target: target.clone(),
                event: event.clone(),
            };
            move || sender(ctx, request)
        });

        let handled = OverrideChain::new()
            .push_opt("aggregate sender", custom)
            .run()
            .await?;
        if handled.is_some() {
            return Ok(());
        }

        debug!(%adapter, messages = self.len(), "sending aggregated messages one by one");
        for message in &self.messages {
            message
                .dispatch(
                    ctx,
                    client.clone(),
                    target.clone(),
                    event.clone(),
                    SendOptions::default(),
                )
                .await?;
        }
        Ok(())
    }

    pub async fn finish(&self, ctx: &Context) -> Result<Infallible> {
        self.send(ctx).await?;
        Err(Error::Control(ControlFlow::Finished))
    }

    pub async fn pause(&self, ctx: &Context) -> Result<Infallible> {
        self.send(ctx).await?;
        Err(Error::Control(ControlFlow::Paused))
    }

    pub async fn reject(&self, ctx: &Context) -> Result<Infallible> {
        self.send(ctx).await?;
        Err(Error::Control(ControlFlow::Rejected))
    }

    pub async fn reject_arg(&self, ctx: &Context, key: impl Into<String>) -> Result<Infallible> {
        self.send(ctx).await?;
        Err(Error::Control(ControlFlow::RejectArg(key.into())))
    }

    pub async fn reject_receive(
        &self,
        ctx: &Context,
        key: impl Into<String>,
    ) -> Result<Infallible> {
        self.send(ctx).await?;
        Err(Error::Control(ControlFlow::RejectReceive(key.into())))
    }
}

impl<M: Into<Message>> FromIterator<M> for AggregatedMessage {
    fn from_iter<I: IntoIterator<Item = M>>(iter: I) -> Self {
        let mut aggregated = AggregatedMessage::new();
        for message in iter {
            aggregated.push(message);
        }
        aggregated
    }
}

impl From<Vec<Message>> for AggregatedMessage {
    fn from(messages: Vec<Message>) -> Self {
        AggregatedMessage { messages }
    }
}

impl IntoIterator for AggregatedMessage {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}
