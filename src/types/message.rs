//! Ordered, platform-neutral message content

use futures::future::try_join_all;
use std::convert::Infallible;
use std::fmt;
use std::ops::{Add, AddAssign, Bound, Index, Range, RangeBounds};
use std::slice::SliceIndex;
use tracing::debug;

use crate::context::Context;
use crate::error::{ControlFlow, Error, Result};
use crate::platforms::{ClientHandle, EventHandle};
use crate::registry::{EditRequest, NativeMessage, Receipt, SendRequest};
use crate::types::{MessageId, Segment, Target};

/// Options of an in-context send or edit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Mention the author of the event being handled
    pub at_sender: bool,
    /// Mark the message as a reply to the event being handled
    pub reply: bool,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_at_sender(mut self, at_sender: bool) -> Self {
        self.at_sender = at_sender;
        self
    }

    pub fn with_reply(mut self, reply: bool) -> Self {
        self.reply = reply;
        self
    }
}

/// One deliverable message: an ordered list of segments
///
/// Order and duplicates are significant. Bare strings become text segments
/// wherever a segment is accepted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    segments: Vec<Segment>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one segment; every other way of adding content ends up here
    pub fn append(&mut self, segment: impl Into<Segment>) -> &mut Self {
        self.segments.push(segment.into());
        self
    }

    /// Append every item in order
    pub fn extend<I>(&mut self, items: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Segment>,
    {
        for item in items {
            self.append(item);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    /// Copy of a range of segments
    ///
    /// Bounds past the end are clamped, so an out-of-range slice is empty
    /// rather than a panic.
    pub fn slice<R: RangeBounds<usize>>(&self, range: R) -> Message {
        self.segments[clamp(&range, self.len())].iter().cloned().collect()
    }

    /// Segments of one kind, in order
    pub fn of_kind(&self, kind: &str) -> Message {
        self.segments
            .iter()
            .filter(|segment| segment.is_kind(kind))
            .cloned()
            .collect()
    }

    /// The `n`th segment of one kind
    pub fn nth_of_kind(&self, kind: &str, n: usize) -> Option<&Segment> {
        self.segments
            .iter()
            .filter(|segment| segment.is_kind(kind))
            .nth(n)
    }

    /// A range of the segments of one kind, clamped like [`Message::slice`]
    pub fn slice_of_kind<R: RangeBounds<usize>>(&self, kind: &str, range: R) -> Message {
        self.of_kind(kind).slice(range)
    }

    /// At most the first `count` segments of one kind
    pub fn get(&self, kind: &str, count: usize) -> Message {
        self.segments
            .iter()
            .filter(|segment| segment.is_kind(kind))
            .take(count)
            .cloned()
            .collect()
    }

    /// Copy keeping only the given kinds
    pub fn include(&self, kinds: &[&str]) -> Message {
        self.segments
            .iter()
            .filter(|segment| kinds.contains(&segment.kind()))
            .cloned()
            .collect()
    }

    /// Copy dropping the given kinds
    pub fn exclude(&self, kinds: &[&str]) -> Message {
        self.segments
            .iter()
            .filter(|segment| !kinds.contains(&segment.kind()))
            .cloned()
            .collect()
    }

    /// Whether every segment is of `kind`
    pub fn only(&self, kind: &str) -> bool {
        self.segments.iter().all(|segment| segment.is_kind(kind))
    }

    /// Whether every segment equals `segment`
    pub fn only_segment(&self, segment: &Segment) -> bool {
        self.segments.iter().all(|s| s == segment)
    }

    /// Number of segments of `kind`
    pub fn count(&self, kind: &str) -> usize {
        self.segments
            .iter()
            .filter(|segment| segment.is_kind(kind))
            .count()
    }

    /// Number of segments equal to `segment`
    pub fn count_segment(&self, segment: &Segment) -> usize {
        self.segments.iter().filter(|s| *s == segment).count()
    }

    /// Whether any segment is of `kind`
    pub fn has(&self, kind: &str) -> bool {
        self.segments.iter().any(|segment| segment.is_kind(kind))
    }

    /// Position of the first segment of `kind`
    pub fn index(&self, kind: &str) -> Option<usize> {
        self.segments.iter().position(|segment| segment.is_kind(kind))
    }

    /// Position of the first segment equal to `segment`
    pub fn index_of(&self, segment: &Segment) -> Option<usize> {
        self.segments.iter().position(|s| s == segment)
    }

    pub fn contains(&self, segment: &Segment) -> bool {
        self.segments.contains(segment)
    }

    /// Text of all text segments, concatenated
    pub fn plain_text(&self) -> String {
        self.segments
            .iter()
            .filter_map(Segment::as_text)
            .collect()
    }

    /// Concatenate `items` with a copy of this message between each pair
    pub fn join<I>(&self, items: I) -> Message
    where
        I: IntoIterator,
        I::Item: Into<Message>,
    {
        let mut joined = Message::new();
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                joined.extend(self.iter().cloned());
            }
            joined.extend(item.into());
        }
        joined
    }

    /// Render every segment for `client` and assemble the native message
    ///
    /// Segments are built concurrently; the result keeps their order.
    pub async fn build(&self, ctx: &Context, client: &ClientHandle) -> Result<NativeMessage> {
        let adapter = client.adapter();
        let constructor = ctx
            .registries()
            .builders
            .message_constructor(adapter)
            .ok_or(Error::AdapterNotInstalled { adapter })?;
        let natives = try_join_all(self.segments.iter().map(|segment| segment.build(ctx, client)))
            .await?;
        constructor(natives)
    }

    /// Reply to the event being handled by the current task
    pub async fn send(&self, ctx: &Context, options: SendOptions) -> Result<Box<dyn Receipt>> {
        let scope = Context::current().ok_or(Error::NoEventContext)?;
        let target = ctx.extract_target(scope.event.as_ref(), Some(&scope.client))?;
        self.dispatch(ctx, scope.client, target, Some(scope.event), options)
            .await
    }

    /// Send to `target`, picking a live client when none is given
    pub async fn send_to(
        &self,
        ctx: &Context,
        target: &Target,
        client: Option<ClientHandle>,
    ) -> Result<Box<dyn Receipt>> {
        let client = match client {
            Some(client) => client,
            None => ctx.resolve_client(target).await?,
        };
        self.dispatch(ctx, client, target.clone(), None, SendOptions::default())
            .await
    }

    pub(crate) async fn dispatch(
        &self,
        ctx: &Context,
        client: ClientHandle,
        target: Target,
        event: Option<EventHandle>,
        options: SendOptions,
    ) -> Result<Box<dyn Receipt>> {
        let adapter = client.adapter();
        let sender = ctx
            .registries()
            .senders
            .get(adapter)
            .ok_or(Error::SenderNotRegistered { adapter })?;
        debug!(%adapter, to = %target, segments = self.len(), "sending message");
        let request = SendRequest {
            client,
            message: self.clone(),
            target,
            event,
            at_sender: options.at_sender,
            reply: options.reply,
        };
        sender(ctx, request).await
    }

    /// Replace a message sent while handling the current event
    pub async fn edit(
        &self,
        ctx: &Context,
        message_id: &MessageId,
        options: SendOptions,
    ) -> Result<()> {
        let scope = Context::current().ok_or(Error::NoEventContext)?;
        let target = ctx.extract_target(scope.event.as_ref(), Some(&scope.client))?;
        self.dispatch_edit(ctx, scope.client, message_id, target, Some(scope.event), options)
            .await
    }

    /// Replace a message previously sent to `target`
    pub async fn edit_to(
        &self,
        ctx: &Context,
        message_id: &MessageId,
        target: &Target,
        client: Option<ClientHandle>,
    ) -> Result<()> {
        let client = match client {
            Some(client) => client,
            None => ctx.resolve_client(target).await?,
        };
        self.dispatch_edit(
            ctx,
            client,
            message_id,
            target.clone(),
            None,
            SendOptions::default(),
        )
        .await
    }

    async fn dispatch_edit(
        &self,
        ctx: &Context,
        client: ClientHandle,
        message_id: &MessageId,
        target: Target,
        event: Option<EventHandle>,
        options: SendOptions,
    ) -> Result<()> {
        let adapter = client.adapter();
        let editor = ctx.registries().senders.editor(adapter).ok_or_else(|| {
            Error::unsupported(format!("editing is not supported by adapter \"{adapter}\""))
        })?;
        message_id.expect(adapter)?;
        let request = EditRequest {
            client,
            message: self.clone(),
            message_id: message_id.clone(),
            target,
            event,
            at_sender: options.at_sender,
            reply: options.reply,
        };
        editor(ctx, request).await
    }

    /// Send, then end the dialogue
    pub async fn finish(&self, ctx: &Context, options: SendOptions) -> Result<Infallible> {
        self.send(ctx, options).await?;
        Err(Error::Control(ControlFlow::Finished))
    }

    /// Send, then wait for the next event of the session
    pub async fn pause(&self, ctx: &Context, options: SendOptions) -> Result<Infallible> {
        self.send(ctx, options).await?;
        Err(Error::Control(ControlFlow::Paused))
    }

    /// Send, then discard the last input and wait for a new one
    pub async fn reject(&self, ctx: &Context, options: SendOptions) -> Result<Infallible> {
        self.send(ctx, options).await?;
        Err(Error::Control(ControlFlow::Rejected))
    }

    /// Send, then ask again for the argument `key`
    pub async fn reject_arg(
        &self,
        ctx: &Context,
        key: impl Into<String>,
        options: SendOptions,
    ) -> Result<Infallible> {
        self.send(ctx, options).await?;
        Err(Error::Control(ControlFlow::RejectArg(key.into())))
    }

    /// Send, then ask again for the input received under `key`
    pub async fn reject_receive(
        &self,
        ctx: &Context,
        key: impl Into<String>,
        options: SendOptions,
    ) -> Result<Infallible> {
        self.send(ctx, options).await?;
        Err(Error::Control(ControlFlow::RejectReceive(key.into())))
    }
}

/// Resolve `range` against a sequence of `len` items, clamping to its bounds
fn clamp<R: RangeBounds<usize>>(range: &R, len: usize) -> Range<usize> {
    let start = match range.start_bound() {
        Bound::Included(&start) => start,
        Bound::Excluded(&start) => start.saturating_add(1),
        Bound::Unbounded => 0,
    }
    .min(len);
    let end = match range.end_bound() {
        Bound::Included(&end) => end.saturating_add(1),
        Bound::Excluded(&end) => end,
        Bound::Unbounded => len,
    }
    .min(len);
    start..end.max(start)
}

impl<S: Into<Segment>> FromIterator<S> for Message {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut message = Message::new();
        message.extend(iter);
        message
    }
}

impl<S: Into<Segment>> Extend<S> for Message {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        Message::extend(self, iter);
    }
}

impl IntoIterator for Message {
    type Item = Segment;
    type IntoIter = std::vec::IntoIter<Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}

impl<'a> IntoIterator for &'a Message {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::from(Segment::from(text))
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::from(Segment::from(text))
    }
}

impl From<Segment> for Message {
    fn from(segment: Segment) -> Self {
        let mut message = Message::new();
        message.append(segment);
        message
    }
}

impl From<&Segment> for Message {
    fn from(segment: &Segment) -> Self {
        Message::from(segment.clone())
    }
}

impl From<Vec<Segment>> for Message {
    fn from(segments: Vec<Segment>) -> Self {
        segments.into_iter().collect()
    }
}

impl From<&Message> for Message {
    fn from(message: &Message) -> Self {
        message.clone()
    }
}

impl<I> Index<I> for Message
where
    I: SliceIndex<[Segment]>,
{
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        &self.segments[index]
    }
}

impl<T: Into<Message>> AddAssign<T> for Message {
    fn add_assign(&mut self, rhs: T) {
        self.extend(rhs.into());
    }
}

impl<T: Into<Message>> Add<T> for Message {
    type Output = Message;

    fn add(mut self, rhs: T) -> Message {
        self += rhs;
        self
    }
}

impl Add<Message> for &str {
    type Output = Message;

    fn add(self, rhs: Message) -> Message {
        Message::from(self) + rhs
    }
}

impl<T: Into<Message>> Add<T> for Segment {
    type Output = Message;

    fn add(self, rhs: T) -> Message {
        Message::from(self) + rhs
    }
}

impl Segment {
    /// Concatenate `items` with this segment between each pair
    pub fn join<I>(&self, items: I) -> Message
    where
        I: IntoIterator,
        I::Item: Into<Message>,
    {
        Message::from(self).join(items)
    }
}

impl PartialEq<&str> for Message {
    fn eq(&self, other: &&str) -> bool {
        self.segments.len() == 1 && self.segments[0] == *other
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}
