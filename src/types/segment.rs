//! Platform-neutral message segments
//!
//! A [`Segment`] is a kind tag plus an opaque field map. It is rendered into
//! a platform's [`NativeSegment`] only when a live client is known, through
//! the builder table of [`crate::registry::BuilderRegistry`] or through a
//! per-instance override installed with [`Segment::overwrite`].

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::override_chain::OverrideChain;
use crate::platforms::ClientHandle;
use crate::serialization::Tagged;
use crate::types::{Adapter, MessageId};

/// Kind tags of the built-in segments
pub mod kind {
    pub const TEXT: &str = "text";
    pub const IMAGE: &str = "image";
    pub const MENTION: &str = "mention";
    pub const REPLY: &str = "reply";
    pub const CUSTOM: &str = "custom";
}

/// A rendered, platform-specific segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeSegment {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
}

impl NativeSegment {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        NativeSegment {
            kind: kind.into(),
            data,
        }
    }
}

/// Where an image comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "value", rename_all = "lowercase")]
pub enum ImageSource {
    Url(String),
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl ImageSource {
    /// Field value stored in an image segment
    ///
    /// Paths that are not valid UTF-8 are stored lossily.
    fn to_value(&self) -> Value {
        let (source, value) = match self {
            ImageSource::Url(url) => ("url", Value::String(url.clone())),
            ImageSource::Path(path) => {
                let encoded = match path.to_str() {
                    Some(path) => path.to_string(),
                    None => {
                        warn!(
                            path = %path.display(),
                            "image path is not valid UTF-8, storing it lossily"
                        );
                        path.to_string_lossy().into_owned()
                    }
                };
                ("path", Value::String(encoded))
            }
            ImageSource::Bytes(bytes) => ("bytes", Value::from(bytes.clone())),
        };
        json!({"source": source, "value": value})
    }
}

impl From<&str> for ImageSource {
    fn from(url: &str) -> Self {
        ImageSource::Url(url.to_string())
    }
}

impl From<String> for ImageSource {
    fn from(url: String) -> Self {
        ImageSource::Url(url)
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes)
    }
}

type OverrideFuture = BoxFuture<'static, Result<NativeSegment>>;

/// Per-instance rendering override for one platform
#[derive(Clone)]
pub enum CustomBuilder {
    /// Always render to this segment
    Literal(NativeSegment),
    /// Render without consulting the client
    Pure(Arc<dyn Fn() -> OverrideFuture + Send + Sync>),
    /// Render with access to the live client
    WithClient(Arc<dyn Fn(ClientHandle) -> OverrideFuture + Send + Sync>),
}

impl CustomBuilder {
    pub fn pure<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<NativeSegment>> + Send + 'static,
    {
        CustomBuilder::Pure(Arc::new(move || f().boxed()))
    }

    pub fn with_client<F, Fut>(f: F) -> Self
    where
        F: Fn(ClientHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<NativeSegment>> + Send + 'static,
    {
        CustomBuilder::WithClient(Arc::new(move |client| f(client).boxed()))
    }

    fn invoke(&self, client: ClientHandle) -> OverrideFuture {
        match self {
            CustomBuilder::Literal(segment) => {
                futures::future::ready(Ok(segment.clone())).boxed()
            }
            CustomBuilder::Pure(f) => f(),
            CustomBuilder::WithClient(f) => f(client),
        }
    }
}

impl From<NativeSegment> for CustomBuilder {
    fn from(segment: NativeSegment) -> Self {
        CustomBuilder::Literal(segment)
    }
}

impl fmt::Debug for CustomBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomBuilder::Literal(segment) => f.debug_tuple("Literal").field(segment).finish(),
            CustomBuilder::Pure(_) => f.write_str("Pure(..)"),
            CustomBuilder::WithClient(_) => f.write_str("WithClient(..)"),
        }
    }
}

/// Smallest unit of platform-neutral message content
#[derive(Clone)]
pub struct Segment {
    kind: String,
    data: Map<String, Value>,
    overrides: BTreeMap<Adapter, CustomBuilder>,
}

impl Segment {
    /// Create a segment of any kind
    pub fn new(kind: impl Into<String>, data: Map<String, Value>) -> Self {
        Segment {
            kind: kind.into(),
            data,
            overrides: BTreeMap::new(),
        }
    }

    fn with_fields<const N: usize>(kind: &str, fields: [(&str, Value); N]) -> Self {
        let data = fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Segment::new(kind, data)
    }

    /// Plain text; this is the constructor every bare string goes through
    pub fn text(text: impl Into<String>) -> Self {
        Segment::with_fields(kind::TEXT, [("text", Value::String(text.into()))])
    }

    /// Image with the default name `image`
    pub fn image(image: impl Into<ImageSource>) -> Self {
        Segment::image_named(image, "image")
    }

    pub fn image_named(image: impl Into<ImageSource>, name: impl Into<String>) -> Self {
        let image = image.into().to_value();
        Segment::with_fields(
            kind::IMAGE,
            [("image", image), ("name", Value::String(name.into()))],
        )
    }

    /// Mention of another user
    pub fn mention(user_id: impl Into<String>) -> Self {
        Segment::with_fields(kind::MENTION, [("user_id", Value::String(user_id.into()))])
    }

    /// Reply marker pointing at an existing message
    pub fn reply(message_id: &MessageId) -> Self {
        let mut id = message_id.data.clone();
        id.insert(
            MessageId::INDEX_KEY.to_string(),
            Value::String(message_id.adapter_name.as_str().to_string()),
        );
        Segment::with_fields(kind::REPLY, [("message_id", Value::Object(id))])
    }

    /// Segment rendered only through explicit per-platform overrides
    pub fn custom<I>(renderings: I) -> Self
    where
        I: IntoIterator<Item = (Adapter, CustomBuilder)>,
    {
        let mut segment = Segment::new(kind::CUSTOM, Map::new());
        segment.overrides.extend(renderings);
        segment
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.data
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// Text content of a text segment
    pub fn as_text(&self) -> Option<&str> {
        if !self.is_kind(kind::TEXT) {
            return None;
        }
        self.data.get("text").and_then(Value::as_str)
    }

    /// Image source of an image segment
    pub fn image_source(&self) -> Result<ImageSource> {
        let raw = self
            .data
            .get("image")
            .ok_or_else(|| Error::invalid_argument("segment has no image field"))?;
        Ok(serde_json::from_value(raw.clone())?)
    }

    /// Message id referenced by a reply segment
    pub fn reply_id(&self) -> Result<MessageId> {
        let raw = self
            .data
            .get("message_id")
            .ok_or_else(|| Error::invalid_argument("segment has no message_id field"))?;
        MessageId::decode(raw.clone())
    }

    /// Install a rendering that outranks the builder table for `adapter`
    ///
    /// Only this instance is affected. A [`NativeSegment`] is accepted as a
    /// literal rendering.
    pub fn overwrite(mut self, adapter: Adapter, builder: impl Into<CustomBuilder>) -> Self {
        self.overrides.insert(adapter, builder.into());
        self
    }

    pub fn has_override(&self, adapter: Adapter) -> bool {
        self.overrides.contains_key(&adapter)
    }

    /// Render for the live client's platform
    ///
    /// The instance override is tried first, then the builder table. The
    /// platform tag is read from `client` on every call, so a segment can be
    /// built for different platforms in turn.
    pub async fn build(&self, ctx: &Context, client: &ClientHandle) -> Result<NativeSegment> {
        let adapter = client.adapter();
        let instance = self.overrides.get(&adapter).cloned().map(|builder| {
            let client = client.clone();
            move || builder.invoke(client)
        });
        let table = ctx
            .registries()
            .builders
            .get(&self.kind, adapter)
            .map(|builder| {
                let segment = self.clone();
                let client = client.clone();
                move || builder.invoke(segment, client)
            });

        let built = OverrideChain::new()
            .push_opt("instance override", instance)
            .push_opt("builder table", table)
            .run()
            .await?;

        match built {
            Some(native) => Ok(native),
            None if self.is_kind(kind::CUSTOM) => Err(Error::unsupported(format!(
                "custom segment has no rendering for adapter \"{adapter}\""
            ))),
            None => Err(Error::AdapterNotInstalled { adapter }),
        }
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.data == other.data
    }
}

impl PartialEq<str> for Segment {
    fn eq(&self, other: &str) -> bool {
        self.as_text() == Some(other) && self.data.len() == 1
    }
}

impl PartialEq<&str> for Segment {
    fn eq(&self, other: &&str) -> bool {
        PartialEq::<str>::eq(self, *other)
    }
}

impl From<&str> for Segment {
    fn from(text: &str) -> Self {
        Segment::text(text)
    }
}

impl From<String> for Segment {
    fn from(text: String) -> Self {
        Segment::text(text)
    }
}

impl From<&Segment> for Segment {
    fn from(segment: &Segment) -> Self {
        segment.clone()
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Segment");
        s.field("kind", &self.kind).field("data", &self.data);
        if !self.overrides.is_empty() {
            s.field("overrides", &self.overrides.keys().collect::<Vec<_>>());
        }
        s.finish()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.as_text() {
            return f.write_str(text);
        }
        let fields: Vec<String> = self.data.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "[SAA:{}|{}]", self.kind, fields.join(","))
    }
}
