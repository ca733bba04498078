//! Event → target and event → message id dispatch
//!
//! Both tables are keyed by event type path. A lookup tries the event's own
//! type first and then each enclosing namespace, see
//! [`event_type_ancestors`].

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::platforms::{event_type_ancestors, ClientHandle, Event};
use crate::types::{MessageId, Target};

/// Nearest registration for `event_type`
fn lookup<'a, V>(table: &'a HashMap<String, V>, event_type: &str) -> Option<(&'a str, &'a V)> {
    event_type_ancestors(event_type)
        .find_map(|candidate| table.get_key_value(candidate))
        .map(|(key, value)| (key.as_str(), value))
}

/// Recovers the reply target of an event
///
/// The shape decides whether a client is mandatory.
#[derive(Clone)]
pub enum Extractor {
    Event(Arc<dyn Fn(&dyn Event) -> Result<Target> + Send + Sync>),
    WithClient(Arc<dyn Fn(&dyn Event, &ClientHandle) -> Result<Target> + Send + Sync>),
}

impl Extractor {
    pub fn event<F>(f: F) -> Self
    where
        F: Fn(&dyn Event) -> Result<Target> + Send + Sync + 'static,
    {
        Extractor::Event(Arc::new(f))
    }

    pub fn with_client<F>(f: F) -> Self
    where
        F: Fn(&dyn Event, &ClientHandle) -> Result<Target> + Send + Sync + 'static,
    {
        Extractor::WithClient(Arc::new(f))
    }

    pub fn needs_client(&self) -> bool {
        matches!(self, Extractor::WithClient(_))
    }
}

#[derive(Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<String, Extractor>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, event_type: impl Into<String>, extractor: Extractor) {
        let event_type = event_type.into();
        debug!(event_type = %event_type, needs_client = extractor.needs_client(), "register extractor");
        self.extractors.insert(event_type, extractor);
    }

    /// Derive the reply target of `event`
    ///
    /// Fails with [`Error::NoExtractor`] when nothing in the event's type path
    /// is registered and with [`Error::ClientRequired`] when the matching
    /// extractor needs a client but none was given.
    pub fn extract_target(
        &self,
        event: &dyn Event,
        client: Option<&ClientHandle>,
    ) -> Result<Target> {
        let event_type = event.event_type();
        let (matched, extractor) =
            lookup(&self.extractors, event_type).ok_or_else(|| Error::NoExtractor {
                event_type: event_type.to_string(),
            })?;
        debug!(event_type, matched, "extract target");
        match extractor {
            Extractor::Event(f) => f(event),
            Extractor::WithClient(f) => {
                let client = client.ok_or_else(|| Error::ClientRequired {
                    event_type: event_type.to_string(),
                })?;
                f(event, client)
            }
        }
    }

    /// Like [`extract_target`](Self::extract_target), but absent on failure
    pub fn get_target(&self, event: &dyn Event, client: Option<&ClientHandle>) -> Option<Target> {
        self.extract_target(event, client).ok()
    }

    pub fn clear(&mut self) {
        self.extractors.clear();
    }
}

/// Reads the platform message id carried by an event
pub type MessageIdGetter = Arc<dyn Fn(&dyn Event) -> Option<MessageId> + Send + Sync>;

#[derive(Default)]
pub struct MessageIdRegistry {
    getters: HashMap<String, MessageIdGetter>,
}

impl MessageIdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, event_type: impl Into<String>, getter: F)
    where
        F: Fn(&dyn Event) -> Option<MessageId> + Send + Sync + 'static,
    {
        let event_type = event_type.into();
        debug!(event_type = %event_type, "register message id getter");
        self.getters.insert(event_type, Arc::new(getter));
    }

    /// Message id of `event`, if its type has a getter and the event has one
    pub fn get(&self, event: &dyn Event) -> Option<MessageId> {
        let (_, getter) = lookup(&self.getters, event.event_type())?;
        getter(event)
    }

    pub fn clear(&mut self) {
        self.getters.clear();
    }
}
