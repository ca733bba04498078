//! Dispatch tables owned by a [`Context`](crate::Context)
//!
//! Platform modules fill these at start-up through
//! [`Context::registries_mut`](crate::Context::registries_mut). Every lookup
//! is keyed by the platform tag of the live client, so nothing rendered or
//! resolved for one client is reused for another.

mod arg;
mod builder;
mod extractor;
mod receipt;
mod sender;

pub use arg::{ArgConverter, ArgRegistry};
pub use builder::{Builder, BuilderRegistry, MessageConstructor, NativeMessage};
pub use extractor::{Extractor, ExtractorRegistry, MessageIdGetter, MessageIdRegistry};
pub use receipt::{tagged_value, Receipt, ReceiptRegistry, RECEIPT_INDEX_KEY};
pub use sender::{
    AggregateRequest, AggregateSender, EditRequest, Editor, SendRequest, Sender, SenderRegistry,
};

use crate::auto_select::ListTargetsRegistry;
use crate::session::DirectSessionRegistry;

/// All dispatch tables of one context
#[derive(Default)]
pub struct Registries {
    /// Segment builders and native-message constructors
    pub builders: BuilderRegistry,
    /// Target → platform argument converters
    pub args: ArgRegistry,
    /// Event → reply target
    pub extractors: ExtractorRegistry,
    /// Event → message id
    pub message_ids: MessageIdRegistry,
    /// Send, aggregate-send and edit functions
    pub senders: SenderRegistry,
    /// Receipt decoders
    pub receipts: ReceiptRegistry,
    /// Reachable-target listers feeding automatic client selection
    pub list_targets: ListTargetsRegistry,
    /// Handshakes for targets that need a session before sending
    pub direct_sessions: DirectSessionRegistry,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every registration
    pub fn clear(&mut self) {
        self.builders.clear();
        self.args.clear();
        self.extractors.clear();
        self.message_ids.clear();
        self.senders.clear();
        self.receipts.clear();
        self.list_targets.clear();
        self.direct_sessions.clear();
    }
}
