//! Platform-neutral message dispatch
//!
//! Build one [`Message`] and deliver it through whichever chat platform
//! client is live. Platform integrations register segment builders, target
//! argument converters, event extractors and senders into a [`Context`];
//! the core picks the right ones by the live client's [`Adapter`] tag.

// Core modules
pub mod auto_select;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod override_chain;
pub mod platforms;
pub mod registry;
pub mod serialization;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use auto_select::AutoSelect;
pub use config::Config;
pub use context::{Context, Scope};
pub use error::{ControlFlow, Error, ErrorCode, Result};
pub use platforms::{Client, ClientHandle, ClientKey, Event, EventHandle};
pub use registry::{Builder, Extractor, NativeMessage, Receipt, Registries};
pub use types::{
    Adapter, AggregatedMessage, ConnectionInfo, ConnectionState, CustomBuilder, ImageSource,
    Message, MessageId, NativeSegment, PlatformMessageId, Segment, SendOptions, Target,
};

// Library version information
pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 1;
pub const VERSION_PATCH: u32 = 0;
pub const VERSION_STRING: &str = concat!(env!("CARGO_PKG_VERSION"), " (libcourier)");
