//! Platform-neutral value types
//!
//! Nothing in this module knows how a platform renders or delivers content;
//! that is looked up in the registries at send time.

pub mod adapter;
pub mod aggregated;
pub mod connection;
pub mod message;
pub mod message_id;
pub mod segment;
pub mod target;

// Re-export for convenience
pub use adapter::Adapter;
pub use aggregated::AggregatedMessage;
pub use connection::{ConnectionInfo, ConnectionState};
pub use message::{Message, SendOptions};
pub use message_id::{MessageId, PlatformMessageId};
pub use segment::{kind, CustomBuilder, ImageSource, NativeSegment, Segment};
pub use target::*;
