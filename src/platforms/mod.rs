//! Interfaces of the collaborators the dispatch core consumes
//!
//! The connection layer supplies [`Client`] handles, platforms deliver
//! [`Event`]s. Concrete platform integrations live outside this crate and
//! plug in through the registries on [`crate::Context`].

mod event;
mod platform_trait;

// Re-export client and event interfaces
pub use event::{downcast_event, event_type_ancestors, Event, EventHandle};
pub use platform_trait::{downcast_client, Client, ClientHandle, ClientKey};
