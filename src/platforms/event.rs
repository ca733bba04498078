//! Inbound event interface
//!
//! Events carry an explicit, dotted type path (`"onebot_v11.message.group"`)
//! instead of relying on a language-level type hierarchy. Registries resolve
//! an event by trying the full path first and then each shorter prefix, so
//! the most specific registration always wins.

use std::any::Any;
use std::sync::Arc;

use crate::error::{Error, Result};

/// An event received from a platform
pub trait Event: Send + Sync + 'static {
    /// Dotted type path, most general segment first
    fn event_type(&self) -> &str;

    /// Author of the event, when it has one
    fn user_id(&self) -> Option<String> {
        None
    }

    /// Access the concrete event type
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to an event
pub type EventHandle = Arc<dyn Event>;

/// Iterate an event type path from most specific to most general
///
/// The empty root is never produced, so a lookup can only match
/// registrations inside the event's own namespace.
pub fn event_type_ancestors(event_type: &str) -> impl Iterator<Item = &str> {
    let mut next = Some(event_type).filter(|s| !s.is_empty());
    std::iter::from_fn(move || {
        let current = next?;
        next = current.rfind('.').map(|idx| &current[..idx]);
        Some(current)
    })
}

/// Downcast an event to the platform's concrete type
pub fn downcast_event<T: Event>(event: &dyn Event) -> Result<&T> {
    event.as_any().downcast_ref::<T>().ok_or_else(|| {
        Error::invalid_argument(format!(
            "event {} is not a {}",
            event.event_type(),
            std::any::type_name::<T>()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestors_most_specific_first() {
        let chain: Vec<&str> = event_type_ancestors("onebot_v11.message.group").collect();
        assert_eq!(chain, vec!["onebot_v11.message.group", "onebot_v11.message", "onebot_v11"]);
    }

    #[test]
    fn test_ancestors_of_empty() {
        assert_eq!(event_type_ancestors("").count(), 0);
    }
}
