//! Client handle interface the connection layer must provide

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::types::{Adapter, ConnectionState};

/// A live connection to one chat platform account
///
/// The dispatch core only needs to know which platform a client speaks and
/// which account it is; everything else is reached by downcasting inside the
/// platform's own registered functions.
pub trait Client: Send + Sync + 'static {
    /// Platform tag used for every registry lookup
    fn adapter(&self) -> Adapter;

    /// Account id of this client on its platform
    fn self_id(&self) -> &str;

    /// Current connection state
    fn connection_state(&self) -> ConnectionState {
        ConnectionState::Connected
    }

    /// Check if currently connected
    fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    /// Access the concrete client type
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a client
pub type ClientHandle = Arc<dyn Client>;

/// Identity of a client: platform tag plus account id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientKey {
    pub adapter: Adapter,
    pub self_id: String,
}

impl ClientKey {
    pub fn new(adapter: Adapter, self_id: impl Into<String>) -> Self {
        ClientKey {
            adapter,
            self_id: self_id.into(),
        }
    }

    pub fn of(client: &dyn Client) -> Self {
        ClientKey::new(client.adapter(), client.self_id())
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.adapter, self.self_id)
    }
}

/// Downcast a client handle to the platform's concrete type
pub fn downcast_client<T: Client>(client: &ClientHandle) -> crate::error::Result<&T> {
    client.as_any().downcast_ref::<T>().ok_or_else(|| {
        crate::error::Error::invalid_argument(format!(
            "client {} is not a {}",
            ClientKey::of(client.as_ref()),
            std::any::type_name::<T>()
        ))
    })
}
