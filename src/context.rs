//! Process-scoped dispatch context
//!
//! A [`Context`] owns every registry, the live clients reported by the
//! connection layer, the automatic client selection cache and the direct
//! session cache. Platform modules register into it at start-up; sends read
//! from it. Tests build a fresh context per case.

use std::collections::HashMap;
use std::future::Future;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::auto_select::AutoSelect;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::platforms::{ClientHandle, ClientKey, Event, EventHandle};
use crate::registry::Registries;
use crate::session::DirectSessions;
use crate::types::{Adapter, ConnectionInfo, MessageId, Target};

tokio::task_local! {
    static CURRENT: Scope;
}

/// The event being handled and the client it arrived on
#[derive(Clone)]
pub struct Scope {
    pub client: ClientHandle,
    pub event: EventHandle,
}

pub struct Context {
    /// User-defined identifier for this context
    pub id: String,
    config: Config,
    initialized: bool,
    registries: Registries,
    auto_select: AutoSelect,
    clients: RwLock<HashMap<ClientKey, (ClientHandle, ConnectionInfo)>>,
    /// Held for a whole connect or disconnect so the two never overlap
    transitions: Mutex<()>,
    direct_sessions: DirectSessions,
}

impl Context {
    /// Create a new context
    pub fn new(id: impl Into<String>, config: Config) -> Self {
        let direct_sessions = DirectSessions::new(config.direct_session_ttl());
        Context {
            id: id.into(),
            config,
            initialized: false,
            registries: Registries::new(),
            auto_select: AutoSelect::new(),
            clients: RwLock::new(HashMap::new()),
            transitions: Mutex::new(()),
            direct_sessions,
        }
    }

    /// Replace the selection cache, e.g. with a seeded one
    pub fn with_auto_select(mut self, auto_select: AutoSelect) -> Self {
        self.auto_select = auto_select;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Initialize the context
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Err(Error::invalid_state("Context already initialized"));
        }
        info!(context = %self.id, "initializing context");
        if self.config.auto_select_bot {
            self.auto_select.enable();
        }
        self.initialized = true;
        Ok(())
    }

    /// Check if the context is initialized
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Forget live clients and cached state; registrations are kept
    pub async fn shutdown(&mut self) -> Result<()> {
        if !self.initialized {
            return Err(Error::invalid_state("Context not initialized"));
        }
        info!(context = %self.id, "shutting down context");
        self.clients.write().await.clear();
        self.auto_select.reset().await;
        self.direct_sessions.clear().await;
        self.initialized = false;
        Ok(())
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    pub fn registries_mut(&mut self) -> &mut Registries {
        &mut self.registries
    }

    pub fn auto_select(&self) -> &AutoSelect {
        &self.auto_select
    }

    /// Turn on automatic client selection and index every live client
    pub async fn enable_auto_select(&self) {
        self.auto_select.enable();
        let clients = self.clients().await;
        self.auto_select
            .refresh_all(&self.registries.list_targets, &clients)
            .await;
    }

    /// Connection layer notification: `client` is now live
    pub async fn connect(&self, client: ClientHandle) -> Result<()> {
        if !self.initialized {
            return Err(Error::invalid_state("Context not initialized"));
        }
        let _transition = self.transitions.lock().await;
        let key = ClientKey::of(client.as_ref());
        info!(client = %key, "client connected");
        let mut info = ConnectionInfo::new(key.adapter, key.self_id.clone());

        let reachable = self
            .auto_select
            .client_connected(&self.registries.list_targets, &client)
            .await;
        if self.auto_select.is_enabled() {
            info.reachable_targets = Some(reachable);
        }
        self.clients.write().await.insert(key, (client, info));
        Ok(())
    }

    /// Connection layer notification: `client` went away
    pub async fn disconnect(&self, client: &ClientHandle) -> Result<()> {
        let _transition = self.transitions.lock().await;
        let key = ClientKey::of(client.as_ref());
        if self.clients.write().await.remove(&key).is_none() {
            debug!(client = %key, "disconnect for unknown client");
        }
        info!(client = %key, "client disconnected");
        self.auto_select.remove_client(&key).await;
        self.direct_sessions.forget_client(&key).await;
        Ok(())
    }

    /// Live client by platform and account id
    pub async fn client(&self, adapter: Adapter, self_id: &str) -> Option<ClientHandle> {
        let key = ClientKey::new(adapter, self_id);
        let clients = self.clients.read().await;
        clients.get(&key).map(|(client, _)| client.clone())
    }

    pub async fn clients(&self) -> Vec<ClientHandle> {
        let clients = self.clients.read().await;
        clients.values().map(|(client, _)| client.clone()).collect()
    }

    pub async fn connections(&self) -> Vec<ConnectionInfo> {
        let clients = self.clients.read().await;
        let mut infos: Vec<ConnectionInfo> = clients.values().map(|(_, info)| info.clone()).collect();
        infos.sort_by(|a, b| (a.adapter, &a.self_id).cmp(&(b.adapter, &b.self_id)));
        infos
    }

    /// Run `fut` as the handler of `event` received by `client`
    ///
    /// [`Message::send`](crate::Message::send) reads this scope.
    pub async fn scope<F: Future>(client: ClientHandle, event: EventHandle, fut: F) -> F::Output {
        CURRENT.scope(Scope { client, event }, fut).await
    }

    /// The event scope of the current task, if any
    pub fn current() -> Option<Scope> {
        CURRENT.try_with(Scope::clone).ok()
    }

    pub fn extract_target(&self, event: &dyn Event, client: Option<&ClientHandle>) -> Result<Target> {
        self.registries.extractors.extract_target(event, client)
    }

    pub fn get_target(&self, event: &dyn Event, client: Option<&ClientHandle>) -> Option<Target> {
        self.registries.extractors.get_target(event, client)
    }

    pub fn message_id(&self, event: &dyn Event) -> Option<MessageId> {
        self.registries.message_ids.get(event)
    }

    /// Pick a live client for an unsolicited send to `target`
    pub async fn resolve_client(&self, target: &Target) -> Result<ClientHandle> {
        self.auto_select.resolve(target).await
    }

    /// Session id for targets that need a handshake before sending
    pub async fn direct_session(&self, client: &ClientHandle, target: &Target) -> Result<String> {
        self.direct_sessions
            .resolve(&self.registries.direct_sessions, client, target)
            .await
    }
}
