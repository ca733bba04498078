//! Automatic client selection for unsolicited sends
//!
//! Each connected client reports the targets it can reach through its
//! platform's registered lister. The cache maps every reported target to the
//! set of clients that reach it. Connecting a client refreshes only that
//! client's entries and disconnecting removes them at once, both under one
//! async mutex so the two never interleave. The mutex also guards the set of
//! live clients; a listing is only stored for a client still in that set.

use futures::future::BoxFuture;
use futures::FutureExt;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::platforms::{ClientHandle, ClientKey};
use crate::types::{Adapter, Target};

/// Lists every target a client can currently reach
pub type ListTargets =
    Arc<dyn Fn(ClientHandle) -> BoxFuture<'static, Result<Vec<Target>>> + Send + Sync>;

/// Platform → reachable-target lister
#[derive(Default)]
pub struct ListTargetsRegistry {
    listers: HashMap<Adapter, ListTargets>,
}

impl ListTargetsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, Fut>(&mut self, adapter: Adapter, lister: F)
    where
        F: Fn(ClientHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<Target>>> + Send + 'static,
    {
        debug!(%adapter, "register target lister");
        self.listers
            .insert(adapter, Arc::new(move |client| lister(client).boxed()));
    }

    pub fn get(&self, adapter: Adapter) -> Option<ListTargets> {
        self.listers.get(&adapter).cloned()
    }

    pub fn clear(&mut self) {
        self.listers.clear();
    }
}

#[derive(Default)]
struct State {
    /// Target → clients reaching it
    targets: HashMap<Target, BTreeSet<ClientKey>>,
    /// Clients with at least one cached target
    clients: BTreeMap<ClientKey, ClientHandle>,
    /// Clients connected and not yet disconnected
    live: BTreeSet<ClientKey>,
}

impl State {
    fn remove_client(&mut self, key: &ClientKey) -> usize {
        self.clients.remove(key);
        let mut removed = 0;
        self.targets.retain(|_, owners| {
            if owners.remove(key) {
                removed += 1;
            }
            !owners.is_empty()
        });
        removed
    }

    fn insert_client(&mut self, client: ClientHandle, targets: HashSet<Target>) {
        let key = ClientKey::of(client.as_ref());
        for target in targets {
            self.targets.entry(target).or_default().insert(key.clone());
        }
        self.clients.insert(key, client);
    }

    fn dump(&self) {
        for (target, owners) in &self.targets {
            let owners: Vec<String> = owners.iter().map(ToString::to_string).collect();
            trace!(entry = %target, clients = ?owners, "auto-select entry");
        }
    }
}

/// Target → live clients cache
pub struct AutoSelect {
    enabled: AtomicBool,
    state: Mutex<State>,
    rng: std::sync::Mutex<StdRng>,
}

impl Default for AutoSelect {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoSelect {
    pub fn new() -> Self {
        AutoSelect {
            enabled: AtomicBool::new(false),
            state: Mutex::new(State::default()),
            rng: std::sync::Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic selection, for tests
    pub fn with_seed(seed: u64) -> Self {
        AutoSelect {
            rng: std::sync::Mutex::new(StdRng::seed_from_u64(seed)),
            ..Self::new()
        }
    }

    pub fn enable(&self) {
        if !self.enabled.swap(true, Ordering::SeqCst) {
            info!("automatic client selection enabled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Mark `client` live and, when enabled, index its targets
    ///
    /// Returns the number of targets cached for it.
    pub async fn client_connected(
        &self,
        listers: &ListTargetsRegistry,
        client: &ClientHandle,
    ) -> usize {
        let mut state = self.state.lock().await;
        state.live.insert(ClientKey::of(client.as_ref()));
        if !self.is_enabled() {
            return 0;
        }
        let count = self.refresh_locked(&mut state, listers, client).await;
        state.dump();
        count
    }

    /// Replace `client`'s cached targets with a fresh listing
    ///
    /// A lister failure is logged and leaves the client with no targets for
    /// this cycle. Clients that are not live, or report themselves
    /// disconnected once the listing completes, get no entries.
    pub async fn refresh_client(&self, listers: &ListTargetsRegistry, client: &ClientHandle) {
        let mut state = self.state.lock().await;
        self.refresh_locked(&mut state, listers, client).await;
        state.dump();
    }

    /// Rebuild the cache from scratch for `clients`
    pub async fn refresh_all(&self, listers: &ListTargetsRegistry, clients: &[ClientHandle]) {
        let mut state = self.state.lock().await;
        state.targets.clear();
        state.clients.clear();
        for client in clients {
            self.refresh_locked(&mut state, listers, client).await;
        }
        info!(
            clients = state.clients.len(),
            targets = state.targets.len(),
            "auto-select cache rebuilt"
        );
        state.dump();
    }

    async fn refresh_locked(
        &self,
        state: &mut State,
        listers: &ListTargetsRegistry,
        client: &ClientHandle,
    ) -> usize {
        let key = ClientKey::of(client.as_ref());
        state.remove_client(&key);
        if !state.live.contains(&key) {
            debug!(client = %key, "client is not live, skipping refresh");
            return 0;
        }

        let Some(lister) = listers.get(client.adapter()) else {
            debug!(client = %key, "no target lister for adapter");
            return 0;
        };
        let targets: HashSet<Target> = match lister(client.clone()).await {
            Ok(targets) => targets.into_iter().collect(),
            Err(e) => {
                warn!(client = %key, error = %e, "failed to list reachable targets");
                return 0;
            }
        };
        if !client.is_connected() {
            debug!(client = %key, "client disconnected during refresh, discarding result");
            return 0;
        }

        let count = targets.len();
        state.insert_client(client.clone(), targets);
        info!(client = %key, targets = count, "auto-select cache refreshed");
        count
    }

    /// Forget a disconnected client and drop all of its entries
    pub async fn remove_client(&self, key: &ClientKey) {
        let mut state = self.state.lock().await;
        state.live.remove(key);
        let removed = state.remove_client(key);
        info!(client = %key, targets = removed, "removed client from auto-select cache");
        state.dump();
    }

    /// Number of targets `client` is cached for
    pub async fn targets_of(&self, key: &ClientKey) -> usize {
        let state = self.state.lock().await;
        state
            .targets
            .values()
            .filter(|owners| owners.contains(key))
            .count()
    }

    /// Pick a live client reaching `target`
    pub async fn resolve(&self, target: &Target) -> Result<ClientHandle> {
        if !self.is_enabled() {
            return Err(Error::AutoSelectDisabled);
        }
        if target.requires_handshake() {
            return Err(Error::unsupported(format!(
                "target kind \"{}\" cannot be resolved automatically, pass a client explicitly",
                target.kind()
            )));
        }

        let state = self.state.lock().await;
        let candidates: Vec<&ClientHandle> = state
            .targets
            .get(target)
            .into_iter()
            .flatten()
            .filter_map(|key| state.clients.get(key))
            .collect();

        let chosen = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| Error::invalid_state("auto-select rng poisoned"))?;
            candidates.choose(&mut *rng).map(|client| (*client).clone())
        };
        chosen.ok_or_else(|| Error::NoBotFound {
            target: target.to_string(),
        })
    }

    /// Disable selection and forget every client
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        *state = State::default();
        self.enabled.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockClient;
    use crate::types::{
        TargetKaiheilaChannel, TargetQQGroup, TargetQQGuildDirect, TargetQQPrivate,
    };

    fn a() -> Target {
        TargetQQGroup { group_id: 1 }.into()
    }

    fn b() -> Target {
        TargetQQPrivate { user_id: 2 }.into()
    }

    /// Every OneBot V11 mock client reaches A and B; Kaiheila listing fails.
    fn listers() -> ListTargetsRegistry {
        let mut listers = ListTargetsRegistry::new();
        listers.register(Adapter::OneBotV11, |_client| async { Ok(vec![a(), b()]) });
        listers.register(Adapter::Kaiheila, |_client| async {
            Err(Error::rejected(Adapter::Kaiheila, "rate limited"))
        });
        listers
    }

    fn enabled(seed: u64) -> AutoSelect {
        let cache = AutoSelect::with_seed(seed);
        cache.enable();
        cache
    }

    #[tokio::test]
    async fn test_resolver_disabled() {
        let cache = AutoSelect::new();
        assert!(matches!(cache.resolve(&a()).await, Err(Error::AutoSelectDisabled)));
    }

    #[tokio::test]
    async fn test_connect_then_disconnect() {
        let cache = enabled(7);
        let listers = listers();
        let client = MockClient::handle(Adapter::OneBotV11, "1");

        assert_eq!(cache.client_connected(&listers, &client).await, 2);
        for target in [a(), b()] {
            let chosen = cache.resolve(&target).await.unwrap();
            assert_eq!(ClientKey::of(chosen.as_ref()), ClientKey::of(client.as_ref()));
        }

        cache.remove_client(&ClientKey::of(client.as_ref())).await;
        for target in [a(), b()] {
            assert!(matches!(
                cache.resolve(&target).await,
                Err(Error::NoBotFound { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_random_choice_spreads_over_clients() {
        let cache = enabled(42);
        let listers = listers();
        let first = MockClient::handle(Adapter::OneBotV11, "1");
        let second = MockClient::handle(Adapter::OneBotV11, "2");
        cache.client_connected(&listers, &first).await;
        cache.client_connected(&listers, &second).await;
        cache.refresh_all(&listers, &[first, second]).await;

        let mut seen = BTreeSet::new();
        for _ in 0..100 {
            let chosen = cache.resolve(&a()).await.unwrap();
            seen.insert(chosen.self_id().to_string());
        }
        assert_eq!(seen.into_iter().collect::<Vec<_>>(), vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_failing_lister_does_not_abort_refresh() {
        let cache = enabled(1);
        let listers = listers();
        let broken = MockClient::handle(Adapter::Kaiheila, "k");
        let healthy = MockClient::handle(Adapter::OneBotV11, "1");
        cache.client_connected(&listers, &broken).await;
        cache.client_connected(&listers, &healthy).await;
        cache.refresh_all(&listers, &[broken.clone(), healthy]).await;

        assert_eq!(cache.targets_of(&ClientKey::of(broken.as_ref())).await, 0);
        assert_eq!(cache.resolve(&a()).await.unwrap().self_id(), "1");
        let channel: Target = TargetKaiheilaChannel {
            channel_id: "c".into(),
        }
        .into();
        assert!(matches!(
            cache.resolve(&channel).await,
            Err(Error::NoBotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_disconnected_during_refresh_is_discarded() {
        let cache = enabled(1);
        let mock = MockClient::new(Adapter::OneBotV11, "1");
        mock.set_connected(false);
        let client: ClientHandle = Arc::new(mock);
        cache.client_connected(&listers(), &client).await;
        assert!(matches!(cache.resolve(&a()).await, Err(Error::NoBotFound { .. })));
    }

    #[tokio::test]
    async fn test_refresh_after_disconnect_stores_nothing() {
        let cache = enabled(1);
        let listers = listers();
        let client = MockClient::handle(Adapter::OneBotV11, "1");
        let key = ClientKey::of(client.as_ref());

        cache.client_connected(&listers, &client).await;
        cache.remove_client(&key).await;
        // a refresh queued before the disconnect reaches the lock afterwards
        cache.refresh_client(&listers, &client).await;
        assert_eq!(cache.targets_of(&key).await, 0);
        assert!(matches!(cache.resolve(&a()).await, Err(Error::NoBotFound { .. })));

        // same for a full rebuild working from a stale client list
        cache.refresh_all(&listers, &[client]).await;
        assert!(matches!(cache.resolve(&b()).await, Err(Error::NoBotFound { .. })));
    }

    #[tokio::test]
    async fn test_connected_while_disabled_is_indexed_on_refresh() {
        let cache = AutoSelect::with_seed(1);
        let listers = listers();
        let client = MockClient::handle(Adapter::OneBotV11, "1");
        assert_eq!(cache.client_connected(&listers, &client).await, 0);

        cache.enable();
        cache.refresh_all(&listers, &[client]).await;
        assert_eq!(cache.resolve(&a()).await.unwrap().self_id(), "1");
    }

    #[tokio::test]
    async fn test_reset_disables_and_forgets() {
        let cache = enabled(1);
        let listers = listers();
        let client = MockClient::handle(Adapter::OneBotV11, "1");
        cache.client_connected(&listers, &client).await;

        cache.reset().await;
        assert!(!cache.is_enabled());
        cache.enable();
        cache.refresh_client(&listers, &client).await;
        assert!(matches!(cache.resolve(&a()).await, Err(Error::NoBotFound { .. })));
    }

    #[tokio::test]
    async fn test_handshake_targets_unsupported() {
        let cache = enabled(1);
        let direct: Target = TargetQQGuildDirect {
            recipient_id: 1,
            source_guild_id: 2,
        }
        .into();
        assert!(matches!(
            cache.resolve(&direct).await,
            Err(Error::Unsupported { .. })
        ));
    }
}
