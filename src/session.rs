//! Session handshakes for targets that are not directly addressable
//!
//! Some platforms only accept a direct message after a round trip that
//! opens a session (QQ guild direct messages need a DMS guild id). The
//! result is cached per (client, target). Two concurrent first resolutions
//! of the same pair may both perform the round trip; the later result
//! simply replaces the earlier one.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::platforms::{ClientHandle, ClientKey};
use crate::types::{Adapter, Target};

pub type DirectSessionResolver =
    Arc<dyn Fn(ClientHandle, Target) -> BoxFuture<'static, Result<String>> + Send + Sync>;

/// (target kind, platform) → handshake
#[derive(Default)]
pub struct DirectSessionRegistry {
    resolvers: HashMap<(&'static str, Adapter), DirectSessionResolver>,
}

impl DirectSessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, Fut>(&mut self, kind: &'static str, adapter: Adapter, resolver: F)
    where
        F: Fn(ClientHandle, Target) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        debug!(kind, %adapter, "register direct session resolver");
        self.resolvers.insert(
            (kind, adapter),
            Arc::new(move |client, target| resolver(client, target).boxed()),
        );
    }

    pub fn get(&self, kind: &'static str, adapter: Adapter) -> Option<DirectSessionResolver> {
        self.resolvers.get(&(kind, adapter)).cloned()
    }

    pub fn clear(&mut self) {
        self.resolvers.clear();
    }
}

/// Cached handshake results
pub struct DirectSessions {
    cache: Cache<(ClientKey, Target), String>,
}

impl DirectSessions {
    pub fn new(ttl: Option<Duration>) -> Self {
        DirectSessions {
            cache: Cache::with_ttl(ttl),
        }
    }

    /// Session id for sending to `target` through `client`
    pub async fn resolve(
        &self,
        registry: &DirectSessionRegistry,
        client: &ClientHandle,
        target: &Target,
    ) -> Result<String> {
        let key = (ClientKey::of(client.as_ref()), target.clone());
        if let Some(session) = self.cache.get(&key).await {
            return Ok(session);
        }

        let adapter = client.adapter();
        let resolver = registry
            .get(target.kind(), adapter)
            .ok_or(Error::TargetNotSupported {
                kind: target.kind(),
                adapter,
            })?;
        let session = resolver(client.clone(), target.clone()).await?;
        debug!(client = %key.0, to = %target, session = %session, "direct session opened");
        self.cache.set(key, session.clone()).await;
        Ok(session)
    }

    /// Forget every session opened through `client`
    pub async fn forget_client(&self, client: &ClientKey) -> usize {
        self.cache.invalidate_where(|(owner, _)| owner == client).await
    }

    pub async fn clear(&self) {
        self.cache.clear().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockClient;
    use crate::types::{TargetQQGuildDirect, TargetQQGroup};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry(calls: Arc<AtomicUsize>) -> DirectSessionRegistry {
        let mut registry = DirectSessionRegistry::new();
        registry.register("QQ Guild Direct", Adapter::QQ, move |_client, target| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                match target {
                    Target::QQGuildDirect(t) => Ok(format!("dms-{}", t.recipient_id)),
                    other => Err(Error::invalid_argument(other.kind())),
                }
            }
        });
        registry
    }

    fn direct(recipient_id: i64) -> Target {
        TargetQQGuildDirect {
            recipient_id,
            source_guild_id: 1,
        }
        .into()
    }

    #[tokio::test]
    async fn test_resolution_is_cached_per_target() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = registry(calls.clone());
        let sessions = DirectSessions::new(None);
        let client = MockClient::handle(Adapter::QQ, "bot");

        assert_eq!(sessions.resolve(&registry, &client, &direct(5)).await.unwrap(), "dms-5");
        assert_eq!(sessions.resolve(&registry, &client, &direct(5)).await.unwrap(), "dms-5");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        sessions.resolve(&registry, &client, &direct(6)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert_eq!(sessions.forget_client(&ClientKey::of(client.as_ref())).await, 2);
        sessions.resolve(&registry, &client, &direct(5)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unregistered_kind() {
        let registry = registry(Arc::new(AtomicUsize::new(0)));
        let sessions = DirectSessions::new(None);
        let client = MockClient::handle(Adapter::QQ, "bot");
        let group: Target = TargetQQGroup { group_id: 1 }.into();
        let err = sessions.resolve(&registry, &client, &group).await.unwrap_err();
        assert!(matches!(err, Error::TargetNotSupported { kind: "QQ Group", .. }));
    }
}
