//! Live viewer presence
//!
//! Each open storefront page writes `live:<slug>:<visitor>` with a short TTL
//! and re-sends it every [`HEARTBEAT_INTERVAL`]. The online count for a store
//! is the number of keys under its namespace that have not expired yet. The
//! figure is approximate: a closed tab lingers until its key expires.

use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;
use crate::storage::{ClientStorage, VISITOR_ID_KEY};

pub const PRESENCE_TTL: Duration = Duration::from_secs(60);
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

const NAMESPACE: &str = "live";

/// Shared key/value store with per-key expiry.
#[async_trait]
pub trait ExpiringStore: Send + Sync {
    /// Write `key`, replacing any previous expiry with `now + ttl`.
    async fn put(&self, key: &str, ttl: Duration) -> Result<(), PresenceError>;
    /// Count unexpired keys starting with `prefix`.
    async fn count_prefix(&self, prefix: &str) -> Result<usize, PresenceError>;
}

/// Single-process store. Expired keys are skipped on read and dropped by
/// [`InMemoryExpiringStore::purge_expired`].
#[derive(Debug, Default)]
pub struct InMemoryExpiringStore {
    entries: DashMap<String, Instant>,
}

impl InMemoryExpiringStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    fn put_until(&self, key: &str, expires_at: Instant) {
        self.entries.insert(key.to_string(), expires_at);
    }

    fn count_prefix_at(&self, prefix: &str, now: Instant) -> usize {
        self.entries.iter().filter(|e| e.key().starts_with(prefix) && *e.value() > now).count()
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| *expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    /// Drop expired keys, returning how many were removed.
    pub fn purge_expired(&self) -> usize { self.purge_expired_at(Instant::now()) }
}

#[async_trait]
impl ExpiringStore for InMemoryExpiringStore {
    async fn put(&self, key: &str, ttl: Duration) -> Result<(), PresenceError> {
        self.put_until(key, Instant::now() + ttl);
        Ok(())
    }

    async fn count_prefix(&self, prefix: &str) -> Result<usize, PresenceError> {
        Ok(self.count_prefix_at(prefix, Instant::now()))
    }
}

#[derive(Clone)]
pub struct PresenceApproximator {
    store: Arc<dyn ExpiringStore>,
    ttl: Duration,
}

impl PresenceApproximator {
    pub fn new(store: Arc<dyn ExpiringStore>, ttl: Duration) -> Self { Self { store, ttl } }

    pub fn ttl(&self) -> Duration { self.ttl }

    /// Mark `visitor_id` as viewing the store. Refreshes rather than extends:
    /// the key always expires `ttl` after the latest heartbeat.
    pub async fn heartbeat(&self, slug: &str, visitor_id: &str) -> Result<(), PresenceError> {
        if slug.is_empty() || visitor_id.is_empty() {
            tracing::debug!(slug, visitor_id, "ignoring heartbeat with empty id");
            return Ok(());
        }
        check_segment(slug)?;
        check_segment(visitor_id)?;
        self.store.put(&format!("{NAMESPACE}:{slug}:{visitor_id}"), self.ttl).await
    }

    pub async fn online_count(&self, slug: &str) -> Result<usize, PresenceError> {
        if slug.is_empty() { return Ok(0); }
        check_segment(slug)?;
        self.store.count_prefix(&format!("{NAMESPACE}:{slug}:")).await
    }
}

fn check_segment(value: &str) -> Result<(), PresenceError> {
    if value.contains(':') {
        return Err(PresenceError::InvalidId(value.to_string()));
    }
    Ok(())
}

/// Opaque per-browser identifier, persisted in client storage.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VisitorId(String);

impl VisitorId {
    /// Reuse the stored id or mint and store a fresh one. Storage failures
    /// only cost stability across sessions.
    pub fn load_or_create(storage: &dyn ClientStorage) -> Self {
        match storage.load(VISITOR_ID_KEY) {
            Ok(Some(id)) if !id.trim().is_empty() && !id.contains(':') => return Self(id.trim().to_string()),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "visitor id storage unavailable"),
        }
        let id = Uuid::new_v4().to_string();
        if let Err(e) = storage.save(VISITOR_ID_KEY, &id) {
            tracing::warn!(error = %e, "failed to persist visitor id");
        }
        Self(id)
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for VisitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("presence id {0:?} must not contain ':'")]
    InvalidId(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, StorageError};

    fn approximator() -> (Arc<InMemoryExpiringStore>, PresenceApproximator) {
        let store = Arc::new(InMemoryExpiringStore::new());
        (store.clone(), PresenceApproximator::new(store, PRESENCE_TTL))
    }

    #[tokio::test]
    async fn test_counts_distinct_visitors_per_store() {
        let (_, presence) = approximator();
        presence.heartbeat("joes", "v1").await.unwrap();
        presence.heartbeat("joes", "v2").await.unwrap();
        presence.heartbeat("joes", "v1").await.unwrap();
        presence.heartbeat("anas", "v3").await.unwrap();

        assert_eq!(presence.online_count("joes").await.unwrap(), 2);
        assert_eq!(presence.online_count("anas").await.unwrap(), 1);
        assert_eq!(presence.online_count("nobody").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_slug_prefix_does_not_leak() {
        let (_, presence) = approximator();
        presence.heartbeat("joe", "v1").await.unwrap();
        presence.heartbeat("joes", "v2").await.unwrap();
        assert_eq!(presence.online_count("joe").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_and_invalid_ids() {
        let (store, presence) = approximator();
        presence.heartbeat("", "v1").await.unwrap();
        presence.heartbeat("joes", "").await.unwrap();
        assert!(store.is_empty());
        assert_eq!(presence.online_count("").await.unwrap(), 0);

        assert!(matches!(presence.heartbeat("joes", "a:b").await, Err(PresenceError::InvalidId(_))));
        assert!(matches!(presence.online_count("a:b").await, Err(PresenceError::InvalidId(_))));
    }

    #[test]
    fn test_expiry_is_refreshed_not_accumulated() {
        let store = InMemoryExpiringStore::new();
        let start = Instant::now();
        store.put_until("live:joes:v1", start + PRESENCE_TTL);
        store.put_until("live:joes:v1", start + Duration::from_secs(30) + PRESENCE_TTL);

        assert_eq!(store.count_prefix_at("live:joes:", start + Duration::from_secs(89)), 1);
        assert_eq!(store.count_prefix_at("live:joes:", start + Duration::from_secs(90)), 0);
    }

    #[test]
    fn test_purge_drops_only_expired() {
        let store = InMemoryExpiringStore::new();
        let now = Instant::now();
        store.put_until("live:joes:old", now + Duration::from_secs(1));
        store.put_until("live:joes:new", now + PRESENCE_TTL);
        assert_eq!(store.purge_expired_at(now + Duration::from_secs(2)), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.count_prefix_at("live:joes:", now + Duration::from_secs(2)), 1);
    }

    #[test]
    fn test_visitor_id_is_stable() {
        let storage = MemoryStorage::new();
        let first = VisitorId::load_or_create(&storage);
        let second = VisitorId::load_or_create(&storage);
        assert_eq!(first, second);
        assert_eq!(storage.load(VISITOR_ID_KEY).unwrap().as_deref(), Some(first.as_str()));
    }

    #[test]
    fn test_visitor_id_without_storage() {
        struct Unavailable;
        impl ClientStorage for Unavailable {
            fn load(&self, _: &str) -> Result<Option<String>, StorageError> { Err(StorageError::Unavailable("blocked".into())) }
            fn save(&self, _: &str, _: &str) -> Result<(), StorageError> { Err(StorageError::Unavailable("blocked".into())) }
        }
        let a = VisitorId::load_or_create(&Unavailable);
        let b = VisitorId::load_or_create(&Unavailable);
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }
}
