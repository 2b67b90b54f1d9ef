//! `DashMap`-backed in-memory `Correlator`, grounded in the
//! `InMemoryStorage` (`infrastructure/storage/memory.rs`) pattern and the Go
//! `RedisCache`'s TTL/key semantics (`original_source/service/ocpp/redis-cache.go`):
//! a `request:{uuid}` hash with a 24h TTL and a `{broker_id}` processed
//! marker with the same TTL.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use async_trait::async_trait;

use super::traits::{CacheError, Correlator, Meta, PendingRequest};

struct Entry<T> {
    value: T,
    expires_at: DateTime<Utc>,
}

impl<T> Entry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Utc::now() + ttl,
        }
    }

    fn is_live(&self) -> bool {
        Utc::now() < self.expires_at
    }
}

/// In-process reference implementation of [`Correlator`]. Used for local
/// runs and tests; a Redis-backed implementation satisfying the same trait
/// is the production binding (out of scope — the message-bus client it
/// would sit beside is an external collaborator per SPEC_FULL.md §1).
pub struct DashMapCorrelator {
    processed: DashMap<String, Entry<()>>,
    pending: DashMap<String, Entry<PendingRequest>>,
    ttl: Duration,
}

impl DashMapCorrelator {
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            processed: DashMap::new(),
            pending: DashMap::new(),
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    /// Drops expired entries. Not called on every operation (that would
    /// serialize all workers on one map); callers sweep periodically.
    pub fn sweep(&self) {
        self.processed.retain(|_, e| e.is_live());
        self.pending.retain(|_, e| e.is_live());
    }
}

impl Default for DashMapCorrelator {
    fn default() -> Self {
        Self::new(86_400)
    }
}

#[async_trait]
impl Correlator for DashMapCorrelator {
    async fn has_processed(&self, broker_id: &str) -> Result<bool, CacheError> {
        Ok(self
            .processed
            .get(broker_id)
            .map(|e| e.is_live())
            .unwrap_or(false))
    }

    async fn mark_processed(&self, broker_id: &str) -> Result<(), CacheError> {
        self.processed
            .insert(broker_id.to_string(), Entry::new((), self.ttl));
        Ok(())
    }

    async fn get_request(&self, unique_id: &str) -> Result<PendingRequest, CacheError> {
        self.pending
            .get(unique_id)
            .filter(|e| e.is_live())
            .map(|e| e.value.clone())
            .ok_or_else(|| CacheError::NotFound(unique_id.to_string()))
    }

    /// Duplicate inbound `unique_id` while a prior pending entry is still
    /// live leaves that entry untouched and returns success rather than
    /// overwriting it (I4).
    async fn put_request(&self, meta: &Meta, req: PendingRequest) -> Result<(), CacheError> {
        match self.pending.entry(req.unique_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(occ) if occ.get().is_live() => {}
            dashmap::mapref::entry::Entry::Occupied(mut occ) => {
                occ.insert(Entry::new(req, self.ttl));
            }
            dashmap::mapref::entry::Entry::Vacant(vac) => {
                vac.insert(Entry::new(req, self.ttl));
            }
        }
        self.mark_processed(&meta.broker_id).await
    }

    async fn remove_request(&self, meta: &Meta, unique_id: &str) -> Result<(), CacheError> {
        self.pending
            .remove(unique_id)
            .ok_or_else(|| CacheError::NotFound(unique_id.to_string()))?;
        self.mark_processed(&meta.broker_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocpp::ActionKind;
    use serde_json::json;

    fn meta(broker_id: &str) -> Meta {
        Meta {
            broker_id: broker_id.to_string(),
            serial_number: "SN1".to_string(),
        }
    }

    #[tokio::test]
    async fn has_processed_false_until_marked() {
        let cache = DashMapCorrelator::default();
        assert!(!cache.has_processed("b1").await.unwrap());
        cache.mark_processed("b1").await.unwrap();
        assert!(cache.has_processed("b1").await.unwrap());
    }

    #[tokio::test]
    async fn put_then_get_then_remove_round_trips() {
        let cache = DashMapCorrelator::default();
        let req = PendingRequest {
            unique_id: "u1".into(),
            action: ActionKind::Heartbeat,
            payload: json!({}),
            serial_number: "SN1".into(),
        };
        cache.put_request(&meta("b1"), req).await.unwrap();
        assert!(cache.has_processed("b1").await.unwrap());

        let fetched = cache.get_request("u1").await.unwrap();
        assert_eq!(fetched.unique_id, "u1");

        cache.remove_request(&meta("b2"), "u1").await.unwrap();
        assert!(cache.get_request("u1").await.is_err());
    }

    #[tokio::test]
    async fn remove_unknown_uuid_fails_not_found() {
        let cache = DashMapCorrelator::default();
        assert!(matches!(
            cache.remove_request(&meta("b1"), "missing").await,
            Err(CacheError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_unique_id_while_pending_does_not_overwrite() {
        let cache = DashMapCorrelator::default();
        let first = PendingRequest {
            unique_id: "u1".into(),
            action: ActionKind::Heartbeat,
            payload: json!({"first": true}),
            serial_number: "SN1".into(),
        };
        cache.put_request(&meta("b1"), first).await.unwrap();

        let second = PendingRequest {
            unique_id: "u1".into(),
            action: ActionKind::Heartbeat,
            payload: json!({"first": false}),
            serial_number: "SN1".into(),
        };
        cache.put_request(&meta("b2"), second).await.unwrap();

        let fetched = cache.get_request("u1").await.unwrap();
        assert_eq!(fetched.payload, json!({"first": true}));
        assert!(cache.has_processed("b2").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_unique_id_after_expiry_overwrites() {
        let cache = DashMapCorrelator::new(86_400);
        cache.pending.insert(
            "u1".into(),
            Entry::new(
                PendingRequest {
                    unique_id: "u1".into(),
                    action: ActionKind::Heartbeat,
                    payload: json!({"first": true}),
                    serial_number: "SN1".into(),
                },
                Duration::seconds(-1),
            ),
        );

        let second = PendingRequest {
            unique_id: "u1".into(),
            action: ActionKind::Heartbeat,
            payload: json!({"first": false}),
            serial_number: "SN1".into(),
        };
        cache.put_request(&meta("b2"), second).await.unwrap();
        let fetched = cache.get_request("u1").await.unwrap();
        assert_eq!(fetched.payload, json!({"first": false}));
    }

    #[tokio::test]
    async fn expired_entry_is_treated_as_absent() {
        let cache = DashMapCorrelator::new(-1);
        cache.mark_processed("b1").await.unwrap();
        assert!(!cache.has_processed("b1").await.unwrap());
    }
}
