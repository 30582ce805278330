//! Idempotent response cache.
//!
//! Entries bind a client-chosen key to the request hash they answered,
//! so a replay is only served when the same key carries the same
//! request. The trait is object-safe and async so operators can back it
//! with a shared network store.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;

use crate::sweep::{SweeperHandle, spawn_sweeper};
use crate::types::StoredResponse;

/// Default entry lifetime: one hour.
pub const DEFAULT_TTL: Duration = Duration::from_millis(3_600_000);

/// How often expired entries are evicted.
pub const SWEEP_PERIOD: Duration = Duration::from_secs(300);

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Pluggable idempotency store. `get`/`set` are the whole surface.
pub trait IdempotencyStore: Send + Sync {
    /// Look up a stored response. Expired entries read as missing.
    fn get(&self, key: &str) -> StoreFuture<'static, Option<StoredResponse>>;

    /// Store a response under a key, replacing any previous entry.
    fn set(&self, key: &str, response: StoredResponse) -> StoreFuture<'static, ()>;
}

struct Entry {
    response: StoredResponse,
    expires_at_ms: i64,
}

/// In-process store with per-entry TTL and periodic eviction.
pub struct MemoryIdempotencyStore {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
}

impl MemoryIdempotencyStore {
    pub fn new() -> Arc<Self> {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Arc<Self> {
        Arc::new(MemoryIdempotencyStore {
            entries: Mutex::new(HashMap::new()),
            ttl,
        })
    }

    /// Drop entries whose TTL has elapsed.
    pub fn sweep(&self) {
        let now_ms = Utc::now().timestamp_millis();
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, entry| entry.expires_at_ms > now_ms);
    }

    /// Start the periodic sweep. The task holds a weak reference and
    /// exits once every owner of the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> SweeperHandle {
        let store = Arc::downgrade(self);
        spawn_sweeper(SWEEP_PERIOD, move || match store.upgrade() {
            Some(store) => {
                store.sweep();
                true
            }
            None => false,
        })
    }

    fn lookup(&self, key: &str) -> Option<StoredResponse> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some(entry) if entry.expires_at_ms > Utc::now().timestamp_millis() => {
                Some(entry.response.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn insert(&self, key: &str, response: StoredResponse) {
        let expires_at_ms = Utc::now().timestamp_millis() + self.ttl.as_millis() as i64;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                key.to_string(),
                Entry {
                    response,
                    expires_at_ms,
                },
            );
    }
}

impl IdempotencyStore for MemoryIdempotencyStore {
    fn get(&self, key: &str) -> StoreFuture<'static, Option<StoredResponse>> {
        let result = self.lookup(key);
        Box::pin(std::future::ready(result))
    }

    fn set(&self, key: &str, response: StoredResponse) -> StoreFuture<'static, ()> {
        self.insert(key, response);
        Box::pin(std::future::ready(()))
    }
}
