//! One-shot nonce registry.
//!
//! A proof is accepted at most once: after successful verification its
//! nonce is reserved here, and any later attempt with the same nonce is
//! refused. The registry is process-local and non-persistent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;

use crate::sweep::{SweeperHandle, spawn_sweeper};

/// How often expired reservations are evicted.
pub const SWEEP_PERIOD: Duration = Duration::from_secs(60);

/// In-process set of used nonces with time-based eviction.
#[derive(Debug, Default)]
pub struct NonceRegistry {
    entries: Mutex<HashMap<String, i64>>,
}

impl NonceRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Atomically reserve a nonce until `expiry_ms` (epoch milliseconds).
    ///
    /// Returns false if the nonce is already reserved.
    pub fn try_reserve(&self, nonce: &str, expiry_ms: i64) -> bool {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(nonce) {
            return false;
        }
        entries.insert(nonce.to_string(), expiry_ms);
        true
    }

    /// Drop reservations whose expiry is in the past.
    pub fn sweep(&self) {
        let now_ms = Utc::now().timestamp_millis();
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, expiry_ms| *expiry_ms > now_ms);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start the periodic sweep. The task holds a weak reference and
    /// exits once every owner of the registry is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> SweeperHandle {
        let registry = Arc::downgrade(self);
        spawn_sweeper(SWEEP_PERIOD, move || match registry.upgrade() {
            Some(registry) => {
                registry.sweep();
                true
            }
            None => false,
        })
    }
}
