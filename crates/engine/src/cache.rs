//! Keyed TTL cache, injected into adapters as a capability.
//!
//! Replaces the module-global species cache the upstream services kept:
//! the owner of the cache decides its lifetime and TTL, and adapters
//! only ever see the handle they were given.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Process-wide map from request key to `(value, expiry)`. Expired
/// entries are evicted on read.
pub struct TtlCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<String, (V, Instant)>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a live entry, evicting it if its TTL has lapsed.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((_, expiry)) if *expiry <= Instant::now() => {
                entries.remove(key);
                None
            }
            Some((value, _)) => Some(value.clone()),
            None => None,
        }
    }

    /// Insert or refresh an entry with a full TTL.
    pub async fn put(&self, key: &str, value: V) {
        let expiry = Instant::now() + self.ttl;
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), (value, expiry));
    }
}
