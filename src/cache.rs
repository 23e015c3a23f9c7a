//! # Ephemeral Cache
//! In-memory TTL key-value store shared by the aggregator and the market
//! read-models.
//!
//! Values are stored type-erased behind `Arc`, so one instance can hold event
//! lists, indicators and contracts under separate keys, and a hit hands back
//! the very same allocation that was stored. Expiry is lazy: a read past
//! `expires_at` evicts the entry and reports a miss. No background sweep.

use std::{
    any::Any,
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

/// Millisecond clock; swapped for `ManualClock` in tests.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Monotonic wall clock.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock for deterministic TTL tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: u64,
}

/// Thread-safe TTL cache.
pub struct TtlCache {
    inner: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Cached value for `key`, or `None` on miss, expiry, or type mismatch.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let now = self.clock.now_ms();
        let mut map = self.inner.lock().expect("cache mutex poisoned");

        let expired = match map.get(key) {
            None => return None,
            Some(e) => now > e.expires_at,
        };
        if expired {
            map.remove(key);
            return None;
        }
        map.get(key)
            .and_then(|e| Arc::clone(&e.value).downcast::<T>().ok())
    }

    /// Store `value` under `key` for `ttl`, overwriting unconditionally.
    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: Arc<T>, ttl: Duration) {
        let expires_at = self.clock.now_ms().saturating_add(ttl.as_millis() as u64);
        let mut map = self.inner.lock().expect("cache mutex poisoned");
        map.insert(key.into(), Entry { value, expires_at });
    }

    /// Drop every entry whose key starts with `prefix` (an exact key is its
    /// own prefix). Returns how many entries were removed.
    pub fn invalidate(&self, prefix: &str) -> usize {
        let mut map = self.inner.lock().expect("cache mutex poisoned");
        let before = map.len();
        map.retain(|k, _| !k.starts_with(prefix));
        before - map.len()
    }

    /// Entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}
