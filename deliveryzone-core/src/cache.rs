//! Read-through cache for postcode lookups.
//!
//! [`LookupCache`] is the injected abstraction; [`MemoryCache`] is the
//! in-process implementation. Entries expire against an injected [`Clock`]
//! and are never invalidated explicitly. Concurrent misses for the same key
//! may both compute and insert; the stored value is identical either way.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::postcode::PostcodeLookup;
use crate::{BackendError, Clock};

const HOUR: Duration = Duration::from_secs(60 * 60);

/// Expiry applied to cached lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Lifetime of a successful lookup.
    pub found_ttl: Duration,
    /// Lifetime of a "not found" lookup; `None` disables negative caching.
    pub missing_ttl: Option<Duration>,
}

impl CachePolicy {
    /// How long `lookup` should be cached, or `None` to skip caching.
    #[must_use]
    pub const fn ttl_for(&self, lookup: &PostcodeLookup) -> Option<Duration> {
        match lookup {
            PostcodeLookup::Found(_) => Some(self.found_ttl),
            PostcodeLookup::Missing => self.missing_ttl,
        }
    }
}

impl Default for CachePolicy {
    /// Hits live for 24 hours, misses for one hour.
    fn default() -> Self {
        Self {
            found_ttl: HOUR.saturating_mul(24),
            missing_ttl: Some(HOUR),
        }
    }
}

/// Key-value cache with per-entry expiry.
pub trait LookupCache {
    /// Return the live entry stored under `key`.
    fn get(&self, key: &str) -> Option<PostcodeLookup>;

    /// Store `value` under `key` for `ttl`.
    fn insert(&self, key: &str, value: PostcodeLookup, ttl: Duration);

    /// Return the cached value for `key`, computing and caching it on a miss.
    ///
    /// The computed value is cached for the lifetime `policy` assigns to it.
    /// Errors from `compute` are returned as-is and leave the cache untouched.
    ///
    /// # Errors
    /// Propagates the error returned by `compute`.
    fn get_or_compute<F>(
        &self,
        key: &str,
        policy: &CachePolicy,
        compute: F,
    ) -> Result<PostcodeLookup, BackendError>
    where
        F: FnOnce() -> Result<PostcodeLookup, BackendError>,
    {
        if let Some(cached) = self.get(key) {
            return Ok(cached);
        }
        let value = compute()?;
        if let Some(ttl) = policy.ttl_for(&value) {
            self.insert(key, value, ttl);
        }
        Ok(value)
    }
}

impl<T: LookupCache> LookupCache for &T {
    fn get(&self, key: &str) -> Option<PostcodeLookup> {
        (**self).get(key)
    }

    fn insert(&self, key: &str, value: PostcodeLookup, ttl: Duration) {
        (**self).insert(key, value, ttl);
    }
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    value: PostcodeLookup,
    expires_at: DateTime<Utc>,
}

/// Process-wide in-memory [`LookupCache`].
///
/// Expired entries are ignored on read and dropped on the next insert, so the
/// map only holds keys looked up within their TTL.
#[derive(Debug)]
pub struct MemoryCache<C> {
    clock: C,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl<C: Clock> MemoryCache<C> {
    /// Create an empty cache that reads time from `clock`.
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored entries, including any that expired since the last
    /// insert.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C: Clock> LookupCache for MemoryCache<C> {
    fn get(&self, key: &str) -> Option<PostcodeLookup> {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value)
    }

    fn insert(&self, key: &str, value: PostcodeLookup, ttl: Duration) {
        let now = self.clock.now();
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(key.to_owned(), CacheEntry { value, expires_at });
    }
}
