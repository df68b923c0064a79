// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! In-memory store of finished scrape results, keyed by normalized URL.
//!
//! Only complete `ScrapeResponse` records are ever stored. Entries live
//! until the [`EvictionPolicy`] removes them; the default policy never does.

use crate::models::scrape::ScrapeResponse;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Keyed store of scrape results
pub trait ResponseStore: Send + Sync {
    fn get(&self, key: &str) -> Option<ScrapeResponse>;
    fn put(&self, key: &str, response: ScrapeResponse);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounds on how long and how many entries are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// Least recently used entries are dropped beyond this count
    pub max_entries: Option<NonZeroUsize>,
    /// Entries older than this are treated as absent
    pub ttl: Option<Duration>,
}

impl EvictionPolicy {
    /// Keep everything for the life of the process.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = NonZeroUsize::new(max_entries);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

struct CacheEntry {
    response: ScrapeResponse,
    stored_at: Instant,
}

/// [`ResponseStore`] backed by an LRU map
pub struct MemoryStore {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Option<Duration>,
}

impl MemoryStore {
    pub fn new(policy: EvictionPolicy) -> Self {
        let entries = match policy.max_entries {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            entries: Mutex::new(entries),
            ttl: policy.ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, CacheEntry>> {
        // The map is never left half-updated, so a poisoned lock is still usable
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        self.ttl
            .is_some_and(|ttl| now.duration_since(entry.stored_at) >= ttl)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(EvictionPolicy::unbounded())
    }
}

impl ResponseStore for MemoryStore {
    fn get(&self, key: &str) -> Option<ScrapeResponse> {
        let mut entries = self.lock();
        let now = Instant::now();

        let expired = match entries.get(key) {
            Some(entry) if !self.is_expired(entry, now) => return Some(entry.response.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    fn put(&self, key: &str, response: ScrapeResponse) {
        let entry = CacheEntry {
            response,
            stored_at: Instant::now(),
        };
        self.lock().put(key.to_string(), entry);
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}
