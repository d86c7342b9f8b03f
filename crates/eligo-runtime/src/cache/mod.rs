//! Response caching layer
//!
//! Cache-aside storage for raw data-source responses, keyed by the
//! resolved key pattern. Shared across requests behind a mutex; entries
//! expire by TTL on read.

use eligo_core::Value;
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

/// Cached raw response wrapper
#[derive(Debug, Clone)]
pub struct CachedEntry {
    /// The cached response body
    pub value: Value,

    /// When the entry was created
    pub cached_at: SystemTime,

    /// TTL duration
    pub ttl: Duration,
}

impl CachedEntry {
    /// Create a new cache entry
    pub fn new(value: Value, ttl: Duration) -> Self {
        Self {
            value,
            cached_at: SystemTime::now(),
            ttl,
        }
    }

    /// Check if the entry is still valid
    pub fn is_valid(&self) -> bool {
        match self.cached_at.elapsed() {
            Ok(elapsed) => elapsed < self.ttl,
            Err(_) => false,
        }
    }
}

/// In-memory cache for raw data-source responses
pub struct ResponseCache {
    entries: HashMap<String, CachedEntry>,
}

impl ResponseCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Get a cached response if present and unexpired
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).and_then(|entry| {
            if entry.is_valid() {
                Some(entry.value.clone())
            } else {
                None
            }
        })
    }

    /// Store a response with a TTL
    pub fn set(&mut self, key: String, value: Value, ttl: Duration) {
        self.entries.insert(key, CachedEntry::new(value, ttl));
    }

    /// Remove expired entries
    pub fn cleanup(&mut self) {
        self.entries.retain(|_, entry| entry.is_valid());
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries, including expired ones not yet cleaned up
    pub fn size(&self) -> usize {
        self.entries.len()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}
