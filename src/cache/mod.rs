//! File-backed TTL cache
//!
//! Each namespace is a single JSON document on disk mapping keys to
//! timestamped entries. Reads that fail or find an expired entry are
//! misses; writes that fail are logged and swallowed so a full disk
//! never aborts a scan.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::CacheConfig;

/// One cached entry: insertion time plus an opaque payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub timestamp: DateTime<Utc>,
    pub data: Value,
}

/// A single TTL-scoped namespace backed by one JSON file
#[derive(Debug, Clone)]
pub struct Cache {
    name: String,
    ttl: Duration,
    path: PathBuf,
}

impl Cache {
    pub fn new(name: impl Into<String>, ttl: Duration, dir: &Path) -> Self {
        let name = name.into();
        let path = dir.join(format!("{}.json", name));
        Self { name, ttl, path }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fetch a live entry, or None on miss, expiry, or unreadable file
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let doc = self.read_doc()?;
        let entry = doc.get(key)?;
        let age = Utc::now().signed_duration_since(entry.timestamp);
        // An entry exactly at its TTL is already expired
        if age.num_milliseconds() < 0 || age.to_std().ok()? >= self.ttl {
            return None;
        }
        match serde_json::from_value(entry.data.clone()) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(cache = %self.name, key, %err, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Store an entry with the current timestamp. Failures are swallowed.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        let data = match serde_json::to_value(value) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(cache = %self.name, key, %err, "Failed to serialize cache entry");
                return;
            }
        };
        let mut doc = self.read_doc().unwrap_or_default();
        doc.insert(
            key.to_string(),
            CacheEntry {
                timestamp: Utc::now(),
                data,
            },
        );
        if let Err(err) = self.write_doc(&doc) {
            tracing::warn!(cache = %self.name, key, %err, "Failed to write cache file");
        }
    }

    /// Age of a live entry, or None if absent/expired
    pub fn get_age(&self, key: &str) -> Option<Duration> {
        let doc = self.read_doc()?;
        let entry = doc.get(key)?;
        let age = Utc::now()
            .signed_duration_since(entry.timestamp)
            .to_std()
            .ok()?;
        if age >= self.ttl {
            return None;
        }
        Some(age)
    }

    /// Drop one entry; absent keys are a no-op
    pub fn remove(&self, key: &str) {
        let Some(mut doc) = self.read_doc() else {
            return;
        };
        if doc.remove(key).is_none() {
            return;
        }
        if let Err(err) = self.write_doc(&doc) {
            tracing::warn!(cache = %self.name, key, %err, "Failed to write cache file");
        }
    }

    /// Drop every entry in this namespace
    pub fn clear(&self) {
        if self.path.exists() {
            if let Err(err) = std::fs::remove_file(&self.path) {
                tracing::warn!(cache = %self.name, %err, "Failed to clear cache file");
            }
        }
    }

    /// Live entry count (expired entries excluded)
    pub fn len(&self) -> usize {
        let Some(doc) = self.read_doc() else {
            return 0;
        };
        let now = Utc::now();
        doc.values()
            .filter(|e| {
                now.signed_duration_since(e.timestamp)
                    .to_std()
                    .map(|age| age < self.ttl)
                    .unwrap_or(false)
            })
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_doc(&self) -> Option<HashMap<String, CacheEntry>> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(doc) => Some(doc),
            Err(err) => {
                tracing::warn!(cache = %self.name, %err, "Corrupt cache file, treating as empty");
                None
            }
        }
    }

    fn write_doc(&self, doc: &HashMap<String, CacheEntry>) -> Result<(), std::io::Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(doc)?;
        std::fs::write(&self.path, json)
    }
}

/// Owns the per-namespace caches; constructed once and passed by reference
#[derive(Debug, Clone)]
pub struct CacheManager {
    scan_results: Cache,
    universe: Cache,
    quotes: Cache,
}

impl CacheManager {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            scan_results: Cache::new(
                "scan_results",
                Duration::from_secs(config.scan_results_ttl_secs),
                &config.dir,
            ),
            universe: Cache::new(
                "universe",
                Duration::from_secs(config.universe_ttl_secs),
                &config.dir,
            ),
            quotes: Cache::new(
                "quotes",
                Duration::from_secs(config.quotes_ttl_secs),
                &config.dir,
            ),
        }
    }

    pub fn scan_results(&self) -> &Cache {
        &self.scan_results
    }

    pub fn universe(&self) -> &Cache {
        &self.universe
    }

    pub fn quotes(&self) -> &Cache {
        &self.quotes
    }

    /// Clear all namespaces
    pub fn clear_all(&self) {
        self.scan_results.clear();
        self.universe.clear();
        self.quotes.clear();
    }
}
