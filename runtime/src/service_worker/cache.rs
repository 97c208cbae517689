//! Cache API Implementation
//!
//! The [`CacheStorage`] capability a host hands to its workers, and an
//! in-memory implementation. Buckets keep their creation order; lookups across
//! the namespace search them in that order, like the platform's global
//! `caches.match`.

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use spin::RwLock;

use super::fetch::{Request, Response};
use crate::error::StorageError;
use crate::url::Url;

/// Default quota for an origin's cache storage (50 MB).
pub const DEFAULT_QUOTA: usize = 50 * 1024 * 1024;

/// Estimated per-entry overhead on top of the body (URL, headers).
const ENTRY_OVERHEAD: usize = 256;

/// Named-bucket storage shared by every version of a worker on an origin.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a bucket, creating it if absent.
    async fn open(&self, name: &str) -> Result<(), StorageError>;

    /// Whether a bucket exists.
    async fn has(&self, name: &str) -> Result<bool, StorageError>;

    /// All bucket names in creation order.
    async fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Delete a bucket. Returns `false` if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, StorageError>;

    /// Store a batch of entries in one bucket. Either every entry is
    /// written or none is.
    async fn put_all(
        &self,
        name: &str,
        entries: Vec<(Request, Response)>,
    ) -> Result<(), StorageError>;

    /// Exact match within one bucket.
    async fn match_in(
        &self,
        name: &str,
        request: &Request,
    ) -> Result<Option<Response>, StorageError>;

    /// Exact match across every bucket, oldest bucket first.
    async fn match_any(&self, request: &Request) -> Result<Option<Response>, StorageError>;
}

/// A cached request-response pair
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    request: Request,
    response: Response,
}

impl CacheEntry {
    fn size(&self) -> usize {
        self.response.body.len() + ENTRY_OVERHEAD
    }
}

/// A single named bucket
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cache {
    name: String,
    /// Cache key -> entry
    entries: BTreeMap<String, CacheEntry>,
}

impl Cache {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: BTreeMap::new(),
        }
    }

    /// Get cache name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exact match on method and URL (fragment ignored).
    pub fn match_request(&self, request: &Request) -> Option<&Response> {
        self.entries.get(&cache_key(request)).map(|e| &e.response)
    }

    fn put(&mut self, request: Request, response: Response) {
        let key = cache_key(&request);
        self.entries.insert(key, CacheEntry { request, response });
    }

    /// Stored request URLs, sorted by cache key.
    pub fn urls(&self) -> Vec<&str> {
        self.entries.values().map(|e| e.request.url.as_str()).collect()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total size of entries in this cache
    pub fn size(&self) -> usize {
        self.entries.values().map(CacheEntry::size).sum()
    }
}

/// Make a cache key from a request
///
/// The URL is normalized the same way origins are compared, so
/// `https://host:443/a#top` and `https://HOST/a` share an entry.
fn cache_key(request: &Request) -> String {
    let url = match Url::parse(&request.url) {
        Ok(url) => url.href_without_fragment(),
        Err(_) => match request.url.find('#') {
            Some(pos) => request.url[..pos].to_string(),
            None => request.url.clone(),
        },
    };
    format!("{}:{}", request.method.as_str(), url)
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    caches: Vec<Cache>,
}

/// In-memory [`CacheStorage`].
///
/// Locks are only held for the duration of a single synchronous operation,
/// never across an await point.
pub struct MemoryCacheStorage {
    caches: RwLock<Vec<Cache>>,
    quota: usize,
}

impl MemoryCacheStorage {
    /// Create new cache storage with the default quota
    pub fn new() -> Self {
        Self::with_quota(DEFAULT_QUOTA)
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            caches: RwLock::new(Vec::new()),
            quota,
        }
    }

    /// Get quota
    pub fn quota(&self) -> usize {
        self.quota
    }

    /// Get usage across every bucket
    pub fn usage(&self) -> usize {
        self.caches.read().iter().map(Cache::size).sum()
    }

    /// Copy of a bucket, for inspection.
    pub fn cache(&self, name: &str) -> Option<Cache> {
        self.caches.read().iter().find(|c| c.name == name).cloned()
    }

    /// Bucket names in creation order.
    pub fn cache_names(&self) -> Vec<String> {
        self.caches.read().iter().map(|c| c.name.clone()).collect()
    }

    /// Encode every bucket with `postcard` so a host can persist the
    /// namespace.
    pub fn snapshot(&self) -> Result<Vec<u8>, StorageError> {
        let snapshot = Snapshot {
            caches: self.caches.read().clone(),
        };
        postcard::to_allocvec(&snapshot).map_err(|e| StorageError::Backend(e.to_string()))
    }

    /// Rebuild a storage from [`snapshot`](Self::snapshot) output.
    pub fn restore(bytes: &[u8], quota: usize) -> Result<Self, StorageError> {
        let snapshot: Snapshot =
            postcard::from_bytes(bytes).map_err(|e| StorageError::Corrupt(e.to_string()))?;
        log::debug!(
            "[CacheStorage] restored {} caches from snapshot",
            snapshot.caches.len()
        );
        Ok(Self {
            caches: RwLock::new(snapshot.caches),
            quota,
        })
    }
}

impl Default for MemoryCacheStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<(), StorageError> {
        let mut caches = self.caches.write();
        if !caches.iter().any(|c| c.name == name) {
            caches.push(Cache::new(name));
        }
        Ok(())
    }

    async fn has(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.caches.read().iter().any(|c| c.name == name))
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.cache_names())
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        let mut caches = self.caches.write();
        match caches.iter().position(|c| c.name == name) {
            Some(index) => {
                caches.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn put_all(
        &self,
        name: &str,
        entries: Vec<(Request, Response)>,
    ) -> Result<(), StorageError> {
        let mut caches = self.caches.write();
        let usage: usize = caches.iter().map(Cache::size).sum();
        let index = caches
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| StorageError::NotFound(name.to_string()))?;

        // Like addAll, a batch may not name the same request twice.
        let mut keys = BTreeSet::new();
        for (request, _) in &entries {
            if !keys.insert(cache_key(request)) {
                return Err(StorageError::DuplicateEntry(request.url.clone()));
            }
        }

        // Size the batch against what it replaces before touching the bucket.
        let cache = &caches[index];
        let added: usize = entries
            .iter()
            .map(|(_, response)| response.body.len() + ENTRY_OVERHEAD)
            .sum();
        let replaced: usize = keys
            .iter()
            .filter_map(|key| cache.entries.get(key))
            .map(CacheEntry::size)
            .sum();
        if usage.saturating_sub(replaced) + added > self.quota {
            return Err(StorageError::QuotaExceeded);
        }

        let cache = &mut caches[index];
        for (request, response) in entries {
            cache.put(request, response);
        }
        Ok(())
    }

    async fn match_in(
        &self,
        name: &str,
        request: &Request,
    ) -> Result<Option<Response>, StorageError> {
        Ok(self
            .caches
            .read()
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| c.match_request(request))
            .cloned())
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>, StorageError> {
        Ok(self
            .caches
            .read()
            .iter()
            .find_map(|c| c.match_request(request))
            .cloned())
    }
}
