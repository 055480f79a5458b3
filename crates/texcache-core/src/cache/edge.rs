use crate::cache::tasks::BackgroundTasks;
use bytes::Bytes;
use lru::LruCache;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Query parameter carrying the cache version in edge keys.
pub const VERSION_PARAM: &str = "v";

/// A response as the edge cache stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRecord {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl EdgeRecord {
    /// Bytes charged against the cache budget.
    fn weight(&self, key: &str) -> usize {
        let headers: usize = self.headers.iter().map(|(n, v)| n.len() + v.len()).sum();
        key.len() + headers + self.body.len()
    }
}

#[derive(Debug)]
struct EdgeEntry {
    record: EdgeRecord,
    expires_at: Instant,
    weight: usize,
}

#[derive(Debug)]
struct Inner {
    max_bytes: usize,
    total_bytes: usize,
    lru: LruCache<String, EdgeEntry>,
}

impl Inner {
    fn remove(&mut self, key: &str) {
        if let Some(entry) = self.lru.pop(key) {
            self.total_bytes = self.total_bytes.saturating_sub(entry.weight);
        }
    }

    fn sweep_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .lru
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.remove(&key);
        }
    }
}

/// URL-keyed response cache with per-entry freshness.
///
/// Bounded by a byte budget over keys, headers and bodies. Inserting past the
/// budget first drops expired entries, then least-recently-used ones.
#[derive(Debug)]
pub struct EdgeCache {
    version: String,
    inner: Mutex<Inner>,
}

impl EdgeCache {
    pub fn new(version: impl Into<String>, max_bytes: usize) -> Self {
        Self {
            version: version.into(),
            inner: Mutex::new(Inner {
                max_bytes,
                total_bytes: 0,
                lru: LruCache::unbounded(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The request URL with the cache version injected as a query parameter.
    pub fn key_for(&self, request_url: &str) -> String {
        match url::Url::parse(request_url) {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair(VERSION_PARAM, &self.version);
                url.to_string()
            }
            Err(_) => format!("{}#{}={}", request_url, VERSION_PARAM, self.version),
        }
    }

    /// A fresh record for `key`; stale ones are evicted.
    pub fn get(&self, key: &str) -> Option<EdgeRecord> {
        let now = Instant::now();
        let mut inner = self.lock();
        if let Some(entry) = inner.lru.get(key) {
            if entry.expires_at > now {
                return Some(entry.record.clone());
            }
        } else {
            return None;
        }
        inner.remove(key);
        None
    }

    pub fn put(&self, key: String, record: EdgeRecord, ttl: Duration) {
        let now = Instant::now();
        let weight = record.weight(&key);
        let mut inner = self.lock();
        inner.remove(&key);
        if weight > inner.max_bytes {
            log::debug!("Edge record for {} exceeds the cache budget; not stored", key);
            return;
        }

        if inner.total_bytes + weight > inner.max_bytes {
            inner.sweep_expired(now);
        }
        while inner.total_bytes + weight > inner.max_bytes {
            let Some((_, evicted)) = inner.lru.pop_lru() else {
                inner.total_bytes = 0;
                break;
            };
            inner.total_bytes = inner.total_bytes.saturating_sub(evicted.weight);
        }

        inner.total_bytes += weight;
        inner.lru.put(
            key,
            EdgeEntry {
                record,
                expires_at: now + ttl,
                weight,
            },
        );
    }

    /// Schedules the write on `tasks` so the caller never waits on it.
    pub fn put_detached(
        self: &Arc<Self>,
        tasks: &BackgroundTasks,
        key: String,
        record: EdgeRecord,
        ttl: Duration,
    ) {
        let cache = Arc::clone(self);
        tasks.spawn(async move {
            cache.put(key, record, ttl);
        });
    }

    pub fn len(&self) -> usize {
        self.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().lru.is_empty()
    }

    /// Bytes currently charged against the budget.
    pub fn size_bytes(&self) -> usize {
        self.lock().total_bytes
    }
}
