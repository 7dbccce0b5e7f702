use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::config::CacheConfig;

struct CachedAnswer {
    text: String,
    expires_at: Instant,
}

/// In-process answer cache shared by every request.
///
/// Entries expire after the configured TTL and the least recently used entry
/// is evicted once capacity is reached. Expired entries read as absent and are
/// dropped on access or by [`AnswerCache::purge_expired`].
#[derive(Clone)]
pub struct AnswerCache {
    cache: Arc<Mutex<LruCache<String, CachedAnswer>>>,
    ttl: Duration,
}

impl AnswerCache {
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, Duration::from_secs(config.ttl_secs))
    }

    /// Key for a `(user, question)` pair. The question is used verbatim.
    ///
    /// The user id is length-prefixed so no two distinct pairs share a key.
    pub fn key(user_id: &str, question: &str) -> String {
        format!("{}:{}:{}", user_id.len(), user_id, question)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let mut cache = self.lock();
        match cache.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.text.clone()),
            Some(_) => {
                cache.pop(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: String, value: String) {
        self.insert_with_ttl(key, value, self.ttl);
    }

    pub fn insert_with_ttl(&self, key: String, value: String, ttl: Duration) {
        let entry = CachedAnswer {
            text: value,
            expires_at: Instant::now() + ttl,
        };
        self.lock().put(key, entry);
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut cache = self.lock();
        let expired: Vec<String> = cache
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            cache.pop(key);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // A poisoned lock only means another request panicked mid-update; the map
    // itself is still consistent.
    fn lock(&self) -> MutexGuard<'_, LruCache<String, CachedAnswer>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
