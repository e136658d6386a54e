//! Backend connection cache.
//!
//! Opening a backend can be expensive (an HTTP round-trip to check a bucket,
//! a `git rev-parse` to verify a reference). A [`BackendCache`] passed to
//! [`resolve()`](crate::resolve) keeps recently opened handles around for
//! later runs with the same location and credentials. Nothing is cached
//! unless the caller creates and passes one.

use filecat_storage::BackendHandle;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Identity of an opened backend: a BLAKE3 fingerprint of everything that
/// went into opening it. Secrets contribute to the fingerprint but are never
/// stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(blake3::Hash);

impl CacheKey {
    pub fn new<'a>(parts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            // Length-prefixed, so ("ab", "c") and ("a", "bc") differ.
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        Self(hasher.finalize())
    }
}

/// Least-recently-used cache of backend handles.
///
/// Holds at most `capacity` handles; inserting into a full cache evicts the
/// handle that was used longest ago. Handles are immutable and shared
/// (`Arc`), so an evicted handle stays valid for runs still holding it.
pub struct BackendCache {
    inner: Mutex<LruCache<CacheKey, BackendHandle>>,
}

impl BackendCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.lock().cap()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Fetch a handle, marking it as most recently used.
    pub fn get(&self, key: &CacheKey) -> Option<BackendHandle> {
        self.lock().get(key).cloned()
    }

    /// Store a handle, evicting the least recently used one if full.
    pub fn insert(&self, key: CacheKey, handle: BackendHandle) {
        if let Some((evicted, _)) = self.lock().push(key, handle)
            && evicted != key
        {
            tracing::debug!(backend = ?evicted, "Evicted backend from cache");
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, BackendHandle>> {
        // The cache is never left half-updated, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filecat_storage::backend::MockBackend;
    use std::sync::Arc;

    fn handle(name: &str) -> BackendHandle {
        Arc::new(MockBackend::default().with_name(name))
    }

    fn capacity(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_key_is_length_prefixed() {
        assert_eq!(CacheKey::new(["s3", "bucket"]), CacheKey::new(["s3", "bucket"]));
        assert_ne!(CacheKey::new(["ab", "c"]), CacheKey::new(["a", "bc"]));
    }

    #[test]
    fn test_key_does_not_contain_secret() {
        let key = CacheKey::new(["s3", "bucket", "AKIA", "hunter2"]);
        assert!(!format!("{key:?}").contains("hunter2"));
    }

    #[test]
    fn test_get_returns_same_handle() {
        let cache = BackendCache::new(capacity(2));
        let key = CacheKey::new(["a"]);
        let original = handle("a");
        cache.insert(key, original.clone());
        assert!(Arc::ptr_eq(&cache.get(&key).unwrap(), &original));
        assert!(cache.get(&CacheKey::new(["b"])).is_none());
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = BackendCache::new(capacity(2));
        let (a, b, c) = (CacheKey::new(["a"]), CacheKey::new(["b"]), CacheKey::new(["c"]));
        cache.insert(a, handle("a"));
        cache.insert(b, handle("b"));
        // Touch `a`, so `b` is now the oldest.
        assert!(cache.get(&a).is_some());
        cache.insert(c, handle("c"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&a).is_some());
        assert!(cache.get(&b).is_none());
        assert_eq!(cache.get(&c).unwrap().name(), "c");
    }

    #[test]
    fn test_reinsert_does_not_evict() {
        let cache = BackendCache::new(capacity(1));
        let a = CacheKey::new(["a"]);
        cache.insert(a, handle("a1"));
        cache.insert(a, handle("a2"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.capacity().get(), 1);
        assert_eq!(cache.get(&a).unwrap().name(), "a2");
    }
}
