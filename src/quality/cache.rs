//! TTL-bounded cache of code-quality analyses.

use super::analyzer::CodeQualityAnalysis;
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// Cache key: hash of the (language, code) pair.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct CacheKey([u8; 32]);

impl CacheKey {
    pub(crate) fn for_request(language: &str, code: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(language.as_bytes());
        hasher.update([0u8]);
        hasher.update(code.as_bytes());
        CacheKey(hasher.finalize().into())
    }

    pub(crate) fn to_hex(self) -> String {
        hex::encode(&self.0[..8])
    }
}

struct CachedAnalysis {
    inserted: Instant,
    analysis: CodeQualityAnalysis,
}

/// LRU cache whose entries expire after a fixed TTL. Expired entries are
/// evicted lazily on lookup.
pub(crate) struct QualityCache {
    entries: Mutex<LruCache<CacheKey, CachedAnalysis>>,
    ttl: Duration,
}

impl QualityCache {
    pub(crate) fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub(crate) fn get(&self, key: &CacheKey) -> Option<CodeQualityAnalysis> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            None => return None,
            Some(cached) => cached.inserted.elapsed() >= self.ttl,
        };
        if expired {
            entries.pop(key);
            return None;
        }
        entries.get(key).map(|cached| cached.analysis.clone())
    }

    pub(crate) fn put(&self, key: CacheKey, analysis: CodeQualityAnalysis) {
        self.entries.lock().put(
            key,
            CachedAnalysis {
                inserted: Instant::now(),
                analysis,
            },
        );
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(score: f64) -> CodeQualityAnalysis {
        CodeQualityAnalysis {
            score,
            bug_density: 0.1,
            optimization_level: 0.5,
            maintainability: 70.0,
            security_issues: 0.0,
            efficiency: 0.8,
        }
    }

    #[test]
    fn test_key_distinguishes_language() {
        let a = CacheKey::for_request("python", "print(1)");
        let b = CacheKey::for_request("rust", "print(1)");
        assert_ne!(a, b);
        assert_eq!(a, CacheKey::for_request("python", "print(1)"));
    }

    #[test]
    fn test_hit_within_ttl() {
        let cache = QualityCache::new(8, Duration::from_secs(3600));
        let key = CacheKey::for_request("python", "x = 1");

        cache.put(key, analysis(90.0));
        assert_eq!(cache.get(&key).unwrap().score, 90.0);
    }

    #[test]
    fn test_expired_entry_evicted() {
        // Zero TTL: every entry is already expired on lookup.
        let cache = QualityCache::new(8, Duration::ZERO);
        let key = CacheKey::for_request("python", "x = 1");

        cache.put(key, analysis(90.0));
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = QualityCache::new(2, Duration::from_secs(3600));
        let k1 = CacheKey::for_request("python", "a");
        let k2 = CacheKey::for_request("python", "b");
        let k3 = CacheKey::for_request("python", "c");

        cache.put(k1, analysis(1.0));
        cache.put(k2, analysis(2.0));
        cache.put(k3, analysis(3.0));

        assert!(cache.get(&k1).is_none());
        assert!(cache.get(&k3).is_some());
    }
}
