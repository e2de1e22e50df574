use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Cached answer for a key. Absence from the cache means unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedValue {
    Exists,
    DoesNotExist,
    Id(Uuid),
}

/// Process-local short-TTL cache used to short-circuit existence and
/// name-resolution checks without consulting an actor. Never
/// authoritative: misses and contradictions fall through to the actor.
pub struct MemoryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, CachedValue)>>,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<CachedValue> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some((stored_at, value)) if stored_at.elapsed() < self.ttl => Some(*value),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: &str, value: CachedValue) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), (Instant::now(), value));
        }
    }

    pub fn invalidate(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    /// Drops every expired entry. Callers may run this opportunistically;
    /// correctness never depends on it.
    pub fn prune(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            let ttl = self.ttl;
            entries.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tristate_values() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        assert_eq!(cache.get("owner/alice"), None);

        cache.set("owner/alice", CachedValue::Exists);
        assert_eq!(cache.get("owner/alice"), Some(CachedValue::Exists));

        cache.set("owner/bob", CachedValue::DoesNotExist);
        assert_eq!(cache.get("owner/bob"), Some(CachedValue::DoesNotExist));

        let id = Uuid::new_v4();
        cache.set("owner-name/alice", CachedValue::Id(id));
        assert_eq!(cache.get("owner-name/alice"), Some(CachedValue::Id(id)));
    }

    #[test]
    fn test_entries_expire_absolutely() {
        let cache = MemoryCache::new(Duration::from_millis(10));
        cache.set("k", CachedValue::Exists);
        assert_eq!(cache.get("k"), Some(CachedValue::Exists));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_invalidate_and_prune() {
        let cache = MemoryCache::new(Duration::from_millis(10));
        cache.set("a", CachedValue::Exists);
        cache.set("b", CachedValue::DoesNotExist);
        cache.invalidate("a");
        assert_eq!(cache.get("a"), None);
        std::thread::sleep(Duration::from_millis(20));
        cache.prune();
        assert!(cache.is_empty());
    }
}
