use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use crate::clock::Clock;

struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
    seq: u64,
}

/// Bounded map whose entries expire after a fixed TTL.
///
/// When full, expired entries are dropped first, then the oldest insertion.
pub struct ExpiringCache<K, V> {
    entries: HashMap<K, Entry<V>>,
    ttl: Duration,
    capacity: usize,
    clock: Arc<dyn Clock>,
    next_seq: u64,
}

impl<K: Eq + Hash + Clone, V: Clone> ExpiringCache<K, V> {
    pub fn new(ttl: Duration, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            capacity: capacity.max(1),
            clock,
            next_seq: 0,
        }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        let now = self.clock.utc_now();
        let entry = self.entries.get(key)?;
        if entry.expires_at > now {
            return Some(entry.value.clone());
        }
        self.entries.remove(key);
        None
    }

    pub fn insert(&mut self, key: K, value: V) {
        let now = self.clock.utc_now();
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.entries.retain(|_, e| e.expires_at > now);
            if self.entries.len() >= self.capacity {
                self.evict_oldest();
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            key,
            Entry {
                value,
                expires_at: now + self.ttl,
                seq,
            },
        );
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.seq)
            .map(|(k, _)| k.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;

    fn cache(capacity: usize) -> (ExpiringCache<String, u32>, Arc<TestClock>) {
        let clock = Arc::new(TestClock::new(Utc::now()));
        let cache = ExpiringCache::new(Duration::minutes(10), capacity, clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_get_before_and_after_expiry() {
        let (mut cache, clock) = cache(4);
        cache.insert("squat".to_string(), 1);
        assert_eq!(cache.get(&"squat".to_string()), Some(1));

        clock.advance(Duration::minutes(11));
        assert_eq!(cache.get(&"squat".to_string()), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let (mut cache, _clock) = cache(2);
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);
        cache.insert("c".to_string(), 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a".to_string()), None);
        assert_eq!(cache.get(&"c".to_string()), Some(3));
    }

    #[test]
    fn test_expired_entries_evicted_before_live_ones() {
        let (mut cache, clock) = cache(2);
        cache.insert("old".to_string(), 1);
        clock.advance(Duration::minutes(8));
        cache.insert("fresh".to_string(), 2);
        clock.advance(Duration::minutes(3));

        // "old" is expired, "fresh" is live
        cache.insert("new".to_string(), 3);
        assert_eq!(cache.get(&"fresh".to_string()), Some(2));
        assert_eq!(cache.get(&"new".to_string()), Some(3));
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let (mut cache, _clock) = cache(2);
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);
        cache.insert("a".to_string(), 10);
        assert_eq!(cache.get(&"a".to_string()), Some(10));
        assert_eq!(cache.get(&"b".to_string()), Some(2));
    }
}
