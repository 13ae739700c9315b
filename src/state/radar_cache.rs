use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{CacheEntry, RadarItem};

// ---------------------------------------------------------------------------
// RadarCache
// ---------------------------------------------------------------------------

/// key → `{capturedAt, item}`. Keys are unique; order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RadarCache {
    entries: HashMap<String, CacheEntry>,
}

impl RadarCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by `item.key`. Re-observing a listing refreshes its
    /// score and timestamp; it never creates a second entry.
    pub fn upsert(&mut self, item: RadarItem) {
        let captured_at = item.captured_at;
        self.entries
            .insert(item.key.clone(), CacheEntry { captured_at, item });
    }

    /// Remove every entry with `captured_at < now - retention`. Returns how many were removed.
    pub fn evict_expired(&mut self, retention: Duration, now_ms: i64) -> usize {
        let retention_ms = i64::try_from(retention.as_millis()).unwrap_or(i64::MAX);
        let cutoff = now_ms.saturating_sub(retention_ms);
        let before = self.entries.len();
        self.entries.retain(|_, e| e.captured_at >= cutoff);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!(evicted, remaining = self.entries.len(), "evicted expired radar items");
        }
        evicted
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    #[cfg(test)]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn items(&self) -> impl Iterator<Item = &RadarItem> {
        self.entries.values().map(|e| &e.item)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn insert_entry(&mut self, key: String, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR_MS: i64 = 3_600_000;

    fn item(key: &str, captured_at: i64, score: f64) -> RadarItem {
        RadarItem {
            key: key.to_string(),
            display_name: format!("{key}/USDC"),
            liquidity_usd: 100_000.0,
            volume_24h: 500_000.0,
            change_1h: 0.0,
            score,
            panic_level: 0,
            is_preferred_quote: true,
            captured_at,
            url: String::new(),
        }
    }

    #[test]
    fn upsert_same_key_keeps_one_latest_entry() {
        let mut cache = RadarCache::new();
        cache.upsert(item("p1", 1_000, 10.0));
        cache.upsert(item("p1", 2_000, 55.0));

        assert_eq!(cache.len(), 1);
        let entry = cache.get("p1").unwrap();
        assert_eq!(entry.captured_at, 2_000);
        assert_eq!(entry.item.score, 55.0);
    }

    #[test]
    fn eviction_keeps_only_entries_inside_the_window() {
        let window = Duration::from_secs(100 * 3600);
        let now = 1_000 * HOUR_MS;
        let mut cache = RadarCache::new();
        cache.upsert(item("fresh", now - HOUR_MS, 1.0));
        cache.upsert(item("edge", now - 100 * HOUR_MS, 1.0));
        cache.upsert(item("stale", now - 101 * HOUR_MS, 1.0));
        cache.upsert(item("ancient", 0, 1.0));

        let evicted = cache.evict_expired(window, now);

        assert_eq!(evicted, 2);
        assert!(cache.contains("fresh"));
        assert!(cache.contains("edge"));
        assert!(!cache.contains("stale"));
        for e in cache.items() {
            assert!(now - e.captured_at <= window.as_millis() as i64);
        }
    }

    #[test]
    fn eviction_on_empty_cache_is_a_noop() {
        let mut cache = RadarCache::new();
        assert_eq!(cache.evict_expired(Duration::from_secs(1), 0), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn unbounded_retention_keeps_everything() {
        let mut cache = RadarCache::new();
        cache.upsert(item("old", 0, 1.0));
        cache.upsert(item("new", 5, 1.0));
        assert_eq!(cache.evict_expired(Duration::MAX, 10), 0);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn serializes_as_plain_object_keyed_by_pair() {
        let mut cache = RadarCache::new();
        cache.upsert(item("p1", 5, 1.0));
        let v = serde_json::to_value(&cache).unwrap();
        assert!(v.is_object());
        assert_eq!(v["p1"]["capturedAt"], 5);
        assert_eq!(v["p1"]["item"]["key"], "p1");
    }
}
