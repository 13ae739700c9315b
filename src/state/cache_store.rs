use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::db::BlobStore;
use crate::error::Result;
use crate::scorer::listing_scorer::panic_level;
use crate::state::radar_cache::RadarCache;
use crate::types::CacheEntry;

/// Persistence adapter for the radar cache: one named blob holding
/// `{ key: {capturedAt, item} }`. No business logic lives here.
pub struct CacheStore {
    blobs: Arc<dyn BlobStore>,
    key: String,
}

impl CacheStore {
    pub fn new(blobs: Arc<dyn BlobStore>, key: impl Into<String>) -> Self {
        Self { blobs, key: key.into() }
    }

    /// Fails soft: missing, unreadable, invalid JSON, or a non-object blob
    /// all yield an empty cache. Entries that don't deserialize are dropped.
    pub async fn load(&self) -> RadarCache {
        let raw = match self.blobs.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                info!(key = %self.key, "No persisted radar cache, starting empty");
                return RadarCache::new();
            }
            Err(e) => {
                warn!(key = %self.key, "Radar cache read failed, starting empty: {e}");
                return RadarCache::new();
            }
        };
        parse_cache(&raw)
    }

    /// Best-effort write; the caller decides how to report a failure.
    pub async fn save(&self, cache: &RadarCache) -> Result<()> {
        let json = serde_json::to_string(cache)?;
        self.blobs.put(&self.key, &json).await?;
        debug!(entries = cache.len(), "radar cache saved");
        Ok(())
    }

    /// Delete the persisted blob unconditionally.
    pub async fn clear(&self) -> Result<()> {
        self.blobs.delete(&self.key).await
    }
}

/// Parse a persisted blob, treating any structural problem as "absent".
pub fn parse_cache(raw: &str) -> RadarCache {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!("Persisted radar cache is not valid JSON, discarding: {e}");
            return RadarCache::new();
        }
    };

    let Some(obj) = value.as_object() else {
        warn!("Persisted radar cache is not a JSON object, discarding");
        return RadarCache::new();
    };

    let mut cache = RadarCache::new();
    let mut dropped = 0usize;
    for (key, v) in obj {
        match serde_json::from_value::<CacheEntry>(v.clone()) {
            Ok(entry) if is_consistent(key, &entry) => cache.insert_entry(key.clone(), entry),
            _ => dropped += 1,
        }
    }
    if dropped > 0 {
        warn!(dropped, kept = cache.len(), "Dropped unreadable radar cache entries");
    }
    cache
}

/// A stored entry must agree with what `build_item` would have produced:
/// slot key equals item key, timestamps match, score in [0, 100] and the
/// panic level is the band of that score.
fn is_consistent(key: &str, entry: &CacheEntry) -> bool {
    let item = &entry.item;
    item.key == key
        && !key.trim().is_empty()
        && entry.captured_at == item.captured_at
        && item.score.is_finite()
        && (0.0..=100.0).contains(&item.score)
        && item.panic_level == panic_level(item.score)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryBlobStore;
    use crate::types::RadarItem;

    fn item(key: &str) -> RadarItem {
        RadarItem {
            key: key.to_string(),
            display_name: "A/B".to_string(),
            liquidity_usd: 1.0,
            volume_24h: 1.0,
            change_1h: 0.0,
            score: 12.5,
            panic_level: 0,
            is_preferred_quote: false,
            captured_at: 77,
            url: "https://example.test/p".to_string(),
        }
    }

    fn store() -> (Arc<MemoryBlobStore>, CacheStore) {
        let blobs = Arc::new(MemoryBlobStore::new());
        let store = CacheStore::new(blobs.clone(), "cache");
        (blobs, store)
    }

    #[tokio::test]
    async fn missing_blob_loads_empty() {
        let (_, store) = store();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn invalid_json_loads_empty() {
        let (blobs, store) = store();
        blobs.put("cache", "{not json").await.unwrap();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn array_instead_of_object_loads_empty() {
        let (blobs, store) = store();
        blobs.put("cache", "[{\"capturedAt\":1}]").await.unwrap();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn bad_entries_are_dropped_good_ones_kept() {
        let (blobs, store) = store();
        let good = serde_json::to_value(CacheEntry { captured_at: 77, item: item("good") }).unwrap();
        let blob = serde_json::json!({ "good": good, "bad": { "capturedAt": "yesterday" }, "worse": 3 });
        blobs.put("cache", &blob.to_string()).await.unwrap();

        let cache = store.load().await;
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("good"));
    }

    #[test]
    fn entries_contradicting_scoring_invariants_are_dropped() {
        let entry = |key: &str, f: fn(&mut CacheEntry)| {
            let mut e = CacheEntry { captured_at: 77, item: item(key) };
            f(&mut e);
            serde_json::to_value(e).unwrap()
        };
        let blob = serde_json::json!({
            "ok": entry("ok", |_| {}),
            "renamed": entry("p1", |_| {}),
            "too-hot": entry("too-hot", |e| { e.item.score = 500.0; e.item.panic_level = 4; }),
            "negative": entry("negative", |e| e.item.score = -1.0),
            "wrong-level": entry("wrong-level", |e| e.item.panic_level = 9),
            "skewed": entry("skewed", |e| e.captured_at = 78),
        });

        let cache = parse_cache(&blob.to_string());

        assert_eq!(cache.len(), 1);
        assert!(cache.contains("ok"));
        assert!(cache.items().all(|i| (0.0..=100.0).contains(&i.score)));
    }

    #[tokio::test]
    async fn save_then_load_restores_entries() {
        let (_, store) = store();
        let mut cache = RadarCache::new();
        cache.upsert(item("p1"));
        cache.upsert(item("p2"));
        store.save(&cache).await.unwrap();

        assert_eq!(store.load().await, cache);
    }

    #[tokio::test]
    async fn clear_removes_the_blob() {
        let (blobs, store) = store();
        let mut cache = RadarCache::new();
        cache.upsert(item("p1"));
        store.save(&cache).await.unwrap();

        store.clear().await.unwrap();
        assert!(blobs.get("cache").await.unwrap().is_none());
        assert!(store.load().await.is_empty());
    }
}
