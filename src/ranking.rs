use std::cmp::Ordering;

use crate::state::RadarCache;
use crate::types::{RadarItem, RankedView};

/// Zero-liquidity or zero-volume entries are noise, not actionable.
fn is_actionable(item: &RadarItem) -> bool {
    item.liquidity_usd > 0.0 && item.volume_24h > 0.0
}

/// Preferred quote first, then score descending. Remaining ties break on key
/// so the same cache always ranks the same way.
fn rank_order(a: &RadarItem, b: &RadarItem) -> Ordering {
    b.is_preferred_quote
        .cmp(&a.is_preferred_quote)
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| a.key.cmp(&b.key))
}

pub fn rank_items<'a>(items: impl IntoIterator<Item = &'a RadarItem>) -> Vec<RadarItem> {
    let mut ranked: Vec<RadarItem> = items
        .into_iter()
        .filter(|i| is_actionable(i))
        .cloned()
        .collect();
    ranked.sort_by(rank_order);
    ranked
}

/// Project a cache into the consumer-facing view. The caller is responsible
/// for evicting expired entries first.
pub fn ranked_view(cache: &RadarCache, now_ms: i64) -> RankedView {
    let items = rank_items(cache.items());
    let best_pick = items.first().cloned();
    RankedView { items, best_pick, generated_at: now_ms }
}
