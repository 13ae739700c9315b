use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

// ---------------------------------------------------------------------------
// RawListing: untrusted input from the market-data source
// ---------------------------------------------------------------------------

/// One pair as reported by the enrichment endpoint. Missing numeric fields are 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawListing {
    pub pair_id: String,
    pub base_symbol: String,
    pub quote_symbol: String,
    pub liquidity_usd: f64,
    pub volume_24h: f64,
    pub change_1h: f64,
    pub change_6h: f64,
    pub change_24h: f64,
    pub url: String,
}

// ---------------------------------------------------------------------------
// RadarItem: core-owned, derived from a RawListing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarItem {
    pub key: String,
    pub display_name: String,
    pub liquidity_usd: f64,
    pub volume_24h: f64,
    pub change_1h: f64,
    /// 0–100.
    pub score: f64,
    /// 0–4, step function of `score`.
    pub panic_level: u8,
    pub is_preferred_quote: bool,
    /// Unix epoch milliseconds of the last (re)computation.
    pub captured_at: i64,
    #[serde(default)]
    pub url: String,
}

/// Persisted form of one cache slot: `{ "capturedAt": ms, "item": {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub captured_at: i64,
    pub item: RadarItem,
}

// ---------------------------------------------------------------------------
// RankedView: what the display collaborator consumes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedView {
    pub items: Vec<RadarItem>,
    pub best_pick: Option<RadarItem>,
    pub generated_at: i64,
}

impl RankedView {
    /// True when the best pick is at or above the hot panic level.
    pub fn is_hot(&self) -> bool {
        self.best_pick
            .as_ref()
            .is_some_and(|p| p.panic_level >= crate::config::HOT_PANIC_LEVEL)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Display events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warn => write!(f, "warn"),
        }
    }
}

/// Diagnostics reported to the display collaborator during a refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RadarEvent {
    CacheLoaded { entries: usize, evicted: usize },
    NoCandidates,
    BatchFailed { batch: usize, error: String },
    Updated { upserted: usize, cached: usize, ranked: usize },
    RefreshFailed { error: String },
    PersistFailed { error: String },
    Cleared,
}

impl RadarEvent {
    pub fn severity(&self) -> Severity {
        match self {
            RadarEvent::BatchFailed { .. }
            | RadarEvent::RefreshFailed { .. }
            | RadarEvent::PersistFailed { .. } => Severity::Warn,
            _ => Severity::Info,
        }
    }
}

impl std::fmt::Display for RadarEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RadarEvent::CacheLoaded { entries, evicted } => {
                write!(f, "CACHE: {entries} items ({evicted} expired)")
            }
            RadarEvent::NoCandidates => write!(f, "RADAR: no candidates from discovery"),
            RadarEvent::BatchFailed { batch, error } => {
                write!(f, "RADAR: enrichment batch {batch} failed: {error}")
            }
            RadarEvent::Updated { upserted, cached, ranked } => {
                write!(f, "RADAR: {upserted} updated, {cached} cached, {ranked} ranked")
            }
            RadarEvent::RefreshFailed { error } => {
                write!(f, "RADAR: refresh failed, showing cached view: {error}")
            }
            RadarEvent::PersistFailed { error } => write!(f, "CACHE: save failed: {error}"),
            RadarEvent::Cleared => write!(f, "CACHE: cleared"),
        }
    }
}

/// An event as recorded by a display, with the time it was reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedEvent {
    pub at: i64,
    pub severity: Severity,
    pub message: String,
    pub event: RadarEvent,
}

// ---------------------------------------------------------------------------
// Refresh results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RefreshStatus {
    /// Fresh data merged. `failed_batches` counts enrichment batches that were skipped.
    Updated { upserted: usize, failed_batches: usize },
    /// Discovery returned nothing; the view is the pre-refresh one.
    NoCandidates,
    /// The cycle failed; the view is the pruned cached one.
    Degraded { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOutcome {
    pub manual: bool,
    pub status: RefreshStatus,
    pub view: RankedView,
}

/// Unix epoch milliseconds.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(panic_level: u8) -> RadarItem {
        RadarItem {
            key: "pair".to_string(),
            display_name: "A/USDC".to_string(),
            liquidity_usd: 1.0,
            volume_24h: 1.0,
            change_1h: 0.0,
            score: 70.0,
            panic_level,
            is_preferred_quote: true,
            captured_at: 0,
            url: String::new(),
        }
    }

    #[test]
    fn hot_requires_best_pick_at_level_three() {
        let mut view = RankedView::default();
        assert!(!view.is_hot());
        view.best_pick = Some(item(2));
        assert!(!view.is_hot());
        view.best_pick = Some(item(3));
        assert!(view.is_hot());
    }

    #[test]
    fn cache_entry_uses_camel_case_on_the_wire() {
        let entry = CacheEntry { captured_at: 42, item: item(1) };
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v["capturedAt"], 42);
        assert_eq!(v["item"]["displayName"], "A/USDC");
        assert_eq!(v["item"]["isPreferredQuote"], true);
    }

    #[test]
    fn warn_severity_for_failures_only() {
        assert_eq!(RadarEvent::NoCandidates.severity(), Severity::Info);
        assert_eq!(
            RadarEvent::BatchFailed { batch: 1, error: "x".into() }.severity(),
            Severity::Warn
        );
    }
}
