//! Shared health state for the /health endpoint.
//! Updated by RadarController at the start and end of every refresh cycle.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    /// Cycles that finished, whatever their outcome.
    pub refresh_cycles: AtomicU64,
    /// Cycles that fell back to the cached view.
    pub degraded_cycles: AtomicU64,
    /// Cycles where discovery returned no candidates.
    pub empty_cycles: AtomicU64,
    /// Cycles currently running. Overlap is allowed, so this can exceed 1.
    pub in_flight: AtomicU64,
    /// Epoch ms of the last finished cycle (0 = none).
    pub last_refresh_at_ms: AtomicI64,
    /// Items in the in-memory cache after the last cycle.
    pub cached_items: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_cycle(&self) {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn end_cycle(&self, at_ms: i64, cached_items: usize) {
        // Saturating: a begin/end pair is always matched, but never wrap on misuse.
        let _ = self
            .in_flight
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)));
        self.refresh_cycles.fetch_add(1, Ordering::Relaxed);
        self.last_refresh_at_ms.store(at_ms, Ordering::Relaxed);
        self.cached_items.store(cached_items as u64, Ordering::Relaxed);
    }

    pub fn mark_degraded(&self) {
        self.degraded_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mark_empty(&self) {
        self.empty_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_cached_items(&self, n: usize) {
        self.cached_items.store(n as u64, Ordering::Relaxed);
    }

    pub fn refresh_cycles(&self) -> u64 {
        self.refresh_cycles.load(Ordering::Relaxed)
    }

    pub fn degraded_cycles(&self) -> u64 {
        self.degraded_cycles.load(Ordering::Relaxed)
    }

    pub fn empty_cycles(&self) -> u64 {
        self.empty_cycles.load(Ordering::Relaxed)
    }

    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn last_refresh_at_ms(&self) -> i64 {
        self.last_refresh_at_ms.load(Ordering::Relaxed)
    }

    pub fn cached_items(&self) -> u64 {
        self.cached_items.load(Ordering::Relaxed)
    }
}
