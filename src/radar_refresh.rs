use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::config::ScoringConfig;
use crate::display::RadarDisplay;
use crate::error::Result;
use crate::fetcher::MarketSource;
use crate::ranking::ranked_view;
use crate::scorer::build_item;
use crate::state::{CacheStore, RadarCache};
use crate::types::{now_ms, RadarEvent, RankedView, RefreshOutcome, RefreshStatus};

// ---------------------------------------------------------------------------
// RadarController
// ---------------------------------------------------------------------------

/// Owns the radar context: the in-memory cache plus its collaborators.
/// All cache mutation goes through here.
pub struct RadarController {
    source: Arc<dyn MarketSource>,
    store: CacheStore,
    display: Arc<dyn RadarDisplay>,
    scoring: ScoringConfig,
    retention: Duration,
    /// Authoritative for this process. Held only to clone or replace, never across a network call.
    cache: RwLock<RadarCache>,
    health: Arc<HealthState>,
    latency: Arc<LatencyStats>,
}

enum CycleResult {
    NoCandidates,
    Merged {
        cache: RadarCache,
        upserted: usize,
        failed_batches: usize,
    },
}

impl RadarController {
    /// Load the persisted cache (fail-soft) and build the controller around it.
    pub async fn open(
        source: Arc<dyn MarketSource>,
        store: CacheStore,
        display: Arc<dyn RadarDisplay>,
        scoring: ScoringConfig,
        retention: Duration,
    ) -> Self {
        let cache = store.load().await;
        info!(entries = cache.len(), "Radar cache loaded");
        let health = Arc::new(HealthState::new());
        health.set_cached_items(cache.len());
        Self {
            source,
            store,
            display,
            scoring,
            retention,
            cache: RwLock::new(cache),
            health,
            latency: Arc::new(LatencyStats::new()),
        }
    }

    pub fn health(&self) -> Arc<HealthState> {
        Arc::clone(&self.health)
    }

    pub fn latency(&self) -> Arc<LatencyStats> {
        Arc::clone(&self.latency)
    }

    pub async fn refresh(&self, manual: bool) -> RefreshOutcome {
        self.refresh_at(manual, now_ms()).await
    }

    /// One full cycle at a fixed clock. Never fails: every error degrades to the cached view.
    pub async fn refresh_at(&self, manual: bool, now: i64) -> RefreshOutcome {
        let started = Instant::now();
        self.health.begin_cycle();

        // 1. Prune the snapshot and show the last known good view before any network I/O.
        let mut snapshot = self.cache.read().await.clone();
        let evicted = snapshot.evict_expired(self.retention, now);
        self.display.report(RadarEvent::CacheLoaded { entries: snapshot.len(), evicted });
        self.persist(&snapshot).await;
        if evicted > 0 {
            *self.cache.write().await = snapshot.clone();
        }
        let initial = ranked_view(&snapshot, now);
        self.display.render(&initial);

        // Network phase. The snapshot is owned by the cycle from here on.
        let (status, view, cached) = match self.run_cycle(snapshot.clone(), now).await {
            Ok(CycleResult::NoCandidates) => {
                self.health.mark_empty();
                self.display.report(RadarEvent::NoCandidates);
                (RefreshStatus::NoCandidates, initial, snapshot.len())
            }
            Ok(CycleResult::Merged { cache, upserted, failed_batches }) => {
                self.persist(&cache).await;
                let view = ranked_view(&cache, now);
                let cached = cache.len();
                *self.cache.write().await = cache;

                self.display.report(RadarEvent::Updated {
                    upserted,
                    cached,
                    ranked: view.items.len(),
                });
                self.display.render(&view);
                (RefreshStatus::Updated { upserted, failed_batches }, view, cached)
            }
            Err(e) => {
                warn!(manual, "Radar refresh failed, keeping cached view: {e}");
                self.health.mark_degraded();
                self.display.report(RadarEvent::RefreshFailed { error: e.to_string() });
                self.display.render(&initial);
                (RefreshStatus::Degraded { reason: e.to_string() }, initial, snapshot.len())
            }
        };

        let elapsed = started.elapsed();
        self.latency.record(elapsed);
        self.health.end_cycle(now, cached);

        info!(
            manual,
            ranked = view.items.len(),
            cached,
            elapsed_ms = elapsed.as_millis() as u64,
            hot = view.is_hot(),
            best = view.best_pick.as_ref().map(|b| b.display_name.as_str()).unwrap_or("none"),
            "Radar refresh complete",
        );

        RefreshOutcome { manual, status, view }
    }

    async fn run_cycle(&self, mut cache: RadarCache, now: i64) -> Result<CycleResult> {
        let ids = self.source.discover().await?;
        if ids.is_empty() {
            return Ok(CycleResult::NoCandidates);
        }

        let enriched = self.source.enrich(&ids).await?;
        for failure in &enriched.failures {
            self.display.report(RadarEvent::BatchFailed {
                batch: failure.batch,
                error: failure.error.clone(),
            });
        }

        let mut upserted = 0usize;
        for listing in &enriched.listings {
            if listing.pair_id.trim().is_empty() {
                continue;
            }
            cache.upsert(build_item(listing, now, &self.scoring));
            upserted += 1;
        }

        // Covers entries that were not re-observed this cycle.
        cache.evict_expired(self.retention, now);

        Ok(CycleResult::Merged {
            cache,
            upserted,
            failed_batches: enriched.failures.len(),
        })
    }

    /// Best-effort save: failure is logged and reported, never propagated.
    async fn persist(&self, cache: &RadarCache) {
        if let Err(e) = self.store.save(cache).await {
            warn!(entries = cache.len(), "Radar cache save failed: {e}");
            self.display.report(RadarEvent::PersistFailed { error: e.to_string() });
        }
    }

    /// Consumer read: re-derived from the in-memory cache after an eviction pass.
    pub async fn ranked_view(&self) -> RankedView {
        self.ranked_view_at(now_ms()).await
    }

    pub async fn ranked_view_at(&self, now: i64) -> RankedView {
        let mut cache = self.cache.write().await;
        if cache.evict_expired(self.retention, now) > 0 {
            self.health.set_cached_items(cache.len());
        }
        ranked_view(&cache, now)
    }

    /// Operator action: wipe the persisted and in-memory cache and render an empty view.
    pub async fn clear(&self) -> RankedView {
        let now = now_ms();
        self.cache.write().await.clear();
        if let Err(e) = self.store.clear().await {
            warn!("Radar cache delete failed: {e}");
            self.display.report(RadarEvent::PersistFailed { error: e.to_string() });
        }
        self.health.set_cached_items(0);
        self.display.report(RadarEvent::Cleared);

        let view = RankedView { generated_at: now, ..RankedView::default() };
        self.display.render(&view);
        view
    }
}

// ---------------------------------------------------------------------------
// RefreshScheduler
// ---------------------------------------------------------------------------

/// Periodic refresh trigger. Each tick (the first is immediate) spawns an
/// independent cycle; a tick never waits for or cancels one already running.
pub struct RefreshScheduler;

impl RefreshScheduler {
    pub fn start(controller: Arc<RadarController>, every: Duration) -> SchedulerHandle {
        let every = every.max(Duration::from_millis(1));
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = every.as_secs_f64(), "Refresh scheduler started");

            loop {
                tokio::select! {
                    biased;
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let controller = Arc::clone(&controller);
                        tokio::spawn(async move {
                            controller.refresh(false).await;
                        });
                    }
                }
            }

            info!("Refresh scheduler stopped");
        });

        SchedulerHandle { stop_tx, task }
    }
}

pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop ticking. Idempotent; in-flight cycles run to completion.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_running(&self) -> bool {
        !*self.stop_tx.borrow() && !self.task.is_finished()
    }

    /// Stop and wait for the ticking task to exit.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.task.await {
            warn!("Refresh scheduler task ended abnormally: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
