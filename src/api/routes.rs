use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::config::EVENT_LOG_CAPACITY;
use crate::display::DisplayState;
use crate::radar_refresh::RadarController;
use crate::types::{LoggedEvent, RankedView, RefreshOutcome};

const DEFAULT_EVENT_LIMIT: usize = 50;

#[derive(Clone)]
pub struct ApiState {
    pub controller: Arc<RadarController>,
    pub display: Arc<DisplayState>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/radar", get(get_radar))
        .route("/radar/latest", get(get_latest))
        .route("/radar/refresh", post(post_refresh))
        .route("/radar/clear", post(post_clear))
        .route("/radar/events", get(get_events))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub refresh_cycles: u64,
    pub degraded_cycles: u64,
    pub empty_cycles: u64,
    pub in_flight: u64,
    pub cached_items: u64,
    /// Epoch ms; absent until the first cycle finishes.
    pub last_refresh_at_ms: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LatencyResponse {
    pub p50_ms: Option<u64>,
    pub p95_ms: Option<u64>,
    pub p99_ms: Option<u64>,
    pub sample_count: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_radar(State(state): State<ApiState>) -> Json<RankedView> {
    Json(state.controller.ranked_view().await)
}

/// The last view rendered by a refresh or clear, without re-deriving. Null before the first one.
async fn get_latest(State(state): State<ApiState>) -> Json<Option<RankedView>> {
    Json(state.display.latest_view())
}

async fn post_refresh(State(state): State<ApiState>) -> Json<RefreshOutcome> {
    Json(state.controller.refresh(true).await)
}

async fn post_clear(State(state): State<ApiState>) -> Json<RankedView> {
    Json(state.controller.clear().await)
}

async fn get_events(
    State(state): State<ApiState>,
    Query(params): Query<EventsQuery>,
) -> Json<Vec<LoggedEvent>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .min(EVENT_LOG_CAPACITY);
    Json(state.display.recent_events(limit))
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let health = state.controller.health();
    let last = health.last_refresh_at_ms();
    Json(HealthResponse {
        refresh_cycles: health.refresh_cycles(),
        degraded_cycles: health.degraded_cycles(),
        empty_cycles: health.empty_cycles(),
        in_flight: health.in_flight(),
        cached_items: health.cached_items(),
        last_refresh_at_ms: (last > 0).then_some(last),
    })
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let latency = state.controller.latency();
    let (p50_ms, p95_ms, p99_ms) = latency.percentiles();
    Json(LatencyResponse {
        p50_ms,
        p95_ms,
        p99_ms,
        sample_count: latency.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::config::ScoringConfig;
    use crate::db::MemoryBlobStore;
    use crate::error::Result;
    use crate::fetcher::{EnrichOutcome, MarketSource};
    use crate::state::CacheStore;
    use crate::types::RawListing;

    struct OneListing;

    #[async_trait]
    impl MarketSource for OneListing {
        async fn discover(&self) -> Result<Vec<String>> {
            Ok(vec!["token-1".to_string()])
        }

        async fn enrich(&self, _ids: &[String]) -> Result<EnrichOutcome> {
            Ok(EnrichOutcome {
                listings: vec![RawListing {
                    pair_id: "pair-1".into(),
                    base_symbol: "WIF".into(),
                    quote_symbol: "USDC".into(),
                    liquidity_usd: 250_000.0,
                    volume_24h: 3_000_000.0,
                    change_1h: 12.0,
                    ..RawListing::default()
                }],
                batches: 1,
                ..EnrichOutcome::default()
            })
        }
    }

    async fn serve() -> String {
        let display = Arc::new(DisplayState::new());
        let controller = RadarController::open(
            Arc::new(OneListing),
            CacheStore::new(Arc::new(MemoryBlobStore::new()), "cache"),
            display.clone(),
            ScoringConfig::default(),
            Duration::from_secs(3600),
        )
        .await;
        let app = router(ApiState { controller: Arc::new(controller), display });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn refresh_then_read_radar() {
        let base = serve().await;
        let client = reqwest::Client::new();

        let latest: Value =
            client.get(format!("{base}/radar/latest")).send().await.unwrap().json().await.unwrap();
        assert!(latest.is_null());

        let empty: Value = client.get(format!("{base}/radar")).send().await.unwrap().json().await.unwrap();
        assert_eq!(empty["items"].as_array().unwrap().len(), 0);
        assert!(empty["bestPick"].is_null());

        let outcome: Value = client
            .post(format!("{base}/radar/refresh"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(outcome["manual"], true);
        assert_eq!(outcome["status"]["state"], "updated");
        assert_eq!(outcome["view"]["bestPick"]["key"], "pair-1");

        let latest: Value =
            client.get(format!("{base}/radar/latest")).send().await.unwrap().json().await.unwrap();
        assert_eq!(latest["bestPick"]["key"], "pair-1");

        let view: Value = client.get(format!("{base}/radar")).send().await.unwrap().json().await.unwrap();
        assert_eq!(view["items"][0]["displayName"], "WIF/USDC");
        assert_eq!(view["items"][0]["isPreferredQuote"], true);

        let health: HealthResponse =
            client.get(format!("{base}/health")).send().await.unwrap().json().await.unwrap();
        assert_eq!(health.refresh_cycles, 1);
        assert_eq!(health.cached_items, 1);
        assert!(health.last_refresh_at_ms.is_some());

        let latency: LatencyResponse =
            client.get(format!("{base}/stats/latency")).send().await.unwrap().json().await.unwrap();
        assert_eq!(latency.sample_count, 1);
        assert!(latency.p50_ms.is_some());
    }

    #[tokio::test]
    async fn clear_and_events() {
        let base = serve().await;
        let client = reqwest::Client::new();

        client.post(format!("{base}/radar/refresh")).send().await.unwrap();
        let cleared: Value = client
            .post(format!("{base}/radar/clear"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(cleared["items"].as_array().unwrap().len(), 0);

        let events: Vec<Value> = client
            .get(format!("{base}/radar/events?limit=2"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["event"]["kind"], "cleared");
        assert_eq!(events[0]["message"], "CACHE: cleared");

        let health: HealthResponse =
            client.get(format!("{base}/health")).send().await.unwrap().json().await.unwrap();
        assert_eq!(health.cached_items, 0);
    }
}
