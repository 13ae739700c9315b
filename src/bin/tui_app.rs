use serde::Deserialize;

// ---------------------------------------------------------------------------
// API response types (mirror the radar server's JSON)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct ItemResponse {
    pub key: String,
    pub display_name: String,
    pub liquidity_usd: f64,
    pub volume_24h: f64,
    pub change_1h: f64,
    pub score: f64,
    pub panic_level: u8,
    pub is_preferred_quote: bool,
    pub captured_at: i64,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct ViewResponse {
    pub items: Vec<ItemResponse>,
    pub best_pick: Option<ItemResponse>,
    pub generated_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventResponse {
    pub at: i64,
    pub severity: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct HealthResponse {
    pub refresh_cycles: u64,
    pub degraded_cycles: u64,
    pub empty_cycles: u64,
    pub in_flight: u64,
    pub cached_items: u64,
    pub last_refresh_at_ms: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StatusResponse {
    Updated { upserted: usize, failed_batches: usize },
    NoCandidates,
    Degraded { reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutcomeResponse {
    pub status: StatusResponse,
}

/// Panic level at which the header goes red.
pub const HOT_PANIC_LEVEL: u8 = 3;

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub view: ViewResponse,
    pub events: Vec<EventResponse>,
    pub health: HealthResponse,
    /// Result line of the last operator action.
    pub last_action: Option<String>,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            view: ViewResponse::default(),
            events: Vec::new(),
            health: HealthResponse::default(),
            last_action: None,
            base_url,
        }
    }

    pub fn is_hot(&self) -> bool {
        self.view
            .best_pick
            .as_ref()
            .is_some_and(|p| p.panic_level >= HOT_PANIC_LEVEL)
    }

    /// Poll the read endpoints. The view is required; events and health are best effort.
    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let radar_url = format!("{}/radar", self.base_url);
        let events_url = format!("{}/radar/events?limit=20", self.base_url);
        let health_url = format!("{}/health", self.base_url);

        let (radar_res, events_res, health_res) = tokio::join!(
            client.get(&radar_url).send(),
            client.get(&events_url).send(),
            client.get(&health_url).send(),
        );

        let radar = match radar_res {
            Ok(resp) => resp.json::<ViewResponse>().await,
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };

        match radar {
            Ok(view) => {
                self.view = view;
                self.status = ConnectionStatus::Connected;
            }
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
                return;
            }
        }

        if let Ok(r) = events_res {
            if let Ok(events) = r.json::<Vec<EventResponse>>().await {
                self.events = events;
            }
        }
        if let Ok(r) = health_res {
            if let Ok(health) = r.json::<HealthResponse>().await {
                self.health = health;
            }
        }
    }

    /// POST /radar/refresh; blocks until the server finishes the cycle.
    pub async fn trigger_refresh(&mut self, client: &reqwest::Client) {
        let url = format!("{}/radar/refresh", self.base_url);
        self.last_action = Some(match client.post(&url).send().await {
            Ok(resp) => match resp.json::<OutcomeResponse>().await {
                Ok(outcome) => describe_status(&outcome.status),
                Err(e) => format!("refresh: bad response: {e}"),
            },
            Err(e) => format!("refresh failed: {e}"),
        });
        self.refresh(client).await;
    }

    pub async fn clear(&mut self, client: &reqwest::Client) {
        let url = format!("{}/radar/clear", self.base_url);
        self.last_action = Some(match client.post(&url).send().await {
            Ok(resp) if resp.status().is_success() => "cache cleared".to_string(),
            Ok(resp) => format!("clear failed: HTTP {}", resp.status()),
            Err(e) => format!("clear failed: {e}"),
        });
        self.refresh(client).await;
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn describe_status(status: &StatusResponse) -> String {
    match status {
        StatusResponse::Updated { upserted, failed_batches: 0 } => {
            format!("refreshed: {upserted} updated")
        }
        StatusResponse::Updated { upserted, failed_batches } => {
            format!("refreshed: {upserted} updated, {failed_batches} batches failed")
        }
        StatusResponse::NoCandidates => "refreshed: no candidates".to_string(),
        StatusResponse::Degraded { reason } => format!("degraded: {reason}"),
    }
}

/// Compact dollar amount: $950, $12.3K, $4.56M, $1.20B.
pub fn format_usd(v: f64) -> String {
    if !v.is_finite() || v <= 0.0 {
        return "$0".to_string();
    }
    if v >= 1e9 {
        format!("${:.2}B", v / 1e9)
    } else if v >= 1e6 {
        format!("${:.2}M", v / 1e6)
    } else if v >= 1e3 {
        format!("${:.1}K", v / 1e3)
    } else {
        format!("${v:.0}")
    }
}

pub fn format_change(pct: f64) -> String {
    format!("{pct:+.1}%")
}

/// Convert millisecond epoch timestamp to HH:MM:SS (UTC).
pub fn format_time_ms(ms: i64) -> String {
    let secs = (ms.max(0) / 1000) as u64;
    let h = (secs / 3600) % 24;
    let m = (secs / 60) % 60;
    let s = secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}
