use std::time::Duration;

use crate::error::{AppError, Result};

/// Boosted/trending token feed used for candidate discovery.
pub const DISCOVERY_URL: &str = "https://api.dexscreener.com/token-boosts/top/v1";

/// Base URL for enrichment. The comma-joined batch of identifiers is appended as one path segment.
pub const ENRICH_URL: &str = "https://api.dexscreener.com/tokens/v1/solana";

/// Per-request timeout for discovery and each enrichment batch (seconds).
pub const REQUEST_TIMEOUT_SECS: u64 = 12;

/// Upstream cap on identifiers per enrichment request.
pub const ENRICH_BATCH_SIZE: usize = 30;

/// Fixed pause between enrichment batches (milliseconds). Self-imposed rate limit, no backoff.
pub const ENRICH_BATCH_DELAY_MS: u64 = 250;

/// Cached items older than this are evicted.
pub const RETENTION_HOURS: u64 = 100;

/// Periodic refresh interval (seconds).
pub const REFRESH_INTERVAL_SECS: u64 = 90;

/// Name of the single blob holding the serialized radar cache.
pub const CACHE_BLOB_KEY: &str = "panic_radar_cache_v1";

/// Quote symbol that ranks above everything else.
pub const PREFERRED_QUOTE: &str = "USDC";

/// Best-pick panic level at or above which the view counts as hot.
pub const HOT_PANIC_LEVEL: u8 = 3;

/// Number of display events retained for `GET /radar/events`.
pub const EVENT_LOG_CAPACITY: usize = 200;

/// Scoring constants. The values are empirically chosen and are the contract;
/// they are exposed as configuration, not as values to tune silently.
pub mod scoring_defaults {
    pub const LIQUIDITY_MIN: f64 = 5_000.0;
    pub const LIQUIDITY_MAX: f64 = 2_000_000.0;
    pub const VOLUME_MIN: f64 = 20_000.0;
    pub const VOLUME_MAX: f64 = 20_000_000.0;

    pub const MOMENTUM_WEIGHT_1H: f64 = 0.55;
    pub const MOMENTUM_WEIGHT_6H: f64 = 0.35;
    pub const MOMENTUM_WEIGHT_24H: f64 = 0.10;
    /// Practical momentum range mapped onto [0, 1].
    pub const MOMENTUM_FLOOR: f64 = -20.0;
    pub const MOMENTUM_CEIL: f64 = 60.0;

    pub const VOLUME_WEIGHT: f64 = 0.48;
    pub const LIQUIDITY_WEIGHT: f64 = 0.37;
    pub const MOMENTUM_WEIGHT: f64 = 0.15;

    /// Liquidity below this is multiplied by `THIN_PENALTY`.
    pub const THIN_LIQUIDITY: f64 = 20_000.0;
    pub const THIN_PENALTY: f64 = 0.25;
    /// Liquidity below this (but above `THIN_LIQUIDITY`) is multiplied by `SHALLOW_PENALTY`.
    pub const SHALLOW_LIQUIDITY: f64 = 50_000.0;
    pub const SHALLOW_PENALTY: f64 = 0.65;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub liquidity_range: (f64, f64),
    pub volume_range: (f64, f64),
    /// (1h, 6h, 24h) blend coefficients.
    pub momentum_weights: (f64, f64, f64),
    pub momentum_range: (f64, f64),
    pub volume_weight: f64,
    pub liquidity_weight: f64,
    pub momentum_weight: f64,
    pub thin_liquidity: f64,
    pub thin_penalty: f64,
    pub shallow_liquidity: f64,
    pub shallow_penalty: f64,
    pub preferred_quote: String,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        use scoring_defaults::*;
        Self {
            liquidity_range: (LIQUIDITY_MIN, LIQUIDITY_MAX),
            volume_range: (VOLUME_MIN, VOLUME_MAX),
            momentum_weights: (MOMENTUM_WEIGHT_1H, MOMENTUM_WEIGHT_6H, MOMENTUM_WEIGHT_24H),
            momentum_range: (MOMENTUM_FLOOR, MOMENTUM_CEIL),
            volume_weight: VOLUME_WEIGHT,
            liquidity_weight: LIQUIDITY_WEIGHT,
            momentum_weight: MOMENTUM_WEIGHT,
            thin_liquidity: THIN_LIQUIDITY,
            thin_penalty: THIN_PENALTY,
            shallow_liquidity: SHALLOW_LIQUIDITY,
            shallow_penalty: SHALLOW_PENALTY,
            preferred_quote: PREFERRED_QUOTE.to_string(),
        }
    }
}

/// Network settings for the two-phase fetch.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub discovery_url: String,
    pub enrich_url: String,
    pub request_timeout: Duration,
    pub batch_size: usize,
    pub batch_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            discovery_url: DISCOVERY_URL.to_string(),
            enrich_url: ENRICH_URL.to_string(),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            batch_size: ENRICH_BATCH_SIZE,
            batch_delay: Duration::from_millis(ENRICH_BATCH_DELAY_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub fetch: FetchConfig,
    pub scoring: ScoringConfig,
    /// Retention window for cached items (RADAR_RETENTION_HOURS)
    pub retention: Duration,
    /// Periodic refresh interval (RADAR_REFRESH_INTERVAL_SECS)
    pub refresh_interval: Duration,
    /// SQLite path, or ":memory:" for a process-local store (RADAR_DB_PATH)
    pub db_path: String,
    pub log_level: String,
    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any name → value lookup. `from_env` passes the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let batch_size = parse_or(&get, "RADAR_BATCH_SIZE", ENRICH_BATCH_SIZE);
        if batch_size == 0 {
            return Err(AppError::Config("RADAR_BATCH_SIZE must be at least 1".to_string()));
        }
        let timeout_secs = parse_or(&get, "RADAR_REQUEST_TIMEOUT_SECS", REQUEST_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(AppError::Config(
                "RADAR_REQUEST_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }
        let interval_secs = parse_or(&get, "RADAR_REFRESH_INTERVAL_SECS", REFRESH_INTERVAL_SECS);
        if interval_secs == 0 {
            return Err(AppError::Config(
                "RADAR_REFRESH_INTERVAL_SECS must be at least 1".to_string(),
            ));
        }
        let retention_hours = parse_or(&get, "RADAR_RETENTION_HOURS", RETENTION_HOURS);

        Ok(Self {
            fetch: FetchConfig {
                discovery_url: get("RADAR_DISCOVERY_URL")
                    .unwrap_or_else(|| DISCOVERY_URL.to_string()),
                enrich_url: get("RADAR_ENRICH_URL").unwrap_or_else(|| ENRICH_URL.to_string()),
                request_timeout: Duration::from_secs(timeout_secs),
                batch_size,
                batch_delay: Duration::from_millis(parse_or(
                    &get,
                    "RADAR_BATCH_DELAY_MS",
                    ENRICH_BATCH_DELAY_MS,
                )),
            },
            scoring: ScoringConfig::default(),
            retention: Duration::from_secs(retention_hours.saturating_mul(3600)),
            refresh_interval: Duration::from_secs(interval_secs),
            db_path: get("RADAR_DB_PATH").unwrap_or_else(|| "radar.db".to_string()),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            api_port: get("API_PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
        })
    }
}

/// Parse a setting, falling back to `default` when unset or unparseable.
fn parse_or<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    get(name)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scoring_matches_reference_constants() {
        let s = ScoringConfig::default();
        assert_eq!(s.liquidity_range, (5_000.0, 2_000_000.0));
        assert_eq!(s.volume_range, (20_000.0, 20_000_000.0));
        assert_eq!(s.momentum_weights, (0.55, 0.35, 0.10));
        assert!((s.volume_weight + s.liquidity_weight + s.momentum_weight - 1.0).abs() < 1e-12);
        assert_eq!(s.preferred_quote, "USDC");
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: std::collections::HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_lookup_uses_defaults() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.fetch.batch_size, ENRICH_BATCH_SIZE);
        assert_eq!(cfg.fetch.request_timeout, Duration::from_secs(REQUEST_TIMEOUT_SECS));
        assert_eq!(cfg.refresh_interval, Duration::from_secs(REFRESH_INTERVAL_SECS));
        assert_eq!(cfg.retention, Duration::from_secs(RETENTION_HOURS * 3600));
        assert_eq!(cfg.api_port, 3000);
        assert_eq!(cfg.db_path, "radar.db");
    }

    #[test]
    fn garbage_values_fall_back_to_defaults() {
        let cfg = Config::from_lookup(lookup(&[
            ("RADAR_BATCH_SIZE", "many"),
            ("RADAR_REFRESH_INTERVAL_SECS", "-5"),
        ]))
        .unwrap();
        assert_eq!(cfg.fetch.batch_size, ENRICH_BATCH_SIZE);
        assert_eq!(cfg.refresh_interval, Duration::from_secs(REFRESH_INTERVAL_SECS));
    }

    #[test]
    fn zero_interval_timeout_or_batch_size_is_rejected() {
        for name in [
            "RADAR_REFRESH_INTERVAL_SECS",
            "RADAR_REQUEST_TIMEOUT_SECS",
            "RADAR_BATCH_SIZE",
        ] {
            let err = Config::from_lookup(lookup(&[(name, "0")])).unwrap_err();
            assert!(matches!(err, AppError::Config(ref m) if m.contains(name)), "{err}");
        }
    }

    #[test]
    fn huge_retention_saturates_instead_of_overflowing() {
        let cfg = Config::from_lookup(lookup(&[(
            "RADAR_RETENTION_HOURS",
            "18446744073709551615",
        )]))
        .unwrap();
        assert_eq!(cfg.retention, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = Config::from_lookup(lookup(&[("API_PORT", "70000")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
