use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::FetchConfig;
use crate::error::{AppError, Result};
use crate::types::RawListing;

// ---------------------------------------------------------------------------
// Extraction strategies
// ---------------------------------------------------------------------------

/// Field paths tried in order for a discovery candidate's identifier. First non-empty string wins.
const DISCOVERY_ID_PATHS: &[&[&str]] = &[
    &["tokenAddress"],
    &["address"],
    &["token", "address"],
    &["baseToken", "address"],
    &["id"],
];

/// Field paths tried in order for an enriched listing's pair identifier.
const PAIR_ID_PATHS: &[&[&str]] = &[&["pairAddress"], &["pair_address"], &["id"]];

const BASE_SYMBOL_PATHS: &[&[&str]] =
    &[&["baseToken", "symbol"], &["base", "symbol"], &["baseSymbol"]];
const QUOTE_SYMBOL_PATHS: &[&[&str]] =
    &[&["quoteToken", "symbol"], &["quote", "symbol"], &["quoteSymbol"]];
const LIQUIDITY_PATHS: &[&[&str]] = &[&["liquidity", "usd"], &["liquidityUsd"]];
const VOLUME_24H_PATHS: &[&[&str]] = &[&["volume", "h24"], &["volume24h"]];
const CHANGE_1H_PATHS: &[&[&str]] = &[&["priceChange", "h1"], &["change1h"]];
const CHANGE_6H_PATHS: &[&[&str]] = &[&["priceChange", "h6"], &["change6h"]];
const CHANGE_24H_PATHS: &[&[&str]] = &[&["priceChange", "h24"], &["change24h"]];

/// Wrapper keys under which some endpoints nest their result list.
const LIST_WRAPPER_KEYS: &[&str] = &["pairs", "data", "items"];

fn value_at<'a>(v: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(v, |cur, key| cur.get(*key))
}

/// First non-empty string found along `paths`.
pub fn first_string(v: &Value, paths: &[&[&str]]) -> Option<String> {
    paths.iter().find_map(|path| {
        value_at(v, path)
            .and_then(|x| x.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// First number found along `paths`, accepting numeric strings. Missing → 0.
pub fn first_number(v: &Value, paths: &[&[&str]]) -> f64 {
    paths
        .iter()
        .find_map(|path| {
            value_at(v, path).and_then(|x| {
                x.as_f64().or_else(|| x.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
            })
        })
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

fn as_list(v: &Value) -> Option<&Vec<Value>> {
    v.as_array().or_else(|| {
        LIST_WRAPPER_KEYS
            .iter()
            .find_map(|k| v.get(*k).and_then(|x| x.as_array()))
    })
}

/// Candidate identifiers from a discovery response, de-duplicated in first-seen order.
pub fn extract_candidates(body: &Value) -> Result<Vec<String>> {
    let items = as_list(body)
        .ok_or_else(|| AppError::Malformed("discovery response was not a list".to_string()))?;

    let mut seen = HashSet::new();
    let ids = items
        .iter()
        .filter_map(|item| first_string(item, DISCOVERY_ID_PATHS))
        .filter(|id| seen.insert(id.clone()))
        .collect();
    Ok(ids)
}

/// Parse one enrichment record. None when no pair identifier is present.
pub fn parse_listing(v: &Value) -> Option<RawListing> {
    let pair_id = first_string(v, PAIR_ID_PATHS)?;
    Some(RawListing {
        pair_id,
        base_symbol: first_string(v, BASE_SYMBOL_PATHS).unwrap_or_else(|| "?".to_string()),
        quote_symbol: first_string(v, QUOTE_SYMBOL_PATHS).unwrap_or_else(|| "?".to_string()),
        liquidity_usd: first_number(v, LIQUIDITY_PATHS),
        volume_24h: first_number(v, VOLUME_24H_PATHS),
        change_1h: first_number(v, CHANGE_1H_PATHS),
        change_6h: first_number(v, CHANGE_6H_PATHS),
        change_24h: first_number(v, CHANGE_24H_PATHS),
        url: first_string(v, &[&["url"]]).unwrap_or_default(),
    })
}

// ---------------------------------------------------------------------------
// MarketSource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    /// Zero-based batch index.
    pub batch: usize,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct EnrichOutcome {
    pub listings: Vec<RawListing>,
    pub batches: usize,
    pub failures: Vec<BatchFailure>,
    /// Records dropped for lacking a pair identifier.
    pub discarded: usize,
}

/// Two-phase market data retrieval: discovery, then batched enrichment.
#[async_trait]
pub trait MarketSource: Send + Sync {
    async fn discover(&self) -> Result<Vec<String>>;

    /// Fails only when every batch fails; individual batch failures are in the outcome.
    async fn enrich(&self, ids: &[String]) -> Result<EnrichOutcome>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

pub struct MarketFetcher {
    cfg: FetchConfig,
    client: reqwest::Client,
}

impl MarketFetcher {
    pub fn new(cfg: FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()?;
        Ok(Self { cfg, client })
    }

    /// GET and decode JSON. Timeouts, non-2xx, and bad bodies are all errors for this call only.
    async fn get_json(&self, url: &str) -> Result<Value> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::from_request(e, url))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Upstream { status: status.as_u16(), url: url.to_string() });
        }

        let body = resp.text().await.map_err(|e| AppError::from_request(e, url))?;
        Ok(serde_json::from_str(&body)?)
    }

    fn batch_url(&self, batch: &[String]) -> Result<String> {
        let mut url = reqwest::Url::parse(&self.cfg.enrich_url)
            .map_err(|e| AppError::Config(format!("invalid enrich URL {}: {e}", self.cfg.enrich_url)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Config(format!("enrich URL cannot take a path: {}", self.cfg.enrich_url)))?
            .pop_if_empty()
            .push(&batch.join(","));
        Ok(url.to_string())
    }

    async fn fetch_batch(&self, batch: &[String]) -> Result<Vec<Value>> {
        let url = self.batch_url(batch)?;
        let body = self.get_json(&url).await?;
        as_list(&body)
            .cloned()
            .ok_or_else(|| AppError::Malformed(format!("enrichment response from {url} was not a list")))
    }
}

#[async_trait]
impl MarketSource for MarketFetcher {
    async fn discover(&self) -> Result<Vec<String>> {
        let body = self.get_json(&self.cfg.discovery_url).await?;
        let ids = extract_candidates(&body)?;
        info!(candidates = ids.len(), "Discovery complete");
        Ok(ids)
    }

    async fn enrich(&self, ids: &[String]) -> Result<EnrichOutcome> {
        let mut outcome = EnrichOutcome::default();
        let batches: Vec<&[String]> = ids.chunks(self.cfg.batch_size.max(1)).collect();
        outcome.batches = batches.len();

        for (i, batch) in batches.iter().enumerate() {
            if i > 0 && !self.cfg.batch_delay.is_zero() {
                tokio::time::sleep(self.cfg.batch_delay).await;
            }

            match self.fetch_batch(batch).await {
                Ok(records) => {
                    let before = outcome.listings.len();
                    for record in &records {
                        match parse_listing(record) {
                            Some(listing) => outcome.listings.push(listing),
                            None => outcome.discarded += 1,
                        }
                    }
                    debug!(
                        batch = i,
                        ids = batch.len(),
                        listings = outcome.listings.len() - before,
                        "Enrichment batch ok"
                    );
                }
                Err(e) => {
                    warn!(batch = i, ids = batch.len(), "Enrichment batch failed: {e}");
                    outcome.failures.push(BatchFailure { batch: i, error: e.to_string() });
                }
            }
        }

        if outcome.batches > 0 && outcome.failures.len() == outcome.batches {
            return Err(AppError::AllBatchesFailed(outcome.batches));
        }

        info!(
            batches = outcome.batches,
            failed = outcome.failures.len(),
            listings = outcome.listings.len(),
            discarded = outcome.discarded,
            "Enrichment complete"
        );
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
