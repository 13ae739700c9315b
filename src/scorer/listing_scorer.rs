use crate::config::ScoringConfig;
use crate::types::{RadarItem, RawListing};

/// Composite heat score (higher = hotter), always in [0, 100].
/// Factors: 24h volume, liquidity (both log-scaled), short-horizon momentum,
/// then a multiplicative thin-liquidity penalty.
pub fn score(listing: &RawListing, cfg: &ScoringConfig) -> f64 {
    let liquidity = finite_or_zero(listing.liquidity_usd);
    let volume = finite_or_zero(listing.volume_24h);

    let liq_norm = log_norm(liquidity, cfg.liquidity_range.0, cfg.liquidity_range.1);
    let vol_norm = log_norm(volume, cfg.volume_range.0, cfg.volume_range.1);

    let (w1h, w6h, w24h) = cfg.momentum_weights;
    let momentum_raw = w1h * finite_or_zero(listing.change_1h)
        + w6h * finite_or_zero(listing.change_6h)
        + w24h * finite_or_zero(listing.change_24h);
    let (floor, ceil) = cfg.momentum_range;
    let momentum_norm = clamp01((momentum_raw - floor) / (ceil - floor));

    let mut s = 100.0
        * (cfg.volume_weight * vol_norm
            + cfg.liquidity_weight * liq_norm
            + cfg.momentum_weight * momentum_norm);

    if liquidity < cfg.thin_liquidity {
        s *= cfg.thin_penalty;
    } else if liquidity < cfg.shallow_liquidity {
        s *= cfg.shallow_penalty;
    }

    finite_or_zero(s).clamp(0.0, 100.0)
}

/// Discrete 0–4 bucket: [0,20)→0 … [80,100]→4.
pub fn panic_level(score: f64) -> u8 {
    if score.is_nan() || score < 20.0 {
        0
    } else if score < 40.0 {
        1
    } else if score < 60.0 {
        2
    } else if score < 80.0 {
        3
    } else {
        4
    }
}

pub fn is_preferred_quote(quote_symbol: &str, cfg: &ScoringConfig) -> bool {
    quote_symbol.to_uppercase() == cfg.preferred_quote
}

/// Derive the cached item for a listing captured at `now_ms`.
pub fn build_item(listing: &RawListing, now_ms: i64, cfg: &ScoringConfig) -> RadarItem {
    let s = score(listing, cfg);
    RadarItem {
        key: listing.pair_id.clone(),
        display_name: format!("{}/{}", listing.base_symbol, listing.quote_symbol),
        liquidity_usd: finite_or_zero(listing.liquidity_usd),
        volume_24h: finite_or_zero(listing.volume_24h),
        change_1h: finite_or_zero(listing.change_1h),
        score: s,
        panic_level: panic_level(s),
        is_preferred_quote: is_preferred_quote(&listing.quote_symbol, cfg),
        captured_at: now_ms,
        url: listing.url.clone(),
    }
}

/// `clamp((log10(x+1) - log10(min+1)) / (log10(max+1) - log10(min+1)), 0, 1)`
fn log_norm(x: f64, min: f64, max: f64) -> f64 {
    let lo = (min + 1.0).log10();
    let hi = (max + 1.0).log10();
    if hi <= lo {
        return 0.0;
    }
    clamp01(((x.max(0.0) + 1.0).log10() - lo) / (hi - lo))
}

fn clamp01(v: f64) -> f64 {
    finite_or_zero(v).clamp(0.0, 1.0)
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(liquidity: f64, volume: f64, c1: f64, c6: f64, c24: f64, quote: &str) -> RawListing {
        RawListing {
            pair_id: "pair1".to_string(),
            base_symbol: "PANIC".to_string(),
            quote_symbol: quote.to_string(),
            liquidity_usd: liquidity,
            volume_24h: volume,
            change_1h: c1,
            change_6h: c6,
            change_24h: c24,
            url: String::new(),
        }
    }

    #[test]
    fn reference_listing_scores_46() {
        let cfg = ScoringConfig::default();
        let l = listing(100_000.0, 500_000.0, 10.0, 5.0, 2.0, "USDC");

        let liq = (100_001f64.log10() - 5_001f64.log10()) / (2_000_001f64.log10() - 5_001f64.log10());
        let vol = (500_001f64.log10() - 20_001f64.log10()) / (20_000_001f64.log10() - 20_001f64.log10());
        let mom = (0.55 * 10.0 + 0.35 * 5.0 + 0.10 * 2.0 + 20.0) / 80.0;
        let expected = 100.0 * (0.48 * vol + 0.37 * liq + 0.15 * mom);

        let s = score(&l, &cfg);
        assert!((s - expected).abs() < 1e-9, "score={s} expected={expected}");
        assert!((s - 46.01).abs() < 0.05, "score={s}");
        assert_eq!(panic_level(s), 2);

        let item = build_item(&l, 1_000, &cfg);
        assert!(item.is_preferred_quote);
        assert_eq!(item.display_name, "PANIC/USDC");
        assert_eq!(item.captured_at, 1_000);
    }

    #[test]
    fn all_zero_listing_is_scored() {
        let s = score(&RawListing::default(), &ScoringConfig::default());
        assert!((0.0..=100.0).contains(&s));
        // Momentum term alone: (0 + 20) / 80 * 15, then the thin penalty.
        assert!((s - 0.25 * 15.0 * 0.25).abs() < 1e-9, "score={s}");
    }

    #[test]
    fn hostile_numbers_stay_in_range() {
        let cfg = ScoringConfig::default();
        for l in [
            listing(f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 0.0, 0.0, "SOL"),
            listing(-50.0, -1e9, -1e6, -1e6, -1e6, "SOL"),
            listing(1e15, 1e15, 1e6, 1e6, 1e6, "USDC"),
        ] {
            let s = score(&l, &cfg);
            assert!((0.0..=100.0).contains(&s), "score={s} for {l:?}");
        }
        let top = score(&listing(1e15, 1e15, 1e6, 1e6, 1e6, "USDC"), &cfg);
        assert!((top - 100.0).abs() < 1e-9);
    }

    #[test]
    fn thin_liquidity_is_penalised_at_least_four_fold() {
        let cfg = ScoringConfig::default();
        let thin = score(&listing(10_000.0, 1_000_000.0, 5.0, 5.0, 5.0, "SOL"), &cfg);
        let deep = score(&listing(60_000.0, 1_000_000.0, 5.0, 5.0, 5.0, "SOL"), &cfg);
        assert!(thin <= 0.25 * deep + 1e-9, "thin={thin} deep={deep}");
    }

    #[test]
    fn shallow_liquidity_uses_the_middle_penalty() {
        let cfg = ScoringConfig::default();
        let no_penalty = ScoringConfig {
            thin_penalty: 1.0,
            shallow_penalty: 1.0,
            ..ScoringConfig::default()
        };
        let l = listing(30_000.0, 1_000_000.0, 0.0, 0.0, 0.0, "SOL");
        let raw = score(&l, &no_penalty);
        assert!((score(&l, &cfg) - 0.65 * raw).abs() < 1e-9);
    }

    #[test]
    fn panic_level_bands() {
        assert_eq!(panic_level(0.0), 0);
        assert_eq!(panic_level(19.999), 0);
        assert_eq!(panic_level(20.0), 1);
        assert_eq!(panic_level(39.999), 1);
        assert_eq!(panic_level(40.0), 2);
        assert_eq!(panic_level(60.0), 3);
        assert_eq!(panic_level(79.999), 3);
        assert_eq!(panic_level(80.0), 4);
        assert_eq!(panic_level(100.0), 4);
        assert_eq!(panic_level(f64::NAN), 0);
    }

    #[test]
    fn panic_level_is_monotonic() {
        let mut last = 0;
        for i in 0..=1000 {
            let lvl = panic_level(i as f64 / 10.0);
            assert!(lvl >= last);
            assert!(lvl <= 4);
            last = lvl;
        }
    }

    #[test]
    fn preferred_quote_is_exact_case_insensitive_match() {
        let cfg = ScoringConfig::default();
        assert!(is_preferred_quote("usdc", &cfg));
        assert!(is_preferred_quote("USDC", &cfg));
        assert!(!is_preferred_quote("USDC.e", &cfg));
        assert!(!is_preferred_quote("USDT", &cfg));
    }
}
