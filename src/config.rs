//! Configuration management.
//!
//! Loads settings from environment variables and a .env file.

use std::time::Duration;

use crate::data::models::PlayerId;
use crate::market::quote_book::{BookmakerPreference, DEFAULT_BOOKMAKERS};
use crate::signals::SignalThresholds;

/// Application configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct Settings {
    // Logging
    pub log_level: String,
    pub log_json: bool,

    // Data
    pub data_snapshot_path: String,
    pub cache_ttl_seconds: u64,
    pub report_limit: usize,
    pub portfolio_player_ids: Vec<PlayerId>,

    // Odds provider
    pub odds_api_key: String,
    pub odds_api_base_url: String,
    pub odds_sport: String,
    pub odds_max_events: usize,
    pub odds_rate_limit_per_sec: u32,
    pub odds_bookmaker_preference: Vec<String>,

    // Signal thresholds
    pub buy_min_stat: f64,
    pub buy_min_confidence: f64,
    pub sell_max_stat: f64,
    pub sell_min_sentiment: f64,
    pub sell_min_confidence: f64,
    pub breakout_min_momentum: f64,
    pub breakout_min_stat: f64,
}

impl Settings {
    /// Load settings from environment variables (and .env file).
    pub fn from_env() -> Self {
        // Try to load .env file (ignore if not found).
        let _ = dotenvy::dotenv();

        let defaults = SignalThresholds::default();

        Self {
            log_level: env_str("LOG_LEVEL", "info"),
            log_json: env_bool("LOG_JSON", false),

            data_snapshot_path: env_str("DATA_SNAPSHOT_PATH", "data/snapshot.json"),
            cache_ttl_seconds: env_u64("CACHE_TTL_SECONDS", 300),
            report_limit: env_usize("REPORT_LIMIT", 10),
            portfolio_player_ids: env_csv("PORTFOLIO_PLAYER_IDS"),

            odds_api_key: env_str("ODDS_API_KEY", ""),
            odds_api_base_url: env_str(
                "ODDS_API_BASE_URL",
                crate::api::odds_client::DEFAULT_BASE_URL,
            ),
            odds_sport: env_str("ODDS_SPORT", crate::api::odds_client::DEFAULT_SPORT),
            odds_max_events: env_usize("ODDS_MAX_EVENTS", 3),
            odds_rate_limit_per_sec: env_u32("ODDS_RATE_LIMIT_PER_SEC", 5),
            odds_bookmaker_preference: env_csv_default(
                "ODDS_BOOKMAKER_PREFERENCE",
                &DEFAULT_BOOKMAKERS.join(","),
            ),

            buy_min_stat: env_f64("BUY_MIN_STAT", defaults.buy_min_stat),
            buy_min_confidence: env_f64("BUY_MIN_CONFIDENCE", defaults.buy_min_confidence),
            sell_max_stat: env_f64("SELL_MAX_STAT", defaults.sell_max_stat),
            sell_min_sentiment: env_f64("SELL_MIN_SENTIMENT", defaults.sell_min_sentiment),
            sell_min_confidence: env_f64("SELL_MIN_CONFIDENCE", defaults.sell_min_confidence),
            breakout_min_momentum: env_f64("BREAKOUT_MIN_MOMENTUM", defaults.breakout_min_momentum),
            breakout_min_stat: env_f64("BREAKOUT_MIN_STAT", defaults.breakout_min_stat),
        }
    }

    /// Signal thresholds with the configured overrides applied.
    pub fn thresholds(&self) -> SignalThresholds {
        SignalThresholds {
            buy_min_stat: self.buy_min_stat,
            buy_min_confidence: self.buy_min_confidence,
            sell_max_stat: self.sell_max_stat,
            sell_min_sentiment: self.sell_min_sentiment,
            sell_min_confidence: self.sell_min_confidence,
            breakout_min_momentum: self.breakout_min_momentum,
            breakout_min_stat: self.breakout_min_stat,
            ..SignalThresholds::default()
        }
    }

    pub fn bookmaker_preference(&self) -> BookmakerPreference {
        BookmakerPreference::new(&self.odds_bookmaker_preference)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn odds_enabled(&self) -> bool {
        !self.odds_api_key.trim().is_empty()
    }

    /// Validate configuration for critical requirements.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.data_snapshot_path.trim().is_empty() {
            errors.push("DATA_SNAPSHOT_PATH must not be empty".to_string());
        }

        if self.cache_ttl_seconds == 0 {
            errors.push("CACHE_TTL_SECONDS must be positive".to_string());
        }

        if self.report_limit == 0 {
            errors.push("REPORT_LIMIT must be positive".to_string());
        }

        if self.odds_enabled() {
            if self.odds_rate_limit_per_sec == 0 {
                errors.push("ODDS_RATE_LIMIT_PER_SEC must be positive".to_string());
            }
            if self.odds_bookmaker_preference.is_empty() {
                errors.push("ODDS_BOOKMAKER_PREFERENCE must list at least one bookmaker".to_string());
            }
        }

        for (key, value) in [
            ("BUY_MIN_CONFIDENCE", self.buy_min_confidence),
            ("SELL_MIN_CONFIDENCE", self.sell_min_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(format!("{key} must be in [0, 1]"));
            }
        }

        for (key, value) in [
            ("BUY_MIN_STAT", self.buy_min_stat),
            ("SELL_MAX_STAT", self.sell_max_stat),
            ("BREAKOUT_MIN_STAT", self.breakout_min_stat),
        ] {
            if !(0.0..=100.0).contains(&value) {
                errors.push(format!("{key} must be in [0, 100]"));
            }
        }

        if !self.sell_min_sentiment.is_finite() || !self.breakout_min_momentum.is_finite() {
            errors.push("SELL_MIN_SENTIMENT and BREAKOUT_MIN_MOMENTUM must be finite".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// =============================================================================
// Environment helpers
// =============================================================================

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_csv(key: &str) -> Vec<String> {
    std::env::var(key)
        .ok()
        .map(|v| split_csv(&v))
        .unwrap_or_default()
}

fn env_csv_default(key: &str, default: &str) -> Vec<String> {
    split_csv(&std::env::var(key).unwrap_or_else(|_| default.to_string()))
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
