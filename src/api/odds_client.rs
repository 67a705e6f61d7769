//! Async REST client for The Odds API player-prop markets.
//!
//! Features:
//! - Rate limiting (configurable, default 5 req/sec)
//! - Automatic retries with exponential backoff
//! - Pure payload parsing into `RawQuote`s
//!
//! Requires an API key from <https://the-odds-api.com>.

use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::data::models::{RawQuote, StatType};

use super::errors::OddsApiError;

pub const DEFAULT_BASE_URL: &str = "https://api.the-odds-api.com/v4";
pub const DEFAULT_SPORT: &str = "basketball_nba";

const BASE_BACKOFF_MS: u64 = 500;
/// Backoff stops doubling after this many attempts (32s).
const MAX_BACKOFF_EXPONENT: u32 = 6;

// =============================================================================
// Provider response types
// =============================================================================

/// One scheduled game from the events listing.
#[derive(Debug, Clone, Deserialize)]
pub struct OddsEvent {
    pub id: String,
    #[serde(default)]
    pub sport_key: String,
    #[serde(default)]
    pub commence_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub home_team: String,
    #[serde(default)]
    pub away_team: String,
}

/// Player-prop odds for one event.
#[derive(Debug, Clone, Deserialize)]
pub struct EventOdds {
    #[serde(default)]
    pub commence_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub home_team: String,
    #[serde(default)]
    pub away_team: String,
    #[serde(default)]
    pub bookmakers: Vec<Bookmaker>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bookmaker {
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub markets: Vec<BookmakerMarket>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookmakerMarket {
    pub key: String,
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Outcome {
    /// "Over" or "Under".
    pub name: String,
    /// Player name.
    #[serde(default)]
    pub description: String,
    /// American odds.
    pub price: f64,
    #[serde(default)]
    pub point: Option<f64>,
}

/// Result of parsing one event's odds.
#[derive(Debug, Clone, Default)]
pub struct ParsedProps {
    pub quotes: Vec<RawQuote>,
    /// Player groups discarded because no line was posted.
    pub dropped: usize,
}

#[derive(Default)]
struct OutcomePair {
    line: Option<f64>,
    over: Option<f64>,
    under: Option<f64>,
}

/// Turn one event-odds payload into raw quotes.
///
/// Outcomes are grouped by player within each bookmaker market: `Over`
/// carries the line and over price, `Under` the under price. A market key
/// outside the eleven prop markets fails the whole payload.
pub fn parse_event_props(event: &EventOdds) -> Result<ParsedProps, OddsApiError> {
    let mut parsed = ParsedProps::default();

    for bookmaker in &event.bookmakers {
        for market in &bookmaker.markets {
            let stat_type = StatType::from_market_key(&market.key)?;

            // BTreeMap keeps the output order stable across runs.
            let mut by_player: BTreeMap<&str, OutcomePair> = BTreeMap::new();
            for outcome in &market.outcomes {
                let pair = by_player.entry(outcome.description.as_str()).or_default();
                match outcome.name.as_str() {
                    "Over" => {
                        pair.over = Some(outcome.price);
                        pair.line = outcome.point;
                    }
                    "Under" => pair.under = Some(outcome.price),
                    _ => {}
                }
            }

            for (player_name, pair) in by_player {
                let Some(line) = pair.line.and_then(to_decimal) else {
                    warn!(
                        player = player_name,
                        market = %market.key,
                        bookmaker = %bookmaker.key,
                        "Prop outcome without a line, dropped"
                    );
                    parsed.dropped += 1;
                    continue;
                };
                parsed.quotes.push(RawQuote {
                    player_name: player_name.to_string(),
                    stat_type,
                    line,
                    over_price: pair.over.and_then(to_decimal),
                    under_price: pair.under.and_then(to_decimal),
                    bookmaker: bookmaker.key.clone(),
                    home_team: event.home_team.clone(),
                    away_team: event.away_team.clone(),
                    commence_time: event.commence_time,
                });
            }
        }
    }

    Ok(parsed)
}

fn to_decimal(v: f64) -> Option<Decimal> {
    Decimal::try_from(v).ok()
}

/// Comma-joined list of every prop market.
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt.min(MAX_BACKOFF_EXPONENT)))
}

fn all_markets() -> String {
    StatType::ALL
        .iter()
        .map(|s| s.market_key())
        .collect::<Vec<_>>()
        .join(",")
}

// =============================================================================
// Client
// =============================================================================

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub struct OddsApiClient {
    api_key: String,
    base_url: String,
    client: Client,
    rate_limiter: Arc<DirectLimiter>,
    max_retries: u32,
}

impl OddsApiClient {
    pub fn new(
        api_key: &str,
        base_url: &str,
        rate_limit: u32,
        max_retries: u32,
        timeout_secs: u64,
    ) -> Result<Self, OddsApiError> {
        if api_key.trim().is_empty() {
            return Err(OddsApiError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| OddsApiError::Network(e.to_string()))?;

        let quota = Quota::per_second(NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN));
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            rate_limiter,
            max_retries: max_retries.max(1),
        })
    }

    pub fn with_defaults(api_key: &str) -> Result<Self, OddsApiError> {
        Self::new(api_key, DEFAULT_BASE_URL, 5, 3, 10)
    }

    // =========================================================================
    // Core request method
    // =========================================================================

    async fn get_json<T>(&self, path: &str, params: &[(&str, &str)]) -> Result<T, OddsApiError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error: Option<OddsApiError> = None;

        for attempt in 0..self.max_retries {
            self.rate_limiter.until_ready().await;
            debug!(path = %path, attempt = attempt + 1, "Odds API request");

            let result = self
                .client
                .get(&url)
                .query(&[("apiKey", self.api_key.as_str())])
                .query(params)
                .send()
                .await;

            let err = match result {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        if let Some(remaining) = response
                            .headers()
                            .get("x-requests-remaining")
                            .and_then(|v| v.to_str().ok())
                        {
                            debug!(remaining, "Odds API quota");
                        }
                        let text = response
                            .text()
                            .await
                            .map_err(|e| OddsApiError::Network(e.to_string()))?;
                        return serde_json::from_str(&text)
                            .map_err(|e| OddsApiError::Deserialization(e.to_string()));
                    }

                    if status.as_u16() == 429 {
                        let retry_after = response
                            .headers()
                            .get("Retry-After")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(1);
                        OddsApiError::RateLimited { retry_after }
                    } else {
                        let body_text = response.text().await.unwrap_or_default();
                        OddsApiError::from_response(status.as_u16(), &body_text)
                    }
                }
                Err(e) if e.is_timeout() => OddsApiError::Timeout(e.to_string()),
                Err(e) => OddsApiError::Network(e.to_string()),
            };

            if !err.is_retryable() {
                return Err(err);
            }

            let delay = match &err {
                OddsApiError::RateLimited { retry_after } => Duration::from_secs(*retry_after),
                _ => backoff_delay(attempt),
            };
            warn!(
                error = %err,
                delay_ms = delay.as_millis() as u64,
                attempt = attempt + 1,
                "Odds API request failed, retrying"
            );
            tokio::time::sleep(delay).await;
            last_error = Some(err);
        }

        Err(last_error.unwrap_or_else(|| OddsApiError::MaxRetriesExceeded {
            attempts: self.max_retries,
            last_error: "Unknown error".to_string(),
        }))
    }

    // =========================================================================
    // Endpoints
    // =========================================================================

    /// Upcoming events for a sport.
    pub async fn fetch_events(&self, sport: &str) -> Result<Vec<OddsEvent>, OddsApiError> {
        self.get_json(&format!("/sports/{sport}/events"), &[]).await
    }

    /// Player-prop odds for one event, all prop markets, US books.
    pub async fn fetch_event_props(
        &self,
        sport: &str,
        event_id: &str,
    ) -> Result<EventOdds, OddsApiError> {
        let markets = all_markets();
        self.get_json(
            &format!("/sports/{sport}/events/{event_id}/odds"),
            &[
                ("regions", "us"),
                ("markets", markets.as_str()),
                ("oddsFormat", "american"),
            ],
        )
        .await
    }

    /// Quotes for the first `max_events` events of the slate. An event whose
    /// odds fail to load is skipped with a warning.
    pub async fn fetch_slate_quotes(
        &self,
        sport: &str,
        max_events: usize,
    ) -> Result<Vec<RawQuote>, OddsApiError> {
        let events = self.fetch_events(sport).await?;
        if events.is_empty() {
            info!(sport, "No events on the slate");
            return Ok(Vec::new());
        }

        let mut quotes = Vec::new();
        let mut dropped = 0;
        for event in events.iter().take(max_events) {
            let odds = match self.fetch_event_props(sport, &event.id).await {
                Ok(odds) => odds,
                Err(e) => {
                    warn!(event_id = %event.id, error = %e, "Failed to fetch event props");
                    continue;
                }
            };
            let parsed = parse_event_props(&odds)?;
            debug!(
                event_id = %event.id,
                home = %event.home_team,
                away = %event.away_team,
                quotes = parsed.quotes.len(),
                "Fetched event props"
            );
            dropped += parsed.dropped;
            quotes.extend(parsed.quotes);
        }

        info!(
            sport,
            events = events.len().min(max_events),
            quotes = quotes.len(),
            dropped,
            "Slate quotes fetched"
        );
        Ok(quotes)
    }
}
