//! Player Market Engine
//!
//! Daily insights run over a fantasy player market:
//! - Loads the metrics snapshot into the in-memory store
//! - Optionally pulls the player-prop slate from the odds provider
//! - Logs buy, sell and breakout signals, prop picks and portfolio risk

use std::sync::Arc;
use tracing::{error, info, warn};

use player_market_engine::api::OddsApiClient;
use player_market_engine::config::Settings;
use player_market_engine::data::models::RawQuote;
use player_market_engine::data::{InMemoryStore, MetricRecordAccessor};
use player_market_engine::signals::{OpportunityList, SignalEngine};
use player_market_engine::state::ResultCache;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env();
    init_logging(&settings);

    info!("=== Player Market Engine ===");
    info!(
        snapshot = %settings.data_snapshot_path,
        cache_ttl_seconds = settings.cache_ttl_seconds,
        odds_enabled = settings.odds_enabled(),
        "Configuration loaded"
    );

    if let Err(errors) = settings.validate() {
        for e in &errors {
            error!(error = %e, "Configuration error");
        }
        anyhow::bail!("Configuration validation failed");
    }

    let store = Arc::new(InMemoryStore::load_snapshot(&settings.data_snapshot_path)?);
    let accessor = MetricRecordAccessor::new(store.clone(), store);
    let engine = SignalEngine::new(
        accessor,
        ResultCache::new(settings.cache_ttl()),
        settings.thresholds(),
        settings.bookmaker_preference(),
    );

    let quotes = fetch_quotes(&settings).await;
    run_insights(&engine, &settings, &quotes)?;

    info!("=== Insights run complete ===");
    Ok(())
}

/// Fetch the slate, or an empty list when the provider is not configured or
/// unreachable.
async fn fetch_quotes(settings: &Settings) -> Vec<RawQuote> {
    if !settings.odds_enabled() {
        info!("ODDS_API_KEY not set, skipping prop lines");
        return Vec::new();
    }

    let client = match OddsApiClient::new(
        &settings.odds_api_key,
        &settings.odds_api_base_url,
        settings.odds_rate_limit_per_sec,
        3,
        10,
    ) {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Odds client unavailable");
            return Vec::new();
        }
    };

    match client
        .fetch_slate_quotes(&settings.odds_sport, settings.odds_max_events)
        .await
    {
        Ok(quotes) => quotes,
        Err(e) => {
            warn!(error = %e, "Failed to fetch slate quotes");
            Vec::new()
        }
    }
}

fn run_insights(
    engine: &SignalEngine,
    settings: &Settings,
    quotes: &[RawQuote],
) -> anyhow::Result<()> {
    let limit = settings.report_limit;

    for (title, result) in [
        ("Buy opportunities", engine.buy_opportunities(limit)),
        ("Sell opportunities", engine.sell_opportunities(limit)),
        ("Breakout candidates", engine.breakout_candidates(limit)),
    ] {
        match result {
            Ok(list) => log_opportunities(title, &list),
            Err(e) if e.is_data_sparsity() => warn!(error = %e, "{} unavailable", title),
            Err(e) => return Err(e.into()),
        }
    }

    let slate = chrono::Utc::now().date_naive().to_string();
    if !quotes.is_empty() {
        let book = engine.quote_book(&slate, quotes)?;
        info!(
            resolved = book.len(),
            unresolved = book.unresolved().len(),
            quotes = book.quotes_seen(),
            "Quote book"
        );
        for pick in engine.prop_picks(&slate, quotes, limit)? {
            let name = pick
                .player
                .as_ref()
                .map(|p| p.full_name.as_str())
                .unwrap_or(pick.entry.player_id.as_str());
            info!(
                player = name,
                stat = pick.entry.stat_type.display_name(),
                line = %pick.entry.line,
                call = %pick.recommendation.call,
                confidence = %pick.recommendation.confidence_level,
                edge = pick.recommendation.edge,
                "Prop pick"
            );
        }
    }

    match engine.momentum_picks(&slate, quotes, limit) {
        Ok(picks) => {
            for pick in picks {
                info!(
                    player = %pick.player_name,
                    line = pick.line,
                    line_source = ?pick.line_source,
                    call = %pick.call,
                    confidence = %pick.confidence_level,
                    momentum = pick.momentum_score,
                    reason = %pick.reason,
                    "Momentum pick"
                );
            }
        }
        Err(e) if e.is_data_sparsity() => warn!(error = %e, "Momentum picks unavailable"),
        Err(e) => return Err(e.into()),
    }

    if settings.portfolio_player_ids.is_empty() {
        return Ok(());
    }
    match engine.portfolio_risk(&settings.portfolio_player_ids) {
        Ok(report) => {
            info!(
                size = report.portfolio_size,
                risk_score = report.risk_score,
                risk_level = %report.risk_level,
                diversification = report.diversification_score,
                "Portfolio risk"
            );
            for line in &report.recommendations {
                info!("  {}", line);
            }
        }
        Err(e) if e.is_data_sparsity() => warn!(error = %e, "Portfolio risk unavailable"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn log_opportunities(title: &str, list: &OpportunityList) {
    info!(as_of = %list.as_of, count = list.items.len(), "{}", title);
    for (i, item) in list.items.iter().enumerate() {
        let name = item
            .player
            .as_ref()
            .map(|p| p.full_name.as_str())
            .unwrap_or(item.signal.player_id.as_str());
        info!(
            "  [{}] {} {} score={:.1} confidence={} trend={}",
            i + 1,
            item.signal.direction,
            name,
            item.signal.score,
            item.signal.confidence_level,
            item.trend.class,
        );
    }
}

fn init_logging(settings: &Settings) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    if settings.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}
