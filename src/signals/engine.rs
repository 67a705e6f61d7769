//! Signal engine: the cached, externally visible operations.
//!
//! Reads records through the accessor, runs the pure classifiers and risk
//! aggregation over them, and memoises results in the shared result cache
//! keyed by request signature.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::data::accessor::{LatestSnapshot, MetricRecordAccessor};
use crate::data::models::{
    PlayerId, PlayerIdentity, QuoteBookEntry, RawQuote, Signal, StatType, ValueIndexRecord,
};
use crate::errors::{EngineError, EngineResult};
use crate::market::{quotes_fingerprint, BookmakerPreference, QuoteBook};
use crate::resolve::EntityResolver;
use crate::risk::portfolio::{assess, Holding, PortfolioRiskReport};
use crate::state::ResultCache;

use super::classifier::{SignalClassifier, SignalThresholds};
use super::fantasy::{project, rank_lineup, FantasyProjection, FANTASY_WINDOW};
use super::model::{ml_recommendations, MlRecommendation, ProbabilityModel};
use super::props::{
    best_pick, classify_prop, momentum_pick, prop_insights, rank_momentum_picks, MomentumPick,
    PropInsights, PropRecommendation, INSIGHT_WINDOW, PROP_WINDOW,
};
use super::trend::TrendReading;

/// Lineup size scanned when looking for value picks.
const VALUE_PICK_SCAN: usize = 50;

/// A classified signal with the context a caller displays alongside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opportunity {
    pub signal: Signal,
    pub player: Option<PlayerIdentity>,
    pub value_score: f64,
    pub stat_component: f64,
    pub sentiment_component: f64,
    pub momentum_score: f64,
    pub trend: TrendReading,
}

/// Ranked signals for one value date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunityList {
    pub as_of: NaiveDate,
    pub items: Vec<Opportunity>,
}

/// The best prop call for one player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropPick {
    pub player: Option<PlayerIdentity>,
    pub entry: QuoteBookEntry,
    pub recommendation: PropRecommendation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanKind {
    Buy,
    Sell,
    Breakout,
}

impl ScanKind {
    fn key(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::Breakout => "breakout",
        }
    }
}

#[derive(Clone)]
pub struct SignalEngine {
    accessor: MetricRecordAccessor,
    cache: ResultCache,
    classifier: SignalClassifier,
    preference: BookmakerPreference,
}

impl SignalEngine {
    pub fn new(
        accessor: MetricRecordAccessor,
        cache: ResultCache,
        thresholds: SignalThresholds,
        preference: BookmakerPreference,
    ) -> Self {
        Self {
            accessor,
            cache,
            classifier: SignalClassifier::new(thresholds),
            preference,
        }
    }

    pub fn accessor(&self) -> &MetricRecordAccessor {
        &self.accessor
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Resolver over the current roster.
    pub fn resolver(&self) -> EngineResult<EntityResolver> {
        Ok(EntityResolver::new(&self.accessor.roster_map()?))
    }

    // =========================================================================
    // Quotes and props
    // =========================================================================

    /// Build (or reuse) the quote book for a slate. The key carries a
    /// fingerprint of the batch, so a changed batch under the same slate
    /// name is rebuilt.
    pub fn quote_book(&self, slate: &str, quotes: &[RawQuote]) -> EngineResult<Arc<QuoteBook>> {
        let key = format!("quote_book:{slate}:{:x}", quotes_fingerprint(quotes));
        self.cache.get_or_compute(&key, self.cache.ttl(), || {
            let resolver = self.resolver()?;
            Ok(Arc::new(QuoteBook::build(quotes, &resolver, &self.preference)))
        })
    }

    /// Best non-PASS pick per resolved player, strongest confidence first.
    pub fn prop_picks(
        &self,
        slate: &str,
        quotes: &[RawQuote],
        limit: usize,
    ) -> EngineResult<Vec<PropPick>> {
        let key = format!(
            "prop_picks:{slate}:{:x}:{limit}",
            quotes_fingerprint(quotes)
        );
        self.cache.get_or_compute(&key, self.cache.ttl(), || {
            let book = self.quote_book(slate, quotes)?;
            let players = self.accessor.players(&book.players())?;

            let mut picks = Vec::new();
            for player_id in book.players() {
                let mut candidates = Vec::new();
                for entry in book.player_lines(&player_id) {
                    let series = self
                        .accessor
                        .stat_series(&player_id, entry.stat_type, PROP_WINDOW)?;
                    let line = entry
                        .line
                        .to_f64()
                        .ok_or(EngineError::MissingField("line"))?;
                    match classify_prop(&series, line) {
                        Ok(rec) => candidates.push((entry.clone(), rec)),
                        Err(e) if e.is_data_sparsity() => {
                            debug!(player_id = %player_id, stat_type = %entry.stat_type, error = %e, "Prop skipped");
                        }
                        Err(e) => return Err(e),
                    }
                }
                if let Some((entry, recommendation)) = best_pick(candidates) {
                    picks.push(PropPick {
                        player: players.get(&player_id).cloned(),
                        entry,
                        recommendation,
                    });
                }
            }

            picks.sort_by_key(|p| Reverse(p.recommendation.confidence_level));
            picks.truncate(limit);
            Ok(picks)
        })
    }

    /// Points picks for players on a hot streak, priced against the slate's
    /// book lines where one exists.
    pub fn momentum_picks(
        &self,
        slate: &str,
        quotes: &[RawQuote],
        limit: usize,
    ) -> EngineResult<Vec<MomentumPick>> {
        let key = format!(
            "momentum_picks:{slate}:{:x}:{limit}",
            quotes_fingerprint(quotes)
        );
        self.cache.get_or_compute(&key, self.cache.ttl(), || {
            let book = self.quote_book(slate, quotes)?;
            let snapshot = self.require_snapshot()?;
            let roster = self.accessor.roster_map()?;

            let mut picks = Vec::new();
            for record in &snapshot.records {
                let Some(identity) = roster.get(&record.player_id) else {
                    continue;
                };
                let games = self
                    .accessor
                    .recent_box_scores(&record.player_id, INSIGHT_WINDOW)?;
                let line = book.get(&record.player_id, StatType::Points);
                if let Some(pick) = momentum_pick(record, identity, &games, line) {
                    picks.push(pick);
                }
            }

            info!(
                as_of = %snapshot.date,
                candidates = picks.len(),
                book_lines = picks.iter().filter(|p| p.has_book_line()).count(),
                "Momentum picks ranked"
            );
            Ok(rank_momentum_picks(picks, limit))
        })
    }

    /// Recent-form insights for one player, using book lines when given.
    pub fn prop_insights(
        &self,
        player_id: &str,
        book: Option<&QuoteBook>,
    ) -> EngineResult<PropInsights> {
        let games = self.accessor.recent_box_scores(player_id, INSIGHT_WINDOW)?;
        prop_insights(&games, |stat: StatType| {
            book.and_then(|b| b.get(player_id, stat))
                .and_then(|e| e.line.to_f64())
        })
    }

    // =========================================================================
    // Market scans
    // =========================================================================

    pub fn buy_opportunities(&self, limit: usize) -> EngineResult<OpportunityList> {
        self.scan(ScanKind::Buy, limit)
    }

    pub fn sell_opportunities(&self, limit: usize) -> EngineResult<OpportunityList> {
        self.scan(ScanKind::Sell, limit)
    }

    pub fn breakout_candidates(&self, limit: usize) -> EngineResult<OpportunityList> {
        self.scan(ScanKind::Breakout, limit)
    }

    fn scan(&self, kind: ScanKind, limit: usize) -> EngineResult<OpportunityList> {
        let key = format!("{}:{limit}", kind.key());
        self.cache.get_or_compute(&key, self.cache.ttl(), || {
            let snapshot = self.require_snapshot()?;
            let mut items = Vec::new();

            for record in &snapshot.records {
                let trend = self.trend_for(&record.player_id, snapshot.date)?;
                let signal = match kind {
                    ScanKind::Buy => self.classifier.classify_buy(record),
                    ScanKind::Sell => self.classifier.classify_sell(record, &trend),
                    ScanKind::Breakout => self.classifier.classify_breakout(record),
                };
                if let Some(signal) = signal {
                    items.push((record, signal, trend));
                }
            }

            let ids: Vec<PlayerId> = items.iter().map(|(r, _, _)| r.player_id.clone()).collect();
            let players = self.accessor.players(&ids)?;

            let mut items: Vec<Opportunity> = items
                .into_iter()
                .map(|(record, signal, trend)| Opportunity {
                    player: players.get(&record.player_id).cloned(),
                    value_score: record.value_score,
                    stat_component: record.stat_component,
                    sentiment_component: record.sentiment_component,
                    momentum_score: record.momentum_score,
                    trend,
                    signal,
                })
                .collect();
            items.sort_by(|a, b| b.signal.score.total_cmp(&a.signal.score));
            items.truncate(limit);

            info!(
                scan = kind.key(),
                as_of = %snapshot.date,
                scanned = snapshot.records.len(),
                found = items.len(),
                "Market scan complete"
            );
            Ok(OpportunityList {
                as_of: snapshot.date,
                items,
            })
        })
    }

    // =========================================================================
    // Portfolio, model and fantasy
    // =========================================================================

    /// Risk report for the given players. Players without a record are
    /// skipped; `EmptyPortfolio` if none remain.
    pub fn portfolio_risk(&self, player_ids: &[PlayerId]) -> EngineResult<PortfolioRiskReport> {
        let key = format!("portfolio:{}", player_ids.join(","));
        self.cache.get_or_compute(&key, self.cache.ttl(), || {
            let players = self.accessor.players(player_ids)?;
            let mut holdings = Vec::with_capacity(player_ids.len());

            for player_id in player_ids {
                let Some(record) = self.accessor.latest_record(player_id)? else {
                    debug!(player_id = %player_id, "No value record, skipped from portfolio");
                    continue;
                };
                let trend = self.trend_for(player_id, record.date)?;
                holdings.push(Holding {
                    player_id: player_id.clone(),
                    player_name: players.get(player_id).map(|p| p.full_name.clone()),
                    value_score: record.value_score,
                    trend,
                    confidence_score: record.confidence_score,
                    momentum_score: record.momentum_score,
                });
            }

            assess(&holdings)
        })
    }

    /// Model-ranked buys on the latest value date.
    pub fn ml_recommendations(
        &self,
        model: &dyn ProbabilityModel,
        limit: usize,
    ) -> EngineResult<Vec<MlRecommendation>> {
        let key = format!("ml:{}:{limit}", model.identity());
        self.cache.get_or_compute(&key, self.cache.ttl(), || {
            let snapshot = self.require_snapshot()?;
            let mut pairs: Vec<(ValueIndexRecord, Option<ValueIndexRecord>)> =
                Vec::with_capacity(snapshot.records.len());
            for record in snapshot.records {
                let previous = self
                    .accessor
                    .latest_pair(&record.player_id)?
                    .into_iter()
                    .find(|r| r.date < record.date);
                pairs.push((record, previous));
            }
            ml_recommendations(model, &pairs, limit)
        })
    }

    /// Fantasy projections on the latest value date, best first.
    pub fn fantasy_lineup(
        &self,
        position: Option<&str>,
        limit: usize,
    ) -> EngineResult<Vec<FantasyProjection>> {
        let key = format!("fantasy:{}:{limit}", position.unwrap_or("*"));
        self.cache.get_or_compute(&key, self.cache.ttl(), || {
            let snapshot = self.require_snapshot()?;
            let roster: BTreeMap<PlayerId, PlayerIdentity> = self.accessor.roster_map()?;
            let mut projections = Vec::new();
            for record in &snapshot.records {
                let Some(identity) = roster.get(&record.player_id) else {
                    continue;
                };
                let games = self
                    .accessor
                    .recent_box_scores(&record.player_id, FANTASY_WINDOW)?;
                if let Some(p) = project(record, identity, &games) {
                    projections.push(p);
                }
            }
            Ok(rank_lineup(projections, position, limit))
        })
    }

    /// Mid-priced players with strong projections.
    pub fn value_picks(&self, limit: usize) -> EngineResult<Vec<FantasyProjection>> {
        let mut picks: Vec<FantasyProjection> = self
            .fantasy_lineup(None, VALUE_PICK_SCAN)?
            .into_iter()
            .filter(FantasyProjection::is_value_pick)
            .collect();
        picks.truncate(limit);
        Ok(picks)
    }

    pub fn flush_cache(&self) -> usize {
        self.cache.flush()
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn require_snapshot(&self) -> EngineResult<LatestSnapshot> {
        self.accessor
            .latest_snapshot()?
            .ok_or_else(|| EngineError::insufficient(1, 0))
    }

    fn trend_for(&self, player_id: &str, as_of: NaiveDate) -> EngineResult<TrendReading> {
        let history = self.accessor.trend_history(player_id, as_of)?;
        Ok(TrendReading::from_history(&history))
    }
}
