//! Player prop recommendations from recent box scores.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use crate::data::models::{
    BoxScoreLine, ConfidenceLevel, PlayerId, PlayerIdentity, QuoteBookEntry, StatType,
    ValueIndexRecord,
};
use crate::errors::{EngineError, EngineResult};

use super::trend::{mean, population_std, round_to};

/// Fewest games a prop call may be based on.
pub const PROP_MIN_GAMES: usize = 3;
/// Games averaged for a prop call.
pub const PROP_WINDOW: usize = 5;
/// Games read for prop insights (last-5 vs last-10 trend).
pub const INSIGHT_WINDOW: usize = 10;

const STRONG_EDGE: f64 = 2.0;
const SLIGHT_EDGE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropCall {
    Over,
    Under,
    Pass,
}

impl fmt::Display for PropCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Over => "OVER",
            Self::Under => "UNDER",
            Self::Pass => "PASS",
        };
        f.write_str(s)
    }
}

/// Outcome of comparing a player's recent form to a posted line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropRecommendation {
    pub call: PropCall,
    pub confidence_level: ConfidenceLevel,
    /// Mean of the sampled games minus the line.
    pub edge: f64,
    pub player_avg: f64,
    pub std: f64,
    pub consistency: ConfidenceLevel,
    pub games: usize,
    pub line: f64,
    pub reason: String,
}

impl PropRecommendation {
    pub fn is_pass(&self) -> bool {
        self.call == PropCall::Pass
    }
}

/// Classify a prop line against the newest `PROP_WINDOW` observed values
/// (newest first). At least `PROP_MIN_GAMES` values are required.
pub fn classify_prop(recent_values: &[f64], line: f64) -> EngineResult<PropRecommendation> {
    if recent_values.len() < PROP_MIN_GAMES {
        return Err(EngineError::insufficient(PROP_MIN_GAMES, recent_values.len()));
    }
    let sample = &recent_values[..recent_values.len().min(PROP_WINDOW)];
    let avg = mean(sample);
    let std = population_std(sample);
    let edge = avg - line;

    let (call, confidence_level, reason) = if edge > STRONG_EDGE {
        (
            PropCall::Over,
            ConfidenceLevel::High,
            format!("Averaging {avg:.1}, line is {line} - strong value"),
        )
    } else if edge > SLIGHT_EDGE {
        (
            PropCall::Over,
            ConfidenceLevel::Medium,
            format!("Averaging {avg:.1}, slight edge over {line}"),
        )
    } else if edge < -STRONG_EDGE {
        (
            PropCall::Under,
            ConfidenceLevel::Medium,
            format!("Averaging {avg:.1}, line seems high at {line}"),
        )
    } else {
        (
            PropCall::Pass,
            ConfidenceLevel::Low,
            format!("Line {line} fairly priced (avg: {avg:.1})"),
        )
    };

    Ok(PropRecommendation {
        call,
        confidence_level,
        edge,
        player_avg: avg,
        std,
        consistency: consistency_band(std),
        games: sample.len(),
        line,
        reason,
    })
}

/// HIGH below 3, MEDIUM below 5, else LOW.
pub fn consistency_band(std: f64) -> ConfidenceLevel {
    if std < 3.0 {
        ConfidenceLevel::High
    } else if std < 5.0 {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

/// The non-PASS recommendation with the largest absolute edge. Equal edges
/// keep the earlier candidate.
pub fn best_pick<I>(candidates: I) -> Option<(QuoteBookEntry, PropRecommendation)>
where
    I: IntoIterator<Item = (QuoteBookEntry, PropRecommendation)>,
{
    let mut best: Option<(QuoteBookEntry, PropRecommendation)> = None;
    for (entry, rec) in candidates {
        if rec.is_pass() {
            continue;
        }
        let beats = best
            .as_ref()
            .map(|(_, b)| rec.edge.abs() > b.edge.abs())
            .unwrap_or(true);
        if beats {
            best = Some((entry, rec));
        }
    }
    best
}

// =============================================================================
// Prop insights
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormTrend {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineSource {
    Sportsbook,
    Calculated,
}

/// Recent-form summary for one core stat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatForm {
    pub stat_type: StatType,
    pub avg_last_5: f64,
    pub avg_last_10: f64,
    pub trend: FormTrend,
    pub std_last_5: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightPick {
    pub stat_type: StatType,
    pub line: f64,
    pub line_source: LineSource,
    pub call: PropCall,
    pub confidence_level: ConfidenceLevel,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropInsights {
    pub games: usize,
    pub forms: Vec<StatForm>,
    pub picks: Vec<InsightPick>,
}

const INSIGHT_STATS: [StatType; 3] = [StatType::Points, StatType::Rebounds, StatType::Assists];

/// Summarise points, rebounds and assists form and emit OVER picks for
/// stats trending up. `book_line` supplies a sportsbook line when one is
/// known; otherwise the last-5 mean (one decimal) stands in.
pub fn prop_insights<F>(games: &[BoxScoreLine], book_line: F) -> EngineResult<PropInsights>
where
    F: Fn(StatType) -> Option<f64>,
{
    if games.len() < PROP_MIN_GAMES {
        return Err(EngineError::insufficient(PROP_MIN_GAMES, games.len()));
    }
    let last_10 = &games[..games.len().min(INSIGHT_WINDOW)];
    let last_5 = &games[..games.len().min(PROP_WINDOW)];

    let mut forms = Vec::with_capacity(INSIGHT_STATS.len());
    let mut picks = Vec::new();

    for stat in INSIGHT_STATS {
        let five: Vec<f64> = last_5.iter().map(|g| g.stat_value(stat)).collect();
        let ten: Vec<f64> = last_10.iter().map(|g| g.stat_value(stat)).collect();
        let avg5 = mean(&five);
        let avg10 = mean(&ten);
        let std = population_std(&five);
        let trend = if avg5 > avg10 {
            FormTrend::Up
        } else {
            FormTrend::Down
        };

        let pick = match (stat, trend) {
            (StatType::Points, FormTrend::Up) if std < 5.0 => Some((
                ConfidenceLevel::High,
                format!("Trending up ({avg5:.1} vs {avg10:.1}) with low variance"),
            )),
            (StatType::Points, FormTrend::Up) => Some((
                ConfidenceLevel::Medium,
                format!("Trending up but inconsistent (std: {std:.1})"),
            )),
            (StatType::Rebounds | StatType::Assists, FormTrend::Up) if std < 2.0 => Some((
                ConfidenceLevel::High,
                format!("Trending up ({avg5:.1} vs {avg10:.1}) with consistency"),
            )),
            _ => None,
        };

        if let Some((confidence_level, reason)) = pick {
            let (line, line_source) = match book_line(stat) {
                Some(l) => (l, LineSource::Sportsbook),
                None => (round_to(avg5, 1), LineSource::Calculated),
            };
            picks.push(InsightPick {
                stat_type: stat,
                line,
                line_source,
                call: PropCall::Over,
                confidence_level,
                reason,
            });
        }

        forms.push(StatForm {
            stat_type: stat,
            avg_last_5: round_to(avg5, 1),
            avg_last_10: round_to(avg10, 1),
            trend,
            std_last_5: round_to(std, 2),
        });
    }

    Ok(PropInsights {
        games: last_10.len(),
        forms,
        picks,
    })
}

// =============================================================================
// Momentum picks
// =============================================================================

/// Momentum a record needs before it is considered for a points pick.
pub const MOMENTUM_PICK_MIN_MOMENTUM: f64 = 0.2;
/// Confidence a record needs before it is considered for a points pick.
pub const MOMENTUM_PICK_MIN_CONFIDENCE: f64 = 0.3;
/// Estimated lines sit this far under the five-game average.
const ESTIMATED_LINE_DISCOUNT: f64 = 1.5;

/// A points prop suggested by a player's value momentum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MomentumPick {
    pub player_id: PlayerId,
    pub player_name: String,
    pub team: String,
    pub position: String,
    pub momentum_score: f64,
    pub confidence_score: f64,
    pub stat_type: StatType,
    pub line: f64,
    pub line_source: LineSource,
    pub bookmaker: Option<String>,
    pub over_price: Option<Decimal>,
    pub under_price: Option<Decimal>,
    pub call: PropCall,
    pub confidence_level: ConfidenceLevel,
    pub reason: String,
    pub player_avg: f64,
    pub consistency: ConfidenceLevel,
}

impl MomentumPick {
    pub fn has_book_line(&self) -> bool {
        self.line_source == LineSource::Sportsbook
    }
}

/// Points-scoring consistency: HIGH below 5, MEDIUM below 8, else LOW.
pub fn points_consistency_band(std: f64) -> ConfidenceLevel {
    if std < 5.0 {
        ConfidenceLevel::High
    } else if std < 8.0 {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

/// Points pick for a record with enough momentum and confidence.
///
/// `games` are newest first; the newest five give the average and spread,
/// the newest ten the longer average. A book line is judged against the
/// five-game average; without one the line is estimated and the pick is a
/// plain momentum OVER. `None` when the record misses either threshold or
/// fewer than `PROP_MIN_GAMES` games exist.
pub fn momentum_pick(
    record: &ValueIndexRecord,
    identity: &PlayerIdentity,
    games: &[BoxScoreLine],
    book_line: Option<&QuoteBookEntry>,
) -> Option<MomentumPick> {
    if record.momentum_score < MOMENTUM_PICK_MIN_MOMENTUM
        || record.confidence_score < MOMENTUM_PICK_MIN_CONFIDENCE
        || games.len() < PROP_MIN_GAMES
    {
        return None;
    }

    let points: Vec<f64> = games
        .iter()
        .take(INSIGHT_WINDOW)
        .map(|g| g.stat_value(StatType::Points))
        .collect();
    let last_5 = &points[..points.len().min(PROP_WINDOW)];
    let avg_5 = mean(last_5);
    let avg_10 = mean(&points);
    let std = population_std(last_5);

    let book_price = book_line.and_then(|e| e.line.to_f64().map(|line| (e, line)));
    let (line, line_source, call, confidence_level, reason) = match book_price {
        Some((_, line)) => {
            let (call, mut level, mut reason) = if avg_5 > line + STRONG_EDGE {
                (
                    PropCall::Over,
                    if std < 5.0 {
                        ConfidenceLevel::High
                    } else {
                        ConfidenceLevel::Medium
                    },
                    format!("Averaging {avg_5:.1}, line is {line} - strong value"),
                )
            } else if avg_5 > line {
                (
                    PropCall::Over,
                    ConfidenceLevel::Medium,
                    format!("Averaging {avg_5:.1}, slight edge over {line}"),
                )
            } else if avg_5 < line - STRONG_EDGE {
                (
                    PropCall::Under,
                    ConfidenceLevel::Medium,
                    format!("Averaging {avg_5:.1}, line seems high at {line}"),
                )
            } else {
                (
                    PropCall::Pass,
                    ConfidenceLevel::Low,
                    format!("Line {line} fairly priced (avg: {avg_5:.1})"),
                )
            };
            if call == PropCall::Over && avg_5 > avg_10 {
                level = ConfidenceLevel::High;
                reason.push_str(" + trending up");
            }
            (line, LineSource::Sportsbook, call, level, reason)
        }
        None => (
            round_to(avg_5 - ESTIMATED_LINE_DISCOUNT, 1),
            LineSource::Calculated,
            PropCall::Over,
            ConfidenceLevel::Medium,
            format!("Hot streak with {:.2} momentum", record.momentum_score),
        ),
    };

    let book = book_price.map(|(e, _)| e);
    Some(MomentumPick {
        player_id: record.player_id.clone(),
        player_name: identity.full_name.clone(),
        team: identity.team_name.clone(),
        position: identity.position.clone(),
        momentum_score: record.momentum_score,
        confidence_score: record.confidence_score,
        stat_type: StatType::Points,
        line,
        line_source,
        bookmaker: book.map(|e| e.bookmaker.clone()),
        over_price: book.and_then(|e| e.over_price),
        under_price: book.and_then(|e| e.under_price),
        call,
        confidence_level,
        reason,
        player_avg: round_to(avg_5, 1),
        consistency: points_consistency_band(std),
    })
}

/// Book-priced picks first, then by confidence level, then by momentum.
pub fn rank_momentum_picks(mut picks: Vec<MomentumPick>, limit: usize) -> Vec<MomentumPick> {
    picks.sort_by(|a, b| {
        (b.has_book_line(), b.confidence_level)
            .cmp(&(a.has_book_line(), a.confidence_level))
            .then_with(|| b.momentum_score.total_cmp(&a.momentum_score))
    });
    picks.truncate(limit);
    picks
}
