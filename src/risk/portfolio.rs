//! Portfolio risk aggregation.
//!
//! Each holding is banded into exactly one individual risk level, then the
//! portfolio score adds three independent contributions:
//! - share of HIGH (x40) and MEDIUM (x20) holdings
//! - mean value score band (30 / 15 / 0)
//! - mean trend band (30 / 20 / 10 / 0)
//!
//! The natural maxima sum to 100.

use serde::Serialize;
use tracing::debug;

use crate::data::models::{ConfidenceLevel, PlayerId};
use crate::errors::{EngineError, EngineResult};
use crate::signals::trend::{classify_trend, mean, population_std, round_to, TrendClass, TrendReading};

/// Names listed per recommendation line.
const NAMES_PER_FINDING: usize = 3;

/// One holding as input to the assessment.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub player_id: PlayerId,
    pub player_name: Option<String>,
    pub value_score: f64,
    pub trend: TrendReading,
    pub confidence_score: f64,
    pub momentum_score: f64,
}

impl Holding {
    /// A holding with only the fields the risk bands use.
    pub fn new(player_id: impl Into<PlayerId>, value_score: f64, trend_percent: f64) -> Self {
        Self {
            player_id: player_id.into(),
            player_name: None,
            value_score,
            trend: TrendReading {
                percent: Some(trend_percent),
                class: classify_trend(trend_percent),
            },
            confidence_score: 0.0,
            momentum_score: 0.0,
        }
    }

    fn trend_pct(&self) -> f64 {
        self.trend.percent_or_zero()
    }

    fn label(&self) -> &str {
        self.player_name.as_deref().unwrap_or(&self.player_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingRisk {
    pub player_id: PlayerId,
    pub player_name: Option<String>,
    pub value_score: f64,
    pub trend: f64,
    pub trend_class: TrendClass,
    /// Set when the trend was defaulted to 0 for lack of history.
    pub insufficient_data: bool,
    pub individual_risk: ConfidenceLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioRiskReport {
    pub portfolio_size: usize,
    pub avg_value_score: f64,
    pub avg_confidence: f64,
    pub avg_momentum: f64,
    pub avg_trend: f64,
    pub risk_score: f64,
    pub risk_level: ConfidenceLevel,
    pub diversification_score: f64,
    pub high_risk_players: usize,
    pub medium_risk_players: usize,
    pub low_risk_players: usize,
    pub players: Vec<HoldingRisk>,
    pub recommendations: Vec<String>,
}

/// HIGH for a steep decline or a very low value, MEDIUM for a moderate
/// decline or a middling value, LOW otherwise.
pub fn individual_risk(value_score: f64, trend: f64) -> ConfidenceLevel {
    if trend < -20.0 || value_score < 30.0 {
        ConfidenceLevel::High
    } else if (-20.0..-5.0).contains(&trend) || (30.0..50.0).contains(&value_score) {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

/// HIGH above 40, MEDIUM above 20.
pub fn risk_level(risk_score: f64) -> ConfidenceLevel {
    if risk_score > 40.0 {
        ConfidenceLevel::High
    } else if risk_score > 20.0 {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

fn value_penalty(avg_value: f64) -> f64 {
    if avg_value < 40.0 {
        30.0
    } else if avg_value < 60.0 {
        15.0
    } else {
        0.0
    }
}

fn trend_penalty(avg_trend: f64) -> f64 {
    if avg_trend < -10.0 {
        30.0
    } else if avg_trend < -5.0 {
        20.0
    } else if avg_trend < 0.0 {
        10.0
    } else {
        0.0
    }
}

/// Assess a portfolio. Fails with `EmptyPortfolio` for zero holdings.
pub fn assess(holdings: &[Holding]) -> EngineResult<PortfolioRiskReport> {
    if holdings.is_empty() {
        return Err(EngineError::EmptyPortfolio);
    }
    let n = holdings.len() as f64;

    let values: Vec<f64> = holdings.iter().map(|h| h.value_score).collect();
    let trends: Vec<f64> = holdings.iter().map(Holding::trend_pct).collect();
    let avg_value = mean(&values);
    let avg_trend = mean(&trends);
    let avg_confidence = mean(&holdings.iter().map(|h| h.confidence_score).collect::<Vec<_>>());
    let avg_momentum = mean(&holdings.iter().map(|h| h.momentum_score).collect::<Vec<_>>());

    let players: Vec<HoldingRisk> = holdings
        .iter()
        .map(|h| HoldingRisk {
            player_id: h.player_id.clone(),
            player_name: h.player_name.clone(),
            value_score: h.value_score,
            trend: h.trend_pct(),
            trend_class: h.trend.class,
            insufficient_data: h.trend.is_insufficient(),
            individual_risk: individual_risk(h.value_score, h.trend_pct()),
        })
        .collect();

    let count = |level: ConfidenceLevel| players.iter().filter(|p| p.individual_risk == level).count();
    let high = count(ConfidenceLevel::High);
    let medium = count(ConfidenceLevel::Medium);
    let low = count(ConfidenceLevel::Low);

    let risk_score = high as f64 / n * 40.0
        + medium as f64 / n * 20.0
        + value_penalty(avg_value)
        + trend_penalty(avg_trend);

    let diversification = if avg_value > 0.0 {
        (population_std(&values) / avg_value * 100.0).min(100.0)
    } else {
        0.0
    };

    debug!(
        holdings = holdings.len(),
        high, medium, low, risk_score, "Portfolio assessed"
    );

    Ok(PortfolioRiskReport {
        portfolio_size: holdings.len(),
        avg_value_score: round_to(avg_value, 2),
        avg_confidence: round_to(avg_confidence, 3),
        avg_momentum: round_to(avg_momentum, 3),
        avg_trend: round_to(avg_trend, 2),
        risk_score: round_to(risk_score, 2),
        risk_level: risk_level(risk_score),
        diversification_score: round_to(diversification, 1),
        high_risk_players: high,
        medium_risk_players: medium,
        low_risk_players: low,
        players,
        recommendations: recommendations(holdings, risk_score),
    })
}

/// Templated findings, each only when its group is non-empty, followed by
/// one overall verdict.
pub fn recommendations(holdings: &[Holding], risk_score: f64) -> Vec<String> {
    let steep: Vec<&Holding> = holdings.iter().filter(|h| h.trend_pct() < -20.0).collect();
    let declining: Vec<&Holding> = holdings
        .iter()
        .filter(|h| (-20.0..-5.0).contains(&h.trend_pct()))
        .collect();
    let low_value: Vec<&Holding> = holdings.iter().filter(|h| h.value_score < 40.0).collect();
    let rising: Vec<&Holding> = holdings.iter().filter(|h| h.trend_pct() > 10.0).collect();
    let high_value: Vec<&Holding> = holdings.iter().filter(|h| h.value_score >= 70.0).collect();

    let findings = [
        (steep, "declining rapidly (>20%)", "Consider selling."),
        (declining, "showing negative trends", "Monitor closely."),
        (low_value, "have low value scores (<40)", "High risk."),
        (rising, "rising fast", "Good holds."),
        (high_value, "have strong value scores (>70)", "Core assets."),
    ];

    let mut out = Vec::new();
    for (members, finding, advice) in findings {
        if members.is_empty() {
            continue;
        }
        let names: Vec<&str> = members
            .iter()
            .take(NAMES_PER_FINDING)
            .map(|h| h.label())
            .collect();
        out.push(format!(
            "{} player(s) {finding}: {}. {advice}",
            members.len(),
            names.join(", ")
        ));
    }

    out.push(
        match risk_level(risk_score) {
            ConfidenceLevel::High => {
                "Overall: High risk portfolio. Consider rebalancing with more stable players."
            }
            ConfidenceLevel::Medium => "Overall: Medium risk portfolio. Some concerns but manageable.",
            ConfidenceLevel::Low => {
                "Overall: Low risk portfolio. Well-balanced with strong fundamentals."
            }
        }
        .to_string(),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_healthy_portfolio_scores_zero() {
        let holdings: Vec<Holding> = (0..4).map(|i| Holding::new(format!("p{i}"), 80.0, 5.0)).collect();
        let report = assess(&holdings).unwrap();
        assert_eq!(report.risk_score, 0.0);
        assert_eq!(report.risk_level, ConfidenceLevel::Low);
        assert_eq!(report.low_risk_players, 4);
        assert_eq!(report.diversification_score, 0.0);
    }

    #[test]
    fn test_collapsing_portfolio_scores_hundred() {
        // 40 (all HIGH) + 30 (mean value < 40) + 30 (mean trend < -10)
        let holdings: Vec<Holding> = (0..3).map(|i| Holding::new(format!("p{i}"), 20.0, -30.0)).collect();
        let report = assess(&holdings).unwrap();
        assert!(report.players.iter().all(|p| p.individual_risk == ConfidenceLevel::High));
        assert_eq!(report.risk_score, 100.0);
        assert_eq!(report.risk_level, ConfidenceLevel::High);
    }

    #[test]
    fn test_empty_portfolio_is_an_error() {
        assert_eq!(assess(&[]), Err(EngineError::EmptyPortfolio));
    }

    #[test]
    fn test_individual_bands_are_exclusive() {
        assert_eq!(individual_risk(80.0, -21.0), ConfidenceLevel::High);
        assert_eq!(individual_risk(29.9, 10.0), ConfidenceLevel::High);
        assert_eq!(individual_risk(80.0, -20.0), ConfidenceLevel::Medium);
        assert_eq!(individual_risk(80.0, -5.0), ConfidenceLevel::Low);
        assert_eq!(individual_risk(30.0, 0.0), ConfidenceLevel::Medium);
        assert_eq!(individual_risk(50.0, 0.0), ConfidenceLevel::Low);
    }

    #[test]
    fn test_mixed_portfolio() {
        // p1 LOW (75, +12), p2 MEDIUM (45, -8), p3 HIGH (25, -25)
        // share: 40/3 + 20/3 = 20
        // mean value 48.33 -> +15; mean trend -7 -> +20
        // total 55 -> HIGH
        let holdings = vec![
            Holding::new("p1", 75.0, 12.0),
            Holding::new("p2", 45.0, -8.0),
            Holding::new("p3", 25.0, -25.0),
        ];
        let report = assess(&holdings).unwrap();
        assert_eq!(report.risk_score, 55.0);
        assert_eq!(report.risk_level, ConfidenceLevel::High);
        assert_eq!(
            (report.high_risk_players, report.medium_risk_players, report.low_risk_players),
            (1, 1, 1)
        );
        assert_eq!(report.avg_trend, -7.0);

        // steep, declining, low value, rising, high value, verdict
        let recs = &report.recommendations;
        assert_eq!(recs.len(), 6);
        assert_eq!(recs[0], "1 player(s) declining rapidly (>20%): p3. Consider selling.");
        assert!(recs[3].contains("rising fast: p1"));
        assert!(recs[5].starts_with("Overall: High risk"));
    }

    #[test]
    fn test_names_used_when_known_and_capped_at_three() {
        let holdings: Vec<Holding> = ["Ann", "Bo", "Cy", "Di"]
            .iter()
            .enumerate()
            .map(|(i, name)| Holding {
                player_name: Some(name.to_string()),
                ..Holding::new(format!("p{i}"), 90.0, 0.0)
            })
            .collect();
        let recs = recommendations(&holdings, 0.0);
        assert_eq!(
            recs[0],
            "4 player(s) have strong value scores (>70): Ann, Bo, Cy. Core assets."
        );
        assert!(recs[1].starts_with("Overall: Low risk"));
    }

    #[test]
    fn test_insufficient_history_flagged() {
        let mut h = Holding::new("p1", 60.0, 0.0);
        h.trend = TrendReading::insufficient();
        let report = assess(&[h]).unwrap();
        assert!(report.players[0].insufficient_data);
        assert_eq!(report.players[0].trend, 0.0);
        assert_eq!(report.players[0].trend_class, TrendClass::InsufficientData);
    }

    #[test]
    fn test_diversification_capped() {
        // values 1 and 199: mean 100, std 99 -> 99
        let holdings = vec![Holding::new("a", 1.0, 0.0), Holding::new("b", 199.0, 0.0)];
        assert_eq!(assess(&holdings).unwrap().diversification_score, 99.0);
        // values 0 and 10: mean 5, std 5 -> 100 (cap)
        let holdings = vec![Holding::new("a", 0.0, 0.0), Holding::new("b", 10.0, 0.0)];
        assert_eq!(assess(&holdings).unwrap().diversification_score, 100.0);
    }
}
