//! Heuristic buy / sell / breakout classification of value-index records.
//!
//! All thresholds live in [`SignalThresholds`]; the classifier functions are
//! pure over a record (plus a trend reading for sells).

use crate::data::models::{ConfidenceLevel, Direction, Signal, Urgency, ValueIndexRecord};

use super::trend::TrendReading;

/// Eligibility cutoffs for each signal type.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalThresholds {
    /// BUY requires stat_component above this.
    pub buy_min_stat: f64,
    /// BUY requires sentiment_component below this.
    pub buy_max_sentiment: f64,
    pub buy_min_confidence: f64,
    /// BUY urgency is HIGH above this confidence.
    pub buy_urgent_confidence: f64,

    pub sell_max_stat: f64,
    pub sell_min_sentiment: f64,
    pub sell_min_confidence: f64,
    /// SELL urgency is HIGH when the trend percentage is below this.
    pub sell_urgent_trend: f64,

    pub breakout_min_momentum: f64,
    /// Inclusive: sentiment must be at least this.
    pub breakout_min_sentiment: f64,
    pub breakout_min_stat: f64,
    /// Breakout potential is HIGH above this score.
    pub breakout_high_potential: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            buy_min_stat: 30.0,
            buy_max_sentiment: 0.0,
            buy_min_confidence: 0.1,
            buy_urgent_confidence: 0.5,

            sell_max_stat: 30.0,
            sell_min_sentiment: 0.2,
            sell_min_confidence: 0.1,
            sell_urgent_trend: -2.0,

            breakout_min_momentum: 0.15,
            breakout_min_sentiment: 0.0,
            breakout_min_stat: 15.0,
            breakout_high_potential: 50.0,
        }
    }
}

impl SignalThresholds {
    /// Stricter cutoffs of the earlier revision.
    pub fn conservative() -> Self {
        Self {
            buy_min_confidence: 0.3,
            sell_min_sentiment: 0.3,
            sell_min_confidence: 0.3,
            breakout_min_momentum: 0.2,
            breakout_min_stat: 20.0,
            ..Self::default()
        }
    }
}

/// Band a 0..1 confidence score.
pub fn confidence_band(confidence_score: f64) -> ConfidenceLevel {
    if confidence_score > 0.5 {
        ConfidenceLevel::High
    } else if confidence_score > 0.3 {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

/// Classifies records against one threshold set.
#[derive(Debug, Clone, Default)]
pub struct SignalClassifier {
    thresholds: SignalThresholds,
}

impl SignalClassifier {
    pub fn new(thresholds: SignalThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &SignalThresholds {
        &self.thresholds
    }

    /// Strong stats with negative sentiment: the market is undervaluing
    /// performance.
    pub fn classify_buy(&self, record: &ValueIndexRecord) -> Option<Signal> {
        let t = &self.thresholds;
        let stat = record.stat_component;
        let sentiment = record.sentiment_component;
        let confidence = record.confidence_score;

        if !(stat > t.buy_min_stat
            && sentiment < t.buy_max_sentiment
            && confidence > t.buy_min_confidence)
        {
            return None;
        }

        let score = stat * 0.6 + sentiment.abs() * 30.0 * 0.3 + confidence * 10.0;
        let urgency = if confidence > t.buy_urgent_confidence {
            Urgency::High
        } else {
            Urgency::Medium
        };

        Some(Signal {
            player_id: record.player_id.clone(),
            direction: Direction::Buy,
            confidence_level: confidence_band(confidence),
            score,
            reason: format!(
                "Strong stats ({stat:.1}) but negative sentiment ({sentiment:.2}). Market undervaluing performance."
            ),
            urgency: Some(urgency),
        })
    }

    /// Weak stats with high sentiment: the market is overvaluing hype.
    ///
    /// Urgency uses the multi-day value trend when one exists, else the
    /// momentum score scaled to a percentage.
    pub fn classify_sell(&self, record: &ValueIndexRecord, trend: &TrendReading) -> Option<Signal> {
        let t = &self.thresholds;
        let stat = record.stat_component;
        let sentiment = record.sentiment_component;
        let confidence = record.confidence_score;

        if !(stat < t.sell_max_stat
            && sentiment > t.sell_min_sentiment
            && confidence > t.sell_min_confidence)
        {
            return None;
        }

        let score = sentiment * 50.0 - stat * 0.5 + confidence * 10.0;
        let trend_pct = trend.percent.unwrap_or(record.momentum_score * 100.0);
        let urgency = if trend_pct < t.sell_urgent_trend {
            Urgency::High
        } else {
            Urgency::Medium
        };

        Some(Signal {
            player_id: record.player_id.clone(),
            direction: Direction::Sell,
            confidence_level: confidence_band(confidence),
            score,
            reason: format!(
                "High sentiment ({sentiment:.2}) but weak stats ({stat:.1}). Market overvaluing hype."
            ),
            urgency: Some(urgency),
        })
    }

    /// Rising momentum with non-negative sentiment and playable stats.
    pub fn classify_breakout(&self, record: &ValueIndexRecord) -> Option<Signal> {
        let t = &self.thresholds;
        let momentum = record.momentum_score;
        let sentiment = record.sentiment_component;
        let stat = record.stat_component;

        if !(momentum > t.breakout_min_momentum
            && sentiment >= t.breakout_min_sentiment
            && stat > t.breakout_min_stat)
        {
            return None;
        }

        let score = momentum * 50.0 + sentiment * 30.0 + stat * 0.3 + record.confidence_score * 10.0;
        let potential = if score > t.breakout_high_potential {
            ConfidenceLevel::High
        } else {
            ConfidenceLevel::Medium
        };

        Some(Signal {
            player_id: record.player_id.clone(),
            direction: Direction::Watch,
            confidence_level: potential,
            score,
            reason: format!(
                "Strong momentum ({momentum:.2}) with positive sentiment. Stats trending up."
            ),
            urgency: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(stat: f64, sentiment: f64, momentum: f64, confidence: f64) -> ValueIndexRecord {
        ValueIndexRecord {
            player_id: "p1".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            value_score: 55.0,
            stat_component: stat,
            sentiment_component: sentiment,
            momentum_score: momentum,
            confidence_score: confidence,
        }
    }

    #[test]
    fn test_buy_reference_case() {
        // 0.6*35 + 0.3*30*0.4 + 10*0.6 = 21 + 3.6 + 6 = 30.6
        let c = SignalClassifier::default();
        let s = c.classify_buy(&record(35.0, -0.4, 0.0, 0.6)).unwrap();
        assert_eq!(s.direction, Direction::Buy);
        assert_eq!(s.urgency, Some(Urgency::High));
        assert_eq!(s.confidence_level, ConfidenceLevel::High);
        assert!((s.score - 30.6).abs() < 1e-9);
        assert!(s.reason.contains("35.0"));
        assert!(s.reason.contains("-0.40"));
    }

    #[test]
    fn test_buy_requires_all_conditions() {
        let c = SignalClassifier::default();
        assert!(c.classify_buy(&record(30.0, -0.4, 0.0, 0.6)).is_none());
        assert!(c.classify_buy(&record(35.0, 0.0, 0.0, 0.6)).is_none());
        assert!(c.classify_buy(&record(35.0, -0.4, 0.0, 0.1)).is_none());
        // Medium urgency at 0.5 exactly.
        let s = c.classify_buy(&record(35.0, -0.4, 0.0, 0.5)).unwrap();
        assert_eq!(s.urgency, Some(Urgency::Medium));
        assert_eq!(s.confidence_level, ConfidenceLevel::Medium);
    }

    #[test]
    fn test_conservative_thresholds_reject_low_confidence_buy() {
        let r = record(35.0, -0.4, 0.0, 0.2);
        assert!(SignalClassifier::default().classify_buy(&r).is_some());
        assert!(SignalClassifier::new(SignalThresholds::conservative())
            .classify_buy(&r)
            .is_none());
    }

    #[test]
    fn test_sell_score_and_history_urgency() {
        // 50*0.5 - 0.5*20 + 10*0.4 = 25 - 10 + 4 = 19
        let c = SignalClassifier::default();
        let r = record(20.0, 0.5, 0.3, 0.4);
        let falling = TrendReading::from_history(&[45.0, 50.0]);
        let s = c.classify_sell(&r, &falling).unwrap();
        assert!((s.score - 19.0).abs() < 1e-9);
        assert_eq!(s.urgency, Some(Urgency::High));

        // History takes precedence over the positive momentum proxy.
        let rising = TrendReading::from_history(&[55.0, 50.0]);
        assert_eq!(c.classify_sell(&r, &rising).unwrap().urgency, Some(Urgency::Medium));
    }

    #[test]
    fn test_sell_momentum_proxy_without_history() {
        let c = SignalClassifier::default();
        // momentum -0.05 -> -5% trend
        let s = c
            .classify_sell(&record(20.0, 0.5, -0.05, 0.4), &TrendReading::insufficient())
            .unwrap();
        assert_eq!(s.urgency, Some(Urgency::High));
        let s = c
            .classify_sell(&record(20.0, 0.5, 0.0, 0.4), &TrendReading::insufficient())
            .unwrap();
        assert_eq!(s.urgency, Some(Urgency::Medium));
    }

    #[test]
    fn test_sell_rejects_low_sentiment() {
        let c = SignalClassifier::default();
        assert!(c
            .classify_sell(&record(20.0, 0.2, 0.0, 0.4), &TrendReading::insufficient())
            .is_none());
    }

    #[test]
    fn test_breakout_potential() {
        // 50*0.5 + 30*0.4 + 0.3*40 + 10*0.7 = 25 + 12 + 12 + 7 = 56
        let c = SignalClassifier::default();
        let s = c.classify_breakout(&record(40.0, 0.4, 0.5, 0.7)).unwrap();
        assert_eq!(s.direction, Direction::Watch);
        assert!((s.score - 56.0).abs() < 1e-9);
        assert_eq!(s.confidence_level, ConfidenceLevel::High);
        assert_eq!(s.urgency, None);

        // 50*0.2 + 0 + 0.3*20 + 10*0.5 = 10 + 6 + 5 = 21
        let s = c.classify_breakout(&record(20.0, 0.0, 0.2, 0.5)).unwrap();
        assert_eq!(s.confidence_level, ConfidenceLevel::Medium);
        assert!(c.classify_breakout(&record(20.0, -0.1, 0.2, 0.5)).is_none());
        assert!(c.classify_breakout(&record(20.0, 0.1, 0.15, 0.5)).is_none());
    }
}
