//! Fitted-classifier contract and the mapping from win probability to a
//! trade recommendation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::data::models::{ConfidenceLevel, PlayerId, ValueIndexRecord};
use crate::errors::{EngineError, EngineResult};

/// Minimum probability for a BUY to be reported.
pub const ML_MIN_BUY_PROBABILITY: f64 = 0.55;

pub const FEATURE_NAMES: [&str; 7] = [
    "stat_component",
    "sentiment_component",
    "momentum_score",
    "confidence_score",
    "value_score",
    "stat_trend",
    "sentiment_trend",
];

/// Model input vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelFeatures {
    pub stat_component: f64,
    pub sentiment_component: f64,
    pub momentum_score: f64,
    pub confidence_score: f64,
    pub value_score: f64,
    pub stat_trend: f64,
    pub sentiment_trend: f64,
}

impl ModelFeatures {
    /// Day-over-day deltas when the previous record is known, else the
    /// momentum proxy (`momentum * stat * 0.1`, `momentum * 0.1`).
    pub fn from_records(latest: &ValueIndexRecord, previous: Option<&ValueIndexRecord>) -> Self {
        let (stat_trend, sentiment_trend) = match previous {
            Some(prev) => (
                latest.stat_component - prev.stat_component,
                latest.sentiment_component - prev.sentiment_component,
            ),
            None => (
                latest.momentum_score * latest.stat_component * 0.1,
                latest.momentum_score * 0.1,
            ),
        };
        Self {
            stat_component: latest.stat_component,
            sentiment_component: latest.sentiment_component,
            momentum_score: latest.momentum_score,
            confidence_score: latest.confidence_score,
            value_score: latest.value_score,
            stat_trend,
            sentiment_trend,
        }
    }

    /// Values in `FEATURE_NAMES` order.
    pub fn as_array(&self) -> [f64; 7] {
        [
            self.stat_component,
            self.sentiment_component,
            self.momentum_score,
            self.confidence_score,
            self.value_score,
            self.stat_trend,
            self.sentiment_trend,
        ]
    }
}

/// A trained classifier giving the probability that buying is profitable.
pub trait ProbabilityModel: Send + Sync {
    fn predict_probability(&self, features: &ModelFeatures) -> EngineResult<f64>;

    /// Stable identity of the fitted parameters. Two models that can
    /// predict differently must return different identities.
    fn identity(&self) -> String;

    fn name(&self) -> &str {
        "model"
    }
}

/// Logistic regression over the seven features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    #[serde(default = "default_model_name")]
    pub name: String,
    pub bias: f64,
    pub weights: [f64; 7],
}

fn default_model_name() -> String {
    "logistic".to_string()
}

impl LogisticModel {
    pub fn new(bias: f64, weights: [f64; 7]) -> Self {
        Self {
            name: default_model_name(),
            bias,
            weights,
        }
    }

    pub fn from_json(raw: &str) -> EngineResult<Self> {
        serde_json::from_str(raw).map_err(|e| EngineError::Source(format!("model decode: {e}")))
    }

    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Source(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }
}

impl ProbabilityModel for LogisticModel {
    fn predict_probability(&self, features: &ModelFeatures) -> EngineResult<f64> {
        let z = self.bias
            + self
                .weights
                .iter()
                .zip(features.as_array())
                .map(|(w, x)| w * x)
                .sum::<f64>();
        Ok(1.0 / (1.0 + (-z).exp()))
    }

    fn identity(&self) -> String {
        let weights: Vec<String> = self
            .weights
            .iter()
            .map(|w| format!("{:x}", w.to_bits()))
            .collect();
        format!("{}:{:x}:{}", self.name, self.bias.to_bits(), weights.join(","))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// =============================================================================
// Interpretation
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelAction {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl ModelAction {
    pub fn is_buy(&self) -> bool {
        matches!(self, Self::StrongBuy | Self::Buy)
    }
}

impl fmt::Display for ModelAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::StrongBuy => "STRONG_BUY",
            Self::Buy => "BUY",
            Self::Hold => "HOLD",
            Self::Sell => "SELL",
            Self::StrongSell => "STRONG_SELL",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelPrediction {
    pub probability: f64,
    pub action: ModelAction,
    pub confidence_level: ConfidenceLevel,
}

/// Map a probability to an action. Confidence is HIGH when the probability
/// is more than 0.2 away from a coin flip.
pub fn interpret_probability(probability: f64) -> EngineResult<ModelPrediction> {
    if !(0.0..=1.0).contains(&probability) {
        return Err(EngineError::InvalidProbability(probability));
    }

    let action = if probability > 0.7 {
        ModelAction::StrongBuy
    } else if probability > 0.55 {
        ModelAction::Buy
    } else if probability < 0.3 {
        ModelAction::StrongSell
    } else if probability < 0.45 {
        ModelAction::Sell
    } else {
        ModelAction::Hold
    };

    let confidence_level = if (probability - 0.5).abs() > 0.2 {
        ConfidenceLevel::High
    } else {
        ConfidenceLevel::Medium
    };

    Ok(ModelPrediction {
        probability,
        action,
        confidence_level,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MlRecommendation {
    pub player_id: PlayerId,
    pub value_score: f64,
    pub momentum_score: f64,
    pub prediction: ModelPrediction,
}

/// Score each (latest, previous) pair and keep buys above
/// `ML_MIN_BUY_PROBABILITY`, most probable first.
pub fn ml_recommendations(
    model: &dyn ProbabilityModel,
    records: &[(ValueIndexRecord, Option<ValueIndexRecord>)],
    limit: usize,
) -> EngineResult<Vec<MlRecommendation>> {
    let mut out = Vec::new();
    for (latest, previous) in records {
        let features = ModelFeatures::from_records(latest, previous.as_ref());
        let prediction = interpret_probability(model.predict_probability(&features)?)?;
        if prediction.action.is_buy() && prediction.probability > ML_MIN_BUY_PROBABILITY {
            out.push(MlRecommendation {
                player_id: latest.player_id.clone(),
                value_score: latest.value_score,
                momentum_score: latest.momentum_score,
                prediction,
            });
        }
    }
    out.sort_by(|a, b| b.prediction.probability.total_cmp(&a.prediction.probability));
    out.truncate(limit);
    Ok(out)
}
