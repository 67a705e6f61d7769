//! Core data models for the player market engine.
//!
//! Metric records and roster identities are read from the external stores;
//! quotes arrive per request from the odds provider; signals are derived
//! on demand and never persisted.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::EngineError;

pub type PlayerId = String;

// =============================================================================
// Metric records
// =============================================================================

/// Daily composite value record for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueIndexRecord {
    pub player_id: PlayerId,
    #[serde(alias = "value_date")]
    pub date: NaiveDate,
    pub value_score: f64,
    pub stat_component: f64,
    pub sentiment_component: f64,
    #[serde(default)]
    pub momentum_score: f64,
    #[serde(default)]
    pub confidence_score: f64,
}

/// One game's box score for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxScoreLine {
    pub player_id: PlayerId,
    pub game_date: NaiveDate,
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub rebounds: u32,
    #[serde(default)]
    pub assists: u32,
    #[serde(default)]
    pub steals: u32,
    #[serde(default)]
    pub blocks: u32,
    #[serde(default)]
    pub turnovers: u32,
    #[serde(default)]
    pub three_pointers_made: u32,
}

impl BoxScoreLine {
    /// Observed value for a prop stat type. Combo props sum their components.
    pub fn stat_value(&self, stat: StatType) -> f64 {
        let v = match stat {
            StatType::Points => self.points,
            StatType::Rebounds => self.rebounds,
            StatType::Assists => self.assists,
            StatType::Threes => self.three_pointers_made,
            StatType::Blocks => self.blocks,
            StatType::Steals => self.steals,
            StatType::Turnovers => self.turnovers,
            StatType::PointsReboundsAssists => self.points + self.rebounds + self.assists,
            StatType::PointsRebounds => self.points + self.rebounds,
            StatType::PointsAssists => self.points + self.assists,
            StatType::ReboundsAssists => self.rebounds + self.assists,
        };
        f64::from(v)
    }
}

/// Canonical roster identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    #[serde(alias = "id")]
    pub player_id: PlayerId,
    pub full_name: String,
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub position: String,
}

// =============================================================================
// Stat types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatType {
    Points,
    Rebounds,
    Assists,
    Threes,
    Blocks,
    Steals,
    Turnovers,
    PointsReboundsAssists,
    PointsRebounds,
    PointsAssists,
    ReboundsAssists,
}

impl StatType {
    pub const ALL: [StatType; 11] = [
        Self::Points,
        Self::Rebounds,
        Self::Assists,
        Self::Threes,
        Self::Blocks,
        Self::Steals,
        Self::Turnovers,
        Self::PointsReboundsAssists,
        Self::PointsRebounds,
        Self::PointsAssists,
        Self::ReboundsAssists,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Rebounds => "rebounds",
            Self::Assists => "assists",
            Self::Threes => "threes",
            Self::Blocks => "blocks",
            Self::Steals => "steals",
            Self::Turnovers => "turnovers",
            Self::PointsReboundsAssists => "points_rebounds_assists",
            Self::PointsRebounds => "points_rebounds",
            Self::PointsAssists => "points_assists",
            Self::ReboundsAssists => "rebounds_assists",
        }
    }

    /// Odds provider market key, e.g. `player_points`.
    pub fn market_key(&self) -> String {
        format!("player_{}", self.as_str())
    }

    /// Parse an odds provider market key (`player_points`).
    pub fn from_market_key(key: &str) -> Result<Self, EngineError> {
        let stripped = key
            .strip_prefix("player_")
            .ok_or_else(|| EngineError::InvalidStatType(key.to_string()))?;
        stripped
            .parse()
            .map_err(|_| EngineError::InvalidStatType(key.to_string()))
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Points => "Points",
            Self::Rebounds => "Rebounds",
            Self::Assists => "Assists",
            Self::Threes => "3-Pointers",
            Self::Blocks => "Blocks",
            Self::Steals => "Steals",
            Self::Turnovers => "Turnovers",
            Self::PointsReboundsAssists => "Pts+Reb+Ast",
            Self::PointsRebounds => "Pts+Reb",
            Self::PointsAssists => "Pts+Ast",
            Self::ReboundsAssists => "Reb+Ast",
        }
    }

    pub fn is_combo(&self) -> bool {
        matches!(
            self,
            Self::PointsReboundsAssists
                | Self::PointsRebounds
                | Self::PointsAssists
                | Self::ReboundsAssists
        )
    }
}

impl FromStr for StatType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| EngineError::InvalidStatType(s.to_string()))
    }
}

impl fmt::Display for StatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Quotes
// =============================================================================

/// A player prop quote as supplied by the odds provider. Prices are American odds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawQuote {
    pub player_name: String,
    pub stat_type: StatType,
    pub line: Decimal,
    pub over_price: Option<Decimal>,
    pub under_price: Option<Decimal>,
    pub bookmaker: String,
    #[serde(default)]
    pub home_team: String,
    #[serde(default)]
    pub away_team: String,
    #[serde(default)]
    pub commence_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Resolved(PlayerId),
    Unresolved,
}

impl Resolution {
    pub fn player_id(&self) -> Option<&str> {
        match self {
            Self::Resolved(id) => Some(id.as_str()),
            Self::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// A raw quote paired with its resolution outcome. The raw name is kept
/// on the quote either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedQuote {
    pub quote: RawQuote,
    pub resolution: Resolution,
}

/// The winning quote for one (player, stat type) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteBookEntry {
    pub player_id: PlayerId,
    pub stat_type: StatType,
    pub line: Decimal,
    pub bookmaker: String,
    pub over_price: Option<Decimal>,
    pub under_price: Option<Decimal>,
    pub home_team: String,
    pub away_team: String,
}

// =============================================================================
// Signal Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Buy,
    Sell,
    Watch,
    Hold,
    Pass,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Watch => "WATCH",
            Self::Hold => "HOLD",
            Self::Pass => "PASS",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Medium,
    High,
}

/// A directional market signal for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub player_id: PlayerId,
    pub direction: Direction,
    pub confidence_level: ConfidenceLevel,
    /// Ranking criterion; meaning depends on the direction (opportunity,
    /// risk or breakout score).
    pub score: f64,
    pub reason: String,
    /// Only set for BUY and SELL.
    pub urgency: Option<Urgency>,
}
