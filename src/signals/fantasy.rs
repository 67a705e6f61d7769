//! Fantasy point projections for lineup building.

use serde::Serialize;

use crate::data::models::{BoxScoreLine, PlayerIdentity, ValueIndexRecord};

use super::trend::{mean, population_std, round_to};

/// Minimum stat component for a player to be projected.
pub const FANTASY_MIN_STAT: f64 = 20.0;
/// Games considered per player, and the fewest that must exist.
pub const FANTASY_WINDOW: usize = 5;
pub const FANTASY_MIN_GAMES: usize = 3;

/// Value-pick band and floor.
const VALUE_PICK_MIN_SCORE: f64 = 40.0;
const VALUE_PICK_MAX_SCORE: f64 = 70.0;
const VALUE_PICK_MIN_PROJECTION: f64 = 30.0;

/// Standard scoring: pts + 1.2 reb + 1.5 ast + 3 stl + 3 blk - tov.
pub fn fantasy_points(line: &BoxScoreLine) -> f64 {
    f64::from(line.points)
        + 1.2 * f64::from(line.rebounds)
        + 1.5 * f64::from(line.assists)
        + 3.0 * f64::from(line.steals)
        + 3.0 * f64::from(line.blocks)
        - f64::from(line.turnovers)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FantasyProjection {
    pub player_id: String,
    pub player_name: String,
    pub team: String,
    pub position: String,
    pub projected_points: f64,
    pub avg_points: f64,
    pub consistency: f64,
    pub momentum: f64,
    pub value_score: f64,
}

impl FantasyProjection {
    pub fn is_value_pick(&self) -> bool {
        (VALUE_PICK_MIN_SCORE..=VALUE_PICK_MAX_SCORE).contains(&self.value_score)
            && self.projected_points > VALUE_PICK_MIN_PROJECTION
    }
}

/// Project one player. `None` when the stat component is too low or fewer
/// than three recent games exist. `games` is newest first.
pub fn project(
    record: &ValueIndexRecord,
    identity: &PlayerIdentity,
    games: &[BoxScoreLine],
) -> Option<FantasyProjection> {
    if record.stat_component < FANTASY_MIN_STAT {
        return None;
    }
    let recent = &games[..games.len().min(FANTASY_WINDOW)];
    if recent.len() < FANTASY_MIN_GAMES {
        return None;
    }

    let scores: Vec<f64> = recent.iter().map(fantasy_points).collect();
    let avg = mean(&scores);
    let consistency = 1.0 / (1.0 + population_std(&scores));
    let projected = avg * (1.0 + record.momentum_score * 0.1);

    Some(FantasyProjection {
        player_id: record.player_id.clone(),
        player_name: identity.full_name.clone(),
        team: identity.team_name.clone(),
        position: identity.position.clone(),
        projected_points: round_to(projected, 1),
        avg_points: round_to(avg, 1),
        consistency: round_to(consistency, 2),
        momentum: record.momentum_score,
        value_score: record.value_score,
    })
}

/// Sort by projection (highest first), keep players whose position contains
/// `position` (case-insensitive) and truncate.
pub fn rank_lineup(
    mut projections: Vec<FantasyProjection>,
    position: Option<&str>,
    limit: usize,
) -> Vec<FantasyProjection> {
    projections.sort_by(|a, b| b.projected_points.total_cmp(&a.projected_points));
    if let Some(pos) = position.map(str::to_lowercase).filter(|p| !p.is_empty()) {
        projections.retain(|p| p.position.to_lowercase().contains(&pos));
    }
    projections.truncate(limit);
    projections
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn game(day: u32, pts: u32, reb: u32, ast: u32, stl: u32, blk: u32, tov: u32) -> BoxScoreLine {
        BoxScoreLine {
            player_id: "p1".to_string(),
            game_date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            points: pts,
            rebounds: reb,
            assists: ast,
            steals: stl,
            blocks: blk,
            turnovers: tov,
            three_pointers_made: 0,
        }
    }

    fn record(stat: f64, momentum: f64, value: f64) -> ValueIndexRecord {
        ValueIndexRecord {
            player_id: "p1".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            value_score: value,
            stat_component: stat,
            sentiment_component: 0.0,
            momentum_score: momentum,
            confidence_score: 0.5,
        }
    }

    fn identity(position: &str) -> PlayerIdentity {
        PlayerIdentity {
            player_id: "p1".to_string(),
            full_name: "Test Player".to_string(),
            team_name: "Team".to_string(),
            position: position.to_string(),
        }
    }

    #[test]
    fn test_fantasy_points_scoring() {
        // 20 + 1.2*10 + 1.5*5 + 3*2 + 3*1 - 3 = 20 + 12 + 7.5 + 6 + 3 - 3 = 45.5
        assert!((fantasy_points(&game(1, 20, 10, 5, 2, 1, 3)) - 45.5).abs() < 1e-9);
    }

    #[test]
    fn test_projection_with_momentum() {
        // Three identical 45.5 games: avg 45.5, std 0, consistency 1.0
        // projected = 45.5 * (1 + 0.2 * 0.1) = 46.41 -> 46.4
        let games: Vec<_> = (1..=3).map(|d| game(d, 20, 10, 5, 2, 1, 3)).collect();
        let p = project(&record(30.0, 0.2, 55.0), &identity("G"), &games).unwrap();
        assert_eq!(p.avg_points, 45.5);
        assert_eq!(p.projected_points, 46.4);
        assert_eq!(p.consistency, 1.0);
        assert!(p.is_value_pick());
    }

    #[test]
    fn test_projection_eligibility() {
        let games: Vec<_> = (1..=3).map(|d| game(d, 20, 10, 5, 2, 1, 3)).collect();
        assert!(project(&record(19.9, 0.5, 55.0), &identity("G"), &games).is_none());
        assert!(project(&record(30.0, 0.5, 55.0), &identity("G"), &games[..2]).is_none());
    }

    #[test]
    fn test_rank_lineup_filters_position() {
        let mk = |pos: &str, pts: f64| FantasyProjection {
            player_id: pos.to_string(),
            player_name: String::new(),
            team: String::new(),
            position: pos.to_string(),
            projected_points: pts,
            avg_points: pts,
            consistency: 0.5,
            momentum: 0.0,
            value_score: 50.0,
        };
        let ranked = rank_lineup(
            vec![mk("C", 40.0), mk("G-F", 55.0), mk("F", 60.0), mk("G", 20.0)],
            Some("g"),
            10,
        );
        let ids: Vec<&str> = ranked.iter().map(|p| p.player_id.as_str()).collect();
        assert_eq!(ids, vec!["G-F", "G"]);

        let top = rank_lineup(vec![mk("C", 40.0), mk("F", 60.0)], None, 1);
        assert_eq!(top[0].player_id, "F");
    }
}
