//! Typed read access to metric records and the roster.

use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::data::models::{BoxScoreLine, PlayerId, PlayerIdentity, StatType, ValueIndexRecord};
use crate::data::store::{MetricsStore, RosterStore};
use crate::errors::EngineResult;

/// Days of value history used for trend computation.
pub const TREND_LOOKBACK_DAYS: i64 = 7;

/// Upper bound on history rows fetched per player.
const MAX_HISTORY_ROWS: usize = 64;

/// Records on the most recent value date.
#[derive(Debug, Clone)]
pub struct LatestSnapshot {
    pub date: NaiveDate,
    pub records: Vec<ValueIndexRecord>,
}

/// Thin typed layer over the metrics and roster stores.
#[derive(Clone)]
pub struct MetricRecordAccessor {
    metrics: Arc<dyn MetricsStore>,
    roster: Arc<dyn RosterStore>,
}

impl MetricRecordAccessor {
    pub fn new(metrics: Arc<dyn MetricsStore>, roster: Arc<dyn RosterStore>) -> Self {
        Self { metrics, roster }
    }

    /// All records on the latest value date, or `None` if the store is empty.
    pub fn latest_snapshot(&self) -> EngineResult<Option<LatestSnapshot>> {
        let Some(date) = self.metrics.latest_value_date()? else {
            return Ok(None);
        };
        let records = self.metrics.records_on(date)?;
        Ok(Some(LatestSnapshot { date, records }))
    }

    pub fn latest_record(&self, player_id: &str) -> EngineResult<Option<ValueIndexRecord>> {
        Ok(self.metrics.latest_records(player_id, 1, None)?.into_iter().next())
    }

    /// The two most recent records (newest first) for day-over-day deltas.
    pub fn latest_pair(&self, player_id: &str) -> EngineResult<Vec<ValueIndexRecord>> {
        self.metrics.latest_records(player_id, 2, None)
    }

    /// Value scores since `since`, newest first.
    pub fn value_history(&self, player_id: &str, since: NaiveDate) -> EngineResult<Vec<f64>> {
        Ok(self
            .metrics
            .latest_records(player_id, MAX_HISTORY_ROWS, Some(since))?
            .into_iter()
            .map(|r| r.value_score)
            .collect())
    }

    /// Value scores over the trend lookback window ending at `as_of`.
    pub fn trend_history(&self, player_id: &str, as_of: NaiveDate) -> EngineResult<Vec<f64>> {
        self.value_history(player_id, as_of - Duration::days(TREND_LOOKBACK_DAYS))
    }

    pub fn recent_box_scores(&self, player_id: &str, limit: usize) -> EngineResult<Vec<BoxScoreLine>> {
        self.metrics.recent_box_scores(player_id, limit)
    }

    /// Last `limit` observed values of a prop stat, newest first. Combo
    /// stats are summed from their component columns.
    pub fn stat_series(
        &self,
        player_id: &str,
        stat: StatType,
        limit: usize,
    ) -> EngineResult<Vec<f64>> {
        Ok(self
            .metrics
            .recent_box_scores(player_id, limit)?
            .iter()
            .map(|line| line.stat_value(stat))
            .collect())
    }

    /// Full roster keyed (and therefore ordered) by player ID.
    pub fn roster_map(&self) -> EngineResult<BTreeMap<PlayerId, PlayerIdentity>> {
        Ok(self
            .roster
            .players(None)?
            .into_iter()
            .map(|p| (p.player_id.clone(), p))
            .collect())
    }

    pub fn players(&self, ids: &[PlayerId]) -> EngineResult<BTreeMap<PlayerId, PlayerIdentity>> {
        Ok(self
            .roster
            .players(Some(ids))?
            .into_iter()
            .map(|p| (p.player_id.clone(), p))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::store::InMemoryStore;

    fn store_with_games() -> InMemoryStore {
        let store = InMemoryStore::new();
        for (d, pts, reb, ast) in [(1, 20, 5, 3), (2, 30, 10, 8), (3, 25, 7, 6)] {
            store.insert_box_score(BoxScoreLine {
                player_id: "p1".into(),
                game_date: NaiveDate::from_ymd_opt(2025, 2, d).unwrap(),
                points: pts,
                rebounds: reb,
                assists: ast,
                steals: 0,
                blocks: 0,
                turnovers: 0,
                three_pointers_made: 2,
            });
        }
        store
    }

    #[test]
    fn test_stat_series_derives_combo_props() {
        let store = Arc::new(store_with_games());
        let accessor = MetricRecordAccessor::new(store.clone(), store);

        let pra = accessor
            .stat_series("p1", StatType::PointsReboundsAssists, 5)
            .unwrap();
        // Newest first: 25+7+6, 30+10+8, 20+5+3
        assert_eq!(pra, vec![38.0, 48.0, 28.0]);

        let threes = accessor.stat_series("p1", StatType::Threes, 2).unwrap();
        assert_eq!(threes, vec![2.0, 2.0]);
    }

    #[test]
    fn test_latest_snapshot_empty_store() {
        let store = Arc::new(InMemoryStore::new());
        let accessor = MetricRecordAccessor::new(store.clone(), store);
        assert!(accessor.latest_snapshot().unwrap().is_none());
    }
}
