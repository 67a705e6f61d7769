//! Store contracts for metric and roster data, plus an in-memory,
//! snapshot-backed implementation.
//!
//! The engine never writes to these stores. Persistence and ingestion are
//! owned by external jobs; this module only defines the filtered/sorted
//! reads the engine needs.

use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::data::models::{BoxScoreLine, PlayerId, PlayerIdentity, ValueIndexRecord};
use crate::errors::{EngineError, EngineResult};

/// Read access to value-index and box-score records.
pub trait MetricsStore: Send + Sync {
    /// Most recent date with any value-index record.
    fn latest_value_date(&self) -> EngineResult<Option<NaiveDate>>;

    /// All value-index records written on `date`.
    fn records_on(&self, date: NaiveDate) -> EngineResult<Vec<ValueIndexRecord>>;

    /// Latest `limit` records for a player, newest first, optionally
    /// restricted to `date >= since`.
    fn latest_records(
        &self,
        player_id: &str,
        limit: usize,
        since: Option<NaiveDate>,
    ) -> EngineResult<Vec<ValueIndexRecord>>;

    /// Latest `limit` box-score lines for a player, newest first.
    fn recent_box_scores(&self, player_id: &str, limit: usize) -> EngineResult<Vec<BoxScoreLine>>;
}

/// Read access to canonical player identities.
pub trait RosterStore: Send + Sync {
    /// All identities, or only those whose ID is in `ids`.
    fn players(&self, ids: Option<&[PlayerId]>) -> EngineResult<Vec<PlayerIdentity>>;
}

// =============================================================================
// Snapshot file format
// =============================================================================

/// On-disk snapshot of the three tables the engine reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub players: Vec<PlayerIdentity>,
    #[serde(default)]
    pub value_index: Vec<ValueIndexRecord>,
    #[serde(default)]
    pub box_scores: Vec<BoxScoreLine>,
}

// =============================================================================
// In-memory store
// =============================================================================

#[derive(Debug, Default)]
struct Inner {
    players: HashMap<PlayerId, PlayerIdentity>,
    // Keyed by player, each list sorted by date ascending.
    value_index: HashMap<PlayerId, Vec<ValueIndexRecord>>,
    box_scores: HashMap<PlayerId, Vec<BoxScoreLine>>,
}

/// Thread-safe in-memory metrics and roster store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let store = Self::new();
        for player in snapshot.players {
            store.upsert_player(player);
        }
        for record in snapshot.value_index {
            store.insert_record(record);
        }
        for line in snapshot.box_scores {
            store.insert_box_score(line);
        }
        store
    }

    /// Load a JSON snapshot file.
    pub fn load_snapshot(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Snapshot(format!("{}: {e}", path.display())))?;
        let snapshot: StoreSnapshot = serde_json::from_str(&raw)
            .map_err(|e| EngineError::Snapshot(format!("{}: {e}", path.display())))?;

        info!(
            path = %path.display(),
            players = snapshot.players.len(),
            value_records = snapshot.value_index.len(),
            box_scores = snapshot.box_scores.len(),
            "Snapshot loaded"
        );

        Ok(Self::from_snapshot(snapshot))
    }

    pub fn upsert_player(&self, player: PlayerIdentity) {
        self.inner
            .write()
            .players
            .insert(player.player_id.clone(), player);
    }

    /// Insert a record. One record per (player, date): a second write for
    /// the same date is ignored since records are immutable once written.
    pub fn insert_record(&self, record: ValueIndexRecord) {
        let mut inner = self.inner.write();
        let records = inner
            .value_index
            .entry(record.player_id.clone())
            .or_default();
        if let Err(pos) = records.binary_search_by_key(&record.date, |r| r.date) {
            records.insert(pos, record);
        }
    }

    /// Append a box-score line. One line per (player, game date).
    pub fn insert_box_score(&self, line: BoxScoreLine) {
        let mut inner = self.inner.write();
        let lines = inner.box_scores.entry(line.player_id.clone()).or_default();
        if let Err(pos) = lines.binary_search_by_key(&line.game_date, |l| l.game_date) {
            lines.insert(pos, line);
        }
    }
}

impl MetricsStore for InMemoryStore {
    fn latest_value_date(&self) -> EngineResult<Option<NaiveDate>> {
        let inner = self.inner.read();
        Ok(inner
            .value_index
            .values()
            .filter_map(|records| records.last().map(|r| r.date))
            .max())
    }

    fn records_on(&self, date: NaiveDate) -> EngineResult<Vec<ValueIndexRecord>> {
        let inner = self.inner.read();
        let mut out: Vec<ValueIndexRecord> = inner
            .value_index
            .values()
            .filter_map(|records| {
                records
                    .binary_search_by_key(&date, |r| r.date)
                    .ok()
                    .map(|i| records[i].clone())
            })
            .collect();
        out.sort_by(|a, b| a.player_id.cmp(&b.player_id));
        Ok(out)
    }

    fn latest_records(
        &self,
        player_id: &str,
        limit: usize,
        since: Option<NaiveDate>,
    ) -> EngineResult<Vec<ValueIndexRecord>> {
        let inner = self.inner.read();
        let Some(records) = inner.value_index.get(player_id) else {
            return Ok(Vec::new());
        };
        Ok(records
            .iter()
            .rev()
            .filter(|r| since.map(|s| r.date >= s).unwrap_or(true))
            .take(limit)
            .cloned()
            .collect())
    }

    fn recent_box_scores(&self, player_id: &str, limit: usize) -> EngineResult<Vec<BoxScoreLine>> {
        let inner = self.inner.read();
        Ok(inner
            .box_scores
            .get(player_id)
            .map(|lines| lines.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

impl RosterStore for InMemoryStore {
    fn players(&self, ids: Option<&[PlayerId]>) -> EngineResult<Vec<PlayerIdentity>> {
        let inner = self.inner.read();
        let mut out: Vec<PlayerIdentity> = match ids {
            Some(ids) => ids
                .iter()
                .filter_map(|id| inner.players.get(id).cloned())
                .collect(),
            None => inner.players.values().cloned().collect(),
        };
        out.sort_by(|a, b| a.player_id.cmp(&b.player_id));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn record(player: &str, d: u32, value: f64) -> ValueIndexRecord {
        ValueIndexRecord {
            player_id: player.to_string(),
            date: day(d),
            value_score: value,
            stat_component: 30.0,
            sentiment_component: 0.0,
            momentum_score: 0.0,
            confidence_score: 0.5,
        }
    }

    #[test]
    fn test_latest_records_newest_first_with_since() {
        let store = InMemoryStore::new();
        for d in [3, 1, 5, 2, 4] {
            store.insert_record(record("p1", d, d as f64 * 10.0));
        }

        let all = store.latest_records("p1", 10, None).unwrap();
        let dates: Vec<u32> = all.iter().map(|r| chrono::Datelike::day(&r.date)).collect();
        assert_eq!(dates, vec![5, 4, 3, 2, 1]);

        let recent = store.latest_records("p1", 10, Some(day(3))).unwrap();
        assert_eq!(recent.len(), 3);

        let limited = store.latest_records("p1", 2, None).unwrap();
        assert_eq!(limited[0].value_score, 50.0);
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_records_are_immutable_once_written() {
        let store = InMemoryStore::new();
        store.insert_record(record("p1", 1, 40.0));
        store.insert_record(record("p1", 1, 99.0));
        let records = store.latest_records("p1", 10, None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value_score, 40.0);
    }

    #[test]
    fn test_latest_date_and_records_on() {
        let store = InMemoryStore::new();
        store.insert_record(record("b", 2, 40.0));
        store.insert_record(record("a", 2, 50.0));
        store.insert_record(record("a", 1, 45.0));

        assert_eq!(store.latest_value_date().unwrap(), Some(day(2)));
        let on = store.records_on(day(2)).unwrap();
        assert_eq!(on.len(), 2);
        assert_eq!(on[0].player_id, "a");
        assert!(store.records_on(day(9)).unwrap().is_empty());
    }

    #[test]
    fn test_empty_store_has_no_latest_date() {
        let store = InMemoryStore::new();
        assert_eq!(store.latest_value_date().unwrap(), None);
        assert!(store.latest_records("missing", 5, None).unwrap().is_empty());
    }

    #[test]
    fn test_roster_filter_sorted_by_id() {
        let snapshot = StoreSnapshot {
            players: vec![
                PlayerIdentity {
                    player_id: "2".into(),
                    full_name: "B".into(),
                    team_name: String::new(),
                    position: String::new(),
                },
                PlayerIdentity {
                    player_id: "1".into(),
                    full_name: "A".into(),
                    team_name: String::new(),
                    position: String::new(),
                },
            ],
            ..Default::default()
        };
        let store = InMemoryStore::from_snapshot(snapshot);
        let all = store.players(None).unwrap();
        assert_eq!(all[0].player_id, "1");
        let some = store.players(Some(&["2".to_string()])).unwrap();
        assert_eq!(some.len(), 1);
        assert_eq!(some[0].full_name, "B");
    }
}
