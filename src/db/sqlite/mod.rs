//! SQLite snapshot store

mod migrations;
mod snapshots;

use crate::db::models::Snapshot;
use crate::db::SnapshotStore;
use crate::error::Result;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

/// SQLite-backed snapshot history
pub struct SqliteSnapshotStore {
    conn: Mutex<Connection>,
    history_limit: usize,
}

impl SqliteSnapshotStore {
    /// Open (or create) the database at `path`
    pub fn new(path: &Path, history_limit: usize) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::with_connection(conn, history_limit)
    }

    /// In-memory store, used by tests and dry runs
    pub fn in_memory(history_limit: usize) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, history_limit)
    }

    fn with_connection(conn: Connection, history_limit: usize) -> Result<Self> {
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            history_limit: history_limit.max(1),
        })
    }

    /// Number of snapshots currently retained
    pub fn len(&self) -> Result<usize> {
        let conn = self.conn.lock();
        snapshots::count_snapshots(&conn)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn append(&self, snapshot: &Snapshot) -> Result<()> {
        let mut conn = self.conn.lock();
        snapshots::append_snapshot(&mut conn, snapshot, self.history_limit)
    }

    fn latest(&self) -> Result<Option<Snapshot>> {
        let conn = self.conn.lock();
        snapshots::latest_snapshot(&conn)
    }

    fn history(&self, limit: usize) -> Result<Vec<Snapshot>> {
        let conn = self.conn.lock();
        snapshots::snapshot_history(&conn, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{build_market_guidance, NewsSummary};
    use crate::db::models::Coverage;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn snapshot(minutes: i64) -> Snapshot {
        Snapshot {
            generated_at: Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
                + Duration::minutes(minutes),
            run_id: Uuid::new_v4(),
            reason: "manual".to_string(),
            timezone: "UTC".to_string(),
            coverage: Coverage::default(),
            stocks: vec![],
            fx: vec![],
            crypto: vec![],
            news: NewsSummary::default(),
            guidance: build_market_guidance(&[], &NewsSummary::default()),
            errors: vec![],
            notes: vec![],
        }
    }

    #[test]
    fn test_empty_store() {
        let store = SqliteSnapshotStore::in_memory(10).unwrap();
        assert!(store.latest().unwrap().is_none());
        assert!(store.history(48).unwrap().is_empty());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_append_and_read_back() {
        let store = SqliteSnapshotStore::in_memory(10).unwrap();
        let first = snapshot(0);
        let second = snapshot(30);
        store.append(&first).unwrap();
        store.append(&second).unwrap();

        assert_eq!(store.latest().unwrap(), Some(second.clone()));
        assert_eq!(store.history(48).unwrap(), vec![first, second.clone()]);
        assert_eq!(store.history(1).unwrap(), vec![second]);
    }

    #[test]
    fn test_history_is_bounded() {
        let store = SqliteSnapshotStore::in_memory(3).unwrap();
        for i in 0..5 {
            store.append(&snapshot(i * 30)).unwrap();
        }

        assert_eq!(store.len().unwrap(), 3);
        let history = store.history(10).unwrap();
        let minutes: Vec<i64> = history
            .iter()
            .map(|s| (s.generated_at - snapshot(0).generated_at).num_minutes())
            .collect();
        assert_eq!(minutes, vec![60, 90, 120]);
    }

    #[test]
    fn test_on_disk_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("overview.db");

        let stored = snapshot(0);
        {
            let store = SqliteSnapshotStore::new(&path, 10).unwrap();
            store.append(&stored).unwrap();
        }

        let reopened = SqliteSnapshotStore::new(&path, 10).unwrap();
        assert_eq!(reopened.latest().unwrap(), Some(stored));
    }
}
