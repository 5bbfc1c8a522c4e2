//! Snapshot rows

use crate::db::models::Snapshot;
use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};

/// Insert a snapshot and evict rows beyond `keep`
pub fn append_snapshot(conn: &mut Connection, snapshot: &Snapshot, keep: usize) -> Result<()> {
    let payload = serde_json::to_string(snapshot)?;

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO snapshots (run_id, reason, generated_at, payload) VALUES (?1, ?2, ?3, ?4)",
        params![
            snapshot.run_id.to_string(),
            snapshot.reason,
            snapshot.generated_at.to_rfc3339(),
            payload
        ],
    )?;
    let evicted = tx.execute(
        "DELETE FROM snapshots WHERE id NOT IN (
            SELECT id FROM snapshots ORDER BY id DESC LIMIT ?1
        )",
        params![keep as i64],
    )?;
    tx.commit()?;

    if evicted > 0 {
        tracing::debug!("Evicted {} old snapshot(s)", evicted);
    }
    Ok(())
}

/// Most recent snapshot
pub fn latest_snapshot(conn: &Connection) -> Result<Option<Snapshot>> {
    let payload: Option<String> = conn
        .query_row(
            "SELECT payload FROM snapshots ORDER BY id DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;

    match payload {
        Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
        None => Ok(None),
    }
}

/// Up to `limit` most recent snapshots, oldest first
pub fn snapshot_history(conn: &Connection, limit: usize) -> Result<Vec<Snapshot>> {
    let mut stmt = conn.prepare(
        "SELECT payload FROM (
            SELECT id, payload FROM snapshots ORDER BY id DESC LIMIT ?1
        ) ORDER BY id ASC",
    )?;

    let payloads: Vec<String> = stmt
        .query_map(params![limit as i64], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;

    payloads
        .iter()
        .map(|p| serde_json::from_str(p).map_err(Into::into))
        .collect()
}

/// Number of stored snapshots
pub fn count_snapshots(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
    Ok(count as usize)
}
