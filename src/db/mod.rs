//! Snapshot persistence
//!
//! The refresh pipeline only needs three operations from storage, captured
//! by [`SnapshotStore`]. [`SqliteSnapshotStore`] is the on-disk
//! implementation used by the service.

pub mod models;
pub mod sqlite;

use crate::error::Result;
pub use models::{Coverage, InstrumentError, Snapshot};
pub use sqlite::SqliteSnapshotStore;

/// Append-only, bounded snapshot history
pub trait SnapshotStore: Send + Sync {
    /// Persist a new snapshot as the latest one, evicting the oldest beyond the limit
    fn append(&self, snapshot: &Snapshot) -> Result<()>;

    /// Most recently appended snapshot
    fn latest(&self) -> Result<Option<Snapshot>>;

    /// Up to `limit` most recent snapshots, oldest first
    fn history(&self, limit: usize) -> Result<Vec<Snapshot>>;
}
