// src/storage/mod.rs
//! Persistence seam for configurations and their version history.
//!
//! The settings store depends only on [`SettingsBackend`]. Writing the snapshot
//! and the new current row is one call (`commit_version`) so a backend can make
//! the pair atomic; a snapshot without its current row, or the reverse, must
//! never be observable.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use crate::error::StoreError;
use crate::model::{Configuration, VersionSnapshot};

/// Selects snapshots for one owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotFilter {
    /// Exact version; `None` for all.
    pub version: Option<u64>,
    /// Maximum number returned (newest first); `None` for no cap.
    pub limit: Option<usize>,
}

impl SnapshotFilter {
    pub fn exact(version: u64) -> Self {
        Self {
            version: Some(version),
            limit: Some(1),
        }
    }

    pub fn newest(limit: Option<usize>) -> Self {
        Self { version: None, limit }
    }
}

pub trait SettingsBackend: Send + Sync {
    /// Current configuration for `owner_id`, if provisioned.
    fn read_current(&self, owner_id: &str) -> Result<Option<Configuration>, StoreError>;

    /// Create the first configuration for an owner. `OwnerExists` if one is present.
    fn insert_current(&self, config: &Configuration) -> Result<(), StoreError>;

    /// Atomically append `snapshot` and replace the current row with `next`.
    ///
    /// Succeeds only while the stored current version still equals
    /// `expected_prior_version`; otherwise `VersionMismatch` and nothing is written.
    fn commit_version(
        &self,
        snapshot: &VersionSnapshot,
        next: &Configuration,
        expected_prior_version: u64,
    ) -> Result<(), StoreError>;

    /// Snapshots for `owner_id` matching `filter`, ordered by version descending.
    fn read_snapshots(&self, owner_id: &str, filter: SnapshotFilter) -> Result<Vec<VersionSnapshot>, StoreError>;
}
