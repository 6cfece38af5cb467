// src/storage/memory.rs
//! Process-local backend. Same contract as the SQLite backend; one mutex makes
//! every commit atomic.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{SettingsBackend, SnapshotFilter};
use crate::error::StoreError;
use crate::model::{Configuration, VersionSnapshot};

#[derive(Debug, Default)]
struct OwnerRows {
    current: Option<Configuration>,
    /// Ascending by version.
    snapshots: Vec<VersionSnapshot>,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    owners: Mutex<HashMap<String, OwnerRows>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> MutexGuard<'_, HashMap<String, OwnerRows>> {
        // Every mutation below is validated before it touches the map, so a
        // panicking holder cannot leave a half-written owner behind.
        self.owners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SettingsBackend for MemoryBackend {
    fn read_current(&self, owner_id: &str) -> Result<Option<Configuration>, StoreError> {
        Ok(self.rows().get(owner_id).and_then(|r| r.current.clone()))
    }

    fn insert_current(&self, config: &Configuration) -> Result<(), StoreError> {
        let mut rows = self.rows();
        let entry = rows.entry(config.owner_id.clone()).or_default();
        if entry.current.is_some() {
            return Err(StoreError::OwnerExists);
        }
        entry.current = Some(config.clone());
        Ok(())
    }

    fn commit_version(
        &self,
        snapshot: &VersionSnapshot,
        next: &Configuration,
        expected_prior_version: u64,
    ) -> Result<(), StoreError> {
        let mut rows = self.rows();
        let entry = rows
            .get_mut(&next.owner_id)
            .ok_or(StoreError::VersionMismatch {
                expected: expected_prior_version,
                found: None,
            })?;

        let found = entry.current.as_ref().map(|c| c.version);
        if found != Some(expected_prior_version) {
            return Err(StoreError::VersionMismatch {
                expected: expected_prior_version,
                found,
            });
        }
        if entry.snapshots.iter().any(|s| s.version == snapshot.version) {
            return Err(StoreError::DuplicateSnapshot {
                version: snapshot.version,
            });
        }

        entry.snapshots.push(snapshot.clone());
        entry.current = Some(next.clone());
        Ok(())
    }

    fn read_snapshots(&self, owner_id: &str, filter: SnapshotFilter) -> Result<Vec<VersionSnapshot>, StoreError> {
        let rows = self.rows();
        let Some(entry) = rows.get(owner_id) else {
            return Ok(Vec::new());
        };
        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(entry
            .snapshots
            .iter()
            .rev()
            .filter(|s| filter.version.is_none_or(|v| s.version == v))
            .take(limit)
            .cloned()
            .collect())
    }
}
