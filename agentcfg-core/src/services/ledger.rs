// src/services/ledger.rs
//! Version history: browse snapshots and roll back to one.
//!
//! Rollback never rewrites history. It replays the snapshot's content through
//! `SettingsStore::update`, which records the replaced state as a new snapshot and
//! moves the current version forward.

use serde_json::json;
use std::sync::Arc;

use crate::error::SettingsError;
use crate::model::{ConfigPatch, Configuration, VersionSnapshot};
use crate::services::settings::{SettingsStore, owner_key};
use crate::storage::SnapshotFilter;

pub struct VersionLedger {
    store: Arc<SettingsStore>,
    default_limit: usize,
}

impl VersionLedger {
    pub fn new(store: Arc<SettingsStore>, default_limit: usize) -> Self {
        Self { store, default_limit }
    }

    /// Newest-first snapshots for an existing owner. `None` uses the configured page size.
    pub fn list(&self, owner_id: &str, limit: Option<usize>) -> Result<Vec<VersionSnapshot>, SettingsError> {
        let owner_id = owner_key(owner_id)?;
        // Distinguish "no history yet" from "no such owner".
        self.store.get(owner_id)?;
        let limit = limit.unwrap_or(self.default_limit);
        Ok(self
            .store
            .backend()
            .read_snapshots(owner_id, SnapshotFilter::newest(Some(limit)))?)
    }

    pub fn get(&self, owner_id: &str, version: u64) -> Result<VersionSnapshot, SettingsError> {
        let owner_id = owner_key(owner_id)?;
        self.store
            .backend()
            .read_snapshots(owner_id, SnapshotFilter::exact(version))?
            .into_iter()
            .next()
            .ok_or_else(|| SettingsError::version_not_found(owner_id, version))
    }

    /// Reinstate the content of `version` as a new, higher version.
    pub fn rollback(&self, owner_id: &str, version: u64) -> Result<Configuration, SettingsError> {
        let owner_id = owner_key(owner_id)?;
        let snapshot = self.get(owner_id, version)?;
        let restored = self
            .store
            .update(owner_id, ConfigPatch::from_content(&snapshot.content))?;

        tracing::info!(owner_id, restored_from = version, version = restored.version, "rolled back agent configuration");
        self.store.logbook().record_action(
            "ledger",
            "settings_rolled_back",
            &json!({
                "owner_id": owner_id,
                "restored_from": version,
                "new_version": restored.version,
            }),
            "medium",
        );
        Ok(restored)
    }
}
