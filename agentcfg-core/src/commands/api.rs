// src/commands/api.rs
use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

use crate::commands::init::{InitReport, ensure_initialized, ensure_initialized_once};
use crate::config::{BackendKind, CoreConfig};
use crate::error::SettingsError;
use crate::model::{ConfigPatch, Configuration, VersionSnapshot};
use crate::services::audit::Logbook;
use crate::services::ledger::VersionLedger;
use crate::services::settings::SettingsStore;
use crate::services::simulator;
use crate::storage::{MemoryBackend, SettingsBackend, SqliteBackend};

/// What the dashboard may call: `get`, `update`, `list`, `rollback`, `simulate`.
pub struct Commands {
    settings: Arc<SettingsStore>,
    ledger: VersionLedger,
}

impl Commands {
    /// Open the workspace named by `AGENTCFG_ROOT` (default `.agentcfg`).
    pub fn from_env() -> Result<Self> {
        let report = ensure_initialized_once()?;
        Self::from_report(report)
    }

    /// Open (initializing if needed) the workspace at `root`.
    pub fn open(root: &Path) -> Result<Self> {
        let report = ensure_initialized(root)?;
        Self::from_report(&report)
    }

    fn from_report(report: &InitReport) -> Result<Self> {
        let cfg = &report.config;
        let backend: Arc<dyn SettingsBackend> = match cfg.storage.backend {
            BackendKind::Sqlite => Arc::new(
                SqliteBackend::open(&cfg.storage.db_path)
                    .with_context(|| format!("opening settings db {}", cfg.storage.db_path.display()))?,
            ),
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
        };
        tracing::debug!(
            root = %report.root.display(),
            backend = cfg.storage.backend.as_str(),
            "agentcfg workspace ready"
        );
        Ok(Self::with_backend(backend, cfg))
    }

    /// Wire the services over an explicit backend.
    pub fn with_backend(backend: Arc<dyn SettingsBackend>, cfg: &CoreConfig) -> Self {
        let logbook = Arc::new(Logbook::from_config(cfg));
        let settings = Arc::new(SettingsStore::new(backend, cfg.limits.clone(), logbook));
        let ledger = VersionLedger::new(settings.clone(), cfg.history.default_limit);
        Self { settings, ledger }
    }

    /// Onboarding hook: default configuration for a new owner (idempotent).
    pub fn provision(&self, owner_id: &str) -> Result<Configuration, SettingsError> {
        self.settings.provision(owner_id)
    }

    pub fn get(&self, owner_id: &str) -> Result<Configuration, SettingsError> {
        self.settings.get(owner_id)
    }

    pub fn update(&self, owner_id: &str, patch: ConfigPatch) -> Result<Configuration, SettingsError> {
        self.settings.update(owner_id, patch)
    }

    /// Newest first. `None` uses `history.default_limit`.
    pub fn list(&self, owner_id: &str, limit: Option<usize>) -> Result<Vec<VersionSnapshot>, SettingsError> {
        self.ledger.list(owner_id, limit)
    }

    /// Single snapshot, for the history detail view.
    pub fn version(&self, owner_id: &str, version: u64) -> Result<VersionSnapshot, SettingsError> {
        self.ledger.get(owner_id, version)
    }

    pub fn rollback(&self, owner_id: &str, version: u64) -> Result<Configuration, SettingsError> {
        self.ledger.rollback(owner_id, version)
    }

    /// Preview a reply under the owner's current configuration.
    pub fn simulate(&self, owner_id: &str, user_message: &str) -> Result<String, SettingsError> {
        let config = self.settings.get(owner_id)?;
        let reply = simulator::simulate(user_message, &config);
        let book = self.settings.logbook();
        book.record_action(
            "simulator",
            "preview_simulated",
            &json!({
                "owner_id": config.owner_id,
                "version": config.version,
                "message_preview": book.preview(user_message),
            }),
            "low",
        );
        Ok(reply)
    }
}
