//! services/audit.rs
//! Append-only action logbook for configuration changes and previews.
//!
//! - Writes one JSON object per line to the configured `actions.jsonl`.
//! - Free text is reduced to a single-line preview before it is logged.
//! - Write failures go to `tracing::warn!`; they never fail the caller.

use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::CoreConfig;

#[derive(Debug)]
pub struct Logbook {
    /// `None` when auditing is disabled.
    actions: Option<PathBuf>,
    preview_len: usize,
    // Serializes appends from concurrent writers so lines never interleave.
    write_lock: Mutex<()>,
}

impl Logbook {
    pub fn from_config(cfg: &CoreConfig) -> Self {
        let actions = cfg
            .services
            .audit_enabled
            .then(|| cfg.logbook.actions.clone());
        Self {
            actions,
            preview_len: cfg.policies.log_preview_len,
            write_lock: Mutex::new(()),
        }
    }

    /// Logbook that records nothing.
    pub fn disabled() -> Self {
        Self {
            actions: None,
            preview_len: 0,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.actions.as_deref()
    }

    /// Record a generic action event.
    ///
    /// # Arguments
    /// * `agent`: component name (e.g., `"settings"`, `"ledger"`).
    /// * `action`: short verb label (e.g., `"settings_updated"`).
    /// * `details`: arbitrary JSON payload.
    /// * `severity`: `"low" | "medium" | "high"`.
    pub fn record_action(&self, agent: &str, action: &str, details: &Value, severity: &str) {
        let Some(path) = &self.actions else {
            return;
        };
        let entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": "action",
            "agent": agent,
            "action": action,
            "severity": severity,
            "details": details
        });
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(e) = append_jsonl(path, &entry) {
            tracing::warn!(path = %path.display(), error = %e, "audit append failed");
        }
    }

    /// Single-line preview: newlines removed, truncated to the configured length with an ellipsis.
    pub fn preview(&self, s: &str) -> String {
        let flat = s.replace(['\n', '\r'], " ");
        if flat.chars().count() <= self.preview_len {
            return flat;
        }
        let mut t: String = flat.chars().take(self.preview_len).collect();
        t.push('…');
        t
    }
}

fn append_jsonl<S: Serialize>(path: &Path, val: &S) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let line = serde_json::to_string(val)?;
    let mut f = fs::OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(f, "{line}")
}
