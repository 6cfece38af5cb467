// src/services/settings.rs
//! Settings store: owns each owner's current configuration and its mutation contract.
//!
//! Update path (per owner, serialized):
//!   read current -> validate patch -> commit(snapshot of current, current + 1)
//!
//! Same-owner updates take a per-owner lock for the whole read-validate-commit
//! sequence. The backend additionally compares the stored version with the one
//! read, so writers outside this process surface as `Conflict` instead of a lost
//! update. Different owners never share a lock.

use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::LimitsConfig;
use crate::error::{FieldIssue, SettingsError, StoreError};
use crate::model::{AgentContent, ConfigPatch, Configuration, LanguageStyle, UpsellRule, VersionSnapshot};
use crate::services::audit::Logbook;
use crate::storage::SettingsBackend;
use agentcfg_text::{Tone, normalize_phrases};

/// Lazily created mutex per owner.
#[derive(Debug, Default)]
struct OwnerLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl OwnerLocks {
    fn for_owner(&self, owner_id: &str) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.entry(owner_id.to_string()).or_default().clone()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

/// Canonical owner key: surrounding whitespace is ignored at every entry point.
pub(crate) fn owner_key(owner_id: &str) -> Result<&str, SettingsError> {
    let key = owner_id.trim();
    if key.is_empty() {
        return Err(SettingsError::Validation(vec![FieldIssue::new("owner_id", "must not be empty")]));
    }
    Ok(key)
}

pub struct SettingsStore {
    backend: Arc<dyn SettingsBackend>,
    limits: LimitsConfig,
    logbook: Arc<Logbook>,
    locks: OwnerLocks,
}

impl SettingsStore {
    pub fn new(backend: Arc<dyn SettingsBackend>, limits: LimitsConfig, logbook: Arc<Logbook>) -> Self {
        Self {
            backend,
            limits,
            logbook,
            locks: OwnerLocks::default(),
        }
    }

    pub(crate) fn backend(&self) -> &Arc<dyn SettingsBackend> {
        &self.backend
    }

    pub(crate) fn logbook(&self) -> &Logbook {
        &self.logbook
    }

    /// Create the default configuration for a new owner, or return the existing one.
    /// Never writes a snapshot.
    pub fn provision(&self, owner_id: &str) -> Result<Configuration, SettingsError> {
        let owner_id = owner_key(owner_id)?;
        let lock = self.locks.for_owner(owner_id);
        let _guard = lock.lock().unwrap_or_else(|p| p.into_inner());

        if let Some(existing) = self.backend.read_current(owner_id)? {
            return Ok(existing);
        }
        let config = Configuration::provisioned(owner_id, Utc::now());
        match self.backend.insert_current(&config) {
            Ok(()) => {}
            // Another process provisioned it first; theirs stands.
            Err(StoreError::OwnerExists) => {
                return self
                    .backend
                    .read_current(owner_id)?
                    .ok_or_else(|| SettingsError::owner_not_found(owner_id));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(owner_id, "provisioned default agent configuration");
        self.logbook.record_action(
            "settings",
            "owner_provisioned",
            &json!({ "owner_id": owner_id, "version": config.version }),
            "low",
        );
        Ok(config)
    }

    /// Current configuration for `owner_id`.
    pub fn get(&self, owner_id: &str) -> Result<Configuration, SettingsError> {
        let owner_id = owner_key(owner_id)?;
        self.backend
            .read_current(owner_id)?
            .ok_or_else(|| SettingsError::owner_not_found(owner_id))
    }

    /// Apply `patch` as one new version.
    ///
    /// On success the pre-update content is recorded as a snapshot at the old
    /// version and the returned configuration carries `old + 1`. Any error leaves
    /// both the current row and the history untouched.
    pub fn update(&self, owner_id: &str, patch: ConfigPatch) -> Result<Configuration, SettingsError> {
        let owner_id = owner_key(owner_id)?;
        // Unknown owners fail here, before a lock entry exists for them.
        self.get(owner_id)?;
        let lock = self.locks.for_owner(owner_id);
        let _guard = lock.lock().unwrap_or_else(|p| p.into_inner());

        let current = self.get(owner_id)?;
        let fields = patch.fields();
        let content = match self.validate(&current.content, patch) {
            Ok(content) => content,
            Err(err) => {
                tracing::debug!(owner_id, error = %err, "update rejected");
                self.logbook.record_action(
                    "settings",
                    "update_rejected",
                    &json!({ "owner_id": owner_id, "fields": err.invalid_fields() }),
                    "medium",
                );
                return Err(err);
            }
        };

        let now = Utc::now();
        let snapshot = VersionSnapshot::capture(&current, now);
        let next = Configuration {
            content,
            version: current.version + 1,
            updated_at: now,
            ..current.clone()
        };

        self.backend
            .commit_version(&snapshot, &next, current.version)
            .map_err(|e| match e {
                StoreError::VersionMismatch { expected, found } => SettingsError::Conflict {
                    owner_id: owner_id.to_string(),
                    expected,
                    found,
                },
                StoreError::DuplicateSnapshot { version } => SettingsError::Conflict {
                    owner_id: owner_id.to_string(),
                    expected: version,
                    found: None,
                },
                other => SettingsError::Storage(other),
            })?;

        tracing::info!(owner_id, version = next.version, ?fields, "agent configuration updated");
        self.logbook.record_action(
            "settings",
            "settings_updated",
            &json!({
                "owner_id": owner_id,
                "from_version": current.version,
                "to_version": next.version,
                "fields": fields,
                "system_prompt_preview": self.logbook.preview(&next.content.system_prompt),
            }),
            "low",
        );
        Ok(next)
    }

    /// Check every supplied field and build the new content. Collects all issues.
    pub fn validate(&self, base: &AgentContent, patch: ConfigPatch) -> Result<AgentContent, SettingsError> {
        if patch.is_empty() {
            return Err(SettingsError::Validation(vec![FieldIssue::new("patch", "no fields provided")]));
        }

        let mut issues = Vec::new();
        let mut out = base.clone();

        if let Some(prompt) = patch.system_prompt {
            let n = prompt.chars().count();
            if n > self.limits.system_prompt_max_chars {
                issues.push(FieldIssue::new(
                    "system_prompt",
                    format!("{n} characters exceeds limit of {}", self.limits.system_prompt_max_chars),
                ));
            } else {
                out.system_prompt = prompt;
            }
        }

        if let Some(raw) = patch.tone {
            match raw.parse::<Tone>() {
                Ok(t) => out.tone = t,
                Err(e) => issues.push(FieldIssue::new(
                    "tone",
                    format!("{e}; expected one of {}", names(Tone::ALL.iter().map(Tone::as_str))),
                )),
            }
        }

        if let Some(raw) = patch.language_style {
            match raw.parse::<LanguageStyle>() {
                Ok(s) => out.language_style = s,
                Err(e) => issues.push(FieldIssue::new(
                    "language_style",
                    format!("{e}; expected one of {}", names(LanguageStyle::ALL.iter().map(LanguageStyle::as_str))),
                )),
            }
        }

        if let Some(rules) = patch.upsell_rules {
            match self.check_rules(rules) {
                Ok(rules) => out.upsell_rules = rules,
                Err(mut found) => issues.append(&mut found),
            }
        }

        if let Some(phrases) = patch.do_not_say {
            match self.check_phrases(phrases) {
                Ok(phrases) => out.do_not_say = phrases,
                Err(mut found) => issues.append(&mut found),
            }
        }

        if issues.is_empty() {
            Ok(out)
        } else {
            Err(SettingsError::Validation(issues))
        }
    }

    fn check_rules(&self, rules: Vec<UpsellRule>) -> Result<Vec<UpsellRule>, Vec<FieldIssue>> {
        let mut issues = Vec::new();
        if rules.len() > self.limits.max_upsell_rules {
            issues.push(FieldIssue::new(
                "upsell_rules",
                format!("{} rules exceeds limit of {}", rules.len(), self.limits.max_upsell_rules),
            ));
            return Err(issues);
        }

        let mut out = Vec::with_capacity(rules.len());
        for (i, rule) in rules.into_iter().enumerate() {
            let trimmed = UpsellRule::new(rule.trigger.trim(), rule.action.trim(), rule.message.trim());
            for (name, value) in [
                ("trigger", &trimmed.trigger),
                ("action", &trimmed.action),
                ("message", &trimmed.message),
            ] {
                if value.is_empty() {
                    issues.push(FieldIssue::new(format!("upsell_rules[{i}].{name}"), "must not be empty"));
                }
            }
            out.push(trimmed);
        }
        if issues.is_empty() { Ok(out) } else { Err(issues) }
    }

    fn check_phrases(&self, phrases: Vec<String>) -> Result<Vec<String>, Vec<FieldIssue>> {
        let out = normalize_phrases(&phrases);
        let mut issues = Vec::new();
        for (i, phrase) in out.iter().enumerate() {
            let n = phrase.chars().count();
            if n > self.limits.max_phrase_chars {
                issues.push(FieldIssue::new(
                    format!("do_not_say[{i}]"),
                    format!("{n} characters exceeds limit of {}", self.limits.max_phrase_chars),
                ));
            }
        }
        if out.len() > self.limits.max_forbidden_phrases {
            issues.push(FieldIssue::new(
                "do_not_say",
                format!("{} phrases exceeds limit of {}", out.len(), self.limits.max_forbidden_phrases),
            ));
        }
        if issues.is_empty() { Ok(out) } else { Err(issues) }
    }
}

fn names<'a>(it: impl Iterator<Item = &'a str>) -> String {
    it.collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::storage::MemoryBackend;

    fn store() -> SettingsStore {
        let cfg = CoreConfig::default();
        SettingsStore::new(Arc::new(MemoryBackend::new()), cfg.limits, Arc::new(Logbook::disabled()))
    }

    #[test]
    fn unknown_owners_leave_no_lock_entries() {
        let store = store();
        for i in 0..50 {
            let err = store
                .update(&format!("ghost-{i}"), ConfigPatch::default().with_tone("casual"))
                .unwrap_err();
            assert_eq!(err.kind(), "not_found");
        }
        assert!(store.provision("  ").is_err());
        assert_eq!(store.locks.len(), 0);

        store.provision("real").unwrap();
        store.update(" real ", ConfigPatch::default().with_tone("casual")).unwrap();
        assert_eq!(store.locks.len(), 1);
    }

    #[test]
    fn phrase_index_refers_to_normalized_list() {
        let mut store = store();
        store.limits.max_phrase_chars = 4;
        let issues = store
            .check_phrases(vec!["ok".into(), "OK ".into(), "".into(), "toolong".into()])
            .unwrap_err();
        assert_eq!(issues, vec![FieldIssue::new("do_not_say[1]", "7 characters exceeds limit of 4")]);
    }
}
