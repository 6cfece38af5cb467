// src/error.rs
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failure reported by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Compare-and-swap on the current row failed.
    #[error("version mismatch: expected {expected}, found {found:?}")]
    VersionMismatch { expected: u64, found: Option<u64> },

    #[error("snapshot version {version} already recorded")]
    DuplicateSnapshot { version: u64 },

    #[error("configuration already exists for owner")]
    OwnerExists,

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub reason: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_version(v: &Option<u64>) -> String {
    match v {
        Some(v) => format!(" version {v}"),
        None => String::new(),
    }
}

/// Errors surfaced by the settings store, the version ledger and the facade.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Owner has no configuration, or the requested version was never recorded.
    #[error("not found: owner {owner_id}{}", describe_version(.version))]
    NotFound { owner_id: String, version: Option<u64> },

    /// Input rejected; nothing was written.
    #[error("invalid input: {}", join_issues(.0))]
    Validation(Vec<FieldIssue>),

    /// Another writer committed first. Re-fetch and retry.
    #[error("conflict on owner {owner_id}: expected version {expected}, found {found:?}")]
    Conflict {
        owner_id: String,
        expected: u64,
        found: Option<u64>,
    },

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl SettingsError {
    pub fn owner_not_found(owner_id: &str) -> Self {
        SettingsError::NotFound {
            owner_id: owner_id.to_string(),
            version: None,
        }
    }

    pub fn version_not_found(owner_id: &str, version: u64) -> Self {
        SettingsError::NotFound {
            owner_id: owner_id.to_string(),
            version: Some(version),
        }
    }

    /// Field names named by a validation error; empty for other kinds.
    pub fn invalid_fields(&self) -> Vec<&str> {
        match self {
            SettingsError::Validation(issues) => issues.iter().map(|i| i.field.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Short kind label for logs and the audit logbook.
    pub fn kind(&self) -> &'static str {
        match self {
            SettingsError::NotFound { .. } => "not_found",
            SettingsError::Validation(_) => "validation",
            SettingsError::Conflict { .. } => "conflict",
            SettingsError::Storage(_) => "storage",
        }
    }
}
