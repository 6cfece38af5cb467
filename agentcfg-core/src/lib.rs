pub mod commands;
pub mod config;
pub mod error;
pub mod model;
pub mod services;
pub mod storage;

pub use commands::Commands;
pub use error::{FieldIssue, SettingsError, StoreError};
pub use model::{AgentContent, ConfigPatch, Configuration, LanguageStyle, SnapshotSummary, UpsellRule, VersionSnapshot};
pub use agentcfg_text::Tone;
