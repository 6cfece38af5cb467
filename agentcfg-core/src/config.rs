use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub logbook: LogbookConfig,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub policies: PoliciesConfig,
}

impl CoreConfig {
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join("config.toml");
        let mut cfg = if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            Self::from_toml(&text)
                .with_context(|| format!("parsing config file {}", path.display()))?
        } else {
            tracing::info!(
                "No config file found at {}. Using CoreConfig::default().",
                path.display()
            );
            CoreConfig::default()
        };
        cfg.resolve_paths(root);
        Ok(cfg)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str::<CoreConfig>(text)?)
    }

    fn resolve_paths(&mut self, root: &Path) {
        self.storage.db_path = absolutize(root, &self.storage.db_path);
        self.logbook.path = absolutize(root, &self.logbook.path);
        self.logbook.actions = absolutize(root, &self.logbook.actions);
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "SystemConfig::default_name")]
    pub name: String,
}

impl SystemConfig {
    fn default_name() -> String {
        "agentcfg".to_string()
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Memory,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Sqlite => "sqlite",
            BackendKind::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "StorageConfig::default_db_path")]
    pub db_path: PathBuf,
}

impl StorageConfig {
    fn default_db_path() -> PathBuf {
        PathBuf::from("db/settings.db")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            db_path: Self::default_db_path(),
        }
    }
}

/// Input bounds enforced when validating an update.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "LimitsConfig::default_system_prompt_max_chars")]
    pub system_prompt_max_chars: usize,
    #[serde(default = "LimitsConfig::default_max_upsell_rules")]
    pub max_upsell_rules: usize,
    #[serde(default = "LimitsConfig::default_max_forbidden_phrases")]
    pub max_forbidden_phrases: usize,
    #[serde(default = "LimitsConfig::default_max_phrase_chars")]
    pub max_phrase_chars: usize,
}

impl LimitsConfig {
    fn default_system_prompt_max_chars() -> usize {
        5000
    }
    fn default_max_upsell_rules() -> usize {
        50
    }
    fn default_max_forbidden_phrases() -> usize {
        200
    }
    fn default_max_phrase_chars() -> usize {
        256
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            system_prompt_max_chars: Self::default_system_prompt_max_chars(),
            max_upsell_rules: Self::default_max_upsell_rules(),
            max_forbidden_phrases: Self::default_max_forbidden_phrases(),
            max_phrase_chars: Self::default_max_phrase_chars(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Page size used when the caller gives no limit. Display convenience only.
    #[serde(default = "HistoryConfig::default_limit")]
    pub default_limit: usize,
}

impl HistoryConfig {
    fn default_limit() -> usize {
        10
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_limit: Self::default_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogbookConfig {
    #[serde(default = "LogbookConfig::default_path")]
    pub path: PathBuf,
    #[serde(default = "LogbookConfig::default_actions")]
    pub actions: PathBuf,
}

impl LogbookConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("logbook")
    }

    fn default_actions() -> PathBuf {
        PathBuf::from("logbook/actions.jsonl")
    }
}

impl Default for LogbookConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
            actions: Self::default_actions(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "ServicesConfig::default_true")]
    pub audit_enabled: bool,
}

impl ServicesConfig {
    fn default_true() -> bool {
        true
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            audit_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoliciesConfig {
    #[serde(default = "PoliciesConfig::default_log_preview_len")]
    pub log_preview_len: usize,
}

impl PoliciesConfig {
    fn default_log_preview_len() -> usize {
        160
    }
}

impl Default for PoliciesConfig {
    fn default() -> Self {
        Self {
            log_preview_len: Self::default_log_preview_len(),
        }
    }
}

fn absolutize(root: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        root.join(value)
    }
}
