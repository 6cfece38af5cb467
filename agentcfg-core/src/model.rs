// src/model.rs
//! Configuration records exchanged with the dashboard and the storage backend.
//!
//! - `Configuration` is the single mutable "current" row per owner.
//! - `VersionSnapshot` is an immutable copy of the content that preceded a change.
//! - `AgentContent` is the part both share, and the only part rollback restores.

use agentcfg_text::Tone;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Used when an owner is provisioned and when a prompt is built without settings.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful fashion sales assistant.";

/// Language formality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageStyle {
    #[default]
    Conversational,
    Formal,
    Casual,
}

impl LanguageStyle {
    pub const ALL: [LanguageStyle; 3] = [
        LanguageStyle::Conversational,
        LanguageStyle::Formal,
        LanguageStyle::Casual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageStyle::Conversational => "conversational",
            LanguageStyle::Formal => "formal",
            LanguageStyle::Casual => "casual",
        }
    }
}

impl fmt::Display for LanguageStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        LanguageStyle::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(t))
            .ok_or_else(|| format!("unknown language style '{s}'"))
    }
}

/// Trigger/action/message triple. Well-formed only when all three are non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsellRule {
    pub trigger: String,
    pub action: String,
    pub message: String,
}

impl UpsellRule {
    pub fn new(trigger: impl Into<String>, action: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            action: action.into(),
            message: message.into(),
        }
    }
}

/// Behavioral content of an agent configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentContent {
    pub system_prompt: String,
    pub tone: Tone,
    pub language_style: LanguageStyle,
    /// Order is evaluation and display priority.
    pub upsell_rules: Vec<UpsellRule>,
    /// Normalized, unique, in registration order.
    pub do_not_say: Vec<String>,
}

impl Default for AgentContent {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            tone: Tone::default(),
            language_style: LanguageStyle::default(),
            upsell_rules: Vec::new(),
            do_not_say: Vec::new(),
        }
    }
}

/// The current configuration of one owner's agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub id: String,
    pub owner_id: String,
    #[serde(flatten)]
    pub content: AgentContent,
    /// Starts at 1; bumped exactly once per successful update.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Configuration {
    /// Fresh default configuration at version 1.
    pub fn provisioned(owner_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            content: AgentContent::default(),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Immutable history entry: the content an owner had at `version`, before the
/// change that produced `version + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSnapshot {
    pub id: String,
    pub owner_id: String,
    pub version: u64,
    #[serde(flatten)]
    pub content: AgentContent,
    pub created_at: DateTime<Utc>,
}

impl VersionSnapshot {
    /// Capture the content of `current` under its own version number.
    pub fn capture(current: &Configuration, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: current.owner_id.clone(),
            version: current.version,
            content: current.content.clone(),
            created_at: now,
        }
    }

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            version: self.version,
            tone: self.content.tone,
            language_style: self.content.language_style,
            upsell_rule_count: self.content.upsell_rules.len(),
            forbidden_phrase_count: self.content.do_not_say.len(),
            created_at: self.created_at,
        }
    }
}

/// One line of the history list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub version: u64,
    pub tone: Tone,
    pub language_style: LanguageStyle,
    pub upsell_rule_count: usize,
    pub forbidden_phrase_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Partial update as sent by the dashboard. `None` leaves a field untouched.
///
/// Enumerated fields arrive as raw names and are checked by the settings store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upsell_rules: Option<Vec<UpsellRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_not_say: Option<Vec<String>>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        self.system_prompt.is_none()
            && self.tone.is_none()
            && self.language_style.is_none()
            && self.upsell_rules.is_none()
            && self.do_not_say.is_none()
    }

    /// A patch that sets every content field to `content`. Rollback applies this.
    pub fn from_content(content: &AgentContent) -> Self {
        Self {
            system_prompt: Some(content.system_prompt.clone()),
            tone: Some(content.tone.as_str().to_string()),
            language_style: Some(content.language_style.as_str().to_string()),
            upsell_rules: Some(content.upsell_rules.clone()),
            do_not_say: Some(content.do_not_say.clone()),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = Some(tone.into());
        self
    }

    pub fn with_language_style(mut self, style: impl Into<String>) -> Self {
        self.language_style = Some(style.into());
        self
    }

    pub fn with_upsell_rules(mut self, rules: Vec<UpsellRule>) -> Self {
        self.upsell_rules = Some(rules);
        self
    }

    pub fn with_do_not_say<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.do_not_say = Some(phrases.into_iter().map(Into::into).collect());
        self
    }

    /// Field names present in this patch, for logging.
    pub fn fields(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.system_prompt.is_some() {
            out.push("system_prompt");
        }
        if self.tone.is_some() {
            out.push("tone");
        }
        if self.language_style.is_some() {
            out.push("language_style");
        }
        if self.upsell_rules.is_some() {
            out.push("upsell_rules");
        }
        if self.do_not_say.is_some() {
            out.push("do_not_say");
        }
        out
    }
}
