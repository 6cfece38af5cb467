use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decorative symbols the professional tone removes. Longest sequences first so
/// a variation selector is removed together with its base symbol.
pub const DECORATIVE_SYMBOLS: &[&str] = &["\u{1F6CD}\u{FE0F}", "\u{1F6CD}", "\u{1F457}", "\u{2728}"];

/// Symbol the enthusiastic tone closes a reply with.
pub const CELEBRATORY_SYMBOL: char = '\u{2728}';

/// Communication tone of the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Friendly,
    Professional,
    Enthusiastic,
    Casual,
    Formal,
}

impl Tone {
    pub const ALL: [Tone; 5] = [
        Tone::Friendly,
        Tone::Professional,
        Tone::Enthusiastic,
        Tone::Casual,
        Tone::Formal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Friendly => "friendly",
            Tone::Professional => "professional",
            Tone::Enthusiastic => "enthusiastic",
            Tone::Casual => "casual",
            Tone::Formal => "formal",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tone '{0}'")]
pub struct UnknownTone(pub String);

impl FromStr for Tone {
    type Err = UnknownTone;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        Tone::ALL
            .into_iter()
            .find(|tone| tone.as_str().eq_ignore_ascii_case(t))
            .ok_or_else(|| UnknownTone(s.to_string()))
    }
}

/// Rewrite `text` for `tone`. Total over every tone; tones without a rule are identity.
pub fn apply_tone(text: &str, tone: Tone) -> String {
    match tone {
        Tone::Professional => professional(text),
        Tone::Enthusiastic => enthusiastic(text),
        Tone::Friendly | Tone::Casual | Tone::Formal => text.to_string(),
    }
}

/// Same as [`apply_tone`] for a raw tone name. Unrecognized names are identity.
pub fn apply_tone_named(text: &str, tone: &str) -> String {
    match tone.parse::<Tone>() {
        Ok(t) => apply_tone(text, t),
        Err(_) => text.to_string(),
    }
}

fn professional(text: &str) -> String {
    let mut out = text.replace('!', ".");
    for sym in DECORATIVE_SYMBOLS {
        out = out.replace(sym, "");
    }
    out
}

fn enthusiastic(text: &str) -> String {
    if text.trim_end().ends_with(CELEBRATORY_SYMBOL) {
        return text.to_string();
    }
    if text.is_empty() {
        return CELEBRATORY_SYMBOL.to_string();
    }
    format!("{text} {CELEBRATORY_SYMBOL}")
}
