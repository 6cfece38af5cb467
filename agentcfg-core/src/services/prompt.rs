// src/services/prompt.rs
//! Builds the language-model prompt for a live conversation from an owner's
//! configuration. Pure string assembly; the caller owns the model call.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::model::{Configuration, DEFAULT_SYSTEM_PROMPT};
use agentcfg_text::Tone;

/// Most recent turns included.
pub const HISTORY_WINDOW: usize = 8;
/// Catalog items included, from the front.
pub const CATALOG_WINDOW: usize = 10;
/// Reply length the model is asked to stay under.
pub const MAX_REPLY_CHARS: usize = 1600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    /// Kenyan shillings.
    pub price: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PromptContext<'a> {
    pub history: &'a [ChatTurn],
    pub catalog: &'a [CatalogItem],
    pub current_message: &'a str,
}

/// Assemble the prompt. Without a configuration the defaults apply.
pub fn build_prompt(config: Option<&Configuration>, ctx: &PromptContext<'_>) -> String {
    let mut out = String::new();

    match config {
        Some(cfg) => {
            let c = &cfg.content;
            let prompt = if c.system_prompt.trim().is_empty() {
                DEFAULT_SYSTEM_PROMPT
            } else {
                c.system_prompt.as_str()
            };
            let _ = writeln!(out, "{prompt}\n");
            let _ = writeln!(out, "TONE: {}", c.tone.as_str().to_uppercase());
            let _ = writeln!(out, "LANGUAGE STYLE: {}", c.language_style.as_str().to_uppercase());

            if !c.upsell_rules.is_empty() {
                out.push_str("\nUPSELL RULES:\n");
                for rule in &c.upsell_rules {
                    let _ = writeln!(out, "- When {}: {} (\"{}\")", rule.trigger, rule.action, rule.message);
                }
            }
            if !c.do_not_say.is_empty() {
                out.push_str("\nNEVER SAY:\n");
                for phrase in &c.do_not_say {
                    let _ = writeln!(out, "- {phrase}");
                }
            }
        }
        None => {
            let _ = writeln!(out, "{DEFAULT_SYSTEM_PROMPT}\n");
            let _ = writeln!(out, "TONE: {}", Tone::default().as_str().to_uppercase());
        }
    }

    if !ctx.history.is_empty() {
        out.push_str("\nRECENT CONVERSATION:\n");
        let skip = ctx.history.len().saturating_sub(HISTORY_WINDOW);
        for turn in &ctx.history[skip..] {
            let _ = writeln!(out, "{}: {}", turn.role.to_uppercase(), turn.content);
        }
    }

    if !ctx.catalog.is_empty() {
        out.push_str("\nAVAILABLE PRODUCTS:\n");
        for item in ctx.catalog.iter().take(CATALOG_WINDOW) {
            let _ = writeln!(out, "- {} (KES {})", item.name, item.price);
        }
    }

    let _ = write!(
        out,
        "\nCURRENT CUSTOMER MESSAGE:\n{}\n\n\
         INSTRUCTIONS:\n\
         - Respond naturally and helpfully\n\
         - Keep responses under {MAX_REPLY_CHARS} characters\n\
         - Return JSON: {{\"reply_text\": \"...\", \"actions\": [], \"intent\": \"...\"}}\n",
        ctx.current_message
    );
    out
}
