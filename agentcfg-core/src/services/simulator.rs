// src/services/simulator.rs
//! Reply preview for the settings screen.
//!
//! Picks a canned template by keyword, shapes it with the configured tone, then
//! redacts forbidden phrases. Deterministic: the same message and configuration
//! always give the same text. Never talks to a language model and is not part of
//! the live reply path.

use agentcfg_text::{apply_tone, contains_folded, redact};

use crate::model::Configuration;

/// Keyword → template, checked in order; first hit wins.
pub const SAMPLE_REPLIES: &[(&str, &str)] = &[
    (
        "red dresses",
        "Yes! We have several beautiful red dresses in stock. Let me show you our top picks:\n\n\
         1. Elegant Red Evening Gown - KES 8,500\n\
         2. Casual Red Sundress - KES 3,200\n\
         3. Red Cocktail Dress - KES 5,800\n\n\
         Which style interests you? \u{1F457}",
    ),
    (
        "price",
        "Our prices range from KES 2,000 to KES 15,000 depending on the item. \
         What type of product are you interested in?",
    ),
    (
        "buy",
        "Great! I'd be happy to help you complete your purchase. Let me add that to your cart \
         and we can proceed with M-Pesa payment. \u{1F6CD}\u{FE0F}",
    ),
    (
        "discount",
        "We occasionally have special promotions! Right now, if you purchase items over KES 5,000, \
         you get free delivery. Would you like to see our current collection?",
    ),
];

const CLARIFY_PLAIN: &str =
    "I'd be happy to help you with that! Could you tell me more about what you're looking for?";

/// Template for `user_message` before tone and filtering.
pub fn select_template(user_message: &str) -> String {
    for (keyword, reply) in SAMPLE_REPLIES {
        if contains_folded(user_message, keyword) {
            return (*reply).to_string();
        }
    }
    clarify(user_message)
}

/// Fallback reply. Quotes the request so the operator sees their filters act on it.
fn clarify(user_message: &str) -> String {
    let request = user_message.split_whitespace().collect::<Vec<_>>().join(" ");
    if request.is_empty() {
        return CLARIFY_PLAIN.to_string();
    }
    format!(
        "I'd be happy to help you with \"{request}\"! Could you tell me more about what you're looking for?"
    )
}

/// Preview the agent's reply to `user_message` under `config`.
pub fn simulate(user_message: &str, config: &Configuration) -> String {
    let template = select_template(user_message);
    let toned = apply_tone(&template, config.content.tone);
    redact(&toned, &config.content.do_not_say)
}
