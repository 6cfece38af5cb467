// tests/preview_tests.rs
// Reply preview and live prompt assembly.

use chrono::Utc;

use agentcfg_core::model::DEFAULT_SYSTEM_PROMPT;
use agentcfg_core::services::prompt::{CATALOG_WINDOW, HISTORY_WINDOW};
use agentcfg_core::services::simulator::select_template;
use agentcfg_core::services::{CatalogItem, ChatTurn, PromptContext, build_prompt, simulate};
use agentcfg_core::{Configuration, LanguageStyle, Tone, UpsellRule};

fn config_with(tone: Tone, phrases: &[&str]) -> Configuration {
    let mut cfg = Configuration::provisioned("shop", Utc::now());
    cfg.content.tone = tone;
    cfg.content.do_not_say = phrases.iter().map(|p| p.to_string()).collect();
    cfg
}

#[test]
fn keyword_templates_are_checked_in_order() {
    assert!(select_template("Do you have RED DRESSES?").contains("Elegant Red Evening Gown"));
    assert!(select_template("what's the price of that").starts_with("Our prices range"));
    assert!(select_template("I want to buy it").contains("M-Pesa"));
    assert!(select_template("any discount?").contains("free delivery"));
    // "red dresses" outranks "price".
    assert!(select_template("price of red dresses").contains("Elegant Red Evening Gown"));
    assert!(select_template("hello").contains("Could you tell me more"));
}

#[test]
fn clarify_reply_quotes_the_request() {
    let reply = select_template("  I want   a cheap\ndress ");
    assert!(reply.contains("\"I want a cheap dress\""), "{reply}");
    let plain = select_template("   ");
    assert!(!plain.contains('"'));
}

#[test]
fn professional_preview_filters_and_calms() {
    let cfg = config_with(Tone::Professional, &["cheap"]);
    let out = simulate("I want a cheap dress", &cfg);
    assert!(out.contains("[filtered]"), "{out}");
    assert!(!out.contains("cheap"), "{out}");
    assert!(!out.contains('!'), "{out}");

    let bought = simulate("buy", &cfg);
    assert!(!bought.contains('\u{1F6CD}'), "{bought}");
    assert!(!bought.contains('!'));
}

#[test]
fn enthusiastic_preview_gets_one_sparkle() {
    let cfg = config_with(Tone::Enthusiastic, &[]);
    let out = simulate("discount", &cfg);
    assert!(out.ends_with(" ✨"), "{out}");
    assert_eq!(out.matches('✨').count(), 1);
}

#[test]
fn preview_is_deterministic() {
    let cfg = config_with(Tone::Casual, &["stock", "m-pesa"]);
    let a = simulate("Red dresses please, I will buy", &cfg);
    let b = simulate("Red dresses please, I will buy", &cfg);
    assert_eq!(a, b);
    assert!(a.contains("[filtered]"));
    assert!(!a.to_lowercase().contains("stock"));
}

#[test]
fn prompt_includes_configuration_sections() {
    let mut cfg = config_with(Tone::Formal, &["cheap", "fake"]);
    cfg.content.system_prompt = "You sell Maasai sandals.".into();
    cfg.content.language_style = LanguageStyle::Formal;
    cfg.content.upsell_rules = vec![UpsellRule::new("cart over 5000", "offer delivery", "Free delivery today")];

    let ctx = PromptContext {
        current_message: "Do you ship to Mombasa?",
        ..Default::default()
    };
    let prompt = build_prompt(Some(&cfg), &ctx);
    assert!(prompt.starts_with("You sell Maasai sandals."));
    assert!(prompt.contains("TONE: FORMAL"));
    assert!(prompt.contains("LANGUAGE STYLE: FORMAL"));
    assert!(prompt.contains("- When cart over 5000: offer delivery (\"Free delivery today\")"));
    assert!(prompt.contains("NEVER SAY:\n- cheap\n- fake\n"));
    assert!(prompt.contains("CURRENT CUSTOMER MESSAGE:\nDo you ship to Mombasa?"));
    assert!(prompt.contains("under 1600 characters"));
    assert!(!prompt.contains("RECENT CONVERSATION"));
    assert!(!prompt.contains("AVAILABLE PRODUCTS"));
}

#[test]
fn prompt_defaults_without_configuration() {
    let prompt = build_prompt(None, &PromptContext::default());
    assert!(prompt.starts_with(DEFAULT_SYSTEM_PROMPT));
    assert!(prompt.contains("TONE: FRIENDLY"));
    assert!(!prompt.contains("NEVER SAY"));
}

#[test]
fn prompt_windows_history_and_catalog() {
    let history: Vec<ChatTurn> = (0..12)
        .map(|i| ChatTurn {
            role: if i % 2 == 0 { "user".into() } else { "assistant".into() },
            content: format!("turn {i}"),
        })
        .collect();
    let catalog: Vec<CatalogItem> = (0..14)
        .map(|i| CatalogItem {
            name: format!("item {i}"),
            price: 1000.0 + i as f64,
        })
        .collect();
    let ctx = PromptContext {
        history: &history,
        catalog: &catalog,
        current_message: "hi",
    };
    let prompt = build_prompt(Some(&config_with(Tone::Friendly, &[])), &ctx);

    let first_kept = 12 - HISTORY_WINDOW;
    assert!(!prompt.contains(&format!("turn {}\n", first_kept - 1)));
    assert!(prompt.contains(&format!("USER: turn {first_kept}\n")));
    assert!(prompt.contains("ASSISTANT: turn 11\n"));

    assert!(prompt.contains(&format!("item {}", CATALOG_WINDOW - 1)));
    assert!(!prompt.contains(&format!("item {}", CATALOG_WINDOW)));
    assert!(prompt.contains("- item 0 (KES 1000)"));
}
