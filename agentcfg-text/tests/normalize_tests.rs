use agentcfg_text::{contains_folded, normalize_phrase, normalize_phrases};

#[test]
fn normalization_is_idempotent() {
    let samples = [
        "  Cheap ",
        "CHEAP\u{200b}",
        "\tDiscount\n",
        "ÉTÉ",
        "İstanbul",
        "",
        "   ",
        "mixed Case  Inside",
    ];
    for s in samples {
        let once = normalize_phrase(s);
        assert_eq!(normalize_phrase(&once), once, "not idempotent for {s:?}");
    }
}

#[test]
fn duplicates_collapse_in_first_seen_order() {
    let out = normalize_phrases(["Cheap", "  cheap ", "Knock-off", "CHEAP", "", "   ", "knock-off"]);
    assert_eq!(out, vec!["cheap".to_string(), "knock-off".to_string()]);
}

#[test]
fn folded_containment() {
    assert!(contains_folded("Do you have RED DRESSES?", "red dresses"));
    assert!(!contains_folded("Do you have red shoes?", "red dresses"));
    assert!(!contains_folded("anything", ""));
}

#[test]
fn stored_phrases_drop_controls_but_matching_keeps_them() {
    assert_eq!(normalize_phrase("\tDisc\nount\r"), "discount");
    assert_eq!(agentcfg_text::fold("A\nB\u{200b}C"), "a\nbc");
    assert!(!contains_folded("red\ndresses", "red dresses"));
}
