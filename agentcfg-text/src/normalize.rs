//! Text normalization shared by phrase storage, phrase matching and keyword lookup.
//!
//! Policy:
//! - Matching view (`fold`): drop common zero-width characters (ZWS/ZWNJ/ZWJ/WJ/BOM)
//!   and lowercase (char.to_lowercase()). Line breaks, tabs and other control
//!   characters stay, so a phrase never matches across them.
//! - Stored phrases (`normalize_phrase`): the matching view with control
//!   characters removed, then trimmed.
//!
//! Stored phrases and the matcher both go through `fold`, so they cannot drift apart.

/// Case-fold `s` for matching. Does not trim.
pub fn fold(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        fold_char_into(ch, &mut out);
    }
    out
}

/// Fold a single char, appending zero or more chars to `out`.
pub(crate) fn fold_char_into(ch: char, out: &mut String) {
    for lc in ch.to_lowercase() {
        match lc {
            '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' => {}
            _ => out.push(lc),
        }
    }
}

/// Canonical stored form of a forbidden phrase: folded, control characters
/// removed, then trimmed.
///
/// Idempotent: `normalize_phrase(&normalize_phrase(p)) == normalize_phrase(p)`.
pub fn normalize_phrase(phrase: &str) -> String {
    let folded: String = fold(phrase).chars().filter(|c| !c.is_control()).collect();
    folded.trim().to_string()
}

/// Normalize a phrase list, keeping first-seen order.
///
/// Duplicates (after normalization) and phrases that normalize to empty are dropped.
pub fn normalize_phrases<I, S>(phrases: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for p in phrases {
        let n = normalize_phrase(p.as_ref());
        if n.is_empty() || out.contains(&n) {
            continue;
        }
        out.push(n);
    }
    out
}

/// Case-insensitive literal containment using the same folding as the phrase filter.
pub fn contains_folded(haystack: &str, needle: &str) -> bool {
    let needle = fold(needle);
    if needle.is_empty() {
        return false;
    }
    fold(haystack).contains(&needle)
}
