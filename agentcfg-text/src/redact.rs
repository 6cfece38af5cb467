//! Forbidden-phrase redaction.
//!
//! Phrases are literal text. Matching runs on the folded view of the input
//! (see [`crate::normalize::fold`]) and maps each hit back to the original byte
//! span, so case changes and zero-width characters inside a phrase do not let it
//! slip through.

use crate::normalize::{fold_char_into, normalize_phrase};

/// Token written in place of every redacted span.
pub const PLACEHOLDER: &str = "[filtered]";

/// Build a folded character view of `s` along with original byte spans.
/// Each produced folded char corresponds to an original (start,end) byte span.
/// Characters removed by folding emit no span entries.
fn folded_chars_with_spans(s: &str) -> (Vec<char>, Vec<(usize, usize)>) {
    let mut chars = Vec::new();
    let mut spans = Vec::new();
    let mut frag = String::new();
    for (orig_start, ch) in s.char_indices() {
        let orig_end = orig_start + ch.len_utf8();
        frag.clear();
        fold_char_into(ch, &mut frag);
        for nc in frag.chars() {
            chars.push(nc);
            spans.push((orig_start, orig_end));
        }
    }
    (chars, spans)
}

fn overlaps(taken: &[(usize, usize)], s: usize, e: usize) -> bool {
    taken.iter().any(|&(ts, te)| s < te && ts < e)
}

/// Byte spans where `pat` occurs in the folded view of `text`.
fn find_spans(chars: &[char], spans: &[(usize, usize)], pat: &[char]) -> Vec<(usize, usize)> {
    let plen = pat.len();
    let mut found = Vec::new();
    if plen == 0 || plen > chars.len() {
        return found;
    }
    for i in 0..=chars.len() - plen {
        if chars[i..i + plen] == *pat {
            found.push((spans[i].0, spans[i + plen - 1].1));
        }
    }
    found
}

/// Rebuild `text` with each (sorted, disjoint) span replaced by the placeholder.
fn splice(text: &str, taken: &[(usize, usize)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;
    for &(s, e) in taken {
        out.push_str(&text[cursor..s]);
        out.push_str(PLACEHOLDER);
        cursor = e;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Replace every case-insensitive occurrence of each phrase with [`PLACEHOLDER`].
///
/// Phrases are applied in the order given. All matching happens against the
/// original text: a span claimed by an earlier phrase is never matched again, and
/// the placeholder itself is never re-filtered. Empty text or an empty phrase
/// list returns the input unchanged.
///
/// A placeholder can combine with the text next to it into a new occurrence
/// (`"]]]"` with phrase `"]]"`). Such an occurrence is absorbed into the
/// placeholder it touches, so no phrase survives outside a placeholder.
pub fn redact<S: AsRef<str>>(text: &str, phrases: &[S]) -> String {
    if text.is_empty() || phrases.is_empty() {
        return text.to_string();
    }
    let patterns: Vec<Vec<char>> = phrases
        .iter()
        .map(|p| normalize_phrase(p.as_ref()).chars().collect::<Vec<char>>())
        .filter(|p| !p.is_empty())
        .collect();
    if patterns.is_empty() {
        return text.to_string();
    }

    let (chars, spans) = folded_chars_with_spans(text);
    let mut taken: Vec<(usize, usize)> = Vec::new();
    for pat in &patterns {
        let mut last_end = 0usize;
        for (s, e) in find_spans(&chars, &spans, pat) {
            // Same-phrase hits never overlap; earlier phrases keep their spans.
            if s < last_end || overlaps(&taken, s, e) {
                continue;
            }
            taken.push((s, e));
            last_end = e;
        }
    }
    if taken.is_empty() {
        return text.to_string();
    }
    taken.sort_by_key(|r| r.0);

    let mut out = splice(text, &taken);
    while let Some(next) = absorb_straddling(&out, &patterns) {
        out = next;
    }
    out
}

/// One pass over redacted output: every phrase hit that overlaps a placeholder
/// without lying inside it is merged with that placeholder. `None` when no
/// such hit exists. Each pass removes at least one plain char or one
/// placeholder, so repeated passes terminate.
fn absorb_straddling(out: &str, patterns: &[Vec<char>]) -> Option<String> {
    let regions: Vec<(usize, usize)> = out
        .match_indices(PLACEHOLDER)
        .map(|(s, m)| (s, s + m.len()))
        .collect();
    if regions.is_empty() {
        return None;
    }
    let (chars, spans) = folded_chars_with_spans(out);

    let mut merged: Vec<(usize, usize)> = Vec::new();
    for pat in patterns {
        for (s, e) in find_spans(&chars, &spans, pat) {
            let inside = regions.iter().any(|&(rs, re)| rs <= s && e <= re);
            if inside || !overlaps(&regions, s, e) {
                continue;
            }
            let (mut ms, mut me) = (s, e);
            for &(rs, re) in &regions {
                if ms < re && rs < me {
                    ms = ms.min(rs);
                    me = me.max(re);
                }
            }
            merged.push((ms, me));
        }
    }
    if merged.is_empty() {
        return None;
    }

    merged.sort_by_key(|r| r.0);
    let mut disjoint: Vec<(usize, usize)> = Vec::with_capacity(merged.len());
    for (s, e) in merged {
        match disjoint.last_mut() {
            Some(last) if s < last.1 => last.1 = last.1.max(e),
            _ => disjoint.push((s, e)),
        }
    }
    Some(splice(out, &disjoint))
}
