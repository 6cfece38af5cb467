// Pure text transforms used by agentcfg-core. No I/O, no global state.
pub mod normalize;
pub mod redact;
pub mod tone;

pub use normalize::{contains_folded, fold, normalize_phrase, normalize_phrases};
pub use redact::{redact, PLACEHOLDER};
pub use tone::{apply_tone, apply_tone_named, Tone, UnknownTone, CELEBRATORY_SYMBOL, DECORATIVE_SYMBOLS};
