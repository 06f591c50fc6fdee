//! Wake word matching on transcripts
//!
//! The robot answers to "dinner" (and the common mistranscription "diner"),
//! case-insensitive, on word boundaries. No fuzzy matching.

use std::sync::LazyLock;

use regex::Regex;

static WAKE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(dinner|diner)\b").expect("valid regex"));

/// Check whether a transcript contains the wake word
#[must_use]
pub fn contains_wake_word(transcript: &str) -> bool {
    WAKE_WORD.is_match(transcript)
}
