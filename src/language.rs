//! Language detection for user utterances
//!
//! A cheap keyword heuristic, not a classifier. Rules run in order and the
//! first match wins:
//!
//! 1. any Spanish-only character (`ñ`, `ü`, accented vowels) → Spanish
//! 2. two or more English keyword stems → English
//! 3. two or more Spanish keyword stems → Spanish
//! 4. otherwise → English
//!
//! Keywords match by case-insensitive substring containment, so a stem inside
//! an unrelated longer word still counts. The lists and the threshold are
//! product tuning values; keep them as they are.

use serde::{Deserialize, Serialize};

/// Characters that only occur in Spanish text
const SPANISH_CHARS: &[char] = &['ñ', 'á', 'é', 'í', 'ó', 'ú', 'ü'];

/// English keyword stems
const ENGLISH_KEYWORDS: &[&str] = &[
    "hello", "hey", "thank", "please", "what", "where", "when", "how", "you", "the", "food",
    "order", "want", "delivery", "good", "hungry", "morning", "bye",
];

/// Spanish keyword stems
const SPANISH_KEYWORDS: &[&str] = &[
    "gracias", "favor", "quiero", "donde", "cuando", "como", "pedido", "comida", "hambre",
    "buenos", "buenas", "tengo", "estas", "eres", "para", "chau", "adios",
];

/// Minimum keyword hits before a language wins on keywords alone
const KEYWORD_THRESHOLD: usize = 2;

/// Conversation language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Spanish (the product default)
    #[default]
    Es,
    /// English
    En,
}

impl Language {
    /// Two-letter tag used on the wire
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Es => "es",
            Self::En => "en",
        }
    }

    /// Parse a language tag, falling back to Spanish for anything unknown
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "en" | "en-us" | "en-gb" | "english" => Self::En,
            _ => Self::Es,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Detect the language of free text
#[must_use]
pub fn detect(text: &str) -> Language {
    let lower = text.to_lowercase();

    if lower.chars().any(|c| SPANISH_CHARS.contains(&c)) {
        return Language::Es;
    }

    if keyword_hits(&lower, ENGLISH_KEYWORDS) >= KEYWORD_THRESHOLD {
        return Language::En;
    }

    if keyword_hits(&lower, SPANISH_KEYWORDS) >= KEYWORD_THRESHOLD {
        return Language::Es;
    }

    Language::En
}

/// Count how many keywords occur anywhere in the (lowercased) text
fn keyword_hits(lower: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| lower.contains(*k)).count()
}
