//! Shared normalization functions for venue matching.
//! Used by the cleaner for dedup keys and by the SQL generators for genre lists.
//!
//! CRITICAL: Dedup keys depend on `normalize_name`. Run tests after changes.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::models::{clean_value, FieldParse};

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Leading/standalone article, matched as a whole word.
pub static ARTICLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bthe\b").unwrap());

/// Venue-type words that don't distinguish one venue from another.
/// "music hall" must come before a bare word so the phrase is removed whole.
pub static VENUE_TYPE_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:music\s+hall|music\s+house|theatre|theater|tavern|bar|club|brewery|brewing)\b")
        .unwrap()
});

/// Anything that isn't a lowercase letter, digit or space after folding.
pub static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9 ]+").unwrap());

/// Regex to collapse runs of whitespace into a single space
pub static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Fold Unicode text to lowercase ASCII.
/// e.g., "Café Nüll" → "cafe null"
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    any_ascii(&stripped).to_lowercase()
}

/// Unify quote characters, drop apostrophes and spell out ampersands.
/// "Slim’s Downtown" → "Slims Downtown", "Rock & Roll Hotel" → "Rock and Roll Hotel"
pub fn normalize_punctuation(s: &str) -> String {
    s.replace(['\u{2018}', '\u{2019}', '\u{00B4}', '\u{0060}'], "'")
        .replace('\'', "")
        .replace('&', " and ")
}

fn collapse_spaces(s: &str) -> String {
    MULTI_SPACE.replace_all(s, " ").trim().to_string()
}

/// Remove venue-type words until none are left.
/// Removing one word can join two others into a new phrase ("music bar hall").
fn strip_venue_type_words(s: &str) -> String {
    let mut current = s.to_string();
    loop {
        let next = collapse_spaces(&VENUE_TYPE_WORDS.replace_all(&current, " "));
        if next == current {
            return current;
        }
        current = next;
    }
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Normalize a venue name to its comparison form.
///
/// "The Pour House" → "pour house", "Lincoln Theatre" → "lincoln",
/// "Deep South the Bar" → "deep south". Names that consist only of articles
/// or venue-type words ("The Bar") keep their cleaned form instead of
/// collapsing to an empty key.
///
/// Idempotent: `normalize_name(&normalize_name(x)) == normalize_name(x)`.
pub fn normalize_name(name: &str) -> String {
    // Fullwidth and compatibility forms only become ' and & after folding,
    // while the acute accent must be handled before NFKD splits it off.
    let folded = normalize_punctuation(&fold_to_ascii(&normalize_punctuation(name)));
    let cleaned = collapse_spaces(&NON_WORD.replace_all(&folded, " "));

    let without_article = collapse_spaces(&ARTICLE.replace_all(&cleaned, " "));
    if without_article.is_empty() {
        return cleaned;
    }

    let stripped = strip_venue_type_words(&without_article);
    if stripped.is_empty() {
        return without_article;
    }
    stripped
}

/// Name+city dedup key: `"{normalized name}|{lowercase city}"`.
///
/// A trailing city name on the venue name ("Pour House Raleigh" in Raleigh)
/// is dropped so it keys the same as "The Pour House".
pub fn name_city_key(name: &str, city: &str) -> Option<String> {
    let name = clean_value(name)?;
    let city = clean_value(city)?;

    let city_norm = city.trim().to_lowercase();
    let mut name_norm = normalize_name(name);

    let city_folded = collapse_spaces(&NON_WORD.replace_all(&fold_to_ascii(&city_norm), " "));
    if !city_folded.is_empty() {
        if let Some(prefix) = name_norm.strip_suffix(city_folded.as_str()) {
            // whole trailing word only, and never the entire name
            if prefix.ends_with(' ') && !prefix.trim().is_empty() {
                name_norm = prefix.trim_end().to_string();
            }
        }
    }

    Some(format!("{}|{}", name_norm, city_norm))
}

/// Email dedup key: trimmed and lowercased.
pub fn email_key(email: &str) -> Option<String> {
    clean_value(email).map(|e| e.trim().to_lowercase())
}

// ============================================================================
// TYPED CELL PARSING
// ============================================================================

/// Parse a capacity cell as a whole number.
pub fn parse_capacity(raw: &str) -> FieldParse<i64> {
    let Some(value) = clean_value(raw) else {
        return FieldParse::Absent;
    };
    match value.trim().parse::<i64>() {
        Ok(n) => FieldParse::Value(n),
        Err(e) => FieldParse::Invalid {
            raw: value.to_string(),
            reason: e.to_string(),
        },
    }
}

/// Parse a genre list stored as a JSON array string, e.g. `["rock", "indie"]`.
pub fn parse_genre_list(raw: &str) -> FieldParse<Vec<String>> {
    let Some(value) = clean_value(raw) else {
        return FieldParse::Absent;
    };
    match serde_json::from_str::<Vec<String>>(value) {
        Ok(genres) => FieldParse::Value(genres),
        Err(e) => FieldParse::Invalid {
            raw: value.to_string(),
            reason: e.to_string(),
        },
    }
}

/// Lowercase, trim and drop empty or repeated genres, keeping first occurrence.
pub fn normalize_genres<I, S>(genres: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for genre in genres {
        let g = genre.as_ref().trim().to_lowercase();
        if !g.is_empty() && !out.contains(&g) {
            out.push(g);
        }
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================
