//! SQL literal formatting shared by the seed and insert emitters.
//!
//! Only literal rendering lives here. Column lists, conflict targets and
//! venue-type allow-lists differ per emitter and stay in their own modules.

use crate::models::clean_value;

/// Double embedded single quotes.
pub fn escape(s: &str) -> String {
    s.replace('\'', "''")
}

/// `'text'` with quotes escaped.
pub fn quote(s: &str) -> String {
    format!("'{}'", escape(s))
}

/// Quoted literal, or the given null keyword for blank values.
pub fn quote_or(value: Option<&str>, null: &str) -> String {
    match value.and_then(clean_value) {
        Some(v) => quote(v),
        None => null.to_string(),
    }
}

/// `ARRAY['a', 'b']` with every item escaped. Empty lists still need a type.
pub fn text_array<S: AsRef<str>>(items: &[S], cast: bool) -> String {
    if items.is_empty() {
        return "ARRAY[]::text[]".to_string();
    }
    let body = items
        .iter()
        .map(|i| quote(i.as_ref()))
        .collect::<Vec<_>>()
        .join(", ");
    if cast {
        format!("ARRAY[{}]::text[]", body)
    } else {
        format!("ARRAY[{}]", body)
    }
}

/// SQL boolean keyword.
pub fn boolean(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_doubles_every_quote() {
        assert_eq!(quote("Slim's"), "'Slim''s'");
        assert_eq!(quote("'quoted' isn't"), "'''quoted'' isn''t'");
        assert_eq!(quote("plain"), "'plain'");
    }

    #[test]
    fn test_quoted_literal_is_balanced() {
        for input in ["'", "''", "a'b'c", "It's Charlotte's NoDa"] {
            let q = quote(input);
            let inner = &q[1..q.len() - 1];
            // every quote in the body is part of a doubled pair
            assert_eq!(inner.matches('\'').count() % 2, 0);
            assert_eq!(inner.replace("''", "'"), input);
        }
    }

    #[test]
    fn test_quote_or_null() {
        assert_eq!(quote_or(Some("x"), "NULL"), "'x'");
        assert_eq!(quote_or(Some("null"), "NULL"), "NULL");
        assert_eq!(quote_or(Some("undefined"), "null"), "null");
        assert_eq!(quote_or(None, "null"), "null");
    }

    #[test]
    fn test_text_array() {
        assert_eq!(text_array::<&str>(&[], false), "ARRAY[]::text[]");
        assert_eq!(text_array(&["rock", "rock 'n' roll"], false), "ARRAY['rock', 'rock ''n'' roll']");
        assert_eq!(text_array(&["jazz"], true), "ARRAY['jazz']::text[]");
    }
}
