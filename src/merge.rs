//! Record merging for duplicate venues.
//!
//! The existing record always wins when it has a value. Incoming values only
//! fill blanks, except for capacity (numeric max) and music_focus (genre
//! union). Parse problems in either of those never fail the merge; they are
//! returned as `MergeFallback`s and the existing value is kept.

use std::collections::BTreeSet;

use crate::models::{is_blank, Field, FieldParse, VenueRecord, IMMUTABLE_COLUMNS};
use crate::normalize::{parse_capacity, parse_genre_list};

/// A column where the merge fell back to the existing value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeFallback {
    pub venue: String,
    pub column: String,
    pub raw: String,
    pub reason: String,
}

/// Merged record plus any columns that fell back.
#[derive(Clone, Debug)]
pub struct MergeResult {
    pub record: VenueRecord,
    pub fallbacks: Vec<MergeFallback>,
}

/// Merge `incoming` into a copy of `existing`.
pub fn merge_records(existing: &VenueRecord, incoming: &VenueRecord) -> MergeResult {
    let mut merged = existing.clone();
    let mut fallbacks = Vec::new();
    let venue = existing.name().to_string();

    let mut columns: Vec<(&str, &str)> = incoming.iter().collect();
    // Deterministic fallback order regardless of map iteration order
    columns.sort_unstable_by_key(|(c, _)| *c);

    for (column, value) in columns {
        if IMMUTABLE_COLUMNS.contains(&column) || is_blank(value) {
            continue;
        }

        let current = merged.raw(column).unwrap_or("");
        if is_blank(current) {
            merged.set(column, value);
            continue;
        }

        let outcome = if Field::is_capacity_column(column) {
            merge_capacity(current, value)
        } else if Field::MusicFocus.columns().contains(&column) {
            merge_genres(current, value)
        } else {
            continue;
        };

        match outcome {
            FieldParse::Value(combined) => merged.set(column, combined),
            FieldParse::Invalid { raw, reason } => fallbacks.push(MergeFallback {
                venue: venue.clone(),
                column: column.to_string(),
                raw,
                reason,
            }),
            FieldParse::Absent => {}
        }
    }

    MergeResult {
        record: merged,
        fallbacks,
    }
}

/// Larger of two capacities, as text.
pub fn merge_capacity(existing: &str, incoming: &str) -> FieldParse<String> {
    let a = match parse_capacity(existing) {
        FieldParse::Value(n) => n,
        FieldParse::Absent => 0,
        FieldParse::Invalid { raw, reason } => return FieldParse::Invalid { raw, reason },
    };
    match parse_capacity(incoming) {
        FieldParse::Value(b) => FieldParse::Value(a.max(b).to_string()),
        FieldParse::Absent => FieldParse::Absent,
        FieldParse::Invalid { raw, reason } => FieldParse::Invalid { raw, reason },
    }
}

/// Case-insensitive union of two JSON genre lists, sorted, as JSON text.
pub fn merge_genres(existing: &str, incoming: &str) -> FieldParse<String> {
    let mut union: BTreeSet<String> = BTreeSet::new();
    for raw in [existing, incoming] {
        match parse_genre_list(raw) {
            FieldParse::Value(genres) => union.extend(
                genres
                    .iter()
                    .map(|g| g.trim().to_lowercase())
                    .filter(|g| !g.is_empty()),
            ),
            FieldParse::Absent => {}
            FieldParse::Invalid { raw, reason } => return FieldParse::Invalid { raw, reason },
        }
    }
    if union.is_empty() {
        return FieldParse::Absent;
    }
    let list: Vec<String> = union.into_iter().collect();
    match serde_json::to_string(&list) {
        Ok(json) => FieldParse::Value(json),
        Err(e) => FieldParse::Invalid {
            raw: incoming.to_string(),
            reason: e.to_string(),
        },
    }
}
