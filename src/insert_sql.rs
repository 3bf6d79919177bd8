//! Per-row insert emitter: one upsert per venue keyed on `email`.
//!
//! Used for batches that have no ids yet. Only columns with a value are
//! listed, so every statement carries its own column list.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::models::{Field, FieldParse, VenueRecord};
use crate::normalize::{parse_capacity, parse_genre_list};
use crate::sql::{boolean, quote, text_array};

/// Columns never overwritten on conflict.
const NON_UPDATABLE: [&str; 3] = ["id", "email", "created_at"];

/// Map a raw venue type onto the venues.venue_type check constraint.
pub fn schema_venue_type(raw: &str) -> &'static str {
    match raw.trim().to_lowercase().as_str() {
        "brewery" | "winery" | "restaurant" | "bar" => "bar",
        "club" => "club",
        "theater" | "theatre" => "theater",
        "amphitheater" => "amphitheater",
        "stadium" => "stadium",
        "festival" => "festival",
        // "venue", "coffee_shop", "other" and anything unrecognised
        _ => "other",
    }
}

/// Genre cell as a lowercased text array, or NULL when blank or malformed.
pub fn genre_array(raw: &str) -> String {
    match parse_genre_list(raw) {
        FieldParse::Value(genres) => {
            let lower: Vec<String> = genres.iter().map(|g| g.to_lowercase()).collect();
            text_array(&lower, true)
        }
        FieldParse::Absent => "NULL".to_string(),
        FieldParse::Invalid { raw, reason } => {
            tracing::warn!(raw = %raw, %reason, "Writing NULL for malformed music_focus");
            "NULL".to_string()
        }
    }
}

/// (column, literal) pairs for the fields present on a record.
pub fn row_values(record: &VenueRecord) -> Vec<(&'static str, String)> {
    let mut row: Vec<(&'static str, String)> = Vec::new();

    let text_fields = [
        Field::Name,
        Field::Email,
        Field::Phone,
        Field::Website,
        Field::Address,
        Field::City,
        Field::State,
        Field::ZipCode,
        Field::Country,
        Field::Description,
    ];
    for field in text_fields {
        if let Some(v) = record.get(field) {
            row.push((field.column(), quote(v)));
        }
    }

    match parse_capacity(record.get(Field::Capacity).unwrap_or("")) {
        FieldParse::Value(n) => row.push(("capacity", n.to_string())),
        FieldParse::Absent => {}
        FieldParse::Invalid { raw, .. } => {
            tracing::warn!(venue = record.name(), raw = %raw, "Skipping non-numeric capacity");
        }
    }

    if let Some(raw) = record.get(Field::MusicFocus) {
        row.push(("music_focus", genre_array(raw)));
    }
    if let Some(raw) = record.get(Field::VenueType) {
        row.push(("venue_type", quote(schema_venue_type(raw))));
    }
    for field in [Field::InstagramHandle, Field::FacebookUrl] {
        if let Some(v) = record.get(field) {
            row.push((field.column(), quote(v)));
        }
    }
    if let Some(v) = record.get(Field::IsVerified) {
        row.push(("is_verified", boolean(v.trim().eq_ignore_ascii_case("true")).to_string()));
    }

    row
}

/// Single INSERT ... ON CONFLICT (email) statement.
pub fn insert_statement(record: &VenueRecord) -> String {
    let row = row_values(record);
    let columns: Vec<&str> = row.iter().map(|(c, _)| *c).collect();
    let values: Vec<&str> = row.iter().map(|(_, v)| v.as_str()).collect();

    let updates: Vec<String> = columns
        .iter()
        .filter(|c| !NON_UPDATABLE.contains(*c))
        .map(|c| format!("  {c} = EXCLUDED.{c}"))
        .collect();

    let mut sql = format!(
        "INSERT INTO public.venues ({})\nVALUES ({})\n",
        columns.join(", "),
        values.join(", ")
    );
    if updates.is_empty() {
        sql.push_str("ON CONFLICT (email) DO NOTHING;");
    } else {
        sql.push_str("ON CONFLICT (email) DO UPDATE SET\n");
        sql.push_str(&updates.join(",\n"));
        sql.push(';');
    }
    sql
}

/// Options for the rendered script.
#[derive(Clone, Debug, Default)]
pub struct InsertScript {
    /// Heading line, e.g. "Richmond, VA Venues Insert Script".
    pub title: String,
    /// State used by the trailing verification query; all states when `None`.
    pub verify_state: Option<String>,
}

/// Rows need at least a name; `venues.name` is NOT NULL and a row of blank
/// cells would render an empty column list.
pub fn is_insertable(record: &VenueRecord) -> bool {
    record.get(Field::Name).is_some()
}

/// Records grouped by city, in city order, keeping input order within a city.
pub fn group_by_city<'a, I>(records: I) -> BTreeMap<&'a str, Vec<&'a VenueRecord>>
where
    I: IntoIterator<Item = &'a VenueRecord>,
{
    let mut by_city: BTreeMap<&str, Vec<&VenueRecord>> = BTreeMap::new();
    for record in records {
        let city = record.get(Field::City).unwrap_or("Unknown");
        by_city.entry(city).or_default().push(record);
    }
    by_city
}

/// Render the full insert script.
pub fn render_insert_sql(records: &[VenueRecord], script: &InsertScript) -> String {
    let mut out = String::new();
    // writeln! into a String cannot fail
    let _ = write_insert_sql(&mut out, records, script);
    out
}

fn write_insert_sql(out: &mut String, records: &[VenueRecord], script: &InsertScript) -> std::fmt::Result {
    let mut usable = Vec::with_capacity(records.len());
    for (row, record) in records.iter().enumerate() {
        if is_insertable(record) {
            usable.push(record);
        } else {
            tracing::warn!(row = row + 1, "Skipping venue without a name");
        }
    }
    let by_city = group_by_city(usable.iter().copied());

    writeln!(out, "-- {}", script.title)?;
    writeln!(out, "-- Total venues: {}", usable.len())?;
    writeln!(out)?;
    writeln!(out, "BEGIN;")?;
    writeln!(out)?;

    for (city, venues) in &by_city {
        let state = venues[0].get(Field::State).unwrap_or("");
        writeln!(out, "-- {}, {} venues ({} venues)", city, state, venues.len())?;
        for record in venues {
            writeln!(out, "{}", insert_statement(record))?;
            writeln!(out)?;
        }
    }

    writeln!(out, "COMMIT;")?;
    writeln!(out)?;
    writeln!(out, "-- Verify results")?;
    writeln!(out, "SELECT city, state, COUNT(*) as venue_count")?;
    writeln!(out, "FROM public.venues")?;
    if let Some(state) = &script.verify_state {
        writeln!(out, "WHERE state = {}", quote(state))?;
    }
    writeln!(out, "GROUP BY city, state")?;
    write!(out, "ORDER BY venue_count DESC;")?;
    Ok(())
}
