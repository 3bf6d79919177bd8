//! Batch seed emitter: one multi-row upsert keyed on `id`.
//!
//! Output shape:
//! ```text
//! begin;
//! insert into public.venues (id, name, ...) values
//! -- Raleigh, NC venues
//! ('...', ...),
//! ('...', ...)
//! on conflict (id) do update set ... updated_at = now();
//! commit;
//! ```

use std::fmt::Write;

use crate::enrich::SeedVenue;
use crate::sql::{boolean, quote, quote_or, text_array};

/// Venue types the seed table accepts; anything else becomes "other".
pub const SEED_VENUE_TYPES: [&str; 13] = [
    "bar",
    "brewery",
    "winery",
    "club",
    "theater",
    "amphitheater",
    "stadium",
    "festival",
    "restaurant",
    "hotel",
    "coffee_shop",
    "venue",
    "other",
];

pub const SEED_COLUMNS: [&str; 12] = [
    "id",
    "name",
    "email",
    "phone",
    "website",
    "city",
    "state",
    "description",
    "capacity",
    "music_focus",
    "venue_type",
    "is_verified",
];

pub fn seed_venue_type(raw: &str) -> &str {
    let lower = raw.trim();
    SEED_VENUE_TYPES
        .iter()
        .copied()
        .find(|t| t.eq_ignore_ascii_case(lower))
        .unwrap_or("other")
}

/// One `(...)` values tuple.
pub fn values_tuple(v: &SeedVenue) -> String {
    let values = [
        quote(&v.id),
        quote(&v.name),
        quote_or(v.email.as_deref(), "null"),
        quote_or(v.phone.as_deref(), "null"),
        quote_or(v.website.as_deref(), "null"),
        quote(&v.city),
        quote(&v.state),
        quote_or(Some(v.description.as_str()), "null"),
        v.capacity.map(|c| c.to_string()).unwrap_or_else(|| "null".to_string()),
        text_array(&v.music_focus, false),
        quote(seed_venue_type(&v.venue_type)),
        boolean(v.is_verified).to_string(),
    ];
    format!("({})", values.join(", "))
}

/// Render the full seed script for venues already sorted by city.
pub fn render_seed_sql(venues: &[SeedVenue], state: &str) -> String {
    let mut out = String::new();
    // writeln! into a String cannot fail
    let _ = write_seed_sql(&mut out, venues, state);
    out
}

fn write_seed_sql(out: &mut String, venues: &[SeedVenue], state: &str) -> std::fmt::Result {
    let rule = "-- =====================================================";
    writeln!(out, "{rule}")?;
    writeln!(out, "-- {} MUSIC VENUES - ENRICHED SEED DATA", state.to_uppercase())?;
    writeln!(out, "{rule}")?;
    writeln!(out, "-- Total {} venues: {}", state, venues.len())?;
    writeln!(out, "-- Generated with enriched descriptions, proper null handling,")?;
    writeln!(out, "-- and complete venue information")?;
    writeln!(out)?;
    writeln!(out, "begin;")?;
    writeln!(out)?;

    if venues.is_empty() {
        writeln!(out, "-- no venues matched")?;
    } else {
        writeln!(out, "insert into public.venues (")?;
        let cols: Vec<String> = SEED_COLUMNS.iter().map(|c| format!("  {c}")).collect();
        writeln!(out, "{}", cols.join(",\n"))?;
        writeln!(out, ") values")?;

        let mut current_city: Option<&str> = None;
        for (i, venue) in venues.iter().enumerate() {
            if current_city != Some(venue.city.as_str()) {
                if i > 0 {
                    writeln!(out)?;
                }
                writeln!(out, "-- {}, {} venues", venue.city, venue.state)?;
                current_city = Some(venue.city.as_str());
            }
            let terminator = if i + 1 == venues.len() { "" } else { "," };
            writeln!(out, "{}{}", values_tuple(venue), terminator)?;
        }

        writeln!(out)?;
        writeln!(out, "on conflict (id) do update set")?;
        for col in SEED_COLUMNS.iter().skip(1) {
            writeln!(out, "  {col} = excluded.{col},")?;
        }
        writeln!(out, "  updated_at = now();")?;
    }

    writeln!(out)?;
    writeln!(out, "commit;")?;
    writeln!(out)?;
    writeln!(out, "{rule}")?;
    writeln!(out, "-- Venue Summary by City:")?;
    writeln!(out, "{rule}")?;
    for (city, count) in city_counts(venues) {
        writeln!(out, "-- {city}: {count} venues")?;
    }
    Ok(())
}

/// Venue counts per city, sorted by city.
pub fn city_counts(venues: &[SeedVenue]) -> Vec<(&str, usize)> {
    let mut counts: std::collections::BTreeMap<&str, usize> = std::collections::BTreeMap::new();
    for v in venues {
        *counts.entry(v.city.as_str()).or_default() += 1;
    }
    counts.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(name: &str, city: &str) -> SeedVenue {
        SeedVenue {
            id: format!("id-{}", name.to_lowercase().replace(' ', "-")),
            name: name.to_string(),
            email: None,
            phone: Some("919-555-0100".to_string()),
            website: None,
            city: city.to_string(),
            state: "NC".to_string(),
            description: "Live music.".to_string(),
            capacity: Some(300),
            music_focus: vec!["rock".to_string()],
            venue_type: "bar".to_string(),
            is_verified: false,
        }
    }

    #[test]
    fn test_venue_type_allow_list() {
        assert_eq!(seed_venue_type("Brewery"), "brewery");
        assert_eq!(seed_venue_type("coffee_shop"), "coffee_shop");
        assert_eq!(seed_venue_type("theatre"), "other");
        assert_eq!(seed_venue_type(""), "other");
    }

    #[test]
    fn test_values_tuple_escapes_and_nulls() {
        let mut v = seed("Slim's Downtown", "Raleigh");
        v.capacity = None;
        v.music_focus = Vec::new();
        v.venue_type = "dive".to_string();
        let tuple = values_tuple(&v);
        assert_eq!(
            tuple,
            "('id-slim''s-downtown', 'Slim''s Downtown', null, '919-555-0100', null, 'Raleigh', 'NC', \
             'Live music.', null, ARRAY[]::text[], 'other', false)"
        );
    }

    #[test]
    fn test_render_groups_by_city_and_terminates() {
        let venues = vec![seed("Motorco", "Durham"), seed("Kings", "Raleigh"), seed("Lincoln Theatre", "Raleigh")];
        let sql = render_seed_sql(&venues, "NC");

        assert!(sql.contains("begin;\n"));
        assert!(sql.contains("-- Durham, NC venues\n('id-motorco'"));
        assert!(sql.contains("\n\n-- Raleigh, NC venues\n"));
        assert!(sql.contains("'Kings'"));
        // only the last tuple lacks a trailing comma
        let tuples: Vec<&str> = sql.lines().filter(|l| l.starts_with("('")).collect();
        assert_eq!(tuples.len(), 3);
        assert!(tuples[0].ends_with("),"));
        assert!(tuples[1].ends_with("),"));
        assert!(tuples[2].ends_with(')'));
        assert!(sql.contains("on conflict (id) do update set\n  name = excluded.name,"));
        assert!(sql.contains("  is_verified = excluded.is_verified,\n  updated_at = now();"));
        assert!(sql.contains("commit;"));
        assert!(sql.contains("-- Durham: 1 venues\n-- Raleigh: 2 venues"));
    }

    #[test]
    fn test_render_empty_has_no_insert() {
        let sql = render_seed_sql(&[], "NC");
        assert!(!sql.contains("insert into"));
        assert!(sql.contains("begin;") && sql.contains("commit;"));
        assert!(sql.contains("-- Total NC venues: 0"));
    }
}
