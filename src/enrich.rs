//! Enrichment for the seed SQL path.
//!
//! Well-known venues get curated descriptions and genre lists. Everything
//! else gets a templated description and venue-type default genres when the
//! CSV has fewer than two.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::models::{Field, FieldParse, VenueRecord};
use crate::normalize::{normalize_genres, parse_capacity, parse_genre_list};

// ============================================================================
// CURATED DATA
// ============================================================================

/// Curated descriptions keyed by exact venue name.
pub static ENRICHED_DESCRIPTIONS: Lazy<FxHashMap<&str, &str>> = Lazy::new(|| {
    let mut m = FxHashMap::default();
    m.insert(
        "The Pour House",
        "Iconic Raleigh music venue operating since 1993. Known for hosting both emerging and established artists across rock, indie, and alternative genres. Features a full bar, stage, and intimate atmosphere.",
    );
    m.insert(
        "Lincoln Theatre",
        "Historic theater in downtown Raleigh featuring diverse programming from concerts to comedy. Beautifully restored venue with excellent acoustics and classic architecture.",
    );
    m.insert(
        "Transfer Co Ballroom",
        "Stunning historic ballroom venue in downtown Raleigh. Features soaring ceilings, elegant architecture, and hosts concerts, weddings, and special events.",
    );
    m.insert(
        "Motorco",
        "Premier music hall in Durham featuring multiple spaces including a showroom, garage bar, and outdoor patio. Full bar and restaurant with diverse programming.",
    );
    m.insert(
        "The Orange Peel",
        "Legendary Asheville music venue that has hosted countless national acts. Known for its intimate setting and excellent sound quality.",
    );
    m.insert(
        "Neighborhood Theatre",
        "Mid-sized venue in Charlotte's NoDa arts district. Has been a staple of the Charlotte music scene for decades, hosting touring and local acts.",
    );
    m
});

/// Curated genre lists keyed by exact venue name.
pub static ENRICHED_MUSIC_FOCUS: Lazy<FxHashMap<&str, &[&str]>> = Lazy::new(|| {
    let mut m: FxHashMap<&str, &[&str]> = FxHashMap::default();
    m.insert("The Pour House", &["rock", "indie", "alternative", "punk", "original"]);
    m.insert("Lincoln Theatre", &["rock", "indie", "folk", "jazz", "original"]);
    m.insert("Transfer Co Ballroom", &["rock", "indie", "electronic", "original"]);
    m.insert("Motorco", &["rock", "indie", "alternative", "original"]);
    m.insert("The Orange Peel", &["rock", "indie", "alternative", "jam band", "original"]);
    m.insert("Neighborhood Theatre", &["rock", "indie", "metal", "punk", "original"]);
    m.insert("Asheville Music Hall", &["rock", "jam band", "bluegrass", "original"]);
    m.insert("Deep South the Bar", &["country", "southern rock", "americana", "covers"]);
    m.insert("The Kraken", &["metal", "punk", "hardcore", "rock", "original"]);
    m.insert("Slim's Downtown", &["blues", "rock", "jazz", "original"]);
    m.insert("Spillway 421", &["rock", "country", "blues", "covers"]);
    m
});

/// Default genres per venue type.
pub static VENUE_TYPE_DEFAULT_GENRES: Lazy<FxHashMap<&str, &[&str]>> = Lazy::new(|| {
    let mut m: FxHashMap<&str, &[&str]> = FxHashMap::default();
    m.insert("bar", &["rock", "blues", "country", "covers"]);
    m.insert("brewery", &["indie", "folk", "acoustic", "singer songwriter"]);
    m.insert("venue", &["rock", "indie", "alternative", "original"]);
    m.insert("theater", &["jazz", "blues", "folk", "original"]);
    m.insert("club", &["rock", "punk", "metal", "electronic"]);
    m.insert("amphitheater", &["rock", "country", "alternative"]);
    m.insert("winery", &["jazz", "acoustic", "folk"]);
    m.insert("restaurant", &["jazz", "acoustic", "covers"]);
    m
});

/// Venue types with their own defaults; unknown types borrow the bar list.
const FALLBACK_GENRE_TYPE: &str = "bar";

/// Genre lists shorter than this get venue-type defaults appended.
pub const MIN_GENRES: usize = 2;

// ============================================================================
// ENRICHED VENUE
// ============================================================================

/// Venue ready for the seed emitter. Text fields are unescaped.
#[derive(Clone, Debug, PartialEq)]
pub struct SeedVenue {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub city: String,
    pub state: String,
    pub description: String,
    pub capacity: Option<i64>,
    pub music_focus: Vec<String>,
    /// Lowercased raw type; the emitter applies its allow-list.
    pub venue_type: String,
    pub is_verified: bool,
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Description synthesized from venue type and location.
pub fn template_description(venue_type: &str, city: &str, state: &str) -> String {
    match venue_type {
        "brewery" => format!(
            "Craft brewery in {city}, {state} with live music and events. Great atmosphere with local beers and regular performances."
        ),
        "bar" => format!(
            "Live music bar in {city}, {state} featuring local and touring acts. Full bar and great atmosphere."
        ),
        "venue" => format!(
            "Music venue in {city}, {state} hosting concerts and live performances. Quality sound and production."
        ),
        "theater" => format!(
            "Theater in {city}, {state} featuring concerts, performing arts, and special events."
        ),
        other => {
            let label = if other.is_empty() {
                "Music venue".to_string()
            } else {
                title_case(&other.replace('_', " "))
            };
            format!("{label} in {city}, {state} featuring live music and entertainment.")
        }
    }
}

/// Append venue-type defaults to a short genre list, skipping ones already present.
pub fn apply_default_genres(genres: Vec<String>, venue_type: &str) -> Vec<String> {
    let mut genres = normalize_genres(genres);
    if genres.len() >= MIN_GENRES {
        return genres;
    }
    let defaults = VENUE_TYPE_DEFAULT_GENRES
        .get(venue_type)
        .or_else(|| VENUE_TYPE_DEFAULT_GENRES.get(FALLBACK_GENRE_TYPE))
        .copied()
        .unwrap_or(&["rock", "covers"]);
    for genre in defaults {
        if !genres.iter().any(|g| g.eq_ignore_ascii_case(genre)) {
            genres.push(genre.to_string());
        }
    }
    genres
}

/// Resolve description and genres for one CSV record.
pub fn enrich_record(record: &VenueRecord) -> SeedVenue {
    let name = record.name().to_string();
    let city = record.city().to_string();
    let state = record.get(Field::State).unwrap_or("").to_string();
    let venue_type = record
        .get(Field::VenueType)
        .map(|t| t.trim().to_lowercase())
        .unwrap_or_default();

    let description = match ENRICHED_DESCRIPTIONS.get(name.as_str()) {
        Some(curated) => curated.to_string(),
        None => match record.get(Field::Description) {
            Some(d) => d.to_string(),
            None => template_description(&venue_type, &city, &state),
        },
    };

    let music_focus = match ENRICHED_MUSIC_FOCUS.get(name.as_str()) {
        Some(curated) => normalize_genres(curated.iter()),
        None => {
            let parsed = match parse_genre_list(record.get(Field::MusicFocus).unwrap_or("")) {
                FieldParse::Value(genres) => genres,
                FieldParse::Absent => Vec::new(),
                FieldParse::Invalid { raw, reason } => {
                    warn!(venue = %name, raw = %raw, %reason, "Ignoring malformed music_focus");
                    Vec::new()
                }
            };
            let type_for_defaults = if venue_type.is_empty() { "other" } else { venue_type.as_str() };
            apply_default_genres(parsed, type_for_defaults)
        }
    };

    let capacity = match parse_capacity(record.get(Field::Capacity).unwrap_or("")) {
        FieldParse::Value(n) => Some(n),
        FieldParse::Absent => None,
        FieldParse::Invalid { raw, reason } => {
            warn!(venue = %name, raw = %raw, %reason, "Ignoring non-numeric capacity");
            None
        }
    };

    SeedVenue {
        id: record.get(Field::Id).unwrap_or("").to_string(),
        name,
        email: record.get(Field::Email).map(str::to_string),
        phone: record.get(Field::Phone).map(str::to_string),
        website: record.get(Field::Website).map(str::to_string),
        city,
        state,
        description,
        capacity,
        music_focus,
        venue_type,
        is_verified: record.flag(Field::IsVerified),
    }
}

/// Records for one state, minus closed or rejected ones, sorted by (city, name).
pub fn select_for_state<'a>(records: &'a [VenueRecord], state: &str) -> Vec<&'a VenueRecord> {
    let mut selected: Vec<&VenueRecord> = records
        .iter()
        .filter(|r| r.get(Field::State).map(|s| s.trim() == state).unwrap_or(false))
        .filter(|r| !r.flag(Field::PermanentlyClosed) && !r.flag(Field::Rejected))
        .collect();
    selected.sort_by(|a, b| (a.city(), a.name()).cmp(&(b.city(), b.name())));
    selected
}
