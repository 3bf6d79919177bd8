//! Venue discovery through the Messages API with web search.
//!
//! The model is asked for a bare JSON array of venue objects. The answer is
//! parsed strictly: a text block either is such an array or it is ignored.
//! Venues missing any required contact field are set aside, not written.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::anthropic::{AnthropicClient, Message, MessageRequest, MessageResponse, ToolSpec};
use crate::error::DiscoveryError;
use crate::models::{is_blank, DiscoveredVenue, Field, VenueTable};
use crate::normalize::name_city_key;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_MAX_TOKENS: u32 = 16000;
pub const DEFAULT_LIMIT: usize = 50;

/// Fields a discovered venue must carry to be written out.
pub const REQUIRED_FIELDS: [&str; 7] = ["name", "email", "phone", "website", "address", "zip_code", "capacity"];

/// Column order of the discovery CSV.
pub const CSV_HEADERS: [&str; 15] = [
    "name",
    "email",
    "phone",
    "website",
    "address",
    "city",
    "state",
    "zip_code",
    "capacity",
    "venue_type",
    "music_focus",
    "description",
    "instagram_handle",
    "facebook_url",
    "confidence",
];

// ============================================================================
// Prompt
// ============================================================================

/// Build the discovery prompt. Known venue names are listed for exclusion.
pub fn build_prompt(city: &str, state: &str, limit: usize, exclude: &[String]) -> String {
    let mut prompt = format!(
        "You are a venue discovery assistant. Find live music venues in {city}, {state}.

**Task:**
Find {limit} music venues that host live performances (bands, artists, DJs, etc.) in {city}, {state}.

**Venue Types to Find:**
- Music clubs
- Bars with live music
- Concert halls
- Theaters
- Amphitheaters
- Breweries with live music
- Restaurants with live music stages
- Music festivals (recurring)

**Exclude:**
- Sports stadiums (unless they regularly host concerts)
- Movie theaters
- General event spaces without regular music programming
"
    );

    if !exclude.is_empty() {
        prompt.push_str("- These venues, which we already have:\n");
        for name in exclude {
            prompt.push_str(&format!("  - {name}\n"));
        }
    }

    prompt.push_str(&format!(
        "
**Required Information for Each Venue (COMPLETE DATA):**
- Name (required)
- Email (booking/contact email - REQUIRED)
- Phone (REQUIRED)
- Website (REQUIRED)
- Address (street address with zip code - REQUIRED)
- Capacity (approximate if not exact - REQUIRED, as an integer)
- Venue type (bar, club, theater, amphitheater, brewery, restaurant, etc.)
- Music genres they feature
- Brief description
- Social media (Instagram, Facebook if available)

**IMPORTANT:** Only include venues where you can find COMPLETE contact information (email, phone, website, full address with zip code). Skip venues with incomplete data.

**Return Format:**
Return a JSON array of venue objects and nothing else. No markdown fences, no commentary before or after the array.

Example:
[
  {{
    \"name\": \"The Music Hall\",
    \"email\": \"booking@musichall.com\",
    \"phone\": \"(555) 123-4567\",
    \"website\": \"https://musichall.com\",
    \"address\": \"123 Main St\",
    \"city\": \"{city}\",
    \"state\": \"{state}\",
    \"zip_code\": \"23220\",
    \"capacity\": 500,
    \"venue_type\": \"club\",
    \"music_focus\": [\"rock\", \"indie\", \"alternative\"],
    \"description\": \"Live music venue featuring local and touring artists.\",
    \"instagram_handle\": \"@musichall\",
    \"facebook_url\": \"https://facebook.com/musichall\",
    \"confidence\": 95
  }}
]

Aim for {limit} venues with complete data."
    ));
    prompt
}

pub fn discovery_request(model: &str, max_tokens: u32, prompt: String) -> MessageRequest {
    MessageRequest {
        model: model.to_string(),
        max_tokens,
        messages: vec![Message::user(prompt)],
        tools: vec![ToolSpec::web_search()],
    }
}

// ============================================================================
// Response Parsing
// ============================================================================

/// Outcome of reading venues out of a model response.
#[derive(Clone, Debug, PartialEq)]
pub enum DiscoveryPayload {
    /// The array parsed. Elements that did not fit the venue schema are
    /// `rejected`, each with its reason.
    Venues {
        venues: Vec<DiscoveredVenue>,
        rejected: Vec<IncompleteVenue>,
    },
    Empty { reason: String },
}

impl DiscoveryPayload {
    pub fn into_venues(self) -> Vec<DiscoveredVenue> {
        match self {
            DiscoveryPayload::Venues { venues, .. } => venues,
            DiscoveryPayload::Empty { .. } => Vec::new(),
        }
    }
}

/// Parse one text block. It must be exactly a JSON array (surrounding
/// whitespace aside); each element is then checked against the venue schema
/// on its own, so one malformed venue only rejects itself.
pub fn parse_venue_block(
    text: &str,
) -> std::result::Result<(Vec<DiscoveredVenue>, Vec<IncompleteVenue>), serde_json::Error> {
    let elements: Vec<serde_json::Value> = serde_json::from_str(text.trim())?;
    let mut venues = Vec::with_capacity(elements.len());
    let mut rejected = Vec::new();
    for element in elements {
        let name = element
            .get("name")
            .and_then(|n| n.as_str())
            .filter(|n| !is_blank(n))
            .unwrap_or("Unknown")
            .to_string();
        match serde_json::from_value::<DiscoveredVenue>(element) {
            Ok(venue) => venues.push(venue),
            Err(e) => {
                tracing::debug!(venue = %name, error = %e, "Venue does not fit the schema");
                rejected.push(IncompleteVenue {
                    name,
                    missing: Vec::new(),
                    reason: Some(e.to_string()),
                });
            }
        }
    }
    Ok((venues, rejected))
}

/// First text block that is exactly a JSON array wins.
pub fn parse_venue_payload<'a, I>(blocks: I) -> DiscoveryPayload
where
    I: IntoIterator<Item = &'a str>,
{
    let mut last_error: Option<String> = None;
    for text in blocks {
        match parse_venue_block(text) {
            Ok((venues, rejected)) => return DiscoveryPayload::Venues { venues, rejected },
            Err(e) => {
                let preview: String = text.chars().take(200).collect();
                tracing::debug!(error = %e, preview = %preview, "Text block is not a venue array");
                last_error = Some(e.to_string());
            }
        }
    }
    let reason = match last_error {
        Some(e) => format!("no text block was a venue array: {e}"),
        None => "response had no text blocks".to_string(),
    };
    DiscoveryPayload::Empty { reason }
}

pub fn payload_from_response(response: &MessageResponse) -> DiscoveryPayload {
    parse_venue_payload(response.text_blocks())
}

// ============================================================================
// Completeness
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IncompleteVenue {
    pub name: String,
    pub missing: Vec<&'static str>,
    /// Why the entry could not be read at all, for schema failures.
    pub reason: Option<String>,
}

fn text_missing(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, is_blank)
}

/// Names of required fields this venue lacks. A zero capacity counts as missing.
pub fn missing_required(venue: &DiscoveredVenue) -> Vec<&'static str> {
    REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| match *field {
            "name" => text_missing(&venue.name),
            "email" => text_missing(&venue.email),
            "phone" => text_missing(&venue.phone),
            "website" => text_missing(&venue.website),
            "address" => text_missing(&venue.address),
            "zip_code" => text_missing(&venue.zip_code),
            "capacity" => venue.capacity.map_or(true, |c| c == 0),
            _ => false,
        })
        .collect()
}

/// Split into complete venues and incomplete ones with their gaps.
pub fn partition_complete(venues: Vec<DiscoveredVenue>) -> (Vec<DiscoveredVenue>, Vec<IncompleteVenue>) {
    let mut complete = Vec::new();
    let mut incomplete = Vec::new();
    for venue in venues {
        let missing = missing_required(&venue);
        if missing.is_empty() {
            complete.push(venue);
        } else {
            incomplete.push(IncompleteVenue {
                name: venue.display_name().to_string(),
                missing,
                reason: None,
            });
        }
    }
    (complete, incomplete)
}

// ============================================================================
// Exclusion
// ============================================================================

/// Names of venues already on file for this city and state.
pub fn existing_names(table: &VenueTable, city: &str, state: &str) -> Vec<String> {
    let mut seen = FxHashSet::default();
    let mut names = Vec::new();
    for record in &table.records {
        let same_city = record.get(Field::City).is_some_and(|c| c.trim().eq_ignore_ascii_case(city.trim()));
        let same_state = record
            .get(Field::State)
            .map_or(true, |s| s.trim().eq_ignore_ascii_case(state.trim()));
        if !(same_city && same_state) {
            continue;
        }
        if let Some(name) = record.get(Field::Name) {
            if seen.insert(name.trim().to_string()) {
                names.push(name.trim().to_string());
            }
        }
    }
    names
}

/// Drop discovered venues whose name/city key matches a known venue.
/// Returns the kept venues and how many were dropped.
pub fn exclude_known(venues: Vec<DiscoveredVenue>, known: &[String], city: &str) -> (Vec<DiscoveredVenue>, usize) {
    let keys: FxHashSet<String> = known.iter().filter_map(|n| name_city_key(n, city)).collect();
    if keys.is_empty() {
        return (venues, 0);
    }
    let before = venues.len();
    let kept: Vec<DiscoveredVenue> = venues
        .into_iter()
        .filter(|v| {
            let venue_city = v.city.as_deref().filter(|c| !is_blank(c)).unwrap_or(city);
            match name_city_key(v.display_name(), venue_city) {
                Some(key) => !keys.contains(&key),
                None => true,
            }
        })
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

// ============================================================================
// Output
// ============================================================================

/// `<city>_venues_complete.{json,csv}` under `dir`.
pub fn output_paths(dir: &Path, city: &str) -> (PathBuf, PathBuf) {
    let stem: String = city
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    (
        dir.join(format!("{stem}_venues_complete.json")),
        dir.join(format!("{stem}_venues_complete.csv")),
    )
}

pub fn write_json(path: &Path, venues: &[DiscoveredVenue]) -> Result<()> {
    let json = serde_json::to_string_pretty(venues)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

fn csv_row(venue: &DiscoveredVenue) -> Result<Vec<String>> {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    Ok(vec![
        text(&venue.name),
        text(&venue.email),
        text(&venue.phone),
        text(&venue.website),
        text(&venue.address),
        text(&venue.city),
        text(&venue.state),
        text(&venue.zip_code),
        venue.capacity.map(|c| c.to_string()).unwrap_or_default(),
        text(&venue.venue_type),
        serde_json::to_string(&venue.music_focus)?,
        text(&venue.description),
        text(&venue.instagram_handle),
        text(&venue.facebook_url),
        venue.confidence.map(|c| c.to_string()).unwrap_or_default(),
    ])
}

/// Write venues as CSV; genre lists become JSON strings.
pub fn write_csv_to<W: Write>(writer: W, venues: &[DiscoveredVenue]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADERS)?;
    for venue in venues {
        wtr.write_record(csv_row(venue)?)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_csv(path: &Path, venues: &[DiscoveredVenue]) -> Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_csv_to(file, venues).with_context(|| format!("Failed to write {}", path.display()))
}

// ============================================================================
// Summary
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DiscoverySummary {
    pub discovered: usize,
    pub excluded: usize,
    pub complete: usize,
    pub incomplete: usize,
    /// Mean confidence over complete venues, missing confidence counted as 0.
    pub average_confidence: Option<f64>,
    /// (venue_type, count), most common first.
    pub venue_types: Vec<(String, usize)>,
}

impl DiscoverySummary {
    pub fn new(discovered: usize, excluded: usize, complete: &[DiscoveredVenue], incomplete: &[IncompleteVenue]) -> Self {
        let average_confidence = if complete.is_empty() {
            None
        } else {
            let total: f64 = complete.iter().map(|v| v.confidence.unwrap_or(0.0)).sum();
            Some(total / complete.len() as f64)
        };

        let mut counts: FxHashMap<String, usize> = FxHashMap::default();
        for venue in complete {
            let kind = venue
                .venue_type
                .as_deref()
                .filter(|t| !is_blank(t))
                .unwrap_or("unknown")
                .to_string();
            *counts.entry(kind).or_default() += 1;
        }
        let mut venue_types: Vec<(String, usize)> = counts.into_iter().collect();
        venue_types.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Self {
            discovered,
            excluded,
            complete: complete.len(),
            incomplete: incomplete.len(),
            average_confidence,
            venue_types,
        }
    }
}

// ============================================================================
// Driver
// ============================================================================

#[derive(Clone, Debug)]
pub struct DiscoveryRequest {
    pub city: String,
    pub state: String,
    pub limit: usize,
    pub model: String,
    pub max_tokens: u32,
    pub exclude: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct DiscoveryOutcome {
    pub complete: Vec<DiscoveredVenue>,
    pub incomplete: Vec<IncompleteVenue>,
    pub summary: DiscoverySummary,
    /// Set when the response held no usable venue array.
    pub empty_reason: Option<String>,
}

/// One discovery call: prompt, parse, exclude known venues, split by completeness.
pub async fn discover(
    client: &AnthropicClient,
    request: &DiscoveryRequest,
) -> std::result::Result<DiscoveryOutcome, DiscoveryError> {
    let prompt = build_prompt(&request.city, &request.state, request.limit, &request.exclude);
    let response = client
        .create_message(&discovery_request(&request.model, request.max_tokens, prompt))
        .await?;

    let (venues, rejected, empty_reason) = match payload_from_response(&response) {
        DiscoveryPayload::Venues { venues, rejected } => (venues, rejected, None),
        DiscoveryPayload::Empty { reason } => {
            tracing::warn!(%reason, "No venues parsed from response");
            (Vec::new(), Vec::new(), Some(reason))
        }
    };
    if !rejected.is_empty() {
        tracing::warn!(rejected = rejected.len(), "Venues did not fit the schema");
    }

    let discovered = venues.len() + rejected.len();
    let (venues, excluded) = exclude_known(venues, &request.exclude, &request.city);
    if excluded > 0 {
        tracing::info!(excluded, "Dropped venues already on file");
    }
    let (complete, mut incomplete) = partition_complete(venues);
    incomplete.extend(rejected);
    let summary = DiscoverySummary::new(discovered, excluded, &complete, &incomplete);

    Ok(DiscoveryOutcome {
        complete,
        incomplete,
        summary,
        empty_reason,
    })
}
