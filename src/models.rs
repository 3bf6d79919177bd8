//! Core data models for venue seed tooling.
//!
//! A venue record is kept as its raw CSV column map so unknown columns
//! survive a clean/merge round trip. Logical fields are resolved through
//! `Field`, which knows the column aliases used by the different seed files.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// Blank Values
// ============================================================================

/// Placeholder values that mean "no data" in exported CSVs.
pub const BLANK_SENTINELS: [&str; 4] = ["", "null", "None", "undefined"];

/// True when the value is empty or one of the placeholder sentinels.
pub fn is_blank(value: &str) -> bool {
    let trimmed = value.trim();
    BLANK_SENTINELS.contains(&trimmed)
}

/// Returns the value unless it is blank.
pub fn clean_value(value: &str) -> Option<&str> {
    if is_blank(value) {
        None
    } else {
        Some(value)
    }
}

// ============================================================================
// Field Parsing
// ============================================================================

/// Result of parsing a typed value out of a CSV cell.
///
/// Parse failures never abort a run; they surface as `Invalid` so the caller
/// can keep its existing value and still report what happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldParse<T> {
    Value(T),
    Absent,
    Invalid { raw: String, reason: String },
}

impl<T> FieldParse<T> {
    pub fn value(self) -> Option<T> {
        match self {
            FieldParse::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, FieldParse::Invalid { .. })
    }
}

// ============================================================================
// Fields
// ============================================================================

/// Logical venue fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Name,
    Email,
    Phone,
    Website,
    Address,
    City,
    State,
    ZipCode,
    Country,
    Capacity,
    VenueType,
    MusicFocus,
    Description,
    InstagramHandle,
    FacebookUrl,
    IsVerified,
    PermanentlyClosed,
    Rejected,
}

impl Field {
    /// Column names for this field, preferred name first.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Field::Id => &["id"],
            Field::Name => &["name", "title"],
            Field::Email => &["email", "booking_email"],
            Field::Phone => &["phone"],
            Field::Website => &["website"],
            Field::Address => &["address"],
            Field::City => &["city"],
            Field::State => &["state"],
            Field::ZipCode => &["zip_code"],
            Field::Country => &["country"],
            Field::Capacity => &["capacity", "capacity_max"],
            Field::VenueType => &["venue_type"],
            Field::MusicFocus => &["music_focus"],
            Field::Description => &["description"],
            Field::InstagramHandle => &["instagram_handle"],
            Field::FacebookUrl => &["facebook_url"],
            Field::IsVerified => &["is_verified", "is_verified_music_venue"],
            Field::PermanentlyClosed => &["permanently_closed"],
            Field::Rejected => &["rejected"],
        }
    }

    /// Preferred column name.
    pub fn column(self) -> &'static str {
        self.columns()[0]
    }

    pub fn is_capacity_column(column: &str) -> bool {
        Field::Capacity.columns().contains(&column)
    }
}

/// Columns the merger never overwrites.
pub const IMMUTABLE_COLUMNS: [&str; 3] = ["id", "created_at", "updated_at"];

// ============================================================================
// Venue Record
// ============================================================================

/// One CSV row describing a venue.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VenueRecord {
    values: FxHashMap<String, String>,
}

impl VenueRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw cell value for an exact column name.
    pub fn raw(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.values.insert(column.into(), value.into());
    }

    /// Column actually holding `field` in this record, if any alias is present.
    pub fn column_for(&self, field: Field) -> Option<&'static str> {
        field
            .columns()
            .iter()
            .copied()
            .find(|c| self.values.contains_key(*c))
    }

    /// First non-blank value across the field's aliases.
    pub fn get(&self, field: Field) -> Option<&str> {
        field
            .columns()
            .iter()
            .filter_map(|c| self.values.get(*c))
            .find_map(|v| clean_value(v))
    }

    /// Writes `field` into the column already holding it, or the preferred column.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        let column = self.column_for(field).unwrap_or(field.column());
        self.set(column, value);
    }

    /// True when the field holds the literal "true" (case-insensitive).
    pub fn flag(&self, field: Field) -> bool {
        self.get(field)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn name(&self) -> &str {
        self.get(Field::Name).unwrap_or("")
    }

    pub fn city(&self) -> &str {
        self.get(Field::City).unwrap_or("")
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Header row plus records in file order.
#[derive(Clone, Debug, Default)]
pub struct VenueTable {
    pub headers: Vec<String>,
    pub records: Vec<VenueRecord>,
}

impl VenueTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Headers extended with any column a record gained after loading.
    pub fn output_headers(&self) -> Vec<String> {
        let mut headers = self.headers.clone();
        let mut extra: Vec<&str> = self
            .records
            .iter()
            .flat_map(|r| r.columns())
            .filter(|c| !headers.iter().any(|h| h == c))
            .collect();
        extra.sort_unstable();
        extra.dedup();
        headers.extend(extra.into_iter().map(str::to_string));
        headers
    }
}

// ============================================================================
// Discovered Venues
// ============================================================================

/// Venue object returned by the discovery model.
///
/// Every field is optional at the schema level, and JSON `null` reads as
/// absent; completeness is judged afterwards. Capacity may arrive as an
/// integer, a whole float (`500.0`) or a numeric string (`"500"`, `"1,200"`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredVenue {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_capacity")]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub venue_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub music_focus: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instagram_handle: Option<String>,
    #[serde(default)]
    pub facebook_url: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Capacity as the model tends to write it.
#[derive(Deserialize)]
#[serde(untagged)]
enum CapacityRepr {
    Int(i64),
    Float(f64),
    Text(String),
}

fn lenient_capacity<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let repr = match Option::<CapacityRepr>::deserialize(deserializer)? {
        Some(r) => r,
        None => return Ok(None),
    };
    let value = match repr {
        CapacityRepr::Int(n) => n,
        CapacityRepr::Float(f) if f.fract() == 0.0 && f.is_finite() => f as i64,
        CapacityRepr::Float(f) => return Err(D::Error::custom(format!("capacity {f} is not a whole number"))),
        CapacityRepr::Text(t) => {
            if is_blank(&t) {
                return Ok(None);
            }
            let digits: String = t.trim().chars().filter(|c| *c != ',').collect();
            digits
                .parse::<i64>()
                .map_err(|_| D::Error::custom(format!("capacity {t:?} is not a number")))?
        }
    };
    u32::try_from(value)
        .map(Some)
        .map_err(|_| D::Error::custom(format!("capacity {value} out of range")))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl DiscoveredVenue {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Missing-value count for one audited field.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MissingField {
    pub field: String,
    pub missing: usize,
    pub percent: f64,
}

/// Summary of a cleaning run, written with `--stats`.
#[derive(Default, Debug, Clone, Serialize)]
pub struct CleanStats {
    pub total_input: usize,
    pub name_city_groups: usize,
    pub email_groups: usize,
    pub cleaned: usize,
    pub removed: usize,
    pub merge_fallbacks: usize,
    pub missing: Vec<MissingField>,
    pub elapsed_seconds: f64,
}

impl CleanStats {
    pub fn duplicate_groups(&self) -> usize {
        self.name_city_groups + self.email_groups
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_sentinels() {
        for v in ["", "null", "None", "undefined", "  null "] {
            assert!(is_blank(v), "{v:?} should be blank");
        }
        assert!(!is_blank("0"));
        assert!(!is_blank("Nonesuch"));
    }

    #[test]
    fn test_field_aliases() {
        let rec = VenueRecord::from_pairs([
            ("title", "Motorco"),
            ("booking_email", "null"),
            ("capacity_max", "450"),
        ]);
        assert_eq!(rec.get(Field::Name), Some("Motorco"));
        assert_eq!(rec.get(Field::Email), None);
        assert_eq!(rec.get(Field::Capacity), Some("450"));
        assert_eq!(rec.column_for(Field::Capacity), Some("capacity_max"));
    }

    #[test]
    fn test_set_field_uses_existing_alias() {
        let mut rec = VenueRecord::from_pairs([("is_verified_music_venue", "false")]);
        rec.set_field(Field::IsVerified, "true");
        assert_eq!(rec.raw("is_verified_music_venue"), Some("true"));
        assert_eq!(rec.raw("is_verified"), None);

        let mut bare = VenueRecord::new();
        bare.set_field(Field::IsVerified, "true");
        assert_eq!(bare.raw("is_verified"), Some("true"));
    }

    #[test]
    fn test_output_headers_appends_new_columns() {
        let mut rec = VenueRecord::from_pairs([("name", "A")]);
        rec.set("is_verified", "true");
        let table = VenueTable {
            headers: vec!["name".to_string()],
            records: vec![rec],
        };
        assert_eq!(table.output_headers(), vec!["name", "is_verified"]);
    }

    #[test]
    fn test_discovered_venue_types_are_enforced() {
        let ok: Result<DiscoveredVenue, _> =
            serde_json::from_str(r#"{"name": "Cat's Cradle", "capacity": 750}"#);
        assert_eq!(ok.unwrap().capacity, Some(750));
        for bad in [r#""about 750""#, "750.5", "-20", r#"["750"]"#] {
            let json = format!(r#"{{"name": "Cat's Cradle", "capacity": {bad}}}"#);
            let parsed: Result<DiscoveredVenue, _> = serde_json::from_str(&json);
            assert!(parsed.is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_discovered_venue_lenient_numbers_and_nulls() {
        let cases = [
            ("500", Some(500)),
            ("500.0", Some(500)),
            (r#""500""#, Some(500)),
            (r#""1,200""#, Some(1200)),
            ("null", None),
            (r#""""#, None),
        ];
        for (raw, expected) in cases {
            let json = format!(r#"{{"name": "Motorco", "capacity": {raw}, "music_focus": null}}"#);
            let venue: DiscoveredVenue = serde_json::from_str(&json).unwrap();
            assert_eq!(venue.capacity, expected, "capacity {raw}");
            assert!(venue.music_focus.is_empty());
        }
        let venue: DiscoveredVenue = serde_json::from_str(r#"{"name": "Motorco"}"#).unwrap();
        assert_eq!(venue.capacity, None);
    }
}
