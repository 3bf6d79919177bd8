//! Duplicate detection and removal for venue tables.
//!
//! Two records describe the same venue when they share a name+city key
//! (see `normalize::name_city_key`) or an email key. Detection is read-only;
//! `deduplicate` folds later duplicates into the first record seen.

use rustc_hash::FxHashMap;

use crate::merge::{merge_records, MergeFallback};
use crate::models::{Field, MissingField, VenueRecord};
use crate::normalize::{email_key, name_city_key};

/// Fields reported by the missing-data audit.
pub const AUDITED_FIELDS: [Field; 6] = [
    Field::Email,
    Field::Phone,
    Field::Website,
    Field::Address,
    Field::ZipCode,
    Field::Capacity,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DuplicateKind {
    NameCity,
    Email,
}

impl DuplicateKind {
    pub fn label(self) -> &'static str {
        match self {
            DuplicateKind::NameCity => "name_city",
            DuplicateKind::Email => "email",
        }
    }
}

/// Records sharing one dedup key. `members` are indices into the input slice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DuplicateCluster {
    pub kind: DuplicateKind,
    pub key: String,
    pub members: Vec<usize>,
}

/// Keys for one record.
fn record_keys(record: &VenueRecord) -> (Option<String>, Option<String>) {
    let name_city = name_city_key(record.name(), record.city());
    let email = record.get(Field::Email).and_then(email_key);
    (name_city, email)
}

/// Groups indices by key, remembering first-seen key order.
#[derive(Default)]
struct KeyGroups {
    order: Vec<String>,
    groups: FxHashMap<String, Vec<usize>>,
}

impl KeyGroups {
    fn push(&mut self, key: String, idx: usize) {
        if let Some(members) = self.groups.get_mut(&key) {
            members.push(idx);
        } else {
            self.order.push(key.clone());
            self.groups.insert(key, vec![idx]);
        }
    }

    fn into_clusters(mut self, kind: DuplicateKind) -> Vec<DuplicateCluster> {
        self.order
            .into_iter()
            .filter_map(|key| {
                let members = self.groups.remove(&key)?;
                (members.len() > 1).then_some(DuplicateCluster { kind, key, members })
            })
            .collect()
    }
}

/// Find duplicate clusters by name+city, then by email.
pub fn find_duplicates(records: &[VenueRecord]) -> Vec<DuplicateCluster> {
    let mut by_name_city = KeyGroups::default();
    let mut by_email = KeyGroups::default();

    for (idx, record) in records.iter().enumerate() {
        let (name_city, email) = record_keys(record);
        if let Some(key) = name_city {
            by_name_city.push(key, idx);
        }
        if let Some(key) = email {
            by_email.push(key, idx);
        }
    }

    let mut clusters = by_name_city.into_clusters(DuplicateKind::NameCity);
    clusters.extend(by_email.into_clusters(DuplicateKind::Email));
    clusters
}

/// Count blank values for each audited field, most-missing first.
pub fn analyze_missing_data(records: &[VenueRecord]) -> Vec<MissingField> {
    let total = records.len();
    let mut report: Vec<MissingField> = AUDITED_FIELDS
        .iter()
        .filter_map(|&field| {
            let missing = records
                .iter()
                .filter(|r| r.get(field).is_none())
                .count();
            if missing == 0 {
                return None;
            }
            Some(MissingField {
                field: field.column().to_string(),
                missing,
                percent: 100.0 * missing as f64 / total as f64,
            })
        })
        .collect();
    // stable sort keeps audit order on ties
    report.sort_by(|a, b| b.missing.cmp(&a.missing));
    report
}

/// Result of a deduplication pass.
#[derive(Clone, Debug, Default)]
pub struct DedupOutcome {
    /// Surviving records in first-seen order, merged with their duplicates.
    pub records: Vec<VenueRecord>,
    /// Records folded into a survivor, in the order they were folded.
    pub removed: Vec<VenueRecord>,
    pub fallbacks: Vec<MergeFallback>,
}

/// Key maps for `deduplicate`, each pointing at a slot index.
#[derive(Default)]
struct KeyIndex {
    name_city: FxHashMap<String, usize>,
    email: FxHashMap<String, usize>,
}

impl KeyIndex {
    fn lookup(&self, name_city: Option<&String>, email: Option<&String>) -> Option<usize> {
        name_city
            .and_then(|k| self.name_city.get(k))
            .or_else(|| email.and_then(|k| self.email.get(k)))
            .copied()
    }

    /// Register keys for `idx` where no other slot holds them yet.
    fn claim(&mut self, name_city: Option<String>, email: Option<String>, idx: usize) {
        if let Some(key) = name_city {
            self.name_city.entry(key).or_insert(idx);
        }
        if let Some(key) = email {
            self.email.entry(key).or_insert(idx);
        }
    }

    /// Point every key held by `from` at `to`.
    fn repoint(&mut self, from: usize, to: usize) {
        for slot in self.name_city.values_mut().chain(self.email.values_mut()) {
            if *slot == from {
                *slot = to;
            }
        }
    }

    /// A different slot already holding one of these keys.
    fn conflict(&self, name_city: Option<&String>, email: Option<&String>, idx: usize) -> Option<usize> {
        let owner = |map: &FxHashMap<String, usize>, key: Option<&String>| {
            key.and_then(|k| map.get(k)).copied().filter(|&j| j != idx)
        };
        owner(&self.name_city, name_city).or_else(|| owner(&self.email, email))
    }
}

/// Remove duplicates, merging each into the first record with a shared key.
///
/// A merge can fill a blank email or city with a key another survivor
/// already owns; that survivor is folded in too, so no two survivors ever
/// share a key. Every survivor is marked verified afterwards.
pub fn deduplicate(records: Vec<VenueRecord>) -> DedupOutcome {
    let mut slots: Vec<Option<VenueRecord>> = Vec::with_capacity(records.len());
    let mut keys = KeyIndex::default();
    let mut removed = Vec::new();
    let mut fallbacks = Vec::new();

    for record in records {
        let (name_city, email) = record_keys(&record);

        match keys.lookup(name_city.as_ref(), email.as_ref()) {
            Some(idx) => {
                if let Some(survivor) = slots[idx].as_mut() {
                    let result = merge_records(survivor, &record);
                    *survivor = result.record;
                    fallbacks.extend(result.fallbacks);
                }
                removed.push(record);
                keys.claim(name_city, email, idx);
                settle_keys(&mut slots, &mut keys, &mut removed, &mut fallbacks, idx);
            }
            None => {
                let idx = slots.len();
                slots.push(Some(record));
                keys.claim(name_city, email, idx);
            }
        }
    }

    let mut records: Vec<VenueRecord> = slots.into_iter().flatten().collect();
    for record in &mut records {
        record.set_field(Field::IsVerified, "true");
    }

    DedupOutcome {
        records,
        removed,
        fallbacks,
    }
}

/// Re-check the keys of a freshly merged survivor. While one of them belongs
/// to another survivor, fold the later of the two into the earlier.
fn settle_keys(
    slots: &mut [Option<VenueRecord>],
    keys: &mut KeyIndex,
    removed: &mut Vec<VenueRecord>,
    fallbacks: &mut Vec<MergeFallback>,
    mut idx: usize,
) {
    loop {
        let Some(survivor) = slots[idx].as_ref() else {
            return;
        };
        let (name_city, email) = record_keys(survivor);
        let Some(other) = keys.conflict(name_city.as_ref(), email.as_ref(), idx) else {
            keys.claim(name_city, email, idx);
            return;
        };

        let (keep, fold) = if other < idx { (other, idx) } else { (idx, other) };
        let (Some(folded), Some(kept)) = (slots[fold].take(), slots[keep].as_ref()) else {
            return;
        };
        let result = merge_records(kept, &folded);
        slots[keep] = Some(result.record);
        fallbacks.extend(result.fallbacks);
        removed.push(folded);
        keys.repoint(fold, keep);
        idx = keep;
    }
}

/// True when every survivor has distinct non-blank keys.
pub fn keys_are_unique(records: &[VenueRecord]) -> bool {
    find_duplicates(records).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venue(pairs: &[(&str, &str)]) -> VenueRecord {
        VenueRecord::from_pairs(pairs.iter().copied())
    }

    fn pour_house_rows() -> Vec<VenueRecord> {
        vec![
            venue(&[
                ("name", "The Pour House"),
                ("email", "booking@pourhouseraleigh.com"),
                ("phone", ""),
                ("website", "https://pourhouseraleigh.com"),
                ("city", "Raleigh"),
                ("state", "NC"),
                ("capacity", "300"),
                ("music_focus", r#"["rock", "indie"]"#),
                ("is_verified", "false"),
            ]),
            venue(&[
                ("name", "Pour House Raleigh"),
                ("email", "booking@pourhouseraleigh.com"),
                ("phone", "919-821-1120"),
                ("website", "https://pourhouseraleigh.com"),
                ("city", "Raleigh"),
                ("state", "NC"),
                ("capacity", "300"),
                ("music_focus", r#"["rock", "indie"]"#),
                ("is_verified", "false"),
            ]),
        ]
    }

    #[test]
    fn test_pour_house_end_to_end() {
        let outcome = deduplicate(pour_house_rows());
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.removed.len(), 1);
        let merged = &outcome.records[0];
        assert_eq!(merged.raw("name"), Some("The Pour House"));
        assert_eq!(merged.raw("phone"), Some("919-821-1120"));
        assert_eq!(merged.raw("website"), Some("https://pourhouseraleigh.com"));
        assert_eq!(merged.raw("music_focus"), Some(r#"["indie","rock"]"#));
        assert_eq!(merged.raw("is_verified"), Some("true"));
    }

    #[test]
    fn test_pour_house_matches_by_name_without_email() {
        let mut rows = pour_house_rows();
        rows[1].set("email", "");
        let outcome = deduplicate(rows);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].raw("phone"), Some("919-821-1120"));
    }

    #[test]
    fn test_email_match_across_names() {
        let rows = vec![
            venue(&[("name", "Cat's Cradle"), ("city", "Carrboro"), ("email", "Info@CatsCradle.com")]),
            venue(&[("name", "Cats Cradle Back Room"), ("city", "Carrboro"), ("email", "info@catscradle.com"), ("zip_code", "27510")]),
        ];
        let outcome = deduplicate(rows);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].raw("zip_code"), Some("27510"));
    }

    #[test]
    fn test_chain_through_merged_keys() {
        // Third row shares only the email of the second, which was merged into the first.
        let rows = vec![
            venue(&[("name", "Motorco"), ("city", "Durham"), ("email", "")]),
            venue(&[("name", "Motorco Music Hall"), ("city", "Durham"), ("email", "shows@motorco.com")]),
            venue(&[("name", "Motorco Showroom"), ("city", "Durham"), ("email", "shows@motorco.com"), ("phone", "919-901-0875")]),
        ];
        let outcome = deduplicate(rows);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.removed.len(), 2);
        assert_eq!(outcome.records[0].raw("email"), Some("shows@motorco.com"));
        assert_eq!(outcome.records[0].raw("phone"), Some("919-901-0875"));
    }

    #[test]
    fn test_filled_email_joins_other_survivor() {
        // Row 2 matches row 0 by name and brings row 1's email along.
        let rows = vec![
            venue(&[("name", "Motorco"), ("city", "Durham"), ("email", "")]),
            venue(&[("name", "Kings"), ("city", "Raleigh"), ("email", "shows@x.com"), ("phone", "919-833-0090")]),
            venue(&[("name", "Motorco Music Hall"), ("city", "Durham"), ("email", "shows@x.com")]),
        ];
        let outcome = deduplicate(rows);
        assert!(keys_are_unique(&outcome.records));
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.removed.len(), 2);
        let survivor = &outcome.records[0];
        assert_eq!(survivor.raw("name"), Some("Motorco"));
        assert_eq!(survivor.raw("email"), Some("shows@x.com"));
        assert_eq!(survivor.raw("phone"), Some("919-833-0090"));

        // Keys of the folded survivor now lead to the kept one.
        let mut rows = vec![
            venue(&[("name", "Motorco"), ("city", "Durham"), ("email", "")]),
            venue(&[("name", "Kings"), ("city", "Raleigh"), ("email", "shows@x.com")]),
            venue(&[("name", "Motorco Music Hall"), ("city", "Durham"), ("email", "shows@x.com")]),
        ];
        rows.push(venue(&[("name", "Kings"), ("city", "Raleigh"), ("zip_code", "27601")]));
        let outcome = deduplicate(rows);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].raw("zip_code"), Some("27601"));
    }

    #[test]
    fn test_filled_city_joins_other_survivor() {
        let rows = vec![
            venue(&[("name", "The Kraken"), ("email", "a@kraken.com")]),
            venue(&[("name", "Kraken"), ("city", "Chapel Hill"), ("phone", "919-929-0000")]),
            venue(&[("name", "Kraken Bar"), ("city", "Chapel Hill"), ("email", "a@kraken.com")]),
        ];
        let outcome = deduplicate(rows);
        assert_eq!(outcome.records.len(), 1);
        assert!(keys_are_unique(&outcome.records));
        assert_eq!(outcome.records[0].raw("phone"), Some("919-929-0000"));
    }

    #[test]
    fn test_order_preserved_and_distinct_kept() {
        let rows = vec![
            venue(&[("name", "Lincoln Theatre"), ("city", "Raleigh")]),
            venue(&[("name", "The Orange Peel"), ("city", "Asheville")]),
            venue(&[("name", "Lincoln Theater"), ("city", "Raleigh"), ("phone", "919-821-4111")]),
            venue(&[("name", "Lincoln Theatre"), ("city", "Lincoln")]),
        ];
        let outcome = deduplicate(rows);
        let names: Vec<&str> = outcome.records.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["Lincoln Theatre", "The Orange Peel", "Lincoln Theatre"]);
        assert_eq!(outcome.records[0].raw("phone"), Some("919-821-4111"));
        assert!(keys_are_unique(&outcome.records));
    }

    #[test]
    fn test_all_survivors_verified() {
        let rows = vec![
            venue(&[("name", "A"), ("city", "X"), ("is_verified_music_venue", "false")]),
            venue(&[("name", "B"), ("city", "X")]),
        ];
        let outcome = deduplicate(rows);
        assert_eq!(outcome.records[0].raw("is_verified_music_venue"), Some("true"));
        assert_eq!(outcome.records[1].raw("is_verified"), Some("true"));
    }

    #[test]
    fn test_fallbacks_collected() {
        let rows = vec![
            venue(&[("name", "Kraken"), ("city", "Chapel Hill"), ("capacity", "200")]),
            venue(&[("name", "The Kraken"), ("city", "Chapel Hill"), ("capacity", "lots")]),
        ];
        let outcome = deduplicate(rows);
        assert_eq!(outcome.records[0].raw("capacity"), Some("200"));
        assert_eq!(outcome.fallbacks.len(), 1);
    }

    #[test]
    fn test_find_duplicates_clusters() {
        let rows = vec![
            venue(&[("name", "The Pour House"), ("city", "Raleigh"), ("email", "a@x.com")]),
            venue(&[("name", "Pour House"), ("city", "raleigh"), ("email", "b@x.com")]),
            venue(&[("name", "Motorco"), ("city", "Durham"), ("email", "A@x.com")]),
            venue(&[("name", "Solo"), ("city", "Durham"), ("email", "null")]),
        ];
        let clusters = find_duplicates(&rows);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].kind, DuplicateKind::NameCity);
        assert_eq!(clusters[0].key, "pour house|raleigh");
        assert_eq!(clusters[0].members, vec![0, 1]);
        assert_eq!(clusters[1].kind, DuplicateKind::Email);
        assert_eq!(clusters[1].members, vec![0, 2]);
        // read-only
        assert_eq!(rows[1].raw("name"), Some("Pour House"));
    }

    #[test]
    fn test_analyze_missing_data() {
        let rows = vec![
            venue(&[("email", "a@x.com"), ("phone", ""), ("capacity", "null")]),
            venue(&[("email", ""), ("phone", ""), ("capacity", "100")]),
        ];
        let report = analyze_missing_data(&rows);
        assert_eq!(report[0].field, "phone");
        assert_eq!(report[0].missing, 2);
        assert_eq!(report[0].percent, 100.0);
        let email = report.iter().find(|m| m.field == "email").unwrap();
        assert_eq!(email.missing, 1);
        assert_eq!(email.percent, 50.0);
    }

    #[test]
    fn test_analyze_missing_data_empty_input() {
        assert!(analyze_missing_data(&[]).is_empty());
    }
}
