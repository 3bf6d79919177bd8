//! Output path checks so a run never overwrites its own input.
//!
//! Each tool writes files carrying a marker in the name ("cleaned", "seed",
//! "insert", "complete"). Anything else is refused.

use anyhow::{bail, Result};
use std::path::Path;

pub const CLEANED_MARKER: &str = "cleaned";
pub const SEED_MARKER: &str = "seed";
pub const INSERT_MARKER: &str = "insert";
pub const COMPLETE_MARKER: &str = "complete";

/// Validates that an output path is safe to overwrite.
///
/// Checks:
/// - Output filename must contain `required_marker` (case-insensitive)
/// - Output cannot be the same file as any of `source_paths`
pub fn validate_output_path(output: &Path, required_marker: &str, source_paths: &[&Path]) -> Result<()> {
    let output_name = output
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase();

    if !output_name.contains(&required_marker.to_lowercase()) {
        bail!(
            "Safety check failed: output file '{}' must contain '{}' in the name",
            output.display(),
            required_marker
        );
    }

    for source in source_paths {
        if same_file(output, source) {
            bail!(
                "Safety check failed: output '{}' cannot be the same as input '{}'",
                output.display(),
                source.display()
            );
        }
    }

    Ok(())
}

/// Path equality, resolving both sides when they exist.
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// `<stem>_cleaned.csv` next to the input.
pub fn default_cleaned_path(input: &Path) -> std::path::PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("venues");
    input.with_file_name(format!("{stem}_{CLEANED_MARKER}.csv"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_valid_cleaned_output() {
        let output = PathBuf::from("/tmp/nc_venues_cleaned.csv");
        let source = PathBuf::from("/data/nc_venues.csv");
        assert!(validate_output_path(&output, CLEANED_MARKER, &[&source]).is_ok());
    }

    #[test]
    fn test_marker_is_case_insensitive() {
        let output = PathBuf::from("/tmp/Richmond_Insert.sql");
        assert!(validate_output_path(&output, INSERT_MARKER, &[]).is_ok());
    }

    #[test]
    fn test_missing_marker() {
        let output = PathBuf::from("/tmp/venues.sql");
        let source = PathBuf::from("/data/venues.csv");
        let result = validate_output_path(&output, SEED_MARKER, &[&source]);
        assert!(result.unwrap_err().to_string().contains("must contain 'seed'"));
    }

    #[test]
    fn test_output_equals_source() {
        let path = PathBuf::from("/data/venues_cleaned.csv");
        let result = validate_output_path(&path, CLEANED_MARKER, &[&path]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot be the same as input"));
    }

    #[test]
    fn test_output_equals_source_through_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("venues_cleaned.csv");
        std::fs::write(&input, "name\n").unwrap();
        let sneaky = dir.path().join(".").join("venues_cleaned.csv");
        assert!(validate_output_path(&sneaky, CLEANED_MARKER, &[&input]).is_err());
    }

    #[test]
    fn test_default_cleaned_path() {
        assert_eq!(
            default_cleaned_path(Path::new("/data/nc_venues.csv")),
            PathBuf::from("/data/nc_venues_cleaned.csv")
        );
    }
}
