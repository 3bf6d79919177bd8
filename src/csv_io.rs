//! CSV loading and writing for venue tables.

use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::models::{VenueRecord, VenueTable};

/// Read a venue table from any reader. The first row is the header.
pub fn read_table<R: Read>(reader: R) -> Result<VenueTable> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut records = Vec::new();
    for (line, row) in rdr.records().enumerate() {
        let row = row.with_context(|| format!("Malformed CSV row {}", line + 2))?;
        // Short rows get blanks, like a DictReader would
        let record = VenueRecord::from_pairs(
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.clone(), row.get(i).unwrap_or("").to_string())),
        );
        records.push(record);
    }

    Ok(VenueTable { headers, records })
}

/// Load a venue CSV from disk.
pub fn load_table(path: &Path) -> Result<VenueTable> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open venue CSV {}", path.display()))?;
    read_table(file).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write a venue table, keeping the input column order.
pub fn write_table<W: Write>(writer: W, table: &VenueTable) -> Result<()> {
    let headers = table.output_headers();
    let mut wtr = csv::Writer::from_writer(writer);
    if table.is_empty() {
        wtr.flush()?;
        return Ok(());
    }
    wtr.write_record(&headers)?;
    for record in &table.records {
        wtr.write_record(headers.iter().map(|h| record.raw(h).unwrap_or("")))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save a venue table to disk.
pub fn save_table(path: &Path, table: &VenueTable) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_table(file, table).with_context(|| format!("Failed to write {}", path.display()))
}
