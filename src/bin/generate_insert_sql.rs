//! Generate per-venue INSERT ... ON CONFLICT (email) statements from a CSV,
//! e.g. the output of discover-venues.
//!
//! Usage: generate-insert-sql <richmond_venues_complete.csv> --output richmond_insert.sql

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use venue_seeds::csv_io::load_table;
use venue_seeds::insert_sql::{group_by_city, is_insertable, render_insert_sql, InsertScript};
use venue_seeds::progress::init_tracing;
use venue_seeds::safety::{validate_output_path, INSERT_MARKER};

#[derive(Parser)]
#[command(name = "generate-insert-sql")]
#[command(about = "Generate per-venue upsert SQL keyed on email")]
struct Args {
    /// Venue CSV
    input: PathBuf,

    /// Write SQL here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Heading comment for the script
    #[arg(long, default_value = "Venues Insert Script")]
    title: String,

    /// Restrict the trailing verification query to one state
    #[arg(long)]
    verify_state: Option<String>,

    /// Only print errors
    #[arg(long, short)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(if args.quiet { "error" } else { "info" });

    if let Some(output) = &args.output {
        validate_output_path(output, INSERT_MARKER, &[args.input.as_path()])?;
    }

    let table = load_table(&args.input)?;
    info!(venues = table.len(), "Loaded venues");

    let script = InsertScript {
        title: args.title.clone(),
        verify_state: args.verify_state.as_ref().map(|s| s.trim().to_uppercase()),
    };
    let sql = render_insert_sql(&table.records, &script);
    let insertable = table.records.iter().filter(|r| is_insertable(r)).count();

    match &args.output {
        Some(path) => {
            std::fs::write(path, &sql).with_context(|| format!("Failed to write {}", path.display()))?;
            if !args.quiet {
                eprintln!("Wrote {} statements to {:?}", insertable, path);
            }
        }
        None => print!("{sql}"),
    }

    if !args.quiet {
        for (city, venues) in group_by_city(table.records.iter().filter(|r| is_insertable(r))) {
            eprintln!("  {city}: {} venues", venues.len());
        }
    }

    Ok(())
}
