//! Generate the enriched seed SQL for one state from a cleaned venue CSV.
//!
//! Usage: generate-seed-sql <venues_cleaned.csv> [--state NC] [--output nc_seed.sql]

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use venue_seeds::csv_io::load_table;
use venue_seeds::enrich::{enrich_record, select_for_state};
use venue_seeds::progress::{create_progress_bar, format_duration, init_tracing, log_progress, set_log_only};
use venue_seeds::safety::{validate_output_path, SEED_MARKER};
use venue_seeds::seed_sql::{city_counts, render_seed_sql};

#[derive(Parser)]
#[command(name = "generate-seed-sql")]
#[command(about = "Generate enriched seed SQL (upsert on id) from a venue CSV")]
struct Args {
    /// Cleaned venue CSV
    input: PathBuf,

    /// Two-letter state to export
    #[arg(long, default_value = "NC")]
    state: String,

    /// Write SQL here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Disable progress bars (for tail -f / log files)
    #[arg(long)]
    log_only: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    set_log_only(args.log_only);
    init_tracing("info");

    if let Some(output) = &args.output {
        validate_output_path(output, SEED_MARKER, &[args.input.as_path()])?;
    }

    let start = Instant::now();
    let state = args.state.trim().to_uppercase();

    let table = load_table(&args.input)?;
    let selected = select_for_state(&table.records, &state);
    info!(
        total = table.len(),
        selected = selected.len(),
        state = %state,
        "Selected venues"
    );

    let total = selected.len() as u64;
    let pb = create_progress_bar(total, "Enriching");
    let mut venues = Vec::with_capacity(selected.len());
    for (i, record) in selected.into_iter().enumerate() {
        venues.push(enrich_record(record));
        pb.inc(1);
        log_progress("enrich", i as u64 + 1, total, 100);
    }
    pb.finish_and_clear();

    let sql = render_seed_sql(&venues, &state);

    match &args.output {
        Some(path) => {
            std::fs::write(path, &sql).with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {} venues to {:?}", venues.len(), path);
        }
        None => print!("{sql}"),
    }

    eprintln!("\nVenue summary by city:");
    for (city, count) in city_counts(&venues) {
        eprintln!("  {city}: {count}");
    }
    eprintln!("Elapsed: {}", format_duration(start.elapsed()));

    Ok(())
}
