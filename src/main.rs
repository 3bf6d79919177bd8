//! Clean a venue CSV: report duplicates and missing data, merge duplicates,
//! mark survivors verified, and write `<input>_cleaned.csv`.
//!
//! Usage: clean-venues <venues.csv> [output_cleaned.csv] [--stats stats.json]

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

use venue_seeds::csv_io::{load_table, save_table};
use venue_seeds::dedupe::{analyze_missing_data, deduplicate, find_duplicates, keys_are_unique, DuplicateKind};
use venue_seeds::models::{CleanStats, VenueTable};
use venue_seeds::progress::{create_spinner, format_duration, init_tracing, set_log_only};
use venue_seeds::safety::{default_cleaned_path, validate_output_path, CLEANED_MARKER};

#[derive(Parser)]
#[command(name = "clean-venues")]
#[command(about = "Deduplicate and clean a venue CSV")]
struct Args {
    /// Venue CSV to clean
    input: PathBuf,

    /// Output CSV (default: <input stem>_cleaned.csv)
    output: Option<PathBuf>,

    /// Write run statistics as JSON
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Duplicate groups to print per key kind
    #[arg(long, default_value = "10")]
    show: usize,

    /// Disable spinners (for tail -f / log files)
    #[arg(long)]
    log_only: bool,
}

fn print_duplicates(table: &VenueTable, show: usize) -> (usize, usize) {
    let clusters = find_duplicates(&table.records);
    let name_city: Vec<_> = clusters.iter().filter(|c| c.kind == DuplicateKind::NameCity).collect();
    let email: Vec<_> = clusters.iter().filter(|c| c.kind == DuplicateKind::Email).collect();

    for (label, group) in [("name+city", &name_city), ("email", &email)] {
        println!("\nDuplicates by {}: {} groups", label, group.len());
        for cluster in group.iter().take(show) {
            println!("  {} ({} records)", cluster.key, cluster.members.len());
            for &idx in &cluster.members {
                let record = &table.records[idx];
                println!("    - {} | {}", record.name(), record.city());
            }
        }
        if group.len() > show {
            println!("  ... and {} more", group.len() - show);
        }
    }

    (name_city.len(), email.len())
}

fn main() -> Result<()> {
    let args = Args::parse();
    set_log_only(args.log_only);
    init_tracing("info");

    let output = args.output.clone().unwrap_or_else(|| default_cleaned_path(&args.input));
    validate_output_path(&output, CLEANED_MARKER, &[args.input.as_path()])?;

    let start = Instant::now();

    println!("Loading venues: {:?}", args.input);
    let table = load_table(&args.input)?;
    println!("Loaded {} venues", table.len());

    let (name_city_groups, email_groups) = print_duplicates(&table, args.show);

    let missing = analyze_missing_data(&table.records);
    println!("\nMissing data:");
    for m in &missing {
        println!("  {:<10} {:>5} ({:.1}%)", m.field, m.missing, m.percent);
    }

    let total_input = table.len();
    let headers = table.headers;

    let spinner = create_spinner("Merging duplicates");
    let outcome = deduplicate(table.records);
    spinner.finish_and_clear();

    for fallback in &outcome.fallbacks {
        warn!(
            venue = %fallback.venue,
            column = %fallback.column,
            raw = %fallback.raw,
            reason = %fallback.reason,
            "Kept existing value"
        );
    }
    if !keys_are_unique(&outcome.records) {
        bail!("Cleaned table still has duplicate keys, not writing {:?}", output);
    }

    let cleaned = VenueTable {
        headers,
        records: outcome.records,
    };
    save_table(&output, &cleaned)?;
    info!(path = %output.display(), records = cleaned.len(), "Wrote cleaned CSV");

    let elapsed = start.elapsed();
    let stats = CleanStats {
        total_input,
        name_city_groups,
        email_groups,
        cleaned: cleaned.len(),
        removed: outcome.removed.len(),
        merge_fallbacks: outcome.fallbacks.len(),
        missing,
        elapsed_seconds: elapsed.as_secs_f64(),
    };

    if let Some(path) = &args.stats {
        stats
            .write_to_file(path)
            .with_context(|| format!("Failed to write stats to {}", path.display()))?;
        println!("Stats written to {:?}", path);
    }

    if !outcome.removed.is_empty() {
        println!("\nMerged away:");
        for record in outcome.removed.iter().take(args.show) {
            println!("  - {} | {}", record.name(), record.city());
        }
        if outcome.removed.len() > args.show {
            println!("  ... and {} more", outcome.removed.len() - args.show);
        }
    }

    println!("\n{:=<60}", "");
    println!("Cleaning complete!");
    println!("  Input venues:     {}", stats.total_input);
    println!("  Duplicate groups: {}", stats.duplicate_groups());
    println!("  Removed:          {}", stats.removed);
    println!("  Cleaned venues:   {}", stats.cleaned);
    println!("  Output:           {:?}", output);
    println!("  Elapsed:          {}", format_duration(elapsed));
    println!("{:=<60}", "");

    Ok(())
}
