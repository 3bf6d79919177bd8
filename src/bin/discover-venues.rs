//! Discover live music venues for a city with web search, keeping only
//! venues with complete contact data.
//!
//! Usage: discover-venues --city Richmond --state VA [--existing venues.csv]
//!
//! Writes <city>_venues_complete.json and <city>_venues_complete.csv.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

use venue_seeds::anthropic::AnthropicClient;
use venue_seeds::csv_io::load_table;
use venue_seeds::discovery::{
    discover, existing_names, output_paths, write_csv, write_json, DiscoveryRequest, DEFAULT_LIMIT,
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
};
use venue_seeds::progress::{create_spinner, format_duration, init_tracing, set_log_only};
use venue_seeds::safety::{validate_output_path, COMPLETE_MARKER};

#[derive(Parser)]
#[command(name = "discover-venues")]
#[command(about = "Discover venues with complete contact data via the Messages API")]
struct Args {
    #[arg(long)]
    city: String,

    #[arg(long)]
    state: String,

    /// Number of venues to ask for
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    limit: usize,

    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    /// Existing venue CSV; its venues in this city are excluded
    #[arg(long)]
    existing: Option<PathBuf>,

    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// API base URL (proxies, testing)
    #[arg(long)]
    base_url: Option<String>,

    /// Disable spinners (for tail -f / log files)
    #[arg(long)]
    log_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    set_log_only(args.log_only);
    // .env is optional
    let _ = dotenvy::dotenv();
    init_tracing("info");

    let (json_path, csv_path) = output_paths(&args.output_dir, &args.city);
    let mut inputs = Vec::new();
    if let Some(existing) = &args.existing {
        inputs.push(existing.as_path());
    }
    validate_output_path(&json_path, COMPLETE_MARKER, &inputs)?;
    validate_output_path(&csv_path, COMPLETE_MARKER, &inputs)?;

    let exclude = match &args.existing {
        Some(path) => {
            let table = load_table(path)?;
            let names = existing_names(&table, &args.city, &args.state);
            info!(known = names.len(), "Excluding venues already on file");
            names
        }
        None => Vec::new(),
    };

    let mut client = AnthropicClient::from_env().context("Cannot create API client")?;
    if let Some(url) = &args.base_url {
        client = client.with_base_url(url.as_str());
    }

    println!("Discovering venues in {}, {}...", args.city, args.state);
    println!("  Target: {} venues with complete data\n", args.limit);

    let request = DiscoveryRequest {
        city: args.city.clone(),
        state: args.state.clone(),
        limit: args.limit,
        model: args.model.clone(),
        max_tokens: args.max_tokens,
        exclude,
    };

    let start = Instant::now();
    let spinner = create_spinner("Waiting for model (web search)");
    let result = discover(&client, &request).await;
    spinner.finish_and_clear();
    let outcome = result.context("Discovery request failed")?;

    if let Some(reason) = &outcome.empty_reason {
        warn!(%reason, "Response held no venue list");
    }

    let summary = &outcome.summary;
    println!("Found {} venues with COMPLETE data", summary.complete);
    println!("Found {} venues with incomplete data\n", summary.incomplete);

    if !outcome.incomplete.is_empty() {
        println!("Incomplete venues:");
        for item in outcome.incomplete.iter().take(10) {
            match &item.reason {
                Some(reason) => println!("  - {}: unreadable ({})", item.name, reason),
                None => println!("  - {}: missing {}", item.name, item.missing.join(", ")),
            }
        }
        if outcome.incomplete.len() > 10 {
            println!("  ... and {} more", outcome.incomplete.len() - 10);
        }
        println!();
    }

    write_json(&json_path, &outcome.complete)?;
    println!("Saved {} complete venues to {:?}", outcome.complete.len(), json_path);
    write_csv(&csv_path, &outcome.complete)?;
    println!("Saved {} complete venues to {:?}", outcome.complete.len(), csv_path);

    for venue in outcome.complete.iter().take(5) {
        let text = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());
        println!("\n  {}", venue.display_name());
        println!("    email:    {}", text(&venue.email));
        println!("    phone:    {}", text(&venue.phone));
        println!("    website:  {}", text(&venue.website));
        println!(
            "    address:  {}, {}, {} {}",
            text(&venue.address),
            text(&venue.city),
            text(&venue.state),
            text(&venue.zip_code)
        );
        println!(
            "    capacity: {}",
            venue.capacity.map(|c| c.to_string()).unwrap_or_else(|| "N/A".to_string())
        );
        println!("    genres:   {}", venue.music_focus.join(", "));
    }

    println!("\n{:=<60}", "");
    println!("Data completeness summary");
    println!("  Total discovered: {}", summary.discovered);
    println!("  Already on file:  {}", summary.excluded);
    println!("  Complete data:    {}", summary.complete);
    println!("  Incomplete data:  {}", summary.incomplete);
    if let Some(avg) = summary.average_confidence {
        println!("  Avg confidence:   {:.1}%", avg);
    }
    if !summary.venue_types.is_empty() {
        println!("  Venue types:");
        for (kind, count) in &summary.venue_types {
            println!("    {}: {}", kind, count);
        }
    }
    println!("  Elapsed:          {}", format_duration(start.elapsed()));
    println!("{:=<60}", "");

    Ok(())
}
