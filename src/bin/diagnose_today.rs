use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use daf_history_bot::clock::{civil_date, Clock, SystemClock};
use daf_history_bot::config;
use daf_history_bot::lookup::VideoLookup;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Resolve and match the video for a date, print it and exit without sending anything"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Date to look up (YYYY-MM-DD); defaults to today in the configured timezone
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Bypass the result cache (neither read nor written)
    #[arg(long)]
    no_cache: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))
        .with_context(|| format!("loading {}", args.config.display()))?;
    if !args.no_cache {
        cfg.ensure_dirs().context("creating state directory")?;
    }

    let date = match args.date {
        Some(date) => date,
        None => civil_date(SystemClock.now(), cfg.timezone()?),
    };
    info!(%date, cache = !args.no_cache, "looking up video");

    let lookup = VideoLookup::from_config(&cfg, !args.no_cache)?;
    let video = lookup
        .for_date(date)
        .await
        .with_context(|| format!("lookup for {date}"))?;
    println!("{}", serde_json::to_string_pretty(&video)?);
    Ok(())
}
