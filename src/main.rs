use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use daf_history_bot::broadcast::Broadcaster;
use daf_history_bot::clock::{Clock, SystemClock};
use daf_history_bot::config;
use daf_history_bot::handlers::CommandDispatcher;
use daf_history_bot::lookup::VideoLookup;
use daf_history_bot::messages::Messages;
use daf_history_bot::poller;
use daf_history_bot::ratelimit::{RateLimiter, RatePolicy};
use daf_history_bot::state::{BroadcastLedger, SubscriberRegistry, UpdateCursor};
use daf_history_bot::transport::{TelegramTransport, Transport};

#[derive(Debug, Parser)]
#[command(author, version, about = "Daily Daf Yomi history video bot")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Fetch pending updates once, answer commands and advance the cursor
    Poll,
    /// Send today's video to every subscriber and the configured chat
    Broadcast {
        /// Ignore the send window (the once-a-day check still applies)
        #[arg(long)]
        force: bool,
    },
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
    cfg.ensure_dirs().context("creating state directory")?;

    let state_dir = cfg.state_dir();
    let tz = cfg.timezone()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let transport: Arc<dyn Transport> = Arc::new(TelegramTransport::from_config(&cfg)?);
    let lookup = VideoLookup::from_config(&cfg, true)?;
    let messages = Messages::new(cfg.series_url());
    let subscribers = SubscriberRegistry::new(&state_dir);

    match args.cmd {
        Cmd::Poll => {
            let limiter = RateLimiter::load(&state_dir, RatePolicy::from_config(&cfg))?;
            let cursor = UpdateCursor::new(&state_dir);
            let mut dispatcher = CommandDispatcher::new(
                transport.clone(),
                lookup,
                limiter,
                subscribers,
                messages,
                clock,
                tz,
            );
            let report = poller::run_cycle(
                transport.as_ref(),
                &cursor,
                &mut dispatcher,
                cfg.telegram.poll_limit,
            )
            .await?;
            info!(?report, "poll done");
        }
        Cmd::Broadcast { force } => {
            let broadcaster = Broadcaster::new(
                transport,
                lookup,
                subscribers,
                BroadcastLedger::new(&state_dir),
                messages,
                clock,
                tz,
                cfg.telegram.chat_id,
                cfg.broadcast.clone(),
            );
            match broadcaster.run(force).await {
                Ok(outcome) => info!(?outcome, "broadcast done"),
                Err(err) => {
                    error!(?err, "broadcast failed");
                    return Err(err);
                }
            }
        }
    }

    Ok(())
}
