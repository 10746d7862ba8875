use clap::Parser;
use kindred::{
    dating::{MatchDetector, sweep_mutual_likes},
    db::DatabaseConfig,
    state::{build_notifier, open_persistent_store},
    utils::{config::Config, init_logging_with},
};
use std::time::Duration;
use tokio::time;
use tracing::{error, info};

/// Promotes mutual likes that never got a match record.
#[derive(Debug, Parser)]
#[command(name = "match_sweeper")]
struct Args {
    /// Run a single pass and exit
    #[arg(long)]
    once: bool,

    /// Seconds between passes (defaults to SWEEP_INTERVAL_SECS)
    #[arg(long)]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging_with("kindred=info,match_sweeper=debug");
    let args = Args::parse();

    info!("💞 Starting match sweeper...");

    let config = Config::from_env()?;
    let store = open_persistent_store(DatabaseConfig::from_env_optional()).await?;
    let notifier = build_notifier(store.clone(), &config);
    let detector = MatchDetector::new(store.clone(), notifier);

    if args.once {
        let report = sweep_mutual_likes(store.as_ref(), &detector).await?;
        info!("✅ Sweep done: {:?}", report);
        return Ok(());
    }

    let every = args.interval.unwrap_or(config.sweep_interval_secs).max(1);
    let mut interval = time::interval(Duration::from_secs(every));
    let mut iter_count: usize = 0;

    loop {
        interval.tick().await;
        iter_count += 1;

        match sweep_mutual_likes(store.as_ref(), &detector).await {
            Ok(report) if report.matches_created > 0 || report.failures > 0 => {
                info!(
                    "🎯 Sweep {}: {} mutual pairs, {} matches repaired, {} failures",
                    iter_count, report.mutual_pairs, report.matches_created, report.failures
                );
            }
            Ok(report) => {
                tracing::debug!("Sweep {}: {} mutual pairs, nothing to repair", iter_count, report.mutual_pairs);
            }
            Err(e) => {
                error!("❌ Sweep {} could not scan swipes: {}", iter_count, e);
            }
        }
    }
}
