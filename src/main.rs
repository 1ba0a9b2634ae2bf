//! Home-Station: Main entry point

use anyhow::Context;
use clap::Parser;
use home_station::cli::{Cli, Commands, GlobalArgs};
use home_station::config::Config;
use home_station::core::{Sample, Timestamp};
use home_station::ingest::{HttpFeedSource, IngestionService};
use home_station::query::{
    lookback_days, lookback_hours, within, QueryService, DASHBOARD_WINDOW_HOURS,
};
use home_station::storage::CacheStore;
use home_station::ventilation::{decide, HttpRelay, Ventilator};
use std::io::Write;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_tracing(&cli.global)?;

    let mut config = Config::load(cli.global.config.as_deref())?;
    cli.global.apply(&mut config);
    config.validate()?;

    let identity = config.identity()?;
    let store = CacheStore::new(config.cache_dir()?).with_zone(config.zone()?);

    match cli.command {
        Commands::Refresh => {
            let source = HttpFeedSource::new(config.feed_url.as_str(), config.fetch_timeout())?;
            let service = IngestionService::new(store, source, config.rotation_threshold_bytes);
            let report = service
                .refresh(&identity)
                .await
                .with_context(|| format!("refresh of {identity} failed"))?;
            println!("{}", serde_json::to_string(&report)?);
        }
        Commands::Recent { hours } => {
            let window = lookback_hours(hours)
                .with_context(|| format!("--hours {hours} is out of range"))?;
            let samples = QueryService::new(store).recent(&identity)?;
            print_samples(&within(&samples, Timestamp::now(), window))?;
        }
        Commands::History { days } => {
            let samples = QueryService::new(store).all_history(&identity)?;
            match days {
                Some(days) => {
                    let window = lookback_days(days)
                        .with_context(|| format!("--days {days} is out of range"))?;
                    print_samples(&within(&samples, Timestamp::now(), window))?
                }
                None => print_samples(&samples)?,
            }
        }
        Commands::Ventilate { dry_run } => {
            let samples = QueryService::new(store).recent(&identity)?;
            let window = lookback_hours(DASHBOARD_WINDOW_HOURS)
                .context("dashboard window is out of range")?;
            let samples = within(&samples, Timestamp::now(), window);
            let thresholds = config.fan_thresholds()?;
            let action = if dry_run {
                decide(samples.last(), thresholds)
            } else {
                let relay = HttpRelay::new(config.relay_url.as_str(), config.fetch_timeout())?;
                Ventilator::new(relay, thresholds)
                    .run(&samples)
                    .await
                    .context("failed to switch the fan relay")?
            };
            println!("{action}");
        }
    }

    Ok(())
}

fn print_samples(samples: &[Sample]) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    for sample in samples {
        serde_json::to_writer(&mut out, sample)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// Logs go to stderr (stdout carries command output), optionally also to a
/// daily rolling file. The returned guard must live until exit.
fn init_tracing(args: &GlobalArgs) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match &args.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "home-station.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if args.log_json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }

    Ok(guard)
}
