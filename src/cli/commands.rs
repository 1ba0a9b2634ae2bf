//! CLI commands

use crate::config::Config;
use crate::query::{DASHBOARD_WINDOW_HOURS, MAX_LOOKBACK_HOURS};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Home-Station CLI
#[derive(Parser)]
#[command(name = "home-station")]
#[command(about = "Sensor feed ingestion and sample cache for the home dashboard")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every command; they override the config file
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// JSON configuration file
    #[arg(long, env = "HOME_STATION_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the cache segments
    #[arg(long, env = "HOME_STATION_CACHE_DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Cache identity of the series
    #[arg(long, env = "HOME_STATION_IDENTITY", global = true)]
    pub identity: Option<String>,

    /// Sensor feed URL
    #[arg(long, env = "HOME_STATION_FEED_URL", global = true)]
    pub feed_url: Option<String>,

    /// IANA zone the sensor clock runs in, e.g. `America/New_York`
    #[arg(long, env = "HOME_STATION_ZONE", global = true)]
    pub zone: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, env = "HOME_STATION_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,
}

impl GlobalArgs {
    /// Overlay the flags that were given onto `config`
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        if let Some(identity) = &self.identity {
            config.identity = identity.clone();
        }
        if let Some(url) = &self.feed_url {
            config.feed_url = url.clone();
        }
        if let Some(zone) = &self.zone {
            config.zone = zone.clone();
        }
    }
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Fetch the sensor feed once and append it to the cache
    Refresh,
    /// Print samples from the active segment as JSON lines
    Recent {
        /// Only samples younger than this many hours
        #[arg(
            long,
            default_value_t = DASHBOARD_WINDOW_HOURS,
            value_parser = clap::value_parser!(i64).range(1..=MAX_LOOKBACK_HOURS)
        )]
        hours: i64,
    },
    /// Print the merged history of every segment as JSON lines
    History {
        /// Only samples younger than this many days
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..=MAX_LOOKBACK_HOURS / 24))]
        days: Option<i64>,
    },
    /// Switch the ventilation fan according to the latest reading
    Ventilate {
        /// Print the decision without touching the relay
        #[arg(long)]
        dry_run: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cli = Cli::try_parse_from(["home-station", "recent"]).unwrap();
        assert_eq!(cli.command, Commands::Recent { hours: 120 });

        let cli = Cli::try_parse_from(["home-station", "history", "--days", "30"]).unwrap();
        assert_eq!(cli.command, Commands::History { days: Some(30) });

        let cli = Cli::try_parse_from(["home-station", "ventilate", "--dry-run"]).unwrap();
        assert_eq!(cli.command, Commands::Ventilate { dry_run: true });

        assert!(Cli::try_parse_from(["home-station"]).is_err());
    }

    #[test]
    fn test_lookback_arguments_are_bounded() {
        for args in [
            ["home-station", "recent", "--hours", "0"],
            ["home-station", "recent", "--hours", "9223372036854775"],
            ["home-station", "history", "--days", "-1"],
            ["home-station", "history", "--days", "9223372036854775807"],
        ] {
            assert!(Cli::try_parse_from(args).is_err(), "{args:?} should be rejected");
        }

        let cli = Cli::try_parse_from(["home-station", "recent", "--hours", "876600"]).unwrap();
        assert_eq!(cli.command, Commands::Recent { hours: 876_600 });
    }

    #[test]
    fn test_global_flags_override_config() {
        let cli = Cli::try_parse_from([
            "home-station",
            "refresh",
            "--cache-dir",
            "/var/cache/station",
            "--identity",
            "co2",
            "--zone",
            "Europe/Berlin",
        ])
        .unwrap();
        assert_eq!(cli.command, Commands::Refresh);

        let mut config = Config::default();
        cli.global.apply(&mut config);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/var/cache/station")));
        assert_eq!(config.identity, "co2");
        assert_eq!(config.zone().unwrap(), chrono_tz::Europe::Berlin);
        assert_eq!(config.feed_url, Config::default().feed_url);
    }
}
