//! Runtime configuration
//!
//! Values come from built-in defaults, then an optional JSON file, then
//! command-line flags and environment variables (applied by the CLI).

use crate::core::temporal::{CanonicalZone, DEFAULT_CANONICAL_ZONE};
use crate::error::{Error, Result};
use crate::ingest::DEFAULT_FEED_URL;
use crate::storage::{CacheIdentity, DEFAULT_IDENTITY, DEFAULT_ROTATION_THRESHOLD};
use crate::ventilation::{FanThresholds, DEFAULT_FAN_OFF_PPM, DEFAULT_FAN_ON_PPM, DEFAULT_RELAY_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application directory name under the platform cache directory
pub const APP_DIR_NAME: &str = "home_station";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Cache directory; defaults to `<platform cache dir>/home_station`
    pub cache_dir: Option<PathBuf>,
    /// Cache identity of the CO2 series
    pub identity: String,
    /// IANA name of the zone the sensor clock runs in
    pub zone: String,
    /// URL of the sensor feed
    pub feed_url: String,
    /// Timeout for feed and relay requests
    pub fetch_timeout_secs: u64,
    /// Active segment size that triggers rotation
    pub rotation_threshold_bytes: u64,
    /// Fan relay endpoint
    pub relay_url: String,
    pub fan_on_ppm: f64,
    pub fan_off_ppm: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: None,
            identity: DEFAULT_IDENTITY.to_string(),
            zone: DEFAULT_CANONICAL_ZONE.name().to_string(),
            feed_url: DEFAULT_FEED_URL.to_string(),
            fetch_timeout_secs: 10,
            rotation_threshold_bytes: DEFAULT_ROTATION_THRESHOLD,
            relay_url: DEFAULT_RELAY_URL.to_string(),
            fan_on_ppm: DEFAULT_FAN_ON_PPM,
            fan_off_ppm: DEFAULT_FAN_OFF_PPM,
        }
    }
}

impl Config {
    /// Load from a JSON file, or defaults when `path` is `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::Configuration(format!("cannot read {}: {e}", path.display()))
                })?;
                serde_json::from_str(&raw)?
            }
            None => Self::default(),
        };
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.rotation_threshold_bytes == 0 {
            return Err(Error::Configuration(
                "rotation_threshold_bytes must be positive".to_string(),
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(Error::Configuration(
                "fetch_timeout_secs must be positive".to_string(),
            ));
        }
        self.identity()?;
        self.zone()?;
        self.fan_thresholds()?;
        Ok(())
    }

    pub fn identity(&self) -> Result<CacheIdentity> {
        CacheIdentity::new(self.identity.as_str())
    }

    pub fn zone(&self) -> Result<CanonicalZone> {
        self.zone.parse::<CanonicalZone>().map_err(|e| {
            Error::Configuration(format!("unknown time zone `{}`: {e}", self.zone))
        })
    }

    /// Configured cache directory, else the platform cache directory
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.cache_dir {
            return Ok(dir.clone());
        }
        dirs::cache_dir()
            .map(|base| base.join(APP_DIR_NAME))
            .ok_or_else(|| {
                Error::Configuration("no platform cache directory; set cache_dir".to_string())
            })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn fan_thresholds(&self) -> Result<FanThresholds> {
        FanThresholds::new(self.fan_on_ppm, self.fan_off_ppm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.rotation_threshold_bytes, 5 * 1024 * 1024);
        assert_eq!(config.identity().unwrap().as_str(), "co2_ppm_samples");
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.zone().unwrap(), chrono_tz::America::New_York);
    }

    #[test]
    fn test_load_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"cache_dir": "/tmp/station", "rotation_threshold_bytes": 1024}"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.cache_dir().unwrap(), PathBuf::from("/tmp/station"));
        assert_eq!(config.rotation_threshold_bytes, 1024);
        assert_eq!(config.feed_url, DEFAULT_FEED_URL);
    }

    #[test]
    fn test_load_rejects_unknown_and_missing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{"cache_directory": "/tmp"}"#).unwrap();
        assert!(matches!(
            Config::load(Some(&path)),
            Err(Error::Serialization(_))
        ));

        assert!(matches!(
            Config::load(Some(&temp_dir.path().join("absent.json"))),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_validate() {
        let mut config = Config {
            rotation_threshold_bytes: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        config.rotation_threshold_bytes = 1;
        config.identity = "a/b".to_string();
        assert!(config.validate().is_err());

        config.identity = "co2".to_string();
        config.zone = "Mars/Olympus_Mons".to_string();
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        config.zone = "UTC".to_string();
        config.fan_off_ppm = 1200.0;
        assert!(config.validate().is_err());

        config.fan_off_ppm = 500.0;
        config.validate().unwrap();
    }
}
