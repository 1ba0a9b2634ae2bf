//! Ventilation fan control driven by the latest CO2 reading.
//!
//! The fan hangs off a smart relay that is switched with a plain HTTP GET.
//! Two thresholds give hysteresis: above `on_ppm` the fan is switched on,
//! below `off_ppm` it is switched off, and in between the relay is left alone.

use crate::core::sample::Sample;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;
use tracing::info;

/// Default relay endpoint
pub const DEFAULT_RELAY_URL: &str = "http://192.168.0.190/relay/0";
pub const DEFAULT_FAN_ON_PPM: f64 = 1100.0;
pub const DEFAULT_FAN_OFF_PPM: f64 = 600.0;

/// What to do with the fan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FanAction {
    On,
    Off,
    /// Leave the relay in whatever state it is in
    Hold,
}

impl fmt::Display for FanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Hold => "hold",
        };
        f.write_str(s)
    }
}

/// Switching thresholds in ppm; `off_ppm` must be below `on_ppm`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FanThresholds {
    pub on_ppm: f64,
    pub off_ppm: f64,
}

impl FanThresholds {
    pub fn new(on_ppm: f64, off_ppm: f64) -> Result<Self> {
        // NaN compares as unordered and is rejected with everything else.
        if off_ppm.partial_cmp(&on_ppm) != Some(Ordering::Less) {
            return Err(Error::Configuration(format!(
                "fan off threshold {off_ppm} must be below on threshold {on_ppm}"
            )));
        }
        Ok(Self { on_ppm, off_ppm })
    }
}

impl Default for FanThresholds {
    fn default() -> Self {
        Self {
            on_ppm: DEFAULT_FAN_ON_PPM,
            off_ppm: DEFAULT_FAN_OFF_PPM,
        }
    }
}

/// Decide the fan action for the latest reading
pub fn decide(latest: Option<&Sample>, thresholds: FanThresholds) -> FanAction {
    match latest {
        Some(s) if s.co2_ppm() > thresholds.on_ppm => FanAction::On,
        Some(s) if s.co2_ppm() < thresholds.off_ppm => FanAction::Off,
        _ => FanAction::Hold,
    }
}

/// Something that can switch the fan
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RelaySwitch: Send + Sync {
    /// Switch the relay on (`true`) or off (`false`)
    async fn switch(&self, on: bool) -> Result<()>;
}

/// Relay driven by `GET <url>?turn=on|off`
pub struct HttpRelay {
    client: reqwest::Client,
    url: String,
}

impl HttpRelay {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl RelaySwitch for HttpRelay {
    async fn switch(&self, on: bool) -> Result<()> {
        let turn = if on { "on" } else { "off" };
        self.client
            .get(&self.url)
            .query(&[("turn", turn)])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Applies [`decide`] to a series and drives the relay accordingly
pub struct Ventilator<R> {
    relay: R,
    thresholds: FanThresholds,
}

impl<R: RelaySwitch> Ventilator<R> {
    pub fn new(relay: R, thresholds: FanThresholds) -> Self {
        Self { relay, thresholds }
    }

    /// Decide from the last sample of a sorted series and switch if needed
    pub async fn run(&self, samples: &[Sample]) -> Result<FanAction> {
        let latest = samples.last();
        let action = decide(latest, self.thresholds);
        match action {
            FanAction::On => self.relay.switch(true).await?,
            FanAction::Off => self.relay.switch(false).await?,
            FanAction::Hold => {}
        }
        info!(
            co2_ppm = latest.map(|s| s.co2_ppm()),
            action = %action,
            "Ventilation decision"
        );
        Ok(action)
    }
}
