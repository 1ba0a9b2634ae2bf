//! Sensor samples and the record shapes the feed delivers them in

use crate::core::temporal::Timestamp;
use crate::error::ParseFailure;
use serde::Serialize;

/// Temperature and humidity reported by the extended feed shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Climate {
    /// Temperature in degrees Celsius
    pub temperature_c: f64,
    /// Relative humidity in percent (0-100)
    pub relative_humidity: f64,
}

/// One environmental reading.
///
/// Only built through validating constructors, so a `Sample` that exists is
/// always fit for the cache.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    timestamp: Timestamp,
    co2_ppm: f64,
    #[serde(flatten)]
    climate: Option<Climate>,
}

impl Sample {
    /// Create a CO2-only sample
    pub fn legacy(timestamp: Timestamp, co2_ppm: f64) -> Result<Self, ParseFailure> {
        check_co2(co2_ppm)?;
        Ok(Self {
            timestamp,
            co2_ppm,
            climate: None,
        })
    }

    /// Create a sample carrying temperature and humidity as well
    pub fn extended(
        timestamp: Timestamp,
        co2_ppm: f64,
        temperature_c: f64,
        relative_humidity: f64,
    ) -> Result<Self, ParseFailure> {
        check_co2(co2_ppm)?;
        if !temperature_c.is_finite() {
            return Err(ParseFailure::MalformedRecord(format!(
                "temperature {temperature_c} is not finite"
            )));
        }
        if !(0.0..=100.0).contains(&relative_humidity) {
            return Err(ParseFailure::MalformedRecord(format!(
                "relative humidity {relative_humidity} outside 0-100"
            )));
        }
        Ok(Self {
            timestamp,
            co2_ppm,
            climate: Some(Climate {
                temperature_c,
                relative_humidity,
            }),
        })
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn co2_ppm(&self) -> f64 {
        self.co2_ppm
    }

    pub fn climate(&self) -> Option<Climate> {
        self.climate
    }

    pub fn temperature_c(&self) -> Option<f64> {
        self.climate.map(|c| c.temperature_c)
    }

    pub fn relative_humidity(&self) -> Option<f64> {
        self.climate.map(|c| c.relative_humidity)
    }
}

fn check_co2(co2_ppm: f64) -> Result<(), ParseFailure> {
    // NaN fails the range check as well.
    if !(co2_ppm >= 0.0 && co2_ppm.is_finite()) {
        return Err(ParseFailure::MalformedRecord(format!(
            "CO2 concentration {co2_ppm} is not a non-negative number"
        )));
    }
    Ok(())
}

/// A feed line after field splitting, tagged by shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedRecord {
    /// `timestamp,co2`
    Legacy { timestamp: Timestamp, co2_ppm: f64 },
    /// `timestamp,co2,temperature,humidity`
    Extended {
        timestamp: Timestamp,
        co2_ppm: f64,
        temperature_c: f64,
        relative_humidity: f64,
    },
}

impl FeedRecord {
    /// Validate the record into a sample
    pub fn into_sample(self) -> Result<Sample, ParseFailure> {
        match self {
            Self::Legacy { timestamp, co2_ppm } => Sample::legacy(timestamp, co2_ppm),
            Self::Extended {
                timestamp,
                co2_ppm,
                temperature_c,
                relative_humidity,
            } => Sample::extended(timestamp, co2_ppm, temperature_c, relative_humidity),
        }
    }
}

impl From<Sample> for FeedRecord {
    fn from(sample: Sample) -> Self {
        match sample.climate {
            None => Self::Legacy {
                timestamp: sample.timestamp,
                co2_ppm: sample.co2_ppm,
            },
            Some(climate) => Self::Extended {
                timestamp: sample.timestamp,
                co2_ppm: sample.co2_ppm,
                temperature_c: climate.temperature_c,
                relative_humidity: climate.relative_humidity,
            },
        }
    }
}
