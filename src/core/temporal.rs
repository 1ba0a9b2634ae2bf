//! Timestamps anchored to the canonical time zone

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Zone the sensor's wall clock runs in.
///
/// Wall clocks read from the feed are interpreted in this zone whatever
/// label the sensor printed next to them, and instants are written back in
/// it with the zone's own abbreviation.
pub type CanonicalZone = chrono_tz::Tz;

/// Canonical zone when none is configured
pub const DEFAULT_CANONICAL_ZONE: CanonicalZone = chrono_tz::America::New_York;

/// Wall-clock layout of the feed: day/month/year hour:minute:second
pub const FEED_TIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Fixed-width, lexicographically sortable stamp used for archival segments
pub const ROTATION_STAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Instant with second resolution.
///
/// Stored as seconds since the Unix epoch, so comparisons never depend on
/// the zone a wall clock was read in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "DateTime<Utc>", from = "DateTime<Utc>")]
pub struct Timestamp {
    /// Seconds since Unix epoch
    secs: i64,
}

impl Timestamp {
    /// Create a timestamp from seconds since Unix epoch
    pub fn from_secs(secs: i64) -> Self {
        Self { secs }
    }

    /// Get current timestamp
    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    /// Anchor a naive wall clock read in `zone`.
    ///
    /// A wall clock repeated by a fall-back transition resolves to the
    /// reading whose abbreviation equals `label`, else to the earlier one.
    /// A wall clock skipped by a spring-forward gap is read with the offset
    /// in force before the gap, so `02:30` on a one-hour gap day in New York
    /// becomes `03:30 EDT`.
    pub fn from_wall_clock(
        naive: NaiveDateTime,
        zone: CanonicalZone,
        label: Option<&str>,
    ) -> Self {
        match zone.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Self::from(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earlier, later) => {
                let chosen = match label {
                    Some(label) if later.format("%Z").to_string() == label => later,
                    _ => earlier,
                };
                Self::from(chosen.with_timezone(&Utc))
            }
            LocalResult::None => {
                let before_gap = naive.checked_sub_signed(Duration::days(1)).unwrap_or(naive);
                let offset = zone.offset_from_utc_datetime(&before_gap).fix();
                let as_utc = Utc.from_utc_datetime(&naive).timestamp();
                Self::from_secs(as_utc - i64::from(offset.local_minus_utc()))
            }
        }
    }

    /// Parse a `DD/MM/YYYY HH:MM:SS` wall clock read in `zone`
    pub fn parse_wall_clock(
        s: &str,
        zone: CanonicalZone,
        label: Option<&str>,
    ) -> Result<Self, chrono::ParseError> {
        NaiveDateTime::parse_from_str(s, FEED_TIME_FORMAT)
            .map(|naive| Self::from_wall_clock(naive, zone, label))
    }

    /// Get seconds since Unix epoch
    pub fn as_secs(&self) -> i64 {
        self.secs
    }

    /// Convert to chrono DateTime
    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.secs, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// The same instant on the wall clock of `zone`
    pub fn in_zone(&self, zone: CanonicalZone) -> DateTime<CanonicalZone> {
        self.to_datetime().with_timezone(&zone)
    }

    /// Render in the feed layout, e.g. `05/03/2024 09:22:01 (EST)`
    pub fn to_feed_string(&self, zone: CanonicalZone) -> String {
        let local = self.in_zone(zone);
        format!("{} ({})", local.format(FEED_TIME_FORMAT), local.format("%Z"))
    }

    /// Render as an archival segment stamp, e.g. `20240305T092201`
    pub fn to_rotation_stamp(&self, zone: CanonicalZone) -> String {
        self.in_zone(zone).format(ROTATION_STAMP_FORMAT).to_string()
    }

    /// Time elapsed from `earlier` to `self`
    pub fn since(&self, earlier: Timestamp) -> chrono::Duration {
        chrono::Duration::seconds(self.secs - earlier.secs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_datetime().to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self {
            secs: dt.timestamp(),
        }
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.to_datetime()
    }
}
