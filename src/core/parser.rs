//! Line parser and writer for the sensor feed format
//!
//! A feed line is either the legacy two-field shape
//!
//! ```text
//! 05/03/2024 14:22:01 (EST),512 ppm
//! ```
//!
//! or the extended four-field shape
//!
//! ```text
//! 05/03/2024 14:22:01 (EST),512 ppm,21.4 C,47 rel_humidity
//! ```
//!
//! Wall clocks are read in a [`CanonicalZone`]. The `_in` variants take the
//! zone explicitly; the plain ones use [`DEFAULT_CANONICAL_ZONE`]. Cache
//! segments store samples in exactly the same layout, so [`serialize_in`]
//! output always parses back to the sample it came from in the same zone.

use crate::core::sample::{FeedRecord, Sample};
use crate::core::temporal::{CanonicalZone, Timestamp, DEFAULT_CANONICAL_ZONE};
use crate::error::ParseFailure;
use nom::bytes::complete::{take_till1, take_while1};
use nom::character::complete::{char, space0, space1};
use nom::combinator::{all_consuming, opt};
use nom::number::complete::double;
use nom::sequence::{delimited, preceded, tuple};
use nom::IResult;

/// Field delimiter
pub const DELIMITER: char = ',';

pub const CO2_UNIT: &str = "ppm";
pub const TEMPERATURE_UNIT: &str = "C";
pub const HUMIDITY_UNIT: &str = "rel_humidity";

/// Parse one line into a validated sample
pub fn parse(line: &str) -> Result<Sample, ParseFailure> {
    parse_in(line, DEFAULT_CANONICAL_ZONE)
}

/// Parse one line, reading its wall clock in `zone`
pub fn parse_in(line: &str, zone: CanonicalZone) -> Result<Sample, ParseFailure> {
    parse_record_in(line, zone)?.into_sample()
}

/// Split and decode one line without range validation
pub fn parse_record(line: &str) -> Result<FeedRecord, ParseFailure> {
    parse_record_in(line, DEFAULT_CANONICAL_ZONE)
}

pub fn parse_record_in(line: &str, zone: CanonicalZone) -> Result<FeedRecord, ParseFailure> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseFailure::MalformedRecord("empty line".to_string()));
    }

    let fields: Vec<&str> = line.split(DELIMITER).collect();
    match fields.as_slice() {
        [timestamp, co2] => Ok(FeedRecord::Legacy {
            timestamp: parse_timestamp(timestamp, zone)?,
            co2_ppm: parse_measurement(co2, "co2_ppm", CO2_UNIT)?,
        }),
        [timestamp, co2, temperature, humidity] => Ok(FeedRecord::Extended {
            timestamp: parse_timestamp(timestamp, zone)?,
            co2_ppm: parse_measurement(co2, "co2_ppm", CO2_UNIT)?,
            temperature_c: parse_measurement(temperature, "temperature_c", TEMPERATURE_UNIT)?,
            relative_humidity: parse_measurement(humidity, "relative_humidity", HUMIDITY_UNIT)?,
        }),
        other => Err(ParseFailure::MalformedRecord(format!(
            "expected 2 or 4 fields, found {}",
            other.len()
        ))),
    }
}

/// Render a sample in the feed layout, without a trailing newline
pub fn serialize(sample: &Sample) -> String {
    serialize_in(sample, DEFAULT_CANONICAL_ZONE)
}

/// Render a sample with its wall clock in `zone`
pub fn serialize_in(sample: &Sample, zone: CanonicalZone) -> String {
    match FeedRecord::from(*sample) {
        FeedRecord::Legacy { timestamp, co2_ppm } => format!(
            "{}{DELIMITER}{co2_ppm} {CO2_UNIT}",
            timestamp.to_feed_string(zone)
        ),
        FeedRecord::Extended {
            timestamp,
            co2_ppm,
            temperature_c,
            relative_humidity,
        } => format!(
            "{}{DELIMITER}{co2_ppm} {CO2_UNIT}\
             {DELIMITER}{temperature_c} {TEMPERATURE_UNIT}\
             {DELIMITER}{relative_humidity} {HUMIDITY_UNIT}",
            timestamp.to_feed_string(zone)
        ),
    }
}

/// `<wall clock> [(<zone>)]`; the label only picks between repeated wall clocks.
fn timestamp_parts(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    all_consuming(tuple((
        take_till1(|c: char| c == '('),
        opt(preceded(
            space0,
            delimited(char('('), take_till1(|c: char| c == ')'), char(')')),
        )),
    )))(input)
}

/// `<number> [<unit>]`
fn measurement_parts(input: &str) -> IResult<&str, (f64, Option<&str>)> {
    all_consuming(tuple((
        double,
        opt(preceded(space1, take_while1(|c: char| !c.is_whitespace()))),
    )))(input)
}

fn parse_timestamp(field: &str, zone: CanonicalZone) -> Result<Timestamp, ParseFailure> {
    let field = field.trim();
    let (_, (wall_clock, label)) =
        timestamp_parts(field).map_err(|_| ParseFailure::BadTimestamp(field.to_string()))?;
    Timestamp::parse_wall_clock(wall_clock.trim_end(), zone, label.map(str::trim))
        .map_err(|e| ParseFailure::BadTimestamp(format!("{field}: {e}")))
}

fn parse_measurement(
    field: &str,
    name: &'static str,
    unit: &'static str,
) -> Result<f64, ParseFailure> {
    let field = field.trim();
    let (_, (value, found)) = measurement_parts(field).map_err(|_| {
        ParseFailure::MalformedRecord(format!("{name} is not a number: `{field}`"))
    })?;
    match found {
        Some(found) if found != unit => Err(ParseFailure::UnitMismatch {
            field: name,
            expected: unit,
            found: found.to_string(),
        }),
        _ => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use chrono_tz::America::New_York;
    use proptest::prelude::*;

    /// Wall clock in New York
    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Timestamp {
        let local = New_York.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap();
        Timestamp::from(local.with_timezone(&Utc))
    }

    #[test]
    fn test_parse_legacy_shape() {
        let sample = parse("05/03/2024 14:22:01 (EST),512 ppm").unwrap();
        assert_eq!(sample.timestamp(), ts(2024, 3, 5, 14, 22, 1));
        assert_eq!(sample.co2_ppm(), 512.0);
        assert_eq!(sample.climate(), None);
    }

    #[test]
    fn test_parse_extended_shape() {
        let sample = parse("05/03/2024 14:22:01 (EST),512 ppm,21.4 C,47 rel_humidity").unwrap();
        assert_eq!(sample.timestamp(), ts(2024, 3, 5, 14, 22, 1));
        assert_eq!(sample.co2_ppm(), 512.0);
        assert_eq!(sample.temperature_c(), Some(21.4));
        assert_eq!(sample.relative_humidity(), Some(47.0));
    }

    #[test]
    fn test_zone_label_does_not_shift_the_instant() {
        let est = parse("05/03/2024 14:22:01 (EST),512 ppm").unwrap();
        let utc = parse("05/03/2024 14:22:01 (UTC),512 ppm").unwrap();
        let bare = parse("05/03/2024 14:22:01,512 ppm").unwrap();
        assert_eq!(est.timestamp(), utc.timestamp());
        assert_eq!(est.timestamp(), bare.timestamp());
    }

    #[test]
    fn test_wall_clock_is_read_in_the_given_zone() {
        let line = "05/03/2024 14:22:01 (EST),512 ppm";
        let in_new_york = parse_in(line, New_York).unwrap();
        let in_utc = parse_in(line, chrono_tz::UTC).unwrap();
        assert_eq!(in_new_york.timestamp().since(in_utc.timestamp()).num_hours(), 5);
        assert_eq!(
            in_utc.timestamp().to_datetime(),
            Utc.with_ymd_and_hms(2024, 3, 5, 14, 22, 1).unwrap()
        );
    }

    #[test]
    fn test_repeated_hour_round_trips() {
        let first = parse("03/11/2024 01:30:00 (EDT),500 ppm").unwrap();
        let second = parse("03/11/2024 01:30:00 (EST),500 ppm").unwrap();
        assert_eq!(second.timestamp().since(first.timestamp()).num_hours(), 1);
        assert_eq!(serialize(&first), "03/11/2024 01:30:00 (EDT),500 ppm");
        assert_eq!(serialize(&second), "03/11/2024 01:30:00 (EST),500 ppm");
    }

    #[test]
    fn test_surrounding_whitespace_is_tolerated() {
        let sample =
            parse("  05/03/2024 14:22:01 (EST) , 512 ppm ,21.4 C, 47 rel_humidity \r").unwrap();
        assert_eq!(sample.co2_ppm(), 512.0);
        assert_eq!(sample.relative_humidity(), Some(47.0));
    }

    #[test]
    fn test_unit_suffix_is_optional() {
        let sample = parse("05/03/2024 14:22:01 (EST),512").unwrap();
        assert_eq!(sample.co2_ppm(), 512.0);
    }

    #[test]
    fn test_malformed_records() {
        for line in [
            "",
            "   ",
            "\t",
            "garbage",
            "05/03/2024 14:22:01 (EST),512 ppm,21.4 C",
            "05/03/2024 14:22:01 (EST),512 ppm,21.4 C,47 rel_humidity,1",
            "05/03/2024 14:22:01 (EST),abc ppm",
            "05/03/2024 14:22:01 (EST),512ppm",
            "05/03/2024 14:22:01 (EST),512 ppm extra",
            "05/03/2024 14:22:01 (EST),-5 ppm",
            "05/03/2024 14:22:01 (EST),512 ppm,21.4 C,147 rel_humidity",
        ] {
            assert!(
                matches!(parse(line), Err(ParseFailure::MalformedRecord(_))),
                "expected malformed record for {line:?}, got {:?}",
                parse(line)
            );
        }
    }

    #[test]
    fn test_unit_mismatch() {
        let err = parse("05/03/2024 14:22:01 (EST),512 ppb").unwrap_err();
        assert_eq!(
            err,
            ParseFailure::UnitMismatch {
                field: "co2_ppm",
                expected: "ppm",
                found: "ppb".to_string(),
            }
        );

        let err = parse("05/03/2024 14:22:01 (EST),512 ppm,70 F,47 rel_humidity").unwrap_err();
        assert!(matches!(
            err,
            ParseFailure::UnitMismatch { field: "temperature_c", .. }
        ));
    }

    #[test]
    fn test_bad_timestamps() {
        for line in [
            "2024-03-05 14:22:01,512 ppm",
            "05/03/2024,512 ppm",
            "31/02/2024 14:22:01 (EST),512 ppm",
            "05/03/2024 14:22:01 (EST) trailing,512 ppm",
            "05/03/2024 14:22:01 (EST,512 ppm",
            "(EST),512 ppm",
        ] {
            assert!(
                matches!(parse(line), Err(ParseFailure::BadTimestamp(_))),
                "expected bad timestamp for {line:?}, got {:?}",
                parse(line)
            );
        }
    }

    #[test]
    fn test_serialize_layout() {
        let legacy = Sample::legacy(ts(2024, 3, 5, 14, 22, 1), 512.0).unwrap();
        assert_eq!(serialize(&legacy), "05/03/2024 14:22:01 (EST),512 ppm");

        let extended = Sample::extended(ts(2024, 7, 5, 14, 22, 1), 512.5, 21.4, 47.0).unwrap();
        assert_eq!(
            serialize(&extended),
            "05/07/2024 14:22:01 (EDT),512.5 ppm,21.4 C,47 rel_humidity"
        );
        assert_eq!(
            serialize_in(&extended, chrono_tz::UTC),
            "05/07/2024 18:22:01 (UTC),512.5 ppm,21.4 C,47 rel_humidity"
        );
    }

    fn arb_sample() -> impl Strategy<Value = Sample> {
        // 1970..2100, second resolution
        let secs = 0i64..4_102_444_800;
        let co2 = 0.0f64..100_000.0;
        let climate = proptest::option::of((-60.0f64..80.0, 0.0f64..=100.0));
        (secs, co2, climate).prop_map(|(secs, co2, climate)| {
            let ts = Timestamp::from_secs(secs);
            match climate {
                None => Sample::legacy(ts, co2).unwrap(),
                Some((t, h)) => Sample::extended(ts, co2, t, h).unwrap(),
            }
        })
    }

    proptest! {
        #[test]
        fn prop_serialize_round_trips(sample in arb_sample()) {
            let line = serialize(&sample);
            prop_assert_eq!(parse(&line), Ok(sample));
        }

        #[test]
        fn prop_parse_never_panics(line in "\\PC*") {
            let _ = parse(&line);
        }

        #[test]
        fn prop_wrong_field_count_is_malformed(n in prop_oneof![1usize..2, 3usize..4, 5usize..10]) {
            let line = vec!["512 ppm"; n].join(",");
            prop_assert!(matches!(parse(&line), Err(ParseFailure::MalformedRecord(_))));
        }
    }
}
