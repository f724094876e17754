//! Duration literals as used by push intervals: `100ms`, `1s`, `1m30s`, `1.5h`, `2d`.
//!
//! A literal is one or more `<number><unit>` components, where the number may
//! carry a fractional part. A bare `0` is the only literal allowed without a unit.
use std::fmt;
use std::time::Duration;

use serde::de::{self, Deserialize, Deserializer, Visitor};
use thiserror::Error;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;
const NANOS_PER_MIN: u128 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MIN;
const NANOS_PER_DAY: u128 = 24 * NANOS_PER_HOUR;

// more fractional digits than this cannot change a nanosecond count
const MAX_FRACTION_DIGITS: usize = 18;

/// Errors produced while parsing a duration literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseDurationError {
    #[error("invalid duration \"{0}\"")]
    Invalid(String),

    #[error("missing unit in duration \"{0}\"")]
    MissingUnit(String),

    #[error("unknown unit \"{unit}\" in duration \"{literal}\"")]
    UnknownUnit { unit: String, literal: String },

    #[error("negative duration \"{0}\" is not allowed")]
    Negative(String),

    #[error("duration \"{0}\" is out of range")]
    Overflow(String),
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(NANOS_PER_MIN),
        "h" => Some(NANOS_PER_HOUR),
        "d" => Some(NANOS_PER_DAY),
        _ => None,
    }
}

fn leading_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

/// Parses a duration literal such as `100ms` or `1h15m`.
///
/// ## Errors
///
/// Returns an error naming the literal if it is empty, negative, lacks a unit,
/// uses an unknown unit or does not fit in a [`Duration`].
pub fn parse_duration(literal: &str) -> Result<Duration, ParseDurationError> {
    let mut rest = literal;
    if rest.starts_with('-') {
        return Err(ParseDurationError::Negative(literal.to_string()));
    }
    if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(ParseDurationError::Invalid(literal.to_string()));
    }

    let overflow = || ParseDurationError::Overflow(literal.to_string());
    let mut total: u128 = 0;
    while !rest.is_empty() {
        let (whole, tail) = leading_digits(rest);
        let (fraction, tail) = match tail.strip_prefix('.') {
            Some(after_dot) => leading_digits(after_dot),
            None => ("", tail),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(ParseDurationError::Invalid(literal.to_string()));
        }

        let unit_end = tail
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);
        if unit.is_empty() {
            return Err(ParseDurationError::MissingUnit(literal.to_string()));
        }
        let scale = unit_nanos(unit).ok_or_else(|| ParseDurationError::UnknownUnit {
            unit: unit.to_string(),
            literal: literal.to_string(),
        })?;

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let mut component = whole.checked_mul(scale).ok_or_else(overflow)?;

        let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
        if !fraction.is_empty() {
            let digits: u128 = fraction.parse().map_err(|_| overflow())?;
            let divisor = 10u128.pow(fraction.len() as u32);
            component = component
                .checked_add(digits * scale / divisor)
                .ok_or_else(overflow)?;
        }

        total = total.checked_add(component).ok_or_else(overflow)?;
        rest = tail;
    }

    let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| overflow())?;
    Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}

// `12.340` with a unit of 1000 renders as `12.34`
fn push_fraction(out: &mut String, value: u128, unit: u128) {
    let whole = value / unit;
    let fraction = value % unit;
    out.push_str(&whole.to_string());
    if fraction != 0 {
        let width = unit.to_string().len() - 1;
        let digits = format!("{:0width$}", fraction, width = width);
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
}

/// Renders a duration in the literal grammar accepted by [`parse_duration`].
///
/// Sub-second durations use the largest fitting unit (`250ms`, `1.5µs`), longer
/// ones are split into hours, minutes and seconds (`1h0m0s`, `1m30s`).
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    let mut out = String::new();
    if nanos == 0 {
        out.push_str("0s");
    } else if nanos < NANOS_PER_MICRO {
        push_fraction(&mut out, nanos, 1);
        out.push_str("ns");
    } else if nanos < NANOS_PER_MILLI {
        push_fraction(&mut out, nanos, NANOS_PER_MICRO);
        out.push_str("µs");
    } else if nanos < NANOS_PER_SEC {
        push_fraction(&mut out, nanos, NANOS_PER_MILLI);
        out.push_str("ms");
    } else {
        let hours = nanos / NANOS_PER_HOUR;
        let minutes = (nanos % NANOS_PER_HOUR) / NANOS_PER_MIN;
        if hours > 0 {
            out.push_str(&format!("{}h{}m", hours, minutes));
        } else if minutes > 0 {
            out.push_str(&format!("{}m", minutes));
        }
        push_fraction(&mut out, nanos % NANOS_PER_MIN, NANOS_PER_SEC);
        out.push('s');
    }
    out
}

/// A duration read from a JSON document: either a literal string or a whole
/// number of milliseconds.
pub(crate) struct DurationLiteral(pub(crate) Duration);

impl<'de> Deserialize<'de> for DurationLiteral {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LiteralVisitor;

        impl<'de> Visitor<'de> for LiteralVisitor {
            type Value = DurationLiteral;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a duration string like \"1s\" or a number of milliseconds")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                parse_duration(v).map(DurationLiteral).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(DurationLiteral(Duration::from_millis(v)))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(|ms| DurationLiteral(Duration::from_millis(ms)))
                    .map_err(|_| E::custom(format!("negative duration {}ms is not allowed", v)))
            }
        }

        deserializer.deserialize_any(LiteralVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::{format_duration, parse_duration, ParseDurationError};
    use proptest::prelude::*;
    use std::time::Duration;

    #[test]
    fn test_parse() {
        assert_eq!(parse_duration("1s"), Ok(Duration::from_secs(1)));
        assert_eq!(parse_duration("100ms"), Ok(Duration::from_millis(100)));
        assert_eq!(parse_duration("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("1.5h"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration(".5s"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("2d1h"), Ok(Duration::from_secs(2 * 86400 + 3600)));
        assert_eq!(parse_duration("250us"), Ok(Duration::from_micros(250)));
        assert_eq!(parse_duration("250µs"), Ok(Duration::from_micros(250)));
        assert_eq!(parse_duration("+10ns"), Ok(Duration::from_nanos(10)));
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_duration(""),
            Err(ParseDurationError::Invalid(String::new()))
        );
        assert_eq!(
            parse_duration("100"),
            Err(ParseDurationError::MissingUnit("100".to_string()))
        );
        assert_eq!(
            parse_duration("1x"),
            Err(ParseDurationError::UnknownUnit {
                unit: "x".to_string(),
                literal: "1x".to_string()
            })
        );
        assert_eq!(
            parse_duration("-1s"),
            Err(ParseDurationError::Negative("-1s".to_string()))
        );
        assert_eq!(
            parse_duration("s"),
            Err(ParseDurationError::Invalid("s".to_string()))
        );
        assert!(matches!(
            parse_duration("99999999999999999999999999999999999999999h"),
            Err(ParseDurationError::Overflow(_))
        ));
        // whole days fit, the fraction on top of them does not
        assert_eq!(
            parse_duration("3938453320844195178974243.999999d"),
            Err(ParseDurationError::Overflow(
                "3938453320844195178974243.999999d".to_string()
            ))
        );
        assert!(matches!(
            parse_duration("1s3938453320844195178974243.999999d"),
            Err(ParseDurationError::Overflow(_))
        ));
    }

    #[test]
    fn test_format() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_nanos(15)), "15ns");
        assert_eq!(format_duration(Duration::from_nanos(1500)), "1.5µs");
        assert_eq!(format_duration(Duration::from_millis(100)), "100ms");
        assert_eq!(format_duration(Duration::from_secs(1)), "1s");
        assert_eq!(format_duration(Duration::from_millis(1250)), "1.25s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h0m0s");
    }

    #[test]
    fn test_json() {
        let parsed: super::DurationLiteral = serde_json::from_str("\"100ms\"").unwrap();
        assert_eq!(parsed.0, Duration::from_millis(100));

        let parsed: super::DurationLiteral = serde_json::from_str("1500").unwrap();
        assert_eq!(parsed.0, Duration::from_millis(1500));

        let err = serde_json::from_str::<super::DurationLiteral>("\"10 apples\"")
            .err()
            .unwrap();
        assert!(err.to_string().contains("10 apples"));

        assert!(serde_json::from_str::<super::DurationLiteral>("-5").is_err());
    }

    proptest! {
        #[test]
        fn test_parse_no_panic(s in ".*") {
            let _ = parse_duration(&s);
        }

        #[test]
        fn test_format_parses_back(nanos in 0u64..=u64::MAX / 2) {
            let duration = Duration::from_nanos(nanos);
            prop_assert_eq!(parse_duration(&format_duration(duration)), Ok(duration));
        }
    }
}
