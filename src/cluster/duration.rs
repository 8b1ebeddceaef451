//! Duration codecs for cluster parameters.
//!
//! The cluster encodes durations on the wire as integer nanoseconds. On the
//! command line and in `getconf` output they use the compact human form
//! (`5m`, `1h 30m`, `250ms`).

use std::time::Duration;

use thiserror::Error;

/// Largest duration the wire format can carry (`i64::MAX` nanoseconds).
pub const MAX: Duration = Duration::from_nanos(i64::MAX as u64);

#[derive(Debug, Error)]
pub enum DurationError {
    #[error(transparent)]
    Syntax(#[from] humantime::DurationError),

    #[error("longer than the maximum of {max}", max = format(MAX))]
    TooLarge,
}

/// Parse a human-readable duration such as `10m` or `1h 30m`.
///
/// Values above [`MAX`] are rejected so every parsed duration can be stored.
pub fn parse(input: &str) -> Result<Duration, DurationError> {
    let duration = humantime::parse_duration(input.trim())?;
    if duration > MAX {
        return Err(DurationError::TooLarge);
    }
    Ok(duration)
}

/// Render a duration in the form accepted by [`parse`].
pub fn format(duration: Duration) -> String {
    if duration.is_zero() {
        return "0s".to_string();
    }
    humantime::format_duration(duration).to_string()
}

/// Serde adapter storing a [`Duration`] as signed integer nanoseconds.
pub mod nanos {
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let nanos = i64::try_from(value.as_nanos()).map_err(|_| {
            S::Error::custom(format!("duration {:?} overflows i64 nanoseconds", value))
        })?;
        serializer.serialize_i64(nanos)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let nanos = i64::deserialize(deserializer)?;
        let nanos = u64::try_from(nanos)
            .map_err(|_| D::Error::custom(format!("negative duration: {}ns", nanos)))?;
        Ok(Duration::from_nanos(nanos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse(" 250ms ").unwrap(), Duration::from_millis(250));
        assert!(parse("ten minutes").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_format_is_parseable() {
        for d in [
            Duration::from_secs(600),
            Duration::from_secs(5400),
            Duration::from_secs(86_400),
            Duration::from_millis(1500),
            Duration::ZERO,
        ] {
            assert_eq!(parse(&format(d)).unwrap(), d, "format({:?})", d);
        }
        assert_eq!(format(Duration::from_secs(600)), "10m");
    }

    #[test]
    fn test_parse_rejects_unencodable() {
        assert!(matches!(parse("600years"), Err(DurationError::TooLarge)));
        assert!(parse("292years").unwrap() < MAX);
        assert!(DurationError::TooLarge.to_string().contains("292years"));
    }
}
