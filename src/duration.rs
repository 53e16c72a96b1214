//! Duration strings such as `"300ms"`, `"5m"` or `"1h30m"`.
//!
//! Both `hostUpdateInterval` and `authExtraTime` use this format, parsed with
//! [`humantime`]. A value is a sequence of integers, each followed by a unit
//! (`ns`, `us`, `ms`, `s`, `m`, `h`, `d` and their long forms), optionally
//! separated by spaces.
//!
//! Anything humantime rejects, including fractions and negative values,
//! switches the setting off through [`parse_or_disabled`].

use std::time::Duration;

use tracing::{debug, warn};

/// Parse a duration string, ignoring surrounding whitespace.
///
/// # Errors
///
/// Returns a [`humantime::DurationError`] for empty input, a number without a
/// unit, an unknown unit, or a value that does not fit in a [`Duration`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use auth_gate::duration::parse_duration;
///
/// assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
/// assert!(parse_duration("").is_err());
/// ```
pub fn parse_duration(input: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(input.trim())
}

/// Parse an optional duration setting, falling back to zero (disabled).
///
/// Used for settings where a bad value switches the feature off instead of
/// failing startup. An empty value is simply unset; any other unusable value
/// is logged with the setting name.
pub fn parse_or_disabled(setting: &str, value: &str) -> Duration {
    if value.trim().is_empty() {
        debug!(setting, "Duration not set, feature disabled");
        return Duration::ZERO;
    }
    match parse_duration(value) {
        Ok(duration) => duration,
        Err(e) => {
            warn!(setting, error = %e, "Unusable duration, feature disabled");
            Duration::ZERO
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_units() {
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("300ms").unwrap(), Duration::from_millis(300));
        assert_eq!(parse_duration("10us").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_duration("7ns").unwrap(), Duration::from_nanos(7));
    }

    #[test]
    fn test_parse_compound() {
        assert_eq!(
            parse_duration("1h30m15s").unwrap(),
            Duration::from_secs(3600 + 1800 + 15)
        );
        assert_eq!(
            parse_duration("1h 30m").unwrap(),
            Duration::from_secs(5400)
        );
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(parse_duration("  5m\n").unwrap(), Duration::from_secs(300));
    }

    #[test]
    fn test_parse_errors() {
        for input in ["", "   ", "5", "soon", "-5m", "1.5s", "99999999999999999999999999h"] {
            assert!(parse_duration(input).is_err(), "{input:?}");
        }
    }

    #[test]
    fn test_parse_or_disabled_falls_back_to_zero() {
        for value in ["", "soon", "-5m", "1.5s"] {
            assert_eq!(
                parse_or_disabled("authExtraTime", value),
                Duration::ZERO,
                "{value:?}"
            );
        }
        assert_eq!(
            parse_or_disabled("authExtraTime", "250ms"),
            Duration::from_millis(250)
        );
    }
}
