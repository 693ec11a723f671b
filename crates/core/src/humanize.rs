// crates/core/src/humanize.rs
//! Compact human-readable durations ("2h 5m", "3d 4h", "12s").

use std::time::Duration;

const UNITS: &[(u64, &str)] = &[
    (7 * 24 * 3600, "w"),
    (24 * 3600, "d"),
    (3600, "h"),
    (60, "m"),
    (1, "s"),
];

/// Format a duration using at most its two largest non-zero units.
///
/// Sub-second remainders are dropped and lower units are truncated, never
/// rounded: 59m 59.9s formats as "59m 59s", and 1h 0m 59s as "1h".
/// Anything under a second formats as "0s".
pub fn format_duration_short(d: Duration) -> String {
    let mut remaining = d.as_secs();
    if remaining == 0 {
        return "0s".to_string();
    }

    let mut parts = Vec::with_capacity(2);
    for &(unit_secs, suffix) in UNITS {
        if remaining >= unit_secs {
            parts.push(format!("{}{}", remaining / unit_secs, suffix));
            remaining %= unit_secs;
        } else if !parts.is_empty() {
            // The next unit down is zero: stop rather than skip over it, so
            // "1h 0m 5s" reports "1h" instead of jumping to seconds.
            break;
        }
        if parts.len() == 2 {
            break;
        }
    }
    parts.join(" ")
}

// Roughly 31k years; keeps `Duration::from_secs_f64` away from overflow.
const MAX_DISPLAY_SECS: f64 = 1e12;

/// Format a (possibly fractional) number of seconds. Negative and
/// non-finite inputs format as "0s".
pub fn format_secs_short(secs: f64) -> String {
    if !secs.is_finite() || secs <= 0.0 {
        return "0s".to_string();
    }
    format_duration_short(Duration::from_secs_f64(secs.min(MAX_DISPLAY_SECS)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_and_subsecond() {
        assert_eq!(format_duration_short(Duration::ZERO), "0s");
        assert_eq!(format_duration_short(Duration::from_millis(999)), "0s");
    }

    #[test]
    fn test_two_largest_units() {
        assert_eq!(format_duration_short(Duration::from_secs(42)), "42s");
        assert_eq!(format_duration_short(Duration::from_secs(125)), "2m 5s");
        assert_eq!(
            format_duration_short(Duration::from_secs(2 * 3600 + 5 * 60 + 30)),
            "2h 5m"
        );
        assert_eq!(
            format_duration_short(Duration::from_secs(3 * 86400 + 4 * 3600 + 59)),
            "3d 4h"
        );
        assert_eq!(
            format_duration_short(Duration::from_secs(15 * 86400)),
            "2w 1d"
        );
    }

    #[test]
    fn test_truncates_instead_of_rounding() {
        assert_eq!(
            format_duration_short(Duration::from_millis(3599_900)),
            "59m 59s"
        );
        assert_eq!(format_duration_short(Duration::from_secs(3600 + 59)), "1h");
    }

    #[test]
    fn test_format_secs_guards() {
        assert_eq!(format_secs_short(-5.0), "0s");
        assert_eq!(format_secs_short(f64::NAN), "0s");
        assert_eq!(format_secs_short(f64::INFINITY), "0s");
        assert_eq!(format_secs_short(90.7), "1m 30s");
    }
}
