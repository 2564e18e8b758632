//! Free-form duration strings such as `"2h"`, `"30m"`, `"1.5h"` or `"2h 30m"`.
//!
//! The string stays the source of truth; it is re-parsed whenever an
//! aggregate is computed.

use std::sync::LazyLock;

use regex::Regex;

static HOURS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*h").expect("hours pattern is valid")
});

static MINUTES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*m").expect("minutes pattern is valid"));

/// Total minutes described by `input`. Malformed input counts as zero.
pub fn parse_minutes(input: &str) -> u32 {
    let hours = HOURS_RE
        .captures(input)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .filter(|hours| hours.is_finite())
        .map(|hours| (hours * 60.0).round().min(u32::MAX as f64) as u32)
        .unwrap_or(0);

    let minutes = MINUTES_RE
        .captures(input)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .unwrap_or(0);

    hours.saturating_add(minutes)
}

pub fn format_minutes(total: u32) -> String {
    let hours = total / 60;
    let minutes = total % 60;
    match (hours, minutes) {
        (0, 0) => "0m".to_string(),
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_tokens() {
        assert_eq!(parse_minutes("2h"), 120);
        assert_eq!(parse_minutes("30m"), 30);
        assert_eq!(parse_minutes("45 min"), 45);
    }

    #[test]
    fn parses_combined_tokens_in_either_order() {
        assert_eq!(parse_minutes("2h 30m"), 150);
        assert_eq!(parse_minutes("30m 2h"), 150);
        assert_eq!(parse_minutes("1H15M"), 75);
    }

    #[test]
    fn fractional_hours_are_converted() {
        assert_eq!(parse_minutes("1.5h"), 90);
        assert_eq!(parse_minutes("0.25h"), 15);
    }

    #[test]
    fn garbage_degrades_to_zero() {
        assert_eq!(parse_minutes(""), 0);
        assert_eq!(parse_minutes("garbage"), 0);
        assert_eq!(parse_minutes("h m"), 0);
    }

    #[test]
    fn formats_each_shape() {
        assert_eq!(format_minutes(0), "0m");
        assert_eq!(format_minutes(45), "45m");
        assert_eq!(format_minutes(120), "2h");
        assert_eq!(format_minutes(330), "5h 30m");
    }

    #[test]
    fn format_then_parse_is_identity() {
        for hours in 0..30 {
            for minutes in 0..60 {
                let total = hours * 60 + minutes;
                assert_eq!(parse_minutes(&format_minutes(total)), total, "{total}");
            }
        }
    }
}
