//! Short duration strings: `500ms`, `10s`, `1m`.
//!
//! Only `<digits><unit>` is accepted. Signs, fractions, whitespace and
//! missing units are all "unparsed" so callers can fall back to a default.

use std::time::Duration;

/// Parse a duration string into milliseconds
pub fn parse_duration_ms(value: &str) -> Option<u64> {
    let split = value.find(|c: char| !c.is_ascii_digit())?;
    let (digits, unit) = value.split_at(split);
    if digits.is_empty() {
        return None;
    }

    let factor = match unit {
        "ms" => 1,
        "s" => 1_000,
        "m" => 60_000,
        _ => return None,
    };

    digits.parse::<u64>().ok()?.checked_mul(factor)
}

pub fn parse_duration(value: &str) -> Option<Duration> {
    parse_duration_ms(value).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units() {
        assert_eq!(parse_duration_ms("500ms"), Some(500));
        assert_eq!(parse_duration_ms("10s"), Some(10_000));
        assert_eq!(parse_duration_ms("1m"), Some(60_000));
        assert_eq!(parse_duration_ms("0ms"), Some(0));
    }

    #[test]
    fn test_rejects_malformed() {
        for input in [
            "", "10", "ms", "-5s", "1.5s", " 10s", "10s ", "10h", "10 s", "10S", "notaduration",
            "10sec",
        ] {
            assert_eq!(parse_duration_ms(input), None, "{:?} should not parse", input);
        }
    }

    #[test]
    fn test_overflow_is_unparsed() {
        assert_eq!(parse_duration_ms("99999999999999999999ms"), None);
        assert_eq!(parse_duration_ms(&format!("{}m", u64::MAX)), None);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("200ms"), Some(Duration::from_millis(200)));
    }
}
