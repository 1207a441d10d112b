//! Field extraction from raw table-cell text.
//!
//! The stats pages leave many cells empty or dashed when a racer has no
//! history for a window; those parse to `None`. A cell that holds text but
//! not a well-formed value is treated as corrupt (`MalformedField`) so it
//! cannot be confused with intentional absence downstream.

use crate::error::ParseError;

/// Placeholder strings the source uses for "not published".
const PLACEHOLDERS: [&str; 4] = ["-", "--", "−", "ー"];

fn is_absent(text: &str) -> bool {
    text.is_empty() || PLACEHOLDERS.contains(&text)
}

/// Extracts an optional rate from a percentage cell.
///
/// `"12.3%"` → `Some(0.123)`; empty/dash → `None`; anything else — a bare
/// number, garbage text, or a percentage outside [0,100] — is malformed.
pub fn extract_optional_rate(text: &str) -> Result<Option<f64>, ParseError> {
    let cleaned = text.trim();
    if is_absent(cleaned) {
        return Ok(None);
    }

    let percent_str = cleaned
        .strip_suffix('%')
        .ok_or_else(|| ParseError::malformed("rate", cleaned))?;
    let percent: f64 = percent_str
        .trim()
        .parse()
        .map_err(|_| ParseError::malformed("rate", cleaned))?;

    if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
        return Err(ParseError::malformed("rate", cleaned));
    }

    Ok(Some(percent / 100.0))
}

/// Extracts an optional timing value (average ST seconds or an ST-rank
/// figure) from a plain decimal cell.
pub fn extract_optional_timing(text: &str) -> Result<Option<f64>, ParseError> {
    let cleaned = text.trim();
    if is_absent(cleaned) {
        return Ok(None);
    }

    let value: f64 = cleaned
        .parse()
        .map_err(|_| ParseError::malformed("timing", cleaned))?;

    if !value.is_finite() || value < 0.0 {
        return Err(ParseError::malformed("timing", cleaned));
    }

    Ok(Some(value))
}

/// Extracts an optional non-negative count (e.g. first places in the last 10
/// races).
pub fn extract_optional_count(text: &str) -> Result<Option<u32>, ParseError> {
    let cleaned = text.trim();
    if is_absent(cleaned) {
        return Ok(None);
    }

    cleaned
        .parse::<u32>()
        .map(Some)
        .map_err(|_| ParseError::malformed("count", cleaned))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_percentage() {
        let rate = extract_optional_rate("12.3%").unwrap().unwrap();
        assert!((rate - 0.123).abs() < 1e-12);
        assert_eq!(extract_optional_rate("0%").unwrap(), Some(0.0));
        assert_eq!(extract_optional_rate("100%").unwrap(), Some(1.0));
        assert_eq!(extract_optional_rate(" 45.6% ").unwrap(), Some(0.456));
    }

    #[test]
    fn test_rate_absence() {
        assert_eq!(extract_optional_rate("").unwrap(), None);
        assert_eq!(extract_optional_rate("  ").unwrap(), None);
        assert_eq!(extract_optional_rate("-").unwrap(), None);
        assert_eq!(extract_optional_rate("ー").unwrap(), None);
    }

    #[test]
    fn test_rate_malformed() {
        // non-placeholder garbage must error, never silently become None
        assert!(extract_optional_rate("abc").is_err());
        assert!(extract_optional_rate("abc%").is_err());
        // a bare number without '%' is not a rate cell
        assert!(extract_optional_rate("12.3").is_err());
        // legitimately parsed percentages never leave [0,1]
        assert!(extract_optional_rate("150%").is_err());
        assert!(extract_optional_rate("-5%").is_err());
    }

    #[test]
    fn test_rate_in_unit_interval() {
        for s in ["0%", "0.1%", "50%", "99.9%", "100%"] {
            let v = extract_optional_rate(s).unwrap().unwrap();
            assert!((0.0..=1.0).contains(&v), "{} parsed outside [0,1]", s);
        }
    }

    #[test]
    fn test_timing_decimal() {
        assert_eq!(extract_optional_timing("0.15").unwrap(), Some(0.15));
        assert_eq!(extract_optional_timing("3.2").unwrap(), Some(3.2));
    }

    #[test]
    fn test_timing_absence_and_malformed() {
        assert_eq!(extract_optional_timing("-").unwrap(), None);
        assert_eq!(extract_optional_timing("").unwrap(), None);
        assert!(extract_optional_timing("F.05").is_err());
        assert!(extract_optional_timing("-0.1").is_err());
    }

    #[test]
    fn test_count() {
        assert_eq!(extract_optional_count("4").unwrap(), Some(4));
        assert_eq!(extract_optional_count("-").unwrap(), None);
        assert!(extract_optional_count("4.5").is_err());
    }
}
