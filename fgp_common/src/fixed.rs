//! Shared plumbing for the scale-2 fixed-point newtypes.
//!
//! Money and stock quantities are both stored as `i64` counts of hundredths. The helpers here
//! parse and render the human "123.45" form without ever touching a float.

use thiserror::Error;

pub(crate) const SCALE: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Not a valid fixed-point value: {0}")]
pub struct FixedPointError(pub String);

/// Parses a decimal string with at most two fractional digits into hundredths.
pub(crate) fn parse_hundredths(s: &str) -> Result<i64, FixedPointError> {
    let s = s.trim();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, s),
    };
    if digits.is_empty() {
        return Err(FixedPointError(s.to_string()));
    }
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(FixedPointError(s.to_string()));
    }
    if frac_part.len() > 2 || !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(FixedPointError(s.to_string()));
    }
    let whole: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| FixedPointError(s.to_string()))?
    };
    let mut frac: i64 = if frac_part.is_empty() {
        0
    } else {
        frac_part.parse().map_err(|_| FixedPointError(s.to_string()))?
    };
    if frac_part.len() == 1 {
        frac *= 10;
    }
    whole
        .checked_mul(SCALE)
        .and_then(|w| w.checked_add(frac))
        .and_then(|v| v.checked_mul(sign))
        .ok_or_else(|| FixedPointError(format!("{s} overflows")))
}

/// Renders hundredths as a decimal string with exactly two fractional digits.
pub(crate) fn format_hundredths(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    format!("{sign}{}.{:02}", abs / SCALE as u64, abs % SCALE as u64)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_common_forms() {
        assert_eq!(parse_hundredths("0").unwrap(), 0);
        assert_eq!(parse_hundredths("5").unwrap(), 500);
        assert_eq!(parse_hundredths("4.5").unwrap(), 450);
        assert_eq!(parse_hundredths("12345.67").unwrap(), 1_234_567);
        assert_eq!(parse_hundredths("-3.25").unwrap(), -325);
        assert_eq!(parse_hundredths(".5").unwrap(), 50);
    }

    #[test]
    fn rejects_junk() {
        for bad in ["", "-", "1.2.3", "1.234", "abc", "1,5", "--2"] {
            assert!(parse_hundredths(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn formats_round_trip() {
        for v in [0, 1, 99, 100, 450, 1_234_567, -325] {
            assert_eq!(parse_hundredths(&format_hundredths(v)).unwrap(), v);
        }
    }
}
