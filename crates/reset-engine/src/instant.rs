//! Parsing of absolute (UTC) and local wall-clock instants from text.
//!
//! In Rust the two kinds are separate types: `DateTime<Utc>` for absolute
//! instants and `NaiveDateTime` for local wall-clock values. At the textual
//! boundary the distinction has to be checked, and a value of the wrong kind is
//! rejected with [`ResetError::WrongInstantKind`] rather than reinterpreted.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{ResetError, Result};

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Parse an RFC 3339 instant that must be UTC (`Z` or `+00:00`).
///
/// # Errors
/// - [`ResetError::WrongInstantKind`] if the text has a non-zero offset or no
///   offset at all.
/// - [`ResetError::InvalidInput`] if the text is not a datetime.
pub fn parse_utc(s: &str) -> Result<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(s) {
        Ok(dt) if dt.offset().local_minus_utc() == 0 => Ok(dt.with_timezone(&Utc)),
        Ok(dt) => Err(ResetError::WrongInstantKind(format!(
            "'{s}' has offset {}, expected UTC",
            dt.offset()
        ))),
        Err(e) => {
            if parse_naive(s).is_some() {
                Err(ResetError::WrongInstantKind(format!(
                    "'{s}' is a local wall-clock value, expected UTC"
                )))
            } else {
                Err(ResetError::InvalidInput(format!("'{s}': {e}")))
            }
        }
    }
}

/// Parse a local wall-clock datetime such as `2026-03-08T02:30:00`.
///
/// # Errors
/// - [`ResetError::WrongInstantKind`] if the text carries `Z` or an offset.
/// - [`ResetError::InvalidInput`] if the text is not a datetime.
pub fn parse_local(s: &str) -> Result<NaiveDateTime> {
    if let Some(naive) = parse_naive(s) {
        return Ok(naive);
    }
    if DateTime::parse_from_rfc3339(s).is_ok() {
        return Err(ResetError::WrongInstantKind(format!(
            "'{s}' carries an offset, expected a local wall-clock value"
        )));
    }
    Err(ResetError::InvalidInput(format!(
        "'{s}' is not a local datetime (expected YYYY-MM-DDTHH:MM[:SS[.fff]])"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn utc_accepts_z_and_zero_offset() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 15, 14, 0, 0).unwrap();
        assert_eq!(parse_utc("2026-03-15T14:00:00Z").unwrap(), expected);
        assert_eq!(parse_utc("2026-03-15T14:00:00+00:00").unwrap(), expected);
    }

    #[test]
    fn utc_rejects_other_kinds() {
        assert!(matches!(
            parse_utc("2026-03-15T14:00:00-05:00"),
            Err(ResetError::WrongInstantKind(_))
        ));
        assert!(matches!(
            parse_utc("2026-03-15T14:00:00"),
            Err(ResetError::WrongInstantKind(_))
        ));
        assert!(matches!(parse_utc("tomorrow"), Err(ResetError::InvalidInput(_))));
    }

    #[test]
    fn local_rejects_tagged_values() {
        assert!(parse_local("2026-03-08T02:30:00").is_ok());
        assert!(parse_local("2026-03-08T02:30").is_ok());
        assert!(matches!(
            parse_local("2026-03-08T02:30:00Z"),
            Err(ResetError::WrongInstantKind(_))
        ));
        assert!(matches!(parse_local("03/08/2026"), Err(ResetError::InvalidInput(_))));
    }
}
