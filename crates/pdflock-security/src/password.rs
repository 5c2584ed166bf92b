// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Password policy.
//
// Two ways to obtain the single password applied to a batch:
//   - a literal typed by the user, checked against the minimum length;
//   - a password derived from a numeric identifier in a file name, optionally
//     combined with a date, under one of five fixed patterns.
// Either must resolve before any file is touched.

use std::str::FromStr;
use std::sync::LazyLock;

use pdflock_core::error::{LockerError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 7–10 ASCII digits with no digit directly before or after.
static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9])([0-9]{7,10})(?:[^0-9]|$)").expect("identifier pattern is valid")
});

/// Check a literal password: non-blank and at least `min_len` characters.
pub fn validate_password(password: &str, min_len: usize) -> Result<()> {
    if password.trim().is_empty() {
        return Err(LockerError::PasswordEmpty);
    }
    if password.chars().count() < min_len {
        return Err(LockerError::PasswordTooShort { min: min_len });
    }
    Ok(())
}

/// First run of 7–10 consecutive digits bounded by non-digits or the string
/// edges, e.g. `CT_12345678_20260110.pdf` → `12345678`.
pub fn extract_identifier(filename: &str) -> Option<String> {
    IDENTIFIER_RE
        .captures(filename)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Closed set of derivation patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordPattern {
    /// The identifier itself.
    IdOnly,
    /// The date (`YYYYMMDD`) alone.
    BirthOnly,
    /// `identifier-MMDD`.
    IdMmdd,
    /// `identifier-YYYYMMDD`.
    IdYyyymmdd,
    /// No derivation; the caller supplies a literal password.
    Custom,
}

impl PasswordPattern {
    pub const ALL: [PasswordPattern; 5] = [
        Self::IdOnly,
        Self::BirthOnly,
        Self::IdMmdd,
        Self::IdYyyymmdd,
        Self::Custom,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::IdOnly => "id_only",
            Self::BirthOnly => "birth_only",
            Self::IdMmdd => "id_mmdd",
            Self::IdYyyymmdd => "id_yyyymmdd",
            Self::Custom => "custom",
        }
    }

    /// Whether the pattern reads the date component.
    pub fn uses_date(&self) -> bool {
        matches!(self, Self::BirthOnly | Self::IdMmdd | Self::IdYyyymmdd)
    }
}

impl std::fmt::Display for PasswordPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PasswordPattern {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|pattern| pattern.key() == s)
            .ok_or_else(|| {
                let keys: Vec<&str> = Self::ALL.iter().map(|p| p.key()).collect();
                format!("unknown pattern `{s}` (expected one of {})", keys.join(", "))
            })
    }
}

/// Derive a password. May return an empty string (`custom`, or `birth_only`
/// without a date); callers treat that as "no password".
pub fn derive_password(identifier: &str, pattern: PasswordPattern, date: Option<&str>) -> String {
    let full_date = date.filter(|d| d.len() == 8 && d.bytes().all(|b| b.is_ascii_digit()));

    match pattern {
        PasswordPattern::IdOnly => identifier.to_string(),
        PasswordPattern::BirthOnly => date.unwrap_or_default().to_string(),
        PasswordPattern::IdMmdd => match full_date {
            Some(d) => format!("{identifier}-{}", &d[4..8]),
            None => identifier.to_string(),
        },
        PasswordPattern::IdYyyymmdd => match full_date {
            Some(d) => format!("{identifier}-{d}"),
            None => identifier.to_string(),
        },
        PasswordPattern::Custom => String::new(),
    }
}

/// Validate a date typed as separate fields and return it as `YYYYMMDD`.
///
/// The year must be exactly four digits; month 1–12 and day 1–31 may be typed
/// with or without a leading zero.
pub fn validate_date(year: &str, month: &str, day: &str) -> Result<String> {
    let year = year.trim();
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LockerError::InvalidDate(
            "the year must be exactly 4 digits".into(),
        ));
    }
    let month = parse_field(month, 12).ok_or_else(|| {
        LockerError::InvalidDate("the month must be a number from 1 to 12".into())
    })?;
    let day = parse_field(day, 31).ok_or_else(|| {
        LockerError::InvalidDate("the day must be a number from 1 to 31".into())
    })?;
    Ok(format!("{year}{month:02}{day:02}"))
}

fn parse_field(raw: &str, max: u32) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() > 2 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u32>().ok().filter(|v| (1..=max).contains(v))
}

/// The password request for one batch.
#[derive(Clone, PartialEq, Eq)]
pub enum PasswordSpec {
    Literal(String),
    Derived {
        identifier: String,
        pattern: PasswordPattern,
        date: Option<String>,
    },
}

impl PasswordSpec {
    /// Build a derivation request from the identifier found in `filename`.
    pub fn from_filename(
        filename: &str,
        pattern: PasswordPattern,
        date: Option<String>,
    ) -> Option<Self> {
        extract_identifier(filename).map(|identifier| Self::Derived {
            identifier,
            pattern,
            date,
        })
    }

    /// Produce the password to apply, or refuse the batch.
    pub fn resolve(&self, min_len: usize) -> Result<String> {
        match self {
            Self::Literal(password) => {
                validate_password(password, min_len)?;
                Ok(password.clone())
            }
            Self::Derived {
                identifier,
                pattern,
                date,
            } => {
                let derived = derive_password(identifier, *pattern, date.as_deref());
                if derived.is_empty() {
                    return Err(LockerError::PasswordEmpty);
                }
                debug!(pattern = %pattern, "password derived from identifier");
                Ok(derived)
            }
        }
    }
}

// Passwords never reach logs through `{:?}`.
impl std::fmt::Debug for PasswordSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(_) => f.write_str("Literal(<redacted>)"),
            Self::Derived { pattern, date, .. } => f
                .debug_struct("Derived")
                .field("identifier", &"<redacted>")
                .field("pattern", pattern)
                .field("has_date", &date.is_some())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_length_policy() {
        assert!(matches!(
            validate_password("abc", 4),
            Err(LockerError::PasswordTooShort { min: 4 })
        ));
        assert!(matches!(validate_password("", 4), Err(LockerError::PasswordEmpty)));
        assert!(matches!(validate_password("   ", 4), Err(LockerError::PasswordEmpty)));
        assert!(validate_password("abcd", 4).is_ok());
        // Counted in characters, not bytes.
        assert!(validate_password("鍵付き鍵", 4).is_ok());
    }

    #[test]
    fn identifier_extraction() {
        assert_eq!(
            extract_identifier("CT_12345678_20260110.pdf").as_deref(),
            Some("12345678")
        );
        assert_eq!(extract_identifier("report.pdf"), None);
        assert_eq!(extract_identifier("1234567.pdf").as_deref(), Some("1234567"));
        // Too short, then too long, then a valid run.
        assert_eq!(extract_identifier("a123456_12345678901_9876543.pdf").as_deref(), Some("9876543"));
    }

    #[test]
    fn derivation_patterns() {
        assert_eq!(
            derive_password("12345678", PasswordPattern::IdMmdd, Some("19800101")),
            "12345678-0101"
        );
        assert_eq!(
            derive_password("12345678", PasswordPattern::IdYyyymmdd, Some("19800101")),
            "12345678-19800101"
        );
        assert_eq!(derive_password("12345678", PasswordPattern::Custom, Some("")), "");
        assert_eq!(derive_password("12345678", PasswordPattern::IdOnly, None), "12345678");
        assert_eq!(
            derive_password("12345678", PasswordPattern::BirthOnly, Some("19800101")),
            "19800101"
        );
        assert_eq!(derive_password("12345678", PasswordPattern::BirthOnly, None), "");
    }

    #[test]
    fn malformed_date_falls_back_to_identifier() {
        assert_eq!(
            derive_password("12345678", PasswordPattern::IdMmdd, Some("1980")),
            "12345678"
        );
        assert_eq!(
            derive_password("12345678", PasswordPattern::IdYyyymmdd, None),
            "12345678"
        );
    }

    #[test]
    fn pattern_keys_round_trip() {
        for pattern in PasswordPattern::ALL {
            assert_eq!(pattern.key().parse::<PasswordPattern>(), Ok(pattern));
        }
        assert!("birthday".parse::<PasswordPattern>().is_err());
    }

    #[test]
    fn date_validation() {
        assert_eq!(validate_date("1980", "1", "01").expect("valid"), "19800101");
        assert_eq!(validate_date("2026", "12", "31").expect("valid"), "20261231");
        assert!(matches!(validate_date("80", "1", "1"), Err(LockerError::InvalidDate(_))));
        assert!(matches!(validate_date("1980", "13", "1"), Err(LockerError::InvalidDate(_))));
        assert!(matches!(validate_date("1980", "0", "1"), Err(LockerError::InvalidDate(_))));
        assert!(matches!(validate_date("1980", "1", "32"), Err(LockerError::InvalidDate(_))));
        assert!(matches!(validate_date("1980", "ab", "1"), Err(LockerError::InvalidDate(_))));
    }

    #[test]
    fn spec_resolution() {
        let literal = PasswordSpec::Literal("abc".into());
        assert!(literal.resolve(4).is_err());

        let derived = PasswordSpec::from_filename(
            "CT_12345678_20260110.pdf",
            PasswordPattern::IdMmdd,
            Some("19800101".into()),
        )
        .expect("identifier present");
        assert_eq!(derived.resolve(4).expect("resolves"), "12345678-0101");

        let custom = PasswordSpec::Derived {
            identifier: "12345678".into(),
            pattern: PasswordPattern::Custom,
            date: None,
        };
        assert!(matches!(custom.resolve(4), Err(LockerError::PasswordEmpty)));
    }

    #[test]
    fn debug_output_is_redacted() {
        let spec = PasswordSpec::Literal("hunter22".into());
        assert!(!format!("{spec:?}").contains("hunter22"));
    }
}
