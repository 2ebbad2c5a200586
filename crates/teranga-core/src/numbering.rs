//! # Document Numbering
//!
//! Formatting rules for the gapless numbers handed out by the sequence
//! allocator in teranga-db.
//!
//! ## Format
//! ```text
//!   FA 2026 - 00001
//!   ── ────   ─────
//!   │   │       └── sequence, zero-padded to 5 digits (wider if it overflows)
//!   │   └────────── fiscal year
//!   └────────────── prefix of the sequence type
//! ```
//!
//! ## Counter Rules
//! - one counter per sequence type, incremented by a single atomic statement
//! - the first allocation of a later fiscal year restarts the counter at 1
//! - an allocation for an earlier fiscal year is refused (closed year)
//! - counters never go down; a cancelled document keeps its number

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::SequenceType;

/// Width of the zero-padded sequence part.
pub const SEQUENCE_WIDTH: usize = 5;

/// Builds `{prefix}{year}-{sequence:05}`.
///
/// ```rust
/// use teranga_core::numbering::format_number;
///
/// assert_eq!(format_number("FA", 2026, 1), "FA2026-00001");
/// assert_eq!(format_number("BCF", 2026, 123_456), "BCF2026-123456");
/// ```
pub fn format_number(prefix: &str, fiscal_year: i32, sequence: i64) -> String {
    format!(
        "{}{}-{:0width$}",
        prefix,
        fiscal_year,
        sequence,
        width = SEQUENCE_WIDTH
    )
}

/// The fiscal year a date belongs to (calendar year).
pub fn fiscal_year_of(date: NaiveDate) -> i32 {
    date.year()
}

/// A number handed out by the allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AllocatedNumber {
    pub sequence_type: SequenceType,
    pub fiscal_year: i32,
    pub sequence: i64,
    pub formatted: String,
}

impl AllocatedNumber {
    pub fn new(sequence_type: SequenceType, prefix: &str, fiscal_year: i32, sequence: i64) -> Self {
        AllocatedNumber {
            sequence_type,
            fiscal_year,
            sequence,
            formatted: format_number(prefix, fiscal_year, sequence),
        }
    }
}

/// Current state of one counter, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SequenceState {
    pub sequence_type: SequenceType,
    pub prefix: String,
    pub fiscal_year: i32,
    /// Last number handed out; 0 before the first allocation of the year.
    pub current_value: i64,
}

impl SequenceState {
    /// The number the next allocation in `fiscal_year` would produce.
    pub fn preview_next(&self, fiscal_year: i32) -> Option<String> {
        if fiscal_year < self.fiscal_year {
            return None;
        }
        let next = if fiscal_year == self.fiscal_year {
            self.current_value + 1
        } else {
            1
        };
        Some(format_number(&self.prefix, fiscal_year, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number("FA", 2026, 1), "FA2026-00001");
        assert_eq!(format_number("AV", 2026, 42), "AV2026-00042");
        assert_eq!(format_number("RG", 2027, 99_999), "RG2027-99999");
    }

    #[test]
    fn test_allocated_number() {
        let number = AllocatedNumber::new(SequenceType::Invoice, "FA", 2026, 3);
        assert_eq!(number.formatted, "FA2026-00003");
        assert_eq!(number.sequence, 3);
    }

    #[test]
    fn test_preview_next_handles_year_rollover() {
        let state = SequenceState {
            sequence_type: SequenceType::Invoice,
            prefix: "FA".to_string(),
            fiscal_year: 2026,
            current_value: 17,
        };
        assert_eq!(state.preview_next(2026).as_deref(), Some("FA2026-00018"));
        assert_eq!(state.preview_next(2027).as_deref(), Some("FA2027-00001"));
        assert_eq!(state.preview_next(2025), None);
    }

    #[test]
    fn test_fiscal_year_of() {
        let date = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        assert_eq!(fiscal_year_of(date), 2026);
    }
}
