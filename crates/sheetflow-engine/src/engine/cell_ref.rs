//! Cell and column reference parsing and formatting.
//!
//! Provides bidirectional conversion between spreadsheet-style references
//! (e.g. "A1", "AA100", or the bare column letters "G") and zero-indexed
//! column/row coordinates. Target descriptors in instructions reuse this to
//! address columns by letter and single cells in A1 notation.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// A reference to a cell by column and row indices (0-indexed).
/// Row 0 is the header row; data rows start at row 1.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

fn a1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?<letters>[A-Za-z]+)(?<numbers>[0-9]+)$").expect("A1 regex must compile")
    })
}

impl CellRef {
    pub fn new(col: usize, row: usize) -> CellRef {
        CellRef { row, col }
    }

    /// Parse a cell reference from spreadsheet notation (e.g. "A1", "AA10").
    /// Returns None if the input is invalid.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(name: &str) -> Option<CellRef> {
        let caps = a1_re().captures(name.trim())?;
        let col = parse_column_letters(&caps["letters"])?;
        let row = caps["numbers"].parse::<usize>().ok()?.checked_sub(1)?;
        Some(CellRef::new(col, row))
    }

    /// Convert a column index to spreadsheet letters (0 -> A, 25 -> Z, 26 -> AA).
    pub fn col_to_letters(col: usize) -> String {
        let mut result = String::new();
        let mut n = col as u128 + 1;
        while n > 0 {
            n -= 1;
            result.insert(0, (b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        result
    }
}

/// Parse spreadsheet column letters into a 0-indexed column ("A" -> 0,
/// "G" -> 6, "AA" -> 26). Case-insensitive; None on empty input,
/// non-letter characters or overflow.
pub fn parse_column_letters(letters: &str) -> Option<usize> {
    if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    let mut acc = 0usize;
    for c in letters.to_ascii_uppercase().bytes() {
        let digit = (c - b'A') as usize + 1;
        acc = acc.checked_mul(26)?.checked_add(digit)?;
    }
    acc.checked_sub(1)
}

impl std::str::FromStr for CellRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str(s).ok_or_else(|| format!("Invalid cell reference: {}", s))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CellRef::col_to_letters(self.col), self.row + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_column_letters() {
        assert_eq!(parse_column_letters("A"), Some(0));
        assert_eq!(parse_column_letters("g"), Some(6));
        assert_eq!(parse_column_letters("Z"), Some(25));
        assert_eq!(parse_column_letters("AA"), Some(26));
        assert_eq!(parse_column_letters(""), None);
        assert_eq!(parse_column_letters("A1"), None);
    }

    #[test]
    fn test_parse_column_letters_overflow_returns_none() {
        assert_eq!(parse_column_letters(&"Z".repeat(40)), None);
    }

    #[test]
    fn test_cell_ref_round_trip() {
        let cell = CellRef::from_str("B4").unwrap();
        assert_eq!(cell.col, 1);
        assert_eq!(cell.row, 3);
        assert_eq!(cell.to_string(), "B4");
    }

    #[test]
    fn test_cell_ref_rejects_row_zero() {
        assert!(CellRef::from_str("A0").is_none());
        assert!(CellRef::from_str("A").is_none());
        assert!(CellRef::from_str("13").is_none());
    }

    #[test]
    fn test_col_to_letters_handles_wide_columns() {
        assert_eq!(CellRef::col_to_letters(0), "A");
        assert_eq!(CellRef::col_to_letters(26), "AA");
        let letters = CellRef::col_to_letters(usize::MAX);
        assert!(letters.chars().all(|c| c.is_ascii_uppercase()));
    }
}
