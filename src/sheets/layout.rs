//! Worksheet names and cell addresses used by the calculator workbook.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::BridgeError;

/// A1-style cell reference (`B2`, `AA10`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    column: String,
    row: u32,
}

fn a1_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?([1-9][0-9]{0,6})$").unwrap())
}

impl CellRef {
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    /// `Sheet!B2` range string, quoting the sheet name as the Sheets API expects.
    pub fn qualified(&self, sheet: &str) -> String {
        format!("'{}'!{}", sheet.replace('\'', "''"), self)
    }
}

impl FromStr for CellRef {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = a1_pattern()
            .captures(s.trim())
            .ok_or_else(|| BridgeError::Config(format!("Invalid cell address: '{}'", s)))?;
        let row = caps[2]
            .parse()
            .map_err(|_| BridgeError::Config(format!("Invalid cell row: '{}'", s)))?;
        Ok(Self {
            column: caps[1].to_ascii_uppercase(),
            row,
        })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column, self.row)
    }
}

/// Where the inputs go and where the outputs come from.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    pub input_sheet: String,
    pub calc_sheet: String,
    pub output_sheet: String,
    pub principal_cell: CellRef,
    pub rate_cell: CellRef,
    pub time_cell: CellRef,
    pub simple_interest_cell: CellRef,
    pub compound_interest_cell: CellRef,
}

impl SheetLayout {
    /// Sheets that must exist for a calculation to work, in report order.
    pub fn required_sheets(&self) -> [&str; 3] {
        [&self.input_sheet, &self.calc_sheet, &self.output_sheet]
    }
}

impl SheetLayout {
    /// Reject blank sheet names; cell addresses are already checked by parsing.
    pub fn validate(&self) -> Result<(), BridgeError> {
        for (setting, name) in [
            ("input sheet", &self.input_sheet),
            ("calc sheet", &self.calc_sheet),
            ("output sheet", &self.output_sheet),
        ] {
            if name.trim().is_empty() {
                return Err(BridgeError::Config(format!("{} name cannot be empty", setting)));
            }
        }
        Ok(())
    }
}

pub const DEFAULT_INPUT_SHEET: &str = "Input";
pub const DEFAULT_CALC_SHEET: &str = "Calc";
pub const DEFAULT_OUTPUT_SHEET: &str = "Output";
pub const DEFAULT_PRINCIPAL_CELL: &str = "B2";
pub const DEFAULT_RATE_CELL: &str = "B3";
pub const DEFAULT_TIME_CELL: &str = "B4";
pub const DEFAULT_SIMPLE_INTEREST_CELL: &str = "B2";
pub const DEFAULT_COMPOUND_INTEREST_CELL: &str = "B3";

fn builtin(a1: &str) -> CellRef {
    a1.parse().expect("built-in cell address is valid A1")
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            input_sheet: DEFAULT_INPUT_SHEET.to_string(),
            calc_sheet: DEFAULT_CALC_SHEET.to_string(),
            output_sheet: DEFAULT_OUTPUT_SHEET.to_string(),
            principal_cell: builtin(DEFAULT_PRINCIPAL_CELL),
            rate_cell: builtin(DEFAULT_RATE_CELL),
            time_cell: builtin(DEFAULT_TIME_CELL),
            simple_interest_cell: builtin(DEFAULT_SIMPLE_INTEREST_CELL),
            compound_interest_cell: builtin(DEFAULT_COMPOUND_INTEREST_CELL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_reference() {
        let cell: CellRef = "B2".parse().unwrap();
        assert_eq!(cell.column(), "B");
        assert_eq!(cell.row(), 2);
        assert_eq!(cell.to_string(), "B2");
    }

    #[test]
    fn test_parse_normalizes_case_and_absolute_markers() {
        let cell: CellRef = "$aa$10".parse().unwrap();
        assert_eq!(cell.to_string(), "AA10");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "2B", "B0", "ABCD1", "B-2", "B2:C3"] {
            assert!(bad.parse::<CellRef>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_qualified_range_quotes_sheet() {
        let cell: CellRef = "B4".parse().unwrap();
        assert_eq!(cell.qualified("Input"), "'Input'!B4");
        assert_eq!(cell.qualified("Bob's"), "'Bob''s'!B4");
    }

    #[test]
    fn test_default_layout_addresses() {
        let layout = SheetLayout::default();
        assert_eq!(layout.required_sheets(), ["Input", "Calc", "Output"]);
        assert_eq!(layout.principal_cell.to_string(), "B2");
        assert_eq!(layout.rate_cell.to_string(), "B3");
        assert_eq!(layout.time_cell.to_string(), "B4");
        assert_eq!(layout.simple_interest_cell.to_string(), "B2");
        assert_eq!(layout.compound_interest_cell.to_string(), "B3");
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn test_layout_rejects_blank_sheet_name() {
        let layout = SheetLayout {
            calc_sheet: "  ".to_string(),
            ..SheetLayout::default()
        };
        let err = layout.validate().unwrap_err();
        assert_eq!(
            err,
            BridgeError::Config("calc sheet name cannot be empty".to_string())
        );
    }
}
