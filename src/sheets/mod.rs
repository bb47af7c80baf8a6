//! Spreadsheet access
//!
//! The gateway talks to a workbook through [`SpreadsheetClient`]. Two
//! implementations ship with the crate:
//!
//! - [`GoogleSheetsClient`] - Google Sheets API v4, service-account auth
//! - [`InMemorySpreadsheet`] - in-process workbook for development and tests
//!
//! A [`Connector`] produces a client; the gateway calls it lazily on first use.

pub mod auth;
pub mod google;
pub mod layout;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{BridgeError, BridgeResult};

pub use auth::{ServiceAccountKey, StaticToken, TokenProvider, TokenSource};
pub use google::{GoogleConnector, GoogleSheetsClient};
pub use layout::{CellRef, SheetLayout};
pub use memory::{InMemoryConnector, InMemorySpreadsheet, Workbook};

/// Value of a single cell as returned by a read.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Interpret the cell as a number. Empty cells read as `0.0`.
    ///
    /// `label` names the cell in the error message (`Output!B2`).
    pub fn to_number(&self, label: &str) -> BridgeResult<f64> {
        match self {
            CellValue::Empty => Ok(0.0),
            CellValue::Number(n) if n.is_finite() => Ok(*n),
            CellValue::Number(n) => Err(BridgeError::RemoteParse {
                cell: label.to_string(),
                value: n.to_string(),
            }),
            CellValue::Text(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Ok(0.0);
                }
                match trimmed.parse::<f64>() {
                    Ok(n) if n.is_finite() => Ok(n),
                    _ => Err(BridgeError::RemoteParse {
                        cell: label.to_string(),
                        value: raw.clone(),
                    }),
                }
            }
        }
    }
}

/// Title and worksheet names of an opened spreadsheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpreadsheetInfo {
    pub title: String,
    pub sheet_titles: Vec<String>,
}

/// Cell-level access to one remote spreadsheet.
#[async_trait]
pub trait SpreadsheetClient: Send + Sync {
    /// Fetch the spreadsheet title and its worksheet names.
    ///
    /// Fails with `Authentication` when the spreadsheet cannot be opened.
    async fn open(&self) -> BridgeResult<SpreadsheetInfo>;

    /// Write one number. `RemoteStructure` if the sheet does not exist.
    async fn write_cell(&self, sheet: &str, cell: &CellRef, value: f64) -> BridgeResult<()>;

    /// Read one cell. `RemoteStructure` if the sheet does not exist.
    async fn read_cell(&self, sheet: &str, cell: &CellRef) -> BridgeResult<CellValue>;
}

/// Builds an authenticated client (credentials + spreadsheet id live here).
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> BridgeResult<Arc<dyn SpreadsheetClient>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cell_reads_as_zero() {
        assert_eq!(CellValue::Empty.to_number("Output!B2").unwrap(), 0.0);
        assert_eq!(
            CellValue::Text("   ".into()).to_number("Output!B2").unwrap(),
            0.0
        );
    }

    #[test]
    fn test_numeric_text_parses() {
        assert_eq!(
            CellValue::Text(" 1742.41 ".into())
                .to_number("Output!B3")
                .unwrap(),
            1742.41
        );
        assert_eq!(CellValue::Number(1650.0).to_number("Output!B2").unwrap(), 1650.0);
    }

    #[test]
    fn test_non_numeric_text_is_parse_error() {
        let err = CellValue::Text("abc".into())
            .to_number("Output!B2")
            .unwrap_err();
        assert_eq!(
            err,
            BridgeError::RemoteParse {
                cell: "Output!B2".into(),
                value: "abc".into()
            }
        );
    }

    #[test]
    fn test_non_finite_values_are_parse_errors() {
        for raw in ["NaN", "inf", "-infinity"] {
            let err = CellValue::Text(raw.into()).to_number("Output!B3").unwrap_err();
            assert_eq!(
                err,
                BridgeError::RemoteParse {
                    cell: "Output!B3".into(),
                    value: raw.into()
                }
            );
        }
        assert!(CellValue::Number(f64::NAN).to_number("Output!B2").is_err());
    }
}
