//! Interest Bridge - interest calculations delegated to a Google Sheets workbook
//!
//! This library takes a principal, rate and time, writes them into a
//! spreadsheet's Input sheet, waits for the workbook's formulas to recompute,
//! and reads simple and compound interest back from its Output sheet. The
//! bridge does no interest math itself.
//!
//! # Features
//!
//! - Input validation before any remote call
//! - One lazily-connected gateway per process, shared by all requests
//! - Serialized write/wait/read so concurrent requests don't mix results
//! - Google Sheets API v4 client with service-account auth
//! - In-memory spreadsheet for tests
//! - Axum HTTP API (`/calculate`, `/verify`, `/health`)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use interest_bridge::gateway::SpreadsheetGateway;
//! use interest_bridge::sheets::GoogleConnector;
//! use interest_bridge::validation::CalculationRequest;
//!
//! # async fn run() -> interest_bridge::BridgeResult<()> {
//! let connector = GoogleConnector::new("credentials.json", "1AbC...sheet-id");
//! let gateway = SpreadsheetGateway::new(Arc::new(connector));
//!
//! let request = CalculationRequest::new(10000.0, 5.5, 3.0).validate()?;
//! let outputs = gateway.calculate(&request).await?;
//! println!("SI = {}, CI = {}", outputs.simple_interest, outputs.compound_interest);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod sheets;
pub mod validation;

// Re-export commonly used types
pub use error::{BridgeError, BridgeResult};
pub use gateway::{InterestOutputs, RecalcWait, SpreadsheetGateway, StructureReport};
pub use validation::CalculationRequest;
