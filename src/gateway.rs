//! Spreadsheet gateway
//!
//! Owns the single connection to the calculator workbook and runs the
//! write → wait → read workflow against it.
//!
//! # Connection state
//!
//! The gateway starts `Disconnected` and moves to `Connected` once, on the
//! first successful [`SpreadsheetGateway::connect`]. Cell operations and
//! [`SpreadsheetGateway::verify_structure`] fail with `NotConnected` until
//! then; [`SpreadsheetGateway::calculate`] connects on demand. A failed
//! connect leaves the gateway `Disconnected`, so the next lazy call retries.
//!
//! # Concurrency
//!
//! All requests share one Input/Output cell pair. Calculations are
//! serialized: a calculation holds the gateway's calculation lock from its
//! first write until its last read, so concurrent requests queue instead of
//! reading each other's results.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{BridgeError, BridgeResult};
use crate::sheets::{Connector, SheetLayout, SpreadsheetClient};
use crate::validation::CalculationRequest;

pub const DEFAULT_RECALC_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_POLLS: u32 = 10;

/// How long to give the workbook's formulas before reading the outputs.
///
/// Neither strategy is a completion signal; a slow recompute can still
/// produce stale values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecalcWait {
    /// Sleep once, then read.
    Fixed(Duration),
    /// Read every `interval` until two consecutive reads agree, giving up
    /// after `max_polls` reads and returning the last one.
    UntilStable { interval: Duration, max_polls: u32 },
}

impl Default for RecalcWait {
    fn default() -> Self {
        RecalcWait::Fixed(DEFAULT_RECALC_DELAY)
    }
}

/// Values read back from the Output sheet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InterestOutputs {
    pub simple_interest: f64,
    pub compound_interest: f64,
}

/// Authenticated handle on the opened spreadsheet.
pub struct Session {
    client: Arc<dyn SpreadsheetClient>,
    title: String,
}

impl Session {
    pub fn title(&self) -> &str {
        &self.title
    }
}

pub enum ConnectionState {
    Disconnected,
    Connected(Arc<Session>),
}

/// Result of checking that the required worksheets exist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureReport {
    pub ok: bool,
    pub missing: Vec<String>,
    pub message: String,
}

impl StructureReport {
    pub fn from_titles(required: &[&str], existing: &[String]) -> Self {
        let missing: Vec<String> = required
            .iter()
            .filter(|name| !existing.iter().any(|t| t == *name))
            .map(|name| name.to_string())
            .collect();

        if missing.is_empty() {
            Self {
                ok: true,
                missing,
                message: "Sheet structure verified successfully".to_string(),
            }
        } else {
            let message = format!("Missing required sheets: {}", missing.join(", "));
            Self {
                ok: false,
                missing,
                message,
            }
        }
    }
}

pub struct SpreadsheetGateway {
    connector: Arc<dyn Connector>,
    layout: SheetLayout,
    recalc: RecalcWait,
    state: RwLock<ConnectionState>,
    calculation: Mutex<()>,
}

impl SpreadsheetGateway {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            layout: SheetLayout::default(),
            recalc: RecalcWait::default(),
            state: RwLock::new(ConnectionState::Disconnected),
            calculation: Mutex::new(()),
        }
    }

    pub fn with_layout(mut self, layout: SheetLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_recalc(mut self, recalc: RecalcWait) -> Self {
        self.recalc = recalc;
        self
    }

    pub fn layout(&self) -> &SheetLayout {
        &self.layout
    }

    pub async fn is_connected(&self) -> bool {
        matches!(*self.state.read().await, ConnectionState::Connected(_))
    }

    /// Authenticate and open the spreadsheet. No-op when already connected.
    pub async fn connect(&self) -> BridgeResult<Arc<Session>> {
        let mut state = self.state.write().await;
        if let ConnectionState::Connected(session) = &*state {
            return Ok(session.clone());
        }

        let client = self.connector.connect().await?;
        let info = client.open().await?;
        info!(title = %info.title, sheets = ?info.sheet_titles, "Connected to spreadsheet");

        let session = Arc::new(Session {
            client,
            title: info.title,
        });
        *state = ConnectionState::Connected(session.clone());
        Ok(session)
    }

    /// The lazy-init path: reuse the session, or connect if there is none.
    pub async fn ensure_connected(&self) -> BridgeResult<Arc<Session>> {
        match self.session().await {
            Ok(session) => Ok(session),
            Err(BridgeError::NotConnected) => self.connect().await,
            Err(e) => Err(e),
        }
    }

    async fn session(&self) -> BridgeResult<Arc<Session>> {
        match &*self.state.read().await {
            ConnectionState::Connected(session) => Ok(session.clone()),
            ConnectionState::Disconnected => Err(BridgeError::NotConnected),
        }
    }

    /// Write principal, rate and time into the Input sheet.
    pub async fn write_inputs(&self, request: &CalculationRequest) -> BridgeResult<()> {
        let session = self.session().await?;
        let sheet = &self.layout.input_sheet;
        let writes = [
            (&self.layout.principal_cell, request.principal),
            (&self.layout.rate_cell, request.rate),
            (&self.layout.time_cell, request.time),
        ];
        for (cell, value) in writes {
            session.client.write_cell(sheet, cell, value).await?;
        }
        info!(
            sheet = %sheet,
            principal = request.principal,
            rate = request.rate,
            time = request.time,
            "Wrote inputs"
        );
        Ok(())
    }

    /// Read simple and compound interest from the Output sheet.
    pub async fn read_outputs(&self) -> BridgeResult<InterestOutputs> {
        let session = self.session().await?;
        let sheet = &self.layout.output_sheet;
        let si_cell = &self.layout.simple_interest_cell;
        let ci_cell = &self.layout.compound_interest_cell;

        let si_raw = session.client.read_cell(sheet, si_cell).await?;
        let ci_raw = session.client.read_cell(sheet, ci_cell).await?;

        let outputs = InterestOutputs {
            simple_interest: si_raw.to_number(&format!("{}!{}", sheet, si_cell))?,
            compound_interest: ci_raw.to_number(&format!("{}!{}", sheet, ci_cell))?,
        };
        debug!(sheet = %sheet, ?outputs, "Read outputs");
        Ok(outputs)
    }

    async fn wait_and_read(&self) -> BridgeResult<InterestOutputs> {
        match self.recalc {
            RecalcWait::Fixed(delay) => {
                tokio::time::sleep(delay).await;
                self.read_outputs().await
            }
            RecalcWait::UntilStable {
                interval,
                max_polls,
            } => {
                tokio::time::sleep(interval).await;
                let mut previous = self.read_outputs().await?;
                for _ in 1..max_polls {
                    tokio::time::sleep(interval).await;
                    let current = self.read_outputs().await?;
                    if current == previous {
                        return Ok(current);
                    }
                    previous = current;
                }
                warn!(max_polls, "Outputs did not stabilize; returning last read");
                Ok(previous)
            }
        }
    }

    /// Connect if needed, write the inputs, wait for recompute, read the outputs.
    pub async fn calculate(&self, request: &CalculationRequest) -> BridgeResult<InterestOutputs> {
        let request = request.validate()?;
        self.ensure_connected().await?;

        let _turn = self.calculation.lock().await;
        self.write_inputs(&request).await?;
        self.wait_and_read().await
    }

    /// Check that the Input, Calc and Output sheets all exist.
    pub async fn verify_structure(&self) -> BridgeResult<StructureReport> {
        let session = self.session().await?;
        let info = session.client.open().await?;
        Ok(StructureReport::from_titles(
            &self.layout.required_sheets(),
            &info.sheet_titles,
        ))
    }
}
