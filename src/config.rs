//! Startup configuration
//!
//! Values come from CLI flags or environment variables (see `main.rs`);
//! this module holds the validated shape and the fail-fast checks.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;

use crate::error::{BridgeError, BridgeResult};
use crate::gateway::{RecalcWait, SpreadsheetGateway};
use crate::sheets::{GoogleConnector, SheetLayout};

pub const DEFAULT_CREDENTIALS_PATH: &str = "credentials.json";
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RecalcMode {
    /// Sleep for the delay, then read once
    #[default]
    Fixed,
    /// Poll at the delay interval until the outputs stop changing
    UntilStable,
}

impl RecalcMode {
    pub fn wait(self, delay: Duration, max_polls: u32) -> RecalcWait {
        match self {
            RecalcMode::Fixed => RecalcWait::Fixed(delay),
            RecalcMode::UntilStable => RecalcWait::UntilStable {
                interval: delay,
                max_polls: max_polls.max(1),
            },
        }
    }
}

/// Which spreadsheet to drive and how.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub sheet_id: Option<String>,
    pub credentials_path: PathBuf,
    pub recalc: RecalcWait,
    pub layout: SheetLayout,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            sheet_id: None,
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
            recalc: RecalcWait::default(),
            layout: SheetLayout::default(),
        }
    }
}

impl SheetsConfig {
    /// Refuse to start without a spreadsheet id or a credentials file, or
    /// with a blank sheet name.
    pub fn validate(&self) -> BridgeResult<()> {
        match self.sheet_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => {}
            _ => {
                return Err(BridgeError::Config(
                    "GOOGLE_SHEET_ID environment variable is not set".to_string(),
                ))
            }
        }
        if !self.credentials_path.is_file() {
            return Err(BridgeError::Config(format!(
                "Google credentials file not found at: {}",
                self.credentials_path.display()
            )));
        }
        self.layout.validate()
    }

    /// Absolute credentials path, falling back to the configured one.
    pub fn resolved_credentials_path(&self) -> PathBuf {
        std::fs::canonicalize(&self.credentials_path)
            .unwrap_or_else(|_| self.credentials_path.clone())
    }

    /// Validate, then build the process-wide gateway. Does not connect.
    pub fn build_gateway(&self) -> BridgeResult<Arc<SpreadsheetGateway>> {
        self.validate()?;
        let sheet_id = self.sheet_id.clone().unwrap_or_default();
        let connector = GoogleConnector::new(self.resolved_credentials_path(), sheet_id.trim());
        Ok(Arc::new(
            SpreadsheetGateway::new(Arc::new(connector))
                .with_recalc(self.recalc)
                .with_layout(self.layout.clone()),
        ))
    }
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
