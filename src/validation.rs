//! Request validation
//!
//! Inputs are checked before anything touches the spreadsheet.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

/// Upper bound for the interest rate, in percent.
pub const MAX_RATE: f64 = 100.0;

/// Principal, rate (percent) and time (years) for one calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub principal: f64,
    pub rate: f64,
    pub time: f64,
}

impl CalculationRequest {
    pub fn new(principal: f64, rate: f64, time: f64) -> Self {
        Self {
            principal,
            rate,
            time,
        }
    }

    /// Validate and hand the request back unchanged.
    pub fn validate(self) -> BridgeResult<Self> {
        validate_inputs(self.principal, self.rate, self.time)?;
        Ok(self)
    }
}

/// Check principal > 0, 0 < rate <= 100 and time > 0.
///
/// Fields are checked in that order and the first failure is reported. The
/// message always names the offending field.
pub fn validate_inputs(principal: f64, rate: f64, time: f64) -> BridgeResult<()> {
    positive("principal", principal)?;
    positive("rate", rate)?;
    if rate > MAX_RATE {
        return Err(BridgeError::InvalidInput(
            "rate cannot exceed 100%".to_string(),
        ));
    }
    positive("time", time)?;
    Ok(())
}

fn positive(field: &str, value: f64) -> BridgeResult<()> {
    if !value.is_finite() {
        return Err(BridgeError::InvalidInput(format!(
            "{} must be a finite number",
            field
        )));
    }
    if value <= 0.0 {
        return Err(BridgeError::InvalidInput(format!(
            "{} must be greater than 0",
            field
        )));
    }
    Ok(())
}
