//! API request handlers
//!
//! Handlers for all REST API endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::server::AppState;
use crate::error::{BridgeError, BridgeResult};
use crate::gateway::{InterestOutputs, SpreadsheetGateway, StructureReport};
use crate::validation::CalculationRequest;

/// Error body: `{error}` for client errors, `{error, detail}` for remote ones.
#[derive(Debug, Serialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Status code plus JSON error body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                error: message.into(),
                detail: None,
            },
        }
    }

    /// 400 for invalid input, 500 with `context` and the cause otherwise.
    pub fn from_bridge(context: &str, err: BridgeError) -> Self {
        if err.is_client_error() {
            return Self::bad_request(err.to_string());
        }
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorResponse {
                error: context.to_string(),
                detail: Some(err.to_string()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

impl EndpointInfo {
    fn new(method: &str, path: &str, description: &str) -> Self {
        Self {
            path: path.to_string(),
            method: method.to_string(),
            description: description.to_string(),
        }
    }
}

/// GET / - Service metadata
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(RootResponse {
        name: "Interest Calculator API".to_string(),
        version: state.version.clone(),
        description: "Simple and compound interest, calculated by a Google Sheets workbook"
            .to_string(),
        endpoints: vec![
            EndpointInfo::new("GET", "/health", "Health check (spreadsheet reachable and valid)"),
            EndpointInfo::new("GET", "/verify", "Verify the spreadsheet has Input, Calc and Output sheets"),
            EndpointInfo::new("POST", "/calculate", "Calculate simple and compound interest"),
        ],
    })
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl HealthResponse {
    fn healthy(version: String) -> Self {
        Self {
            status: "healthy".to_string(),
            version,
            detail: None,
        }
    }

    fn unhealthy(version: String, detail: String) -> Self {
        Self {
            status: "unhealthy".to_string(),
            version,
            detail: Some(detail),
        }
    }
}

/// Connect lazily, then check the workbook's sheets.
async fn check_structure(gateway: &SpreadsheetGateway) -> BridgeResult<StructureReport> {
    gateway.ensure_connected().await?;
    gateway.verify_structure().await
}

/// GET /health - 200 when the spreadsheet is reachable and well-formed, 503 otherwise
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let version = state.version.clone();
    match check_structure(&state.gateway).await {
        Ok(report) if report.ok => (StatusCode::OK, Json(HealthResponse::healthy(version))).into_response(),
        Ok(report) => {
            warn!(detail = %report.message, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::unhealthy(version, report.message)),
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::unhealthy(version, e.to_string())),
            )
                .into_response()
        }
    }
}

/// Verify response
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub status: String,
    pub message: String,
}

/// GET /verify - Check the Input, Calc and Output sheets exist
pub async fn verify(State(state): State<Arc<AppState>>) -> Result<Json<VerifyResponse>, ApiError> {
    match check_structure(&state.gateway).await {
        Ok(report) if report.ok => Ok(Json(VerifyResponse {
            status: "success".to_string(),
            message: report.message,
        })),
        Ok(report) => Err(ApiError::bad_request(report.message)),
        Err(e) => {
            error!(error = %e, "Structure verification failed");
            Err(ApiError::from_bridge("Verification failed", e))
        }
    }
}

/// Calculate response
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalculateResponse {
    pub simple_interest: f64,
    pub compound_interest: f64,
    pub principal: f64,
    pub rate: f64,
    pub time: f64,
}

impl CalculateResponse {
    /// Echo the request and round the interest values to cents.
    pub fn new(request: &CalculationRequest, outputs: &InterestOutputs) -> Self {
        Self {
            simple_interest: round2(outputs.simple_interest),
            compound_interest: round2(outputs.compound_interest),
            principal: request.principal,
            rate: request.rate,
            time: request.time,
        }
    }
}

/// Round to 2 decimals, ties to even, on the exact binary value
/// (`0.125` -> `0.12`, `2.675` -> `2.67`).
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{:.2}", value).parse().unwrap_or(value)
}

/// POST /calculate - Write inputs to the sheet, read back the interest
pub async fn calculate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CalculationRequest>, JsonRejection>,
) -> Result<Json<CalculateResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected calculation body");
        ApiError::bad_request(rejection.body_text())
    })?;

    let span = info_span!("calculate", request_id = %Uuid::new_v4());
    run_calculation(&state.gateway, request)
        .instrument(span)
        .await
        .map(Json)
}

async fn run_calculation(
    gateway: &SpreadsheetGateway,
    request: CalculationRequest,
) -> Result<CalculateResponse, ApiError> {
    info!(
        principal = request.principal,
        rate = request.rate,
        time = request.time,
        "New calculation request"
    );

    let request = request.validate().map_err(|e| {
        warn!(error = %e, "Validation error");
        ApiError::from_bridge("Calculation failed", e)
    })?;

    let outputs = gateway.calculate(&request).await.map_err(|e| {
        error!(error = %e, "Calculation failed");
        ApiError::from_bridge("Calculation failed", e)
    })?;

    let response = CalculateResponse::new(&request, &outputs);
    info!(
        simple_interest = response.simple_interest,
        compound_interest = response.compound_interest,
        "Calculation completed"
    );
    Ok(response)
}
