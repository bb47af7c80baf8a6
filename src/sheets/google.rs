//! Google Sheets API v4 client
//!
//! Only the three calls the bridge needs: spreadsheet metadata, single-cell
//! write, single-cell read.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::auth::{ServiceAccountKey, TokenProvider, TokenSource};
use super::{CellRef, CellValue, Connector, SpreadsheetClient, SpreadsheetInfo};
use crate::error::{BridgeError, BridgeResult};

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";

const USER_AGENT: &str = concat!("interest-bridge/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct SpreadsheetResource {
    #[serde(default)]
    properties: SpreadsheetProperties,
    #[serde(default)]
    sheets: Vec<SheetResource>,
}

#[derive(Debug, Default, Deserialize)]
struct SpreadsheetProperties {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetResource {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Extract `error.message` from a Google API error body.
fn google_error_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    parsed["error"]["message"].as_str().map(str::to_string)
}

fn cell_value(raw: Option<&Value>) -> CellValue {
    match raw {
        None | Some(Value::Null) => CellValue::Empty,
        Some(Value::Number(n)) => n.as_f64().map_or(CellValue::Empty, CellValue::Number),
        Some(Value::String(s)) if s.is_empty() => CellValue::Empty,
        Some(Value::String(s)) => CellValue::Text(s.clone()),
        Some(other) => CellValue::Text(other.to_string()),
    }
}

/// Authenticated client bound to one spreadsheet.
pub struct GoogleSheetsClient {
    http: reqwest::Client,
    api_base: String,
    spreadsheet_id: String,
    tokens: Arc<dyn TokenSource>,
}

impl GoogleSheetsClient {
    pub fn new(spreadsheet_id: impl Into<String>, tokens: Arc<dyn TokenSource>) -> BridgeResult<Self> {
        Self::with_base_url(spreadsheet_id, tokens, DEFAULT_API_BASE)
    }

    pub fn with_base_url(
        spreadsheet_id: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
        api_base: impl Into<String>,
    ) -> BridgeResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            tokens,
        })
    }

    fn spreadsheet_url(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}",
            self.api_base,
            urlencoding::encode(&self.spreadsheet_id)
        )
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            urlencoding::encode(range)
        )
    }

    /// Map a non-success response. A 400 about an unparseable range means the
    /// worksheet in the range does not exist.
    async fn check(response: reqwest::Response, sheet: &str) -> BridgeResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = google_error_message(&body).unwrap_or(body);

        if status == reqwest::StatusCode::BAD_REQUEST && message.contains("Unable to parse range") {
            return Err(BridgeError::RemoteStructure {
                sheet: sheet.to_string(),
            });
        }
        Err(BridgeError::RemoteIo(format!(
            "Sheets API returned {}: {}",
            status.as_u16(),
            message
        )))
    }
}

#[async_trait]
impl SpreadsheetClient for GoogleSheetsClient {
    async fn open(&self) -> BridgeResult<SpreadsheetInfo> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .get(self.spreadsheet_url())
            .query(&[("fields", "properties.title,sheets.properties.title")])
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if matches!(status.as_u16(), 401 | 403 | 404) {
            return Err(BridgeError::Authentication(format!(
                "Spreadsheet not found or not accessible (HTTP {}). Check that the spreadsheet id '{}' \
                 is correct and that the sheet is shared with the service account.",
                status.as_u16(),
                self.spreadsheet_id
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = google_error_message(&body).unwrap_or(body);
            return Err(BridgeError::RemoteIo(format!(
                "Sheets API returned {}: {}",
                status.as_u16(),
                message
            )));
        }

        let resource: SpreadsheetResource = response
            .json()
            .await
            .map_err(|e| BridgeError::RemoteIo(format!("Malformed spreadsheet metadata: {}", e)))?;

        Ok(SpreadsheetInfo {
            title: resource.properties.title,
            sheet_titles: resource
                .sheets
                .into_iter()
                .map(|s| s.properties.title)
                .collect(),
        })
    }

    async fn write_cell(&self, sheet: &str, cell: &CellRef, value: f64) -> BridgeResult<()> {
        let range = cell.qualified(sheet);
        let token = self.tokens.access_token().await?;
        debug!(%range, value, "writing cell");

        let response = self
            .http
            .put(self.values_url(&range))
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(token)
            .json(&json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": [[value]],
            }))
            .send()
            .await?;

        Self::check(response, sheet).await?;
        Ok(())
    }

    async fn read_cell(&self, sheet: &str, cell: &CellRef) -> BridgeResult<CellValue> {
        let range = cell.qualified(sheet);
        let token = self.tokens.access_token().await?;

        let response = self
            .http
            .get(self.values_url(&range))
            .query(&[("valueRenderOption", "UNFORMATTED_VALUE")])
            .bearer_auth(token)
            .send()
            .await?;

        let response = Self::check(response, sheet).await?;
        let values: ValueRange = response
            .json()
            .await
            .map_err(|e| BridgeError::RemoteIo(format!("Malformed value range: {}", e)))?;

        let value = cell_value(values.values.first().and_then(|row| row.first()));
        debug!(%range, ?value, "read cell");
        Ok(value)
    }
}

/// Connects with a service-account key file to one spreadsheet.
#[derive(Debug, Clone)]
pub struct GoogleConnector {
    pub credentials_path: PathBuf,
    pub spreadsheet_id: String,
    pub api_base: String,
}

impl GoogleConnector {
    pub fn new(credentials_path: impl Into<PathBuf>, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            spreadsheet_id: spreadsheet_id.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[async_trait]
impl Connector for GoogleConnector {
    async fn connect(&self) -> BridgeResult<Arc<dyn SpreadsheetClient>> {
        if self.spreadsheet_id.trim().is_empty() {
            return Err(BridgeError::Authentication(
                "Spreadsheet id cannot be empty".to_string(),
            ));
        }
        let key = ServiceAccountKey::from_file(&self.credentials_path)?;
        let tokens = TokenProvider::new(key)?;
        info!(
            service_account = tokens.client_email(),
            spreadsheet_id = %self.spreadsheet_id,
            "Authenticating with Google Sheets"
        );
        let client =
            GoogleSheetsClient::with_base_url(&self.spreadsheet_id, Arc::new(tokens), &self.api_base)?;
        Ok(Arc::new(client))
    }
}
