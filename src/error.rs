use thiserror::Error;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Worksheet '{sheet}' not found. Please ensure the sheet exists.")]
    RemoteStructure { sheet: String },

    #[error("Remote I/O error: {0}")]
    RemoteIo(String),

    #[error("Invalid numeric value in {cell}: {value}")]
    RemoteParse { cell: String, value: String },

    #[error("Not connected to the spreadsheet. Call connect() first.")]
    NotConnected,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    /// True when the caller sent bad input (HTTP 400).
    pub fn is_client_error(&self) -> bool {
        matches!(self, BridgeError::InvalidInput(_))
    }

    /// True for transient transport failures that a caller may retry.
    /// The bridge itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BridgeError::RemoteIo(_))
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        BridgeError::RemoteIo(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_invalid_input_is_client_error() {
        assert!(BridgeError::InvalidInput("rate cannot exceed 100%".into()).is_client_error());
        assert!(!BridgeError::NotConnected.is_client_error());
        assert!(!BridgeError::RemoteIo("timeout".into()).is_client_error());
        assert!(!BridgeError::Authentication("bad key".into()).is_client_error());
    }

    #[test]
    fn test_only_remote_io_is_retryable() {
        assert!(BridgeError::RemoteIo("connection reset".into()).is_retryable());
        assert!(!BridgeError::RemoteStructure {
            sheet: "Input".into()
        }
        .is_retryable());
        assert!(!BridgeError::RemoteParse {
            cell: "Output!B2".into(),
            value: "abc".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_display_messages() {
        let err = BridgeError::RemoteStructure {
            sheet: "Output".into(),
        };
        assert_eq!(
            err.to_string(),
            "Worksheet 'Output' not found. Please ensure the sheet exists."
        );

        let err = BridgeError::RemoteParse {
            cell: "Output!B3".into(),
            value: "abc".into(),
        };
        assert_eq!(err.to_string(), "Invalid numeric value in Output!B3: abc");

        let err = BridgeError::InvalidInput("time must be greater than 0".into());
        assert_eq!(err.to_string(), "time must be greater than 0");
    }
}
