use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Terminal failure codes for a model run. Callers get these by downcasting the
/// `anyhow::Error` returned from the run/ingest entry points to [`ModelError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ConfigInvalid,
    LiveNotConfigured,
    LiveMissingData,
    #[serde(rename = "ALPHAVANTAGE_ERROR")]
    AlphaVantageError,
    #[serde(rename = "ALPHAVANTAGE_RATE_LIMIT")]
    AlphaVantageRateLimit,
    #[serde(rename = "ALPHAVANTAGE_MISSING_DATA")]
    AlphaVantageMissingData,
    #[serde(rename = "ALPHAVANTAGE_BAD_RESPONSE")]
    AlphaVantageBadResponse,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalid => "CONFIG_INVALID",
            ErrorCode::LiveNotConfigured => "LIVE_NOT_CONFIGURED",
            ErrorCode::LiveMissingData => "LIVE_MISSING_DATA",
            ErrorCode::AlphaVantageError => "ALPHAVANTAGE_ERROR",
            ErrorCode::AlphaVantageRateLimit => "ALPHAVANTAGE_RATE_LIMIT",
            ErrorCode::AlphaVantageMissingData => "ALPHAVANTAGE_MISSING_DATA",
            ErrorCode::AlphaVantageBadResponse => "ALPHAVANTAGE_BAD_RESPONSE",
        }
    }

    /// Upstream market-data failures (as opposed to local config/validation failures).
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ErrorCode::AlphaVantageError
                | ErrorCode::AlphaVantageRateLimit
                | ErrorCode::AlphaVantageMissingData
                | ErrorCode::AlphaVantageBadResponse
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ModelError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<Value>,
}

impl ModelError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Reads the code off an `anyhow::Error` chain, if one of its layers is a `ModelError`.
    pub fn code_of(err: &anyhow::Error) -> Option<ErrorCode> {
        err.chain()
            .find_map(|e| e.downcast_ref::<ModelError>())
            .map(|e| e.code)
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for ModelError {}
