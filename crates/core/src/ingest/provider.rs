use crate::config::Settings;
use crate::error::{ErrorCode, ModelError};
use crate::ingest::types::OutputSize;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde_json::Value;
use std::time::Duration;

const QUERY_PATH: &str = "/query";
const FUNCTION: &str = "TIME_SERIES_DAILY_ADJUSTED";
/// Upper bound on raw body text carried in error details.
const MAX_DETAIL_CHARS: usize = 5000;

/// One daily-adjusted series per call. Implementations return the parsed JSON body and leave
/// sentinel interpretation to the caller.
#[async_trait::async_trait]
pub trait TimeSeriesSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn fetch_daily_adjusted(&self, symbol: &str, output_size: OutputSize) -> Result<Value>;
}

#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_alphavantage_api_key()?.to_string();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.alphavantage_timeout_secs))
            .build()
            .context("failed to build Alpha Vantage http client")?;

        Ok(Self {
            http,
            base_url: settings.alphavantage_base_url.clone(),
            api_key,
        })
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), QUERY_PATH)
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }
}

#[async_trait::async_trait]
impl TimeSeriesSource for AlphaVantageClient {
    fn source_name(&self) -> &'static str {
        "alphavantage.time_series_daily_adjusted"
    }

    async fn fetch_daily_adjusted(&self, symbol: &str, output_size: OutputSize) -> Result<Value> {
        let res = self
            .http
            .get(self.url())
            .headers(self.headers())
            .query(&[
                ("function", FUNCTION),
                ("symbol", symbol),
                ("outputsize", output_size.as_str()),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .with_context(|| format!("Alpha Vantage request failed for {symbol}"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .with_context(|| format!("failed to read Alpha Vantage response for {symbol}"))?;

        parse_body(symbol, status, &text)
    }
}

/// Non-JSON bodies are `ALPHAVANTAGE_BAD_RESPONSE`; JSON with a non-2xx status is
/// `ALPHAVANTAGE_ERROR`.
pub fn parse_body(symbol: &str, status: reqwest::StatusCode, text: &str) -> Result<Value> {
    let body = serde_json::from_str::<Value>(text).map_err(|_| {
        ModelError::new(
            ErrorCode::AlphaVantageBadResponse,
            format!("Alpha Vantage returned a non-JSON response for {symbol}."),
        )
        .with_details(Value::String(text.chars().take(MAX_DETAIL_CHARS).collect()))
    })?;

    if !status.is_success() {
        return Err(ModelError::new(
            ErrorCode::AlphaVantageError,
            format!("Alpha Vantage HTTP {status} for {symbol}."),
        )
        .with_details(body)
        .into());
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn settings_with_key(key: Option<&str>) -> Settings {
        Settings {
            alphavantage_api_key: key.map(str::to_string),
            ..Settings::default()
        }
    }

    #[test]
    fn missing_key_is_live_not_configured() {
        let err = AlphaVantageClient::from_settings(&settings_with_key(None)).unwrap_err();
        assert_eq!(ModelError::code_of(&err), Some(ErrorCode::LiveNotConfigured));
        assert!(err.to_string().contains("ALPHAVANTAGE_API_KEY"));
    }

    #[test]
    fn builds_query_url_from_base() {
        let mut settings = settings_with_key(Some("demo"));
        settings.alphavantage_base_url = "http://localhost:8888/".to_string();
        let client = AlphaVantageClient::from_settings(&settings).unwrap();
        assert_eq!(client.url(), "http://localhost:8888/query");
    }

    #[test]
    fn html_body_is_bad_response() {
        let err = parse_body("AAPL", StatusCode::OK, "<html>busy</html>").unwrap_err();
        assert_eq!(ModelError::code_of(&err), Some(ErrorCode::AlphaVantageBadResponse));
    }

    #[test]
    fn json_error_status_is_upstream_error() {
        let err = parse_body("AAPL", StatusCode::BAD_GATEWAY, r#"{"error":"upstream"}"#).unwrap_err();
        assert_eq!(ModelError::code_of(&err), Some(ErrorCode::AlphaVantageError));
    }

    #[test]
    fn json_ok_passes_through() {
        let v = parse_body("AAPL", StatusCode::OK, r#"{"Meta Data":{}}"#).unwrap();
        assert!(v.get("Meta Data").is_some());
    }
}
