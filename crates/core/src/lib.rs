pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod mock;
pub mod model;
pub mod run;
pub mod storage;
pub mod time;

pub mod config {
    use crate::error::{ErrorCode, ModelError};
    use anyhow::Context;
    use std::time::Duration;

    pub const DEFAULT_ALPHAVANTAGE_BASE_URL: &str = "https://www.alphavantage.co";
    const DEFAULT_ALPHAVANTAGE_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_ALPHAVANTAGE_REQ_DELAY_MS: u64 = 1000;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub alphavantage_api_key: Option<String>,
        /// Upstream host, or a caching proxy speaking the same query protocol.
        pub alphavantage_base_url: String,
        pub alphavantage_timeout_secs: u64,
        pub alphavantage_req_delay_ms: u64,
        /// Comma-separated `LIVE_TICKERS`; used when a run config names none.
        pub live_tickers: Option<Vec<String>>,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                database_url: None,
                sentry_dsn: None,
                alphavantage_api_key: None,
                alphavantage_base_url: DEFAULT_ALPHAVANTAGE_BASE_URL.to_string(),
                alphavantage_timeout_secs: DEFAULT_ALPHAVANTAGE_TIMEOUT_SECS,
                alphavantage_req_delay_ms: DEFAULT_ALPHAVANTAGE_REQ_DELAY_MS,
                live_tickers: None,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: non_empty_var("DATABASE_URL"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                alphavantage_api_key: non_empty_var("ALPHAVANTAGE_API_KEY"),
                alphavantage_base_url: non_empty_var("ALPHAVANTAGE_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_ALPHAVANTAGE_BASE_URL.to_string()),
                alphavantage_timeout_secs: parsed_var("ALPHAVANTAGE_TIMEOUT_SECS")?
                    .unwrap_or(DEFAULT_ALPHAVANTAGE_TIMEOUT_SECS),
                alphavantage_req_delay_ms: parsed_var("ALPHAVANTAGE_REQ_DELAY_MS")?
                    .unwrap_or(DEFAULT_ALPHAVANTAGE_REQ_DELAY_MS),
                live_tickers: non_empty_var("LIVE_TICKERS").map(|s| parse_ticker_list(&s)),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_alphavantage_api_key(&self) -> anyhow::Result<&str> {
            self.alphavantage_api_key.as_deref().ok_or_else(|| {
                ModelError::new(
                    ErrorCode::LiveNotConfigured,
                    "LIVE mode is not configured: ALPHAVANTAGE_API_KEY is required",
                )
                .into()
            })
        }

        pub fn alphavantage_req_delay(&self) -> Duration {
            Duration::from_millis(self.alphavantage_req_delay_ms)
        }
    }

    /// Splits a comma list, trimming and uppercasing; empty entries are kept so config
    /// validation can report them.
    pub fn parse_ticker_list(s: &str) -> Vec<String> {
        s.split(',').map(|t| t.trim().to_ascii_uppercase()).collect()
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    fn parsed_var(key: &str) -> anyhow::Result<Option<u64>> {
        non_empty_var(key)
            .map(|v| {
                v.trim()
                    .parse::<u64>()
                    .with_context(|| format!("{key} must be a non-negative integer, got {v:?}"))
            })
            .transpose()
    }

}
