use crate::domain::contract::{DataMode, TOP_N};
use crate::error::{ErrorCode, ModelError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const MIN_UNIVERSE_SIZE: usize = 1000;
/// Upper bound on generated universes; a run holds the whole universe in memory.
pub const MAX_UNIVERSE_SIZE: usize = 100_000;

pub const DEFAULT_MOCK_SEED: i64 = 42;
pub const DEFAULT_MOCK_UNIVERSE_SIZE: usize = 1200;

/// Small default live universe; keeps upstream request counts modest.
pub const DEFAULT_LIVE_TICKERS: [&str; 11] = [
    "AAPL", "MSFT", "AMZN", "GOOGL", "META", "TSLA", "NVDA", "JPM", "UNH", "XOM", "INTC",
];

/// Run configuration as supplied by callers (CLI flags, HTTP body, stored state).
/// Numeric fields stay loose so validation can report non-integers instead of failing
/// deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub data_mode: Option<String>,
    #[serde(default)]
    pub mock_seed: Option<f64>,
    #[serde(default)]
    pub mock_universe_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_tickers: Option<Vec<String>>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_mode: Some(DataMode::Live.as_str().to_string()),
            mock_seed: Some(DEFAULT_MOCK_SEED as f64),
            mock_universe_size: Some(DEFAULT_MOCK_UNIVERSE_SIZE as f64),
            live_tickers: None,
        }
    }
}

impl RunConfig {
    pub fn mock(seed: i64, universe_size: usize) -> Self {
        Self {
            data_mode: Some(DataMode::Mock.as_str().to_string()),
            mock_seed: Some(seed as f64),
            mock_universe_size: Some(universe_size as f64),
            live_tickers: None,
        }
    }

    pub fn live(tickers: Option<Vec<String>>) -> Self {
        Self {
            data_mode: Some(DataMode::Live.as_str().to_string()),
            mock_seed: None,
            mock_universe_size: None,
            live_tickers: tickers,
        }
    }

    /// Missing mode means LIVE.
    fn mode_str(&self) -> String {
        self.data_mode
            .as_deref()
            .unwrap_or("LIVE")
            .trim()
            .to_ascii_uppercase()
    }

    /// Human-readable problems; a run must not start while this is non-empty.
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mode = self.mode_str();
        if mode != "LIVE" && mode != "MOCK" {
            issues.push("data_mode must be 'MOCK' or 'LIVE'.".to_string());
        }

        if mode == "MOCK" {
            if !is_integer(self.mock_seed) {
                issues.push("mock_seed must be an integer.".to_string());
            }
            if !is_integer(self.mock_universe_size) {
                issues.push("mock_universe_size must be an integer.".to_string());
            }
            if let Some(n) = self.mock_universe_size.filter(|n| n.is_finite()) {
                if n < MIN_UNIVERSE_SIZE as f64 {
                    issues.push(format!("mock_universe_size must be ≥ {MIN_UNIVERSE_SIZE}."));
                } else if n > MAX_UNIVERSE_SIZE as f64 {
                    issues.push(format!("mock_universe_size must be ≤ {MAX_UNIVERSE_SIZE}."));
                }
            }
        }

        if let Some(tickers) = &self.live_tickers {
            if tickers.iter().any(|t| t.trim().is_empty()) {
                issues.push("live_tickers must not contain empty symbols.".to_string());
            }
            if mode == "LIVE" && !tickers.is_empty() && tickers.len() < TOP_N {
                issues.push(format!("live_tickers must contain at least {TOP_N} symbols."));
            }
        }

        issues
    }

    pub fn validate_and_into_model_config(self) -> anyhow::Result<ModelConfig> {
        let issues = self.issues();
        if !issues.is_empty() {
            return Err(ModelError::new(ErrorCode::ConfigInvalid, issues.join(" "))
                .with_details(serde_json::json!({ "issues": issues }))
                .into());
        }

        let data_mode: DataMode = self.mode_str().parse()?;
        let live_tickers = self
            .live_tickers
            .filter(|t| !t.is_empty())
            .map(|t| t.into_iter().map(|s| s.trim().to_ascii_uppercase()).collect())
            .unwrap_or_else(|| DEFAULT_LIVE_TICKERS.iter().map(|s| s.to_string()).collect());

        Ok(ModelConfig {
            data_mode,
            mock_seed: self.mock_seed.map(|s| s as i64).unwrap_or(DEFAULT_MOCK_SEED),
            mock_universe_size: self
                .mock_universe_size
                .map(|n| n as usize)
                .unwrap_or(DEFAULT_MOCK_UNIVERSE_SIZE),
            live_tickers,
        })
    }
}

fn is_integer(v: Option<f64>) -> bool {
    v.is_some_and(|n| n.is_finite() && n.fract() == 0.0)
}

/// Validated configuration consumed by the run orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub data_mode: DataMode,
    pub mock_seed: i64,
    pub mock_universe_size: usize,
    pub live_tickers: Vec<String>,
}

/// Orchestrator input for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInput {
    pub config: RunConfig,
    pub current_date: NaiveDate,
    pub prediction_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(RunConfig::default().issues().is_empty());
    }

    #[test]
    fn rejects_universe_below_minimum() {
        let issues = RunConfig::mock(42, 999).issues();
        assert_eq!(issues, vec!["mock_universe_size must be ≥ 1000.".to_string()]);
        assert!(RunConfig::mock(42, 1000).issues().is_empty());
    }

    #[test]
    fn rejects_universe_above_maximum() {
        assert!(RunConfig::mock(42, MAX_UNIVERSE_SIZE).issues().is_empty());
        let over = RunConfig::mock(42, MAX_UNIVERSE_SIZE + 1).issues();
        assert_eq!(over, vec!["mock_universe_size must be ≤ 100000.".to_string()]);

        let huge = RunConfig {
            mock_universe_size: Some(1e30),
            ..RunConfig::mock(42, 1200)
        };
        let err = huge.validate_and_into_model_config().unwrap_err();
        assert_eq!(ModelError::code_of(&err), Some(ErrorCode::ConfigInvalid));
    }

    #[test]
    fn rejects_unknown_mode() {
        let cfg = RunConfig {
            data_mode: Some("paper".to_string()),
            ..RunConfig::default()
        };
        assert_eq!(cfg.issues(), vec!["data_mode must be 'MOCK' or 'LIVE'.".to_string()]);
    }

    #[test]
    fn rejects_non_integer_mock_fields() {
        let cfg = RunConfig {
            data_mode: Some("mock".to_string()),
            mock_seed: Some(1.5),
            mock_universe_size: None,
            live_tickers: None,
        };
        let issues = cfg.issues();
        assert!(issues.contains(&"mock_seed must be an integer.".to_string()));
        assert!(issues.contains(&"mock_universe_size must be an integer.".to_string()));
    }

    #[test]
    fn live_mode_ignores_mock_fields() {
        let cfg = RunConfig {
            data_mode: None,
            mock_seed: Some(0.5),
            mock_universe_size: Some(3.0),
            live_tickers: None,
        };
        assert!(cfg.issues().is_empty());
    }

    #[test]
    fn invalid_config_maps_to_config_invalid_code() {
        let err = RunConfig::mock(1, 10)
            .validate_and_into_model_config()
            .unwrap_err();
        assert_eq!(ModelError::code_of(&err), Some(ErrorCode::ConfigInvalid));
    }

    #[test]
    fn into_model_config_applies_defaults() {
        let cfg = RunConfig::live(None).validate_and_into_model_config().unwrap();
        assert_eq!(cfg.data_mode, DataMode::Live);
        assert_eq!(cfg.live_tickers.len(), DEFAULT_LIVE_TICKERS.len());

        let tickers: Vec<String> = DEFAULT_LIVE_TICKERS
            .iter()
            .map(|t| format!(" {} ", t.to_ascii_lowercase()))
            .collect();
        let cfg = RunConfig::live(Some(tickers))
            .validate_and_into_model_config()
            .unwrap();
        assert_eq!(cfg.live_tickers[0], "AAPL");
        assert_eq!(cfg.live_tickers[10], "INTC");
    }

    #[test]
    fn rejects_short_live_ticker_list() {
        let cfg = RunConfig::live(Some(vec!["AAPL".to_string()]));
        assert_eq!(
            cfg.issues(),
            vec!["live_tickers must contain at least 10 symbols.".to_string()]
        );
    }

    #[test]
    fn deserializes_from_json_body() {
        let cfg: RunConfig = serde_json::from_value(serde_json::json!({
            "data_mode": "MOCK",
            "mock_seed": 7,
            "mock_universe_size": 1200
        }))
        .unwrap();
        let model = cfg.validate_and_into_model_config().unwrap();
        assert_eq!(model.data_mode, DataMode::Mock);
        assert_eq!(model.mock_seed, 7);
        assert_eq!(model.mock_universe_size, 1200);
    }
}
