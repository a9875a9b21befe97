use crate::config::Settings;
use crate::domain::contract::{DataMode, RunResult, APPEND_TICKER, MODEL_VERSION};
use crate::domain::run_config::{ModelConfig, RunInput};
use crate::domain::universe::UniverseEntity;
use crate::error::{ErrorCode, ModelError};
use crate::ingest::live::LiveUniverseAdapter;
use crate::ingest::provider::{AlphaVantageClient, TimeSeriesSource};
use crate::mock::generate_universe;
use crate::model::rank::rank;
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};

/// Validates the config, builds the universe for its data mode and ranks it.
/// LIVE failures propagate; a LIVE run never falls back to MOCK data.
pub async fn run_model(input: &RunInput, settings: &Settings) -> anyhow::Result<RunResult> {
    let mut config = input.config.clone();
    if config.live_tickers.is_none() {
        config.live_tickers = settings.live_tickers.clone();
    }
    let config = config.validate_and_into_model_config()?;

    match config.data_mode {
        DataMode::Mock => run_validated::<AlphaVantageClient>(input, &config, None).await,
        DataMode::Live => {
            let client = AlphaVantageClient::from_settings(settings)?;
            let adapter = LiveUniverseAdapter::new(client, settings.alphavantage_req_delay());
            run_validated(input, &config, Some(&adapter)).await
        }
    }
}

pub async fn run_validated<S: TimeSeriesSource>(
    input: &RunInput,
    config: &ModelConfig,
    live: Option<&LiveUniverseAdapter<S>>,
) -> anyhow::Result<RunResult> {
    tracing::info!(
        data_mode = %config.data_mode,
        current_date = %input.current_date,
        prediction_date = %input.prediction_date,
        "model run started"
    );

    let universe = match config.data_mode {
        DataMode::Mock => generate_universe(config.mock_seed, config.mock_universe_size)
            .context("mock universe generation failed")?,
        DataMode::Live => {
            let Some(adapter) = live else {
                return Err(ModelError::new(
                    ErrorCode::LiveNotConfigured,
                    "LIVE mode requires a market data source",
                )
                .into());
            };
            adapter.fetch_live_universe(&config.live_tickers).await?
        }
    };

    let result = build_run_result(
        config.data_mode,
        universe,
        input.current_date,
        input.prediction_date,
        Utc::now(),
    )?;

    tracing::info!(
        data_mode = %result.data_mode,
        trade_header = %result.trade_header,
        sector_warning = result.sector_warning,
        top = result.results.first().map(|r| r.ticker.as_str()).unwrap_or("-"),
        "model run finished"
    );
    Ok(result)
}

/// Pure tail of a run: rank the universe and assemble the locked output.
pub fn build_run_result(
    data_mode: DataMode,
    universe: Vec<UniverseEntity>,
    current_date: NaiveDate,
    prediction_date: NaiveDate,
    created_at: DateTime<Utc>,
) -> anyhow::Result<RunResult> {
    let ranked = rank(universe, APPEND_TICKER)?;

    let result = RunResult {
        model_version: MODEL_VERSION.to_string(),
        data_mode,
        current_date,
        prediction_date,
        trade_header: ranked.trade_header,
        sector_warning: ranked.sector_warning,
        results: ranked.result_rows(),
        created_at,
    };
    result.validate().context("run result violates the output contract")?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contract::{TradeHeader, RESULT_ROWS};
    use crate::domain::run_config::{RunConfig, DEFAULT_LIVE_TICKERS};
    use crate::ingest::live::tests::{year_body, StubSource};
    use crate::ingest::types::OutputSize;
    use crate::model::rank::GateMetrics;
    use std::time::Duration;

    fn input(config: RunConfig) -> RunInput {
        RunInput {
            config,
            current_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            prediction_date: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
        }
    }

    #[tokio::test]
    async fn mock_run_is_deterministic_except_created_at() {
        let settings = Settings::default();
        let a = run_model(&input(RunConfig::mock(42, 1200)), &settings).await.unwrap();
        let mut b = run_model(&input(RunConfig::mock(42, 1200)), &settings).await.unwrap();
        b.created_at = a.created_at;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn seed_42_run_matches_known_ranking() {
        let run = run_model(&input(RunConfig::mock(42, 1200)), &Settings::default())
            .await
            .unwrap();
        assert_eq!(run.current_date.to_string(), "2026-01-01");
        assert_eq!(run.prediction_date.to_string(), "2026-01-02");
        assert_eq!(run.results[0].predicted_1d_growth_pct, 0.578);
        assert_eq!(run.results[9].predicted_1d_growth_pct, 0.565);
        assert_eq!(run.results[10].ticker, "INTC");
        assert_eq!(run.results[10].predicted_1d_growth_pct, 0.493);
        assert_eq!(run.trade_header, TradeHeader::NoTrade);
        assert!(!run.sector_warning);
    }

    #[tokio::test]
    async fn mock_run_honours_output_contract() {
        let run = run_model(&input(RunConfig::mock(42, 1200)), &Settings::default())
            .await
            .unwrap();

        assert_eq!(run.model_version, "Stock Check v1.2");
        assert_eq!(run.data_mode, DataMode::Mock);
        assert_eq!(run.results.len(), RESULT_ROWS);
        assert!(run.results.iter().all(|r| r.has_locked_columns()));

        let ranks: Vec<Option<u32>> = run.results.iter().map(|r| r.rank).collect();
        let mut expected: Vec<Option<u32>> = (1..=10).map(Some).collect();
        expected.push(None);
        assert_eq!(ranks, expected);
        assert_eq!(run.results[10].ticker, "INTC");

        for pair in run.top10().windows(2) {
            assert!(pair[0].predicted_1d_growth_pct >= pair[1].predicted_1d_growth_pct);
        }

        let growths: Vec<f64> = run.top10().iter().map(|r| r.predicted_1d_growth_pct).collect();
        assert_eq!(GateMetrics::from_growths(&growths).trade_header(), run.trade_header);
    }

    #[tokio::test]
    async fn run_result_serializes_top_level_fields_in_order() {
        let run = run_model(&input(RunConfig::mock(7, 1000)), &Settings::default())
            .await
            .unwrap();
        let v = serde_json::to_value(&run).unwrap();
        let keys: Vec<&str> = v.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "model_version",
                "data_mode",
                "current_date",
                "prediction_date",
                "trade_header",
                "sector_warning",
                "results",
                "created_at"
            ]
        );
    }

    #[tokio::test]
    async fn rejects_undersized_mock_universe() {
        let err = run_model(&input(RunConfig::mock(42, 999)), &Settings::default())
            .await
            .unwrap_err();
        assert_eq!(ModelError::code_of(&err), Some(ErrorCode::ConfigInvalid));
        assert!(err.to_string().contains("mock_universe_size must be ≥ 1000."));
    }

    #[tokio::test]
    async fn live_without_key_is_not_configured() {
        let err = run_model(&input(RunConfig::live(None)), &Settings::default())
            .await
            .unwrap_err();
        assert_eq!(ModelError::code_of(&err), Some(ErrorCode::LiveNotConfigured));
        assert!(err.to_string().contains("ALPHAVANTAGE_API_KEY"));
    }

    #[tokio::test]
    async fn live_run_uses_stubbed_series() {
        let source = DEFAULT_LIVE_TICKERS
            .iter()
            .fold(StubSource::default(), |s, t| s.with(t, OutputSize::Compact, year_body()));
        let adapter = LiveUniverseAdapter::new(source, Duration::ZERO);
        let config = RunConfig::live(None).validate_and_into_model_config().unwrap();

        let run = run_validated(&input(RunConfig::live(None)), &config, Some(&adapter))
            .await
            .unwrap();

        assert_eq!(run.data_mode, DataMode::Live);
        // Identical neutral inputs tie every ticker, so universe order decides.
        assert_eq!(run.results[0].ticker, "AAPL");
        assert_eq!(run.results[9].ticker, "XOM");
        assert_eq!(run.results[10].ticker, "INTC");
        assert_eq!(run.results[10].company_name, "INTC");
        assert_eq!(run.results[10].trailing_12m, Some(100.0));
        assert_eq!(run.trade_header, TradeHeader::NoTrade);
        assert!(run.sector_warning);
    }

    #[tokio::test]
    async fn live_failure_never_falls_back_to_mock() {
        let adapter = LiveUniverseAdapter::new(StubSource::default(), Duration::ZERO);
        let config = RunConfig::live(None).validate_and_into_model_config().unwrap();
        let res = run_validated(&input(RunConfig::live(None)), &config, Some(&adapter)).await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn live_mode_without_adapter_is_not_configured() {
        let config = RunConfig::live(None).validate_and_into_model_config().unwrap();
        let err = run_validated::<StubSource>(&input(RunConfig::live(None)), &config, None)
            .await
            .unwrap_err();
        assert_eq!(ModelError::code_of(&err), Some(ErrorCode::LiveNotConfigured));
    }
}
