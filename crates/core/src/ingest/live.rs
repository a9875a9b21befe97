use crate::domain::universe::{RawInputs, Trailing, UniverseEntity};
use crate::error::{ErrorCode, ModelError};
use crate::ingest::provider::TimeSeriesSource;
use crate::ingest::types::{DailySeries, OutputSize};
use crate::model::round_to;
use chrono::Utc;
use std::time::Duration;

pub const UNKNOWN_SECTOR: &str = "Unknown";
const HORIZONS_MONTHS: [u32; 3] = [3, 6, 12];

/// Builds a universe from real daily closes, one ticker at a time. Never substitutes values
/// for missing data: every gap surfaces as a coded error.
pub struct LiveUniverseAdapter<S> {
    source: S,
    req_delay: Duration,
}

impl<S: TimeSeriesSource> LiveUniverseAdapter<S> {
    pub fn new(source: S, req_delay: Duration) -> Self {
        Self { source, req_delay }
    }

    pub async fn fetch_live_universe(&self, tickers: &[String]) -> anyhow::Result<Vec<UniverseEntity>> {
        let mut rows = Vec::with_capacity(tickers.len());
        let mut requests: usize = 0;

        for ticker in tickers {
            let (entity, used) = self.fetch_one(ticker, requests).await?;
            requests += used;
            rows.push(entity);
        }

        validate_live_universe(&rows)?;
        tracing::info!(
            source = self.source.source_name(),
            tickers = rows.len(),
            requests,
            "live universe fetched"
        );
        Ok(rows)
    }

    /// Returns the entity and how many upstream requests it took.
    async fn fetch_one(&self, ticker: &str, prior_requests: usize) -> anyhow::Result<(UniverseEntity, usize)> {
        let compact = self.fetch_series(ticker, OutputSize::Compact, prior_requests).await?;
        let latest_close = compact.latest_close()?;
        let trailing = trailing_returns(&compact, latest_close);
        if trailing.is_complete() {
            return Ok((live_entity(ticker, latest_close, trailing), 1));
        }

        tracing::debug!(%ticker, "compact history too short; fetching full series");
        let full = self.fetch_series(ticker, OutputSize::Full, prior_requests + 1).await?;
        let latest_close = full.latest_close()?;
        let trailing = trailing_returns(&full, latest_close);
        Ok((live_entity(ticker, latest_close, trailing), 2))
    }

    async fn fetch_series(
        &self,
        ticker: &str,
        output_size: OutputSize,
        prior_requests: usize,
    ) -> anyhow::Result<DailySeries> {
        if prior_requests > 0 && !self.req_delay.is_zero() {
            tokio::time::sleep(self.req_delay).await;
        }

        let at = Utc::now();
        let body = self.source.fetch_daily_adjusted(ticker, output_size).await?;
        let series = DailySeries::from_response(ticker, &body)?;

        tracing::info!(
            source = self.source.source_name(),
            output_size = output_size.as_str(),
            %ticker,
            fetched_at = %at.to_rfc3339(),
            last_refreshed = series.last_refreshed.as_deref().unwrap_or("-"),
            bars = series.closes.len(),
            "live fetch"
        );
        Ok(series)
    }
}

fn trailing_returns(series: &DailySeries, latest_close: f64) -> Trailing {
    let [m3, m6, m12] =
        HORIZONS_MONTHS.map(|m| series.trailing_return_pct(latest_close, m).map(|r| round_to(r, 3)));
    Trailing { m3, m6, m12 }
}

fn live_entity(ticker: &str, current_price: f64, trailing: Trailing) -> UniverseEntity {
    UniverseEntity {
        ticker: ticker.to_string(),
        // The endpoint carries neither name nor sector.
        company_name: ticker.to_string(),
        sector: UNKNOWN_SECTOR.to_string(),
        current_price,
        inputs: neutral_inputs(),
        trailing,
    }
}

/// Documented neutral factor inputs for live entities; most normalize to 0.5.
pub fn neutral_inputs() -> RawInputs {
    [
        ("momentum_5d_pct", 0.0),
        ("momentum_10d_pct", 0.0),
        ("momentum_20d_pct", 0.0),
        ("trend_pos_50dma_pct", 0.0),
        ("trend_pos_200dma_pct", 0.0),
        ("rsi", 50.0),
        ("macd_slope", 0.0),
        ("breakout_velocity", 0.0),
        ("eps_yoy_growth_pct", 0.0),
        ("eps_qoq_accel_pct", 0.0),
        ("rev_yoy_growth_pct", 0.0),
        ("rev_qoq_accel_pct", 0.0),
        ("earnings_surprise_pct", 0.0),
        ("forward_guidance_revision", 0.0),
        ("call_put_ratio", 1.0),
        ("unusual_options_z", 0.0),
        ("open_interest_expansion_pct", 0.0),
        ("dark_pool_flow_bias", 0.0),
        ("block_trade_accumulation", 0.0),
        ("iv_rank_pct", 50.0),
        ("iv_skew", 0.0),
        ("vol_compression", 0.35),
        ("atr_expansion", 1.0),
        ("rel_strength_spy_20d", 0.0),
        ("rel_strength_sector_etf", 0.0),
        ("sector_momentum_rank", 50.0),
        ("cross_sector_capital_rotation", 0.0),
        ("volume_surge_ratio", 1.0),
        ("inst_ownership_change_qoq", 0.0),
        ("insider_buying_activity", 0.0),
        ("short_interest_compression", 0.0),
        ("beta_adjustment", 0.0),
        ("downside_deviation_30d", 1.2),
        ("price_gap_frequency", 0.0),
        ("accumulation_distribution", 0.0),
        ("acceleration_curve_fit", 0.0),
        ("market_breadth", 1.0),
        ("vix_direction_5d", 0.0),
        ("treasury_yield_trend_10y", 0.0),
        ("dollar_index_trend_dxy", 0.0),
        ("fed_liquidity_proxy", 0.0),
        ("economic_surprise_index", 0.0),
        ("risk_on_off_composite", 0.0),
    ]
    .into_iter()
    .collect()
}

fn missing(message: String) -> anyhow::Error {
    ModelError::new(ErrorCode::LiveMissingData, format!("LIVE data missing: {message}")).into()
}

/// Rejects an empty universe and any entity without ticker, finite price, all three
/// trailing returns, or factor inputs.
pub fn validate_live_universe(rows: &[UniverseEntity]) -> anyhow::Result<()> {
    if rows.is_empty() {
        return Err(missing("universe is empty.".to_string()));
    }

    for r in rows {
        let ticker = r.ticker.trim();
        if ticker.is_empty() {
            return Err(missing("row without ticker.".to_string()));
        }
        if !r.current_price.is_finite() {
            return Err(missing(format!("current_price for {ticker} is missing/invalid.")));
        }
        if !r.trailing.is_complete() {
            return Err(missing(format!(
                "trailing returns (3m/6m/12m) for {ticker} are missing/invalid."
            )));
        }
        if r.inputs.is_empty() {
            return Err(missing(format!("factor inputs missing for {ticker}.")));
        }
    }
    Ok(())
}
