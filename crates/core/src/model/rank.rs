use crate::domain::contract::{ResultRow, TradeHeader, APPEND_TICKER, TOP_N};
use crate::domain::universe::{RawInputs, ScoredEntity, Trailing, UniverseEntity};
use crate::model::round_to;
use crate::model::score::score_entity;
use anyhow::ensure;
use std::collections::HashMap;

/// Top-10 average growth required for a TRADE call, in percentage points.
pub const TRADE_MIN_AVG_PCT: f64 = 0.5;
/// Top-10 sample standard deviation required for a TRADE call.
pub const TRADE_MIN_DISPERSION_PCT: f64 = 0.6;
/// Same-sector count within the Top 10 that raises the concentration warning.
pub const SECTOR_WARNING_MIN_COUNT: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateMetrics {
    pub avg_top10: f64,
    pub dispersion: f64,
}

impl GateMetrics {
    pub fn from_growths(growths: &[f64]) -> Self {
        Self {
            avg_top10: mean(growths),
            dispersion: sample_stdev(growths),
        }
    }

    pub fn trade_header(&self) -> TradeHeader {
        if self.avg_top10 >= TRADE_MIN_AVG_PCT && self.dispersion >= TRADE_MIN_DISPERSION_PCT {
            TradeHeader::Trade
        } else {
            TradeHeader::NoTrade
        }
    }
}

#[derive(Debug, Clone)]
pub struct RankedUniverse {
    /// Top entities in rank order (rank = index + 1).
    pub top10: Vec<ScoredEntity>,
    pub appended: ScoredEntity,
    pub gate: GateMetrics,
    pub trade_header: TradeHeader,
    pub sector_warning: bool,
}

impl RankedUniverse {
    /// Locked output rows: ranked Top 10 followed by the unranked appended ticker.
    pub fn result_rows(&self) -> Vec<ResultRow> {
        let mut rows: Vec<ResultRow> = self
            .top10
            .iter()
            .enumerate()
            .map(|(idx, s)| result_row(Some(idx as u32 + 1), s))
            .collect();
        rows.push(result_row(None, &self.appended));
        rows
    }
}

pub fn rank(entities: Vec<UniverseEntity>, append_ticker: &str) -> anyhow::Result<RankedUniverse> {
    ensure!(
        entities.len() >= TOP_N,
        "universe must contain at least {TOP_N} entities (got {})",
        entities.len()
    );

    let mut scored: Vec<ScoredEntity> = entities.into_iter().map(score_entity).collect();

    let appended = scored
        .iter()
        .find(|s| s.entity.ticker == append_ticker)
        .cloned()
        .unwrap_or_else(|| score_entity(placeholder_entity(append_ticker)));

    // Stable: equal growth keeps universe order.
    scored.sort_by(|a, b| {
        b.predicted_1d_growth_pct
            .partial_cmp(&a.predicted_1d_growth_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    scored.truncate(TOP_N);
    let top10 = scored;

    let growths: Vec<f64> = top10.iter().map(|s| s.predicted_1d_growth_pct).collect();
    let gate = GateMetrics::from_growths(&growths);
    let sector_warning = sector_warning(&top10);

    tracing::debug!(
        avg_top10 = gate.avg_top10,
        dispersion = gate.dispersion,
        sector_warning,
        appended = %appended.entity.ticker,
        "ranked universe"
    );

    Ok(RankedUniverse {
        top10,
        trade_header: gate.trade_header(),
        gate,
        appended,
        sector_warning,
    })
}

pub fn result_row(rank: Option<u32>, s: &ScoredEntity) -> ResultRow {
    ResultRow {
        rank,
        ticker: s.entity.ticker.clone(),
        company_name: s.entity.company_name.clone(),
        sector: s.entity.sector.clone(),
        current_price: round_to(s.entity.current_price, 2),
        predicted_price: s.predicted_price,
        predicted_1d_growth_pct: s.predicted_1d_growth_pct,
        trailing_3m: s.entity.trailing.m3,
        trailing_6m: s.entity.trailing.m6,
        trailing_12m: s.entity.trailing.m12,
    }
}

pub fn mean(nums: &[f64]) -> f64 {
    if nums.is_empty() {
        return 0.0;
    }
    nums.iter().sum::<f64>() / nums.len() as f64
}

/// Sample standard deviation (n - 1); zero below two values.
pub fn sample_stdev(nums: &[f64]) -> f64 {
    if nums.len() < 2 {
        return 0.0;
    }
    let m = mean(nums);
    let var = nums.iter().map(|n| (n - m) * (n - m)).sum::<f64>() / (nums.len() - 1) as f64;
    var.sqrt()
}

pub fn sector_warning(top10: &[ScoredEntity]) -> bool {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for s in top10 {
        let sector = s.entity.sector.as_str();
        let sector = if sector.is_empty() { "Unknown" } else { sector };
        *counts.entry(sector).or_default() += 1;
    }
    counts.values().copied().max().unwrap_or(0) >= SECTOR_WARNING_MIN_COUNT
}

/// Stand-in for the append ticker when the universe does not contain it.
pub fn placeholder_entity(ticker: &str) -> UniverseEntity {
    let (company_name, sector) = if ticker == APPEND_TICKER {
        ("Intel Corporation", "Technology")
    } else {
        (ticker, "Unknown")
    };

    UniverseEntity {
        ticker: ticker.to_string(),
        company_name: company_name.to_string(),
        sector: sector.to_string(),
        current_price: 40.0,
        inputs: placeholder_inputs(),
        trailing: Trailing::new(3.5, 6.0, 12.0),
    }
}

fn placeholder_inputs() -> RawInputs {
    [
        ("momentum_5d_pct", 0.3),
        ("momentum_10d_pct", 0.5),
        ("momentum_20d_pct", 1.0),
        ("trend_pos_50dma_pct", 1.5),
        ("trend_pos_200dma_pct", -2.0),
        ("rsi", 51.0),
        ("macd_slope", 0.1),
        ("breakout_velocity", -1.5),
        ("eps_yoy_growth_pct", 6.0),
        ("eps_qoq_accel_pct", 2.0),
        ("rev_yoy_growth_pct", 4.0),
        ("rev_qoq_accel_pct", 1.0),
        ("earnings_surprise_pct", 0.5),
        ("forward_guidance_revision", 0.1),
        ("call_put_ratio", 1.1),
        ("unusual_options_z", 0.2),
        ("open_interest_expansion_pct", 3.0),
        ("dark_pool_flow_bias", 0.1),
        ("block_trade_accumulation", 0.1),
        ("iv_rank_pct", 45.0),
        ("iv_skew", 0.0),
        ("vol_compression", 0.35),
        ("atr_expansion", 1.0),
        ("rel_strength_spy_20d", 0.2),
        ("rel_strength_sector_etf", 0.3),
        ("sector_momentum_rank", 55.0),
        ("cross_sector_capital_rotation", 0.0),
        ("volume_surge_ratio", 1.0),
        ("inst_ownership_change_qoq", 0.1),
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
