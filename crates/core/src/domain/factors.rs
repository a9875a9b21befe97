use serde::Serialize;

pub const FACTOR_COUNT: usize = 43;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorGroup {
    MomentumPriceStructure,
    EarningsRevenueAcceleration,
    OptionsFlow,
    VolatilityStructure,
    RelativeStrengthRotation,
    LiquidityInstitutional,
    RiskCompression,
    MacroOverlay,
}

impl FactorGroup {
    pub fn label(&self) -> &'static str {
        match self {
            FactorGroup::MomentumPriceStructure => "Momentum & Price Structure",
            FactorGroup::EarningsRevenueAcceleration => "Earnings & Revenue Acceleration",
            FactorGroup::OptionsFlow => "Options & Flow Signals",
            FactorGroup::VolatilityStructure => "Volatility Structure",
            FactorGroup::RelativeStrengthRotation => "Relative Strength & Sector Rotation",
            FactorGroup::LiquidityInstitutional => "Liquidity & Institutional Behavior",
            FactorGroup::RiskCompression => "Risk Compression & Acceleration",
            FactorGroup::MacroOverlay => "Macro Overlay Inputs",
        }
    }
}

/// How a raw input is mapped onto [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaling {
    /// `[min, max] -> [0, 1]`, clamped.
    Linear { min: f64, max: f64 },
    /// `[-|bound|, +|bound|] -> [0, 1]`, zero maps to 0.5.
    Centered { bound: f64 },
    /// `1 - Linear`: lower raw values are more favorable.
    Inverted { min: f64, max: f64 },
    /// `1 - Centered`.
    InvertedCentered { bound: f64 },
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Factor {
    pub id: u8,
    pub key: &'static str,
    pub name: &'static str,
    pub definition: &'static str,
    pub weight_pct: f64,
    pub group: FactorGroup,
    /// Raw input field this factor reads.
    pub input_key: &'static str,
    pub scaling: Scaling,
}

const fn factor(
    id: u8,
    key: &'static str,
    name: &'static str,
    definition: &'static str,
    weight_pct: f64,
    group: FactorGroup,
    input_key: &'static str,
    scaling: Scaling,
) -> Factor {
    Factor {
        id,
        key,
        name,
        definition,
        weight_pct,
        group,
        input_key,
        scaling,
    }
}

use FactorGroup::*;
use Scaling::*;

/// Locked v1.2 factor matrix. Order, ids and weights are part of the output contract.
pub static FACTORS: [Factor; FACTOR_COUNT] = [
    // I. 18%
    factor(1, "momentum_5d", "5-Day Momentum", "% change over 5 trading days", 2.0, MomentumPriceStructure, "momentum_5d_pct", Centered { bound: 8.0 }),
    factor(2, "momentum_10d", "10-Day Momentum", "% change over 10 days", 2.0, MomentumPriceStructure, "momentum_10d_pct", Centered { bound: 12.0 }),
    factor(3, "momentum_20d", "20-Day Momentum", "% change over 20 days", 2.0, MomentumPriceStructure, "momentum_20d_pct", Centered { bound: 18.0 }),
    factor(4, "trend_pos_50dma", "50-Day Trend Position", "% above/below 50DMA", 2.5, MomentumPriceStructure, "trend_pos_50dma_pct", Centered { bound: 25.0 }),
    factor(5, "trend_pos_200dma", "200-Day Trend Position", "% above/below 200DMA", 2.5, MomentumPriceStructure, "trend_pos_200dma_pct", Centered { bound: 40.0 }),
    factor(6, "rsi_compression", "RSI Compression", "RSI normalized 0–100", 2.0, MomentumPriceStructure, "rsi", Linear { min: 0.0, max: 100.0 }),
    factor(7, "macd_slope", "MACD Slope", "Rate of change of MACD", 2.0, MomentumPriceStructure, "macd_slope", Centered { bound: 3.0 }),
    // Distance from the 30-day high: at or near the high scores best.
    factor(8, "breakout_velocity", "Breakout Velocity", "Distance from 30-day high", 3.0, MomentumPriceStructure, "breakout_velocity", Inverted { min: -30.0, max: 30.0 }),
    // II. 16%
    factor(9, "eps_yoy_growth", "EPS YoY Growth", "Year-over-year EPS growth", 3.0, EarningsRevenueAcceleration, "eps_yoy_growth_pct", Centered { bound: 150.0 }),
    factor(10, "eps_qoq_accel", "EPS QoQ Acceleration", "Sequential EPS acceleration", 3.0, EarningsRevenueAcceleration, "eps_qoq_accel_pct", Centered { bound: 100.0 }),
    factor(11, "rev_yoy_growth", "Revenue YoY Growth", "Revenue growth YoY", 3.0, EarningsRevenueAcceleration, "rev_yoy_growth_pct", Centered { bound: 120.0 }),
    factor(12, "rev_qoq_accel", "Revenue QoQ Acceleration", "Sequential revenue change", 3.0, EarningsRevenueAcceleration, "rev_qoq_accel_pct", Centered { bound: 100.0 }),
    factor(13, "earnings_surprise", "Earnings Surprise", "% beat vs estimates", 2.0, EarningsRevenueAcceleration, "earnings_surprise_pct", Centered { bound: 30.0 }),
    factor(14, "forward_guidance_revision", "Forward Guidance Revision", "Net analyst revisions", 2.0, EarningsRevenueAcceleration, "forward_guidance_revision", Centered { bound: 6.0 }),
    // III. 14%
    factor(15, "call_put_ratio", "Call/Put Volume Ratio", "Bullish flow bias", 3.0, OptionsFlow, "call_put_ratio", Linear { min: 0.2, max: 3.5 }),
    factor(16, "unusual_options_activity", "Unusual Options Activity", "Z-score abnormal flow", 3.0, OptionsFlow, "unusual_options_z", Centered { bound: 5.0 }),
    factor(17, "open_interest_expansion", "Open Interest Expansion", "OI growth %", 2.0, OptionsFlow, "open_interest_expansion_pct", Centered { bound: 70.0 }),
    factor(18, "dark_pool_flow_bias", "Dark Pool Flow Bias", "Institutional net prints", 3.0, OptionsFlow, "dark_pool_flow_bias", Centered { bound: 3.5 }),
    factor(19, "block_trade_accumulation", "Block Trade Accumulation", "Large trade clustering", 3.0, OptionsFlow, "block_trade_accumulation", Centered { bound: 3.5 }),
    // IV. 10%
    factor(20, "iv_rank", "Implied Volatility Rank", "IV percentile", 2.5, VolatilityStructure, "iv_rank_pct", Linear { min: 0.0, max: 100.0 }),
    factor(21, "iv_skew", "IV Skew", "Call vs put skew", 2.0, VolatilityStructure, "iv_skew", Centered { bound: 2.5 }),
    // Tighter Bollinger width scores higher.
    factor(22, "volatility_compression", "Volatility Compression", "Bollinger width", 2.5, VolatilityStructure, "vol_compression", Inverted { min: 0.05, max: 1.2 }),
    factor(23, "atr_expansion", "ATR Expansion", "ATR vs baseline", 3.0, VolatilityStructure, "atr_expansion", Linear { min: 0.3, max: 2.8 }),
    // V. 12%
    factor(24, "rel_strength_spy", "Relative Strength vs SPY", "20-day relative return", 3.0, RelativeStrengthRotation, "rel_strength_spy_20d", Centered { bound: 25.0 }),
    factor(25, "rel_strength_sector_etf", "Relative Strength vs Sector ETF", "Relative sector performance", 3.0, RelativeStrengthRotation, "rel_strength_sector_etf", Centered { bound: 30.0 }),
    factor(26, "sector_momentum_rank", "Sector Momentum Rank", "Sector percentile", 3.0, RelativeStrengthRotation, "sector_momentum_rank", Linear { min: 0.0, max: 100.0 }),
    factor(27, "cross_sector_rotation", "Cross-Sector Capital Rotation", "ETF flow signals", 3.0, RelativeStrengthRotation, "cross_sector_capital_rotation", Centered { bound: 3.5 }),
    // VI. 10%
    factor(28, "volume_surge_ratio", "Volume Surge Ratio", "Volume vs 30-day avg", 3.0, LiquidityInstitutional, "volume_surge_ratio", Linear { min: 0.4, max: 3.0 }),
    factor(29, "institutional_ownership_change", "Institutional Ownership Change", "QoQ change", 2.5, LiquidityInstitutional, "inst_ownership_change_qoq", Centered { bound: 7.0 }),
    factor(30, "insider_buying_activity", "Insider Buying Activity", "Net insider accumulation", 2.5, LiquidityInstitutional, "insider_buying_activity", Centered { bound: 6.0 }),
    factor(31, "short_interest_compression", "Short Interest Compression", "Days-to-cover trend", 2.0, LiquidityInstitutional, "short_interest_compression", Centered { bound: 3.5 }),
    // VII. 10%
    factor(32, "beta_adjustment", "Beta Adjustment", "Risk-normalized return", 2.0, RiskCompression, "beta_adjustment", Centered { bound: 3.5 }),
    factor(33, "downside_deviation", "Downside Deviation", "30-day downside risk", 2.0, RiskCompression, "downside_deviation_30d", Inverted { min: 0.4, max: 4.0 }),
    factor(34, "price_gap_frequency", "Price Gap Frequency", "Positive gaps", 2.0, RiskCompression, "price_gap_frequency", Centered { bound: 3.5 }),
    factor(35, "accumulation_distribution", "Accumulation/Distribution", "Money flow trend", 2.0, RiskCompression, "accumulation_distribution", Centered { bound: 3.5 }),
    factor(36, "acceleration_curve_fit", "Acceleration Curve Fit", "2nd derivative momentum", 2.0, RiskCompression, "acceleration_curve_fit", Centered { bound: 3.5 }),
    // VIII. 10%
    factor(37, "market_breadth", "Market Breadth", "Adv/Decline ratio", 2.0, MacroOverlay, "market_breadth", Linear { min: 0.3, max: 1.8 }),
    // Falling VIX is risk-on.
    factor(38, "vix_direction", "VIX Direction", "5-day VIX trend", 2.0, MacroOverlay, "vix_direction_5d", InvertedCentered { bound: 3.5 }),
    factor(39, "treasury_yield_trend", "Treasury Yield Trend", "10Y trend", 2.0, MacroOverlay, "treasury_yield_trend_10y", Centered { bound: 3.5 }),
    // Strong dollar leans risk-off.
    factor(40, "dollar_index_trend", "Dollar Index Trend", "DXY trend", 1.5, MacroOverlay, "dollar_index_trend_dxy", InvertedCentered { bound: 3.5 }),
    factor(41, "fed_liquidity_proxy", "Fed Liquidity Proxy", "Balance sheet change", 1.5, MacroOverlay, "fed_liquidity_proxy", Centered { bound: 2.5 }),
    factor(42, "economic_surprise_index", "Economic Surprise Index", "Macro surprise", 0.5, MacroOverlay, "economic_surprise_index", Centered { bound: 5.0 }),
    factor(43, "risk_on_off_composite", "Risk-On / Risk-Off Composite", "Cross-asset signal", 0.5, MacroOverlay, "risk_on_off_composite", Centered { bound: 5.0 }),
];

pub fn total_weight_pct() -> f64 {
    FACTORS.iter().map(|f| f.weight_pct).sum()
}

pub fn group_weight_pct(group: FactorGroup) -> f64 {
    FACTORS
        .iter()
        .filter(|f| f.group == group)
        .map(|f| f.weight_pct)
        .sum()
}
