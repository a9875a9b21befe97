use crate::domain::run_config::{MAX_UNIVERSE_SIZE, MIN_UNIVERSE_SIZE};
use crate::domain::universe::{RawInputs, Trailing, UniverseEntity};
use crate::mock::prng::Mulberry32;
use anyhow::ensure;

pub const SECTORS: [&str; 11] = [
    "Technology",
    "Healthcare",
    "Financials",
    "Consumer Discretionary",
    "Consumer Staples",
    "Industrials",
    "Energy",
    "Materials",
    "Utilities",
    "Real Estate",
    "Communication Services",
];

const NAME_SUFFIXES: [&str; 8] = [
    "Holdings",
    "Systems",
    "Labs",
    "Technologies",
    "Group",
    "Industries",
    "Networks",
    "Partners",
];

const TICKER_MIN_LEN: u32 = 3;

/// Market-wide regime draws, shared by every entity of one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroDraws {
    pub breadth: f64,
    pub vix_dir: f64,
    pub tsy_10y_trend: f64,
    pub dxy_trend: f64,
    pub fed_liquidity: f64,
    pub econ_surprise: f64,
    pub risk_on_off: f64,
}

impl MacroDraws {
    fn draw(rng: &mut Mulberry32) -> Self {
        Self {
            breadth: rng.bounded(1.0, 0.25, 0.3, 1.8),
            vix_dir: rng.bounded(0.0, 0.8, -3.0, 3.0),
            tsy_10y_trend: rng.bounded(0.0, 0.7, -3.0, 3.0),
            dxy_trend: rng.bounded(0.0, 0.6, -3.0, 3.0),
            fed_liquidity: rng.bounded(0.0, 0.5, -2.0, 2.0),
            econ_surprise: rng.bounded(0.0, 1.0, -4.0, 4.0),
            risk_on_off: rng.bounded(0.0, 1.0, -4.0, 4.0),
        }
    }

    fn inputs(&self) -> [(&'static str, f64); 7] {
        [
            ("market_breadth", self.breadth),
            ("vix_direction_5d", self.vix_dir),
            ("treasury_yield_trend_10y", self.tsy_10y_trend),
            ("dollar_index_trend_dxy", self.dxy_trend),
            ("fed_liquidity_proxy", self.fed_liquidity),
            ("economic_surprise_index", self.econ_surprise),
            ("risk_on_off_composite", self.risk_on_off),
        ]
    }
}

/// Deterministic synthetic universe: identical `(seed, size)` yields identical entities.
pub fn generate_universe(seed: i64, size: usize) -> anyhow::Result<Vec<UniverseEntity>> {
    ensure!(
        size >= MIN_UNIVERSE_SIZE,
        "mock universe size must be at least {MIN_UNIVERSE_SIZE} (got {size})"
    );
    ensure!(
        size <= MAX_UNIVERSE_SIZE,
        "mock universe size must be at most {MAX_UNIVERSE_SIZE} (got {size})"
    );

    let mut rng = Mulberry32::new(seed);
    let macro_draws = MacroDraws::draw(&mut rng);

    let universe: Vec<UniverseEntity> = (0..size)
        .map(|i| draw_entity(&mut rng, &macro_draws, ticker_for_index(i)))
        .collect();

    tracing::debug!(seed, size, "generated mock universe");
    Ok(universe)
}

fn draw_entity(rng: &mut Mulberry32, macro_draws: &MacroDraws, ticker: String) -> UniverseEntity {
    let sector = rng.pick(&SECTORS).to_string();
    let current_price = rng.bounded(3.2, 0.65, 1.0, 6.0).exp().clamp(2.0, 800.0);

    let mut inputs: Vec<(&'static str, f64)> = Vec::with_capacity(43);

    // Momentum and price structure.
    let mom5 = rng.bounded(0.4, 1.2, -5.0, 6.0);
    let mom10 = (mom5 + rng.bounded(0.2, 1.0, -4.0, 6.0)).clamp(-8.0, 10.0);
    let mom20 = (mom10 + rng.bounded(0.3, 1.2, -6.0, 10.0)).clamp(-12.0, 16.0);
    inputs.extend([
        ("momentum_5d_pct", mom5),
        ("momentum_10d_pct", mom10),
        ("momentum_20d_pct", mom20),
        ("trend_pos_50dma_pct", rng.bounded(1.2, 3.0, -12.0, 18.0)),
        ("trend_pos_200dma_pct", rng.bounded(2.0, 5.0, -25.0, 30.0)),
        ("rsi", rng.bounded(52.0, 12.0, 5.0, 95.0)),
        ("macd_slope", rng.bounded(0.0, 0.9, -3.0, 3.0)),
        ("breakout_velocity", rng.bounded(-2.0, 4.0, -25.0, 12.0)),
    ]);

    // Earnings and revenue.
    inputs.extend([
        ("eps_yoy_growth_pct", rng.bounded(10.0, 25.0, -60.0, 120.0)),
        ("eps_qoq_accel_pct", rng.bounded(2.0, 10.0, -40.0, 80.0)),
        ("rev_yoy_growth_pct", rng.bounded(8.0, 18.0, -40.0, 90.0)),
        ("rev_qoq_accel_pct", rng.bounded(1.5, 8.0, -35.0, 70.0)),
        ("earnings_surprise_pct", rng.bounded(1.0, 5.5, -20.0, 25.0)),
        ("forward_guidance_revision", rng.bounded(0.0, 1.0, -4.0, 5.0)),
    ]);

    // Options flow.
    inputs.extend([
        ("call_put_ratio", rng.bounded(1.2, 0.45, 0.2, 3.5)),
        ("unusual_options_z", rng.bounded(0.0, 1.0, -2.5, 4.0)),
        ("open_interest_expansion_pct", rng.bounded(4.0, 12.0, -20.0, 60.0)),
        ("dark_pool_flow_bias", rng.bounded(0.0, 1.0, -3.0, 3.0)),
        ("block_trade_accumulation", rng.bounded(0.0, 1.0, -3.0, 3.0)),
    ]);

    // Volatility.
    inputs.extend([
        ("iv_rank_pct", rng.bounded(55.0, 20.0, 1.0, 99.0)),
        ("iv_skew", rng.bounded(0.0, 0.6, -2.0, 2.0)),
        ("vol_compression", rng.bounded(0.35, 0.18, 0.05, 1.2)),
        ("atr_expansion", rng.bounded(1.0, 0.35, 0.3, 2.8)),
    ]);

    // Liquidity and ownership.
    inputs.extend([
        (
            "volume_surge_ratio",
            (1.0 + rng.bounded(0.0, 0.35, -0.4, 1.2)).clamp(0.4, 3.0),
        ),
        ("inst_ownership_change_qoq", rng.bounded(0.2, 1.2, -4.0, 6.0)),
        ("insider_buying_activity", rng.bounded(0.1, 1.0, -3.0, 5.0)),
        ("short_interest_compression", rng.bounded(0.0, 0.8, -3.0, 3.0)),
    ]);

    // Relative strength and rotation.
    let rs_spy = rng.bounded(1.0, 4.0, -18.0, 22.0);
    let rs_sector = (rs_spy + rng.bounded(0.0, 2.2, -14.0, 16.0)).clamp(-25.0, 30.0);
    inputs.extend([
        ("rel_strength_spy_20d", rs_spy),
        ("rel_strength_sector_etf", rs_sector),
        ("sector_momentum_rank", rng.bounded(55.0, 18.0, 1.0, 99.0)),
        ("cross_sector_capital_rotation", rng.bounded(0.0, 1.0, -3.0, 3.0)),
    ]);

    // Risk compression.
    inputs.extend([
        ("beta_adjustment", rng.bounded(0.0, 0.9, -3.0, 3.0)),
        ("downside_deviation_30d", rng.bounded(1.4, 0.45, 0.4, 4.0)),
        ("price_gap_frequency", rng.bounded(0.0, 1.0, -3.0, 3.0)),
        ("accumulation_distribution", rng.bounded(0.0, 1.0, -3.0, 3.0)),
        ("acceleration_curve_fit", rng.bounded(0.0, 1.0, -3.0, 3.0)),
    ]);

    inputs.extend(macro_draws.inputs());

    let m3 = rng.bounded(8.0, 18.0, -40.0, 80.0);
    let m6 = (m3 + rng.bounded(4.0, 14.0, -50.0, 90.0)).clamp(-60.0, 140.0);
    let m12 = (m6 + rng.bounded(6.0, 20.0, -80.0, 180.0)).clamp(-80.0, 260.0);

    UniverseEntity {
        company_name: company_name(&ticker),
        ticker,
        sector,
        current_price,
        inputs: inputs.into_iter().collect::<RawInputs>(),
        trailing: Trailing::new(m3, m6, m12),
    }
}

/// Bijective alphabetic symbol: `AAA..ZZZ`, then `AAAA..ZZZZ`, and so on.
pub fn ticker_for_index(index: usize) -> String {
    let mut rest = index as u128;
    let mut len = TICKER_MIN_LEN;
    while rest >= 26u128.pow(len) {
        rest -= 26u128.pow(len);
        len += 1;
    }

    let mut letters = vec![b'A'; len as usize];
    for slot in letters.iter_mut().rev() {
        *slot = b'A' + (rest % 26) as u8;
        rest /= 26;
    }
    letters.into_iter().map(char::from).collect()
}

pub fn company_name(ticker: &str) -> String {
    let first = ticker.bytes().next().unwrap_or(b'A') as usize;
    format!("{ticker} {}", NAME_SUFFIXES[first % NAME_SUFFIXES.len()])
}
