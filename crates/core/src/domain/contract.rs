use anyhow::{bail, ensure, Context};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MODEL_VERSION: &str = "Stock Check v1.2";

/// Always appended as the last result row, whatever its natural rank.
pub const APPEND_TICKER: &str = "INTC";

pub const TOP_N: usize = 10;
pub const RESULT_ROWS: usize = TOP_N + 1;

/// Locked column order of a serialized [`ResultRow`]. Never change.
pub const RESULT_COLUMNS: [&str; 10] = [
    "Rank",
    "Ticker",
    "Company Name",
    "Sector",
    "Current Price",
    "Predicted Price",
    "Predicted 1-Day % Growth",
    "3-Month",
    "6-Month",
    "12-Month",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataMode {
    Mock,
    Live,
}

impl DataMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataMode::Mock => "MOCK",
            DataMode::Live => "LIVE",
        }
    }
}

impl fmt::Display for DataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MOCK" => Ok(DataMode::Mock),
            "LIVE" => Ok(DataMode::Live),
            other => bail!("unknown data_mode: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeHeader {
    #[serde(rename = "TRADE")]
    Trade,
    #[serde(rename = "NO TRADE")]
    NoTrade,
}

impl TradeHeader {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeHeader::Trade => "TRADE",
            TradeHeader::NoTrade => "NO TRADE",
        }
    }
}

impl fmt::Display for TradeHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One output row. Field declaration order is the serialized column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    #[serde(rename = "Rank")]
    pub rank: Option<u32>,
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Company Name")]
    pub company_name: String,
    #[serde(rename = "Sector")]
    pub sector: String,
    #[serde(rename = "Current Price")]
    pub current_price: f64,
    #[serde(rename = "Predicted Price")]
    pub predicted_price: f64,
    #[serde(rename = "Predicted 1-Day % Growth")]
    pub predicted_1d_growth_pct: f64,
    #[serde(rename = "3-Month")]
    pub trailing_3m: Option<f64>,
    #[serde(rename = "6-Month")]
    pub trailing_6m: Option<f64>,
    #[serde(rename = "12-Month")]
    pub trailing_12m: Option<f64>,
}

impl ResultRow {
    /// Keys of the serialized row, in emitted order.
    pub fn column_keys(&self) -> anyhow::Result<Vec<String>> {
        let v = serde_json::to_value(self).context("serialize result row failed")?;
        let serde_json::Value::Object(obj) = v else {
            bail!("result row did not serialize to an object");
        };
        Ok(obj.keys().cloned().collect())
    }

    pub fn has_locked_columns(&self) -> bool {
        self.column_keys()
            .map(|keys| keys.iter().map(String::as_str).eq(RESULT_COLUMNS))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub model_version: String,
    pub data_mode: DataMode,
    pub current_date: NaiveDate,
    pub prediction_date: NaiveDate,
    pub trade_header: TradeHeader,
    pub sector_warning: bool,
    pub results: Vec<ResultRow>,
    pub created_at: DateTime<Utc>,
}

impl RunResult {
    pub fn top10(&self) -> &[ResultRow] {
        &self.results[..self.results.len().min(TOP_N)]
    }

    pub fn appended_row(&self) -> Option<&ResultRow> {
        self.results.get(TOP_N)
    }

    /// Checks the structural output contract. Used before persisting and after loading.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.results.len() == RESULT_ROWS,
            "run result must contain exactly {RESULT_ROWS} rows (got {})",
            self.results.len()
        );

        for (idx, row) in self.top10().iter().enumerate() {
            let expected = idx as u32 + 1;
            ensure!(
                row.rank == Some(expected),
                "row {idx} must have rank {expected} (got {:?})",
                row.rank
            );
            ensure!(!row.ticker.trim().is_empty(), "ticker must be non-empty");
            ensure!(
                row.current_price.is_finite() && row.predicted_price.is_finite(),
                "prices must be finite for {}",
                row.ticker
            );
        }

        for pair in self.top10().windows(2) {
            ensure!(
                pair[0].predicted_1d_growth_pct >= pair[1].predicted_1d_growth_pct,
                "top rows must be sorted by predicted growth ({} before {})",
                pair[0].ticker,
                pair[1].ticker
            );
        }

        let last = &self.results[TOP_N];
        ensure!(
            last.rank.is_none(),
            "appended row must have a null rank (got {:?})",
            last.rank
        );
        ensure!(
            last.ticker == APPEND_TICKER,
            "appended row must be {APPEND_TICKER} (got {})",
            last.ticker
        );

        Ok(())
    }
}
