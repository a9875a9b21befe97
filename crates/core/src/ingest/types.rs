use crate::error::{ErrorCode, ModelError};
use chrono::{Months, NaiveDate};
use serde_json::Value;
use std::collections::BTreeMap;

pub const SERIES_KEY: &str = "Time Series (Daily)";
pub const META_KEY: &str = "Meta Data";
const LAST_REFRESHED_KEY: &str = "3. Last Refreshed";
const CLOSE_KEY: &str = "4. close";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSize {
    /// Roughly the latest 100 bars.
    Compact,
    Full,
}

impl OutputSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputSize::Compact => "compact",
            OutputSize::Full => "full",
        }
    }
}

/// Daily closes keyed by bar date. A close that does not parse as a number stays `None`
/// so that a target date landing on it resolves to "missing" rather than an older bar.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    pub symbol: String,
    pub last_refreshed: Option<String>,
    pub closes: BTreeMap<NaiveDate, Option<f64>>,
}

impl DailySeries {
    /// Checks upstream sentinels before reading the series.
    pub fn from_response(symbol: &str, body: &Value) -> anyhow::Result<Self> {
        check_sentinels(symbol, body)?;

        let Some(series) = body.get(SERIES_KEY).and_then(Value::as_object) else {
            return Err(ModelError::new(
                ErrorCode::AlphaVantageMissingData,
                format!("Alpha Vantage missing {SERIES_KEY} for {symbol}."),
            )
            .with_details(body.clone())
            .into());
        };

        let closes = series
            .iter()
            .filter_map(|(date, bar)| {
                let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
                Some((date, bar.get(CLOSE_KEY).and_then(as_number)))
            })
            .collect();

        let last_refreshed = body
            .get(META_KEY)
            .and_then(|m| m.get(LAST_REFRESHED_KEY))
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            symbol: symbol.to_string(),
            last_refreshed,
            closes,
        })
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.closes.keys().next_back().copied()
    }

    /// Close of the most recent bar; must be strictly positive.
    pub fn latest_close(&self) -> anyhow::Result<f64> {
        self.closes
            .values()
            .next_back()
            .copied()
            .flatten()
            .filter(|c| *c > 0.0)
            .ok_or_else(|| {
                ModelError::new(
                    ErrorCode::AlphaVantageMissingData,
                    format!("Alpha Vantage missing latest close for {}.", self.symbol),
                )
                .into()
            })
    }

    /// Percent change from the bar on or before `latest - months` to the latest close.
    /// `None` when the history does not reach back far enough or that bar has no usable close.
    pub fn trailing_return_pct(&self, latest_close: f64, months: u32) -> Option<f64> {
        let target = self.latest_date()?.checked_sub_months(Months::new(months))?;
        let (_, &close) = self.closes.range(..=target).next_back()?;
        let close = close.filter(|c| *c > 0.0)?;
        Some((latest_close - close) / close * 100.0)
    }
}

/// Upstream signals failure inside a 200 body with `Note`, `Information` or `Error Message`.
pub fn check_sentinels(symbol: &str, body: &Value) -> anyhow::Result<()> {
    let sentinel = ["Note", "Information", "Error Message"]
        .iter()
        .find_map(|k| body.get(*k).filter(|v| !v.is_null()));
    let Some(sentinel) = sentinel else {
        return Ok(());
    };

    let message = sentinel
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| format!("Alpha Vantage error for {symbol}."));
    let rate_limited = body
        .get("Note")
        .and_then(Value::as_str)
        .is_some_and(|n| n.to_ascii_lowercase().contains("frequency"));
    let code = if rate_limited {
        ErrorCode::AlphaVantageRateLimit
    } else {
        ErrorCode::AlphaVantageError
    };

    Err(ModelError::new(code, message)
        .with_details(body.clone())
        .into())
}

/// Upstream sends numbers as strings.
fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// Builds an upstream-shaped body from `(date, close)` pairs.
    pub(crate) fn series_body(bars: &[(&str, &str)]) -> Value {
        let series: serde_json::Map<String, Value> = bars
            .iter()
            .map(|(d, c)| {
                (
                    d.to_string(),
                    json!({ "1. open": c, "4. close": c, "6. volume": "1000" }),
                )
            })
            .collect();
        json!({
            "Meta Data": { "2. Symbol": "TEST", "3. Last Refreshed": bars.first().map(|b| b.0) },
            "Time Series (Daily)": series,
        })
    }

    fn code(err: &anyhow::Error) -> Option<ErrorCode> {
        ModelError::code_of(err)
    }

    #[test]
    fn parses_closes_and_meta() {
        let body = series_body(&[("2024-06-14", "110.0"), ("2024-06-13", "100.0")]);
        let s = DailySeries::from_response("TEST", &body).unwrap();
        assert_eq!(s.closes.len(), 2);
        assert_eq!(s.latest_date(), NaiveDate::from_ymd_opt(2024, 6, 14));
        assert_eq!(s.latest_close().unwrap(), 110.0);
        assert_eq!(s.last_refreshed.as_deref(), Some("2024-06-14"));
    }

    #[test]
    fn rate_limit_note_is_distinguished() {
        let body = json!({ "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute." });
        let err = DailySeries::from_response("AAPL", &body).unwrap_err();
        assert_eq!(code(&err), Some(ErrorCode::AlphaVantageRateLimit));

        let body = json!({ "Error Message": "Invalid API call." });
        let err = DailySeries::from_response("AAPL", &body).unwrap_err();
        assert_eq!(code(&err), Some(ErrorCode::AlphaVantageError));
        assert!(err.to_string().contains("Invalid API call."));

        let body = json!({ "Information": "premium endpoint" });
        let err = DailySeries::from_response("AAPL", &body).unwrap_err();
        assert_eq!(code(&err), Some(ErrorCode::AlphaVantageError));
    }

    #[test]
    fn missing_series_is_missing_data() {
        let err = DailySeries::from_response("AAPL", &json!({ "Meta Data": {} })).unwrap_err();
        assert_eq!(code(&err), Some(ErrorCode::AlphaVantageMissingData));
    }

    #[test]
    fn non_positive_latest_close_is_missing_data() {
        let body = series_body(&[("2024-06-14", "0"), ("2024-06-13", "100.0")]);
        let s = DailySeries::from_response("TEST", &body).unwrap();
        let err = s.latest_close().unwrap_err();
        assert_eq!(code(&err), Some(ErrorCode::AlphaVantageMissingData));
    }

    #[test]
    fn trailing_return_uses_bar_on_or_before_target() {
        let body = series_body(&[
            ("2024-06-14", "120.0"),
            ("2024-03-15", "999.0"),
            ("2024-03-13", "100.0"),
            ("2024-01-02", "80.0"),
        ]);
        let s = DailySeries::from_response("TEST", &body).unwrap();
        let latest = s.latest_close().unwrap();
        // Target 2024-03-14 falls between bars; the 03-13 bar is used.
        let r3 = s.trailing_return_pct(latest, 3).unwrap();
        assert!((r3 - 20.0).abs() < 1e-9);
        assert_eq!(s.trailing_return_pct(latest, 6), None);
    }

    #[test]
    fn month_subtraction_clamps_to_month_end() {
        let body = series_body(&[("2024-05-31", "150.0"), ("2024-02-29", "100.0")]);
        let s = DailySeries::from_response("TEST", &body).unwrap();
        let r3 = s.trailing_return_pct(150.0, 3).unwrap();
        assert!((r3 - 50.0).abs() < 1e-9);
    }

    #[test]
    fn unusable_close_at_target_is_unresolved() {
        let body = series_body(&[("2024-06-14", "120.0"), ("2024-03-14", "n/a"), ("2024-03-01", "90.0")]);
        let s = DailySeries::from_response("TEST", &body).unwrap();
        assert_eq!(s.trailing_return_pct(120.0, 3), None);
    }
}
