use anyhow::Context;
use chrono::{DateTime, Days, NaiveDate, Utc};

/// Default gap between the current date and the prediction date, in calendar days.
const DEFAULT_PREDICTION_OFFSET_DAYS: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDates {
    pub current_date: NaiveDate,
    pub prediction_date: NaiveDate,
}

/// Current date defaults to today (UTC); prediction date defaults to the next calendar day.
/// No business-day adjustment is applied to either.
pub fn resolve_run_dates(
    current_date_arg: Option<&str>,
    prediction_date_arg: Option<&str>,
    now_utc: DateTime<Utc>,
) -> anyhow::Result<RunDates> {
    let current_date = match current_date_arg {
        Some(s) => parse_date(s).context("invalid current date")?,
        None => now_utc.date_naive(),
    };

    let prediction_date = match prediction_date_arg {
        Some(s) => parse_date(s).context("invalid prediction date")?,
        None => current_date
            .checked_add_days(Days::new(DEFAULT_PREDICTION_OFFSET_DAYS))
            .context("prediction date out of range")?,
    };

    Ok(RunDates {
        current_date,
        prediction_date,
    })
}

pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("expected YYYY-MM-DD, got {s:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn defaults_to_today_and_tomorrow_utc() {
        let now = Utc.with_ymd_and_hms(2026, 1, 31, 23, 59, 0).unwrap();
        let d = resolve_run_dates(None, None, now).unwrap();
        assert_eq!(d.current_date, NaiveDate::from_ymd_opt(2026, 1, 31).unwrap());
        assert_eq!(d.prediction_date, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
    }

    #[test]
    fn weekends_are_not_skipped() {
        // 2026-01-02 is a Friday.
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 12, 0, 0).unwrap();
        let d = resolve_run_dates(None, None, now).unwrap();
        assert_eq!(d.prediction_date, NaiveDate::from_ymd_opt(2026, 1, 3).unwrap());
    }

    #[test]
    fn explicit_dates_win() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 12, 0, 0).unwrap();
        let d = resolve_run_dates(Some("2025-12-30"), None, now).unwrap();
        assert_eq!(d.current_date, NaiveDate::from_ymd_opt(2025, 12, 30).unwrap());
        assert_eq!(d.prediction_date, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());

        let d = resolve_run_dates(Some("2025-12-30"), Some("2026-01-05"), now).unwrap();
        assert_eq!(d.prediction_date, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
    }

    #[test]
    fn rejects_malformed_dates() {
        let now = Utc::now();
        assert!(resolve_run_dates(Some("2026/01/02"), None, now).is_err());
        assert!(resolve_run_dates(None, Some("tomorrow"), now).is_err());
    }
}
