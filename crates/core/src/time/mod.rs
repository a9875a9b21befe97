pub mod run_dates;
