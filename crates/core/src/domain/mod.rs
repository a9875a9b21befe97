pub mod contract;
pub mod factors;
pub mod run_config;
pub mod universe;
