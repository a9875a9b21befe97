pub mod live;
pub mod provider;
pub mod types;
