pub mod generator;
pub mod prng;

pub use generator::generate_universe;
