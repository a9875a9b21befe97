pub mod normalize;
pub mod rank;
pub mod score;

/// Rounds half away from zero to `decimals` places.
pub(crate) fn round_to(x: f64, decimals: i32) -> f64 {
    let p = 10f64.powi(decimals);
    (x * p).round() / p
}
