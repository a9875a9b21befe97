use crate::domain::factors::{Scaling, FACTORS, FACTOR_COUNT};
use crate::domain::universe::RawInputs;
use serde::Serialize;
use std::collections::BTreeMap;

/// Value used for any input that cannot be scaled.
pub const NEUTRAL: f64 = 0.5;

/// Clamped linear scale of `value` from `[min, max]` onto `[0, 1]`.
pub fn norm01(value: Option<f64>, min: f64, max: f64) -> f64 {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return NEUTRAL;
    };
    if !min.is_finite() || !max.is_finite() || max == min {
        return NEUTRAL;
    }
    ((v - min) / (max - min)).clamp(0.0, 1.0)
}

/// Maps `[-|bound|, +|bound|]` onto `[0, 1]` with zero at 0.5.
pub fn norm_centered(value: Option<f64>, bound: f64) -> f64 {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return NEUTRAL;
    };
    if !bound.is_finite() {
        return NEUTRAL;
    }
    let hi = bound.abs();
    let lo = -hi;
    norm01(Some(v.clamp(lo, hi)), lo, hi)
}

pub fn apply(scaling: Scaling, value: Option<f64>) -> f64 {
    match scaling {
        Scaling::Linear { min, max } => norm01(value, min, max),
        Scaling::Centered { bound } => norm_centered(value, bound),
        Scaling::Inverted { min, max } => 1.0 - norm01(value, min, max),
        Scaling::InvertedCentered { bound } => 1.0 - norm_centered(value, bound),
    }
}

/// Factor key -> normalized value in [0, 1]. Built once per entity and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedFactors(BTreeMap<&'static str, f64>);

impl NormalizedFactors {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

impl FromIterator<(&'static str, f64)> for NormalizedFactors {
    fn from_iter<I: IntoIterator<Item = (&'static str, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

pub fn normalize(raw: &RawInputs) -> NormalizedFactors {
    let out: NormalizedFactors = FACTORS
        .iter()
        .map(|f| (f.key, apply(f.scaling, raw.get(f.input_key))))
        .collect();
    debug_assert_eq!(out.len(), FACTOR_COUNT);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_are_neutral_everywhere() {
        let n = normalize(&RawInputs::new());
        assert_eq!(n.len(), FACTOR_COUNT);
        for (key, v) in n.iter() {
            assert_eq!(v, NEUTRAL, "{key} should be neutral");
        }
    }

    #[test]
    fn linear_clamps_and_handles_degenerate_ranges() {
        assert_eq!(norm01(Some(50.0), 0.0, 100.0), 0.5);
        assert_eq!(norm01(Some(-10.0), 0.0, 100.0), 0.0);
        assert_eq!(norm01(Some(500.0), 0.0, 100.0), 1.0);
        assert_eq!(norm01(Some(3.0), 2.0, 2.0), NEUTRAL);
        assert_eq!(norm01(Some(f64::NAN), 0.0, 1.0), NEUTRAL);
        assert_eq!(norm01(Some(f64::INFINITY), 0.0, 1.0), NEUTRAL);
        assert_eq!(norm01(None, 0.0, 1.0), NEUTRAL);
    }

    #[test]
    fn centered_maps_zero_to_midpoint() {
        assert_eq!(norm_centered(Some(0.0), 8.0), 0.5);
        assert_eq!(norm_centered(Some(8.0), 8.0), 1.0);
        assert_eq!(norm_centered(Some(-80.0), 8.0), 0.0);
        assert_eq!(norm_centered(Some(4.0), -8.0), 0.75);
        assert_eq!(norm_centered(Some(1.0), 0.0), NEUTRAL);
    }

    #[test]
    fn inverted_factors_prefer_lower_raw_values() {
        let low = normalize(&RawInputs::new().with("downside_deviation_30d", 0.4));
        let high = normalize(&RawInputs::new().with("downside_deviation_30d", 4.0));
        assert_eq!(low.get("downside_deviation"), Some(1.0));
        assert_eq!(high.get("downside_deviation"), Some(0.0));

        let near_high = normalize(&RawInputs::new().with("breakout_velocity", -30.0));
        assert_eq!(near_high.get("breakout_velocity"), Some(1.0));

        let rising_vix = normalize(&RawInputs::new().with("vix_direction_5d", 3.5));
        assert_eq!(rising_vix.get("vix_direction"), Some(0.0));
    }

    #[test]
    fn values_stay_in_unit_interval() {
        let extremes = [-1e12, -3.0, 0.0, 0.7, 42.0, 1e12];
        for x in extremes {
            let raw: RawInputs = FACTORS.iter().map(|f| (f.input_key, x)).collect();
            for (key, v) in normalize(&raw).iter() {
                assert!((0.0..=1.0).contains(&v), "{key}={v} for input {x}");
            }
        }
    }

    #[test]
    fn monotonic_in_valid_range() {
        let a = normalize(&RawInputs::new().with("rsi", 30.0));
        let b = normalize(&RawInputs::new().with("rsi", 70.0));
        assert!(a.get("rsi_compression").unwrap() < b.get("rsi_compression").unwrap());
    }
}
