use crate::domain::factors::FACTORS;
use crate::domain::universe::{ScoredEntity, UniverseEntity};
use crate::model::normalize::{normalize, NormalizedFactors, NEUTRAL};
use crate::model::round_to;

/// Lower end of the predicted daily growth range, in percentage points.
pub const GROWTH_FLOOR_PCT: f64 = -0.5;
/// Width of the predicted daily growth range (so the ceiling is +1.5).
pub const GROWTH_SPAN_PCT: f64 = 2.0;

/// Weighted average of the normalized factors, remapped to `[-0.5, +1.5]` percent.
/// Missing or non-finite factor values count as neutral so the weight sum never shrinks.
pub fn score(normalized: &NormalizedFactors) -> f64 {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for f in FACTORS.iter() {
        let v = normalized
            .get(f.key)
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 1.0))
            .unwrap_or(NEUTRAL);
        weighted_sum += v * f.weight_pct;
        total_weight += f.weight_pct;
    }

    let avg01 = if total_weight > 0.0 {
        weighted_sum / total_weight
    } else {
        NEUTRAL
    };
    GROWTH_FLOOR_PCT + avg01 * GROWTH_SPAN_PCT
}

pub fn score_entity(entity: UniverseEntity) -> ScoredEntity {
    let growth = round_to(score(&normalize(&entity.inputs)), 3);
    let current = if entity.current_price.is_finite() {
        entity.current_price
    } else {
        0.0
    };
    let predicted_price = round_to(current * (1.0 + growth / 100.0), 2);

    ScoredEntity {
        entity,
        predicted_1d_growth_pct: growth,
        predicted_price,
    }
}
