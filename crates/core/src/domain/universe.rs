use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw per-ticker signals keyed by input field name (see `Factor::input_key`).
/// Missing or non-finite fields are neutral during normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInputs(BTreeMap<String, f64>);

impl RawInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn with(mut self, key: &str, value: f64) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for RawInputs {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Trailing percent returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Trailing {
    #[serde(rename = "3m")]
    pub m3: Option<f64>,
    #[serde(rename = "6m")]
    pub m6: Option<f64>,
    #[serde(rename = "12m")]
    pub m12: Option<f64>,
}

impl Trailing {
    pub fn new(m3: f64, m6: f64, m12: f64) -> Self {
        Self {
            m3: Some(m3),
            m6: Some(m6),
            m12: Some(m12),
        }
    }

    pub fn is_complete(&self) -> bool {
        [self.m3, self.m6, self.m12]
            .iter()
            .all(|v| v.is_some_and(f64::is_finite))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseEntity {
    pub ticker: String,
    pub company_name: String,
    pub sector: String,
    pub current_price: f64,
    pub inputs: RawInputs,
    pub trailing: Trailing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredEntity {
    #[serde(flatten)]
    pub entity: UniverseEntity,
    /// Percentage points, rounded to 3 decimals.
    pub predicted_1d_growth_pct: f64,
    /// Rounded to 2 decimals.
    pub predicted_price: f64,
}
