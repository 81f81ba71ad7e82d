//! Raw inputs and the feature transform applied before every model call.

use ndarray::Array2;
use serde_json::Value;
use thiserror::Error;

/// Number of features the regression was fit against.
pub const NUM_FEATURES: usize = 5;

/// Column order the regression was fit against. The model consumes features
/// by position, so a reordering here silently changes every prediction
/// without producing any error.
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "Year",
    "Log_Node",
    "Log_Area",
    "Log_Density",
    "Power Density (W/cm²)",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    #[error("field '{0}' is not a number")]
    NotNumeric(&'static str),
}

/// One prediction request as submitted by the caller, before any transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawInput {
    pub year: f64,
    pub node_size: f64,
    pub area: f64,
    pub trans_density: f64,
    pub power_density: f64,
}

impl RawInput {
    /// Extracts the five required fields from a JSON object. The deployed
    /// form posts some values as JSON strings and some as numbers, so both
    /// are accepted for every field.
    pub fn from_json(data: &Value) -> Result<Self, InputError> {
        Ok(Self {
            year: numeric_field(data, "year")?,
            node_size: numeric_field(data, "node_size")?,
            area: numeric_field(data, "area")?,
            trans_density: numeric_field(data, "trans_density")?,
            power_density: numeric_field(data, "power_density")?,
        })
    }
}

fn numeric_field(data: &Value, key: &'static str) -> Result<f64, InputError> {
    let value = data.get(key).ok_or(InputError::MissingField(key))?;
    match value {
        Value::Number(n) => n.as_f64().ok_or(InputError::NotNumeric(key)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| InputError::NotNumeric(key)),
        _ => Err(InputError::NotNumeric(key)),
    }
}

/// The transformed representation the model expects, in [`FEATURE_NAMES`] order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub year: f64,
    pub log_node: f64,
    pub log_area: f64,
    pub log_density: f64,
    pub power_density: f64,
}

impl FeatureVector {
    pub fn as_array(&self) -> [f64; NUM_FEATURES] {
        [
            self.year,
            self.log_node,
            self.log_area,
            self.log_density,
            self.power_density,
        ]
    }
}

/// Maps a non-positive value to exactly 0.0 instead of NaN or -inf. The
/// training pipeline used the same guard, so keeping it preserves parity with
/// the fitted feature distribution even though such inputs fall outside it.
pub fn log10_or_zero(x: f64) -> f64 {
    if x > 0.0 {
        x.log10()
    } else {
        0.0
    }
}

/// Builds the model's feature vector from one raw input. Year and power
/// density pass through unchanged; the size-like inputs are log-scaled.
pub fn transform(input: &RawInput) -> FeatureVector {
    FeatureVector {
        year: input.year,
        log_node: log10_or_zero(input.node_size),
        log_area: log10_or_zero(input.area),
        log_density: log10_or_zero(input.trans_density),
        power_density: input.power_density,
    }
}

/// Column-wise variant of [`transform`] for batch prediction. `raw` holds one
/// row per record with columns already in [`FEATURE_NAMES`] order; the three
/// log columns are rewritten in place with the same per-element zero guard.
pub fn transform_table(mut raw: Array2<f64>) -> Array2<f64> {
    for col in 1..=3 {
        raw.column_mut(col).mapv_inplace(log10_or_zero);
    }
    raw
}
