//! Single-record prediction pipeline: transform, model call, bounds and
//! Moore's-Law comparison, wire formatting.

use serde::Serialize;
use thiserror::Error;

use crate::features::{self, RawInput};
use crate::model::LinearModel;
use crate::moore;

/// Half-width of the reported confidence interval, as a fraction of the
/// predicted count. A heuristic constant rather than anything derived from
/// the model residuals, which is why it stays configurable.
pub const DEFAULT_CONFIDENCE_BAND: f64 = 0.20;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("prediction overflowed the numeric range")]
    NonFinite,
}

/// One successful prediction, already formatted for the wire. Field names
/// are fixed: the deployed front end reads these exact keys.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Prediction {
    pub prediction_log: f64,
    pub prediction_count: u64,
    pub formatted_count: String,
    pub lower_bound: String,
    pub upper_bound: String,
    pub moores_comp: String,
    pub moores_val: u64,
}

/// Wire-level outcome of a prediction request. Serializes with a `status`
/// tag so callers branch on `status == "success"`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PredictResponse {
    Success(Prediction),
    Error { message: String },
}

impl PredictResponse {
    pub fn error(message: impl Into<String>) -> Self {
        PredictResponse::Error {
            message: message.into(),
        }
    }
}

/// Owns the loaded model plus the interval configuration. Constructed once
/// at startup and handed to the HTTP layer as shared state; prediction is
/// read-only, so concurrent requests need no synchronization.
#[derive(Debug, Clone)]
pub struct Predictor {
    model: LinearModel,
    confidence_band: f64,
}

impl Predictor {
    pub fn new(model: LinearModel, confidence_band: f64) -> Self {
        Self {
            model,
            confidence_band,
        }
    }

    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    pub fn confidence_band(&self) -> f64 {
        self.confidence_band
    }

    /// Runs the full single-record pipeline. Bounds and integer counts are
    /// truncated, not rounded, matching the fitted pipeline's conversion.
    pub fn predict_record(&self, input: &RawInput) -> Result<Prediction, PredictError> {
        let features = features::transform(input);
        let pred_log = self.model.predict(&features);
        let pred_count = 10f64.powf(pred_log);

        let projection = moore::projection(input.year);
        if !pred_count.is_finite() || !projection.is_finite() || projection == 0.0 {
            return Err(PredictError::NonFinite);
        }

        let lower = pred_count * (1.0 - self.confidence_band);
        let upper = pred_count * (1.0 + self.confidence_band);
        let deviation = moore::deviation_pct(pred_count, projection);

        Ok(Prediction {
            prediction_log: round4(pred_log),
            prediction_count: pred_count as u64,
            formatted_count: format_thousands(pred_count as u64),
            lower_bound: format_thousands(lower as u64),
            upper_bound: format_thousands(upper as u64),
            moores_comp: moore::comparison_text(deviation),
            moores_val: projection as u64,
        })
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Renders an integer with comma thousands separators, e.g. `10,000,000,000`.
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
