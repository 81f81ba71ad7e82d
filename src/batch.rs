//! Batch prediction over an uploaded CSV table.
//!
//! The whole file is parsed up front, the feature transform runs column-wise
//! over the assembled table, and the model is invoked once for every row in a
//! single matrix product. Everything stays in memory, so cost is proportional
//! to the upload size.

use csv::StringRecord;
use log::info;
use ndarray::Array2;
use thiserror::Error;

use crate::features::{self, NUM_FEATURES};
use crate::model::LinearModel;

/// Header names the uploaded CSV must carry, matching the published template.
pub const REQUIRED_COLUMNS: [&str; NUM_FEATURES] = [
    "Year",
    "Node Size (nm)",
    "Area (mm²)",
    "Transistor Density (tr/mm²)",
    "Power Density (W/cm²)",
];

/// Name of the column appended to the output table.
pub const PREDICTED_COLUMN: &str = "Predicted Count";

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("CSV file must contain the columns: {}", REQUIRED_COLUMNS.join(", "))]
    MissingColumns,
    #[error("row {row}: column '{column}' has non-numeric value '{value}'")]
    InvalidCell {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("failed to process CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write CSV output: {0}")]
    Io(#[from] std::io::Error),
}

impl BatchError {
    /// Missing columns are the caller's mistake; everything else surfaces as
    /// an internal failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, BatchError::MissingColumns)
    }
}

/// Runs the prediction pipeline over CSV bytes and serializes the input table
/// back out with [`PREDICTED_COLUMN`] appended. Row order and every original
/// column, including ones the model ignores, are preserved. Nothing is
/// returned on failure; there are no partial results.
pub fn predict_csv(model: &LinearModel, data: &[u8]) -> Result<Vec<u8>, BatchError> {
    let mut reader = csv::Reader::from_reader(data);
    let headers = reader.headers()?.clone();

    // All five columns must be present before any row is touched.
    let mut column_index = [0usize; NUM_FEATURES];
    for (feature, name) in REQUIRED_COLUMNS.iter().enumerate() {
        match headers.iter().position(|h| h == *name) {
            Some(pos) => column_index[feature] = pos,
            None => return Err(BatchError::MissingColumns),
        }
    }

    let records = reader
        .records()
        .collect::<Result<Vec<StringRecord>, csv::Error>>()?;

    let mut raw = Array2::zeros((records.len(), NUM_FEATURES));
    for (row, record) in records.iter().enumerate() {
        for (feature, &col) in column_index.iter().enumerate() {
            let cell = record.get(col).unwrap_or("");
            raw[[row, feature]] =
                cell.trim()
                    .parse::<f64>()
                    .map_err(|_| BatchError::InvalidCell {
                        row: row + 1,
                        column: REQUIRED_COLUMNS[feature],
                        value: cell.to_string(),
                    })?;
        }
    }

    let pred_log = model.predict_batch(&features::transform_table(raw));

    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut out_headers = headers.clone();
    out_headers.push_field(PREDICTED_COLUMN);
    writer.write_record(&out_headers)?;

    for (record, &log) in records.iter().zip(pred_log.iter()) {
        let count = 10f64.powf(log) as u64;
        let mut row = record.clone();
        row.push_field(&count.to_string());
        writer.write_record(&row)?;
    }

    info!("batch prediction over {} rows", records.len());
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(bytes)
}
