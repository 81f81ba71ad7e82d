//! Prediction service for transistor counts from chip-design parameters.
//!
//! A pre-fit linear regression (loaded once from a safetensors artifact) maps
//! five features to `log10` of the transistor count. The crate exposes the
//! transform/predict pipeline for single records and CSV batches, the
//! Moore's-Law reference it compares against, and the Actix web surface that
//! serves both.

pub mod batch;
pub mod config;
pub mod features;
pub mod model;
pub mod moore;
pub mod predictor;
pub mod ui;
