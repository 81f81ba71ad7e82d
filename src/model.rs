//! The pre-fit linear regression and its on-disk safetensors format.
//!
//! The artifact holds two F64 tensors: `coefficients` with one weight per
//! feature and `intercept` with a single bias value. The model maps a feature
//! vector to `log10` of the transistor count. Training happens elsewhere;
//! this crate only loads and queries the fitted weights.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2};
use safetensors::tensor::TensorView;
use safetensors::{Dtype, SafeTensors};
use thiserror::Error;

use crate::features::{FeatureVector, NUM_FEATURES};

pub const COEFFICIENTS_TENSOR: &str = "coefficients";
pub const INTERCEPT_TENSOR: &str = "intercept";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid safetensors data: {0}")]
    Format(#[from] safetensors::SafeTensorError),
    #[error("model tensor '{0}' is missing")]
    MissingTensor(&'static str),
    #[error("model tensor '{name}' has dtype {found:?}, expected F64")]
    WrongDtype { name: &'static str, found: Dtype },
    #[error("model tensor '{name}' has shape {found:?}, expected {expected:?}")]
    WrongShape {
        name: &'static str,
        found: Vec<usize>,
        expected: Vec<usize>,
    },
}

/// Immutable linear regression over the five-feature input.
///
/// Loaded once at startup and shared read-only between request handlers, so
/// prediction needs no locking.
#[derive(Debug, Clone)]
pub struct LinearModel {
    coefficients: Array1<f64>,
    intercept: f64,
}

impl LinearModel {
    /// Builds a model directly from weights. Tests use this to substitute a
    /// stub with known output instead of reading an artifact from disk.
    pub fn from_parts(coefficients: [f64; NUM_FEATURES], intercept: f64) -> Self {
        Self {
            coefficients: Array1::from(coefficients.to_vec()),
            intercept,
        }
    }

    /// Loads the fitted weights from a safetensors file, validating tensor
    /// names, dtype and shapes before accepting them.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let bytes = fs::read(path).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let tensors = SafeTensors::deserialize(&bytes)?;

        let coefficients = f64_tensor(&tensors, COEFFICIENTS_TENSOR, &[NUM_FEATURES])?;
        let intercept = f64_tensor(&tensors, INTERCEPT_TENSOR, &[1])?;

        Ok(Self {
            coefficients: Array1::from(coefficients),
            intercept: intercept[0],
        })
    }

    /// Writes the weights back out in the same format [`LinearModel::load`]
    /// reads, for converting artifacts produced by the training pipeline.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let coef_bytes: Vec<u8> = self
            .coefficients
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let intercept_bytes: Vec<u8> = self.intercept.to_le_bytes().to_vec();

        let views = vec![
            (
                COEFFICIENTS_TENSOR,
                TensorView::new(Dtype::F64, vec![NUM_FEATURES], &coef_bytes)?,
            ),
            (
                INTERCEPT_TENSOR,
                TensorView::new(Dtype::F64, vec![1], &intercept_bytes)?,
            ),
        ];
        let metadata: Option<HashMap<String, String>> = None;
        let bytes = safetensors::serialize(views, &metadata)?;
        fs::write(path, bytes).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Predicted `log10(transistor count)` for one feature vector.
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let values = features.as_array();
        let weighted: f64 = self
            .coefficients
            .iter()
            .zip(values.iter())
            .map(|(c, x)| c * x)
            .sum();
        weighted + self.intercept
    }

    /// Predicted `log10(transistor count)` for every row of a feature table,
    /// as a single matrix-vector product.
    pub fn predict_batch(&self, features: &Array2<f64>) -> Array1<f64> {
        features.dot(&self.coefficients) + self.intercept
    }

    pub fn num_coefficients(&self) -> usize {
        self.coefficients.len()
    }
}

fn f64_tensor(
    tensors: &SafeTensors,
    name: &'static str,
    expected_shape: &[usize],
) -> Result<Vec<f64>, ModelError> {
    let view = tensors
        .tensor(name)
        .map_err(|_| ModelError::MissingTensor(name))?;
    if view.dtype() != Dtype::F64 {
        return Err(ModelError::WrongDtype {
            name,
            found: view.dtype(),
        });
    }
    if view.shape() != expected_shape {
        return Err(ModelError::WrongShape {
            name,
            found: view.shape().to_vec(),
            expected: expected_shape.to_vec(),
        });
    }
    let values = view
        .data()
        .chunks_exact(std::mem::size_of::<f64>())
        .map(|chunk| f64::from_le_bytes(chunk.try_into().unwrap())) // unwrap is safe due to chunks_exact
        .collect();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{transform, RawInput};
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use tempfile::tempdir;

    fn sample_model() -> LinearModel {
        LinearModel::from_parts([0.05, -0.4, 0.3, 0.9, 0.01], -90.0)
    }

    #[test]
    fn predict_is_dot_product_plus_intercept() {
        let model = LinearModel::from_parts([1.0, 2.0, 3.0, 4.0, 5.0], 0.5);
        let features = FeatureVector {
            year: 1.0,
            log_node: 1.0,
            log_area: 1.0,
            log_density: 1.0,
            power_density: 1.0,
        };
        assert_abs_diff_eq!(model.predict(&features), 15.5);
    }

    #[test]
    fn predict_batch_matches_scalar_predict() {
        let model = sample_model();
        let inputs = [
            RawInput {
                year: 2015.0,
                node_size: 14.0,
                area: 122.0,
                trans_density: 16000.0,
                power_density: 0.6,
            },
            RawInput {
                year: 2022.0,
                node_size: 4.0,
                area: 108.0,
                trans_density: 137000.0,
                power_density: 0.9,
            },
        ];

        let mut table = Array2::zeros((inputs.len(), NUM_FEATURES));
        for (row, input) in inputs.iter().enumerate() {
            let features = transform(input);
            for (col, value) in features.as_array().iter().enumerate() {
                table[[row, col]] = *value;
            }
        }

        let batch = model.predict_batch(&table);
        for (row, input) in inputs.iter().enumerate() {
            assert_abs_diff_eq!(batch[row], model.predict(&transform(input)), epsilon = 1e-9);
        }
    }

    #[test]
    fn predict_batch_on_empty_table_yields_empty_output() {
        let model = sample_model();
        let table = Array2::zeros((0, NUM_FEATURES));
        assert_eq!(model.predict_batch(&table).len(), 0);
    }

    #[test]
    fn save_then_load_round_trips_weights() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model_linear.safetensors");

        let model = sample_model();
        model.save(&path).unwrap();

        let loaded = LinearModel::load(&path).unwrap();
        let features = transform(&RawInput {
            year: 2020.0,
            node_size: 7.0,
            area: 100.0,
            trans_density: 100000.0,
            power_density: 0.7,
        });
        assert_abs_diff_eq!(loaded.predict(&features), model.predict(&features));
        assert_eq!(loaded.num_coefficients(), NUM_FEATURES);
    }

    #[test]
    fn load_rejects_missing_file() {
        let err = LinearModel::load(Path::new("does/not/exist.safetensors")).unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
    }

    #[test]
    fn load_rejects_missing_tensor() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.safetensors");

        // Artifact with only the coefficients tensor.
        let coef: Vec<u8> = [1.0f64, 2.0, 3.0, 4.0, 5.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let views = vec![(
            COEFFICIENTS_TENSOR,
            TensorView::new(Dtype::F64, vec![NUM_FEATURES], &coef).unwrap(),
        )];
        let bytes = safetensors::serialize(views, &None).unwrap();
        fs::write(&path, bytes).unwrap();

        let err = LinearModel::load(&path).unwrap_err();
        assert!(matches!(err, ModelError::MissingTensor(INTERCEPT_TENSOR)));
        assert_eq!(err.to_string(), "model tensor 'intercept' is missing");
    }

    #[test]
    fn load_rejects_wrong_dtype() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f32.safetensors");

        let coef: Vec<u8> = [1.0f32, 2.0, 3.0, 4.0, 5.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let intercept: Vec<u8> = 0.5f32.to_le_bytes().to_vec();
        let views = vec![
            (
                COEFFICIENTS_TENSOR,
                TensorView::new(Dtype::F32, vec![NUM_FEATURES], &coef).unwrap(),
            ),
            (
                INTERCEPT_TENSOR,
                TensorView::new(Dtype::F32, vec![1], &intercept).unwrap(),
            ),
        ];
        let bytes = safetensors::serialize(views, &None).unwrap();
        fs::write(&path, bytes).unwrap();

        let err = LinearModel::load(&path).unwrap_err();
        assert!(matches!(
            err,
            ModelError::WrongDtype {
                found: Dtype::F32,
                ..
            }
        ));
    }

    #[test]
    fn load_rejects_wrong_shape() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.safetensors");

        let coef: Vec<u8> = [1.0f64, 2.0, 3.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let intercept: Vec<u8> = 0.5f64.to_le_bytes().to_vec();
        let views = vec![
            (
                COEFFICIENTS_TENSOR,
                TensorView::new(Dtype::F64, vec![3], &coef).unwrap(),
            ),
            (
                INTERCEPT_TENSOR,
                TensorView::new(Dtype::F64, vec![1], &intercept).unwrap(),
            ),
        ];
        let bytes = safetensors::serialize(views, &None).unwrap();
        fs::write(&path, bytes).unwrap();

        let err = LinearModel::load(&path).unwrap_err();
        match err {
            ModelError::WrongShape {
                name,
                found,
                expected,
            } => {
                assert_eq!(name, COEFFICIENTS_TENSOR);
                assert_eq!(found, vec![3]);
                assert_eq!(expected, vec![NUM_FEATURES]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn load_rejects_garbage_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.safetensors");
        fs::write(&path, b"this is not a safetensors file").unwrap();

        let err = LinearModel::load(&path).unwrap_err();
        assert!(matches!(err, ModelError::Format(_)));
    }

    #[test]
    fn predict_batch_rows_are_independent() {
        let model = sample_model();
        let single = array![[2020.0, 1.0, 2.0, 5.0, 0.7]];
        let double = array![
            [2020.0, 1.0, 2.0, 5.0, 0.7],
            [1980.0, 0.3, 1.1, 3.0, 0.2],
        ];
        let one = model.predict_batch(&single);
        let two = model.predict_batch(&double);
        assert_abs_diff_eq!(one[0], two[0], epsilon = 1e-12);
    }
}
