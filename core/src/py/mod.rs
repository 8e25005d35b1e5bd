// Parity bindings: the offline training pipeline calls these to compare
// its feature rows against what the device computes.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::wrap_pyfunction;

use crate::cli::features_for_records;
use crate::config::PipelineConfig;
use crate::normalizer::Normalizer;
use crate::storage::SampleRecord;
use crate::types::FEATURE_NAMES;

/// Raw features for the last epoch of `samples`
/// (`(timestamp_ms, hr, x, y, z)` tuples), or None below five epochs.
/// Epochs are non-overlapping 6-sample batches, as in offline training.
#[pyfunction]
fn epoch_features(samples: Vec<(u64, f32, f32, f32, f32)>) -> PyResult<Option<Vec<f32>>> {
    let records: Vec<SampleRecord> = samples
        .into_iter()
        .map(|(timestamp_ms, heart_rate, motion_x, motion_y, motion_z)| SampleRecord {
            timestamp_ms,
            heart_rate,
            motion_x,
            motion_y,
            motion_z,
        })
        .collect();
    let features = features_for_records(&records, &PipelineConfig::default())
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(features.map(|f| f.as_slice().to_vec()))
}

/// z-score with the shipped training statistics.
#[pyfunction]
fn normalize(features: Vec<f32>) -> PyResult<Vec<f32>> {
    Normalizer::default()
        .normalize(&features)
        .map(|v| v.as_slice().to_vec())
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

#[pyfunction]
fn feature_names() -> Vec<&'static str> {
    FEATURE_NAMES.to_vec()
}

#[pymodule]
fn sleepstage_core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(epoch_features, m)?)?;
    m.add_function(wrap_pyfunction!(normalize, m)?)?;
    m.add_function(wrap_pyfunction!(feature_names, m)?)?;
    Ok(())
}
