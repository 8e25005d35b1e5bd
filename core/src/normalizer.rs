use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{from_json_str, PipelineError, Result};
use crate::metrics::NUMERIC_ANOMALIES_TOTAL;
use crate::types::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};

/// Floor applied to every std before dividing.
pub const STD_EPSILON: f32 = 1e-6;

/// Training-set feature means shipped with the live model.
pub const TRAINING_MEANS: [f32; FEATURE_COUNT] = [
    65.12563, 1.513927, 63.43720, 67.00959, 1.489238,
    0.011297, 0.028338, 0.017323, 0.043144, 0.015890,
    0.038762, 65.04655, 1.512443, 0.011227, 0.017279,
    0.015852, 64.96801, 1.510485, 0.011221, 0.017274,
    0.015848, 64.88921, 1.508884, 0.011204, 0.017229,
    0.015840, 64.80930, 1.506395, 0.011190, 0.017184,
    0.015823, 64.32950, 2.212068, 1.493387, 1.220352,
    0.501279,
];

/// Training-set feature standard deviations shipped with the live model.
pub const TRAINING_STDS: [f32; FEATURE_COUNT] = [
    10.123146, 1.914362, 9.763583, 10.921787, 1.840885,
    0.051693, 0.128271, 0.072134, 0.178139, 0.076200,
    0.180370, 10.361588, 1.914734, 0.051368, 0.072078,
    0.076114, 10.594675, 1.914778, 0.051366, 0.072079,
    0.076115, 10.822111, 1.915026, 0.051327, 0.071867,
    0.076111, 11.044294, 1.913166, 0.051320, 0.071798,
    0.076098, 11.871069, 2.192346, 0.939436, 1.131393,
    3.435120,
];

/// Per-feature mean/std pair, indexed like [`FEATURE_NAMES`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationStats {
    mean: [f32; FEATURE_COUNT],
    std: [f32; FEATURE_COUNT],
}

// Export format of the training pipeline.
#[derive(Debug, Deserialize)]
struct StatsDocument {
    features: Vec<String>,
    mean: HashMap<String, f64>,
    std: HashMap<String, f64>,
}

impl NormalizationStats {
    pub fn new(mean: [f32; FEATURE_COUNT], std: [f32; FEATURE_COUNT]) -> Self {
        Self { mean, std }
    }

    /// The statistics baked into the shipped model.
    pub fn training() -> Self {
        Self::new(TRAINING_MEANS, TRAINING_STDS)
    }

    /// mean 0 / std 1 everywhere: normalization becomes a no-op.
    pub fn identity() -> Self {
        Self::new([0.0; FEATURE_COUNT], [1.0; FEATURE_COUNT])
    }

    pub fn mean(&self) -> &[f32; FEATURE_COUNT] {
        &self.mean
    }

    pub fn std(&self) -> &[f32; FEATURE_COUNT] {
        &self.std
    }

    pub fn from_json_str(txt: &str) -> Result<Self> {
        let doc: StatsDocument = from_json_str(txt)?;

        if doc.features.len() != FEATURE_COUNT {
            return Err(PipelineError::Stats(format!(
                "expected {FEATURE_COUNT} features, document lists {}",
                doc.features.len()
            )));
        }
        if let Some((i, (got, want))) = doc
            .features
            .iter()
            .zip(FEATURE_NAMES.iter())
            .enumerate()
            .find(|(_, (got, want))| got.as_str() != **want)
        {
            return Err(PipelineError::Stats(format!(
                "feature order mismatch at index {i}: expected {want}, got {got}"
            )));
        }

        let mut mean = [0.0f32; FEATURE_COUNT];
        let mut std = [0.0f32; FEATURE_COUNT];
        for (i, name) in FEATURE_NAMES.iter().enumerate() {
            mean[i] = lookup(&doc.mean, "mean", name)?;
            std[i] = lookup(&doc.std, "std", name)?;
        }
        Ok(Self { mean, std })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let txt = std::fs::read_to_string(path)?;
        let stats = Self::from_json_str(&txt)?;
        log::info!("normalization stats loaded from {}", path.display());
        Ok(stats)
    }
}

fn lookup(map: &HashMap<String, f64>, table: &str, name: &str) -> Result<f32> {
    match map.get(name) {
        Some(v) if v.is_finite() => Ok(*v as f32),
        Some(v) => Err(PipelineError::Stats(format!("{table}[{name}] is not finite: {v}"))),
        None => Err(PipelineError::Stats(format!("{table} has no entry for {name}"))),
    }
}

/// Fixed z-score normalization. Read-only after construction.
#[derive(Debug, Clone)]
pub struct Normalizer {
    stats: NormalizationStats,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NormalizationStats::training())
    }
}

impl Normalizer {
    pub fn new(stats: NormalizationStats) -> Self {
        Self { stats }
    }

    pub fn stats(&self) -> &NormalizationStats {
        &self.stats
    }

    /// Normalize a raw slice; the length must be exactly [`FEATURE_COUNT`].
    pub fn normalize(&self, raw: &[f32]) -> Result<FeatureVector> {
        if raw.len() != FEATURE_COUNT {
            log::error!("expected {FEATURE_COUNT} features, got {}", raw.len());
            return Err(PipelineError::FeatureLength {
                expected: FEATURE_COUNT,
                actual: raw.len(),
            });
        }
        let vector = FeatureVector::try_from(raw)?;
        Ok(self.normalize_vector(&vector))
    }

    /// NaN/Inf results are replaced by 0 and logged; they never propagate.
    pub fn normalize_vector(&self, raw: &FeatureVector) -> FeatureVector {
        let mut out = [0.0f32; FEATURE_COUNT];
        for (i, slot) in out.iter_mut().enumerate() {
            let std = if self.stats.std[i] < STD_EPSILON {
                STD_EPSILON
            } else {
                self.stats.std[i]
            };
            let z = (raw[i] - self.stats.mean[i]) / std;
            *slot = if z.is_finite() {
                z
            } else {
                log::warn!(
                    "invalid normalized value for {}: {z} (raw: {})",
                    FEATURE_NAMES[i],
                    raw[i]
                );
                NUMERIC_ANOMALIES_TOTAL.inc();
                0.0
            };
        }
        FeatureVector::new(out)
    }
}
