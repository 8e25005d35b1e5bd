use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::types::EPOCH_SIZE;

/// Highest external stage a [`StageMap`] may point at.
pub const MAX_EXTERNAL_STAGE: u8 = 4;

/// Timing and policy knobs for one pipeline instance.
///
/// Epoch length and feature count are not here: they belong to the model
/// contract, see [`crate::types::EPOCH_SIZE`] and [`crate::types::FEATURE_COUNT`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub expected_interval_ms: u64,
    pub interpolation_tolerance_ms: u64,
    pub max_interpolation_gap_ms: u64,
    pub max_samples: usize,
    pub history_capacity: usize,
    pub min_history: usize,
    pub prediction_interval_ms: u64,
    pub confidence_threshold: f32,
    pub stage_map: StageMap,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            expected_interval_ms: 5_000,
            interpolation_tolerance_ms: 2_000,
            max_interpolation_gap_ms: 30_000,
            max_samples: 360,      // 30 min @ 5 s
            history_capacity: 50,  // 25 min of epochs
            min_history: 5,        // lag 1..4 + current
            prediction_interval_ms: 15_000,
            confidence_threshold: 0.5,
            stage_map: StageMap::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.expected_interval_ms == 0 {
            return Err(PipelineError::Config("expected_interval_ms must be > 0".into()));
        }
        if self.expected_interval_ms + self.interpolation_tolerance_ms > self.max_interpolation_gap_ms {
            return Err(PipelineError::Config(format!(
                "gap threshold {} ms exceeds max_interpolation_gap_ms {}",
                self.expected_interval_ms + self.interpolation_tolerance_ms,
                self.max_interpolation_gap_ms
            )));
        }
        if self.max_samples < EPOCH_SIZE {
            return Err(PipelineError::Config(format!(
                "max_samples {} cannot hold one epoch ({EPOCH_SIZE})",
                self.max_samples
            )));
        }
        if self.min_history < 5 || self.min_history > self.history_capacity {
            return Err(PipelineError::Config(format!(
                "min_history must be in 5..={}, got {}",
                self.history_capacity, self.min_history
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(PipelineError::Config(format!(
                "confidence_threshold {} outside [0, 1]",
                self.confidence_threshold
            )));
        }
        self.stage_map.validate()
    }
}

/// Class index (0..=3) to external stage (0..=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageMap([u8; 4]);

impl Default for StageMap {
    fn default() -> Self {
        Self([0, 1, 2, 3])
    }
}

impl StageMap {
    pub fn new(table: [u8; 4]) -> Result<Self> {
        let map = Self(table);
        map.validate()?;
        Ok(map)
    }

    /// Unknown classes map to stage 0.
    pub fn apply(&self, class: usize) -> u8 {
        self.0.get(class).copied().unwrap_or(0)
    }

    fn validate(&self) -> Result<()> {
        match self.0.iter().find(|&&s| s > MAX_EXTERNAL_STAGE) {
            Some(bad) => Err(PipelineError::Config(format!(
                "stage_map entry {bad} above {MAX_EXTERNAL_STAGE}"
            ))),
            None => Ok(()),
        }
    }
}
