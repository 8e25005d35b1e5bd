use serde::{Deserialize, Serialize};

/// Samples aggregated into one epoch (6 x 5 s = 30 s).
pub const EPOCH_SIZE: usize = 6;

/// Length of the classifier input. Frozen together with [`FEATURE_NAMES`].
pub const FEATURE_COUNT: usize = 36;

/// Feature order expected by the exported model.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "hr_mean",
    "hr_std",
    "hr_min",
    "hr_max",
    "hr_rmssd",
    "motion_x_std",
    "motion_x_range",
    "motion_y_std",
    "motion_y_range",
    "motion_z_std",
    "motion_z_range",
    "hr_mean_lag_1",
    "hr_std_lag_1",
    "motion_x_std_lag_1",
    "motion_y_std_lag_1",
    "motion_z_std_lag_1",
    "hr_mean_lag_2",
    "hr_std_lag_2",
    "motion_x_std_lag_2",
    "motion_y_std_lag_2",
    "motion_z_std_lag_2",
    "hr_mean_lag_3",
    "hr_std_lag_3",
    "motion_x_std_lag_3",
    "motion_y_std_lag_3",
    "motion_z_std_lag_3",
    "hr_mean_lag_4",
    "hr_std_lag_4",
    "motion_x_std_lag_4",
    "motion_y_std_lag_4",
    "motion_z_std_lag_4",
    "hr_mean_rolling_mean_25min",
    "hr_mean_rolling_std_25min",
    "hr_std_rolling_mean_25min",
    "hr_std_rolling_std_25min",
    "time_since_sleep_onset",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: u64,    // ms, monotonic
    pub heart_rate: f32,   // bpm, 0 = unknown
    pub motion_x: f32,
    pub motion_y: f32,
    pub motion_z: f32,
    pub is_interpolated: bool,
}

impl Sample {
    pub fn real(timestamp: u64, heart_rate: f32, motion_x: f32, motion_y: f32, motion_z: f32) -> Self {
        Self {
            timestamp,
            heart_rate,
            motion_x,
            motion_y,
            motion_z,
            is_interpolated: false,
        }
    }

    /// Point on the straight line from `self` to `next` at `ratio`, stamped `timestamp`.
    pub(crate) fn lerp(&self, next: &Sample, ratio: f32, timestamp: u64) -> Sample {
        Sample {
            timestamp,
            heart_rate: self.heart_rate + ratio * (next.heart_rate - self.heart_rate),
            motion_x: self.motion_x + ratio * (next.motion_x - self.motion_x),
            motion_y: self.motion_y + ratio * (next.motion_y - self.motion_y),
            motion_z: self.motion_z + ratio * (next.motion_z - self.motion_z),
            is_interpolated: true,
        }
    }
}

/// First-order statistics over one 30 s window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Epoch {
    pub epoch_id: u32,
    pub timestamp: u64, // last contributing sample

    pub hr_mean: f32,
    pub hr_std: f32,
    pub hr_min: f32,
    pub hr_max: f32,
    pub hr_rmssd: f32,

    pub motion_x_std: f32,
    pub motion_x_range: f32,
    pub motion_y_std: f32,
    pub motion_y_range: f32,
    pub motion_z_std: f32,
    pub motion_z_range: f32,
}

impl Epoch {
    /// Indices 0..=10 of the feature vector.
    pub fn base_features(&self) -> [f32; 11] {
        [
            self.hr_mean,
            self.hr_std,
            self.hr_min,
            self.hr_max,
            self.hr_rmssd,
            self.motion_x_std,
            self.motion_x_range,
            self.motion_y_std,
            self.motion_y_range,
            self.motion_z_std,
            self.motion_z_range,
        ]
    }

    /// The five fields carried into every lag block.
    pub fn lag_features(&self) -> [f32; 5] {
        [
            self.hr_mean,
            self.hr_std,
            self.motion_x_std,
            self.motion_y_std,
            self.motion_z_std,
        ]
    }
}

/// Fixed-length classifier input, indexed like [`FEATURE_NAMES`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f32; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f32; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn zeros() -> Self {
        Self([0.0; FEATURE_COUNT])
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn as_array(&self) -> &[f32; FEATURE_COUNT] {
        &self.0
    }

    pub fn into_array(self) -> [f32; FEATURE_COUNT] {
        self.0
    }

    pub fn named(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.0.iter().copied())
    }

    pub fn log_features(&self, prefix: &str) {
        log::debug!("=== {prefix} ===");
        for (name, value) in self.named() {
            log::debug!("{name}: {value:.4}");
        }
    }
}

impl std::ops::Index<usize> for FeatureVector {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.0[index]
    }
}

impl TryFrom<&[f32]> for FeatureVector {
    type Error = crate::error::PipelineError;

    fn try_from(value: &[f32]) -> Result<Self, Self::Error> {
        let arr: [f32; FEATURE_COUNT] =
            value
                .try_into()
                .map_err(|_| crate::error::PipelineError::FeatureLength {
                    expected: FEATURE_COUNT,
                    actual: value.len(),
                })?;
        Ok(Self(arr))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InterpolationStats {
    pub total: usize,
    pub interpolated: usize,
    pub real: usize,
    pub rate: f32,
}

impl InterpolationStats {
    pub fn percentage_interpolated(&self) -> u32 {
        (self.rate * 100.0) as u32
    }
}
