use std::collections::VecDeque;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::metrics::SAMPLES_TOTAL;
use crate::types::{InterpolationStats, Sample, EPOCH_SIZE};

/// Buffered samples needed before lag features can be grounded (5 epochs).
pub const TEMPORAL_SAMPLE_COUNT: usize = 5 * EPOCH_SIZE;

/// Bounded, gap-filling window of 5 s samples.
///
/// Timestamps are expected to be non-decreasing; ordering is the caller's
/// job. Every real sample is preceded by whatever synthetic samples its gap
/// called for.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
    last: Option<Sample>,
    expected_interval_ms: u64,
    tolerance_ms: u64,
    max_gap_ms: u64,
    capacity: usize,
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::from_validated(&PipelineConfig::default())
    }
}

impl SampleBuffer {
    /// Rejects configs that fail [`PipelineConfig::validate`].
    pub fn new(cfg: &PipelineConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self::from_validated(cfg))
    }

    pub(crate) fn from_validated(cfg: &PipelineConfig) -> Self {
        Self {
            samples: VecDeque::with_capacity(cfg.max_samples + 1),
            last: None,
            expected_interval_ms: cfg.expected_interval_ms,
            tolerance_ms: cfg.interpolation_tolerance_ms,
            max_gap_ms: cfg.max_interpolation_gap_ms,
            capacity: cfg.max_samples,
        }
    }

    pub fn add_sample(&mut self, heart_rate: f32, motion_x: f32, motion_y: f32, motion_z: f32, now: u64) {
        let current = Sample::real(now, heart_rate, motion_x, motion_y, motion_z);

        if let Some(last) = self.last {
            debug_assert!(now >= last.timestamp, "sample timestamps went backwards");
            let gap = now.saturating_sub(last.timestamp);
            if gap > self.expected_interval_ms + self.tolerance_ms {
                self.fill_gap(&last, &current, gap);
            }
        }

        self.samples.push_back(current);
        SAMPLES_TOTAL.with_label_values(&["real"]).inc();
        self.last = Some(current);

        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }

        log::debug!("sample added: hr={heart_rate} buffer={}", self.samples.len());
    }

    fn fill_gap(&mut self, last: &Sample, current: &Sample, gap: u64) {
        if gap > self.max_gap_ms {
            log::warn!("gap too large ({gap} ms), repeating last sample once");
            self.samples.push_back(Sample {
                timestamp: last.timestamp + self.expected_interval_ms,
                is_interpolated: true,
                ..*last
            });
            SAMPLES_TOTAL.with_label_values(&["filler"]).inc();
            return;
        }

        let missing = (gap / self.expected_interval_ms) as i64 - 1;
        if missing <= 0 {
            return;
        }
        let missing = missing as u64;

        log::warn!("interpolating {missing} missing samples (gap: {gap} ms)");
        for i in 1..=missing {
            let ratio = i as f32 / (missing + 1) as f32;
            let ts = last.timestamp + self.expected_interval_ms * i;
            self.samples.push_back(last.lerp(current, ratio, ts));
        }
        SAMPLES_TOTAL.with_label_values(&["interpolated"]).inc_by(missing);
    }

    /// All buffered samples, oldest first.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    /// The most recent `n` samples (all of them if fewer), oldest first.
    pub fn last_n(&self, n: usize) -> Vec<Sample> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Enough samples for one epoch.
    pub fn has_minimum_data(&self) -> bool {
        self.samples.len() >= EPOCH_SIZE
    }

    /// Informational only; the history length is the real gate.
    pub fn has_sufficient_temporal_data(&self) -> bool {
        self.samples.len() >= TEMPORAL_SAMPLE_COUNT
    }

    /// True if a real sample was ever seen and none arrived within the max gap.
    pub fn is_stale(&self, now: u64) -> bool {
        match self.last {
            Some(last) => now.saturating_sub(last.timestamp) > self.max_gap_ms,
            None => false,
        }
    }

    pub fn time_since_last_real_data(&self, now: u64) -> u64 {
        self.last
            .map(|last| now.saturating_sub(last.timestamp))
            .unwrap_or(0)
    }

    pub fn has_received_data(&self) -> bool {
        self.last.is_some()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.last = None;
        log::info!("sample buffer cleared");
    }

    pub fn interpolation_stats(&self) -> InterpolationStats {
        let total = self.samples.len();
        let interpolated = self.samples.iter().filter(|s| s.is_interpolated).count();
        InterpolationStats {
            total,
            interpolated,
            real: total - interpolated,
            rate: if total > 0 {
                interpolated as f32 / total as f32
            } else {
                0.0
            },
        }
    }
}
