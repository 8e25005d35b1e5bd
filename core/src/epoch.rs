use crate::error::{PipelineError, Result};
use crate::stats;
use crate::types::{Epoch, Sample, EPOCH_SIZE};

/// Step between epoch starts in [`EpochAggregator::extract_epochs`]: 15 s or 30 s.
const OVERLAP_STEP: usize = EPOCH_SIZE / 2;

/// Reduces runs of 6 samples into [`Epoch`]s, numbering them per session.
#[derive(Debug, Default, Clone)]
pub struct EpochAggregator {
    next_id: u32,
}

impl EpochAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one epoch from exactly [`EPOCH_SIZE`] samples.
    pub fn build_epoch(&mut self, samples: &[Sample]) -> Result<Epoch> {
        if samples.len() != EPOCH_SIZE {
            return Err(PipelineError::EpochSize {
                expected: EPOCH_SIZE,
                actual: samples.len(),
            });
        }

        let hr: Vec<f32> = samples.iter().map(|s| s.heart_rate).collect();
        let mx: Vec<f32> = samples.iter().map(|s| s.motion_x).collect();
        let my: Vec<f32> = samples.iter().map(|s| s.motion_y).collect();
        let mz: Vec<f32> = samples.iter().map(|s| s.motion_z).collect();

        let epoch = Epoch {
            epoch_id: self.next_id,
            timestamp: samples[EPOCH_SIZE - 1].timestamp,
            hr_mean: stats::mean(&hr),
            hr_std: stats::std_dev(&hr),
            hr_min: stats::min(&hr),
            hr_max: stats::max(&hr),
            hr_rmssd: stats::rmssd(&hr),
            motion_x_std: stats::std_dev(&mx),
            motion_x_range: stats::range(&mx),
            motion_y_std: stats::std_dev(&my),
            motion_y_range: stats::range(&my),
            motion_z_std: stats::std_dev(&mz),
            motion_z_range: stats::range(&mz),
        };
        self.next_id += 1;

        log::debug!(
            "epoch {} built: hr={:.0} ({:.0}-{:.0})",
            epoch.epoch_id,
            epoch.hr_mean,
            epoch.hr_min,
            epoch.hr_max
        );
        Ok(epoch)
    }

    /// Epoch over the last 6 samples of `window`, or `None` while fewer are buffered.
    pub fn latest_epoch(&mut self, window: &[Sample]) -> Option<Epoch> {
        if window.len() < EPOCH_SIZE {
            return None;
        }
        self.build_epoch(&window[window.len() - EPOCH_SIZE..]).ok()
    }

    /// Batch extraction for retrospective analysis; not used on the live path.
    pub fn extract_epochs(&mut self, window: &[Sample], overlap: bool) -> Vec<Epoch> {
        let step = if overlap { OVERLAP_STEP } else { EPOCH_SIZE };
        let mut epochs = Vec::new();
        let mut start = 0;
        while start + EPOCH_SIZE <= window.len() {
            if let Ok(epoch) = self.build_epoch(&window[start..start + EPOCH_SIZE]) {
                epochs.push(epoch);
            }
            start += step;
        }
        epochs
    }

    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub fn reset(&mut self) {
        self.next_id = 0;
        log::info!("epoch aggregator reset");
    }
}
