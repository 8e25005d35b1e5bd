use std::collections::VecDeque;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::stats;
use crate::types::{Epoch, FeatureVector, FEATURE_COUNT};

/// Lag offsets in epochs: 30, 60, 90 and 120 s back.
pub const LAGS: usize = 4;
const BASE_LEN: usize = 11;
const LAG_WIDTH: usize = 5;
const ROLLING_START: usize = BASE_LEN + LAGS * LAG_WIDTH; // 31
const ELAPSED_INDEX: usize = FEATURE_COUNT - 1; // 35

const MS_PER_S: f32 = 1000.0;
const S_PER_HOUR: f32 = 3600.0;

/// Epoch history plus the 36-feature computation for the newest epoch.
#[derive(Debug, Clone)]
pub struct TemporalFeatureEngine {
    history: VecDeque<Epoch>,
    capacity: usize,
    min_history: usize,
    session_start: Option<u64>,
}

impl Default for TemporalFeatureEngine {
    fn default() -> Self {
        Self::from_validated(&PipelineConfig::default())
    }
}

impl TemporalFeatureEngine {
    /// Rejects configs that fail [`PipelineConfig::validate`].
    pub fn new(cfg: &PipelineConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self::from_validated(cfg))
    }

    pub(crate) fn from_validated(cfg: &PipelineConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(cfg.history_capacity + 1),
            capacity: cfg.history_capacity,
            min_history: cfg.min_history,
            session_start: None,
        }
    }

    pub fn add_epoch(&mut self, epoch: Epoch) {
        self.history.push_back(epoch);
        if self.session_start.is_none() {
            self.session_start = Some(epoch.timestamp);
        }
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
        log::debug!("epoch added to history, total={}", self.history.len());
    }

    /// Hard gate for feature computation.
    pub fn has_sufficient_data(&self) -> bool {
        self.history.len() >= self.min_history
    }

    /// Features for the newest epoch, `None` below the history gate.
    ///
    /// A missing lag epoch falls back to the previous lag's *computed* value
    /// (lag 1 falls back to the current epoch). The trained model saw this
    /// chaining, so it must not be flattened to "fall back to current".
    pub fn calculate_features(&self) -> Option<FeatureVector> {
        if !self.has_sufficient_data() {
            log::debug!(
                "need {} epochs for temporal features, have {}",
                self.min_history,
                self.history.len()
            );
            return None;
        }
        self.compute_features()
    }

    /// Feature computation without the history gate. Needs at least one epoch.
    fn compute_features(&self) -> Option<FeatureVector> {
        let current = self.history.back()?;
        let mut f = [0.0f32; FEATURE_COUNT];

        f[..BASE_LEN].copy_from_slice(&current.base_features());

        let mut previous = current.lag_features();
        for lag in 1..=LAGS {
            let block = match self.lagged(lag) {
                Some(epoch) => epoch.lag_features(),
                None => previous,
            };
            let start = BASE_LEN + (lag - 1) * LAG_WIDTH;
            f[start..start + LAG_WIDTH].copy_from_slice(&block);
            previous = block;
        }

        let hr_means: Vec<f32> = self.history.iter().map(|e| e.hr_mean).collect();
        let hr_stds: Vec<f32> = self.history.iter().map(|e| e.hr_std).collect();
        f[ROLLING_START] = stats::mean(&hr_means);
        f[ROLLING_START + 1] = stats::std_dev(&hr_means);
        f[ROLLING_START + 2] = stats::mean(&hr_stds);
        f[ROLLING_START + 3] = stats::std_dev(&hr_stds);

        f[ELAPSED_INDEX] = self.elapsed_hours(current);

        Some(FeatureVector::new(f))
    }

    fn lagged(&self, lag: usize) -> Option<&Epoch> {
        let idx = self.history.len().checked_sub(1 + lag)?;
        self.history.get(idx)
    }

    fn elapsed_hours(&self, current: &Epoch) -> f32 {
        match self.session_start {
            Some(start) => {
                let elapsed_ms = current.timestamp.saturating_sub(start);
                elapsed_ms as f32 / MS_PER_S / S_PER_HOUR
            }
            None => 0.0,
        }
    }

    pub fn get_history_size(&self) -> usize {
        self.history.len()
    }

    pub fn session_start_timestamp(&self) -> Option<u64> {
        self.session_start
    }

    pub fn history(&self) -> impl Iterator<Item = &Epoch> {
        self.history.iter()
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.session_start = None;
        log::info!("temporal feature engine reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch(id: u32, hr_mean: f32, hr_std: f32, motion: f32) -> Epoch {
        Epoch {
            epoch_id: id,
            timestamp: 30_000 * (id as u64 + 1),
            hr_mean,
            hr_std,
            hr_min: hr_mean - 1.0,
            hr_max: hr_mean + 1.0,
            hr_rmssd: 1.5,
            motion_x_std: motion,
            motion_x_range: 2.0 * motion,
            motion_y_std: motion * 2.0,
            motion_y_range: 4.0 * motion,
            motion_z_std: motion * 3.0,
            motion_z_range: 6.0 * motion,
        }
    }

    #[test]
    fn missing_lags_chain_forward_from_previous_lag() {
        let mut engine = TemporalFeatureEngine::default();
        engine.add_epoch(epoch(0, 60.0, 1.0, 0.01));
        engine.add_epoch(epoch(1, 70.0, 2.0, 0.02));

        // below the gate the public API refuses
        assert!(engine.calculate_features().is_none());

        let f = engine.compute_features().unwrap();
        // lag 1 exists (epoch 0)
        assert_eq!(&f.as_slice()[11..16], &epoch(0, 60.0, 1.0, 0.01).lag_features()[..]);
        // lags 2..4 are absent and copy the lag-1 block, not the current epoch
        for lag in 2..=LAGS {
            let start = BASE_LEN + (lag - 1) * LAG_WIDTH;
            assert_eq!(&f.as_slice()[start..start + LAG_WIDTH], &f.as_slice()[11..16]);
        }
        assert_ne!(f[16], f[0]);
    }

    #[test]
    fn single_epoch_lags_equal_current() {
        let mut engine = TemporalFeatureEngine::default();
        let only = epoch(0, 64.0, 1.25, 0.5);
        engine.add_epoch(only);
        let f = engine.compute_features().unwrap();
        for lag in 1..=LAGS {
            let start = BASE_LEN + (lag - 1) * LAG_WIDTH;
            assert_eq!(&f.as_slice()[start..start + LAG_WIDTH], &only.lag_features()[..]);
        }
        assert_eq!(f[ELAPSED_INDEX], 0.0);
        assert_eq!(f[ROLLING_START + 1], 0.0);
    }

    #[test]
    fn history_is_bounded_and_session_start_sticks() {
        let mut engine = TemporalFeatureEngine::default();
        for i in 0..60 {
            engine.add_epoch(epoch(i, 60.0 + i as f32, 1.0, 0.01));
        }
        assert_eq!(engine.get_history_size(), 50);
        assert_eq!(engine.history().next().unwrap().epoch_id, 10);
        assert_eq!(engine.session_start_timestamp(), Some(30_000));

        engine.reset();
        assert_eq!(engine.get_history_size(), 0);
        assert_eq!(engine.session_start_timestamp(), None);
    }
}
