use crate::buffer::SampleBuffer;
use crate::classifier::Classifier;
use crate::config::PipelineConfig;
use crate::epoch::EpochAggregator;
use crate::error::Result;
use crate::metrics::{CLASSIFIER_FAILURES_TOTAL, PREDICTIONS_TOTAL, PREDICTION_CONFIDENCE};
use crate::models::Stage;
use crate::normalizer::Normalizer;
use crate::temporal::TemporalFeatureEngine;
use crate::types::{FeatureVector, InterpolationStats, EPOCH_SIZE};

/// Stage answered while nothing better is known.
pub const FALLBACK_STAGE: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No sample seen this session.
    Idle,
    /// Collecting samples/epochs, history below the gate.
    Buffering,
    /// Enough history to predict.
    Ready,
    /// No real sample within the max interpolation gap.
    Stale,
}

/// Why `predict` answered what it answered.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutcome {
    ModelUnavailable,
    RateLimited,
    Stale,
    InsufficientSamples,
    EpochUnavailable,
    InsufficientHistory,
    FeaturesUnavailable,
    LowConfidence { class: usize, confidence: f32 },
    Updated { class: usize, confidence: f32 },
    Failed(String),
}

impl PredictionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            PredictionOutcome::ModelUnavailable => "model_unavailable",
            PredictionOutcome::RateLimited => "rate_limited",
            PredictionOutcome::Stale => "stale",
            PredictionOutcome::InsufficientSamples => "insufficient_samples",
            PredictionOutcome::EpochUnavailable => "epoch_unavailable",
            PredictionOutcome::InsufficientHistory => "insufficient_history",
            PredictionOutcome::FeaturesUnavailable => "features_unavailable",
            PredictionOutcome::LowConfidence { .. } => "low_confidence",
            PredictionOutcome::Updated { .. } => "updated",
            PredictionOutcome::Failed(_) => "failed",
        }
    }

    /// Stage implied by this outcome given the previously held stage.
    pub fn stage(&self, last: usize) -> usize {
        match self {
            PredictionOutcome::ModelUnavailable
            | PredictionOutcome::InsufficientSamples
            | PredictionOutcome::InsufficientHistory
            | PredictionOutcome::FeaturesUnavailable => FALLBACK_STAGE,
            PredictionOutcome::RateLimited
            | PredictionOutcome::Stale
            | PredictionOutcome::EpochUnavailable
            | PredictionOutcome::LowConfidence { .. }
            | PredictionOutcome::Failed(_) => last,
            PredictionOutcome::Updated { class, .. } => *class,
        }
    }
}

/// Last accepted prediction. Untouched by every non-accepting outcome,
/// except that a low-confidence answer still consumes the cadence slot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PredictionState {
    pub last_predicted_class: usize,
    pub last_confidence: f32,
    pub last_prediction_timestamp: Option<u64>,
}

/// Copy-out view for observers; never a reference into the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionSnapshot {
    pub stage: usize,
    pub confidence: f32,
    pub last_prediction_timestamp: Option<u64>,
    pub state: PipelineState,
    pub buffer_size: usize,
    pub history_size: usize,
}

/// One recording session's pipeline: samples in, stage out.
///
/// Single-threaded by contract. Callers that share it across threads wrap it
/// in their own mutex.
pub struct PredictionCoordinator<C: Classifier> {
    config: PipelineConfig,
    buffer: SampleBuffer,
    aggregator: EpochAggregator,
    temporal: TemporalFeatureEngine,
    normalizer: Normalizer,
    classifier: C,
    state: PredictionState,
    last_features: Option<FeatureVector>,
}

impl<C: Classifier> PredictionCoordinator<C> {
    /// Default timing, shipped normalization statistics.
    pub fn new(classifier: C) -> Self {
        let config = PipelineConfig::default();
        Self::build(config, Normalizer::default(), classifier)
    }

    pub fn with_config(config: PipelineConfig, normalizer: Normalizer, classifier: C) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, normalizer, classifier))
    }

    fn build(config: PipelineConfig, normalizer: Normalizer, classifier: C) -> Self {
        Self {
            buffer: SampleBuffer::from_validated(&config),
            aggregator: EpochAggregator::new(),
            temporal: TemporalFeatureEngine::from_validated(&config),
            normalizer,
            classifier,
            state: PredictionState::default(),
            last_features: None,
            config,
        }
    }

    /// Sole ingestion entry point.
    pub fn on_sample(&mut self, heart_rate: f32, motion_x: f32, motion_y: f32, motion_z: f32, now: u64) {
        self.buffer.add_sample(heart_rate, motion_x, motion_y, motion_z, now);
    }

    /// Current stage index. Safe to call as often as wanted: the cadence
    /// floor turns extra calls into cached answers.
    pub fn predict(&mut self, now: u64) -> usize {
        let outcome = self.predict_outcome(now);
        outcome.stage(self.state.last_predicted_class)
    }

    pub fn predict_outcome(&mut self, now: u64) -> PredictionOutcome {
        let outcome = self.run_prediction(now);
        PREDICTIONS_TOTAL.with_label_values(&[outcome.label()]).inc();
        outcome
    }

    fn run_prediction(&mut self, now: u64) -> PredictionOutcome {
        let last = self.state.last_predicted_class;

        if !self.classifier.is_ready() {
            log::warn!("model not loaded, returning stage {FALLBACK_STAGE}");
            return PredictionOutcome::ModelUnavailable;
        }

        if let Some(ts) = self.state.last_prediction_timestamp {
            if now.saturating_sub(ts) < self.config.prediction_interval_ms {
                log::debug!("waiting for prediction interval, keeping stage {last}");
                return PredictionOutcome::RateLimited;
            }
        }

        if self.buffer.is_stale(now) {
            log::warn!(
                "data stale ({} s), keeping stage {last}",
                self.buffer.time_since_last_real_data(now) / 1000
            );
            return PredictionOutcome::Stale;
        }

        if !self.buffer.has_minimum_data() {
            log::debug!("insufficient data ({}/{EPOCH_SIZE} samples)", self.buffer.len());
            return PredictionOutcome::InsufficientSamples;
        }

        let window = self.buffer.last_n(EPOCH_SIZE);
        let Some(epoch) = self.aggregator.latest_epoch(&window) else {
            log::warn!("could not build epoch, keeping stage {last}");
            return PredictionOutcome::EpochUnavailable;
        };

        self.temporal.add_epoch(epoch);
        if !self.temporal.has_sufficient_data() {
            log::debug!(
                "need {} epochs for temporal features, have {}",
                self.config.min_history,
                self.temporal.get_history_size()
            );
            return PredictionOutcome::InsufficientHistory;
        }

        let Some(raw) = self.temporal.calculate_features() else {
            return PredictionOutcome::FeaturesUnavailable;
        };
        self.last_features = Some(raw);
        let normalized = self.normalizer.normalize_vector(&raw);

        let inference = match self
            .classifier
            .infer(&normalized)
            .and_then(|output| output.resolve())
        {
            Ok(inference) => inference,
            Err(e) => {
                log::error!("prediction failed: {e}");
                CLASSIFIER_FAILURES_TOTAL.inc();
                return PredictionOutcome::Failed(e.to_string());
            }
        };
        PREDICTION_CONFIDENCE.observe(inference.confidence as f64);

        let stats = self.buffer.interpolation_stats();
        log::debug!(
            "interpolation: {}% ({}/{})",
            stats.percentage_interpolated(),
            stats.interpolated,
            stats.total
        );
        let name = inference.stage().map(Stage::name).unwrap_or("Unknown");

        if inference.confidence < self.config.confidence_threshold {
            log::info!(
                "low confidence {:.1}% for {name}, keeping stage {last}",
                inference.confidence * 100.0
            );
            self.state.last_prediction_timestamp = Some(now);
            return PredictionOutcome::LowConfidence {
                class: inference.class,
                confidence: inference.confidence,
            };
        }

        self.state = PredictionState {
            last_predicted_class: inference.class,
            last_confidence: inference.confidence,
            last_prediction_timestamp: Some(now),
        };
        log::info!(
            "stage updated: {} ({name}) confidence {:.1}% hr={:.0}",
            inference.class,
            inference.confidence * 100.0,
            epoch.hr_mean
        );
        PredictionOutcome::Updated {
            class: inference.class,
            confidence: inference.confidence,
        }
    }

    /// Start of a new recording session.
    pub fn reset_session(&mut self) {
        self.buffer.clear();
        self.aggregator.reset();
        self.temporal.reset();
        self.state = PredictionState::default();
        self.last_features = None;
        log::info!("session reset");
    }

    pub fn state(&self, now: u64) -> PipelineState {
        if !self.buffer.has_received_data() {
            PipelineState::Idle
        } else if self.buffer.is_stale(now) {
            PipelineState::Stale
        } else if self.temporal.has_sufficient_data() {
            PipelineState::Ready
        } else {
            PipelineState::Buffering
        }
    }

    pub fn snapshot(&self, now: u64) -> PredictionSnapshot {
        PredictionSnapshot {
            stage: self.state.last_predicted_class,
            confidence: self.state.last_confidence,
            last_prediction_timestamp: self.state.last_prediction_timestamp,
            state: self.state(now),
            buffer_size: self.buffer.len(),
            history_size: self.temporal.get_history_size(),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn epoch_history_size(&self) -> usize {
        self.temporal.get_history_size()
    }

    pub fn interpolation_stats(&self) -> InterpolationStats {
        self.buffer.interpolation_stats()
    }

    pub fn last_confidence(&self) -> f32 {
        self.state.last_confidence
    }

    pub fn last_predicted_stage(&self) -> usize {
        self.state.last_predicted_class
    }

    pub fn prediction_state(&self) -> PredictionState {
        self.state
    }

    pub fn is_model_ready(&self) -> bool {
        self.classifier.is_ready()
    }

    /// Raw (pre-normalization) vector of the last inference.
    pub fn last_features(&self) -> Option<FeatureVector> {
        self.last_features
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn classifier_mut(&mut self) -> &mut C {
        &mut self.classifier
    }
}
