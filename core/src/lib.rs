//! Streaming feature pipeline for wearable heart-rate/accelerometer data.
//!
//! Irregular 5 s samples go in through [`PredictionCoordinator::on_sample`];
//! the coordinator fills gaps, aggregates 30 s epochs, derives the
//! 36-feature vector the exported model was trained on, normalizes it and
//! asks a [`Classifier`] for a stage at most every 15 s.

pub mod buffer;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod epoch;
pub mod error;
pub mod metrics;
pub mod models;
pub mod normalizer;
pub mod stats;
pub mod storage;
pub mod synthetic;
pub mod temporal;
pub mod types;

#[cfg(feature = "python")]
mod py;

pub use buffer::SampleBuffer;
pub use classifier::{Classifier, TreeEnsemble, Unloaded};
pub use config::{PipelineConfig, StageMap};
pub use coordinator::{
    PipelineState, PredictionCoordinator, PredictionOutcome, PredictionSnapshot, PredictionState,
};
pub use epoch::EpochAggregator;
pub use error::{PipelineError, Result};
pub use models::{ClassifierOutput, Inference, Stage, NUM_CLASSES};
pub use normalizer::{NormalizationStats, Normalizer};
pub use storage::{load_config, save_config, SampleRecord};
pub use temporal::TemporalFeatureEngine;
pub use types::{Epoch, FeatureVector, InterpolationStats, Sample, EPOCH_SIZE, FEATURE_COUNT, FEATURE_NAMES};
