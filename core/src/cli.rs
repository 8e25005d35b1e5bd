//! Command-line surface of the `sleepstage` binary plus the session runner
//! and report printer it uses.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};

use crate::buffer::SampleBuffer;
use crate::classifier::Classifier;
use crate::config::{PipelineConfig, StageMap};
use crate::coordinator::{PredictionCoordinator, PredictionOutcome, PredictionSnapshot};
use crate::epoch::EpochAggregator;
use crate::error::Result;
use crate::storage::{ensure_ordered, SampleRecord};
use crate::temporal::TemporalFeatureEngine;
use crate::types::{FeatureVector, InterpolationStats, EPOCH_SIZE};

#[derive(Parser, Debug)]
#[command(name = "sleepstage")]
#[command(author, version, about = "Replay wearable sessions through the stage pipeline")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Feed a recorded CSV session through the pipeline
    Replay {
        /// CSV with header timestamp_ms,heart_rate,motion_x,motion_y,motion_z
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Run a seeded synthetic session (wake, light, light, deep, REM)
    Simulate {
        #[arg(long, default_value_t = 10)]
        minutes: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Print the raw named feature vector for the last epoch of a session
    Features {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Tree-ensemble JSON; without it the model counts as unloaded
    #[arg(long)]
    pub model: Option<PathBuf>,
    /// Normalization stats JSON; defaults to the shipped training stats
    #[arg(long)]
    pub stats: Option<PathBuf>,
    /// Pipeline config JSON; missing file means defaults
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Wall-clock time of the first sample (RFC 3339); defaults to now
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,
    /// Print Prometheus metrics after the run
    #[arg(long)]
    pub metrics: bool,
}

/// One non-cached answer of the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionEvent {
    pub timestamp_ms: u64,
    pub wall_clock: DateTime<Utc>,
    pub outcome: PredictionOutcome,
    pub class: usize,
    pub stage: u8,
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub samples: usize,
    pub events: Vec<PredictionEvent>,
    pub outcome_counts: BTreeMap<&'static str, usize>,
    pub interpolation: InterpolationStats,
    pub last: PredictionSnapshot,
    pub duration: Duration,
    /// Wall time spent inside `on_sample` + `predict_outcome`.
    pub processing: StdDuration,
}

impl SessionReport {
    /// Mean pipeline latency per sample.
    pub fn mean_latency(&self) -> StdDuration {
        match u32::try_from(self.samples) {
            Ok(n) if n > 0 => self.processing / n,
            _ => StdDuration::ZERO,
        }
    }
}

/// Replays `records` in order, calling `predict` after every sample.
/// Fails before touching the coordinator if timestamps go backwards.
pub fn run_session<C: Classifier>(
    coordinator: &mut PredictionCoordinator<C>,
    records: &[SampleRecord],
    stage_map: &StageMap,
    start: DateTime<Utc>,
) -> Result<SessionReport> {
    ensure_ordered(records)?;
    coordinator.reset_session();

    let first_ts = records.first().map(|r| r.timestamp_ms).unwrap_or(0);
    let mut events = Vec::new();
    let mut outcome_counts = BTreeMap::new();
    let mut last_ts = first_ts;
    let mut processing = StdDuration::ZERO;

    for r in records {
        let t0 = Instant::now();
        coordinator.on_sample(r.heart_rate, r.motion_x, r.motion_y, r.motion_z, r.timestamp_ms);
        let outcome = coordinator.predict_outcome(r.timestamp_ms);
        processing += t0.elapsed();
        *outcome_counts.entry(outcome.label()).or_insert(0) += 1;
        last_ts = r.timestamp_ms;

        if outcome == PredictionOutcome::RateLimited {
            continue;
        }
        let class = outcome.stage(coordinator.last_predicted_stage());
        let offset = Duration::milliseconds(r.timestamp_ms.saturating_sub(first_ts) as i64);
        events.push(PredictionEvent {
            timestamp_ms: r.timestamp_ms,
            wall_clock: start + offset,
            outcome,
            class,
            stage: stage_map.apply(class),
        });
    }

    Ok(SessionReport {
        samples: records.len(),
        events,
        outcome_counts,
        interpolation: coordinator.interpolation_stats(),
        last: coordinator.snapshot(last_ts),
        duration: Duration::milliseconds(last_ts.saturating_sub(first_ts) as i64),
        processing,
    })
}

/// Raw features for the last epoch, without a classifier.
///
/// Epochs are non-overlapping 30 s batches, one per 6 records. The live
/// coordinator instead builds an epoch on every accepted `predict`, so its
/// history overlaps whenever predictions come faster than every 30 s.
pub fn features_for_records(records: &[SampleRecord], cfg: &PipelineConfig) -> Result<Option<FeatureVector>> {
    ensure_ordered(records)?;
    let mut buffer = SampleBuffer::new(cfg)?;
    let mut aggregator = EpochAggregator::new();
    let mut engine = TemporalFeatureEngine::new(cfg)?;

    for (i, r) in records.iter().enumerate() {
        buffer.add_sample(r.heart_rate, r.motion_x, r.motion_y, r.motion_z, r.timestamp_ms);
        if (i + 1) % EPOCH_SIZE == 0 {
            if let Some(epoch) = aggregator.latest_epoch(&buffer.last_n(EPOCH_SIZE)) {
                engine.add_epoch(epoch);
            }
        }
    }
    Ok(engine.calculate_features())
}

pub fn print_session_report(report: &SessionReport) {
    println!("--- Session Report ---");
    println!(
        "Samples: {} over {}m{:02}s",
        report.samples,
        report.duration.num_minutes(),
        report.duration.num_seconds() % 60
    );
    for ev in &report.events {
        match &ev.outcome {
            PredictionOutcome::Updated { confidence, .. } | PredictionOutcome::LowConfidence { confidence, .. } => {
                println!(
                    "{} {:<16} class={} stage={} conf={:.1}%",
                    ev.wall_clock.format("%H:%M:%S"),
                    ev.outcome.label(),
                    ev.class,
                    ev.stage,
                    confidence * 100.0
                );
            }
            _ => {
                println!(
                    "{} {:<16} class={} stage={}",
                    ev.wall_clock.format("%H:%M:%S"),
                    ev.outcome.label(),
                    ev.class,
                    ev.stage
                );
            }
        }
    }
    println!("Outcomes:");
    for (label, n) in &report.outcome_counts {
        println!("  {label}: {n}");
    }
    println!(
        "Interpolated: {}% ({}/{})",
        report.interpolation.percentage_interpolated(),
        report.interpolation.interpolated,
        report.interpolation.total
    );
    println!(
        "Pipeline time: {:.3} ms total, {:.1} us per sample",
        report.processing.as_secs_f64() * 1000.0,
        report.mean_latency().as_secs_f64() * 1e6
    );
    println!(
        "Final: stage={} conf={:.2} state={:?} buffer={} epochs={}",
        report.last.stage, report.last.confidence, report.last.state, report.last.buffer_size, report.last.history_size
    );
}

pub fn print_features(features: &FeatureVector) {
    println!("--- Features ---");
    for (name, value) in features.named() {
        println!("{name:<28} {value:.6}");
    }
}
