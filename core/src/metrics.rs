//! Prometheus counters for the feature pipeline.
//!
//! Metrics live in a crate-owned registry so embedding applications can
//! gather them without touching the process default registry.

use once_cell::sync::Lazy;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Samples appended to buffers, by kind: real | interpolated | filler.
pub static SAMPLES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(
        Opts::new("sleepstage_samples_total", "Samples appended to the sample buffer"),
        &["kind"],
    )
    .expect("valid metric definition");
    register(Box::new(c.clone()));
    c
});

/// predict() calls by outcome label.
pub static PREDICTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(
        Opts::new("sleepstage_predictions_total", "Prediction attempts by outcome"),
        &["outcome"],
    )
    .expect("valid metric definition");
    register(Box::new(c.clone()));
    c
});

pub static NUMERIC_ANOMALIES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new(
        "sleepstage_numeric_anomalies_total",
        "NaN/Inf values replaced by 0 during normalization",
    )
    .expect("valid metric definition");
    register(Box::new(c.clone()));
    c
});

pub static CLASSIFIER_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new(
        "sleepstage_classifier_failures_total",
        "Inference calls that failed or returned malformed output",
    )
    .expect("valid metric definition");
    register(Box::new(c.clone()));
    c
});

pub static PREDICTION_CONFIDENCE: Lazy<Histogram> = Lazy::new(|| {
    let h = Histogram::with_opts(
        HistogramOpts::new(
            "sleepstage_prediction_confidence",
            "Confidence of resolved classifier outputs",
        )
        .buckets(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.95, 1.0]),
    )
    .expect("valid metric definition");
    register(Box::new(h.clone()));
    h
});

fn register(c: Box<dyn prometheus::core::Collector>) {
    if let Err(e) = REGISTRY.register(c) {
        log::warn!("metric registration skipped: {e}");
    }
}

/// Text exposition of every pipeline metric.
pub fn gather_text() -> String {
    // touch lazies so empty families still show up
    Lazy::force(&SAMPLES_TOTAL);
    Lazy::force(&PREDICTIONS_TOTAL);
    Lazy::force(&NUMERIC_ANOMALIES_TOTAL);
    Lazy::force(&CLASSIFIER_FAILURES_TOTAL);
    Lazy::force(&PREDICTION_CONFIDENCE);

    let mut buf = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buf) {
        log::error!("metrics encode failed: {e}");
        return String::new();
    }
    String::from_utf8(buf).unwrap_or_default()
}
