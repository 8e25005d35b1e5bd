use sleepstage_core::{EpochAggregator, PipelineConfig, Sample, TemporalFeatureEngine, FEATURE_COUNT};

/// Epoch k: hr alternating 60+2k / 62+2k, motion alternating 0 and 0.5/1/0.25.
fn golden_sample(i: usize) -> Sample {
    let k = (i / 6) as f32;
    let odd = i % 2 == 1;
    let base = 60.0 + 2.0 * k;
    Sample::real(
        5_000 * i as u64,
        if odd { base + 2.0 } else { base },
        if odd { 0.5 } else { 0.0 },
        if odd { 1.0 } else { 0.0 },
        if odd { 0.25 } else { 0.0 },
    )
}

fn golden_expected() -> [f32; FEATURE_COUNT] {
    let mut f = [0.0f32; FEATURE_COUNT];
    f[..11].copy_from_slice(&[71.0, 1.0, 70.0, 72.0, 2.0, 0.25, 0.5, 0.5, 1.0, 0.125, 0.25]);
    for (lag, hr_mean) in [69.0, 67.0, 65.0, 63.0].into_iter().enumerate() {
        let start = 11 + lag * 5;
        f[start..start + 5].copy_from_slice(&[hr_mean, 1.0, 0.25, 0.5, 0.125]);
    }
    f[31] = 66.0;
    f[32] = (70.0f64 / 6.0).sqrt() as f32;
    f[33] = 1.0;
    f[34] = 0.0;
    f[35] = 150_000f32 / 1000.0 / 3600.0;
    f
}

fn engine_with_epochs(n: usize) -> TemporalFeatureEngine {
    let mut agg = EpochAggregator::new();
    let mut engine = TemporalFeatureEngine::new(&PipelineConfig::default()).unwrap();
    for k in 0..n {
        let window: Vec<Sample> = (6 * k..6 * k + 6).map(golden_sample).collect();
        engine.add_epoch(agg.build_epoch(&window).unwrap());
    }
    engine
}

#[test]
fn golden_vector_is_bit_exact() {
    let engine = engine_with_epochs(6);
    let f = engine.calculate_features().expect("six epochs are enough");
    let expected = golden_expected();
    for (i, (got, want)) in f.as_slice().iter().zip(expected.iter()).enumerate() {
        assert_eq!(got.to_bits(), want.to_bits(), "feature {i}: {got} != {want}");
    }
}

#[test]
fn history_gate_is_five_epochs() {
    for n in 0..5 {
        assert!(engine_with_epochs(n).calculate_features().is_none(), "{n} epochs");
    }
    let f = engine_with_epochs(5).calculate_features().unwrap();
    // lag 4 lands on the first epoch, so nothing falls back yet
    assert_eq!(f[26], 61.0);
    assert_eq!(f[21], 63.0);
}

#[test]
fn elapsed_time_starts_at_first_epoch() {
    let engine = engine_with_epochs(5);
    assert_eq!(engine.session_start_timestamp(), Some(25_000));
    let f = engine.calculate_features().unwrap();
    assert_eq!(f[35], 120_000f32 / 1000.0 / 3600.0);
}

#[test]
fn rolling_window_covers_whole_history() {
    let engine = engine_with_epochs(12);
    let f = engine.calculate_features().unwrap();
    // hr_mean 61, 63, .., 83
    assert_eq!(f[31], 72.0);
    assert!(f[32] > 6.0 && f[32] < 7.0);
    assert_eq!(f[34], 0.0);
}

#[test]
fn history_gate_above_capacity_is_rejected() {
    let cfg = PipelineConfig {
        min_history: 60,
        ..PipelineConfig::default()
    };
    assert!(TemporalFeatureEngine::new(&cfg).is_err());
}
