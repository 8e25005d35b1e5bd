use sleepstage_core::{PipelineConfig, PipelineError, SampleBuffer};

fn buffer() -> SampleBuffer {
    SampleBuffer::new(&PipelineConfig::default()).unwrap()
}

#[test]
fn on_time_samples_are_not_interpolated() {
    let mut b = buffer();
    for i in 0..10u64 {
        // jitter inside the 2 s tolerance
        b.add_sample(60.0, 0.0, 0.0, 0.0, i * 5_000 + (i % 2) * 1_500);
    }
    assert_eq!(b.len(), 10);
    let stats = b.interpolation_stats();
    assert_eq!(stats.interpolated, 0);
    assert_eq!(stats.real, 10);
    assert_eq!(stats.rate, 0.0);
}

#[test]
fn gap_of_k_intervals_inserts_k_minus_one() {
    for k in 2..=6u64 {
        let mut b = buffer();
        b.add_sample(60.0, 0.0, 0.0, 0.0, 100_000);
        b.add_sample(90.0, 0.0, 0.0, 0.0, 100_000 + k * 5_000);

        let snap = b.snapshot();
        assert_eq!(snap.len() as u64, k + 1, "gap of {k} intervals");
        let inserted: Vec<_> = snap.iter().filter(|s| s.is_interpolated).collect();
        assert_eq!(inserted.len() as u64, k - 1);
        for (i, s) in inserted.iter().enumerate() {
            assert_eq!(s.timestamp, 100_000 + 5_000 * (i as u64 + 1));
        }
        assert!(!snap.last().unwrap().is_interpolated);
    }
}

#[test]
fn interpolated_values_lie_on_the_line() {
    let mut b = buffer();
    b.add_sample(60.0, 0.0, 1.0, -3.0, 0);
    b.add_sample(90.0, 3.0, 1.0, 0.0, 15_000);

    let snap = b.snapshot();
    assert_eq!(snap.len(), 4);
    assert!((snap[1].heart_rate - 70.0).abs() < 1e-4);
    assert!((snap[2].heart_rate - 80.0).abs() < 1e-4);
    assert!((snap[1].motion_x - 1.0).abs() < 1e-5);
    assert!((snap[2].motion_z + 1.0).abs() < 1e-5);
    assert_eq!(snap[1].motion_y, 1.0);
}

#[test]
fn gap_just_above_tolerance_with_one_interval_inserts_nothing() {
    // 8 s > 7 s threshold, but floor(8/5) - 1 = 0
    let mut b = buffer();
    b.add_sample(60.0, 0.0, 0.0, 0.0, 0);
    b.add_sample(61.0, 0.0, 0.0, 0.0, 8_000);
    assert_eq!(b.len(), 2);
    assert_eq!(b.interpolation_stats().interpolated, 0);
}

#[test]
fn oversized_gap_repeats_last_sample_once() {
    for gap in [31_000u64, 600_000] {
        let mut b = buffer();
        b.add_sample(58.0, 0.1, 0.2, 0.3, 1_000);
        b.add_sample(75.0, 0.0, 0.0, 0.0, 1_000 + gap);

        let snap = b.snapshot();
        assert_eq!(snap.len(), 3, "gap {gap}");
        let filler = snap[1];
        assert!(filler.is_interpolated);
        assert_eq!(filler.timestamp, 6_000);
        assert_eq!(filler.heart_rate, 58.0);
        assert_eq!(filler.motion_z, 0.3);
        assert_eq!(snap[2].heart_rate, 75.0);
    }
}

#[test]
fn capacity_evicts_oldest() {
    let mut b = buffer();
    for i in 0..400u64 {
        b.add_sample(60.0, 0.0, 0.0, 0.0, i * 5_000);
    }
    assert_eq!(b.len(), 360);
    assert_eq!(b.snapshot()[0].timestamp, 40 * 5_000);
    assert_eq!(b.last_n(3).len(), 3);
    assert_eq!(b.last_n(3)[2].timestamp, 399 * 5_000);
    assert_eq!(b.last_n(1_000).len(), 360);
}

#[test]
fn staleness_is_relative_to_last_real_sample() {
    let mut b = buffer();
    assert!(!b.is_stale(10_000_000));
    assert!(!b.has_received_data());
    assert_eq!(b.time_since_last_real_data(5_000), 0);

    b.add_sample(60.0, 0.0, 0.0, 0.0, 50_000);
    assert!(!b.is_stale(80_000));
    assert!(b.is_stale(80_001));
    assert_eq!(b.time_since_last_real_data(62_000), 12_000);
}

#[test]
fn readiness_thresholds() {
    let mut b = buffer();
    for i in 0..30u64 {
        assert_eq!(b.has_minimum_data(), i >= 6);
        assert!(!b.has_sufficient_temporal_data());
        b.add_sample(60.0, 0.0, 0.0, 0.0, i * 5_000);
    }
    assert!(b.has_sufficient_temporal_data());
}

#[test]
fn clear_forgets_last_sample() {
    let mut b = buffer();
    b.add_sample(60.0, 0.0, 0.0, 0.0, 0);
    b.clear();
    assert!(b.is_empty());
    assert!(!b.has_received_data());

    // no gap fill against the pre-clear sample
    b.add_sample(60.0, 0.0, 0.0, 0.0, 25_000);
    assert_eq!(b.len(), 1);
}

#[test]
fn interpolation_stats_percentage() {
    let mut b = buffer();
    b.add_sample(60.0, 0.0, 0.0, 0.0, 0);
    b.add_sample(60.0, 0.0, 0.0, 0.0, 20_000); // 3 inserted
    let stats = b.interpolation_stats();
    assert_eq!(stats.total, 5);
    assert_eq!(stats.interpolated, 3);
    assert_eq!(stats.real, 2);
    assert_eq!(stats.percentage_interpolated(), 60);
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let zero_interval = PipelineConfig {
        expected_interval_ms: 0,
        ..PipelineConfig::default()
    };
    assert!(matches!(SampleBuffer::new(&zero_interval), Err(PipelineError::Config(_))));

    let tiny = PipelineConfig {
        max_samples: 5,
        ..PipelineConfig::default()
    };
    assert!(SampleBuffer::new(&tiny).is_err());
}
