use std::fs;
use std::path::PathBuf;

use sleepstage_core::models::Stage;
use sleepstage_core::storage::{read_samples_csv, write_samples_csv};
use sleepstage_core::{load_config, save_config, synthetic, PipelineConfig, PipelineError, StageMap};

fn tmp(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("sleepstage_{}_{name}", std::process::id()))
}

#[test]
fn test_save_and_load_config() {
    let path = tmp("config.json");
    let cfg = PipelineConfig {
        prediction_interval_ms: 30_000,
        confidence_threshold: 0.6,
        stage_map: StageMap::new([0, 1, 3, 4]).unwrap(),
        ..PipelineConfig::default()
    };

    save_config(&cfg, &path).expect("could not save config");
    let loaded = load_config(&path).expect("could not load config");
    assert_eq!(loaded, cfg);
    assert_eq!(loaded.stage_map.apply(2), 3);

    fs::remove_file(&path).ok();
}

#[test]
fn missing_config_falls_back_to_defaults() {
    let cfg = load_config(tmp("does_not_exist.json")).unwrap();
    assert_eq!(cfg, PipelineConfig::default());
}

#[test]
fn invalid_config_files_are_rejected() {
    let path = tmp("bad_config.json");

    fs::write(&path, r#"{"min_history": 2}"#).unwrap();
    assert!(matches!(load_config(&path), Err(PipelineError::Config(_))));

    fs::write(&path, r#"{"max_samples": "lots"}"#).unwrap();
    match load_config(&path) {
        Err(PipelineError::Json { path, .. }) => assert_eq!(path, "max_samples"),
        other => panic!("expected Json error, got {other:?}"),
    }

    fs::remove_file(&path).ok();
}

#[test]
fn csv_session_round_trip() {
    let path = tmp("session.csv");
    let rows = synthetic::generate(24, 5_000, 1_700_000_000_000, Stage::Rem, 9);

    write_samples_csv(&rows, &path).unwrap();
    let header = fs::read_to_string(&path).unwrap();
    assert!(header.starts_with("timestamp_ms,heart_rate,motion_x,motion_y,motion_z"));

    let back = read_samples_csv(&path).unwrap();
    assert_eq!(back, rows);

    fs::remove_file(&path).ok();
}

#[test]
fn malformed_csv_is_an_error() {
    let path = tmp("broken.csv");
    fs::write(&path, "timestamp_ms,heart_rate,motion_x,motion_y,motion_z\n0,sixty,0,0,0\n").unwrap();
    assert!(matches!(read_samples_csv(&path), Err(PipelineError::Csv(_))));
    fs::remove_file(&path).ok();
}
