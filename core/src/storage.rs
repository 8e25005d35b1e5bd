use std::path::Path;

use crate::config::PipelineConfig;
use crate::error::{from_json_str, PipelineError, Result};
use crate::types::Sample;

/// Reads the pipeline config from disk (JSON).
/// A missing file yields the default config.
pub fn load_config(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();
    if path.exists() {
        let contents = std::fs::read_to_string(path)?;
        let cfg: PipelineConfig = from_json_str(&contents)?;
        cfg.validate()?;
        log::info!(
            "config loaded from {} (interval={} ms)",
            path.display(),
            cfg.prediction_interval_ms
        );
        Ok(cfg)
    } else {
        log::warn!("no config at {}, using defaults", path.display());
        Ok(PipelineConfig::default())
    }
}

/// Writes the config to disk as pretty JSON.
pub fn save_config(cfg: &PipelineConfig, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(cfg).map_err(|e| PipelineError::Json {
        path: String::new(),
        message: e.to_string(),
    })?;
    std::fs::write(path, json)?;
    log::info!("config saved to {}", path.display());
    Ok(())
}

/// One row of a recorded session: `timestamp_ms,heart_rate,motion_x,motion_y,motion_z`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SampleRecord {
    pub timestamp_ms: u64,
    pub heart_rate: f32,
    pub motion_x: f32,
    pub motion_y: f32,
    pub motion_z: f32,
}

impl From<&Sample> for SampleRecord {
    fn from(s: &Sample) -> Self {
        Self {
            timestamp_ms: s.timestamp,
            heart_rate: s.heart_rate,
            motion_x: s.motion_x,
            motion_y: s.motion_y,
            motion_z: s.motion_z,
        }
    }
}

/// Recorded sessions must be in non-decreasing timestamp order before they
/// reach a [`crate::SampleBuffer`].
pub fn ensure_ordered(rows: &[SampleRecord]) -> Result<()> {
    match rows
        .windows(2)
        .position(|w| w[1].timestamp_ms < w[0].timestamp_ms)
    {
        Some(i) => Err(PipelineError::OutOfOrder {
            index: i + 1,
            previous: rows[i].timestamp_ms,
            timestamp: rows[i + 1].timestamp_ms,
        }),
        None => Ok(()),
    }
}

/// Reads a recorded session (CSV with header).
pub fn read_samples_csv(path: impl AsRef<Path>) -> Result<Vec<SampleRecord>> {
    let path = path.as_ref();
    let mut rdr = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in rdr.deserialize() {
        let row: SampleRecord = row?;
        rows.push(row);
    }
    log::info!("{} samples read from {}", rows.len(), path.display());
    Ok(rows)
}

pub fn write_samples_csv(rows: &[SampleRecord], path: impl AsRef<Path>) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
