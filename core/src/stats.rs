//! Descriptive statistics shared by epoch aggregation and the rolling
//! window features.
//!
//! Accumulation happens in f64 and the result is narrowed to f32, which is
//! what the offline training pipeline did. Successive differences for RMSSD
//! are squared in f32 before averaging, for the same reason.

/// Arithmetic mean. 0 for an empty slice.
pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    mean_f64(values) as f32
}

/// Population standard deviation. 0 when fewer than two values.
pub fn std_dev(values: &[f32]) -> f32 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean_f64(values);
    let variance = values
        .iter()
        .map(|&v| {
            let d = v as f64 - m;
            d * d
        })
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt() as f32
}

pub fn min(values: &[f32]) -> f32 {
    values.iter().copied().reduce(f32::min).unwrap_or(0.0)
}

pub fn max(values: &[f32]) -> f32 {
    values.iter().copied().reduce(f32::max).unwrap_or(0.0)
}

/// max - min. 0 for an empty slice.
pub fn range(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    max(values) - min(values)
}

/// Root mean square of successive differences. 0 when fewer than two values.
pub fn rmssd(values: &[f32]) -> f32 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() - 1;
    let sum_sq = values
        .windows(2)
        .map(|w| {
            let d = w[1] - w[0];
            (d * d) as f64
        })
        .sum::<f64>();
    (sum_sq / n as f64).sqrt() as f32
}

#[inline]
fn mean_f64(values: &[f32]) -> f64 {
    values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64
}
