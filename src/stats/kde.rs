//! Gaussian kernel density estimate of a 1-D sample with Scott's bandwidth
//! rule, the smooth-curve counterpart of the speed histogram.

use crate::error::{Error, Result};
use std::f64::consts::PI;

/// Scott's rule bandwidth: `sample_std * n^(-1/5)`.
pub fn scott_bandwidth(samples: &[f64]) -> Result<f64> {
    let n = samples.len();
    if n < 2 {
        return Err(Error::InvalidParam(
            "need at least 2 samples for a bandwidth estimate".into(),
        ));
    }
    if samples.iter().any(|s| !s.is_finite()) {
        return Err(Error::InvalidParam("samples must be finite".into()));
    }
    let mean = samples.iter().sum::<f64>() / n as f64;
    let var = samples.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / (n - 1) as f64;
    let std = var.sqrt();
    if std <= 0.0 {
        return Err(Error::MathError(
            "sample has zero variance; bandwidth is undefined".into(),
        ));
    }
    Ok(std * (n as f64).powf(-0.2))
}

/// Evaluate the Gaussian KDE of `samples` at each point of `eval`.
pub fn gaussian_kde(samples: &[f64], eval: &[f64]) -> Result<Vec<f64>> {
    let h = scott_bandwidth(samples)?;
    let norm = 1.0 / (samples.len() as f64 * h * (2.0 * PI).sqrt());
    Ok(eval
        .iter()
        .map(|&v| {
            let sum: f64 = samples
                .iter()
                .map(|&s| {
                    let z = (v - s) / h;
                    (-0.5 * z * z).exp()
                })
                .sum();
            norm * sum
        })
        .collect())
}
