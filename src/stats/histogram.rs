use crate::error::{Error, Result};

/// A density-normalized histogram of a speed sample.
///
/// `density[k]` is `counts[k] / (total_in_range * bin_width)`, so the
/// integral over the binned range is 1 whenever at least one sample landed in
/// range. Empty bins carry zero density; a sample entirely out of range
/// yields an all-zero density rather than an error.
#[derive(Debug, Clone)]
pub struct SpeedHistogram {
    /// Bin edges, length `bins + 1`, uniformly spaced.
    pub edges: Vec<f64>,
    /// Raw per-bin counts.
    pub counts: Vec<u64>,
    /// Density-normalized bin heights.
    pub density: Vec<f64>,
}

impl SpeedHistogram {
    /// Bin midpoints, length `bins`.
    pub fn centers(&self) -> Vec<f64> {
        self.edges
            .windows(2)
            .map(|w| 0.5 * (w[0] + w[1]))
            .collect()
    }

    /// Uniform bin width.
    pub fn bin_width(&self) -> f64 {
        self.edges[1] - self.edges[0]
    }

    /// Center and density of the tallest bin.
    pub fn peak(&self) -> (f64, f64) {
        let mut best = 0usize;
        for (k, d) in self.density.iter().enumerate() {
            if *d > self.density[best] {
                best = k;
            }
        }
        (
            0.5 * (self.edges[best] + self.edges[best + 1]),
            self.density[best],
        )
    }
}

/// Bin a sample into `bins` uniform bins over `range` (default: the sample's
/// min..max). Samples outside the range are dropped; a sample landing on the
/// upper edge goes into the last bin.
pub fn density_histogram(
    samples: &[f64],
    bins: usize,
    range: Option<(f64, f64)>,
) -> Result<SpeedHistogram> {
    if samples.is_empty() {
        return Err(Error::InvalidParam("cannot bin an empty sample".into()));
    }
    if bins == 0 {
        return Err(Error::InvalidParam("bins must be > 0".into()));
    }
    if samples.iter().any(|s| !s.is_finite()) {
        return Err(Error::InvalidParam("samples must be finite".into()));
    }

    let (mut lo, mut hi) = match range {
        Some((lo, hi)) => {
            if !lo.is_finite() || !hi.is_finite() || hi < lo {
                return Err(Error::InvalidParam(format!(
                    "invalid histogram range ({lo}, {hi})"
                )));
            }
            (lo, hi)
        }
        None => samples.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &s| {
            (lo.min(s), hi.max(s))
        }),
    };
    if hi <= lo {
        // Degenerate range (constant sample): widen symmetrically.
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|k| lo + k as f64 * width).collect();

    let mut counts = vec![0u64; bins];
    let mut total = 0u64;
    for &s in samples {
        if s < lo || s > hi {
            continue;
        }
        let mut k = ((s - lo) / width) as usize;
        if k >= bins {
            k = bins - 1;
        }
        counts[k] += 1;
        total += 1;
    }

    let density = if total == 0 {
        vec![0.0; bins]
    } else {
        counts
            .iter()
            .map(|&c| c as f64 / (total as f64 * width))
            .collect()
    };

    Ok(SpeedHistogram {
        edges,
        counts,
        density,
    })
}

/// Automatic bin count: the larger of the Sturges and Freedman-Diaconis
/// estimates, the rule numpy applies for `bins="auto"`.
pub fn auto_bin_count(samples: &[f64]) -> usize {
    let n = samples.len();
    if n < 2 {
        return 1;
    }
    let sturges = (n as f64).log2().ceil() as usize + 1;

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let span = sorted[n - 1] - sorted[0];
    let iqr = percentile(&sorted, 0.75) - percentile(&sorted, 0.25);
    let fd_width = 2.0 * iqr * (n as f64).powf(-1.0 / 3.0);
    if span <= 0.0 || fd_width <= 0.0 {
        return sturges.max(1);
    }
    let fd = (span / fd_width).ceil() as usize;
    sturges.max(fd).max(1)
}

/// Linear-interpolated percentile of an already-sorted slice, q in [0, 1].
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let idx = pos.floor() as usize;
    let frac = pos - idx as f64;
    if idx + 1 < sorted.len() {
        sorted[idx] * (1.0 - frac) + sorted[idx + 1] * frac
    } else {
        sorted[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sample_rejected() {
        assert!(density_histogram(&[], 10, None).is_err());
        assert!(density_histogram(&[1.0], 0, None).is_err());
    }

    #[test]
    fn density_integrates_to_one() -> Result<()> {
        let samples: Vec<f64> = (0..1000).map(|i| i as f64 / 100.0).collect();
        let hist = density_histogram(&samples, 25, None)?;
        let integral: f64 = hist.density.iter().map(|d| d * hist.bin_width()).sum();
        assert!((integral - 1.0).abs() < 1e-12, "integral = {integral}");
        Ok(())
    }

    #[test]
    fn out_of_range_samples_are_dropped() -> Result<()> {
        let samples = [0.5, 1.5, 2.5, 99.0];
        let hist = density_histogram(&samples, 3, Some((0.0, 3.0)))?;
        let total: u64 = hist.counts.iter().sum();
        assert_eq!(total, 3);
        assert_eq!(hist.counts, vec![1, 1, 1]);
        Ok(())
    }

    #[test]
    fn upper_edge_sample_lands_in_last_bin() -> Result<()> {
        let hist = density_histogram(&[0.0, 3.0], 3, Some((0.0, 3.0)))?;
        assert_eq!(hist.counts, vec![1, 0, 1]);
        Ok(())
    }

    #[test]
    fn all_out_of_range_gives_zero_density() -> Result<()> {
        let hist = density_histogram(&[10.0, 11.0], 4, Some((0.0, 1.0)))?;
        assert!(hist.density.iter().all(|d| *d == 0.0));
        Ok(())
    }

    #[test]
    fn constant_sample_widens_range() -> Result<()> {
        let hist = density_histogram(&[2.0, 2.0, 2.0], 3, None)?;
        let total: u64 = hist.counts.iter().sum();
        assert_eq!(total, 3);
        assert!(hist.bin_width() > 0.0);
        Ok(())
    }

    #[test]
    fn peak_reports_tallest_bin() -> Result<()> {
        let samples = [1.0, 1.1, 1.2, 5.0];
        let hist = density_histogram(&samples, 5, Some((0.0, 5.0)))?;
        let (center, height) = hist.peak();
        assert!(center > 1.0 && center < 2.0);
        assert!(height > 0.0);
        Ok(())
    }

    #[test]
    fn auto_bin_count_is_sane() {
        assert_eq!(auto_bin_count(&[1.0]), 1);
        let samples: Vec<f64> = (0..1024).map(|i| (i as f64).sin()).collect();
        let bins = auto_bin_count(&samples);
        // At least the Sturges estimate for n = 1024.
        assert!(bins >= 11, "bins = {bins}");
        assert!(bins < 1000);
    }
}
