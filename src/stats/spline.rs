//! Cubic spline interpolation of a histogram's bin-center/height pairs,
//! evaluated over an extended speed axis with the density clamped to zero
//! outside the observed speed range and wherever interpolation dips negative.

use crate::error::{Error, Result};
use crate::stats::histogram::density_histogram;
use crate::stats::maxwell::maxwell_pdf;

/// Natural cubic spline through strictly increasing knots.
///
/// Second derivatives at the end knots are zero; interior ones come from the
/// standard tridiagonal system, solved with the Thomas algorithm. Evaluation
/// outside the knot range extrapolates with the end segments (callers that
/// need the zero-clamped density use [`spline_speed_density`]).
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    second: Vec<f64>,
}

impl CubicSpline {
    /// Build a natural spline. Requires at least two knots, strictly
    /// increasing x, and finite values throughout.
    pub fn natural(x: &[f64], y: &[f64]) -> Result<Self> {
        let n = x.len();
        if n != y.len() {
            return Err(Error::InvalidParam(format!(
                "knot coordinates must have equal length, got {} and {}",
                x.len(),
                y.len()
            )));
        }
        if n < 2 {
            return Err(Error::InvalidParam(
                "need at least 2 knots for a spline".into(),
            ));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(Error::InvalidParam("knots must be finite".into()));
        }
        for w in x.windows(2) {
            if w[1] <= w[0] {
                return Err(Error::InvalidParam(
                    "knot x values must be strictly increasing".into(),
                ));
            }
        }

        let mut second = vec![0.0_f64; n];
        if n > 2 {
            let m = n - 2;
            let mut diag = vec![0.0_f64; m];
            let mut sup = vec![0.0_f64; m];
            let mut rhs = vec![0.0_f64; m];
            let mut sub = vec![0.0_f64; m];
            for i in 1..=m {
                let h0 = x[i] - x[i - 1];
                let h1 = x[i + 1] - x[i];
                sub[i - 1] = h0;
                diag[i - 1] = 2.0 * (h0 + h1);
                sup[i - 1] = h1;
                rhs[i - 1] = 6.0 * ((y[i + 1] - y[i]) / h1 - (y[i] - y[i - 1]) / h0);
            }
            // Thomas sweep; the system is strictly diagonally dominant.
            for i in 1..m {
                let w = sub[i] / diag[i - 1];
                diag[i] -= w * sup[i - 1];
                rhs[i] -= w * rhs[i - 1];
            }
            second[m] = rhs[m - 1] / diag[m - 1];
            for i in (1..m).rev() {
                second[i] = (rhs[i - 1] - sup[i - 1] * second[i + 1]) / diag[i - 1];
            }
        }

        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            second,
        })
    }

    /// Spline value at `v`.
    pub fn value(&self, v: f64) -> f64 {
        let n = self.x.len();
        // Segment index, clamped so out-of-range v extrapolates the ends.
        let mut i = self.x.partition_point(|&xk| xk <= v);
        i = i.clamp(1, n - 1) - 1;

        let h = self.x[i + 1] - self.x[i];
        let t0 = self.x[i + 1] - v;
        let t1 = v - self.x[i];
        (self.second[i] * t0 * t0 * t0 + self.second[i + 1] * t1 * t1 * t1) / (6.0 * h)
            + (self.y[i] / h - self.second[i] * h / 6.0) * t0
            + (self.y[i + 1] / h - self.second[i + 1] * h / 6.0) * t1
    }
}

/// Spline density over the extended speed axis, with the MSE against the
/// theoretical Maxwell-Boltzmann curve.
#[derive(Debug, Clone)]
pub struct SplineReport {
    /// Evaluation axis `linspace(0, 1.2 * max_speed, points)`.
    pub v_axis: Vec<f64>,
    /// Clamped spline density at each axis point.
    pub density: Vec<f64>,
    /// Mean squared error against the theoretical curve.
    pub mse: f64,
}

/// Bin a speed sample, spline the bin-center/height pairs, and evaluate over
/// `linspace(0, 1.2 * max_speed, points)`.
///
/// The density is clamped to zero below the smallest and above the largest
/// observed speed and wherever the interpolant goes negative.
pub fn spline_speed_density(
    speeds: &[f64],
    bins: usize,
    points: usize,
    mass: f64,
    temperature: f64,
    boltzmann: f64,
) -> Result<SplineReport> {
    if points < 2 {
        return Err(Error::InvalidParam("points must be at least 2".into()));
    }
    let hist = density_histogram(speeds, bins, None)?;
    let spline = CubicSpline::natural(&hist.centers(), &hist.density)?;

    let (mut v_min, mut v_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &s in speeds {
        v_min = v_min.min(s);
        v_max = v_max.max(s);
    }

    let hi = v_max * 1.2;
    let mut v_axis = Vec::with_capacity(points);
    let mut density = Vec::with_capacity(points);
    let mut mse = 0.0;
    for k in 0..points {
        let v = hi * k as f64 / (points - 1) as f64;
        let mut d = spline.value(v);
        if v < v_min || v > v_max || d < 0.0 {
            d = 0.0;
        }
        let diff = d - maxwell_pdf(v, mass, temperature, boltzmann);
        mse += diff * diff;
        v_axis.push(v);
        density.push(d);
    }
    mse /= points as f64;

    Ok(SplineReport {
        v_axis,
        density,
        mse,
    })
}
