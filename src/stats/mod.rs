//! Stateless distribution models: the theoretical Maxwell-Boltzmann PDF,
//! histogram binning, the generic `a v^2 exp(-b v^2)` fit, cubic spline
//! interpolation, and a Gaussian KDE. All of them consume a read-only speed
//! snapshot and never touch simulation state.

pub mod fit;
pub mod histogram;
pub mod kde;
pub mod maxwell;
pub mod spline;

pub use fit::{fit_speed_distribution, FitReport};
pub use histogram::{auto_bin_count, density_histogram, SpeedHistogram};
pub use kde::gaussian_kde;
pub use maxwell::{maxwell_pdf, theory_coefficients, v_rms};
pub use spline::{spline_speed_density, CubicSpline, SplineReport};
