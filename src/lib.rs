use numpy::ndarray::{Array1, Array2};
use numpy::{IntoPyArray, PyArray1, PyArray2, PyReadonlyArray1, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

pub mod core;
pub mod error;
pub mod stats;

use crate::core::config::{BOLTZMANN, HELIUM_MASS, HELIUM_RADIUS};
use crate::core::ensemble::DIM;
use crate::core::{SimConfig, Simulation};

fn py_err<E: ToString>(e: E) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn vectors_from_array(arr: &PyReadonlyArray2<'_, f64>, n: usize, what: &str) -> PyResult<Vec<[f64; DIM]>> {
    let view = arr.as_array();
    if view.ndim() != 2 || view.shape()[0] != n || view.shape()[1] != DIM {
        return Err(py_err(format!(
            "{what} must have shape ({n}, {DIM}), got {:?}",
            view.shape()
        )));
    }
    let mut out = vec![[0.0_f64; DIM]; n];
    for i in 0..n {
        for k in 0..DIM {
            out[i][k] = view[[i, k]];
        }
    }
    Ok(out)
}

fn array_from_vectors(py: Python<'_>, vectors: &[[f64; DIM]]) -> Py<PyArray2<f64>> {
    let mut arr = Array2::<f64>::zeros((vectors.len(), DIM));
    for (i, v) in vectors.iter().enumerate() {
        for k in 0..DIM {
            arr[[i, k]] = v[k];
        }
    }
    arr.into_pyarray(py).to_owned().into()
}

/// Python-facing wrapper around the Rust hard-sphere simulation core.
///
/// Owns one run: grid-initialized positions, temperature-scaled velocities,
/// and the derived reference scalars (v_rms, dt). The analysis methods are
/// read-only consumers of speed snapshots; the harness drives stepping
/// explicitly.
#[pyclass]
pub struct MbSim {
    sim: Simulation,
}

#[pymethods]
impl MbSim {
    /// Initialize a hard-sphere gas in a cubic axis-aligned box.
    ///
    /// Parameters
    /// - num_particles: number of particles (int, > 0)
    /// - temperature: target temperature in K (float, > 0)
    /// - box_length: cube edge length in m (default 1e-9)
    /// - radius: sphere radius in m (default: helium)
    /// - mass: particle mass in kg (default: helium)
    /// - boltzmann: Boltzmann constant in J/K
    /// - seed: RNG seed (int) for reproducibility; None for nondeterministic
    ///
    /// Errors: raises ValueError on invalid parameters or when the particles
    /// cannot fit the box without overlap.
    #[new]
    #[pyo3(signature = (
        num_particles,
        temperature,
        box_length = 1e-9,
        radius = HELIUM_RADIUS,
        mass = HELIUM_MASS,
        boltzmann = BOLTZMANN,
        seed = None
    ))]
    fn new(
        num_particles: usize,
        temperature: f64,
        box_length: f64,
        radius: f64,
        mass: f64,
        boltzmann: f64,
        seed: Option<u64>,
    ) -> PyResult<Self> {
        let config = SimConfig {
            num_particles,
            temperature,
            mass,
            radius,
            box_length,
            boltzmann,
            dt_safety: 0.2,
        };
        let sim = Simulation::new(config, seed).map_err(py_err)?;
        Ok(Self { sim })
    }

    /// Advance the simulation by `n` timesteps (releases the GIL).
    #[pyo3(signature = (n = 1))]
    fn step(&mut self, py: Python<'_>, n: usize) -> PyResult<()> {
        py.allow_threads(|| self.sim.advance(n)).map_err(py_err)
    }

    /// Return positions as a NumPy array of shape (N, 3), dtype=float64.
    fn get_positions(&self, py: Python<'_>) -> Py<PyArray2<f64>> {
        array_from_vectors(py, &self.sim.ensemble.positions)
    }

    /// Return velocities as a NumPy array of shape (N, 3), dtype=float64.
    fn get_velocities(&self, py: Python<'_>) -> Py<PyArray2<f64>> {
        array_from_vectors(py, &self.sim.ensemble.velocities)
    }

    /// Return per-particle speeds as a NumPy array of shape (N,).
    fn get_speeds(&self, py: Python<'_>) -> Py<PyArray1<f64>> {
        Array1::from_vec(self.sim.speeds()).into_pyarray(py).to_owned().into()
    }

    /// Set all particle positions from a NumPy array of shape (N, 3).
    /// Values must be finite; the caller is responsible for keeping them
    /// inside the box and non-overlapping.
    fn set_positions(&mut self, positions: PyReadonlyArray2<'_, f64>) -> PyResult<()> {
        let vectors = vectors_from_array(&positions, self.sim.num_particles(), "positions")?;
        self.sim.set_positions(vectors).map_err(py_err)
    }

    /// Set all particle velocities from a NumPy array of shape (N, 3).
    /// Values must be finite. The stored dt is left untouched; call
    /// recompute_dt() afterwards to restore the tunneling-safety guarantee.
    fn set_velocities(&mut self, velocities: PyReadonlyArray2<'_, f64>) -> PyResult<()> {
        let vectors = vectors_from_array(&velocities, self.sim.num_particles(), "velocities")?;
        self.sim.set_velocities(vectors).map_err(py_err)
    }

    /// Advance `stride` steps and record all N speeds, `snapshots` times;
    /// returns the stacked sample (releases the GIL). Feeds the fit and
    /// spline models with more statistics than a single frame.
    #[pyo3(signature = (snapshots = 50, stride = 50))]
    fn collect_speeds(
        &mut self,
        py: Python<'_>,
        snapshots: usize,
        stride: usize,
    ) -> PyResult<Py<PyArray1<f64>>> {
        let stacked = py
            .allow_threads(|| self.sim.collect_speeds(snapshots, stride))
            .map_err(py_err)?;
        Ok(Array1::from_vec(stacked).into_pyarray(py).to_owned().into())
    }

    /// Current timestep.
    fn dt(&self) -> f64 {
        self.sim.dt()
    }

    /// Override the timestep (e.g. a fixed tiny dt for rendering runs).
    fn set_dt(&mut self, dt: f64) -> PyResult<()> {
        self.sim.set_dt(dt).map_err(py_err)
    }

    /// Re-derive the tunneling-safe timestep from the current velocities and
    /// return it.
    fn recompute_dt(&mut self) -> PyResult<f64> {
        self.sim.recompute_dt().map_err(py_err)
    }

    /// Theoretical RMS speed at the configured temperature.
    fn v_rms(&self) -> f64 {
        self.sim.v_rms()
    }

    /// Elapsed simulated time.
    fn time(&self) -> f64 {
        self.sim.time()
    }

    /// Number of particles.
    fn num_particles(&self) -> usize {
        self.sim.num_particles()
    }

    /// Total kinetic energy of the ensemble.
    fn kinetic_energy(&self) -> f64 {
        self.sim.kinetic_energy()
    }

    /// Ensemble temperature implied by the mean kinetic energy.
    fn temperature(&self) -> f64 {
        self.sim.temperature()
    }

    /// Evaluate the theoretical Maxwell-Boltzmann PDF at each speed in `v`,
    /// using the run's mass, temperature, and Boltzmann constant.
    fn maxwell_pdf(&self, py: Python<'_>, v: PyReadonlyArray1<'_, f64>) -> PyResult<Py<PyArray1<f64>>> {
        let cfg = self.sim.config();
        let values: Vec<f64> = v
            .as_array()
            .iter()
            .map(|&s| stats::maxwell_pdf(s, cfg.mass, cfg.temperature, cfg.boltzmann))
            .collect();
        Ok(Array1::from_vec(values).into_pyarray(py).to_owned().into())
    }

    /// Bin a speed sample into a density histogram.
    ///
    /// Parameters
    /// - speeds: 1-D speed sample
    /// - bins: number of bins (default 45)
    /// - range: optional (min, max); defaults to the sample's min/max
    ///
    /// Returns: dict {"edges", "centers", "density"} of NumPy arrays.
    #[pyo3(signature = (speeds, bins = 45, range = None))]
    fn speed_histogram<'py>(
        &self,
        py: Python<'py>,
        speeds: PyReadonlyArray1<'py, f64>,
        bins: usize,
        range: Option<(f64, f64)>,
    ) -> PyResult<Py<PyDict>> {
        let sample = speeds.as_slice().map_err(py_err)?;
        let hist = stats::density_histogram(sample, bins, range).map_err(py_err)?;
        let out = PyDict::new(py);
        out.set_item("centers", Array1::from_vec(hist.centers()).into_pyarray(py))?;
        out.set_item("edges", Array1::from_vec(hist.edges).into_pyarray(py))?;
        out.set_item("density", Array1::from_vec(hist.density).into_pyarray(py))?;
        Ok(out.into())
    }

    /// Fit the generic form a*v^2*exp(-b*v^2) to a speed sample and compare
    /// against the theoretical Maxwell-Boltzmann coefficients.
    ///
    /// Returns: dict with fitted "a"/"b", "theory_a"/"theory_b", percent
    /// deviations, and the MSE against the theoretical curve.
    fn fit_speed_distribution<'py>(
        &self,
        py: Python<'py>,
        speeds: PyReadonlyArray1<'py, f64>,
    ) -> PyResult<Py<PyDict>> {
        let sample = speeds.as_slice().map_err(py_err)?;
        let cfg = self.sim.config();
        let report = stats::fit_speed_distribution(sample, cfg.mass, cfg.temperature, cfg.boltzmann)
            .map_err(py_err)?;
        let out = PyDict::new(py);
        out.set_item("a", report.a)?;
        out.set_item("b", report.b)?;
        out.set_item("theory_a", report.theory_a)?;
        out.set_item("theory_b", report.theory_b)?;
        out.set_item("deviation_a_pct", report.deviation_a_pct)?;
        out.set_item("deviation_b_pct", report.deviation_b_pct)?;
        out.set_item("mse", report.mse)?;
        Ok(out.into())
    }

    /// Cubic-spline density through histogram bin centers, evaluated over an
    /// extended speed axis and clamped to zero outside the observed range.
    ///
    /// Returns: dict {"v": axis, "density": values, "mse": float}.
    #[pyo3(signature = (speeds, bins = 50, points = 200))]
    fn spline_speed_density<'py>(
        &self,
        py: Python<'py>,
        speeds: PyReadonlyArray1<'py, f64>,
        bins: usize,
        points: usize,
    ) -> PyResult<Py<PyDict>> {
        let sample = speeds.as_slice().map_err(py_err)?;
        let cfg = self.sim.config();
        let report =
            stats::spline_speed_density(sample, bins, points, cfg.mass, cfg.temperature, cfg.boltzmann)
                .map_err(py_err)?;
        let out = PyDict::new(py);
        out.set_item("v", Array1::from_vec(report.v_axis).into_pyarray(py))?;
        out.set_item("density", Array1::from_vec(report.density).into_pyarray(py))?;
        out.set_item("mse", report.mse)?;
        Ok(out.into())
    }

    /// Gaussian KDE of a speed sample (Scott bandwidth), evaluated over
    /// linspace(0, 3 * v_rms, points).
    ///
    /// Returns: dict {"v": axis, "density": values}.
    #[pyo3(signature = (speeds, points = 200))]
    fn kde_speed_density<'py>(
        &self,
        py: Python<'py>,
        speeds: PyReadonlyArray1<'py, f64>,
        points: usize,
    ) -> PyResult<Py<PyDict>> {
        if points < 2 {
            return Err(py_err("points must be at least 2"));
        }
        let sample = speeds.as_slice().map_err(py_err)?;
        let hi = 3.0 * self.sim.v_rms();
        let axis: Vec<f64> = (0..points)
            .map(|k| hi * k as f64 / (points - 1) as f64)
            .collect();
        let density = stats::gaussian_kde(sample, &axis).map_err(py_err)?;
        let out = PyDict::new(py);
        out.set_item("v", Array1::from_vec(axis).into_pyarray(py))?;
        out.set_item("density", Array1::from_vec(density).into_pyarray(py))?;
        Ok(out.into())
    }
}

/// The mbsim Python module entry point.
#[pymodule]
fn mbsim(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<MbSim>()?;
    Ok(())
}
