use crate::error::{Error, Result};

/// Helium-4 molecular mass in kg.
pub const HELIUM_MASS: f64 = 6.646e-27;
/// Helium kinetic radius in m.
pub const HELIUM_RADIUS: f64 = 3.1e-11;
/// Boltzmann constant in J/K.
pub const BOLTZMANN: f64 = 1.380649e-23;

/// Immutable per-run simulation parameters.
///
/// All particles are identical hard spheres; the box is cubic and
/// axis-aligned with one corner at the origin. Values are validated once at
/// simulation construction and never change for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of particles N (> 0, fixed for the run).
    pub num_particles: usize,
    /// Target temperature in K, used only at initialization.
    pub temperature: f64,
    /// Particle mass in kg.
    pub mass: f64,
    /// Hard-sphere radius in m.
    pub radius: f64,
    /// Box edge length in m.
    pub box_length: f64,
    /// Boltzmann constant in J/K.
    pub boltzmann: f64,
    /// Safety factor applied to the tunneling-safe timestep.
    pub dt_safety: f64,
}

impl Default for SimConfig {
    /// Helium gas at 373 K in a 1 nm box.
    fn default() -> Self {
        Self {
            num_particles: 2000,
            temperature: 373.0,
            mass: HELIUM_MASS,
            radius: HELIUM_RADIUS,
            box_length: 1e-9,
            boltzmann: BOLTZMANN,
            dt_safety: 0.2,
        }
    }
}

impl SimConfig {
    /// Validate all parameters.
    ///
    /// Errors with `Error::InvalidParam` on any non-finite or non-positive
    /// scalar, a zero particle count, or a box too small to hold even a
    /// single particle.
    pub fn validate(&self) -> Result<()> {
        if self.num_particles == 0 {
            return Err(Error::InvalidParam("num_particles must be > 0".into()));
        }
        let scalars = [
            ("temperature", self.temperature),
            ("mass", self.mass),
            ("radius", self.radius),
            ("box_length", self.box_length),
            ("boltzmann", self.boltzmann),
            ("dt_safety", self.dt_safety),
        ];
        for (name, value) in scalars {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidParam(format!(
                    "{name} must be finite and > 0, got {value}"
                )));
            }
        }
        if self.box_length < 2.0 * self.radius {
            return Err(Error::InvalidParam(
                "box_length must be at least 2 * radius".into(),
            ));
        }
        Ok(())
    }
}
