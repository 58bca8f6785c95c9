use crate::error::{Error, Result};

/// Fixed spatial dimension (3D).
pub const DIM: usize = 3;

/// Particle ensemble state: two index-aligned collections of length N.
///
/// Index `i` identifies the same physical particle in both collections and
/// across time steps. N is fixed for the lifetime of a run; no particles are
/// created or destroyed.
#[derive(Debug, Clone)]
pub struct Ensemble {
    /// Particle center positions [x, y, z] in m.
    pub positions: Vec<[f64; DIM]>,
    /// Particle velocities [vx, vy, vz] in m/s.
    pub velocities: Vec<[f64; DIM]>,
}

impl Ensemble {
    /// Create an ensemble after validating that both collections have the
    /// same length and every component is finite.
    pub fn new(positions: Vec<[f64; DIM]>, velocities: Vec<[f64; DIM]>) -> Result<Self> {
        if positions.len() != velocities.len() {
            return Err(Error::InvalidParam(format!(
                "positions and velocities must have equal length, got {} and {}",
                positions.len(),
                velocities.len()
            )));
        }
        check_finite(&positions, "position")?;
        check_finite(&velocities, "velocity")?;
        Ok(Self {
            positions,
            velocities,
        })
    }

    /// Number of particles N.
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// True when the ensemble holds no particles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Speed (Euclidean norm of velocity) of every particle.
    pub fn speeds(&self) -> Vec<f64> {
        self.velocities
            .iter()
            .map(|v| (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt())
            .collect()
    }

    /// Largest speed in the ensemble.
    pub fn max_speed(&self) -> f64 {
        self.velocities
            .iter()
            .map(|v| v[0] * v[0] + v[1] * v[1] + v[2] * v[2])
            .fold(0.0, f64::max)
            .sqrt()
    }

    /// Total kinetic energy: sum of 1/2 m |v|^2 over all particles.
    pub fn kinetic_energy(&self, mass: f64) -> f64 {
        let v_sq_sum: f64 = self
            .velocities
            .iter()
            .map(|v| v[0] * v[0] + v[1] * v[1] + v[2] * v[2])
            .sum();
        0.5 * mass * v_sq_sum
    }

    /// Ensemble temperature implied by the mean kinetic energy via
    /// equipartition: T = (2/3) KE_avg / k_B.
    pub fn temperature(&self, mass: f64, boltzmann: f64) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let ke_avg = self.kinetic_energy(mass) / self.len() as f64;
        (2.0 / 3.0) * ke_avg / boltzmann
    }

    /// Replace all positions (validated finite, length-checked).
    pub fn set_positions(&mut self, positions: Vec<[f64; DIM]>) -> Result<()> {
        if positions.len() != self.len() {
            return Err(Error::InvalidParam(format!(
                "expected {} positions, got {}",
                self.len(),
                positions.len()
            )));
        }
        check_finite(&positions, "position")?;
        self.positions = positions;
        Ok(())
    }

    /// Replace all velocities (validated finite, length-checked).
    pub fn set_velocities(&mut self, velocities: Vec<[f64; DIM]>) -> Result<()> {
        if velocities.len() != self.len() {
            return Err(Error::InvalidParam(format!(
                "expected {} velocities, got {}",
                self.len(),
                velocities.len()
            )));
        }
        check_finite(&velocities, "velocity")?;
        self.velocities = velocities;
        Ok(())
    }

    /// Multiply every velocity component by a single scalar factor.
    pub fn scale_velocities(&mut self, factor: f64) {
        for v in &mut self.velocities {
            for c in v.iter_mut() {
                *c *= factor;
            }
        }
    }
}

fn check_finite(vectors: &[[f64; DIM]], what: &str) -> Result<()> {
    for (i, v) in vectors.iter().enumerate() {
        if !v.iter().all(|c| c.is_finite()) {
            return Err(Error::InvalidParam(format!(
                "{what} components must be finite (particle {i})"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_particle_ensemble() -> Result<Ensemble> {
        Ensemble::new(
            vec![[0.0, 1.0, 2.0], [3.0, 4.0, 5.0]],
            vec![[3.0, 4.0, 0.0], [0.0, 0.0, 1.0]],
        )
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let err = Ensemble::new(vec![[0.0; 3]], vec![]).unwrap_err();
        assert!(err.to_string().contains("equal length"));
    }

    #[test]
    fn non_finite_velocity_rejected() {
        let err = Ensemble::new(vec![[0.0; 3]], vec![[f64::NAN, 0.0, 0.0]]).unwrap_err();
        assert!(err.to_string().contains("velocity"));
    }

    #[test]
    fn kinetic_energy_and_speeds() -> Result<()> {
        let ens = two_particle_ensemble()?;
        // |v0| = 5, |v1| = 1; KE = 0.5 * m * (25 + 1)
        let speeds = ens.speeds();
        assert!((speeds[0] - 5.0).abs() < 1e-12);
        assert!((speeds[1] - 1.0).abs() < 1e-12);
        assert!((ens.kinetic_energy(2.0) - 26.0).abs() < 1e-12);
        assert!((ens.max_speed() - 5.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn temperature_from_equipartition() -> Result<()> {
        let ens = two_particle_ensemble()?;
        // KE_avg = 0.5 * 1.0 * 26 / 2 = 6.5; T = (2/3) * 6.5 / 1.0
        let t = ens.temperature(1.0, 1.0);
        assert!((t - (2.0 / 3.0) * 6.5).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn setters_validate_length_and_finiteness() -> Result<()> {
        let mut ens = two_particle_ensemble()?;
        assert!(ens.set_velocities(vec![[0.0; 3]]).is_err());
        assert!(ens
            .set_positions(vec![[0.0; 3], [f64::INFINITY, 0.0, 0.0]])
            .is_err());
        ens.set_velocities(vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])?;
        assert_eq!(ens.velocities[0], [1.0, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn scale_velocities_applies_single_factor() -> Result<()> {
        let mut ens = two_particle_ensemble()?;
        ens.scale_velocities(2.0);
        assert_eq!(ens.velocities[0], [6.0, 8.0, 0.0]);
        assert_eq!(ens.velocities[1], [0.0, 0.0, 2.0]);
        Ok(())
    }
}
