use crate::core::collide::{clamp_to_box, reflect_walls, resolve_pair_collisions};
use crate::core::config::SimConfig;
use crate::core::ensemble::{Ensemble, DIM};
use crate::core::init;
use crate::error::{Error, Result};
use crate::stats::maxwell;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Advance raw state by one timestep.
///
/// In order: free flight `pos += vel * dt` (explicit Euler), specular wall
/// reflection per axis, all-pairs hard-sphere resolution for approaching
/// overlapping pairs, and a hard clamp of every coordinate back into
/// `[radius, box_length - radius]`.
///
/// The output always satisfies the position-boundary invariant exactly, and
/// elastic reflections and impulses inject no net kinetic energy beyond
/// floating-point rounding. Returns the number of pairs resolved.
pub fn integrate_step(
    positions: &mut [[f64; DIM]],
    velocities: &mut [[f64; DIM]],
    dt: f64,
    box_length: f64,
    radius: f64,
) -> Result<usize> {
    if !dt.is_finite() || dt <= 0.0 {
        return Err(Error::InvalidParam(format!(
            "dt must be finite and > 0, got {dt}"
        )));
    }

    for (r, v) in positions.iter_mut().zip(velocities.iter()) {
        for k in 0..DIM {
            r[k] += v[k] * dt;
        }
    }

    reflect_walls(positions, velocities, box_length, radius);
    let resolved = resolve_pair_collisions(positions, velocities, radius)?;
    clamp_to_box(positions, box_length, radius);

    Ok(resolved)
}

/// A hard-sphere gas run: validated parameters, the particle ensemble, and
/// the derived reference scalars.
///
/// The harness is the sole owner; the engine mutates the ensemble only
/// through [`Simulation::step`] and the validated setters.
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    pub ensemble: Ensemble,
    v_rms: f64,
    dt: f64,
    time: f64,
    steps: u64,
}

impl Simulation {
    /// Build a new run: grid-placed positions, temperature-rescaled
    /// velocities, theoretical RMS speed, and a tunneling-safe timestep.
    ///
    /// `seed` makes the placement jitter and the velocity draw reproducible;
    /// `None` seeds from the thread-local generator.
    ///
    /// Errors: `Error::InvalidParam` for bad parameters,
    /// `Error::Infeasible` when the particles cannot fit the box.
    pub fn new(config: SimConfig, seed: Option<u64>) -> Result<Self> {
        config.validate()?;

        let mut rng: StdRng = match seed {
            Some(s) => SeedableRng::seed_from_u64(s),
            None => SeedableRng::seed_from_u64(rand::rng().random()),
        };

        let positions = init::grid_positions(&config, &mut rng)?;
        let velocities = init::thermal_velocities(&config, &mut rng)?;
        let dt = init::stable_dt(&velocities, config.radius, config.dt_safety)?;
        let v_rms = maxwell::v_rms(config.mass, config.temperature, config.boltzmann);
        let ensemble = Ensemble::new(positions, velocities)?;

        Ok(Self {
            config,
            ensemble,
            v_rms,
            dt,
            time: 0.0,
            steps: 0,
        })
    }

    /// Advance one timestep. Returns the number of pair collisions resolved.
    pub fn step(&mut self) -> Result<usize> {
        let resolved = integrate_step(
            &mut self.ensemble.positions,
            &mut self.ensemble.velocities,
            self.dt,
            self.config.box_length,
            self.config.radius,
        )?;
        self.time += self.dt;
        self.steps += 1;
        Ok(resolved)
    }

    /// Advance `steps` timesteps.
    pub fn advance(&mut self, steps: usize) -> Result<()> {
        for _ in 0..steps {
            self.step()?;
        }
        Ok(())
    }

    /// Stack speed snapshots: advance `stride` steps, record all N speeds,
    /// repeat `snapshots` times. The stacked sample feeds the fit and spline
    /// models with more statistics than a single frame.
    pub fn collect_speeds(&mut self, snapshots: usize, stride: usize) -> Result<Vec<f64>> {
        let mut stacked = Vec::with_capacity(snapshots * self.num_particles());
        for _ in 0..snapshots {
            self.advance(stride)?;
            stacked.extend(self.ensemble.speeds());
        }
        Ok(stacked)
    }

    /// Run parameters.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Number of particles.
    pub fn num_particles(&self) -> usize {
        self.ensemble.len()
    }

    /// Elapsed simulated time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of completed steps.
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    /// Current timestep.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Theoretical RMS speed `sqrt(3 k_B T / m)` at the configured
    /// temperature. Derived from parameters at construction, independent of
    /// the random draw.
    pub fn v_rms(&self) -> f64 {
        self.v_rms
    }

    /// Override the timestep, e.g. to slow a rendering run down.
    ///
    /// The tunneling-safety guarantee of the derived dt no longer applies;
    /// use [`Simulation::recompute_dt`] to restore it.
    pub fn set_dt(&mut self, dt: f64) -> Result<()> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(Error::InvalidParam(format!(
                "dt must be finite and > 0, got {dt}"
            )));
        }
        self.dt = dt;
        Ok(())
    }

    /// Re-derive the tunneling-safe timestep from the current velocities and
    /// return it.
    pub fn recompute_dt(&mut self) -> Result<f64> {
        self.dt = init::stable_dt(
            &self.ensemble.velocities,
            self.config.radius,
            self.config.dt_safety,
        )?;
        Ok(self.dt)
    }

    /// Replace all positions (validated finite, length-checked).
    pub fn set_positions(&mut self, positions: Vec<[f64; DIM]>) -> Result<()> {
        self.ensemble.set_positions(positions)
    }

    /// Replace all velocities (validated finite, length-checked).
    ///
    /// The stored dt is kept as-is; callers changing the speed scale should
    /// follow up with [`Simulation::recompute_dt`].
    pub fn set_velocities(&mut self, velocities: Vec<[f64; DIM]>) -> Result<()> {
        self.ensemble.set_velocities(velocities)
    }

    /// Speed of every particle.
    pub fn speeds(&self) -> Vec<f64> {
        self.ensemble.speeds()
    }

    /// Total kinetic energy of the ensemble.
    pub fn kinetic_energy(&self) -> f64 {
        self.ensemble.kinetic_energy(self.config.mass)
    }

    /// Ensemble temperature via equipartition.
    pub fn temperature(&self) -> f64 {
        self.ensemble
            .temperature(self.config.mass, self.config.boltzmann)
    }
}
