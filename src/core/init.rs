use crate::core::collide::clamp_to_box;
use crate::core::config::SimConfig;
use crate::core::ensemble::DIM;
use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::Rng;

/// Fraction of the grid cell edge used as placement jitter.
const JITTER_FRACTION: f64 = 0.1;

/// Number of grid cells per axis for `n` particles: the smallest c with
/// c^3 >= n. Guarded against floating-point cbrt rounding on exact cubes.
pub fn grid_cells_per_side(n: usize) -> usize {
    let mut c = (n as f64).cbrt().ceil() as usize;
    c = c.max(1);
    while c > 1 && (c - 1).pow(3) >= n {
        c -= 1;
    }
    while c.pow(3) < n {
        c += 1;
    }
    c
}

/// Place `n` particles on a near-regular grid inside the box.
///
/// Cells are traversed in lexicographic (x, y, z) order, each particle sits
/// at its cell center plus a uniform jitter of at most a tenth of the cell
/// edge per axis to break exact symmetry. Placement stops once `n` particles
/// are down, even if the grid has spare cells. Jittered positions are clamped
/// into `[radius, box_length - radius]` so the boundary invariant holds from
/// step zero.
///
/// Errors with `Error::Infeasible` when the cell edge is below one particle
/// diameter: the box cannot hold `n` non-overlapping particles of this size.
pub fn grid_positions(cfg: &SimConfig, rng: &mut StdRng) -> Result<Vec<[f64; DIM]>> {
    let n = cfg.num_particles;
    let cells = grid_cells_per_side(n);
    let cell = cfg.box_length / cells as f64;

    if cell < 2.0 * cfg.radius {
        return Err(Error::Infeasible(format!(
            "{n} particles of radius {} do not fit a box of edge {} without overlap \
             (grid cell {cell} < one diameter)",
            cfg.radius, cfg.box_length
        )));
    }

    let jitter = cell * JITTER_FRACTION;
    let mut positions: Vec<[f64; DIM]> = Vec::with_capacity(n);

    'place: for x in 0..cells {
        for y in 0..cells {
            for z in 0..cells {
                if positions.len() >= n {
                    break 'place;
                }
                let mut r = [
                    (x as f64 + 0.5) * cell,
                    (y as f64 + 0.5) * cell,
                    (z as f64 + 0.5) * cell,
                ];
                for c in &mut r {
                    *c += rng.random_range(-jitter..=jitter);
                }
                positions.push(r);
            }
        }
    }

    clamp_to_box(&mut positions, cfg.box_length, cfg.radius);
    Ok(positions)
}

/// Draw `n` velocities uniformly in [-1, 1] per component, then rescale the
/// whole ensemble by the single factor `sqrt(T / T_current)` so the mean
/// kinetic energy matches the target temperature exactly via equipartition
/// `KE_avg = (3/2) k_B T`.
pub fn thermal_velocities(cfg: &SimConfig, rng: &mut StdRng) -> Result<Vec<[f64; DIM]>> {
    let n = cfg.num_particles;
    let mut velocities = vec![[0.0_f64; DIM]; n];
    for v in &mut velocities {
        for c in v.iter_mut() {
            *c = rng.random_range(-1.0..=1.0);
        }
    }

    let v_sq_sum: f64 = velocities
        .iter()
        .map(|v| v[0] * v[0] + v[1] * v[1] + v[2] * v[2])
        .sum();
    let ke_avg = 0.5 * cfg.mass * v_sq_sum / n as f64;
    let t_current = (2.0 / 3.0) * ke_avg / cfg.boltzmann;
    if t_current <= 0.0 {
        // All-zero draw: astronomically unlikely, but a divide would be silent.
        return Err(Error::MathError(
            "raw velocity draw has zero kinetic energy".into(),
        ));
    }

    let scale = (cfg.temperature / t_current).sqrt();
    for v in &mut velocities {
        for c in v.iter_mut() {
            *c *= scale;
        }
    }
    Ok(velocities)
}

/// Tunneling-safe timestep: `(radius / max_speed) * safety`.
///
/// With safety around 0.2 no particle can cross a particle diameter in one
/// step at its initial speed. The guarantee is tied to the velocities the dt
/// was derived from; callers that overwrite velocities afterwards must
/// re-derive it.
pub fn stable_dt(velocities: &[[f64; DIM]], radius: f64, safety: f64) -> Result<f64> {
    let max_speed = velocities
        .iter()
        .map(|v| v[0] * v[0] + v[1] * v[1] + v[2] * v[2])
        .fold(0.0, f64::max)
        .sqrt();
    if max_speed <= 0.0 {
        return Err(Error::MathError(
            "ensemble is at rest; cannot derive a stability timestep".into(),
        ));
    }
    Ok(radius / max_speed * safety)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn reduced_config(n: usize, box_length: f64, radius: f64) -> SimConfig {
        SimConfig {
            num_particles: n,
            temperature: 1.0,
            mass: 1.0,
            radius,
            box_length,
            boltzmann: 1.0,
            dt_safety: 0.2,
        }
    }

    #[test]
    fn cells_per_side_handles_exact_cubes() {
        assert_eq!(grid_cells_per_side(1), 1);
        assert_eq!(grid_cells_per_side(8), 2);
        assert_eq!(grid_cells_per_side(9), 3);
        assert_eq!(grid_cells_per_side(27), 3);
        assert_eq!(grid_cells_per_side(28), 4);
        assert_eq!(grid_cells_per_side(1000), 10);
    }

    #[test]
    fn overcrowded_grid_is_infeasible() {
        let cfg = reduced_config(1000, 1.0, 0.1);
        let mut rng = StdRng::seed_from_u64(1);
        let err = grid_positions(&cfg, &mut rng).unwrap_err();
        assert!(matches!(err, Error::Infeasible(_)));
    }

    #[test]
    fn grid_positions_stay_in_bounds_and_apart() -> Result<()> {
        let cfg = reduced_config(8, 10.0, 0.5);
        let mut rng = StdRng::seed_from_u64(42);
        let positions = grid_positions(&cfg, &mut rng)?;
        assert_eq!(positions.len(), 8);
        for p in &positions {
            for &c in p {
                assert!(c >= cfg.radius && c <= cfg.box_length - cfg.radius);
            }
        }
        // Cell edge 5, jitter at most 0.5 per axis: adjacent centers stay at
        // least 4 apart, far beyond one diameter.
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                let d: f64 = (0..DIM)
                    .map(|k| (positions[i][k] - positions[j][k]).powi(2))
                    .sum::<f64>()
                    .sqrt();
                assert!(d >= 2.0 * cfg.radius, "pair ({i}, {j}) too close: {d}");
            }
        }
        Ok(())
    }

    #[test]
    fn jitter_stays_within_a_tenth_of_the_cell() -> Result<()> {
        let cfg = reduced_config(27, 9.0, 0.3);
        let mut rng = StdRng::seed_from_u64(7);
        let positions = grid_positions(&cfg, &mut rng)?;
        let cell = cfg.box_length / 3.0;
        for p in &positions {
            for &c in p {
                let offset = (c / cell).fract() - 0.5;
                assert!(
                    (offset * cell).abs() <= cell * JITTER_FRACTION + 1e-12,
                    "particle strayed {offset} cells from its center"
                );
            }
        }
        Ok(())
    }

    #[test]
    fn rescaled_velocities_match_target_temperature() -> Result<()> {
        let cfg = reduced_config(64, 20.0, 0.2);
        let mut rng = StdRng::seed_from_u64(99);
        let velocities = thermal_velocities(&cfg, &mut rng)?;
        let v_sq_sum: f64 = velocities
            .iter()
            .map(|v| v[0] * v[0] + v[1] * v[1] + v[2] * v[2])
            .sum();
        let ke_avg = 0.5 * cfg.mass * v_sq_sum / velocities.len() as f64;
        let t = (2.0 / 3.0) * ke_avg / cfg.boltzmann;
        assert!(
            ((t - cfg.temperature) / cfg.temperature).abs() < 1e-12,
            "rescaled ensemble temperature {t} != {}",
            cfg.temperature
        );
        Ok(())
    }

    #[test]
    fn stable_dt_follows_radius_over_max_speed() -> Result<()> {
        let velocities = vec![[3.0, 4.0, 0.0], [0.0, 1.0, 0.0]];
        let dt = stable_dt(&velocities, 0.5, 0.2)?;
        assert!((dt - 0.5 / 5.0 * 0.2).abs() < 1e-15);
        Ok(())
    }

    #[test]
    fn stable_dt_rejects_ensemble_at_rest() {
        let velocities = vec![[0.0; DIM]; 4];
        let err = stable_dt(&velocities, 0.5, 0.2).unwrap_err();
        assert!(matches!(err, Error::MathError(_)));
    }
}
