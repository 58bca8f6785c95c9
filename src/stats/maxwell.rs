//! Closed-form Maxwell-Boltzmann speed distribution and derived reference
//! speeds. Pure functions of scalar inputs; no simulation state.

use std::f64::consts::PI;

/// Maxwell-Boltzmann probability density at speed `v` for particles of mass
/// `mass` at temperature `temperature`:
///
/// `f(v) = 4 pi (m / (2 pi k_B T))^(3/2) v^2 exp(-m v^2 / (2 k_B T))`
///
/// Zero for negative `v` (speed is a magnitude).
pub fn maxwell_pdf(v: f64, mass: f64, temperature: f64, boltzmann: f64) -> f64 {
    if v < 0.0 {
        return 0.0;
    }
    let a = (mass / (2.0 * PI * boltzmann * temperature)).powf(1.5);
    let exponent = -(mass * v * v) / (2.0 * boltzmann * temperature);
    4.0 * PI * a * v * v * exponent.exp()
}

/// Coefficients (a, b) of the Maxwell-Boltzmann density written in the
/// generic form `a * v^2 * exp(-b * v^2)`:
///
/// `a = 4 pi (m / (2 pi k_B T))^(3/2)`, `b = m / (2 k_B T)`.
pub fn theory_coefficients(mass: f64, temperature: f64, boltzmann: f64) -> (f64, f64) {
    let a = 4.0 * PI * (mass / (2.0 * PI * boltzmann * temperature)).powf(1.5);
    let b = mass / (2.0 * boltzmann * temperature);
    (a, b)
}

/// Root-mean-square speed `sqrt(3 k_B T / m)`.
pub fn v_rms(mass: f64, temperature: f64, boltzmann: f64) -> f64 {
    (3.0 * boltzmann * temperature / mass).sqrt()
}

/// Most probable speed `sqrt(2 k_B T / m)`, the mode of the density.
pub fn most_probable_speed(mass: f64, temperature: f64, boltzmann: f64) -> f64 {
    (2.0 * boltzmann * temperature / mass).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_is_zero_for_negative_speed() {
        assert_eq!(maxwell_pdf(-1.0, 1.0, 1.0, 1.0), 0.0);
        assert_eq!(maxwell_pdf(0.0, 1.0, 1.0, 1.0), 0.0);
    }

    #[test]
    fn pdf_integrates_to_one() {
        // Reduced units m = k_B = T = 1; trapezoid over [0, 10] covers
        // essentially all the mass (v_rms = sqrt(3)).
        let n = 4000;
        let hi = 10.0;
        let h = hi / n as f64;
        let mut integral = 0.0;
        for i in 0..n {
            let v0 = i as f64 * h;
            let v1 = v0 + h;
            integral +=
                0.5 * h * (maxwell_pdf(v0, 1.0, 1.0, 1.0) + maxwell_pdf(v1, 1.0, 1.0, 1.0));
        }
        assert!((integral - 1.0).abs() < 1e-6, "integral = {integral}");
    }

    #[test]
    fn pdf_peaks_at_most_probable_speed() {
        let vp = most_probable_speed(1.0, 1.0, 1.0);
        let at_peak = maxwell_pdf(vp, 1.0, 1.0, 1.0);
        assert!(at_peak > maxwell_pdf(vp - 0.05, 1.0, 1.0, 1.0));
        assert!(at_peak > maxwell_pdf(vp + 0.05, 1.0, 1.0, 1.0));
    }

    #[test]
    fn theory_coefficients_reproduce_the_pdf() {
        let (a, b) = theory_coefficients(1.0, 1.0, 1.0);
        for &v in &[0.3, 1.0, 2.4] {
            let generic = a * v * v * (-b * v * v).exp();
            let pdf = maxwell_pdf(v, 1.0, 1.0, 1.0);
            assert!((generic - pdf).abs() < 1e-14 * pdf.max(1.0));
        }
    }

    #[test]
    fn reference_speeds_in_reduced_units() {
        assert!((v_rms(1.0, 1.0, 1.0) - 3.0_f64.sqrt()).abs() < 1e-15);
        assert!((most_probable_speed(1.0, 1.0, 1.0) - 2.0_f64.sqrt()).abs() < 1e-15);
    }
}
