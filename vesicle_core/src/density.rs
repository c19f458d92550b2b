//! Phase-field energy densities.
//!
//! With `phi = tanh(d / (sqrt(2) eps))` for a signed distance `d`, the
//! surface density integrates to the membrane area and the bending density
//! to the Helfrich bending energy as `eps -> 0`:
//!
//! ```text
//! w(r) = 3 / (8 sqrt2 eps) * (eps ∆phi + (phi / eps + c0 sqrt2) (1 - phi²))²
//! a(r) = 3 / (4 sqrt2)     * (eps |∇phi|² + (1 - phi²)² / (2 eps))
//! v(r) = (1 + phi) / 2
//! ```

use core::f32::consts::{PI, SQRT_2};

use crate::error::VesicleCoreError;

/// Material parameters of the phase-field model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseFieldParams {
    /// Interface thickness `eps`.
    pub epsilon: f32,
    /// Spontaneous curvature `c0`.
    pub spontaneous_curvature: f32,
}

impl PhaseFieldParams {
    /// Create parameters.
    #[inline]
    pub const fn new(epsilon: f32, spontaneous_curvature: f32) -> Self {
        Self {
            epsilon,
            spontaneous_curvature,
        }
    }

    /// Check that `eps` is positive and `c0` finite.
    pub fn validate(&self) -> Result<(), VesicleCoreError> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(VesicleCoreError::InvalidParameter {
                name: "epsilon",
                value: self.epsilon,
            });
        }
        if !self.spontaneous_curvature.is_finite() {
            return Err(VesicleCoreError::InvalidParameter {
                name: "spontaneous_curvature",
                value: self.spontaneous_curvature,
            });
        }
        Ok(())
    }
}

impl Default for PhaseFieldParams {
    fn default() -> Self {
        Self::new(0.25, 0.0)
    }
}

/// Bending energy density from the field value and its Laplacian.
#[inline]
pub fn bending_energy_density(phi: f32, laplacian: f32, params: &PhaseFieldParams) -> f32 {
    let eps = params.epsilon;
    let inner = eps * laplacian
        + (phi / eps + params.spontaneous_curvature * SQRT_2) * (1.0 - phi * phi);
    3.0 / (8.0 * SQRT_2 * eps) * inner * inner
}

/// Surface density from the field value and the squared gradient norm.
#[inline]
pub fn surface_density(phi: f32, grad_norm_sq: f32, params: &PhaseFieldParams) -> f32 {
    let eps = params.epsilon;
    let well = 1.0 - phi * phi;
    3.0 / (4.0 * SQRT_2) * (eps * grad_norm_sq + well * well / (2.0 * eps))
}

/// Smoothed inside indicator.
#[inline]
pub fn volume_density(phi: f32) -> f32 {
    0.5 * (1.0 + phi)
}

/// Reduced volume `V / (4π/3 (A/4π)^{3/2})`; `1` for a sphere.
///
/// Returns `NaN` for a non-positive area.
#[inline]
pub fn reduced_volume(area: f32, volume: f32) -> f32 {
    if area <= 0.0 {
        return f32::NAN;
    }
    let equivalent_radius = libm::sqrtf(area / (4.0 * PI));
    volume / (4.0 * PI / 3.0 * equivalent_radius * equivalent_radius * equivalent_radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> PhaseFieldParams {
        PhaseFieldParams::new(0.2, 0.0)
    }

    #[test]
    fn test_bulk_phases_have_no_energy() {
        let p = params();
        for phi in [-1.0f32, 1.0] {
            assert!(bending_energy_density(phi, 0.0, &p).abs() < 1e-12);
            assert!(surface_density(phi, 0.0, &p).abs() < 1e-12);
        }
        assert_eq!(volume_density(1.0), 1.0);
        assert_eq!(volume_density(-1.0), 0.0);
    }

    #[test]
    fn test_flat_interface_has_no_bending() {
        // 1D tanh profile: eps * phi'' + phi (1 - phi²) / eps = 0 exactly.
        let p = params();
        let eps = p.epsilon;
        for i in 0..21 {
            let x = -1.0 + 0.1 * i as f32;
            let phi = libm::tanhf(x / (SQRT_2 * eps));
            let laplacian = -phi * (1.0 - phi * phi) / (eps * eps);
            assert!(
                bending_energy_density(phi, laplacian, &p) < 1e-6,
                "non-zero bending at x = {}",
                x
            );
        }
    }

    #[test]
    fn test_flat_interface_surface_density_integrates_to_one() {
        let p = params();
        let eps = p.epsilon;
        let n = 4000;
        let (lo, hi) = (-3.0f32, 3.0f32);
        let dx = (hi - lo) / n as f32;
        let mut total = 0.0;
        for i in 0..n {
            let x = lo + (i as f32 + 0.5) * dx;
            let phi = libm::tanhf(x / (SQRT_2 * eps));
            let dphi = (1.0 - phi * phi) / (SQRT_2 * eps);
            total += surface_density(phi, dphi * dphi, &p) * dx;
        }
        assert!((total - 1.0).abs() < 1e-3, "area per unit surface = {}", total);
    }

    #[test]
    fn test_spontaneous_curvature_shifts_bending() {
        let curved = PhaseFieldParams::new(0.2, 1.0);
        assert!(bending_energy_density(0.0, 0.0, &curved) > 0.0);
        assert!(bending_energy_density(0.0, 0.0, &params()).abs() < 1e-12);
    }

    #[test]
    fn test_reduced_volume_of_sphere() {
        let r = 1.7f32;
        let area = 4.0 * PI * r * r;
        let volume = 4.0 / 3.0 * PI * r * r * r;
        assert!((reduced_volume(area, volume) - 1.0).abs() < 1e-5);
        assert!(reduced_volume(0.0, 1.0).is_nan());
    }

    #[test]
    fn test_params_validation() {
        assert!(PhaseFieldParams::default().validate().is_ok());
        assert!(PhaseFieldParams::new(0.0, 0.0).validate().is_err());
        assert!(PhaseFieldParams::new(0.1, f32::NAN).validate().is_err());
    }
}
