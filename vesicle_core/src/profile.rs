//! Analytic tanh profile of a spherical vesicle.
//!
//! `phi(r) = tanh((R - |r - c|) / (sqrt(2) eps))` is the equilibrium
//! interface profile in the direction normal to the membrane. It is the
//! initial shape of every relaxation run and a closed-form reference for the
//! network derivatives.

use core::f32::consts::SQRT_2;

use crate::types::Point3;

/// Radii below this are clamped; the profile is smooth at the center anyway
/// but `1/r` terms are not.
const MIN_RADIUS: f32 = 1e-6;

/// Value, gradient and Laplacian of a profile at one point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProfileSample {
    /// `phi`.
    pub value: f32,
    /// `∇phi`.
    pub gradient: Point3,
    /// `∆phi`.
    pub laplacian: f32,
}

/// Evaluate the sphere profile of radius `radius` centered at `center`.
pub fn sphere_profile(p: Point3, center: Point3, radius: f32, epsilon: f32) -> ProfileSample {
    let offset = p - center;
    let r = libm::fmaxf(offset.length(), MIN_RADIUS);
    let phi = libm::tanhf((radius - r) / (SQRT_2 * epsilon));

    let well = 1.0 - phi * phi;
    let d1 = -well / (SQRT_2 * epsilon);
    let d2 = -phi * well / (epsilon * epsilon);

    ProfileSample {
        value: phi,
        gradient: offset * (d1 / r),
        // radial Laplacian: phi'' + 2 phi' / r
        laplacian: d2 + 2.0 * d1 / r,
    }
}

/// Radial first and second derivative of the profile at distance `r`.
pub fn radial_derivatives(r: f32, radius: f32, epsilon: f32) -> (f32, f32, f32) {
    let phi = libm::tanhf((radius - r) / (SQRT_2 * epsilon));
    let well = 1.0 - phi * phi;
    (
        phi,
        -well / (SQRT_2 * epsilon),
        -phi * well / (epsilon * epsilon),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::{surface_density, volume_density, PhaseFieldParams};
    use crate::quadrature::monte_carlo_integral;
    use crate::sampling::lattice;
    use crate::types::Domain;
    use alloc::vec::Vec;
    use core::f32::consts::PI;

    #[test]
    fn test_profile_signs() {
        let s = sphere_profile(Point3::ORIGIN, Point3::ORIGIN, 1.0, 0.1);
        assert!(s.value > 0.99);

        let s = sphere_profile(Point3::new(3.0, 0.0, 0.0), Point3::ORIGIN, 1.0, 0.1);
        assert!(s.value < -0.99);

        let s = sphere_profile(Point3::new(0.0, 1.0, 0.0), Point3::ORIGIN, 1.0, 0.1);
        assert!(s.value.abs() < 1e-6);
        // gradient points inward
        assert!(s.gradient.y < 0.0);
        assert!(s.gradient.x.abs() < 1e-6);
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let c = Point3::new(0.1, -0.2, 0.05);
        let p = Point3::new(0.6, 0.4, -0.3);
        let (radius, eps) = (1.0, 0.3);
        let h = 1e-3;
        let s = sphere_profile(p, c, radius, eps);

        for axis in 0..3 {
            let mut dp = [0.0f32; 3];
            dp[axis] = h;
            let dp = Point3::from(dp);
            let fd = (sphere_profile(p + dp, c, radius, eps).value
                - sphere_profile(p - dp, c, radius, eps).value)
                / (2.0 * h);
            assert!(
                (fd - s.gradient.axis(axis)).abs() < 1e-2,
                "axis {}: fd {} vs {}",
                axis,
                fd,
                s.gradient.axis(axis)
            );
        }
    }

    #[test]
    fn test_sphere_integrals() {
        // Thin interface and a fine lattice: the diffuse-interface bias of the
        // volume grows like eps² / R².
        let params = PhaseFieldParams::new(0.1, 0.0);
        let domain = Domain::cube(-3.0, 3.0);
        let radius = 1.5f32;
        let points = lattice(&domain, 100);

        let (area, volume): (Vec<f32>, Vec<f32>) = points
            .iter()
            .map(|p| {
                let s = sphere_profile(p.position, Point3::ORIGIN, radius, params.epsilon);
                (
                    surface_density(s.value, s.gradient.length_squared(), &params),
                    volume_density(s.value),
                )
            })
            .unzip();

        let area = monte_carlo_integral(&area, domain.volume());
        let volume = monte_carlo_integral(&volume, domain.volume());
        let exact_area = 4.0 * PI * radius * radius;
        let exact_volume = 4.0 / 3.0 * PI * radius * radius * radius;
        assert!((area - exact_area).abs() / exact_area < 0.05, "area {}", area);
        assert!(
            (volume - exact_volume).abs() / exact_volume < 0.05,
            "volume {}",
            volume
        );
    }

    #[test]
    fn test_radial_derivatives_agree() {
        let (phi, d1, d2) = radial_derivatives(1.1, 1.0, 0.2);
        let s = sphere_profile(Point3::new(1.1, 0.0, 0.0), Point3::ORIGIN, 1.0, 0.2);
        assert!((phi - s.value).abs() < 1e-6);
        assert!((d1 - s.gradient.x).abs() < 1e-5);
        assert!((d2 + 2.0 * d1 / 1.1 - s.laplacian).abs() < 1e-4);
    }
}
