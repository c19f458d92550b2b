//! Behavioral tests for vesicle_core.
//!
//! # Test Categories
//!
//! 1. **Density Invariants** - bulk phases, sign, flat interfaces
//! 2. **Quadrature** - integrals of known shapes
//! 3. **Sampler Contract** - coverage, restartability, tagging
//! 4. **Constraint Bookkeeping** - targets, measurements, deviations

use core::f32::consts::PI;

use proptest::prelude::*;
use vesicle_core::prelude::*;
use vesicle_core::sampling::lattice;

// =============================================================================
// Helpers
// =============================================================================

fn measure_sphere(
    domain: &Domain,
    n: usize,
    center: Point3,
    radius: f32,
    params: &PhaseFieldParams,
) -> Measurements {
    let points = lattice(domain, n);
    let positions: Vec<Point3> = points.iter().map(|p| p.position).collect();

    let mut bending = Vec::with_capacity(points.len());
    let mut area = Vec::with_capacity(points.len());
    let mut volume = Vec::with_capacity(points.len());
    for p in &positions {
        let s = sphere_profile(*p, center, radius, params.epsilon);
        bending.push(bending_energy_density(s.value, s.laplacian, params));
        area.push(surface_density(s.value, s.gradient.length_squared(), params));
        volume.push(volume_density(s.value));
    }

    let v = domain.volume();
    Measurements {
        bending_energy: monte_carlo_integral(&bending, v),
        area: monte_carlo_integral(&area, v),
        volume: monte_carlo_integral(&volume, v),
        center_of_mass: weighted_centroid(&volume, &positions)
            .unwrap()
            .unwrap_or(Point3::ORIGIN),
    }
}

// =============================================================================
// 1. Density Invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every density is non-negative, and the volume density stays in [0, 1].
    #[test]
    fn densities_are_non_negative(
        phi in -1.0f32..=1.0,
        laplacian in -50.0f32..50.0,
        grad_norm_sq in 0.0f32..100.0,
        epsilon in 0.05f32..1.0,
        c0 in -2.0f32..2.0,
    ) {
        let params = PhaseFieldParams::new(epsilon, c0);
        prop_assert!(bending_energy_density(phi, laplacian, &params) >= 0.0);
        prop_assert!(surface_density(phi, grad_norm_sq, &params) >= 0.0);
        prop_assert!((0.0..=1.0).contains(&volume_density(phi)));
    }

    /// A weighted centroid lies inside the bounding box of its points.
    #[test]
    fn centroid_lies_in_bounding_box(
        coords in prop::collection::vec((-3.0f32..3.0, -3.0f32..3.0, -3.0f32..3.0), 1..50),
        seed_weight in 0.01f32..1.0,
    ) {
        let points: Vec<Point3> = coords.iter().map(|&(x, y, z)| Point3::new(x, y, z)).collect();
        let weights: Vec<f32> = (0..points.len()).map(|i| seed_weight + i as f32 * 0.1).collect();
        let c = weighted_centroid(&weights, &points).unwrap().unwrap();
        for axis in 0..3 {
            let lo = points.iter().map(|p| p.axis(axis)).fold(f32::INFINITY, f32::min);
            let hi = points.iter().map(|p| p.axis(axis)).fold(f32::NEG_INFINITY, f32::max);
            prop_assert!(c.axis(axis) >= lo - 1e-4 && c.axis(axis) <= hi + 1e-4);
        }
    }
}

// =============================================================================
// 2. Quadrature
// =============================================================================

#[test]
fn sphere_bending_energy_is_scale_invariant() {
    // With this normalization a sphere with c0 = 0 carries 4π at any radius.
    let params = PhaseFieldParams::new(0.1, 0.0);
    let m = measure_sphere(&Domain::cube(-3.0, 3.0), 100, Point3::ORIGIN, 1.5, &params);
    let expected = 4.0 * PI;
    assert!(
        (m.bending_energy - expected).abs() / expected < 0.2,
        "bending energy {}",
        m.bending_energy
    );
}

#[test]
fn shifted_sphere_centroid_follows_center() {
    let params = PhaseFieldParams::new(0.1, 0.0);
    let center = Point3::new(0.5, -0.25, 0.0);
    let m = measure_sphere(&Domain::cube(-3.0, 3.0), 80, center, 1.0, &params);
    assert!(
        m.center_of_mass.distance_squared(center) < 1e-3,
        "centroid {:?}",
        m.center_of_mass
    );
    assert!((m.reduced_volume() - 1.0).abs() < 0.15);
}

// =============================================================================
// 3. Sampler Contract
// =============================================================================

#[test]
fn fixed_sampler_covers_the_box() {
    let domain = Domain::new(Point3::new(-1.0, 0.0, 2.0), Point3::new(1.0, 4.0, 3.0));
    let mut sampler = CollocationSampler::new(SamplerSettings::new(domain, 6)).unwrap();
    let batch = sampler.next_batch();

    assert_eq!(batch.len(), 216);
    for axis in 0..3 {
        let lo = batch
            .points
            .iter()
            .map(|p| p.position.axis(axis))
            .fold(f32::INFINITY, f32::min);
        let hi = batch
            .points
            .iter()
            .map(|p| p.position.axis(axis))
            .fold(f32::NEG_INFINITY, f32::max);
        assert_eq!(lo, domain.min.axis(axis));
        assert_eq!(hi, domain.max.axis(axis));
    }
    for p in &batch.points {
        assert_eq!(p.tag == PointTag::Boundary, domain.is_on_boundary(p.position));
    }
}

#[test]
fn sampler_is_an_endless_iterator() {
    let settings = SamplerSettings::new(Domain::default(), 2).with_mode(SamplingMode::Resampled);
    let sampler = CollocationSampler::new(settings).unwrap();
    let steps: Vec<u64> = sampler.take(5).map(|b| b.step).collect();
    assert_eq!(steps, vec![0, 1, 2, 3, 4]);
}

#[test]
fn different_seeds_give_different_batches() {
    let base = SamplerSettings::new(Domain::default(), 3).with_mode(SamplingMode::Resampled);
    let a = CollocationSampler::new(base.with_seed(1)).unwrap().next_batch();
    let b = CollocationSampler::new(base.with_seed(2)).unwrap().next_batch();
    assert_ne!(a.points, b.points);
}

// =============================================================================
// 4. Constraint Bookkeeping
// =============================================================================

#[test]
fn constraint_set_tracks_sphere_measurements() {
    let params = PhaseFieldParams::new(0.15, 0.0);
    let m = measure_sphere(&Domain::cube(-3.0, 3.0), 40, Point3::ORIGIN, 1.0, &params);

    let mut set = ConstraintSet::new()
        .with(Constraint::area(m.area))
        .with(Constraint::volume(0.9 * m.volume));
    set.update_current(&m);

    let area = set.get(ConstraintKind::SurfaceArea).unwrap();
    assert_eq!(area.deviation_squared(), Some(0.0));

    let volume = set.get(ConstraintKind::Volume).unwrap();
    let rel = volume.relative_deviation().unwrap();
    assert!((rel - 1.0 / 9.0).abs() < 1e-4, "relative deviation {}", rel);
}
