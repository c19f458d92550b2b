//! Collocation sampling over the domain box.
//!
//! [`CollocationSampler`] is an endless, restartable source of point batches:
//!
//! - [`SamplingMode::Fixed`]: the same evenly spaced `n³` lattice every step.
//! - [`SamplingMode::Resampled`]: `n³` fresh uniform points every step.
//! - [`SamplingMode::LatticeResampled`]: `n³` points whose coordinates are
//!   drawn independently from the lattice values of each axis.
//!
//! Random modes are driven by a seeded [`StdRng`], and [`CollocationSampler::reset`]
//! rewinds to the seed, so a run is reproducible from its settings alone.

use alloc::vec::Vec;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::VesicleCoreError;
use crate::types::{CollocationPoint, Domain, Point3, PointTag};

/// Minimum points per axis: one interior cell needs two lattice nodes.
pub const MIN_POINTS_PER_AXIS: usize = 2;

/// How each step's collocation points are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SamplingMode {
    /// Evenly spaced lattice, identical every step.
    #[default]
    Fixed,
    /// Uniform random points, redrawn every step.
    Resampled,
    /// Random lattice nodes, redrawn every step.
    LatticeResampled,
}

/// Sampler configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerSettings {
    /// Box to sample.
    pub domain: Domain,
    /// Lattice nodes per axis; every batch has `points_per_axis³` points.
    pub points_per_axis: usize,
    /// Sampling mode.
    pub mode: SamplingMode,
    /// RNG seed for the random modes.
    pub seed: u64,
}

impl SamplerSettings {
    /// Fixed-lattice settings with seed 42.
    pub fn new(domain: Domain, points_per_axis: usize) -> Self {
        Self {
            domain,
            points_per_axis,
            mode: SamplingMode::Fixed,
            seed: 42,
        }
    }

    /// Set the sampling mode.
    pub fn with_mode(mut self, mode: SamplingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Points in one batch.
    pub fn batch_size(&self) -> usize {
        self.points_per_axis * self.points_per_axis * self.points_per_axis
    }

    /// Check the domain and the lattice size.
    pub fn validate(&self) -> Result<(), VesicleCoreError> {
        self.domain.validate()?;
        if self.points_per_axis < MIN_POINTS_PER_AXIS {
            return Err(VesicleCoreError::TooFewPoints {
                points_per_axis: self.points_per_axis,
                min: MIN_POINTS_PER_AXIS,
            });
        }
        Ok(())
    }
}

/// One step's worth of collocation points.
#[derive(Debug, Clone, PartialEq)]
pub struct CollocationBatch {
    /// Points of the batch.
    pub points: Vec<CollocationPoint>,
    /// Index of the batch in the sampler's sequence.
    pub step: u64,
}

impl CollocationBatch {
    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the batch holds no point.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Row-major `[N, 3]` coordinates, ready for a tensor.
    pub fn flat_coords(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.points.len() * 3);
        for p in &self.points {
            out.extend_from_slice(&p.position.as_array());
        }
        out
    }

    /// Positions only.
    pub fn positions(&self) -> Vec<Point3> {
        self.points.iter().map(|p| p.position).collect()
    }

    /// Number of points on a face of the domain.
    pub fn boundary_count(&self) -> usize {
        self.points
            .iter()
            .filter(|p| p.tag == PointTag::Boundary)
            .count()
    }
}

/// `n` evenly spaced values from `lo` to `hi`, both included.
pub fn linspace(lo: f32, hi: f32, n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => alloc::vec![lo],
        _ => {
            let step = (hi - lo) / (n - 1) as f32;
            (0..n)
                .map(|i| if i == n - 1 { hi } else { lo + step * i as f32 })
                .collect()
        }
    }
}

/// Evenly spaced lattice over the domain, x slowest and z fastest.
pub fn lattice(domain: &Domain, points_per_axis: usize) -> Vec<CollocationPoint> {
    let xs = linspace(domain.min.x, domain.max.x, points_per_axis);
    let ys = linspace(domain.min.y, domain.max.y, points_per_axis);
    let zs = linspace(domain.min.z, domain.max.z, points_per_axis);

    let mut points = Vec::with_capacity(xs.len() * ys.len() * zs.len());
    for &x in &xs {
        for &y in &ys {
            for &z in &zs {
                points.push(CollocationPoint::in_domain(Point3::new(x, y, z), domain));
            }
        }
    }
    points
}

/// Seeded, restartable collocation sampler.
#[derive(Debug, Clone)]
pub struct CollocationSampler {
    settings: SamplerSettings,
    rng: StdRng,
    step: u64,
    /// Lattice nodes per axis, cached for the lattice modes.
    axes: [Vec<f32>; 3],
    /// Full lattice, cached for the fixed mode.
    grid: Vec<CollocationPoint>,
}

impl CollocationSampler {
    /// Create a sampler, validating the settings.
    pub fn new(settings: SamplerSettings) -> Result<Self, VesicleCoreError> {
        settings.validate()?;

        let d = settings.domain;
        let n = settings.points_per_axis;
        let axes = [
            linspace(d.min.x, d.max.x, n),
            linspace(d.min.y, d.max.y, n),
            linspace(d.min.z, d.max.z, n),
        ];
        let grid = match settings.mode {
            SamplingMode::Fixed => lattice(&d, n),
            _ => Vec::new(),
        };

        Ok(Self {
            settings,
            rng: StdRng::seed_from_u64(settings.seed),
            step: 0,
            axes,
            grid,
        })
    }

    /// Settings this sampler was built from.
    #[inline]
    pub fn settings(&self) -> &SamplerSettings {
        &self.settings
    }

    /// Index of the next batch.
    #[inline]
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Rewind to the first batch.
    pub fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.settings.seed);
        self.step = 0;
    }

    /// Produce the next batch.
    pub fn next_batch(&mut self) -> CollocationBatch {
        let points = match self.settings.mode {
            SamplingMode::Fixed => self.grid.clone(),
            SamplingMode::Resampled => self.uniform_points(),
            SamplingMode::LatticeResampled => self.lattice_points(),
        };
        let batch = CollocationBatch {
            points,
            step: self.step,
        };
        self.step += 1;
        batch
    }

    fn uniform_points(&mut self) -> Vec<CollocationPoint> {
        let d = self.settings.domain;
        (0..self.settings.batch_size())
            .map(|_| {
                let p = Point3::new(
                    self.rng.gen_range(d.min.x..d.max.x),
                    self.rng.gen_range(d.min.y..d.max.y),
                    self.rng.gen_range(d.min.z..d.max.z),
                );
                CollocationPoint::in_domain(p, &d)
            })
            .collect()
    }

    fn lattice_points(&mut self) -> Vec<CollocationPoint> {
        let d = self.settings.domain;
        let n = self.settings.points_per_axis;
        (0..self.settings.batch_size())
            .map(|_| {
                let p = Point3::new(
                    self.axes[0][self.rng.gen_range(0..n)],
                    self.axes[1][self.rng.gen_range(0..n)],
                    self.axes[2][self.rng.gen_range(0..n)],
                );
                CollocationPoint::in_domain(p, &d)
            })
            .collect()
    }
}

impl Iterator for CollocationSampler {
    type Item = CollocationBatch;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_batch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace_endpoints() {
        let v = linspace(-2.0, 2.0, 4);
        assert_eq!(v.len(), 4);
        assert_eq!(v[0], -2.0);
        assert_eq!(v[3], 2.0);
        assert!((v[1] + 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_lattice_ordering() {
        let domain = Domain::cube(-2.0, 2.0);
        let points = lattice(&domain, 4);
        assert_eq!(points.len(), 64);
        // z varies fastest, x slowest
        assert_eq!(points[0].position, Point3::new(-2.0, -2.0, -2.0));
        assert_eq!(points[3].position, Point3::new(-2.0, -2.0, 2.0));
        assert!((points[4].position.y - (-2.0 + 4.0 / 3.0)).abs() < 1e-6);
        assert_eq!(points[63].position, Point3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_fixed_mode_repeats() {
        let settings = SamplerSettings::new(Domain::cube(-1.0, 1.0), 5);
        let mut sampler = CollocationSampler::new(settings).unwrap();
        let a = sampler.next_batch();
        let b = sampler.next_batch();
        assert_eq!(a.points, b.points);
        assert_eq!((a.step, b.step), (0, 1));
        // 5³ - 3³ nodes lie on a face
        assert_eq!(a.boundary_count(), 125 - 27);
        assert_eq!(a.flat_coords().len(), 375);
    }

    #[test]
    fn test_resampled_mode_is_reproducible() {
        let settings = SamplerSettings::new(Domain::cube(-3.0, 3.0), 4)
            .with_mode(SamplingMode::Resampled)
            .with_seed(7);
        let mut sampler = CollocationSampler::new(settings).unwrap();
        let first = sampler.next_batch();
        let second = sampler.next_batch();
        assert_ne!(first.points, second.points);
        assert!(first.points.iter().all(|p| settings.domain.contains(p.position)));

        sampler.reset();
        assert_eq!(sampler.next_batch().points, first.points);

        let mut other = CollocationSampler::new(settings).unwrap();
        assert_eq!(other.next().unwrap().points, first.points);
    }

    #[test]
    fn test_lattice_resampled_stays_on_lattice() {
        let domain = Domain::cube(0.0, 1.0);
        let settings = SamplerSettings::new(domain, 3).with_mode(SamplingMode::LatticeResampled);
        let mut sampler = CollocationSampler::new(settings).unwrap();
        let batch = sampler.next_batch();
        assert_eq!(batch.len(), 27);
        for p in &batch.points {
            for v in p.position.as_array() {
                assert!(v == 0.0 || v == 0.5 || v == 1.0, "off-lattice value {}", v);
            }
        }
    }

    #[test]
    fn test_rejects_bad_settings() {
        let settings = SamplerSettings::new(Domain::cube(-1.0, 1.0), 1);
        assert_eq!(
            CollocationSampler::new(settings).unwrap_err(),
            VesicleCoreError::TooFewPoints {
                points_per_axis: 1,
                min: 2
            }
        );

        let settings = SamplerSettings::new(Domain::cube(1.0, -1.0), 4);
        assert!(CollocationSampler::new(settings).is_err());
    }
}
