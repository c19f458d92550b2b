//! Constrained energy functional.
//!
//! Integrals are Monte-Carlo estimates over uniformly distributed collocation
//! points: `∫ f dV ≈ mean(f) * |Ω|`. The loss is
//!
//! ```text
//! L = E_b + w_A (A - A₀)² + w_V (V - V₀)² + w_c |c - c₀|²
//! ```
//!
//! A penalty whose weight is zero, or whose constraint has no target, is not
//! part of the graph at all.

use burn::prelude::*;
use vesicle_core::{
    reduced_volume, ConstraintKind, ConstraintSet, ConstraintValue, Domain, Measurements,
    PhaseFieldParams, Point3,
};

use super::densities::{bending_energy_density, surface_density, volume_density};
use crate::config::EnergyConfig;
use crate::error::{Result, VesicleError};
use crate::field::{to_f32_scalar, to_f32_vec, FieldSamples};

/// Floor of the centroid denominator `Σ rho`.
const MIN_MASS: f32 = 1e-12;

/// Loss contributions of one evaluation, read back as scalars.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LossComponents {
    /// `E_b`.
    pub bending_energy: f32,
    /// Weighted area penalty, 0 when inactive.
    pub area_penalty: f32,
    /// Weighted volume penalty, 0 when inactive.
    pub volume_penalty: f32,
    /// Weighted center-of-mass penalty, 0 when inactive.
    pub center_of_mass_penalty: f32,
}

impl LossComponents {
    /// Sum of all components.
    pub fn total(&self) -> f32 {
        self.bending_energy + self.area_penalty + self.volume_penalty + self.center_of_mass_penalty
    }

    /// True if every component is finite.
    pub fn is_finite(&self) -> bool {
        self.total().is_finite()
    }
}

/// Differentiable terms of one evaluation.
#[derive(Debug, Clone)]
pub struct EnergyTerms<B: Backend> {
    /// Loss to back-propagate, shape `[1]`.
    pub total: Tensor<B, 1>,
    /// Bending energy estimate.
    pub bending: Tensor<B, 1>,
    /// Area estimate.
    pub area: Tensor<B, 1>,
    /// Volume estimate.
    pub volume: Tensor<B, 1>,
    /// Centroid estimate, shape `[1, 3]`.
    pub center_of_mass: Tensor<B, 2>,
    /// Weighted area penalty, if active.
    pub area_penalty: Option<Tensor<B, 1>>,
    /// Weighted volume penalty, if active.
    pub volume_penalty: Option<Tensor<B, 1>>,
    /// Weighted center-of-mass penalty, if active.
    pub center_of_mass_penalty: Option<Tensor<B, 1>>,
}

/// Scalar snapshot of [`EnergyTerms`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergySummary {
    /// Total loss.
    pub total: f32,
    /// Per-term breakdown.
    pub components: LossComponents,
    /// Measured integrals.
    pub measurements: Measurements,
}

impl EnergySummary {
    /// Reduced volume of the measured shape.
    pub fn reduced_volume(&self) -> f32 {
        reduced_volume(self.measurements.area, self.measurements.volume)
    }
}

impl<B: Backend> EnergyTerms<B> {
    /// Read every term back to the host.
    pub fn summary(&self) -> Result<EnergySummary> {
        let optional = |t: &Option<Tensor<B, 1>>| match t {
            Some(t) => to_f32_scalar(t.clone()),
            None => Ok(0.0),
        };

        let bending_energy = to_f32_scalar(self.bending.clone())?;
        let com = to_f32_vec(self.center_of_mass.clone())?;
        let center_of_mass = match com.as_slice() {
            [x, y, z] => Point3::new(*x, *y, *z),
            _ => {
                return Err(VesicleError::ShapeMismatch {
                    expected: vec![1, 3],
                    got: self.center_of_mass.dims().to_vec(),
                })
            }
        };

        Ok(EnergySummary {
            total: to_f32_scalar(self.total.clone())?,
            components: LossComponents {
                bending_energy,
                area_penalty: optional(&self.area_penalty)?,
                volume_penalty: optional(&self.volume_penalty)?,
                center_of_mass_penalty: optional(&self.center_of_mass_penalty)?,
            },
            measurements: Measurements {
                bending_energy,
                area: to_f32_scalar(self.area.clone())?,
                volume: to_f32_scalar(self.volume.clone())?,
                center_of_mass,
            },
        })
    }
}

/// Bending energy plus weighted constraint penalties.
#[derive(Debug, Clone)]
pub struct EnergyFunctional {
    config: EnergyConfig,
    params: PhaseFieldParams,
    constraints: ConstraintSet,
    domain: Domain,
}

impl EnergyFunctional {
    /// Create a functional over `domain` with the given targets.
    pub fn new(config: EnergyConfig, constraints: ConstraintSet, domain: Domain) -> Result<Self> {
        config.validate().map_err(VesicleError::config)?;
        domain.validate()?;
        Ok(Self {
            params: config.params(),
            config,
            constraints,
            domain,
        })
    }

    /// Energy configuration.
    pub fn config(&self) -> &EnergyConfig {
        &self.config
    }

    /// Active constraints, with the last measured values.
    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Replace the constraint targets.
    pub fn set_constraints(&mut self, constraints: ConstraintSet) {
        self.constraints = constraints;
    }

    /// Integration domain.
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Penalty weight of a constraint kind.
    pub fn weight(&self, kind: ConstraintKind) -> f32 {
        match kind {
            ConstraintKind::SurfaceArea => self.config.area_weight,
            ConstraintKind::Volume => self.config.volume_weight,
            ConstraintKind::CenterOfMass => self.config.center_of_mass_weight,
        }
    }

    /// Target of `kind` if its penalty contributes to the loss.
    fn active_target(&self, kind: ConstraintKind) -> Option<(f32, ConstraintValue)> {
        let w = self.weight(kind);
        if w == 0.0 {
            return None;
        }
        self.constraints.target(kind).map(|t| (w, t))
    }

    /// True if the penalty of `kind` contributes to the loss.
    pub fn is_active(&self, kind: ConstraintKind) -> bool {
        self.active_target(kind).is_some()
    }

    /// Record measured values on the constraint set.
    pub fn observe(&mut self, measurements: &Measurements) {
        self.constraints.update_current(measurements);
    }

    /// Evaluate the loss for Hessian-order samples at `coords` (`[N, 3]`).
    pub fn compute<B: Backend>(
        &self,
        samples: &FieldSamples<B>,
        coords: Tensor<B, 2>,
    ) -> Result<EnergyTerms<B>> {
        let [n, d] = coords.dims();
        if n != samples.len() || d != 3 {
            return Err(VesicleError::ShapeMismatch {
                expected: vec![samples.len(), 3],
                got: vec![n, d],
            });
        }
        let grad_norm_sq = samples
            .gradient_norm_sq()
            .ok_or_else(|| VesicleError::config("energy needs field gradients"))?;
        let laplacian = samples
            .laplacian()
            .ok_or_else(|| VesicleError::config("energy needs field Hessians"))?;

        let volume_factor = self.domain.volume();
        let phi = samples.value.clone();

        let bending = bending_energy_density(phi.clone(), laplacian, &self.params)
            .mean()
            .mul_scalar(volume_factor);
        let area = surface_density(phi.clone(), grad_norm_sq, &self.params)
            .mean()
            .mul_scalar(volume_factor);

        let rho = volume_density(phi);
        let volume = rho.clone().mean().mul_scalar(volume_factor);
        let mass = rho.clone().sum_dim(0).clamp_min(MIN_MASS);
        let center_of_mass = (rho * coords).sum_dim(0) / mass;

        let scalar_penalty = |kind: ConstraintKind, estimate: &Tensor<B, 1>| {
            self.active_target(kind).and_then(|(w, target)| {
                target.as_scalar().map(|t| {
                    let diff = estimate.clone().sub_scalar(t);
                    (diff.clone() * diff).mul_scalar(w)
                })
            })
        };
        let area_penalty = scalar_penalty(ConstraintKind::SurfaceArea, &area);
        let volume_penalty = scalar_penalty(ConstraintKind::Volume, &volume);

        let center_of_mass_penalty = self
            .active_target(ConstraintKind::CenterOfMass)
            .and_then(|(w, target)| target.as_vector().map(|t| (w, t)))
            .map(|(w, t)| {
                let target = Tensor::<B, 2>::from_data(
                    TensorData::new(t.as_array().to_vec(), [1, 3]),
                    &center_of_mass.device(),
                );
                let diff = center_of_mass.clone() - target;
                (diff.clone() * diff).sum().mul_scalar(w)
            });

        let mut total = bending.clone();
        for penalty in [&area_penalty, &volume_penalty, &center_of_mass_penalty]
            .into_iter()
            .flatten()
        {
            total = total + penalty.clone();
        }

        Ok(EnergyTerms {
            total,
            bending,
            area,
            volume,
            center_of_mass,
            area_penalty,
            volume_penalty,
            center_of_mass_penalty,
        })
    }
}
