//! Tanh sphere profile as a tensor field.

use core::f32::consts::SQRT_2;

use burn::prelude::*;
use vesicle_core::Point3;

use super::{check_coords, DerivativeOrder, FieldSamples, PhaseField, HESSIAN_PAIRS};
use crate::error::Result;

const MIN_RADIUS: f32 = 1e-6;

/// `phi(r) = tanh((R - |r - c|) / (sqrt(2) eps))`.
///
/// Used as the pretraining target and as a closed-form field in tests. The
/// Hessian is `phi'' n nᵀ + (phi' / r)(I - n nᵀ)` with `n` the unit radial
/// direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereProfile {
    /// Sphere center.
    pub center: Point3,
    /// Sphere radius.
    pub radius: f32,
    /// Interface thickness.
    pub epsilon: f32,
}

impl SphereProfile {
    /// Sphere of the given radius and interface thickness.
    pub fn new(center: Point3, radius: f32, epsilon: f32) -> Self {
        Self {
            center,
            radius,
            epsilon,
        }
    }

    /// Unit sphere at the origin.
    pub fn unit(epsilon: f32) -> Self {
        Self::new(Point3::ORIGIN, 1.0, epsilon)
    }
}

impl<B: Backend> PhaseField<B> for SphereProfile {
    fn input_dim(&self) -> usize {
        3
    }

    fn evaluate(&self, coords: Tensor<B, 2>, order: DerivativeOrder) -> Result<FieldSamples<B>> {
        check_coords(&coords, 3)?;
        let [n, _] = coords.dims();
        let device = coords.device();

        let center = Tensor::<B, 2>::from_data(
            TensorData::new(self.center.as_array().to_vec(), [1, 3]),
            &device,
        );
        let offset = coords - center;
        let r = (offset.clone() * offset.clone())
            .sum_dim(1)
            .sqrt()
            .clamp_min(MIN_RADIUS);

        let scale = SQRT_2 * self.epsilon;
        let phi = r.clone().neg().add_scalar(self.radius).div_scalar(scale).tanh();

        if order == DerivativeOrder::Value {
            return Ok(FieldSamples {
                value: phi,
                gradient: None,
                hessian: None,
            });
        }

        let well = (phi.clone() * phi.clone()).neg().add_scalar(1.0);
        let d1 = well.clone().div_scalar(-scale);
        let normal = offset / r.clone();
        let gradient = normal.clone() * d1.clone();

        let hessian = (order == DerivativeOrder::Hessian).then(|| {
            let d2 = (phi.clone() * well).div_scalar(-self.epsilon * self.epsilon);
            let tangential = d1 / r;
            let radial = d2 - tangential.clone();
            let columns = HESSIAN_PAIRS
                .iter()
                .map(|&(k, l)| {
                    let nk = normal.clone().slice([0..n, k..k + 1]);
                    let nl = normal.clone().slice([0..n, l..l + 1]);
                    let term = radial.clone() * nk * nl;
                    if k == l {
                        term + tangential.clone()
                    } else {
                        term
                    }
                })
                .collect();
            Tensor::cat(columns, 1)
        });

        Ok(FieldSamples {
            value: phi,
            gradient: Some(gradient),
            hessian,
        })
    }
}
