//! Phase-field representations.
//!
//! A [`PhaseField`] maps a batch of coordinates `[N, 3]` to the field value
//! and, on request, its spatial gradient and Hessian. Everything stays a Burn
//! tensor, so when the backend is an autodiff backend the derivatives remain
//! differentiable with respect to the field's parameters.
//!
//! - [`PhaseFieldNet`]: the trainable MLP with forward-mode derivatives
//! - [`SphereProfile`]: the analytic tanh sphere
//! - [`ParameterSet`]: flat snapshot of network parameters for checkpoints

mod network;
mod parameters;
mod sphere;

pub use network::PhaseFieldNet;
pub use parameters::{ParamTensor, ParameterSet};
pub use sphere::SphereProfile;

use burn::prelude::*;

use crate::error::{Result, VesicleError};

/// Columns of the packed Hessian: diagonal first, then the upper triangle.
pub const HESSIAN_PAIRS: [(usize, usize); 6] = [(0, 0), (1, 1), (2, 2), (0, 1), (0, 2), (1, 2)];

/// How many derivatives to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DerivativeOrder {
    /// Field value only.
    Value,
    /// Value and gradient.
    Gradient,
    /// Value, gradient and Hessian.
    Hessian,
}

/// Field value and derivatives over a batch of points.
#[derive(Debug, Clone)]
pub struct FieldSamples<B: Backend> {
    /// `phi`, shape `[N, 1]`.
    pub value: Tensor<B, 2>,
    /// `∇phi`, shape `[N, 3]`.
    pub gradient: Option<Tensor<B, 2>>,
    /// Hessian packed as `xx, yy, zz, xy, xz, yz`, shape `[N, 6]`.
    pub hessian: Option<Tensor<B, 2>>,
}

impl<B: Backend> FieldSamples<B> {
    /// Number of points.
    pub fn len(&self) -> usize {
        self.value.dims()[0]
    }

    /// True if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `|∇phi|²`, shape `[N, 1]`.
    pub fn gradient_norm_sq(&self) -> Option<Tensor<B, 2>> {
        self.gradient
            .as_ref()
            .map(|g| (g.clone() * g.clone()).sum_dim(1))
    }

    /// `∆phi`, shape `[N, 1]`: the trace of the Hessian.
    pub fn laplacian(&self) -> Option<Tensor<B, 2>> {
        self.hessian.as_ref().map(|h| {
            let n = h.dims()[0];
            h.clone().slice([0..n, 0..3]).sum_dim(1)
        })
    }
}

/// A scalar field over 3D space with spatial derivatives.
pub trait PhaseField<B: Backend> {
    /// Expected number of coordinate columns.
    fn input_dim(&self) -> usize;

    /// Evaluate the field at `coords` (`[N, input_dim]`).
    fn evaluate(&self, coords: Tensor<B, 2>, order: DerivativeOrder) -> Result<FieldSamples<B>>;
}

/// Fail with [`VesicleError::ShapeMismatch`] unless `coords` is `[N, input_dim]`.
pub fn check_coords<B: Backend>(coords: &Tensor<B, 2>, input_dim: usize) -> Result<()> {
    let [n, d] = coords.dims();
    if d != input_dim {
        return Err(VesicleError::ShapeMismatch {
            expected: vec![n, input_dim],
            got: vec![n, d],
        });
    }
    Ok(())
}

/// Read a tensor back as `f32` values.
pub fn to_f32_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| VesicleError::TensorData {
            message: format!("{:?}", e),
        })
}

/// Read a single-element tensor back as `f32`.
pub fn to_f32_scalar<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<f32> {
    to_f32_vec(tensor)?
        .first()
        .copied()
        .ok_or_else(|| VesicleError::TensorData {
            message: "empty tensor".to_string(),
        })
}

/// `[N, 3]` coordinate tensor from row-major values.
pub fn coords_tensor<B: Backend>(flat: Vec<f32>, device: &B::Device) -> Result<Tensor<B, 2>> {
    if flat.len() % 3 != 0 {
        return Err(VesicleError::ShapeMismatch {
            expected: vec![flat.len() / 3, 3],
            got: vec![flat.len()],
        });
    }
    let n = flat.len() / 3;
    Ok(Tensor::from_data(TensorData::new(flat, [n, 3]), device))
}
