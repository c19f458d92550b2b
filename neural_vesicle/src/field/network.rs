//! MLP phase field with analytic spatial derivatives.
//!
//! Burn's autodiff is first order, so spatial derivatives are carried forward
//! through the network alongside the activations. For a linear layer
//! `z = a W + b`:
//!
//! ```text
//! ∂z/∂x_k      = (∂a/∂x_k) W
//! ∂²z/∂x_k∂x_l = (∂²a/∂x_k∂x_l) W
//! ```
//!
//! and for an elementwise activation `y = σ(z)`:
//!
//! ```text
//! ∂y/∂x_k      = σ'(z) ∂z/∂x_k
//! ∂²y/∂x_k∂x_l = σ''(z) ∂z/∂x_k ∂z/∂x_l + σ'(z) ∂²z/∂x_k∂x_l
//! ```
//!
//! Every term is an ordinary tensor op, so a loss built from the Laplacian
//! back-propagates to the weights.

use burn::module::Param;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::sigmoid;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use super::parameters::{ParamTensor, ParameterSet};
use super::{check_coords, to_f32_vec, DerivativeOrder, FieldSamples, PhaseField, HESSIAN_PAIRS};
use crate::config::PhaseFieldNetConfig;
use crate::error::{Result, VesicleError};

impl PhaseFieldNetConfig {
    /// Initialize the network with seeded Kaiming-normal weights.
    ///
    /// Weights are drawn from `N(0, 2 / fan_in)` and biases from
    /// `N(0, 1 / fan_in)`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> PhaseFieldNet<B> {
        let mut rng = StdRng::seed_from_u64(self.init_seed);
        let dims = self.layer_dims();
        let n = dims.len();

        let hidden = dims[..n - 1]
            .windows(2)
            .map(|w| kaiming_linear(w[0], w[1], &mut rng, device))
            .collect();
        let output = kaiming_linear(dims[n - 2], dims[n - 1], &mut rng, device);

        PhaseFieldNet { hidden, output }
    }
}

fn kaiming_linear<B: Backend>(
    fan_in: usize,
    fan_out: usize,
    rng: &mut StdRng,
    device: &B::Device,
) -> Linear<B> {
    let weight_std = (2.0 / fan_in as f32).sqrt();
    let bias_std = 1.0 / (fan_in as f32).sqrt();

    let weights = (0..fan_in * fan_out)
        .map(|_| rng.sample::<f32, _>(StandardNormal) * weight_std)
        .collect();
    let biases = (0..fan_out)
        .map(|_| rng.sample::<f32, _>(StandardNormal) * bias_std)
        .collect();

    linear_from_values(fan_in, fan_out, weights, biases, device)
}

fn linear_from_values<B: Backend>(
    fan_in: usize,
    fan_out: usize,
    weights: Vec<f32>,
    biases: Vec<f32>,
    device: &B::Device,
) -> Linear<B> {
    let mut layer = LinearConfig::new(fan_in, fan_out).init(device);
    layer.weight = Param::from_tensor(Tensor::from_data(
        TensorData::new(weights, [fan_in, fan_out]),
        device,
    ));
    layer.bias = Some(Param::from_tensor(Tensor::from_data(
        TensorData::new(biases, [fan_out]),
        device,
    )));
    layer
}

/// Fully connected phase field: sigmoid hidden layers, tanh output.
#[derive(Module, Debug)]
pub struct PhaseFieldNet<B: Backend> {
    /// Hidden layers.
    hidden: Vec<Linear<B>>,
    /// Output layer, width 1.
    output: Linear<B>,
}

impl<B: Backend> PhaseFieldNet<B> {
    /// Layer widths from input to output.
    pub fn layer_dims(&self) -> Vec<usize> {
        let mut dims = Vec::with_capacity(self.hidden.len() + 2);
        for layer in self.layers() {
            let [fan_in, fan_out] = layer.weight.val().dims();
            if dims.is_empty() {
                dims.push(fan_in);
            }
            dims.push(fan_out);
        }
        dims
    }

    fn layers(&self) -> impl Iterator<Item = &Linear<B>> {
        self.hidden.iter().chain(std::iter::once(&self.output))
    }

    /// Field values only, `[N, 3] -> [N, 1]`.
    pub fn forward(&self, coords: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = coords;
        for layer in &self.hidden {
            x = sigmoid(layer.forward(x));
        }
        self.output.forward(x).tanh()
    }

    /// Snapshot the parameters.
    pub fn to_parameter_set(&self) -> Result<ParameterSet> {
        let mut tensors = Vec::with_capacity(2 * (self.hidden.len() + 1));
        for layer in self.layers() {
            let weight = layer.weight.val();
            let shape = weight.dims().to_vec();
            tensors.push(ParamTensor::new(shape, to_f32_vec(weight)?));

            let [_, fan_out] = layer.weight.val().dims();
            let bias = match &layer.bias {
                Some(b) => to_f32_vec(b.val())?,
                None => vec![0.0; fan_out],
            };
            tensors.push(ParamTensor::new(vec![fan_out], bias));
        }
        Ok(ParameterSet {
            layer_dims: self.layer_dims(),
            tensors,
        })
    }

    /// Rebuild a network from a parameter snapshot.
    pub fn from_parameter_set(set: &ParameterSet, device: &B::Device) -> Result<Self> {
        set.validate().map_err(VesicleError::config)?;

        let mut layers: Vec<Linear<B>> = set
            .layer_dims
            .windows(2)
            .enumerate()
            .map(|(i, w)| {
                linear_from_values(
                    w[0],
                    w[1],
                    set.tensors[2 * i].values.clone(),
                    set.tensors[2 * i + 1].values.clone(),
                    device,
                )
            })
            .collect();

        let output = layers
            .pop()
            .ok_or_else(|| VesicleError::config("parameter set has no layers"))?;
        Ok(Self {
            hidden: layers,
            output,
        })
    }
}

impl<B: Backend> PhaseField<B> for PhaseFieldNet<B> {
    fn input_dim(&self) -> usize {
        self.layers()
            .next()
            .map(|l| l.weight.val().dims()[0])
            .unwrap_or(0)
    }

    fn evaluate(&self, coords: Tensor<B, 2>, order: DerivativeOrder) -> Result<FieldSamples<B>> {
        check_coords(&coords, self.input_dim())?;

        let with_gradient = order >= DerivativeOrder::Gradient;
        let with_hessian = order == DerivativeOrder::Hessian;

        let mut jet = Jet::seed(coords, with_gradient);
        for layer in &self.hidden {
            jet = jet.linear(layer).activate(Activation::Sigmoid, with_hessian);
        }
        jet = jet.linear(&self.output).activate(Activation::Tanh, with_hessian);

        Ok(jet.into_samples())
    }
}

#[derive(Debug, Clone, Copy)]
enum Activation {
    Sigmoid,
    Tanh,
}

impl Activation {
    /// `(σ(z), σ'(z), σ''(z))`.
    fn apply<B: Backend>(self, z: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>, Tensor<B, 2>) {
        match self {
            Activation::Sigmoid => {
                let s = sigmoid(z);
                let d1 = s.clone() * s.clone().neg().add_scalar(1.0);
                let d2 = d1.clone() * s.clone().mul_scalar(-2.0).add_scalar(1.0);
                (s, d1, d2)
            }
            Activation::Tanh => {
                let t = z.tanh();
                let d1 = (t.clone() * t.clone()).neg().add_scalar(1.0);
                let d2 = t.clone().mul_scalar(-2.0) * d1.clone();
                (t, d1, d2)
            }
        }
    }
}

/// Activations plus their first and second spatial derivatives.
struct Jet<B: Backend> {
    value: Tensor<B, 2>,
    /// `∂/∂x_k` per input axis; empty when only values are requested.
    jacobian: Vec<Tensor<B, 2>>,
    /// Second derivatives in [`HESSIAN_PAIRS`] order; `None` means zero.
    hessian: Option<Vec<Tensor<B, 2>>>,
}

impl<B: Backend> Jet<B> {
    fn seed(coords: Tensor<B, 2>, with_gradient: bool) -> Self {
        let [n, d] = coords.dims();
        let device = coords.device();
        let jacobian = if with_gradient {
            (0..d).map(|k| unit_columns(n, d, k, &device)).collect()
        } else {
            Vec::new()
        };
        Self {
            value: coords,
            jacobian,
            hessian: None,
        }
    }

    fn linear(self, layer: &Linear<B>) -> Self {
        let w = layer.weight.val();
        Self {
            value: layer.forward(self.value),
            jacobian: self
                .jacobian
                .into_iter()
                .map(|j| j.matmul(w.clone()))
                .collect(),
            hessian: self
                .hessian
                .map(|h| h.into_iter().map(|h| h.matmul(w.clone())).collect()),
        }
    }

    fn activate(self, activation: Activation, with_hessian: bool) -> Self {
        let (value, d1, d2) = activation.apply(self.value);

        let hessian = if with_hessian && !self.jacobian.is_empty() {
            let terms = HESSIAN_PAIRS
                .iter()
                .enumerate()
                .map(|(i, &(k, l))| {
                    let curvature =
                        d2.clone() * self.jacobian[k].clone() * self.jacobian[l].clone();
                    match &self.hessian {
                        Some(prev) => curvature + d1.clone() * prev[i].clone(),
                        None => curvature,
                    }
                })
                .collect();
            Some(terms)
        } else {
            None
        };

        let jacobian = self
            .jacobian
            .into_iter()
            .map(|j| d1.clone() * j)
            .collect();

        Self {
            value,
            jacobian,
            hessian,
        }
    }

    fn into_samples(self) -> FieldSamples<B> {
        let gradient = (!self.jacobian.is_empty()).then(|| Tensor::cat(self.jacobian, 1));
        let hessian = self.hessian.map(|h| Tensor::cat(h, 1));
        FieldSamples {
            value: self.value,
            gradient,
            hessian,
        }
    }
}

/// `[N, d]` tensor whose column `k` is one and every other column zero.
fn unit_columns<B: Backend>(n: usize, d: usize, k: usize, device: &B::Device) -> Tensor<B, 2> {
    let mut row = vec![0.0f32; d];
    row[k] = 1.0;
    Tensor::<B, 2>::from_data(TensorData::new(row, [1, d]), device).repeat_dim(0, n)
}
