//! Pointwise energy densities on tensors.
//!
//! Same formulas as [`vesicle_core::density`], written with Burn ops so they
//! stay differentiable. All inputs and outputs are `[N, 1]`.

use core::f32::consts::SQRT_2;

use burn::prelude::*;
use vesicle_core::PhaseFieldParams;

/// `3/(8 sqrt2 eps) (eps ∆phi + (phi/eps + c0 sqrt2)(1 - phi²))²`.
pub fn bending_energy_density<B: Backend>(
    phi: Tensor<B, 2>,
    laplacian: Tensor<B, 2>,
    params: &PhaseFieldParams,
) -> Tensor<B, 2> {
    let eps = params.epsilon;
    let well = (phi.clone() * phi.clone()).neg().add_scalar(1.0);
    let curvature = phi
        .div_scalar(eps)
        .add_scalar(params.spontaneous_curvature * SQRT_2)
        * well;
    let inner = laplacian.mul_scalar(eps) + curvature;
    (inner.clone() * inner).mul_scalar(3.0 / (8.0 * SQRT_2 * eps))
}

/// `3/(4 sqrt2) (eps |∇phi|² + (1 - phi²)²/(2 eps))`.
pub fn surface_density<B: Backend>(
    phi: Tensor<B, 2>,
    grad_norm_sq: Tensor<B, 2>,
    params: &PhaseFieldParams,
) -> Tensor<B, 2> {
    let eps = params.epsilon;
    let well = (phi.clone() * phi).neg().add_scalar(1.0);
    let double_well = (well.clone() * well).div_scalar(2.0 * eps);
    (grad_norm_sq.mul_scalar(eps) + double_well).mul_scalar(3.0 / (4.0 * SQRT_2))
}

/// `(1 + phi) / 2`.
pub fn volume_density<B: Backend>(phi: Tensor<B, 2>) -> Tensor<B, 2> {
    phi.add_scalar(1.0).mul_scalar(0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::to_f32_vec;
    use burn::backend::NdArray;
    use vesicle_core::density as scalar;

    type TestBackend = NdArray;

    #[test]
    fn test_tensor_densities_match_scalar() {
        let device = Default::default();
        let params = PhaseFieldParams::new(0.3, 0.5);
        let phi_values = [-0.99f32, -0.4, 0.0, 0.35, 0.8];
        let lap_values = [0.1f32, -2.0, 3.5, 0.0, -0.7];
        let g2_values = [0.0f32, 1.5, 7.0, 0.2, 0.01];

        let column = |v: &[f32]| {
            Tensor::<TestBackend, 2>::from_data(TensorData::new(v.to_vec(), [v.len(), 1]), &device)
        };

        let bending = to_f32_vec(bending_energy_density(
            column(&phi_values),
            column(&lap_values),
            &params,
        ))
        .unwrap();
        let surface = to_f32_vec(surface_density(
            column(&phi_values),
            column(&g2_values),
            &params,
        ))
        .unwrap();
        let volume = to_f32_vec(volume_density(column(&phi_values))).unwrap();

        for i in 0..phi_values.len() {
            let b = scalar::bending_energy_density(phi_values[i], lap_values[i], &params);
            let a = scalar::surface_density(phi_values[i], g2_values[i], &params);
            let v = scalar::volume_density(phi_values[i]);
            assert!((bending[i] - b).abs() < 1e-4 * (1.0 + b.abs()));
            assert!((surface[i] - a).abs() < 1e-5 * (1.0 + a.abs()));
            assert!((volume[i] - v).abs() < 1e-6);
        }
    }
}
