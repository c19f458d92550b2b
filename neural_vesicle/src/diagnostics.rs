//! Lattice measurements of a phase field.
//!
//! Training estimates integrals on its own batches. This module measures a
//! field on an arbitrary lattice, chunk by chunk, reducing each chunk to host
//! sums so memory stays bounded for fine lattices.

use burn::prelude::*;
use vesicle_core::sampling::lattice;
use vesicle_core::{Domain, Measurements, PhaseFieldParams, Point3};

use crate::energy::densities::{bending_energy_density, surface_density, volume_density};
use crate::error::{Result, VesicleError};
use crate::field::{coords_tensor, to_f32_vec, DerivativeOrder, PhaseField};

/// Default chunk size of [`measure_field`].
pub const DEFAULT_CHUNK: usize = 4096;

/// Measure bending energy, area, volume and centroid of `field` on a
/// `points_per_axis³` lattice over `domain`.
pub fn measure_field<B: Backend, F: PhaseField<B>>(
    field: &F,
    domain: &Domain,
    points_per_axis: usize,
    params: &PhaseFieldParams,
    chunk: usize,
    device: &B::Device,
) -> Result<Measurements> {
    domain.validate()?;
    params.validate()?;
    if chunk == 0 {
        return Err(VesicleError::config("chunk size must be positive"));
    }

    let points = lattice(domain, points_per_axis);
    if points.is_empty() {
        return Err(VesicleError::config("empty measurement lattice"));
    }

    let mut bending = 0.0f64;
    let mut area = 0.0f64;
    let mut mass = 0.0f64;
    let mut moment = [0.0f64; 3];

    for block in points.chunks(chunk) {
        let flat = block.iter().flat_map(|p| p.position.as_array()).collect();
        let coords = coords_tensor::<B>(flat, device)?;
        let samples = field.evaluate(coords, DerivativeOrder::Hessian)?;

        let (grad_norm_sq, laplacian) = match (samples.gradient_norm_sq(), samples.laplacian()) {
            (Some(g), Some(l)) => (g, l),
            _ => return Err(VesicleError::config("field returned no derivatives")),
        };
        let phi = samples.value;

        bending += sum(bending_energy_density(phi.clone(), laplacian, params))?;
        area += sum(surface_density(phi.clone(), grad_norm_sq, params))?;

        let rho = to_f32_vec(volume_density(phi))?;
        for (r, p) in rho.iter().zip(block) {
            let r = *r as f64;
            mass += r;
            moment[0] += r * p.position.x as f64;
            moment[1] += r * p.position.y as f64;
            moment[2] += r * p.position.z as f64;
        }
    }

    let scale = domain.volume() as f64 / points.len() as f64;
    let denominator = mass.max(1e-12);
    Ok(Measurements {
        bending_energy: (bending * scale) as f32,
        area: (area * scale) as f32,
        volume: (mass * scale) as f32,
        center_of_mass: Point3::new(
            (moment[0] / denominator) as f32,
            (moment[1] / denominator) as f32,
            (moment[2] / denominator) as f32,
        ),
    })
}

fn sum<B: Backend>(t: Tensor<B, 2>) -> Result<f64> {
    Ok(to_f32_vec(t)?.iter().map(|&v| v as f64).sum())
}
