//! Fitting a freshly initialized network to the tanh sphere.

use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use vesicle_core::{Domain, Point3, SamplerSettings, SamplingMode};

use super::batch::BatchSampler;
use crate::config::PretrainConfig;
use crate::error::{Result, VesicleError};
use crate::field::{to_f32_scalar, DerivativeOrder, PhaseField, PhaseFieldNet, SphereProfile};

/// Outcome of [`fit_sphere_profile`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PretrainReport {
    /// Adam steps taken.
    pub steps: usize,
    /// Mean squared error of the last step.
    pub final_loss: f32,
}

/// Regress `model` onto a sphere of `config.radius` centered in `domain`.
///
/// Batches are random lattice nodes, so the fit sees the whole box without a
/// fixed grid bias. Fails with [`VesicleError::NumericDivergence`] if the
/// error becomes non-finite.
pub fn fit_sphere_profile<B: AutodiffBackend>(
    model: PhaseFieldNet<B>,
    config: &PretrainConfig,
    epsilon: f32,
    domain: Domain,
    seed: u64,
    device: &B::Device,
) -> Result<(PhaseFieldNet<B>, PretrainReport)> {
    config.validate().map_err(VesicleError::config)?;

    let target = SphereProfile::new(domain.center(), config.radius, epsilon);
    let settings = SamplerSettings::new(domain, config.points_per_axis)
        .with_mode(SamplingMode::LatticeResampled)
        .with_seed(seed);
    let mut sampler = BatchSampler::<B>::new(settings, device)?;
    let mut optim = AdamConfig::new().init::<B, PhaseFieldNet<B>>();

    log::info!(
        "Pretraining onto sphere R={} at {:?} for {} steps",
        config.radius,
        target.center,
        config.steps
    );

    let mut model = model;
    let mut final_loss = f32::NAN;
    for step in 0..config.steps {
        let coords = sampler.next_batch()?;
        let expected = target
            .evaluate(coords.clone(), DerivativeOrder::Value)?
            .value
            .detach();
        let predicted = model.forward(coords);
        let diff = predicted - expected;
        let loss = (diff.clone() * diff).mean();

        final_loss = to_f32_scalar(loss.clone())?;
        if !final_loss.is_finite() {
            return Err(VesicleError::NumericDivergence {
                step,
                loss: final_loss,
            });
        }

        let grads = GradientsParams::from_grads(loss.backward(), &model);
        model = optim.step(config.learning_rate, model, grads);

        if (step + 1) % config.log_interval == 0 {
            log::info!("pretrain step={} mse={:.6e}", step + 1, final_loss);
        }
    }

    Ok((
        model,
        PretrainReport {
            steps: config.steps,
            final_loss,
        },
    ))
}

/// Mean squared difference between `model` and the sphere on `points`.
pub fn sphere_fit_error<B: Backend>(
    model: &PhaseFieldNet<B>,
    sphere: &SphereProfile,
    points: &[Point3],
    device: &B::Device,
) -> Result<f32> {
    let flat = points.iter().flat_map(|p| p.as_array()).collect();
    let coords = crate::field::coords_tensor::<B>(flat, device)?;
    let expected = sphere.evaluate(coords.clone(), DerivativeOrder::Value)?.value;
    let diff = model.forward(coords) - expected;
    to_f32_scalar((diff.clone() * diff).mean())
}
