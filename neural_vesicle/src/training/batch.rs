//! Collocation batches as tensors.

use burn::prelude::*;
use vesicle_core::{CollocationSampler, SamplerSettings, SamplingMode};

use crate::error::Result;
use crate::field::coords_tensor;

/// Wraps a [`CollocationSampler`] and uploads each batch as a `[N, 3]` tensor.
///
/// In [`SamplingMode::Fixed`] the lattice is uploaded once and reused.
pub struct BatchSampler<B: Backend> {
    sampler: CollocationSampler,
    device: B::Device,
    fixed: Option<Tensor<B, 2>>,
    batches: u64,
}

impl<B: Backend> BatchSampler<B> {
    /// Create a sampler, validating the settings.
    pub fn new(settings: SamplerSettings, device: &B::Device) -> Result<Self> {
        Ok(Self {
            sampler: CollocationSampler::new(settings)?,
            device: device.clone(),
            fixed: None,
            batches: 0,
        })
    }

    /// Points per batch.
    pub fn batch_size(&self) -> usize {
        self.sampler.settings().batch_size()
    }

    /// Number of batches handed out since creation or the last reset.
    pub fn batches(&self) -> u64 {
        self.batches
    }

    /// Rewind to the first batch.
    pub fn reset(&mut self) {
        self.sampler.reset();
        self.batches = 0;
    }

    /// Next batch of coordinates.
    pub fn next_batch(&mut self) -> Result<Tensor<B, 2>> {
        self.batches += 1;

        if self.sampler.settings().mode == SamplingMode::Fixed {
            if let Some(coords) = &self.fixed {
                return Ok(coords.clone());
            }
            let coords = coords_tensor(self.sampler.next_batch().flat_coords(), &self.device)?;
            self.fixed = Some(coords.clone());
            return Ok(coords);
        }

        coords_tensor(self.sampler.next_batch().flat_coords(), &self.device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::to_f32_vec;
    use burn::backend::NdArray;
    use vesicle_core::Domain;

    type TestBackend = NdArray;

    #[test]
    fn test_fixed_batches_repeat() {
        let settings = SamplerSettings::new(Domain::cube(-1.0, 1.0), 4);
        let mut sampler = BatchSampler::<TestBackend>::new(settings, &Default::default()).unwrap();
        assert_eq!(sampler.batch_size(), 64);

        let a = to_f32_vec(sampler.next_batch().unwrap()).unwrap();
        let b = to_f32_vec(sampler.next_batch().unwrap()).unwrap();
        assert_eq!(a.len(), 64 * 3);
        assert_eq!(a, b);
        assert_eq!(sampler.batches(), 2);
    }

    #[test]
    fn test_resampled_batches_restart() {
        let settings = SamplerSettings::new(Domain::cube(-1.0, 1.0), 3)
            .with_mode(SamplingMode::Resampled)
            .with_seed(9);
        let mut sampler = BatchSampler::<TestBackend>::new(settings, &Default::default()).unwrap();

        let first = to_f32_vec(sampler.next_batch().unwrap()).unwrap();
        let second = to_f32_vec(sampler.next_batch().unwrap()).unwrap();
        assert_ne!(first, second);
        assert!(first.iter().all(|v| (-1.0..=1.0).contains(v)));

        sampler.reset();
        assert_eq!(to_f32_vec(sampler.next_batch().unwrap()).unwrap(), first);
    }

    #[test]
    fn test_invalid_settings() {
        let settings = SamplerSettings::new(Domain::cube(-1.0, 1.0), 1);
        assert!(BatchSampler::<TestBackend>::new(settings, &Default::default()).is_err());
    }
}
