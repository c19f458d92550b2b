//! Optimizer loop for one set of constraint targets.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use burn::grad_clipping::GradientClippingConfig;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::momentum::MomentumConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer, SgdConfig};
use burn::tensor::backend::AutodiffBackend;
use vesicle_core::{ConstraintSet, Measurements};

use super::batch::BatchSampler;
use super::checkpoint::{save_checkpoint, CheckpointMetadata};
use super::metrics::{MetricsTracker, StepRecord};
use crate::config::{OptimizerKind, SolverConfig};
use crate::energy::EnergyFunctional;
use crate::error::{Result, VesicleError};
use crate::field::{DerivativeOrder, PhaseField, PhaseFieldNet};

/// Lifecycle of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerPhase {
    /// Built, not yet run.
    Initializing,
    /// Inside the step loop.
    Training,
    /// Ran all steps, or met the convergence tolerance.
    Converged,
    /// Loss or parameters became non-finite.
    Failed,
    /// Cancelled between steps.
    Interrupted,
}

/// Outcome of [`VesicleTrainer::run`].
#[derive(Debug)]
pub struct RunReport {
    /// Terminal phase.
    pub phase: TrainerPhase,
    /// Optimizer steps applied.
    pub steps_completed: usize,
    /// One record per completed step.
    pub history: Vec<StepRecord>,
    /// Measurements of the last evaluated step.
    pub final_measurements: Option<Measurements>,
    /// Why the run did not converge.
    pub failure: Option<VesicleError>,
    /// Checkpoint files written, periodic and final.
    pub checkpoints_written: usize,
}

impl RunReport {
    /// Loss of the last completed step.
    pub fn final_loss(&self) -> Option<f32> {
        self.history.last().map(|r| r.total_loss)
    }

    /// `Ok` for a converged run, the failure otherwise.
    pub fn into_result(self) -> Result<Self> {
        match self.phase {
            TrainerPhase::Converged => Ok(self),
            TrainerPhase::Interrupted => Err(VesicleError::Interrupted {
                step: self.steps_completed,
            }),
            _ => Err(self.failure.unwrap_or(VesicleError::NumericDivergence {
                step: self.steps_completed,
                loss: f32::NAN,
            })),
        }
    }
}

/// Minimizes the constrained energy of a [`PhaseFieldNet`].
///
/// Each step samples collocation points, evaluates the field up to its
/// Hessian, computes the loss, checks it is finite, back-propagates and
/// applies one optimizer update. Cancellation and checkpoint writes happen
/// only between steps.
pub struct VesicleTrainer<B: AutodiffBackend> {
    model: PhaseFieldNet<B>,
    config: SolverConfig,
    energy: EnergyFunctional,
    sampler: BatchSampler<B>,
    phase: TrainerPhase,
    cancel: Arc<AtomicBool>,
    checkpoint_path: Option<PathBuf>,
    label: String,
}

impl<B: AutodiffBackend> VesicleTrainer<B> {
    /// Create a trainer; validates the configuration.
    pub fn new(
        model: PhaseFieldNet<B>,
        config: SolverConfig,
        constraints: ConstraintSet,
        device: &B::Device,
    ) -> Result<Self> {
        config.check()?;
        let expected = config.network.layer_dims();
        if model.layer_dims() != expected {
            return Err(VesicleError::ShapeMismatch {
                expected,
                got: model.layer_dims(),
            });
        }

        let energy = EnergyFunctional::new(
            config.energy.clone(),
            constraints,
            config.sampler.domain(),
        )?;
        let sampler = BatchSampler::new(config.sampler.settings(), device)?;

        Ok(Self {
            model,
            config,
            energy,
            sampler,
            phase: TrainerPhase::Initializing,
            cancel: Arc::new(AtomicBool::new(false)),
            checkpoint_path: None,
            label: "none".to_string(),
        })
    }

    /// Share a cancellation flag; setting it stops the run before the next step.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Save checkpoints to `path`.
    pub fn with_checkpoint_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint_path = Some(path.into());
        self
    }

    /// Constraint label written into checkpoints and logs.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Cancellation flag of this trainer.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Current phase.
    pub fn phase(&self) -> TrainerPhase {
        self.phase
    }

    /// The network, as of the last good step.
    pub fn model(&self) -> &PhaseFieldNet<B> {
        &self.model
    }

    /// Consume the trainer, returning the network.
    pub fn into_model(self) -> PhaseFieldNet<B> {
        self.model
    }

    /// Energy functional, with the last measured constraint values.
    pub fn energy(&self) -> &EnergyFunctional {
        &self.energy
    }

    /// Run the configured number of steps.
    ///
    /// Divergence and cancellation end the run normally and are reported in
    /// the [`RunReport`]; I/O and tensor errors are returned as `Err`.
    pub fn run(&mut self) -> Result<RunReport> {
        let opt = self.config.optimizer.clone();
        let weight_decay = (opt.weight_decay > 0.0).then(|| WeightDecayConfig::new(opt.weight_decay));
        let clipping = (opt.gradient_clip > 0.0).then(|| GradientClippingConfig::Norm(opt.gradient_clip));

        match opt.kind {
            OptimizerKind::Adam => {
                let optim = AdamConfig::new()
                    .with_weight_decay(weight_decay)
                    .with_grad_clipping(clipping)
                    .init::<B, PhaseFieldNet<B>>();
                self.run_with(optim)
            }
            OptimizerKind::Sgd => {
                let momentum = (opt.momentum > 0.0).then(|| {
                    MomentumConfig::new()
                        .with_momentum(opt.momentum)
                        .with_dampening(0.0)
                });
                let optim = SgdConfig::new()
                    .with_weight_decay(weight_decay)
                    .with_momentum(momentum)
                    .with_gradient_clipping(clipping)
                    .init::<B, PhaseFieldNet<B>>();
                self.run_with(optim)
            }
        }
    }

    fn run_with<O: Optimizer<PhaseFieldNet<B>, B>>(&mut self, mut optim: O) -> Result<RunReport> {
        let training = self.config.training.clone();
        let learning_rate = self.config.optimizer.learning_rate;
        let mut tracker = MetricsTracker::new(training.convergence_window);
        let mut history = Vec::with_capacity(training.steps);
        let mut model = self.model.clone();
        let mut final_measurements = None;
        let mut failure = None;
        let mut last_saved = None;
        let mut checkpoints_written = 0;

        self.phase = TrainerPhase::Training;
        log::info!(
            "Training [{}] for {} steps on {} points per batch",
            self.label,
            training.steps,
            self.sampler.batch_size()
        );

        let mut step = 0;
        while step < training.steps {
            if self.cancel.load(Ordering::Relaxed) {
                log::warn!("[{}] cancelled after {} steps", self.label, step);
                self.phase = TrainerPhase::Interrupted;
                failure = Some(VesicleError::Interrupted { step });
                break;
            }

            let coords = self.sampler.next_batch()?;
            let samples = model.evaluate(coords.clone(), DerivativeOrder::Hessian)?;
            let terms = self.energy.compute(&samples, coords)?;
            let summary = terms.summary()?;

            if !summary.total.is_finite() || !summary.measurements.is_finite() {
                log::error!("[{}] non-finite loss {} at step {}", self.label, summary.total, step);
                self.phase = TrainerPhase::Failed;
                failure = Some(VesicleError::NumericDivergence {
                    step,
                    loss: summary.total,
                });
                break;
            }

            let grads = GradientsParams::from_grads(terms.total.backward(), &model);
            let updated = optim.step(learning_rate, model.clone(), grads);
            if !updated.to_parameter_set()?.all_finite() {
                log::error!("[{}] parameters diverged at step {}", self.label, step);
                self.phase = TrainerPhase::Failed;
                failure = Some(VesicleError::NumericDivergence {
                    step,
                    loss: summary.total,
                });
                break;
            }
            model = updated;

            let record = StepRecord::from_summary(step, &summary);
            self.energy.observe(&summary.measurements);
            tracker.push(summary.total);
            final_measurements = Some(summary.measurements);
            history.push(record);
            step += 1;

            if step % training.log_interval == 0 || step == 1 {
                record.log(&self.label);
            }
            if training.checkpoint_interval > 0 && step % training.checkpoint_interval == 0 {
                if self.save(&model, step, summary.total)? {
                    checkpoints_written += 1;
                    last_saved = Some(step);
                }
            }
            if tracker.has_converged(training.convergence_tolerance) {
                log::info!(
                    "[{}] converged after {} steps (window mean {:?})",
                    self.label,
                    step,
                    tracker.window_mean()
                );
                break;
            }
        }

        if failure.is_none() {
            self.phase = TrainerPhase::Converged;
            if last_saved != Some(step) {
                let loss = history.last().map_or(f32::NAN, |r: &StepRecord| r.total_loss);
                if self.save(&model, step, loss)? {
                    checkpoints_written += 1;
                }
            }
        }
        self.model = model;

        Ok(RunReport {
            phase: self.phase,
            steps_completed: step,
            history,
            final_measurements,
            failure,
            checkpoints_written,
        })
    }

    /// Returns whether a file was written.
    fn save(&self, model: &PhaseFieldNet<B>, step: usize, loss: f32) -> Result<bool> {
        let Some(path) = &self.checkpoint_path else {
            return Ok(false);
        };
        let params = model.to_parameter_set()?;
        let metadata = CheckpointMetadata::new(&params, step, loss, self.label.clone());
        save_checkpoint(path, &params, &metadata)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SamplerConfig, TrainingConfig};
    use crate::field::ParameterSet;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    fn small_config(steps: usize) -> SolverConfig {
        SolverConfig::new()
            .with_sampler(SamplerConfig::new().with_points_per_axis(6))
            .with_training(TrainingConfig::new().with_steps(steps).with_log_interval(1))
    }

    fn model(config: &SolverConfig) -> PhaseFieldNet<TestBackend> {
        config.network.init::<TestBackend>(&Default::default())
    }

    #[test]
    fn test_runs_to_completion() {
        let config = small_config(3);
        let mut trainer =
            VesicleTrainer::new(model(&config), config, ConstraintSet::new(), &Default::default())
                .unwrap();
        assert_eq!(trainer.phase(), TrainerPhase::Initializing);

        let report = trainer.run().unwrap();
        assert_eq!(report.phase, TrainerPhase::Converged);
        assert_eq!(report.steps_completed, 3);
        assert_eq!(report.history.len(), 3);
        assert!(report.final_measurements.is_some());
        assert!(report.history.iter().all(|r| r.total_loss >= 0.0));
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_cancel_before_first_step() {
        let config = small_config(10);
        let cancel = Arc::new(AtomicBool::new(true));
        let mut trainer =
            VesicleTrainer::new(model(&config), config, ConstraintSet::new(), &Default::default())
                .unwrap()
                .with_cancel_flag(cancel);

        let report = trainer.run().unwrap();
        assert_eq!(report.phase, TrainerPhase::Interrupted);
        assert_eq!(report.steps_completed, 0);
        assert!(matches!(
            report.into_result(),
            Err(VesicleError::Interrupted { step: 0 })
        ));
    }

    #[test]
    fn test_non_finite_parameters_fail() {
        let config = small_config(5);
        let device = Default::default();
        let mut params = model(&config).to_parameter_set().unwrap();
        params.tensors[0].values[0] = f32::NAN;
        let poisoned = PhaseFieldNet::<TestBackend>::from_parameter_set(&params, &device).unwrap();

        let mut trainer =
            VesicleTrainer::new(poisoned, config, ConstraintSet::new(), &device).unwrap();
        let report = trainer.run().unwrap();
        assert_eq!(report.phase, TrainerPhase::Failed);
        assert_eq!(report.steps_completed, 0);
        assert!(matches!(
            report.failure,
            Some(VesicleError::NumericDivergence { step: 0, .. })
        ));
    }

    #[test]
    fn test_rejects_mismatched_model() {
        let config = small_config(1);
        let other = crate::config::PhaseFieldNetConfig::new()
            .with_hidden_dims(vec![4])
            .init::<TestBackend>(&Default::default());
        assert!(matches!(
            VesicleTrainer::new(other, config, ConstraintSet::new(), &Default::default()),
            Err(VesicleError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_final_step_checkpoint_written_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("run.ckpt");
        let device = Default::default();

        let mut config = small_config(4);
        config.training.checkpoint_interval = 2;
        let mut trainer = VesicleTrainer::new(model(&config), config, ConstraintSet::new(), &device)
            .unwrap()
            .with_checkpoint_path(&path);
        let report = trainer.run().unwrap();
        assert_eq!(report.checkpoints_written, 2);

        let mut config = small_config(5);
        config.training.checkpoint_interval = 2;
        let mut trainer = VesicleTrainer::new(model(&config), config, ConstraintSet::new(), &device)
            .unwrap()
            .with_checkpoint_path(&path);
        let report = trainer.run().unwrap();
        assert_eq!(report.checkpoints_written, 3);

        let dims = trainer.model().layer_dims();
        let (_, metadata) = crate::training::load_checkpoint(&path, &dims).unwrap();
        assert_eq!(metadata.step, 5);
    }

    #[test]
    fn test_sgd_updates_parameters() {
        let mut config = small_config(2);
        config.optimizer.kind = OptimizerKind::Sgd;
        config.optimizer.momentum = 0.5;
        config.optimizer.gradient_clip = 1.0;
        let initial = model(&config);
        let before: ParameterSet = initial.to_parameter_set().unwrap();

        let mut trainer =
            VesicleTrainer::new(initial, config, ConstraintSet::new(), &Default::default())
                .unwrap();
        let report = trainer.run().unwrap();
        assert_eq!(report.phase, TrainerPhase::Converged);
        assert_ne!(trainer.model().to_parameter_set().unwrap(), before);
    }
}
