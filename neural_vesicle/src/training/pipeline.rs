//! Serial constraint stages.
//!
//! Stage 0 is the starting shape: the configured initial checkpoint, or a
//! sphere fitted by [`fit_sphere_profile`]. It is measured on the training
//! lattice and that measurement anchors relative targets such as the volume
//! schedule. Every later stage trains from the previous stage's parameters and
//! writes `stage_N.ckpt` on success.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use burn::tensor::backend::AutodiffBackend;
use vesicle_core::Measurements;

use super::checkpoint::{
    checkpoint_exists, find_latest_checkpoint, load_checkpoint, save_checkpoint,
    stage_checkpoint_path, CheckpointMetadata,
};
use super::pretrain::{fit_sphere_profile, PretrainReport};
use super::trainer::{RunReport, TrainerPhase, VesicleTrainer};
use crate::config::RunConfig;
use crate::diagnostics::{measure_field, DEFAULT_CHUNK};
use crate::error::{Result, VesicleError};
use crate::field::{ParameterSet, PhaseFieldNet};

/// One finished or aborted stage.
#[derive(Debug)]
pub struct StageReport {
    /// Stage index.
    pub stage: usize,
    /// Where the stage checkpoint is written on success.
    pub checkpoint: PathBuf,
    /// Training outcome.
    pub report: RunReport,
}

/// Outcome of [`ConstraintPipeline::run`].
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// Sphere pretraining, if it ran.
    pub pretrain: Option<PretrainReport>,
    /// Stage-0 shape measured on the training lattice.
    pub reference: Measurements,
    /// Stages skipped because their checkpoint already existed.
    pub skipped: Vec<usize>,
    /// Stages that ran, in order.
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    /// Phase of the last stage that ran; `Converged` if none had to run.
    pub fn phase(&self) -> TrainerPhase {
        self.stages
            .last()
            .map_or(TrainerPhase::Converged, |s| s.report.phase)
    }

    /// True if every stage converged.
    pub fn is_converged(&self) -> bool {
        self.phase() == TrainerPhase::Converged
    }

    /// Checkpoint of the last converged stage.
    pub fn final_checkpoint(&self) -> Option<&Path> {
        self.stages
            .iter()
            .rev()
            .find(|s| s.report.phase == TrainerPhase::Converged)
            .map(|s| s.checkpoint.as_path())
    }
}

/// Runs the stages of a [`RunConfig`] one after another.
pub struct ConstraintPipeline<B: AutodiffBackend> {
    run: RunConfig,
    device: B::Device,
    cancel: Arc<AtomicBool>,
}

impl<B: AutodiffBackend> ConstraintPipeline<B> {
    /// Create a pipeline; validates the solver configuration.
    pub fn new(run: RunConfig, device: &B::Device) -> Result<Self> {
        run.solver.check()?;
        Ok(Self {
            run,
            device: device.clone(),
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Share a cancellation flag with every stage.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Cancellation flag of this pipeline.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run configuration.
    pub fn run_config(&self) -> &RunConfig {
        &self.run
    }

    /// Stage-0 parameters: loaded from the initial checkpoint, or fitted to
    /// a sphere and saved as `stage_0.ckpt`.
    pub fn initial_parameters(&self) -> Result<(ParameterSet, Option<PretrainReport>)> {
        let solver = &self.run.solver;
        let dims = solver.network.layer_dims();

        if let Some(path) = &self.run.initial_checkpoint {
            let (params, _) = load_checkpoint(path, &dims)?;
            return Ok((params, None));
        }

        let model = solver.network.init::<B>(&self.device);
        let (model, report) = fit_sphere_profile(
            model,
            &solver.pretrain,
            solver.energy.epsilon,
            solver.sampler.domain(),
            solver.sampler.seed,
            &self.device,
        )?;
        let params = model.to_parameter_set()?;

        let path = stage_checkpoint_path(&self.run.output_dir, 0);
        let metadata = CheckpointMetadata::new(&params, report.steps, report.final_loss, "sphere");
        save_checkpoint(&path, &params, &metadata)?;
        Ok((params, Some(report)))
    }

    /// Measure a parameter snapshot on the training lattice.
    pub fn measure(&self, params: &ParameterSet) -> Result<Measurements> {
        let solver = &self.run.solver;
        let model = PhaseFieldNet::<B::InnerBackend>::from_parameter_set(params, &self.device)?;
        measure_field(
            &model,
            &solver.sampler.domain(),
            solver.sampler.points_per_axis,
            &solver.energy.params(),
            DEFAULT_CHUNK,
            &self.device,
        )
    }

    /// Latest stage checkpoint written by this run's constraint, if resuming.
    ///
    /// A stage checkpoint written under another constraint is a configuration
    /// error: continuing from it would skip stages that never ran.
    fn resume_point(&self) -> Result<Option<(usize, ParameterSet)>> {
        if !self.run.resume {
            return Ok(None);
        }
        let Some((stage, path)) = find_latest_checkpoint(&self.run.output_dir) else {
            return Ok(None);
        };
        if stage == 0 {
            return Ok(None);
        }

        let (params, metadata) = load_checkpoint(&path, &self.run.solver.network.layer_dims())?;
        let expected = self.run.constraint.stage_label(stage);
        if metadata.constraint != expected {
            return Err(VesicleError::config(format!(
                "{} was written by `{}`, not `{}`; use another output directory",
                path.display(),
                metadata.constraint,
                expected
            )));
        }
        log::info!("Resuming after stage {} from {:?}", stage, path);
        Ok(Some((stage, params)))
    }

    /// Run every stage, stopping at the first one that does not converge.
    pub fn run(&self) -> Result<PipelineReport> {
        let dims = self.run.solver.network.layer_dims();
        let mut report = PipelineReport::default();

        let resumed = self.resume_point()?;
        let stage_zero = stage_checkpoint_path(&self.run.output_dir, 0);
        let initial = if self.run.resume && checkpoint_exists(&stage_zero) {
            load_checkpoint(&stage_zero, &dims)?.0
        } else {
            let (params, pretrain) = self.initial_parameters()?;
            report.pretrain = pretrain;
            params
        };

        report.reference = self.measure(&initial)?;
        log::info!(
            "Starting shape: area={:.5} volume={:.5} v={:.4}",
            report.reference.area,
            report.reference.volume,
            report.reference.reduced_volume()
        );

        let (mut current, first_stage) = match resumed {
            Some((stage, params)) => (params, stage + 1),
            None => (initial, 1),
        };

        for (stage, constraints) in self.run.constraint.stages(&report.reference) {
            if stage < first_stage {
                report.skipped.push(stage);
                continue;
            }

            let checkpoint = stage_checkpoint_path(&self.run.output_dir, stage);
            let model = PhaseFieldNet::<B>::from_parameter_set(&current, &self.device)?;
            let mut trainer = VesicleTrainer::new(model, self.run.solver.clone(), constraints, &self.device)?
                .with_cancel_flag(Arc::clone(&self.cancel))
                .with_checkpoint_path(checkpoint.clone())
                .with_label(self.run.constraint.stage_label(stage));

            let stage_report = trainer.run()?;
            let phase = stage_report.phase;
            if phase == TrainerPhase::Converged {
                current = trainer.model().to_parameter_set()?;
            }
            report.stages.push(StageReport {
                stage,
                checkpoint,
                report: stage_report,
            });
            if phase != TrainerPhase::Converged {
                log::warn!("Stage {} ended as {:?}; later stages skipped", stage, phase);
                break;
            }
        }

        Ok(report)
    }
}
