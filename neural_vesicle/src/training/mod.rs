//! Optimization of the phase field against the energy functional.
//!
//! This module provides:
//! - `VesicleTrainer`: the optimizer loop for one set of constraint targets
//! - `ConstraintPipeline`: serial stages, each starting from the previous checkpoint
//! - `fit_sphere_profile`: pretraining onto the tanh sphere
//! - Collocation batches as tensors, step records and convergence tracking
//! - Single-file checkpoints of the network parameters

mod batch;
mod checkpoint;
mod metrics;
mod pipeline;
mod pretrain;
mod trainer;

pub use batch::BatchSampler;
pub use checkpoint::{
    checkpoint_exists, find_latest_checkpoint, load_checkpoint, save_checkpoint,
    stage_checkpoint_path, CheckpointMetadata, CHECKPOINT_MAGIC, CHECKPOINT_VERSION,
};
pub use metrics::{MetricsTracker, StepRecord};
pub use pipeline::{ConstraintPipeline, PipelineReport, StageReport};
pub use pretrain::{fit_sphere_profile, sphere_fit_error, PretrainReport};
pub use trainer::{RunReport, TrainerPhase, VesicleTrainer};
