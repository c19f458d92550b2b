//! # neural_vesicle
//!
//! Neural phase-field solver for equilibrium vesicle shapes, built on Burn.
//!
//! The vesicle is the zero level set of a phase field `phi(r)` represented by
//! a small MLP. Training minimizes the Helfrich bending energy of the field
//! plus quadratic penalties that pin the membrane area, the enclosed volume
//! and the center of mass.
//!
//! ## Features
//!
//! - **Analytic derivatives**: the field network propagates its gradient and
//!   Hessian forward, so the bending energy stays differentiable
//! - **Constraint pipeline**: serial stages, e.g. a volume reduction schedule,
//!   each starting from the previous stage's checkpoint
//! - **Atomic checkpoints**: single-file parameter snapshots with a JSON header
//! - **Burn configs**: every knob is a `Config`, loadable from JSON
//!
//! ## Quick Start
//!
//! ```ignore
//! use neural_vesicle::prelude::*;
//! use burn::backend::{Autodiff, NdArray};
//!
//! type MyBackend = Autodiff<NdArray>;
//!
//! let run = RunConfig::from_args(&["volume=3.8"])?;
//! let device = Default::default();
//! let report = ConstraintPipeline::<MyBackend>::new(run, &device)?.run()?;
//! println!("{:?}", report.phase());
//! ```
//!
//! ## Architecture
//!
//! ```text
//! vesicle_core (pure math: densities, sampler, constraints)
//!     │
//!     ▼
//! neural_vesicle
//!     field ──► energy ──► training ──► checkpoints
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod diagnostics;
pub mod energy;
pub mod error;
pub mod field;
pub mod training;

pub use config::{RunConfig, SolverConfig};
pub use error::{Result, VesicleError};
pub use field::{PhaseField, PhaseFieldNet};
pub use training::{ConstraintPipeline, VesicleTrainer};

pub use vesicle_core::{ConstraintSet, Domain, Measurements, Point3};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{
        ActiveConstraint, EnergyConfig, OptimizerConfig, OptimizerKind, PhaseFieldNetConfig,
        PretrainConfig, RunConfig, SamplerConfig, SamplerMode, SolverConfig, TrainingConfig,
    };
    pub use crate::diagnostics::measure_field;
    pub use crate::energy::{EnergyFunctional, EnergySummary, EnergyTerms, LossComponents};
    pub use crate::error::{Result, VesicleError};
    pub use crate::field::{
        DerivativeOrder, FieldSamples, ParamTensor, ParameterSet, PhaseField, PhaseFieldNet,
        SphereProfile,
    };
    pub use crate::training::{
        checkpoint_exists, find_latest_checkpoint, fit_sphere_profile, load_checkpoint,
        save_checkpoint, stage_checkpoint_path, BatchSampler, CheckpointMetadata,
        ConstraintPipeline, MetricsTracker, PipelineReport, RunReport, StepRecord, TrainerPhase,
        VesicleTrainer,
    };

    pub use vesicle_core::{Constraint, ConstraintKind, ConstraintSet, Domain, Measurements, Point3};
}
