//! Configuration types for neural_vesicle.
//!
//! Burn-style `Config` structs for the field network, the energy functional,
//! sampling, optimization and training, plus the resolved [`RunConfig`] of a
//! relaxation run.

mod energy;
mod network;
mod run;
mod training;

pub use energy::EnergyConfig;
pub use network::PhaseFieldNetConfig;
pub use run::{volume_schedule, ActiveConstraint, RunConfig, MAX_SCHEDULE_STAGES};
pub use training::{
    OptimizerConfig, OptimizerKind, PretrainConfig, SamplerConfig, SamplerMode, SolverConfig,
    TrainingConfig,
};
