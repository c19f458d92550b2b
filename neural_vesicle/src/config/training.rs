//! Sampling, optimizer and training loop configuration.

use std::path::Path;

use burn::config::Config;
use serde::{Deserialize, Serialize};
use vesicle_core::{Domain, Point3, SamplerSettings, SamplingMode};

use super::{EnergyConfig, PhaseFieldNetConfig};
use crate::error::VesicleError;

/// Serializable mirror of [`SamplingMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplerMode {
    /// Same lattice every step.
    Fixed,
    /// Fresh uniform points every step.
    Resampled,
    /// Fresh random lattice nodes every step.
    LatticeResampled,
}

impl From<SamplerMode> for SamplingMode {
    fn from(mode: SamplerMode) -> Self {
        match mode {
            SamplerMode::Fixed => SamplingMode::Fixed,
            SamplerMode::Resampled => SamplingMode::Resampled,
            SamplerMode::LatticeResampled => SamplingMode::LatticeResampled,
        }
    }
}

/// Collocation sampler configuration.
#[derive(Config, Debug, PartialEq)]
pub struct SamplerConfig {
    /// Points per axis; every batch holds `points_per_axis³` points.
    #[config(default = 40)]
    pub points_per_axis: usize,

    /// Lower bound of the cubic domain along every axis.
    #[config(default = "-3.0")]
    pub domain_min: f32,

    /// Upper bound of the cubic domain along every axis.
    #[config(default = 3.0)]
    pub domain_max: f32,

    /// How points are chosen each step.
    #[config(default = "SamplerMode::Fixed")]
    pub mode: SamplerMode,

    /// RNG seed of the random modes.
    #[config(default = 42)]
    pub seed: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplerConfig {
    /// The domain box.
    pub fn domain(&self) -> Domain {
        Domain::new(Point3::splat(self.domain_min), Point3::splat(self.domain_max))
    }

    /// Settings for the core sampler.
    pub fn settings(&self) -> SamplerSettings {
        SamplerSettings::new(self.domain(), self.points_per_axis)
            .with_mode(self.mode.into())
            .with_seed(self.seed)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.settings().validate().map_err(|e| e.to_string())
    }
}

/// Optimizer family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerKind {
    /// Adam.
    Adam,
    /// Stochastic gradient descent, optionally with momentum.
    Sgd,
}

/// Optimizer hyperparameters.
#[derive(Config, Debug, PartialEq)]
pub struct OptimizerConfig {
    /// Optimizer family.
    #[config(default = "OptimizerKind::Adam")]
    pub kind: OptimizerKind,

    /// Learning rate.
    #[config(default = 1e-3)]
    pub learning_rate: f64,

    /// L2 weight decay (0 = off).
    #[config(default = 0.0)]
    pub weight_decay: f32,

    /// Gradient norm clipping threshold (0 = off).
    #[config(default = 0.0)]
    pub gradient_clip: f32,

    /// SGD momentum (0 = plain SGD). Ignored by Adam.
    #[config(default = 0.0)]
    pub momentum: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl OptimizerConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err("learning_rate must be positive".to_string());
        }
        if self.weight_decay < 0.0 {
            return Err("weight_decay must be non-negative".to_string());
        }
        if self.gradient_clip < 0.0 {
            return Err("gradient_clip must be non-negative".to_string());
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err("momentum must be in [0, 1)".to_string());
        }
        Ok(())
    }
}

/// Training loop configuration.
#[derive(Config, Debug, PartialEq)]
pub struct TrainingConfig {
    /// Optimizer steps per run.
    #[config(default = 20000)]
    pub steps: usize,

    /// Log every N steps.
    #[config(default = 100)]
    pub log_interval: usize,

    /// Save a checkpoint every N steps (0 = only at the end).
    #[config(default = 0)]
    pub checkpoint_interval: usize,

    /// Window length for loss averaging and convergence detection.
    #[config(default = 100)]
    pub convergence_window: usize,

    /// Stop early once the relative change between two consecutive window
    /// means falls below this value (0 = always run every step).
    #[config(default = 0.0)]
    pub convergence_tolerance: f32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainingConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.log_interval == 0 {
            return Err("log_interval must be positive".to_string());
        }
        if self.convergence_window == 0 {
            return Err("convergence_window must be positive".to_string());
        }
        if !(self.convergence_tolerance.is_finite() && self.convergence_tolerance >= 0.0) {
            return Err("convergence_tolerance must be finite and non-negative".to_string());
        }
        Ok(())
    }
}

/// Fitting the network to the tanh sphere profile before any relaxation.
#[derive(Config, Debug, PartialEq)]
pub struct PretrainConfig {
    /// Radius of the target sphere.
    #[config(default = 1.0)]
    pub radius: f32,

    /// Optimizer steps.
    #[config(default = 3000)]
    pub steps: usize,

    /// Adam learning rate.
    #[config(default = 1e-2)]
    pub learning_rate: f64,

    /// Points per axis of each random lattice batch.
    #[config(default = 24)]
    pub points_per_axis: usize,

    /// Log every N steps.
    #[config(default = 500)]
    pub log_interval: usize,
}

impl Default for PretrainConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PretrainConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err("radius must be positive".to_string());
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err("learning_rate must be positive".to_string());
        }
        if self.points_per_axis < 2 {
            return Err("points_per_axis must be at least 2".to_string());
        }
        if self.log_interval == 0 {
            return Err("log_interval must be positive".to_string());
        }
        Ok(())
    }
}

/// Complete solver configuration, loadable from a JSON file.
#[derive(Config, Debug, PartialEq)]
pub struct SolverConfig {
    /// Field network.
    #[config(default = "PhaseFieldNetConfig::new()")]
    pub network: PhaseFieldNetConfig,

    /// Energy functional.
    #[config(default = "EnergyConfig::new()")]
    pub energy: EnergyConfig,

    /// Collocation sampler.
    #[config(default = "SamplerConfig::new()")]
    pub sampler: SamplerConfig,

    /// Optimizer.
    #[config(default = "OptimizerConfig::new()")]
    pub optimizer: OptimizerConfig,

    /// Training loop.
    #[config(default = "TrainingConfig::new()")]
    pub training: TrainingConfig,

    /// Sphere pretraining.
    #[config(default = "PretrainConfig::new()")]
    pub pretrain: PretrainConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverConfig {
    /// Validate every section.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.network.validate()?;
        self.energy.validate()?;
        self.sampler.validate()?;
        self.optimizer.validate()?;
        self.training.validate()?;
        self.pretrain.validate()?;
        Ok(())
    }

    /// Validate, mapping failures to [`VesicleError::Configuration`].
    pub fn check(&self) -> crate::error::Result<()> {
        self.validate().map_err(VesicleError::config)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Err(VesicleError::config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        let config = <Self as Config>::load(path).map_err(|e| {
            VesicleError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        config.check()?;
        Ok(config)
    }
}
