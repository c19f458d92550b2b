//! Run configuration: which constraint a run enforces and where it reads and
//! writes checkpoints.
//!
//! A run is described by up to four positional arguments:
//!
//! ```text
//! relax_vesicle [--resume] [CONSTRAINT] [INITIAL_CHECKPOINT] [OUTPUT_DIR] [CONFIG_JSON]
//! ```
//!
//! With `--resume`, stages whose checkpoint already exists in the output
//! directory are skipped.
//!
//! `CONSTRAINT` is one of `none`, `area=<A>`, `volume=<V>`, `com=<x>,<y>,<z>`,
//! or a bare stage count `k`, which relaxes the starting shape through `k`
//! volume reductions of 5% each while pinning the area and the center of mass.
//! Schedule targets are relative to the starting shape as measured on the
//! training lattice, so the diffuse interface shifts targets and estimates
//! alike.

use std::path::PathBuf;

use vesicle_core::{Constraint, ConstraintSet, Measurements, Point3};

use super::SolverConfig;
use crate::error::{Result, VesicleError};

/// Longest volume schedule: the 19th stage already targets 5% of the starting volume.
pub const MAX_SCHEDULE_STAGES: usize = 19;

/// The constraint a run enforces, as selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ActiveConstraint {
    /// Bending energy only.
    #[default]
    None,
    /// Pin the surface area.
    Area(f32),
    /// Pin the enclosed volume.
    Volume(f32),
    /// Pin the center of mass.
    CenterOfMass(Point3),
    /// Serial volume reduction in `k` stages.
    VolumeSchedule(usize),
}

impl ActiveConstraint {
    /// Parse a run argument.
    pub fn from_arg(arg: &str) -> Result<Self> {
        let arg = arg.trim();
        if arg.is_empty() || arg.eq_ignore_ascii_case("none") {
            return Ok(ActiveConstraint::None);
        }

        if let Ok(stages) = arg.parse::<usize>() {
            if stages == 0 || stages > MAX_SCHEDULE_STAGES {
                return Err(VesicleError::config(format!(
                    "volume schedule length must be in 1..={}, got {}",
                    MAX_SCHEDULE_STAGES, stages
                )));
            }
            return Ok(ActiveConstraint::VolumeSchedule(stages));
        }

        let (key, value) = arg.split_once('=').ok_or_else(|| {
            VesicleError::config(format!(
                "unrecognized constraint `{}`: expected none, area=A, volume=V, com=x,y,z or a stage count",
                arg
            ))
        })?;

        match key.trim().to_ascii_lowercase().as_str() {
            "area" => Ok(ActiveConstraint::Area(parse_positive(key, value)?)),
            "volume" => Ok(ActiveConstraint::Volume(parse_positive(key, value)?)),
            "com" | "center_of_mass" => {
                let coords = value
                    .split(',')
                    .map(|c| parse_finite(key, c))
                    .collect::<Result<Vec<f32>>>()?;
                if coords.len() != 3 {
                    return Err(VesicleError::config(format!(
                        "center of mass needs 3 coordinates, got {}",
                        coords.len()
                    )));
                }
                Ok(ActiveConstraint::CenterOfMass(Point3::new(
                    coords[0], coords[1], coords[2],
                )))
            }
            other => Err(VesicleError::config(format!(
                "unknown constraint kind `{}`",
                other
            ))),
        }
    }

    /// Constraint sets of the successive stages of this run, with the stage
    /// index each one is saved under.
    ///
    /// `reference` is the measured stage-0 shape; only the volume schedule
    /// reads it.
    pub fn stages(&self, reference: &Measurements) -> Vec<(usize, ConstraintSet)> {
        match *self {
            ActiveConstraint::None => vec![(1, ConstraintSet::new())],
            ActiveConstraint::Area(a) => vec![(1, ConstraintSet::new().with(Constraint::area(a)))],
            ActiveConstraint::Volume(v) => {
                vec![(1, ConstraintSet::new().with(Constraint::volume(v)))]
            }
            ActiveConstraint::CenterOfMass(c) => {
                vec![(1, ConstraintSet::new().with(Constraint::center_of_mass(c)))]
            }
            ActiveConstraint::VolumeSchedule(k) => volume_schedule(k, reference.volume)
                .into_iter()
                .enumerate()
                .map(|(i, v)| {
                    let set = ConstraintSet::new()
                        .with(Constraint::area(reference.area))
                        .with(Constraint::volume(v))
                        .with(Constraint::center_of_mass(reference.center_of_mass));
                    (i + 1, set)
                })
                .collect(),
        }
    }

    /// Number of stages after stage 0.
    pub fn stage_count(&self) -> usize {
        match *self {
            ActiveConstraint::VolumeSchedule(k) => k,
            _ => 1,
        }
    }

    /// Label written into the checkpoint of `stage`.
    ///
    /// Schedules of different length share labels, so a longer schedule
    /// can resume from a shorter one.
    pub fn stage_label(&self, stage: usize) -> String {
        format!("{} stage {}", self.label(), stage)
    }

    /// Label used in logs and checkpoint headers.
    pub fn label(&self) -> String {
        match self {
            ActiveConstraint::None => "none".to_string(),
            ActiveConstraint::Area(a) => format!("area={}", a),
            ActiveConstraint::Volume(v) => format!("volume={}", v),
            ActiveConstraint::CenterOfMass(c) => format!("com={},{},{}", c.x, c.y, c.z),
            ActiveConstraint::VolumeSchedule(_) => "volume_schedule".to_string(),
        }
    }
}

/// Volume targets `(1 - j/20) V0` for `j = 1..=stages`.
pub fn volume_schedule(stages: usize, initial_volume: f32) -> Vec<f32> {
    (1..=stages)
        .map(|j| (1.0 - j as f32 / 20.0) * initial_volume)
        .collect()
}

fn parse_finite(key: &str, value: &str) -> Result<f32> {
    let v: f32 = value.trim().parse().map_err(|_| {
        VesicleError::config(format!("`{}` is not a number (for {})", value.trim(), key))
    })?;
    if !v.is_finite() {
        return Err(VesicleError::config(format!("{} must be finite", key)));
    }
    Ok(v)
}

fn parse_positive(key: &str, value: &str) -> Result<f32> {
    let v = parse_finite(key, value)?;
    if v <= 0.0 {
        return Err(VesicleError::config(format!(
            "{} target must be positive, got {}",
            key, v
        )));
    }
    Ok(v)
}

/// Everything a relaxation run needs, resolved before training starts.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Solver configuration.
    pub solver: SolverConfig,
    /// Active constraint.
    pub constraint: ActiveConstraint,
    /// Starting checkpoint; `None` pretrains a sphere first.
    pub initial_checkpoint: Option<PathBuf>,
    /// Directory receiving `stage_N.ckpt` files.
    pub output_dir: PathBuf,
    /// Continue from the latest stage checkpoint in `output_dir`.
    pub resume: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            solver: SolverConfig::default(),
            constraint: ActiveConstraint::None,
            initial_checkpoint: None,
            output_dir: PathBuf::from("checkpoints"),
            resume: false,
        }
    }
}

impl RunConfig {
    /// Build from positional arguments (program name excluded).
    ///
    /// An empty string or `-` leaves a positional at its default.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let resume = args.iter().any(|a| a.as_ref().trim() == "--resume");
        let args: Vec<&str> = args
            .iter()
            .map(|a| a.as_ref().trim())
            .filter(|a| *a != "--resume")
            .collect();
        if let Some(flag) = args.iter().find(|a| a.starts_with("--")) {
            return Err(VesicleError::config(format!("unknown flag `{}`", flag)));
        }
        if args.len() > 4 {
            return Err(VesicleError::config(format!(
                "expected at most 4 arguments, got {}",
                args.len()
            )));
        }
        let arg = |i: usize| args.get(i).copied().filter(|s| !s.is_empty() && *s != "-");

        let mut config = RunConfig {
            resume,
            ..RunConfig::default()
        };
        if let Some(c) = arg(0) {
            config.constraint = ActiveConstraint::from_arg(c)?;
        }
        if let Some(p) = arg(1) {
            config.initial_checkpoint = Some(PathBuf::from(p));
        }
        if let Some(p) = arg(2) {
            config.output_dir = PathBuf::from(p);
        }
        if let Some(p) = arg(3) {
            config.solver = SolverConfig::from_file(&PathBuf::from(p))?;
        }
        config.solver.check()?;
        Ok(config)
    }
}
