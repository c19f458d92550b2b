//! # vesicle_core
//!
//! Pure mathematical building blocks for phase-field vesicle solvers.
//!
//! A vesicle is described by a scalar order parameter `phi(r)` that is `+1`
//! inside the membrane, `-1` outside, and crosses zero on the membrane itself.
//! This crate holds everything about that model that does not need a tensor
//! library: the energy densities, Monte-Carlo quadrature, the constraint
//! bookkeeping, the collocation sampler, and an analytic reference profile.
//!
//! ## Features
//!
//! - **no_std compatible**: only `alloc` is required
//! - **Backend agnostic**: the training crate (`neural_vesicle`) evaluates the
//!   same densities on Burn tensors and can cross-check against this crate
//! - **Reproducible sampling**: seeded, restartable collocation batches
//!
//! ## Feature Flags
//!
//! - `std` (default): implements `std::error::Error` for [`VesicleCoreError`]
//!
//! ## Modules
//!
//! - [`types`]: `Point3`, `Domain`, `CollocationPoint`, `PointTag`
//! - [`density`]: bending, surface and volume densities of the phase field
//! - [`quadrature`]: Monte-Carlo integrals and weighted centroids
//! - [`constraint`]: surface area, volume and center-of-mass constraints
//! - [`sampling`]: fixed-grid and resampled collocation batches
//! - [`profile`]: the tanh sphere profile used as the initial vesicle
//! - [`error`]: error types
//!
//! ## Usage
//!
//! ```ignore
//! use vesicle_core::prelude::*;
//!
//! let domain = Domain::cube(-3.0, 3.0);
//! let settings = SamplerSettings::new(domain, 32).with_mode(SamplingMode::Fixed);
//! let mut sampler = CollocationSampler::new(settings)?;
//! let batch = sampler.next_batch();
//! assert_eq!(batch.len(), 32 * 32 * 32);
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod constraint;
pub mod density;
pub mod error;
pub mod profile;
pub mod quadrature;
pub mod sampling;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::constraint::{Constraint, ConstraintKind, ConstraintSet, ConstraintValue, Measurements};
    pub use crate::density::{
        bending_energy_density, reduced_volume, surface_density, volume_density, PhaseFieldParams,
    };
    pub use crate::error::VesicleCoreError;
    pub use crate::profile::{sphere_profile, ProfileSample};
    pub use crate::quadrature::{monte_carlo_integral, weighted_centroid};
    pub use crate::sampling::{CollocationBatch, CollocationSampler, SamplerSettings, SamplingMode};
    pub use crate::types::{CollocationPoint, Domain, Point3, PointTag};
}

pub use constraint::{Constraint, ConstraintKind, ConstraintSet, ConstraintValue, Measurements};
pub use density::{
    bending_energy_density, reduced_volume, surface_density, volume_density, PhaseFieldParams,
};
pub use error::VesicleCoreError;
pub use profile::{sphere_profile, ProfileSample};
pub use quadrature::{monte_carlo_integral, weighted_centroid};
pub use sampling::{CollocationBatch, CollocationSampler, SamplerSettings, SamplingMode};
pub use types::{CollocationPoint, Domain, Point3, PointTag};

/// Area of the unit sphere, `4π`.
pub const UNIT_SPHERE_AREA: f32 = 4.0 * core::f32::consts::PI;

/// Volume of the unit sphere, `4π/3`.
pub const UNIT_SPHERE_VOLUME: f32 = 4.0 * core::f32::consts::PI / 3.0;
