//! Energy functional of the phase field.
//!
//! [`densities`] holds the pointwise densities as tensor ops; [`EnergyFunctional`]
//! integrates them over a collocation batch and adds the constraint penalties.

pub mod densities;
mod functional;

pub use functional::{EnergyFunctional, EnergySummary, EnergyTerms, LossComponents};
