//! Error types for vesicle_core operations.
//!
//! A plain enum with a manual `Display`, so the crate stays `no_std`.

use core::fmt;

/// Errors that can occur in vesicle_core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VesicleCoreError {
    /// The domain box is empty or inverted along an axis.
    InvalidDomain {
        /// Axis index (0 = x, 1 = y, 2 = z).
        axis: u8,
        /// Lower bound along that axis.
        min: f32,
        /// Upper bound along that axis.
        max: f32,
    },
    /// Too few points per axis to estimate area and volume integrals.
    TooFewPoints {
        /// Points per axis requested.
        points_per_axis: usize,
        /// Minimum accepted value.
        min: usize,
    },
    /// Two slices that must be parallel have different lengths.
    LengthMismatch {
        /// Expected length.
        expected: usize,
        /// Actual length.
        got: usize,
    },
    /// A phase-field parameter is out of its valid range.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f32,
    },
}

impl fmt::Display for VesicleCoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VesicleCoreError::InvalidDomain { axis, min, max } => {
                write!(f, "invalid domain along axis {}: [{}, {}]", axis, min, max)
            }
            VesicleCoreError::TooFewPoints {
                points_per_axis,
                min,
            } => {
                write!(
                    f,
                    "{} points per axis is too few, need at least {}",
                    points_per_axis, min
                )
            }
            VesicleCoreError::LengthMismatch { expected, got } => {
                write!(f, "length mismatch: expected {}, got {}", expected, got)
            }
            VesicleCoreError::InvalidParameter { name, value } => {
                write!(f, "invalid value {} for parameter `{}`", value, name)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for VesicleCoreError {}
