//! Error types for neural_vesicle.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building, training or persisting a phase field.
#[derive(Error, Debug)]
pub enum VesicleError {
    /// Invalid configuration or run argument.
    #[error("invalid configuration: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// No checkpoint at the given path.
    #[error("checkpoint not found: {}", path.display())]
    CheckpointNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// Checkpoint exists but cannot be used.
    #[error("corrupt checkpoint {}: {reason}", path.display())]
    CheckpointCorrupt {
        /// Checkpoint path.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// Tensor shape mismatch.
    #[error("tensor shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        got: Vec<usize>,
    },

    /// Loss or parameters became non-finite.
    #[error("numeric divergence at step {step}: loss = {loss}")]
    NumericDivergence {
        /// Step at which the divergence was detected.
        step: usize,
        /// Offending loss value.
        loss: f32,
    },

    /// Run cancelled between steps.
    #[error("interrupted after {step} steps")]
    Interrupted {
        /// Steps completed before the cancellation was seen.
        step: usize,
    },

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tensor data could not be read back.
    #[error("tensor data error: {message}")]
    TensorData {
        /// Description of the error.
        message: String,
    },
}

impl VesicleError {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        VesicleError::Configuration {
            message: message.into(),
        }
    }

    /// Shorthand for a corrupt checkpoint.
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        VesicleError::CheckpointCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<vesicle_core::VesicleCoreError> for VesicleError {
    fn from(err: vesicle_core::VesicleCoreError) -> Self {
        VesicleError::config(err.to_string())
    }
}

/// Result type for neural_vesicle operations.
pub type Result<T> = std::result::Result<T, VesicleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = VesicleError::NumericDivergence {
            step: 12,
            loss: f32::NAN,
        };
        assert_eq!(err.to_string(), "numeric divergence at step 12: loss = NaN");

        let err = VesicleError::CheckpointNotFound {
            path: PathBuf::from("stage_0.ckpt"),
        };
        assert_eq!(err.to_string(), "checkpoint not found: stage_0.ckpt");

        let err = VesicleError::corrupt("a.ckpt", "bad magic");
        assert_eq!(err.to_string(), "corrupt checkpoint a.ckpt: bad magic");
    }

    #[test]
    fn test_core_error_becomes_configuration() {
        let core = vesicle_core::VesicleCoreError::TooFewPoints {
            points_per_axis: 1,
            min: 2,
        };
        let err: VesicleError = core.into();
        assert!(matches!(err, VesicleError::Configuration { .. }));
    }
}
