//! Flat, backend-independent snapshot of network parameters.

use serde::{Deserialize, Serialize};

/// One weight matrix or bias vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamTensor {
    /// Tensor shape: `[in, out]` for weights, `[out]` for biases.
    pub shape: Vec<usize>,
    /// Row-major values.
    pub values: Vec<f32>,
}

impl ParamTensor {
    /// Create a tensor snapshot.
    pub fn new(shape: Vec<usize>, values: Vec<f32>) -> Self {
        Self { shape, values }
    }

    /// Number of elements implied by the shape.
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Parameters of a fully connected network in layer order, weight then bias.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    /// Layer widths from input to output.
    pub layer_dims: Vec<usize>,
    /// `2 * (layer_dims.len() - 1)` tensors.
    pub tensors: Vec<ParamTensor>,
}

impl ParameterSet {
    /// Shapes every tensor must have for the given layer widths.
    pub fn expected_shapes(layer_dims: &[usize]) -> Vec<Vec<usize>> {
        layer_dims
            .windows(2)
            .flat_map(|w| [vec![w[0], w[1]], vec![w[1]]])
            .collect()
    }

    /// Scalar count for the given layer widths.
    pub fn count_for(layer_dims: &[usize]) -> usize {
        layer_dims.windows(2).map(|w| w[0] * w[1] + w[1]).sum()
    }

    /// Total number of scalars.
    pub fn parameter_count(&self) -> usize {
        self.tensors.iter().map(|t| t.values.len()).sum()
    }

    /// True if every value is finite.
    pub fn all_finite(&self) -> bool {
        self.tensors
            .iter()
            .all(|t| t.values.iter().all(|v| v.is_finite()))
    }

    /// Every value in order, as stored in a checkpoint payload.
    pub fn flatten(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.parameter_count());
        for t in &self.tensors {
            out.extend_from_slice(&t.values);
        }
        out
    }

    /// Split a flat payload back into tensors for the given layer widths.
    ///
    /// Returns `None` if the length does not match.
    pub fn unflatten(layer_dims: &[usize], values: &[f32]) -> Option<Self> {
        if values.len() != Self::count_for(layer_dims) {
            return None;
        }
        let mut offset = 0;
        let tensors = Self::expected_shapes(layer_dims)
            .into_iter()
            .map(|shape| {
                let n: usize = shape.iter().product();
                let t = ParamTensor::new(shape, values[offset..offset + n].to_vec());
                offset += n;
                t
            })
            .collect();
        Some(Self {
            layer_dims: layer_dims.to_vec(),
            tensors,
        })
    }

    /// Check that shapes and value counts agree with `layer_dims`.
    pub fn validate(&self) -> Result<(), String> {
        if self.layer_dims.len() < 2 {
            return Err(format!(
                "need at least input and output widths, got {:?}",
                self.layer_dims
            ));
        }
        let expected = Self::expected_shapes(&self.layer_dims);
        if expected.len() != self.tensors.len() {
            return Err(format!(
                "expected {} tensors for layers {:?}, got {}",
                expected.len(),
                self.layer_dims,
                self.tensors.len()
            ));
        }
        for (i, (shape, t)) in expected.iter().zip(&self.tensors).enumerate() {
            if &t.shape != shape || t.values.len() != t.numel() {
                return Err(format!(
                    "tensor {} has shape {:?} with {} values, expected {:?}",
                    i,
                    t.shape,
                    t.values.len(),
                    shape
                ));
            }
        }
        Ok(())
    }
}
