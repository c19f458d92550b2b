//! Field network configuration.

use burn::config::Config;

/// Configuration for [`PhaseFieldNet`](crate::field::PhaseFieldNet).
///
/// Hidden layers use sigmoid activations and the output layer a tanh, so the
/// field is smooth to every order and bounded by `(-1, 1)`.
#[derive(Config, Debug, PartialEq)]
pub struct PhaseFieldNetConfig {
    /// Spatial dimension of the input coordinates.
    #[config(default = 3)]
    pub input_dim: usize,

    /// Hidden layer widths.
    #[config(default = "vec![20, 10]")]
    pub hidden_dims: Vec<usize>,

    /// Seed of the weight initialization.
    #[config(default = 0)]
    pub init_seed: u64,
}

impl Default for PhaseFieldNetConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseFieldNetConfig {
    /// Layer widths from input to output, e.g. `[3, 20, 10, 1]`.
    pub fn layer_dims(&self) -> Vec<usize> {
        let mut dims = Vec::with_capacity(self.hidden_dims.len() + 2);
        dims.push(self.input_dim);
        dims.extend_from_slice(&self.hidden_dims);
        dims.push(1);
        dims
    }

    /// Number of scalar parameters (weights and biases).
    pub fn parameter_count(&self) -> usize {
        self.layer_dims()
            .windows(2)
            .map(|w| w[0] * w[1] + w[1])
            .sum()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.input_dim != 3 {
            return Err(format!(
                "input_dim must be 3 for a spatial field, got {}",
                self.input_dim
            ));
        }
        if self.hidden_dims.iter().any(|&d| d == 0) {
            return Err("hidden layer widths must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_architecture() {
        let config = PhaseFieldNetConfig::default();
        assert_eq!(config.layer_dims(), vec![3, 20, 10, 1]);
        // 3*20+20 + 20*10+10 + 10*1+1
        assert_eq!(config.parameter_count(), 80 + 210 + 11);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let config = PhaseFieldNetConfig::new().with_input_dim(2);
        assert!(config.validate().is_err());

        let config = PhaseFieldNetConfig::new().with_hidden_dims(vec![8, 0]);
        assert!(config.validate().is_err());

        let config = PhaseFieldNetConfig::new().with_hidden_dims(vec![]);
        assert_eq!(config.layer_dims(), vec![3, 1]);
        assert!(config.validate().is_ok());
    }
}
