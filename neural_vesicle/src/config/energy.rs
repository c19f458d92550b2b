//! Energy functional configuration.

use burn::config::Config;
use vesicle_core::PhaseFieldParams;

/// Material parameters and penalty weights of the energy functional.
///
/// A weight of zero removes the corresponding penalty term entirely.
#[derive(Config, Debug, PartialEq)]
pub struct EnergyConfig {
    /// Interface thickness `eps`.
    #[config(default = 0.25)]
    pub epsilon: f32,

    /// Spontaneous curvature `c0`.
    #[config(default = 0.0)]
    pub spontaneous_curvature: f32,

    /// Weight of the surface area penalty.
    #[config(default = 1.0e3)]
    pub area_weight: f32,

    /// Weight of the volume penalty.
    #[config(default = 1.0e3)]
    pub volume_weight: f32,

    /// Weight of the center-of-mass penalty.
    #[config(default = 1.0e1)]
    pub center_of_mass_weight: f32,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EnergyConfig {
    /// Phase-field parameters for the scalar densities.
    pub fn params(&self) -> PhaseFieldParams {
        PhaseFieldParams::new(self.epsilon, self.spontaneous_curvature)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.params().validate().map_err(|e| e.to_string())?;

        for (name, w) in [
            ("area_weight", self.area_weight),
            ("volume_weight", self.volume_weight),
            ("center_of_mass_weight", self.center_of_mass_weight),
        ] {
            if !(w.is_finite() && w >= 0.0) {
                return Err(format!("{} must be finite and non-negative, got {}", name, w));
            }
        }
        Ok(())
    }
}
