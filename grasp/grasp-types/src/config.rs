//! Configuration for grasp solving and velocity matching.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which timestep the rotational correction is divided by.
///
/// The translational correction always uses the fixed physics step, since the
/// impulse is applied once per fixed step. The rotational correction can
/// either follow the same basis or use the per-call frame delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TimestepBasis {
    /// Use the fixed physics step for both corrections.
    #[default]
    Fixed,
    /// Use the per-call frame delta for the rotational correction.
    Frame,
}

/// Main configuration for a grasp controller.
///
/// # Example
///
/// ```
/// use grasp_types::{GraspConfig, TimestepBasis};
///
/// let config = GraspConfig::realtime()
///     .up_blend_weight(0.5)
///     .max_angular_speed(20.0);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.timestep_basis, TimestepBasis::Fixed);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GraspConfig {
    /// Fixed physics timestep (seconds).
    pub fixed_timestep: f64,
    /// Timestep basis for the rotational correction.
    pub timestep_basis: TimestepBasis,
    /// Rotation angles below this (degrees) count as already aligned.
    pub rotation_epsilon: f64,
    /// Weight of the secondary anchor's up vector when blending two anchors.
    pub up_blend_weight: f64,
    /// Attach at the raw query pose when attachment groups exist but none
    /// accepts the query.
    pub free_attach_on_miss: bool,
    /// Clamp on the target linear speed (m/s).
    pub max_linear_speed: Option<f64>,
    /// Clamp on the target angular speed (rad/s).
    pub max_angular_speed: Option<f64>,
}

impl Default for GraspConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 50.0,
            timestep_basis: TimestepBasis::Fixed,
            rotation_epsilon: 1e-4,
            up_blend_weight: 0.3,
            free_attach_on_miss: false,
            max_linear_speed: None,
            max_angular_speed: None,
        }
    }
}

impl GraspConfig {
    /// Create a config with the given fixed timestep.
    #[must_use]
    pub fn with_timestep(fixed_timestep: f64) -> Self {
        Self {
            fixed_timestep,
            ..Default::default()
        }
    }

    /// Configuration for a 60 Hz physics loop.
    #[must_use]
    pub fn realtime() -> Self {
        Self::with_timestep(1.0 / 60.0)
    }

    /// Configuration for a 90 Hz physics loop, matching common headset refresh rates.
    #[must_use]
    pub fn high_rate() -> Self {
        Self::with_timestep(1.0 / 90.0)
    }

    /// Set the rotational timestep basis.
    #[must_use]
    pub fn timestep_basis(mut self, basis: TimestepBasis) -> Self {
        self.timestep_basis = basis;
        self
    }

    /// Set the rotation epsilon (degrees).
    #[must_use]
    pub fn rotation_epsilon(mut self, degrees: f64) -> Self {
        self.rotation_epsilon = degrees;
        self
    }

    /// Set the secondary anchor's up-vector weight.
    #[must_use]
    pub fn up_blend_weight(mut self, weight: f64) -> Self {
        self.up_blend_weight = weight;
        self
    }

    /// Allow attaching at the raw query pose when no point accepts it.
    #[must_use]
    pub fn free_attach_on_miss(mut self, enabled: bool) -> Self {
        self.free_attach_on_miss = enabled;
        self
    }

    /// Clamp the target linear speed.
    #[must_use]
    pub fn max_linear_speed(mut self, speed: f64) -> Self {
        self.max_linear_speed = Some(speed);
        self
    }

    /// Clamp the target angular speed.
    #[must_use]
    pub fn max_angular_speed(mut self, speed: f64) -> Self {
        self.max_angular_speed = Some(speed);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.fixed_timestep.is_finite() || self.fixed_timestep <= 0.0 {
            return Err(crate::GraspError::InvalidTimestep(self.fixed_timestep));
        }

        if self.fixed_timestep > 1.0 {
            return Err(crate::GraspError::invalid_config(
                "fixed_timestep > 1 second is likely an error",
            ));
        }

        if !(0.0..=1.0).contains(&self.up_blend_weight) {
            return Err(crate::GraspError::InvalidBlendWeight(self.up_blend_weight));
        }

        if !self.rotation_epsilon.is_finite() || self.rotation_epsilon < 0.0 {
            return Err(crate::GraspError::invalid_config(
                "rotation_epsilon must be finite and non-negative",
            ));
        }

        for (name, limit) in [
            ("max_linear_speed", self.max_linear_speed),
            ("max_angular_speed", self.max_angular_speed),
        ] {
            if let Some(limit) = limit {
                if !limit.is_finite() || limit <= 0.0 {
                    return Err(crate::GraspError::invalid_config(format!(
                        "{name} must be positive and finite"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Physics frequency in Hz.
    #[must_use]
    pub fn frequency(&self) -> f64 {
        1.0 / self.fixed_timestep
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_config() {
        let config = GraspConfig::default();
        assert!(config.validate().is_ok());
        assert_relative_eq!(config.frequency(), 50.0, epsilon = 1e-9);
        assert_eq!(config.up_blend_weight, 0.3);
        assert_eq!(config.timestep_basis, TimestepBasis::Fixed);
    }

    #[test]
    fn test_presets() {
        assert_relative_eq!(GraspConfig::realtime().frequency(), 60.0, epsilon = 1e-9);
        assert_relative_eq!(GraspConfig::high_rate().frequency(), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_timestep() {
        for bad in [0.0, -0.01, f64::NAN, f64::INFINITY] {
            let err = GraspConfig::with_timestep(bad).validate().unwrap_err();
            assert!(err.is_config_error());
        }
        assert!(GraspConfig::with_timestep(2.0).validate().is_err());
    }

    #[test]
    fn test_invalid_blend_weight() {
        let err = GraspConfig::default()
            .up_blend_weight(1.5)
            .validate()
            .unwrap_err();
        assert_eq!(err, crate::GraspError::InvalidBlendWeight(1.5));
    }

    #[test]
    fn test_invalid_limits() {
        assert!(GraspConfig::default().max_linear_speed(0.0).validate().is_err());
        assert!(
            GraspConfig::default()
                .max_angular_speed(f64::NAN)
                .validate()
                .is_err()
        );
        assert!(GraspConfig::default().rotation_epsilon(-1.0).validate().is_err());
    }
}
