//! Error types for grasp configuration and setup.

use thiserror::Error;

use crate::GroupId;

/// Errors raised while configuring a grasp controller or its attachment set.
///
/// Per-tick operations never fail; they report outcomes through return
/// values instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraspError {
    /// Invalid timestep.
    #[error("invalid timestep: {0} (must be positive and finite)")]
    InvalidTimestep(f64),

    /// Blend weight outside `[0, 1]`.
    #[error("invalid up-vector blend weight: {0} (must be in [0, 1])")]
    InvalidBlendWeight(f64),

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// Attachment group not found.
    #[error("attachment group not found: {0}")]
    GroupNotFound(GroupId),

    /// Attachment point pose is not finite.
    #[error("attachment point '{name}' has a non-finite local pose")]
    NonFinitePoint {
        /// Name of the offending point.
        name: String,
    },
}

impl GraspError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Check if this is a configuration error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. } | Self::InvalidTimestep(_) | Self::InvalidBlendWeight(_)
        )
    }
}
