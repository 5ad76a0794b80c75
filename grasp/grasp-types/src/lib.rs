//! Core types for physics-driven grasping.
//!
//! This crate provides the data shared by the grasp solver and its
//! collaborators:
//!
//! - [`Pose`] - Position and orientation of bodies, attachment points, anchors
//! - [`Twist`] - Linear and angular velocity of a rigid body
//! - [`AnchorId`], [`GroupId`], [`PointId`] - Identifiers
//! - [`GraspConfig`] - Timestep, blending, and clamping settings
//!
//! # Layer 0
//!
//! These types are pure data with no engine dependencies. Input polling,
//! scene wiring, and rendering live elsewhere and talk to the grasp core
//! through these types.
//!
//! # Coordinate System
//!
//! Consistent with the CortenForge ecosystem:
//!
//! - X: right
//! - Y: forward
//! - Z: up
//! - Right-handed
//!
//! # Example
//!
//! ```
//! use grasp_types::{AnchorId, Pose};
//! use nalgebra::Point3;
//!
//! let target = Pose::from_position(Point3::new(0.0, 0.3, 1.2));
//! assert_eq!(AnchorId::Left.other(), AnchorId::Right);
//! assert!(target.is_finite());
//! ```

#![doc(html_root_url = "https://docs.rs/grasp-types/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

mod config;
mod error;
mod ids;
mod pose;

pub use config::{GraspConfig, TimestepBasis};
pub use error::GraspError;
pub use ids::{AnchorId, GroupId, PointId};
pub use pose::{Pose, Twist};

// Re-export math types for convenience
pub use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector3};

/// Result type for grasp setup operations.
pub type Result<T> = std::result::Result<T, GraspError>;
