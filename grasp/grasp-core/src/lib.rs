//! Anchor-driven grasping of physically simulated bodies.
//!
//! This crate computes, every physics step, where a held body should be and
//! steers it there with velocity changes rather than teleports, so it keeps
//! colliding and stacking like any other dynamic body. It builds on
//! [`grasp_types`] for the data structures.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     GraspController                          │
//! │  Owns: anchor slots, attachment set, primary anchor          │
//! │  Handles: attach / release / retarget / tick                 │
//! └──────────────┬───────────────────────────────┬──────────────┘
//!                │                               │
//!                ▼                               ▼
//! ┌─────────────────────────────┐ ┌─────────────────────────────┐
//! │        GraspSolver          │ │    VelocityMatchingMover    │
//! │  anchors → desired pose     │ │  desired pose → Δv, Δω      │
//! │  single / two-anchor blend  │ │  shortest-path rotation     │
//! └─────────────────────────────┘ └──────────────┬──────────────┘
//!                                                │
//!                                                ▼
//!                               ┌─────────────────────────────┐
//!                               │     impl PhysicsBody        │
//!                               │  engine binding / SimBody   │
//!                               └─────────────────────────────┘
//! ```
//!
//! # Tick ordering
//!
//! Within a physics step the input side first refreshes anchor targets
//! ([`GraspController::update_anchor_target`]), then the physics side calls
//! [`GraspController::tick`] per anchor (or [`GraspController::step`]). The
//! solver runs to completion before the mover touches the body. Everything is
//! synchronous and single-threaded.
//!
//! # Quick Start
//!
//! ```
//! use grasp_core::attachment::{Acceptance, AttachmentGroup, AttachmentSet};
//! use grasp_core::{GraspController, SimBody};
//! use grasp_types::{AnchorId, GraspConfig, Pose};
//! use nalgebra::{Point3, Vector3};
//!
//! // A crate with one handle on its lid
//! let handles = AttachmentSet::new()
//!     .with_group(AttachmentGroup::new("lid").with_point(
//!         "handle",
//!         Pose::from_position(Point3::new(0.0, 0.0, 0.3)),
//!         Acceptance::any().within(0.1),
//!     ))
//!     .unwrap();
//!
//! let config = GraspConfig::realtime();
//! let dt = config.fixed_timestep;
//! let mut controller = GraspController::new(config, handles).unwrap();
//! let mut body = SimBody::new(Pose::identity());
//!
//! let hand = Pose::from_position(Point3::new(0.0, 0.05, 0.3));
//! let outcome = controller.try_attach(&mut body, AnchorId::Left, hand, Vector3::z());
//! assert!(outcome.accepted);
//!
//! // Lift the hand 20 cm
//! let lifted = Pose::from_position(Point3::new(0.0, 0.0, 0.5));
//! controller.update_anchor_target(AnchorId::Left, lifted, Vector3::z());
//! controller.step(&mut body, dt);
//! body.step(dt, &Vector3::new(0.0, 0.0, -9.81));
//!
//! assert!((body.pose.position.z - 0.2).abs() < 1e-9);
//! ```

#![doc(html_root_url = "https://docs.rs/grasp-core/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::missing_errors_doc,
    clippy::similar_names
)]

pub mod anchor;
pub mod attachment;
pub mod body;
pub mod controller;
pub mod mover;
pub mod solver;

pub use anchor::{AnchorSlots, AnchorState, Attachment};
pub use attachment::{
    Acceptance, AcceptedAnchors, AttachmentGroup, AttachmentPoint, AttachmentPolicy,
    AttachmentSet, InputEvent, InputReaction, Resolution,
};
pub use body::{PhysicsBody, SimBody};
pub use controller::{AttachOutcome, GraspController, TickReport};
pub use mover::{VelocityCorrection, VelocityMatchingMover, raw_angle_axis, shortest_angle};
pub use solver::{BlendAxes, DesiredPose, GraspSolver, SolveMode, look_rotation};

// Re-export the types crate for convenience
pub use grasp_types;
