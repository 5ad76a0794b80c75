//! Physics body abstraction.
//!
//! The grasp core never owns the simulated body. It reads and nudges it
//! through [`PhysicsBody`], which any engine binding can implement.
//! [`SimBody`] is a minimal headless implementation.

use grasp_types::{Pose, Twist};
use nalgebra::{Point3, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The view of a rigid body the grasp core needs.
///
/// Velocity changes are mass-independent: they add directly to the body's
/// velocity. Implementations must ignore them while the body is kinematic.
pub trait PhysicsBody {
    /// Current pose of the body origin.
    fn pose(&self) -> Pose;

    /// Current velocity. The linear part is the centre-of-mass velocity.
    fn twist(&self) -> Twist;

    /// Whether the body is driven externally and ignores velocity changes.
    fn is_kinematic(&self) -> bool;

    /// Add an instantaneous linear velocity change.
    fn add_linear_velocity_change(&mut self, delta: Vector3<f64>);

    /// Add an instantaneous angular velocity change.
    fn add_angular_velocity_change(&mut self, delta: Vector3<f64>);

    /// Overwrite the angular velocity.
    fn set_angular_velocity(&mut self, omega: Vector3<f64>);

    /// Centre of mass in body-local coordinates.
    fn center_of_mass(&self) -> Vector3<f64>;

    /// Move the centre of mass to a body-local offset.
    fn set_center_of_mass(&mut self, local: Vector3<f64>);

    /// Restore the centre of mass the body was built with.
    fn reset_center_of_mass(&mut self);

    /// Whether gravity acts on the body.
    fn gravity_enabled(&self) -> bool;

    /// Enable or disable gravity.
    fn set_gravity_enabled(&mut self, enabled: bool);
}

/// A free-floating rigid body integrated with semi-implicit Euler.
///
/// Rotation happens about the centre of mass, so moving the centre of mass
/// onto a grasp point makes the body pivot around that point.
///
/// # Example
///
/// ```
/// use grasp_core::{PhysicsBody, SimBody};
/// use grasp_types::Pose;
/// use nalgebra::{Point3, Vector3};
///
/// let mut body = SimBody::new(Pose::from_position(Point3::new(0.0, 0.0, 1.0)));
/// body.add_linear_velocity_change(Vector3::new(1.0, 0.0, 0.0));
/// body.step(0.5, &Vector3::zeros());
/// assert!((body.pose().position.x - 0.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimBody {
    /// Pose of the body origin.
    pub pose: Pose,
    /// Linear (centre of mass) and angular velocity, world frame.
    pub twist: Twist,
    /// Current centre of mass, body-local.
    pub center_of_mass: Vector3<f64>,
    /// Centre of mass the body was built with, body-local.
    pub natural_center_of_mass: Vector3<f64>,
    /// Whether gravity acts on the body.
    pub use_gravity: bool,
    /// Whether the body ignores velocity changes and integration.
    pub is_kinematic: bool,
}

impl SimBody {
    /// Create a dynamic body at rest with gravity enabled.
    #[must_use]
    pub fn new(pose: Pose) -> Self {
        Self {
            pose,
            twist: Twist::zero(),
            center_of_mass: Vector3::zeros(),
            natural_center_of_mass: Vector3::zeros(),
            use_gravity: true,
            is_kinematic: false,
        }
    }

    /// Set the natural centre of mass (body-local).
    #[must_use]
    pub fn with_center_of_mass(mut self, local: Vector3<f64>) -> Self {
        self.center_of_mass = local;
        self.natural_center_of_mass = local;
        self
    }

    /// Set the initial velocity.
    #[must_use]
    pub fn with_twist(mut self, twist: Twist) -> Self {
        self.twist = twist;
        self
    }

    /// Make the body kinematic.
    #[must_use]
    pub fn kinematic(mut self) -> Self {
        self.is_kinematic = true;
        self
    }

    /// Centre of mass in world coordinates.
    #[must_use]
    pub fn world_center_of_mass(&self) -> Point3<f64> {
        self.pose.transform_point(&Point3::from(self.center_of_mass))
    }

    /// Advance the body by `dt` seconds.
    ///
    /// Velocity is updated first (gravity, if enabled), then the centre of
    /// mass is translated and the orientation rotated about it.
    pub fn step(&mut self, dt: f64, gravity: &Vector3<f64>) {
        if self.is_kinematic {
            return;
        }

        if self.use_gravity {
            self.twist.linear += gravity * dt;
        }

        let com = self.world_center_of_mass() + self.twist.linear * dt;

        let omega = self.twist.angular;
        if omega.norm() > 1e-12 {
            // World-frame angular velocity, so the increment multiplies on the left
            self.pose.rotation = UnitQuaternion::from_scaled_axis(omega * dt) * self.pose.rotation;
        }

        self.pose.position = com - self.pose.rotation * self.center_of_mass;
    }
}

impl PhysicsBody for SimBody {
    fn pose(&self) -> Pose {
        self.pose
    }

    fn twist(&self) -> Twist {
        self.twist
    }

    fn is_kinematic(&self) -> bool {
        self.is_kinematic
    }

    fn add_linear_velocity_change(&mut self, delta: Vector3<f64>) {
        if !self.is_kinematic {
            self.twist.linear += delta;
        }
    }

    fn add_angular_velocity_change(&mut self, delta: Vector3<f64>) {
        if !self.is_kinematic {
            self.twist.angular += delta;
        }
    }

    fn set_angular_velocity(&mut self, omega: Vector3<f64>) {
        if !self.is_kinematic {
            self.twist.angular = omega;
        }
    }

    fn center_of_mass(&self) -> Vector3<f64> {
        self.center_of_mass
    }

    fn set_center_of_mass(&mut self, local: Vector3<f64>) {
        self.center_of_mass = local;
    }

    fn reset_center_of_mass(&mut self) {
        self.center_of_mass = self.natural_center_of_mass;
    }

    fn gravity_enabled(&self) -> bool {
        self.use_gravity
    }

    fn set_gravity_enabled(&mut self, enabled: bool) {
        self.use_gravity = enabled;
    }
}
