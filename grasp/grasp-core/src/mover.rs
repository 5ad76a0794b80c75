//! Velocity-matching mover.
//!
//! Drives a dynamic body toward a desired pose by setting, once per fixed
//! physics step, the velocity that would carry it there in one step. The
//! correction is applied as a mass-independent velocity change, so the body
//! keeps interacting with the rest of the simulation instead of teleporting.
//!
//! # Translation
//!
//! ```text
//! needed = (desired.position - current.position) / fixed_dt
//! Δv     = needed - current.linear_velocity
//! ```
//!
//! # Rotation
//!
//! ```text
//! change       = desired.rotation * current.rotation⁻¹
//! (angle, axis) = raw angle-axis of change, angle in [0°, 360°)
//! angle        = angle - 360°   if angle > 180°
//! Δω           = axis * radians(angle) / dt - current.angular_velocity
//! ```
//!
//! The wrap keeps the body turning the short way round. An angle within the
//! epsilon zeroes the angular velocity outright.

use grasp_types::{GraspConfig, Pose, TimestepBasis};
use nalgebra::{UnitQuaternion, Vector3};
use tracing::trace;

use crate::body::PhysicsBody;

/// What the mover did to a body in one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityCorrection {
    /// Linear velocity the body should have after the step.
    pub target_linear: Vector3<f64>,
    /// Linear velocity change applied.
    pub linear_change: Vector3<f64>,
    /// Angular velocity the body should have after the step.
    pub target_angular: Vector3<f64>,
    /// Angular velocity change applied.
    pub angular_change: Vector3<f64>,
    /// Shortest-path rotation angle (degrees), signed about the extracted axis.
    pub angle_degrees: f64,
    /// Whether the rotation was within epsilon and angular velocity was zeroed.
    pub aligned: bool,
}

/// Converts desired poses into per-step velocity changes.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityMatchingMover {
    fixed_timestep: f64,
    timestep_basis: TimestepBasis,
    rotation_epsilon: f64,
    max_linear_speed: Option<f64>,
    max_angular_speed: Option<f64>,
    last_correction: Option<VelocityCorrection>,
}

impl VelocityMatchingMover {
    /// Create a mover from a configuration.
    ///
    /// Fails if the configuration does not validate, so the fixed timestep is
    /// always positive and finite.
    pub fn new(config: &GraspConfig) -> grasp_types::Result<Self> {
        config.validate()?;
        Ok(Self {
            fixed_timestep: config.fixed_timestep,
            timestep_basis: config.timestep_basis,
            rotation_epsilon: config.rotation_epsilon,
            max_linear_speed: config.max_linear_speed,
            max_angular_speed: config.max_angular_speed,
            last_correction: None,
        })
    }

    /// Fixed physics timestep (seconds).
    #[must_use]
    pub fn fixed_timestep(&self) -> f64 {
        self.fixed_timestep
    }

    /// The most recent correction, cleared by [`reset`](Self::reset).
    #[must_use]
    pub fn last_correction(&self) -> Option<&VelocityCorrection> {
        self.last_correction.as_ref()
    }

    /// Forget the last correction.
    pub fn reset(&mut self) {
        self.last_correction = None;
    }

    /// Apply one step of velocity matching toward `desired`.
    ///
    /// `frame_dt` is only used for the rotational correction under
    /// [`TimestepBasis::Frame`]. Kinematic bodies are left untouched and
    /// `None` is returned.
    pub fn apply<B>(
        &mut self,
        body: &mut B,
        desired: &Pose,
        frame_dt: f64,
    ) -> Option<VelocityCorrection>
    where
        B: PhysicsBody + ?Sized,
    {
        if body.is_kinematic() {
            trace!("body is kinematic, skipping velocity matching");
            return None;
        }

        let current = body.pose();
        let twist = body.twist();

        let move_vector = desired.position - current.position;
        let target_linear = clamp_norm(move_vector / self.fixed_timestep, self.max_linear_speed);
        let linear_change = target_linear - twist.linear;
        body.add_linear_velocity_change(linear_change);

        let change = desired.rotation * current.rotation.inverse();
        let (raw_angle, axis) = raw_angle_axis(&change);
        let angle = shortest_angle(raw_angle);

        let correction = if angle.abs() < self.rotation_epsilon {
            body.set_angular_velocity(Vector3::zeros());
            VelocityCorrection {
                target_linear,
                linear_change,
                target_angular: Vector3::zeros(),
                angular_change: -twist.angular,
                angle_degrees: angle,
                aligned: true,
            }
        } else {
            let dt = self.rotation_timestep(frame_dt);
            let target_angular = clamp_norm(axis * angle.to_radians() / dt, self.max_angular_speed);
            let angular_change = target_angular - twist.angular;
            body.add_angular_velocity_change(angular_change);
            VelocityCorrection {
                target_linear,
                linear_change,
                target_angular,
                angular_change,
                angle_degrees: angle,
                aligned: false,
            }
        };

        trace!(
            distance = move_vector.norm(),
            angle = correction.angle_degrees,
            aligned = correction.aligned,
            "velocity correction"
        );

        self.last_correction = Some(correction);
        Some(correction)
    }

    fn rotation_timestep(&self, frame_dt: f64) -> f64 {
        match self.timestep_basis {
            TimestepBasis::Frame if frame_dt.is_finite() && frame_dt > 0.0 => frame_dt,
            _ => self.fixed_timestep,
        }
    }
}

/// Angle (degrees, in `[0, 360)`) and unit axis of a rotation, read straight
/// off the quaternion without choosing the shorter of `q` and `-q`.
///
/// A rotation with no defined axis reports +X.
#[must_use]
pub fn raw_angle_axis(rotation: &UnitQuaternion<f64>) -> (f64, Vector3<f64>) {
    let q = rotation.quaternion();
    let angle = 2.0 * q.scalar().clamp(-1.0, 1.0).acos();
    let axis = q.imag().try_normalize(1e-12).unwrap_or_else(Vector3::x);
    (angle.to_degrees(), axis)
}

/// Map an angle in `[0, 360)` degrees to the equivalent in `(-180, 180]`.
#[must_use]
pub fn shortest_angle(degrees: f64) -> f64 {
    if degrees > 180.0 {
        degrees - 360.0
    } else {
        degrees
    }
}

fn clamp_norm(v: Vector3<f64>, limit: Option<f64>) -> Vector3<f64> {
    match limit {
        Some(max) if v.norm() > max => v * (max / v.norm()),
        _ => v,
    }
}
