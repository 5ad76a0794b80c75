//! Grasp transform solver.
//!
//! Turns anchor targets into the pose the body should adopt this tick.
//!
//! # Single anchor
//!
//! The body moves by exactly what the held attachment point needs:
//!
//! ```text
//! position    = body.position + (target.position - attachment.position)
//! orientation = (target.rotation * attachment.rotation⁻¹) * body.rotation
//! ```
//!
//! The rotation delta is the one aligning the *attachment*, not the body
//! origin, so an off-centre handle turns the body the way the hand turns.
//!
//! # Two anchors
//!
//! When both anchors hold the body and the attachment policies allow it, the
//! orientation follows the line between the two grasp points instead:
//!
//! ```text
//! axis        = secondary.position - main.position
//! target_axis = normalize(secondary_target - main.position) * |axis|
//! up          = lerp(main_up, secondary_up, w)
//! delta       = look(target_axis, up) * look(axis, main.up)⁻¹
//! ```
//!
//! The target axis keeps the current length, so the body neither stretches nor
//! shrinks however far apart the anchors drift. Position still follows the
//! main anchor.

use grasp_types::{AnchorId, Pose};
use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};
use tracing::trace;

use crate::anchor::{AnchorSlots, AnchorState};
use crate::attachment::AttachmentSet;

/// Below this length a direction is treated as undefined.
const DIRECTION_EPSILON: f64 = 1e-9;

/// How a desired pose was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMode {
    /// From the primary anchor alone.
    Single,
    /// Orientation blended from both anchors.
    Blended,
}

/// The pose the body should adopt this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DesiredPose {
    /// Target pose of the body origin.
    pub pose: Pose,
    /// Which rule produced it.
    pub mode: SolveMode,
}

/// Intermediate vectors of the two-anchor blend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendAxes {
    /// Current main-to-secondary attachment vector.
    pub current: Vector3<f64>,
    /// Where that vector should point, at the same length.
    pub target: Vector3<f64>,
    /// Blended up hint for the target frame.
    pub up: Vector3<f64>,
}

/// Computes desired body poses from anchor state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraspSolver {
    up_blend_weight: f64,
}

impl Default for GraspSolver {
    fn default() -> Self {
        Self {
            up_blend_weight: 0.3,
        }
    }
}

impl GraspSolver {
    /// Create a solver. `up_blend_weight` is the secondary anchor's share of
    /// the blended up vector.
    #[must_use]
    pub fn new(up_blend_weight: f64) -> Self {
        Self { up_blend_weight }
    }

    /// Secondary anchor's share of the blended up vector.
    #[must_use]
    pub fn up_blend_weight(&self) -> f64 {
        self.up_blend_weight
    }

    /// Desired pose for a single anchor.
    ///
    /// `attachment` is the held point's current world pose, `target` the
    /// anchor's latest pose, `body` the body's current pose.
    #[must_use]
    pub fn single_anchor_pose(attachment: &Pose, target: &Pose, body: &Pose) -> Pose {
        let position = body.position + (target.position - attachment.position);
        let delta = target.rotation * attachment.rotation.inverse();
        Pose::from_position_rotation(position, delta * body.rotation)
    }

    /// Whether two anchors should blend their influence.
    ///
    /// Both must be attached and both attachments must allow two-anchor
    /// movement. Points of the same group additionally need the group's
    /// two-anchor grab permission. Free attachments count as a group of their
    /// own.
    #[must_use]
    pub fn blending_applies(
        set: &AttachmentSet,
        main: &AnchorState,
        secondary: &AnchorState,
    ) -> bool {
        let (Some(main), Some(secondary)) = (main.attachment(), secondary.attachment()) else {
            return false;
        };
        let (Some(main_policy), Some(secondary_policy)) = (main.policy(set), secondary.policy(set))
        else {
            return false;
        };
        if !main_policy.allows_two_anchor_movement || !secondary_policy.allows_two_anchor_movement {
            return false;
        }
        match (main.group(set), secondary.group(set)) {
            (Some(a), Some(b)) if a == b => main_policy.allows_two_anchor_grab,
            _ => true,
        }
    }

    /// The current and target inter-anchor vectors.
    ///
    /// Returns `None` when both attachments coincide, since no axis exists.
    #[must_use]
    pub fn blend_axes(
        &self,
        main_attachment: &Pose,
        secondary_attachment: &Pose,
        main: &AnchorState,
        secondary: &AnchorState,
    ) -> Option<BlendAxes> {
        let current = secondary_attachment.position - main_attachment.position;
        let length = current.norm();
        if length < DIRECTION_EPSILON {
            return None;
        }

        let toward = secondary.target.position - main_attachment.position;
        let target = toward
            .try_normalize(DIRECTION_EPSILON)
            .map_or(current, |dir| dir * length);

        let up = main.target_up.lerp(&secondary.target_up, self.up_blend_weight);

        Some(BlendAxes {
            current,
            target,
            up,
        })
    }

    /// Body orientation from both anchors, or `None` if no axis exists.
    #[must_use]
    pub fn two_anchor_orientation(
        &self,
        main_attachment: &Pose,
        secondary_attachment: &Pose,
        main: &AnchorState,
        secondary: &AnchorState,
        body_rotation: &UnitQuaternion<f64>,
    ) -> Option<UnitQuaternion<f64>> {
        let axes = self.blend_axes(main_attachment, secondary_attachment, main, secondary)?;
        let before = look_rotation(&axes.current, &main_attachment.up());
        let after = look_rotation(&axes.target, &axes.up);
        Some(after * before.inverse() * body_rotation)
    }

    /// Desired pose with `primary` as the main anchor.
    ///
    /// Returns `None` if the primary anchor holds nothing that still exists.
    #[must_use]
    pub fn solve(
        &self,
        set: &AttachmentSet,
        anchors: &AnchorSlots,
        primary: AnchorId,
        body: &Pose,
    ) -> Option<DesiredPose> {
        let main = &anchors[primary];
        let main_attachment = main.attachment_world_pose(set, body)?;
        let single = Self::single_anchor_pose(&main_attachment, &main.target, body);

        let secondary = &anchors[primary.other()];
        if Self::blending_applies(set, main, secondary) {
            let blended = secondary
                .attachment_world_pose(set, body)
                .and_then(|secondary_attachment| {
                    self.two_anchor_orientation(
                        &main_attachment,
                        &secondary_attachment,
                        main,
                        secondary,
                        &body.rotation,
                    )
                });
            if let Some(rotation) = blended {
                return Some(DesiredPose {
                    pose: Pose::from_position_rotation(single.position, rotation),
                    mode: SolveMode::Blended,
                });
            }
            trace!(%primary, "attachments coincide, falling back to single-anchor pose");
        }

        Some(DesiredPose {
            pose: single,
            mode: SolveMode::Single,
        })
    }
}

/// Orientation whose local +Y points along `forward` and whose local +Z leans
/// toward `up`.
///
/// If `forward` is parallel to `up`, the world axis least aligned with
/// `forward` stands in for `up`. A zero `forward` yields the identity.
#[must_use]
pub fn look_rotation(forward: &Vector3<f64>, up: &Vector3<f64>) -> UnitQuaternion<f64> {
    let Some(y) = forward.try_normalize(DIRECTION_EPSILON) else {
        return UnitQuaternion::identity();
    };

    let x = y
        .cross(up)
        .try_normalize(DIRECTION_EPSILON)
        .unwrap_or_else(|| fallback_right(&y));
    let z = x.cross(&y);

    let basis = Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[x, y, z]));
    UnitQuaternion::from_rotation_matrix(&basis)
}

/// Right vector for a forward direction with no usable up hint.
fn fallback_right(forward: &Vector3<f64>) -> Vector3<f64> {
    let hint = [Vector3::z(), Vector3::x(), Vector3::y()]
        .into_iter()
        .min_by(|a, b| a.dot(forward).abs().total_cmp(&b.dot(forward).abs()))
        .unwrap_or_else(Vector3::z);
    forward.cross(&hint).normalize()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::anchor::Attachment;
    use crate::attachment::{Acceptance, AttachmentGroup, AttachmentPolicy};
    use approx::assert_relative_eq;
    use nalgebra::Point3;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn at(x: f64, y: f64, z: f64) -> Pose {
        Pose::from_position(Point3::new(x, y, z))
    }

    fn yaw(angle: f64) -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(0.0, 0.0, angle)
    }

    /// A bar with handles at x = ±0.5, both anchors holding it.
    fn held_bar(policy: AttachmentPolicy) -> (AttachmentSet, AnchorSlots) {
        let mut set = AttachmentSet::new();
        let group = set
            .insert(
                AttachmentGroup::new("bar")
                    .with_policy(policy)
                    .with_point("left", at(-0.5, 0.0, 0.0), Acceptance::any())
                    .with_point("right", at(0.5, 0.0, 0.0), Acceptance::any()),
            )
            .unwrap();
        let points = set.group(group).unwrap().points();
        let (left, right) = (points[0].id(), points[1].id());

        let mut anchors = AnchorSlots::default();
        anchors[AnchorId::Left].attach(Attachment::Point(left));
        anchors[AnchorId::Left].set_target(at(-0.5, 0.0, 0.0), Vector3::z());
        anchors[AnchorId::Right].attach(Attachment::Point(right));
        anchors[AnchorId::Right].set_target(at(0.5, 0.0, 0.0), Vector3::z());
        (set, anchors)
    }

    #[test]
    fn test_single_anchor_translation() {
        let body = at(1.0, 0.0, 0.0);
        let attachment = at(1.5, 0.0, 0.0);
        let target = at(2.0, 1.0, 0.0);

        let desired = GraspSolver::single_anchor_pose(&attachment, &target, &body);
        assert_relative_eq!(desired.position, Point3::new(1.5, 1.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(desired.rotation.angle(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_anchor_rotation_aligns_attachment() {
        // Handle rotated 90° relative to the body; the hand asks for identity
        let body = Pose::from_position_rotation(Point3::origin(), yaw(0.3));
        let handle_local = Pose::from_position_rotation(Point3::new(0.0, 1.0, 0.0), yaw(FRAC_PI_2));
        let attachment = body.compose(&handle_local);
        let target = Pose::identity();

        let desired = GraspSolver::single_anchor_pose(&attachment, &target, &body);

        // With the desired orientation, the handle ends up aligned with the target
        let handle_after = desired.rotation * handle_local.rotation;
        assert_relative_eq!(handle_after.angle_to(&target.rotation), 0.0, epsilon = 1e-7);
    }

    #[test]
    fn test_blending_policy() {
        let (set, anchors) = held_bar(AttachmentPolicy::default());
        // Same group without the grab override: no blending
        assert!(!GraspSolver::blending_applies(
            &set,
            &anchors[AnchorId::Left],
            &anchors[AnchorId::Right]
        ));

        let (set, anchors) = held_bar(AttachmentPolicy::free());
        assert!(GraspSolver::blending_applies(
            &set,
            &anchors[AnchorId::Left],
            &anchors[AnchorId::Right]
        ));

        let (set, anchors) = held_bar(AttachmentPolicy::single_anchor());
        assert!(!GraspSolver::blending_applies(
            &set,
            &anchors[AnchorId::Left],
            &anchors[AnchorId::Right]
        ));
    }

    #[test]
    fn test_blending_across_groups() {
        let mut set = AttachmentSet::new();
        let a = set
            .insert(AttachmentGroup::new("a").with_point(
                "p",
                at(-0.5, 0.0, 0.0),
                Acceptance::any(),
            ))
            .unwrap();
        let b = set
            .insert(AttachmentGroup::new("b").with_point("q", at(0.5, 0.0, 0.0), Acceptance::any()))
            .unwrap();

        let mut anchors = AnchorSlots::default();
        anchors[AnchorId::Left].attach(Attachment::Point(set.group(a).unwrap().points()[0].id()));
        anchors[AnchorId::Right].attach(Attachment::Point(set.group(b).unwrap().points()[0].id()));

        assert!(GraspSolver::blending_applies(
            &set,
            &anchors[AnchorId::Left],
            &anchors[AnchorId::Right]
        ));

        // A free grab next to a declared point also blends
        anchors[AnchorId::Right].attach(Attachment::Free {
            local_pose: Pose::identity(),
        });
        assert!(GraspSolver::blending_applies(
            &set,
            &anchors[AnchorId::Left],
            &anchors[AnchorId::Right]
        ));

        // Detached secondary never blends
        anchors[AnchorId::Right].detach();
        assert!(!GraspSolver::blending_applies(
            &set,
            &anchors[AnchorId::Left],
            &anchors[AnchorId::Right]
        ));
    }

    #[test]
    fn test_blend_axes_preserve_length() {
        let (set, mut anchors) = held_bar(AttachmentPolicy::free());
        let body = Pose::identity();
        anchors[AnchorId::Right].set_target(at(3.0, 4.0, 0.0), Vector3::z());

        let main = anchors[AnchorId::Left].attachment_world_pose(&set, &body).unwrap();
        let secondary = anchors[AnchorId::Right].attachment_world_pose(&set, &body).unwrap();
        let axes = GraspSolver::default()
            .blend_axes(&main, &secondary, &anchors[AnchorId::Left], &anchors[AnchorId::Right])
            .unwrap();

        assert_relative_eq!(axes.current.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(axes.target.norm(), 1.0, epsilon = 1e-12);
        // Points from the main attachment toward the new secondary target
        let expected = Vector3::new(3.5, 4.0, 0.0).normalize();
        assert_relative_eq!(axes.target, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_blend_up_weight() {
        let (set, mut anchors) = held_bar(AttachmentPolicy::free());
        let body = Pose::identity();
        anchors[AnchorId::Left].target_up = Vector3::z();
        anchors[AnchorId::Right].target_up = Vector3::x();

        let main = anchors[AnchorId::Left].attachment_world_pose(&set, &body).unwrap();
        let secondary = anchors[AnchorId::Right].attachment_world_pose(&set, &body).unwrap();
        let axes = GraspSolver::new(0.3)
            .blend_axes(&main, &secondary, &anchors[AnchorId::Left], &anchors[AnchorId::Right])
            .unwrap();

        assert_relative_eq!(axes.up, Vector3::new(0.3, 0.0, 0.7), epsilon = 1e-12);
    }

    #[test]
    fn test_two_anchor_yaw() {
        // Secondary hand swings the bar end from +X to +Y around the main hand
        let (set, mut anchors) = held_bar(AttachmentPolicy::free());
        let body = Pose::identity();
        anchors[AnchorId::Right].set_target(at(-0.5, 1.0, 0.0), Vector3::z());

        let desired = GraspSolver::default()
            .solve(&set, &anchors, AnchorId::Left, &body)
            .unwrap();

        assert_eq!(desired.mode, SolveMode::Blended);
        assert_relative_eq!(
            desired.pose.rotation.angle_to(&yaw(FRAC_PI_2)),
            0.0,
            epsilon = 1e-7
        );
        // Main hand did not move, so neither does the body origin
        assert_relative_eq!(desired.pose.position, Point3::origin(), epsilon = 1e-12);
    }

    #[test]
    fn test_two_anchor_at_rest_is_identity() {
        let (set, anchors) = held_bar(AttachmentPolicy::free());
        let body = Pose::from_position_rotation(Point3::new(0.0, 0.0, 1.0), yaw(0.4));
        let mut anchors = anchors;
        for id in AnchorId::ALL {
            let pose = anchors[id].attachment_world_pose(&set, &body).unwrap();
            anchors[id].set_target(pose, pose.up());
        }

        let desired = GraspSolver::default()
            .solve(&set, &anchors, AnchorId::Right, &body)
            .unwrap();
        assert_eq!(desired.mode, SolveMode::Blended);
        assert_relative_eq!(desired.pose.position, body.position, epsilon = 1e-12);
        assert_relative_eq!(desired.pose.angle_to(&body), 0.0, epsilon = 1e-7);
    }

    #[test]
    fn test_disallowed_blending_uses_single_pose() {
        let (set, mut anchors) = held_bar(AttachmentPolicy::single_anchor());
        let body = Pose::identity();
        anchors[AnchorId::Right].set_target(at(-0.5, 1.0, 0.0), Vector3::z());
        anchors[AnchorId::Left].set_target(at(-0.4, 0.0, 0.0), Vector3::z());

        let desired = GraspSolver::default()
            .solve(&set, &anchors, AnchorId::Left, &body)
            .unwrap();
        let main = anchors[AnchorId::Left].attachment_world_pose(&set, &body).unwrap();
        let single = GraspSolver::single_anchor_pose(&main, &anchors[AnchorId::Left].target, &body);

        assert_eq!(desired.mode, SolveMode::Single);
        assert_eq!(desired.pose, single);
    }

    #[test]
    fn test_coincident_attachments_fall_back() {
        let mut set = AttachmentSet::new();
        set.insert(
            AttachmentGroup::new("knob")
                .with_policy(AttachmentPolicy::free())
                .with_point("a", Pose::identity(), Acceptance::any())
                .with_point("b", Pose::identity(), Acceptance::any()),
        )
        .unwrap();
        let points = set.groups()[0].points();
        let mut anchors = AnchorSlots::default();
        anchors[AnchorId::Left].attach(Attachment::Point(points[0].id()));
        anchors[AnchorId::Right].attach(Attachment::Point(points[1].id()));

        let desired = GraspSolver::default()
            .solve(&set, &anchors, AnchorId::Left, &Pose::identity())
            .unwrap();
        assert_eq!(desired.mode, SolveMode::Single);
    }

    #[test]
    fn test_look_rotation_frame() {
        let rot = look_rotation(&Vector3::x(), &Vector3::z());
        assert_relative_eq!(rot * Vector3::y(), Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(rot * Vector3::z(), Vector3::z(), epsilon = 1e-12);

        // Up hint is only a hint: the frame stays orthonormal
        let rot = look_rotation(&Vector3::new(1.0, 1.0, 0.0), &Vector3::new(0.0, 0.3, 1.0));
        let up = rot * Vector3::z();
        assert_relative_eq!(up.dot(&Vector3::new(1.0, 1.0, 0.0).normalize()), 0.0, epsilon = 1e-12);
        assert!(up.z > 0.0);
    }

    #[test]
    fn test_look_rotation_degenerate() {
        // Forward parallel to up: still a valid, deterministic rotation
        let a = look_rotation(&Vector3::z(), &Vector3::z());
        let b = look_rotation(&Vector3::z(), &Vector3::z());
        assert!(a.coords.iter().all(|c| c.is_finite()));
        assert_eq!(a, b);
        assert_relative_eq!(a * Vector3::y(), Vector3::z(), epsilon = 1e-12);

        let c = look_rotation(&Vector3::new(0.0, 0.0, -2.0), &Vector3::z());
        assert_relative_eq!(c * Vector3::y(), -Vector3::z(), epsilon = 1e-12);

        assert_eq!(look_rotation(&Vector3::zeros(), &Vector3::z()), UnitQuaternion::identity());
    }

    #[test]
    fn test_look_rotation_delta_is_half_turn() {
        let before = look_rotation(&Vector3::x(), &Vector3::z());
        let after = look_rotation(&-Vector3::x(), &Vector3::z());
        assert_relative_eq!((after * before.inverse()).angle(), PI, epsilon = 1e-9);
    }
}
