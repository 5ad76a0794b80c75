//! Per-anchor attachment state.

use std::ops::{Index, IndexMut};

use grasp_types::{AnchorId, GroupId, PointId, Pose};
use nalgebra::Vector3;

use crate::attachment::{AttachmentPolicy, AttachmentSet};

/// What an anchor is holding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Attachment {
    /// A declared attachment point.
    Point(PointId),
    /// A free grab, stored relative to the body origin.
    Free {
        /// Grab pose in body-local coordinates.
        local_pose: Pose,
    },
}

impl Attachment {
    /// Grab pose in body-local coordinates, if the point still exists.
    #[must_use]
    pub fn local_pose(&self, set: &AttachmentSet) -> Option<Pose> {
        match self {
            Self::Point(id) => set.point(*id).map(|p| p.local_pose),
            Self::Free { local_pose } => Some(*local_pose),
        }
    }

    /// Two-anchor policy governing this attachment.
    #[must_use]
    pub fn policy(&self, set: &AttachmentSet) -> Option<AttachmentPolicy> {
        match self {
            Self::Point(id) => set.policy_of(*id),
            Self::Free { .. } => Some(AttachmentPolicy::free()),
        }
    }

    /// Owning group. Free attachments belong to no group.
    #[must_use]
    pub fn group(&self, set: &AttachmentSet) -> Option<GroupId> {
        match self {
            Self::Point(id) => set.point(*id).map(|p| p.group()),
            Self::Free { .. } => None,
        }
    }
}

/// State of one anchor slot.
///
/// The target fields are refreshed every tick by the input side, whether or
/// not the anchor is attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorState {
    attachment: Option<Attachment>,
    /// Latest pose supplied by the anchor.
    pub target: Pose,
    /// Latest up direction supplied by the anchor.
    pub target_up: Vector3<f64>,
}

impl Default for AnchorState {
    fn default() -> Self {
        Self {
            attachment: None,
            target: Pose::identity(),
            target_up: Vector3::z(),
        }
    }
}

impl AnchorState {
    /// Whether the anchor holds anything.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    /// Current attachment.
    #[must_use]
    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// The held point, if it is a declared one.
    #[must_use]
    pub fn point(&self) -> Option<PointId> {
        match self.attachment {
            Some(Attachment::Point(id)) => Some(id),
            _ => None,
        }
    }

    /// Store new tracking data.
    pub fn set_target(&mut self, target: Pose, up: Vector3<f64>) {
        self.target = target;
        self.target_up = up;
    }

    /// Where the held attachment currently sits in the world.
    #[must_use]
    pub fn attachment_world_pose(&self, set: &AttachmentSet, body: &Pose) -> Option<Pose> {
        let local = self.attachment?.local_pose(set)?;
        Some(body.compose(&local))
    }

    pub(crate) fn attach(&mut self, attachment: Attachment) {
        self.attachment = Some(attachment);
    }

    pub(crate) fn detach(&mut self) -> Option<Attachment> {
        self.attachment.take()
    }
}

/// One [`AnchorState`] per [`AnchorId`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnchorSlots([AnchorState; 2]);

impl Index<AnchorId> for AnchorSlots {
    type Output = AnchorState;

    fn index(&self, anchor: AnchorId) -> &AnchorState {
        &self.0[anchor.index()]
    }
}

impl IndexMut<AnchorId> for AnchorSlots {
    fn index_mut(&mut self, anchor: AnchorId) -> &mut AnchorState {
        &mut self.0[anchor.index()]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::attachment::{Acceptance, AttachmentGroup};
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_attach_detach_invariant() {
        let mut state = AnchorState::default();
        assert!(!state.is_attached());
        assert!(state.point().is_none());

        state.attach(Attachment::Point(PointId(4)));
        assert!(state.is_attached());
        assert_eq!(state.point(), Some(PointId(4)));

        assert_eq!(state.detach(), Some(Attachment::Point(PointId(4))));
        assert!(!state.is_attached());
        assert!(state.attachment().is_none());
    }

    #[test]
    fn test_world_pose_of_point_and_free() {
        let mut set = AttachmentSet::new();
        let group = set
            .insert(AttachmentGroup::new("g").with_point(
                "tip",
                Pose::from_position(Point3::new(0.0, 1.0, 0.0)),
                Acceptance::any(),
            ))
            .unwrap();
        let tip = set.group(group).unwrap().points()[0].id();
        let body = Pose::from_position(Point3::new(2.0, 0.0, 0.0));

        let mut state = AnchorState::default();
        state.attach(Attachment::Point(tip));
        let world = state.attachment_world_pose(&set, &body).unwrap();
        assert_relative_eq!(world.position, Point3::new(2.0, 1.0, 0.0), epsilon = 1e-12);

        state.attach(Attachment::Free {
            local_pose: Pose::from_position(Point3::new(0.0, 0.0, 0.5)),
        });
        let world = state.attachment_world_pose(&set, &body).unwrap();
        assert_relative_eq!(world.position, Point3::new(2.0, 0.0, 0.5), epsilon = 1e-12);
        assert_eq!(state.attachment().unwrap().group(&set), None);
        assert_eq!(
            state.attachment().unwrap().policy(&set),
            Some(AttachmentPolicy::free())
        );
    }

    #[test]
    fn test_removed_point_does_not_dangle() {
        let mut set = AttachmentSet::new();
        let group = set
            .insert(AttachmentGroup::new("g").with_point("p", Pose::identity(), Acceptance::any()))
            .unwrap();
        let point = set.group(group).unwrap().points()[0].id();

        let mut state = AnchorState::default();
        state.attach(Attachment::Point(point));
        set.remove_group(group).unwrap();

        assert!(state.attachment_world_pose(&set, &Pose::identity()).is_none());
    }

    #[test]
    fn test_slots_indexing() {
        let mut slots = AnchorSlots::default();
        slots[AnchorId::Right].attach(Attachment::Point(PointId(1)));
        assert!(slots[AnchorId::Right].is_attached());
        assert!(!slots[AnchorId::Left].is_attached());
    }
}
