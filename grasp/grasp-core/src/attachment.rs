//! Attachment points, groups, and resolution.
//!
//! An [`AttachmentSet`] belongs to one manipulable body. It owns
//! [`AttachmentGroup`]s, which own [`AttachmentPoint`]s. Everything outside the
//! set refers to groups and points by [`GroupId`] / [`PointId`].

use grasp_types::{AnchorId, GraspError, GroupId, PointId, Pose};

/// Which anchors a point accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcceptedAnchors {
    /// Any anchor.
    #[default]
    Any,
    /// Only the given anchor.
    Only(AnchorId),
}

impl AcceptedAnchors {
    /// Check whether `anchor` is accepted.
    #[must_use]
    pub fn accepts(self, anchor: AnchorId) -> bool {
        match self {
            Self::Any => true,
            Self::Only(only) => only == anchor,
        }
    }
}

/// Acceptance test of an attachment point.
///
/// A query passes when the anchor is compatible and every configured
/// threshold holds. With no thresholds, a compatible anchor always attaches.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Acceptance {
    /// Anchor compatibility.
    pub anchors: AcceptedAnchors,
    /// Maximum distance between the query position and the point (m).
    pub max_distance: Option<f64>,
    /// Maximum angle between the query orientation and the point (rad).
    pub max_angle: Option<f64>,
}

impl Acceptance {
    /// Accept any anchor at any pose.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Restrict to a single anchor.
    #[must_use]
    pub fn only(mut self, anchor: AnchorId) -> Self {
        self.anchors = AcceptedAnchors::Only(anchor);
        self
    }

    /// Require the query within `distance` of the point.
    #[must_use]
    pub fn within(mut self, distance: f64) -> Self {
        self.max_distance = Some(distance);
        self
    }

    /// Require the query orientation within `angle` radians of the point's.
    #[must_use]
    pub fn aligned_within(mut self, angle: f64) -> Self {
        self.max_angle = Some(angle);
        self
    }

    /// Run the test against a point already placed in the world.
    #[must_use]
    pub fn accepts(&self, anchor: AnchorId, point_world: &Pose, query: &Pose) -> bool {
        if !self.anchors.accepts(anchor) {
            return false;
        }
        if let Some(max) = self.max_distance {
            if point_world.distance(query) > max {
                return false;
            }
        }
        if let Some(max) = self.max_angle {
            if point_world.angle_to(query) > max {
                return false;
            }
        }
        true
    }
}

/// Two-anchor policy of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentPolicy {
    /// Whether two anchors may move the body together.
    pub allows_two_anchor_movement: bool,
    /// Whether two anchors may blend while holding points of this same group.
    pub allows_two_anchor_grab: bool,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self {
            allows_two_anchor_movement: true,
            allows_two_anchor_grab: false,
        }
    }
}

impl AttachmentPolicy {
    /// Policy of free attachments: everything allowed.
    #[must_use]
    pub fn free() -> Self {
        Self {
            allows_two_anchor_movement: true,
            allows_two_anchor_grab: true,
        }
    }

    /// Only one anchor ever drives the body.
    #[must_use]
    pub fn single_anchor() -> Self {
        Self {
            allows_two_anchor_movement: false,
            allows_two_anchor_grab: false,
        }
    }
}

/// A fixed local offset on the body where an anchor may attach.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentPoint {
    id: PointId,
    group: GroupId,
    /// Name for debugging.
    pub name: String,
    /// Pose relative to the body origin.
    pub local_pose: Pose,
    /// Acceptance test.
    pub acceptance: Acceptance,
}

impl AttachmentPoint {
    /// Identifier, assigned when the owning group is inserted into a set.
    #[must_use]
    pub fn id(&self) -> PointId {
        self.id
    }

    /// Owning group.
    #[must_use]
    pub fn group(&self) -> GroupId {
        self.group
    }

    /// Where the point sits in the world for a given body pose.
    #[must_use]
    pub fn world_pose(&self, body: &Pose) -> Pose {
        body.compose(&self.local_pose)
    }
}

/// An input event an attachment group may react to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// An anchor attached to one of the group's points.
    Grabbed {
        /// Anchor pose at the grab.
        pose: Pose,
    },
    /// An anchor let go of one of the group's points.
    Released {
        /// Anchor pose at the release.
        pose: Pose,
    },
    /// Analog trigger value in `[0, 1]`.
    Trigger {
        /// Trigger value.
        value: f64,
    },
    /// Digital button state change.
    Button {
        /// Device-specific button identifier.
        id: u32,
        /// Whether the button is now held.
        pressed: bool,
    },
}

/// Capability of a group to react to input from anchors holding it.
pub trait InputReaction {
    /// Handle an event from `anchor`.
    fn on_input(&mut self, anchor: AnchorId, event: &InputEvent);
}

/// A named collection of attachment points sharing a two-anchor policy.
pub struct AttachmentGroup {
    id: GroupId,
    /// Name for debugging.
    pub name: String,
    /// Two-anchor policy.
    pub policy: AttachmentPolicy,
    points: Vec<AttachmentPoint>,
    reaction: Option<Box<dyn InputReaction>>,
}

impl std::fmt::Debug for AttachmentGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentGroup")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("points", &self.points)
            .field("reactive", &self.reaction.is_some())
            .finish()
    }
}

impl AttachmentGroup {
    /// Create an empty group with the default policy.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: GroupId(0),
            name: name.into(),
            policy: AttachmentPolicy::default(),
            points: Vec::new(),
            reaction: None,
        }
    }

    /// Set the two-anchor policy.
    #[must_use]
    pub fn with_policy(mut self, policy: AttachmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Append a point. Points are tried in the order they are added.
    #[must_use]
    pub fn with_point(
        mut self,
        name: impl Into<String>,
        local_pose: Pose,
        acceptance: Acceptance,
    ) -> Self {
        self.points.push(AttachmentPoint {
            id: PointId(0),
            group: GroupId(0),
            name: name.into(),
            local_pose,
            acceptance,
        });
        self
    }

    /// Declare the input-reaction capability.
    #[must_use]
    pub fn with_reaction(mut self, reaction: Box<dyn InputReaction>) -> Self {
        self.reaction = Some(reaction);
        self
    }

    /// Identifier, assigned on insertion into a set.
    #[must_use]
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Points in declaration order.
    #[must_use]
    pub fn points(&self) -> &[AttachmentPoint] {
        &self.points
    }

    /// Whether the group declared the input-reaction capability.
    #[must_use]
    pub fn is_reactive(&self) -> bool {
        self.reaction.is_some()
    }

    /// Deliver an event if the group is reactive. Returns whether it was delivered.
    pub fn notify(&mut self, anchor: AnchorId, event: &InputEvent) -> bool {
        match self.reaction.as_mut() {
            Some(reaction) => {
                reaction.on_input(anchor, event);
                true
            }
            None => false,
        }
    }

    /// First point accepting the query, in declaration order.
    fn find(&self, anchor: AnchorId, query: &Pose, body: &Pose) -> Option<PointId> {
        self.points
            .iter()
            .find(|p| p.acceptance.accepts(anchor, &p.world_pose(body), query))
            .map(AttachmentPoint::id)
    }
}

/// Outcome of [`AttachmentSet::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// A point accepted the query.
    Point(PointId),
    /// The set has no groups, the body is freely attachable.
    Free,
    /// Groups exist but none accepted the query.
    NotFound,
}

/// All attachment groups of one manipulable body.
#[derive(Debug, Default)]
pub struct AttachmentSet {
    groups: Vec<AttachmentGroup>,
    next_id: u64,
}

impl AttachmentSet {
    /// Create an empty (freely attachable) set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a group, assigning ids to it and its points.
    pub fn insert(&mut self, mut group: AttachmentGroup) -> grasp_types::Result<GroupId> {
        if let Some(bad) = group.points.iter().find(|p| !p.local_pose.is_finite()) {
            return Err(GraspError::NonFinitePoint {
                name: bad.name.clone(),
            });
        }

        let group_id = GroupId(self.issue_id());
        group.id = group_id;
        for point in &mut group.points {
            point.id = PointId(self.issue_id());
            point.group = group_id;
        }
        self.groups.push(group);
        Ok(group_id)
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_group(mut self, group: AttachmentGroup) -> grasp_types::Result<Self> {
        self.insert(group)?;
        Ok(self)
    }

    /// Remove a group and its points. Anchors still naming them are released
    /// by the controller on their next tick.
    pub fn remove_group(&mut self, id: GroupId) -> grasp_types::Result<AttachmentGroup> {
        let index = self
            .groups
            .iter()
            .position(|g| g.id == id)
            .ok_or(GraspError::GroupNotFound(id))?;
        Ok(self.groups.remove(index))
    }

    /// Whether the set has no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups in declaration order.
    #[must_use]
    pub fn groups(&self) -> &[AttachmentGroup] {
        &self.groups
    }

    /// Look up a group.
    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&AttachmentGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Look up a group mutably.
    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut AttachmentGroup> {
        self.groups.iter_mut().find(|g| g.id == id)
    }

    /// Look up a point.
    #[must_use]
    pub fn point(&self, id: PointId) -> Option<&AttachmentPoint> {
        self.groups
            .iter()
            .flat_map(|g| g.points.iter())
            .find(|p| p.id == id)
    }

    /// Policy of the group owning `point`.
    #[must_use]
    pub fn policy_of(&self, point: PointId) -> Option<AttachmentPolicy> {
        let group = self.point(point)?.group;
        self.group(group).map(|g| g.policy)
    }

    /// Find where `anchor` attaches for a query pose.
    ///
    /// Groups and their points are tried in declaration order and the first
    /// accepting point wins, so the same query against the same state always
    /// yields the same point.
    #[must_use]
    pub fn resolve(&self, anchor: AnchorId, query: &Pose, body: &Pose) -> Resolution {
        if self.groups.is_empty() {
            return Resolution::Free;
        }
        self.groups
            .iter()
            .find_map(|g| g.find(anchor, query, body))
            .map_or(Resolution::NotFound, Resolution::Point)
    }

    fn issue_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}
