//! Grasp orchestration.
//!
//! The [`GraspController`] owns the anchor slots, the attachment set, the
//! solver, and the mover for one manipulable body. Input events attach,
//! release, and retarget anchors; each physics step, [`GraspController::tick`]
//! turns the anchors' state into a velocity correction on the body.
//!
//! # Primary anchor
//!
//! When an anchor attaches while the other is already attached, the
//! earlier anchor stays primary. Otherwise the attaching anchor becomes
//! primary. On release the remaining anchor, if any, takes over.
//!
//! # Body state while held
//!
//! Attaching disables gravity and moves the centre of mass onto the primary
//! anchor's grasp point, so the body pivots about the authoritative hand.
//! When the primary anchor lets go, the centre of mass follows the remaining
//! anchor. Releasing the last anchor restores gravity and the natural centre
//! of mass.
//!
//! # Example
//!
//! ```
//! use grasp_core::{GraspController, SimBody};
//! use grasp_core::attachment::AttachmentSet;
//! use grasp_types::{AnchorId, GraspConfig, Pose};
//! use nalgebra::{Point3, Vector3};
//!
//! let config = GraspConfig::default();
//! let dt = config.fixed_timestep;
//! let mut controller = GraspController::new(config, AttachmentSet::new()).unwrap();
//! let mut body = SimBody::new(Pose::identity());
//!
//! let grab = Pose::from_position(Point3::new(0.1, 0.0, 0.0));
//! assert!(controller.try_attach(&mut body, AnchorId::Right, grab, Vector3::z()).accepted);
//!
//! // Hand moves 5 cm; one step later the body has followed
//! let moved = Pose::from_position(Point3::new(0.15, 0.0, 0.0));
//! controller.update_anchor_target(AnchorId::Right, moved, Vector3::z());
//! controller.tick(&mut body, AnchorId::Right, dt);
//! body.step(dt, &Vector3::new(0.0, 0.0, -9.81));
//!
//! assert!((body.pose.position.x - 0.05).abs() < 1e-9);
//! ```

use grasp_types::{AnchorId, GraspConfig, Pose};
use nalgebra::Vector3;
use tracing::{debug, trace, warn};

use crate::anchor::{AnchorSlots, AnchorState, Attachment};
use crate::attachment::{AttachmentSet, InputEvent, Resolution};
use crate::body::PhysicsBody;
use crate::mover::{VelocityCorrection, VelocityMatchingMover};
use crate::solver::{DesiredPose, GraspSolver};

/// Result of [`GraspController::try_attach`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachOutcome {
    /// Whether the anchor is now attached.
    pub accepted: bool,
    /// World pose of the attachment, or the query pose if rejected.
    pub pose: Pose,
    /// What the anchor now holds.
    pub attachment: Option<Attachment>,
}

/// Result of a [`GraspController::tick`] that moved the body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Anchor whose tick drove the body.
    pub anchor: AnchorId,
    /// Pose the body was steered toward.
    pub desired: DesiredPose,
    /// Applied correction, `None` if the body was kinematic.
    pub correction: Option<VelocityCorrection>,
}

/// Drives one body from up to two anchors.
#[derive(Debug)]
pub struct GraspController {
    config: GraspConfig,
    attachments: AttachmentSet,
    anchors: AnchorSlots,
    primary: Option<AnchorId>,
    solver: GraspSolver,
    mover: VelocityMatchingMover,
}

impl GraspController {
    /// Create a controller for a body with the given attachment set.
    ///
    /// An empty set makes the body freely attachable anywhere.
    pub fn new(config: GraspConfig, attachments: AttachmentSet) -> grasp_types::Result<Self> {
        let mover = VelocityMatchingMover::new(&config)?;
        Ok(Self {
            solver: GraspSolver::new(config.up_blend_weight),
            mover,
            config,
            attachments,
            anchors: AnchorSlots::default(),
            primary: None,
        })
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &GraspConfig {
        &self.config
    }

    /// Attachment set.
    #[must_use]
    pub fn attachments(&self) -> &AttachmentSet {
        &self.attachments
    }

    /// Attachment set, mutably. Anchors holding removed points are released
    /// on the next tick.
    pub fn attachments_mut(&mut self) -> &mut AttachmentSet {
        &mut self.attachments
    }

    /// State of one anchor.
    #[must_use]
    pub fn anchor(&self, anchor: AnchorId) -> &AnchorState {
        &self.anchors[anchor]
    }

    /// Whether `anchor` holds the body.
    #[must_use]
    pub fn is_attached(&self, anchor: AnchorId) -> bool {
        self.anchors[anchor].is_attached()
    }

    /// The anchor whose updates are authoritative, if any anchor is attached.
    #[must_use]
    pub fn primary(&self) -> Option<AnchorId> {
        self.primary
    }

    /// The mover, for diagnostics.
    #[must_use]
    pub fn mover(&self) -> &VelocityMatchingMover {
        &self.mover
    }

    /// World pose of what `anchor` holds.
    #[must_use]
    pub fn attachment_world_pose<B>(&self, anchor: AnchorId, body: &B) -> Option<Pose>
    where
        B: PhysicsBody + ?Sized,
    {
        self.anchors[anchor].attachment_world_pose(&self.attachments, &body.pose())
    }

    /// Desired pose for the current anchor state, without touching the body.
    #[must_use]
    pub fn desired_pose<B>(&self, body: &B) -> Option<DesiredPose>
    where
        B: PhysicsBody + ?Sized,
    {
        let primary = self.primary?;
        self.solver
            .solve(&self.attachments, &self.anchors, primary, &body.pose())
    }

    /// Try to attach `anchor` at `query`.
    ///
    /// An anchor that is already attached switches to the new attachment.
    pub fn try_attach<B>(
        &mut self,
        body: &mut B,
        anchor: AnchorId,
        query: Pose,
        up: Vector3<f64>,
    ) -> AttachOutcome
    where
        B: PhysicsBody + ?Sized,
    {
        let body_pose = body.pose();
        let attachment = match self.attachments.resolve(anchor, &query, &body_pose) {
            Resolution::Point(id) => Attachment::Point(id),
            Resolution::Free => Attachment::Free {
                local_pose: body_pose.relative(&query),
            },
            Resolution::NotFound if self.config.free_attach_on_miss => Attachment::Free {
                local_pose: body_pose.relative(&query),
            },
            Resolution::NotFound => {
                debug!(%anchor, "no attachment point accepts the query");
                return AttachOutcome {
                    accepted: false,
                    pose: query,
                    attachment: None,
                };
            }
        };

        // Resolution only returns points that exist
        let local_pose = attachment.local_pose(&self.attachments).unwrap_or_default();

        if let Some(previous) = self.anchors[anchor].attachment().copied() {
            self.notify(anchor, &previous, &InputEvent::Released { pose: query });
        }

        let state = &mut self.anchors[anchor];
        state.attach(attachment);
        state.set_target(query, up);

        let other = anchor.other();
        let primary = if self.anchors[other].is_attached() {
            other
        } else {
            anchor
        };
        self.primary = Some(primary);

        // The body pivots about the primary grasp
        let pivot = self.anchors[primary]
            .attachment()
            .and_then(|a| a.local_pose(&self.attachments))
            .unwrap_or(local_pose);

        body.set_gravity_enabled(false);
        body.set_center_of_mass(pivot.position.coords);

        self.notify(anchor, &attachment, &InputEvent::Grabbed { pose: query });
        debug!(%anchor, ?attachment, primary = ?self.primary, "anchor attached");

        AttachOutcome {
            accepted: true,
            pose: body_pose.compose(&local_pose),
            attachment: Some(attachment),
        }
    }

    /// Release `anchor`. Returns `false` if it was not attached.
    ///
    /// Releasing a detached anchor changes nothing.
    pub fn release<B>(&mut self, body: &mut B, anchor: AnchorId, query: Pose) -> bool
    where
        B: PhysicsBody + ?Sized,
    {
        let Some(attachment) = self.anchors[anchor].detach() else {
            return false;
        };
        self.notify(anchor, &attachment, &InputEvent::Released { pose: query });

        let other = anchor.other();
        let remaining = self.anchors[other]
            .attachment()
            .map(|a| a.local_pose(&self.attachments));

        match remaining {
            Some(local) => {
                self.primary = Some(other);
                if let Some(local) = local {
                    body.set_center_of_mass(local.position.coords);
                }
            }
            None => {
                self.primary = None;
                body.set_gravity_enabled(true);
                body.reset_center_of_mass();
                self.mover.reset();
            }
        }

        debug!(%anchor, primary = ?self.primary, "anchor released");
        true
    }

    /// Store fresh tracking data for `anchor`.
    ///
    /// Stored whether or not the anchor is attached, so a secondary anchor
    /// has current data the moment it becomes primary.
    pub fn update_anchor_target(&mut self, anchor: AnchorId, target: Pose, up: Vector3<f64>) {
        self.anchors[anchor].set_target(target, up);
    }

    /// Forward an input event to the group `anchor` is holding.
    ///
    /// Returns whether a reactive group received it.
    pub fn forward_input(&mut self, anchor: AnchorId, event: &InputEvent) -> bool {
        match self.anchors[anchor].attachment().copied() {
            Some(attachment) => self.notify(anchor, &attachment, event),
            None => false,
        }
    }

    /// Run one physics step for `anchor`.
    ///
    /// Only the primary anchor moves the body: while both anchors are
    /// attached, the other anchor's tick does nothing. Detached anchors do
    /// nothing either.
    pub fn tick<B>(&mut self, body: &mut B, anchor: AnchorId, frame_dt: f64) -> Option<TickReport>
    where
        B: PhysicsBody + ?Sized,
    {
        self.release_dangling(body);

        if !self.anchors[anchor].is_attached() {
            return None;
        }
        if self.primary != Some(anchor) {
            trace!(%anchor, "secondary anchor tick");
            return None;
        }

        let desired = self
            .solver
            .solve(&self.attachments, &self.anchors, anchor, &body.pose())?;
        let correction = self.mover.apply(body, &desired.pose, frame_dt);

        Some(TickReport {
            anchor,
            desired,
            correction,
        })
    }

    /// Tick both anchors in order. Returns the report of the anchor that
    /// moved the body, if any.
    pub fn step<B>(&mut self, body: &mut B, frame_dt: f64) -> Option<TickReport>
    where
        B: PhysicsBody + ?Sized,
    {
        let mut report = None;
        for anchor in AnchorId::ALL {
            if let Some(r) = self.tick(body, anchor, frame_dt) {
                report = Some(r);
            }
        }
        report
    }

    /// Release anchors whose attachment point no longer exists.
    fn release_dangling<B>(&mut self, body: &mut B)
    where
        B: PhysicsBody + ?Sized,
    {
        for anchor in AnchorId::ALL {
            let state = &self.anchors[anchor];
            let dangling = state
                .attachment()
                .is_some_and(|a| a.local_pose(&self.attachments).is_none());
            if dangling {
                warn!(
                    %anchor,
                    point = ?state.point(),
                    "attachment point removed, releasing anchor"
                );
                let target = state.target;
                self.release(body, anchor, target);
            }
        }
    }

    fn notify(&mut self, anchor: AnchorId, attachment: &Attachment, event: &InputEvent) -> bool {
        let Some(group) = attachment.group(&self.attachments) else {
            return false;
        };
        self.attachments
            .group_mut(group)
            .is_some_and(|g| g.notify(anchor, event))
    }
}
