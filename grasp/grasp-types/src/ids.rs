//! Identifiers for anchors, attachment groups, and attachment points.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One of the two anchor slots (typically the tracked hands).
///
/// The key domain is closed, so per-anchor state lives in fixed two-element
/// arrays indexed by [`AnchorId::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AnchorId {
    /// Left anchor.
    Left,
    /// Right anchor.
    Right,
}

impl AnchorId {
    /// Both anchors, in tick order.
    pub const ALL: [Self; 2] = [Self::Left, Self::Right];

    /// The opposite anchor.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Array slot for this anchor.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }
}

impl std::fmt::Display for AnchorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Left => f.write_str("Left"),
            Self::Right => f.write_str("Right"),
        }
    }
}

/// Identifier of an attachment group, issued by the attachment set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroupId(pub u64);

impl GroupId {
    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Group({})", self.0)
    }
}

/// Identifier of an attachment point, issued by the attachment set.
///
/// Anchors hold these rather than references, so a point can be removed while
/// an anchor still names it; the lookup then simply fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointId(pub u64);

impl PointId {
    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Point({})", self.0)
    }
}
