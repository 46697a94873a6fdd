//! Identifiers and enums that travel over the wire.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable handle of a transformable scene node (an object root or one of its parts).
///
/// Handles are assigned by the scene and are identical on every peer for the
/// same replicated node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Identifies one manipulating pawn (one user's transformer) across peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PawnId(pub Uuid);

impl PawnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PawnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PawnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pawn-{}", self.0.simple())
    }
}

/// Identifies one network peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(pub Uuid);

impl PeerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0.simple())
    }
}

/// Axis or plane a manipulation gesture is constrained to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransformationDomain {
    /// No gesture in progress.
    #[default]
    None,
    XAxis,
    YAxis,
    ZAxis,
    XYPlane,
    YZPlane,
    XZPlane,
    /// Unconstrained (all three axes).
    XYZ,
}

impl TransformationDomain {
    pub fn is_none(self) -> bool {
        self == Self::None
    }

    pub fn is_axis(self) -> bool {
        matches!(self, Self::XAxis | Self::YAxis | Self::ZAxis)
    }

    pub fn is_plane(self) -> bool {
        matches!(self, Self::XYPlane | Self::YZPlane | Self::XZPlane)
    }

    /// Which of the local X/Y/Z axes this domain moves along.
    pub fn axes(self) -> [bool; 3] {
        match self {
            Self::None => [false, false, false],
            Self::XAxis => [true, false, false],
            Self::YAxis => [false, true, false],
            Self::ZAxis => [false, false, true],
            Self::XYPlane => [true, true, false],
            Self::YZPlane => [false, true, true],
            Self::XZPlane => [true, false, true],
            Self::XYZ => [true, true, true],
        }
    }

    pub fn axis_count(self) -> usize {
        self.axes().iter().filter(|a| **a).count()
    }
}

/// Kind of manipulation a gizmo performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransformationType {
    NoTransform,
    #[default]
    Translation,
    Rotation,
    Scale,
}

/// Coordinate space the gizmo is aligned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SpaceType {
    Local,
    #[default]
    World,
}

/// Collision channel (object type) used to filter trace hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceChannel(pub u8);

impl TraceChannel {
    pub const WORLD_STATIC: Self = Self(0);
    pub const WORLD_DYNAMIC: Self = Self(1);
    pub const PAWN: Self = Self(2);
    pub const VISIBILITY: Self = Self(3);
    pub const CAMERA: Self = Self(4);
}

/// Selects which scene nodes a trace may hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceFilter {
    /// Hit nodes whose object type is one of the listed channels.
    ObjectTypes(Vec<TraceChannel>),
    /// Hit nodes that block the given trace channel.
    Channel(TraceChannel),
    /// Hit nodes using the named collision profile.
    Profile(String),
}

impl Default for TraceFilter {
    fn default() -> Self {
        Self::ObjectTypes(vec![
            TraceChannel::WORLD_STATIC,
            TraceChannel::WORLD_DYNAMIC,
            TraceChannel::PAWN,
        ])
    }
}

/// Delta transform in wire form: translation, rotation quaternion (x, y, z, w), scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireTransform {
    pub translation: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl WireTransform {
    /// Delta that changes nothing: no offset, identity rotation, zero added scale.
    pub const ZERO_DELTA: Self = Self {
        translation: [0.0; 3],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [0.0; 3],
    };
}

impl Default for WireTransform {
    fn default() -> Self {
        Self::ZERO_DELTA
    }
}
