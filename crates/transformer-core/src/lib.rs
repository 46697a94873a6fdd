//! Runtime Transformer Core Library
//!
//! Interactive translate/rotate/scale manipulation of scene nodes through
//! on-screen gizmos, with an authority-mediated network layer that keeps the
//! selection, active domain and applied deltas of every pawn consistent
//! across peers.
//!
//! The core is engine agnostic: the scene, the pointer/camera and the
//! network transport are collaborators behind traits. An in-memory scene and
//! a loopback transport are provided for tests and tools, and the `bevy`
//! module binds the core to a Bevy `World`.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod cloning;
pub mod config;
pub mod controller;
pub mod error;
pub mod gizmo;
pub mod math;
pub mod network;
pub mod scene;
pub mod selection;

// Bevy integration
pub mod bevy;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{
    CloneReplicationConfig, GizmoPlacement, GizmoTuning, SnapSetting, SnappingConfig,
    TransformerConfig,
};
pub use controller::{CameraView, PickHit, StaticView, TransformController, TransformStep, ViewSource};
pub use error::TransformerError;
pub use gizmo::{Gizmo, GizmoStateChange};
pub use math::RaySegment;
pub use network::{
    LoopbackHub, LoopbackTransport, NetworkedTransformer, PollTimer, RecordingTransport, Role, Transport,
};
pub use scene::{FocusHook, MemoryScene, Mobility, SceneGraph, TraceHit, TraceQuery};
pub use selection::{SelectionChange, SelectionManager};

pub use transformer_proto::{
    Envelope, Multicast, NodeId, PawnId, PeerId, ServerRequest, SpaceType, TraceChannel, TraceFilter,
    TransformationDomain, TransformationType, WireTransform,
};
