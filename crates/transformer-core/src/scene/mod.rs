//! Scene collaborator.
//!
//! The core never owns scene nodes. Everything it needs from the host scene
//! (hierarchy, transforms, mobility, ray traces, duplication, destruction
//! and the optional focus hook) goes through [`SceneGraph`].

mod memory;

pub use memory::{FocusNotice, MemoryScene};

use bevy::prelude::*;
use transformer_proto::{NodeId, PawnId, TraceFilter};

use crate::math::RaySegment;

/// Whether a node may be moved at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mobility {
    Static,
    Stationary,
    #[default]
    Movable,
}

/// One trace hit. `object` is the root of the hit object, `part` the node actually struck.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceHit {
    pub object: NodeId,
    pub part: NodeId,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct TraceQuery<'a> {
    pub ray: RaySegment,
    pub filter: &'a TraceFilter,
    /// Objects (or parts) that never produce hits.
    pub ignored: &'a [NodeId],
}

/// Callbacks for nodes that manage their own focus presentation.
pub trait FocusHook {
    fn on_focus(&mut self, pawn: PawnId, target: NodeId);
    fn on_unfocus(&mut self, pawn: PawnId, target: NodeId);
    fn on_new_transform(&mut self, pawn: PawnId, target: NodeId, transform: &Transform, part_based: bool);
}

pub trait SceneGraph {
    fn contains(&self, node: NodeId) -> bool;

    /// Root node of the object `node` belongs to (the node itself for a root).
    fn owner(&self, node: NodeId) -> Option<NodeId>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Number of nodes making up `object`, its root included.
    fn part_count(&self, object: NodeId) -> usize;

    fn world_transform(&self, node: NodeId) -> Option<Transform>;

    fn set_world_transform(&mut self, node: NodeId, transform: &Transform);

    fn mobility(&self, node: NodeId) -> Mobility;

    fn set_mobility(&mut self, node: NodeId, mobility: Mobility);

    /// Hits along the ray, nearest first.
    fn trace(&self, query: &TraceQuery<'_>) -> Vec<TraceHit>;

    /// Spawn a copy of a whole object next to the original. Returns the new root.
    fn duplicate_object(&mut self, object: NodeId) -> Option<NodeId>;

    /// Add a copy of one part to the part's owner, at the same relative transform.
    fn duplicate_part(&mut self, part: NodeId) -> Option<NodeId>;

    /// Re-parent `node` under `parent`, keeping its world transform.
    fn attach(&mut self, node: NodeId, parent: NodeId);

    fn destroy_part(&mut self, part: NodeId);

    fn destroy_object(&mut self, object: NodeId);

    /// Focus hook of `node`, if it exposes one.
    fn focus_hook(&mut self, node: NodeId) -> Option<&mut dyn FocusHook>;

    fn is_replicated(&self, node: NodeId) -> bool;

    /// Whether the node has finished spawning on this peer.
    fn has_begun_play(&self, node: NodeId) -> bool;
}
