//! ECS components describing transformable scene nodes.

use bevy::prelude::*;
use transformer_proto::{NodeId, PawnId, TraceChannel, TraceFilter};

use crate::scene::{FocusHook, FocusNotice, Mobility};

/// Stable handle of the entity inside the transformer.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneNode(pub NodeId);

/// Marks the root entity of an object. Entities below it without this marker are its parts.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct SceneObject;

#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeMobility(pub Mobility);

/// Oriented box the pointer trace tests against, in the node's local units.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct PickBox {
    pub half_extents: Vec3,
}

impl Default for PickBox {
    fn default() -> Self {
        Self {
            half_extents: Vec3::splat(0.5),
        }
    }
}

/// Collision layer of a node for trace filtering.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct TraceLayer {
    pub object_type: TraceChannel,
    pub blocks: Vec<TraceChannel>,
    pub profile: String,
}

impl Default for TraceLayer {
    fn default() -> Self {
        Self {
            object_type: TraceChannel::WORLD_DYNAMIC,
            blocks: vec![TraceChannel::VISIBILITY],
            profile: String::from("BlockAll"),
        }
    }
}

impl TraceLayer {
    pub fn passes(&self, filter: &TraceFilter) -> bool {
        match filter {
            TraceFilter::ObjectTypes(types) => types.contains(&self.object_type),
            TraceFilter::Channel(channel) => self.blocks.contains(channel),
            TraceFilter::Profile(name) => self.profile == *name,
        }
    }
}

/// Node exists locally only and is skipped when non-replicated hits are ignored.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct NotReplicated;

/// Node spawned but not yet live; clone replication waits for it.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct AwaitingPlay;

/// Receives focus callbacks from pawns selecting this node.
#[derive(Component, Debug, Clone, Default)]
pub struct Focusable {
    pub notices: Vec<FocusNotice>,
}

impl FocusHook for Focusable {
    fn on_focus(&mut self, pawn: PawnId, _target: NodeId) {
        self.notices.push(FocusNotice::Focus(pawn));
    }

    fn on_unfocus(&mut self, pawn: PawnId, _target: NodeId) {
        self.notices.push(FocusNotice::Unfocus(pawn));
    }

    fn on_new_transform(&mut self, pawn: PawnId, _target: NodeId, transform: &Transform, part_based: bool) {
        self.notices.push(FocusNotice::NewTransform {
            pawn,
            transform: *transform,
            part_based,
        });
    }
}
