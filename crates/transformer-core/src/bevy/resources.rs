//! ECS resources for the transformer.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use bevy::prelude::*;
use parking_lot::Mutex;
use transformer_proto::{
    Envelope, NodeId, SpaceType, TraceFilter, TransformationDomain, TransformationType,
};

use crate::controller::{CameraView, ViewSource};
use crate::network::{NetworkedTransformer, Transport};

/// Maps node handles to the entities carrying them.
#[derive(Resource, Debug)]
pub struct NodeIndex {
    entities: BTreeMap<NodeId, Entity>,
    next_id: u64,
}

impl Default for NodeIndex {
    fn default() -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl NodeIndex {
    pub fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Register `entity` under `id`. Ids received from the authority keep the allocator ahead of them.
    pub fn insert(&mut self, id: NodeId, entity: Entity) {
        self.next_id = self.next_id.max(id.0 + 1);
        self.entities.insert(id, entity);
    }

    pub fn remove(&mut self, id: NodeId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn entity(&self, id: NodeId) -> Option<Entity> {
        self.entities.get(&id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Entity)> + '_ {
        self.entities.iter().map(|(id, entity)| (*id, *entity))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Pointer ray and camera supplied by the host each frame.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerInput {
    /// World-space `(origin, direction)` under the pointer.
    pub ray: Option<(Vec3, Vec3)>,
    pub camera: Option<CameraView>,
}

impl ViewSource for PointerInput {
    fn pointer_ray(&self) -> Option<(Vec3, Vec3)> {
        self.ray
    }

    fn camera(&self) -> Option<CameraView> {
        self.camera
    }
}

/// Commands pushed by the host (input bindings, UI, a network receiver).
#[derive(Debug, Clone, PartialEq)]
pub enum TransformerCommand {
    /// Trace from the pointer and select or grab the gizmo.
    Trace { filter: TraceFilter, append: bool },
    /// Finish the current gesture.
    FinishTransform,
    SetDomain(TransformationDomain),
    ClearDomain,
    DeselectAll { destroy: bool },
    SetSpaceType(SpaceType),
    SetTransformationType(TransformationType),
    SetPartBased(bool),
    SetRotateOnLocalAxis(bool),
    CloneSelected { select_new_clones: bool, append: bool },
    SetSnapping {
        kind: TransformationType,
        enabled: bool,
        value: f32,
    },
    /// Replication traffic received for this pawn.
    Receive(Envelope),
}

/// Thread-safe queue feeding [`TransformerCommand`]s into the app.
#[derive(Resource, Clone, Default)]
pub struct TransformerCommandQueue {
    inner: Arc<Mutex<VecDeque<TransformerCommand>>>,
}

impl TransformerCommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, command: TransformerCommand) {
        self.inner.lock().push_back(command);
    }

    pub fn drain(&self) -> Vec<TransformerCommand> {
        self.inner.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

/// The local peer's transformer for one pawn, with its outbound transport.
#[derive(Resource)]
pub struct TransformerState {
    pub transformer: NetworkedTransformer,
    pub transport: Box<dyn Transport + Send + Sync>,
}

impl TransformerState {
    pub fn new(transformer: NetworkedTransformer, transport: impl Transport + Send + Sync + 'static) -> Self {
        Self {
            transformer,
            transport: Box::new(transport),
        }
    }
}
