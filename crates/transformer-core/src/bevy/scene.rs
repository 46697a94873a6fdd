//! [`SceneGraph`] over a Bevy `World`.
//!
//! Nodes are entities carrying [`SceneNode`]; the hierarchy is `ChildOf`
//! and `Transform` holds each node's local transform. World transforms are
//! composed on demand so they are current within the frame, before
//! transform propagation runs.

use bevy::prelude::*;
use transformer_proto::NodeId;

use super::components::{
    AwaitingPlay, Focusable, NodeMobility, NotReplicated, PickBox, SceneNode, SceneObject, TraceLayer,
};
use super::resources::NodeIndex;
use crate::math;
use crate::scene::{FocusHook, Mobility, SceneGraph, TraceHit, TraceQuery};

pub struct WorldScene<'w> {
    world: &'w mut World,
}

impl<'w> WorldScene<'w> {
    pub fn new(world: &'w mut World) -> Self {
        world.init_resource::<NodeIndex>();
        Self { world }
    }

    pub fn world(&self) -> &World {
        &*self.world
    }

    pub fn entity(&self, node: NodeId) -> Option<Entity> {
        let entity = self.world.get_resource::<NodeIndex>()?.entity(node)?;
        self.world.get_entity(entity).is_ok().then_some(entity)
    }

    fn node_of(&self, entity: Entity) -> Option<NodeId> {
        self.world.get::<SceneNode>(entity).map(|n| n.0)
    }

    fn is_object(&self, entity: Entity) -> bool {
        self.world.get::<SceneObject>(entity).is_some()
    }

    fn spawn_node(&mut self, parent: Option<NodeId>, local: Transform, object: bool, pick: PickBox) -> NodeId {
        let parent_entity = parent.and_then(|p| self.entity(p));
        let id = self.world.resource_mut::<NodeIndex>().allocate();
        let entity = {
            let mut entity = self.world.spawn((SceneNode(id), local, pick, TraceLayer::default()));
            if object {
                entity.insert(SceneObject);
            }
            if let Some(parent) = parent_entity {
                entity.insert(ChildOf(parent));
            }
            entity.id()
        };
        self.world.resource_mut::<NodeIndex>().insert(id, entity);
        id
    }

    /// Spawn a top-level object with a unit pick box.
    pub fn spawn_object(&mut self, transform: Transform) -> NodeId {
        self.spawn_node(None, transform, true, PickBox { half_extents: Vec3::ONE })
    }

    pub fn spawn_child_object(&mut self, parent: NodeId, local: Transform) -> NodeId {
        self.spawn_node(Some(parent), local, true, PickBox { half_extents: Vec3::ONE })
    }

    pub fn spawn_part(&mut self, parent: NodeId, local: Transform) -> NodeId {
        self.spawn_node(Some(parent), local, false, PickBox::default())
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        let Some(entity) = self.entity(node) else {
            return Vec::new();
        };
        self.world
            .get::<Children>(entity)
            .map(|children| {
                let children: &[Entity] = children;
                children.iter().filter_map(|child| self.node_of(*child)).collect()
            })
            .unwrap_or_default()
    }

    /// Root of `object` and every descendant that is not another object.
    fn object_nodes(&self, object: NodeId) -> Vec<NodeId> {
        let mut out = vec![object];
        let mut cursor = 0;
        while cursor < out.len() {
            let current = out[cursor];
            for child in self.children(current) {
                if self.entity(child).is_some_and(|e| !self.is_object(e)) {
                    out.push(child);
                }
            }
            cursor += 1;
        }
        out
    }

    fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = self.parent(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) {
        let Some(entity) = self.entity(node) else {
            return;
        };
        match parent.and_then(|p| self.entity(p)) {
            Some(parent) => {
                self.world.entity_mut(entity).insert(ChildOf(parent));
            }
            None => {
                self.world.entity_mut(entity).remove::<ChildOf>();
            }
        }
    }

    /// Despawn `nodes` deepest first, re-attaching surviving children to the removed node's parent.
    fn remove_nodes(&mut self, nodes: &[NodeId]) {
        for id in nodes.iter().rev() {
            let Some(entity) = self.entity(*id) else {
                continue;
            };
            let parent = self.parent(*id);
            for child in self.children(*id) {
                if nodes.contains(&child) {
                    continue;
                }
                let world = self.world_transform(child);
                self.set_parent(child, parent);
                if let Some(world) = world {
                    self.set_world_transform(child, &world);
                }
            }
            self.world.despawn(entity);
            self.world.resource_mut::<NodeIndex>().remove(*id);
        }
    }

    /// Copy the transformer-relevant components of `source` onto a fresh entity.
    ///
    /// The copy is parked with [`AwaitingPlay`] until the next frame.
    fn clone_node(&mut self, source: Entity, parent: Option<Entity>, local: Transform, object: bool) -> (NodeId, Entity) {
        let pick = self.world.get::<PickBox>(source).copied();
        let layer = self.world.get::<TraceLayer>(source).cloned();
        let mobility = self.world.get::<NodeMobility>(source).copied();
        let replicated = self.world.get::<NotReplicated>(source).is_none();
        let focusable = self.world.get::<Focusable>(source).is_some();

        let id = self.world.resource_mut::<NodeIndex>().allocate();
        let entity = {
            let mut entity = self.world.spawn((SceneNode(id), local, AwaitingPlay));
            if let Some(pick) = pick {
                entity.insert(pick);
            }
            if let Some(layer) = layer {
                entity.insert(layer);
            }
            if let Some(mobility) = mobility {
                entity.insert(mobility);
            }
            if !replicated {
                entity.insert(NotReplicated);
            }
            if focusable {
                entity.insert(Focusable::default());
            }
            if object {
                entity.insert(SceneObject);
            }
            if let Some(parent) = parent {
                entity.insert(ChildOf(parent));
            }
            entity.id()
        };
        self.world.resource_mut::<NodeIndex>().insert(id, entity);
        (id, entity)
    }

    fn local_transform(&self, entity: Entity) -> Transform {
        self.world.get::<Transform>(entity).copied().unwrap_or_default()
    }

    /// Mark a cloned node live.
    pub fn mark_begun_play(&mut self, node: NodeId) {
        if let Some(entity) = self.entity(node) {
            self.world.entity_mut(entity).remove::<AwaitingPlay>();
        }
    }
}

impl SceneGraph for WorldScene<'_> {
    fn contains(&self, node: NodeId) -> bool {
        self.entity(node).is_some()
    }

    fn owner(&self, node: NodeId) -> Option<NodeId> {
        let mut entity = self.entity(node)?;
        loop {
            if self.is_object(entity) {
                return self.node_of(entity);
            }
            entity = self.world.get::<ChildOf>(entity)?.parent();
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        let entity = self.entity(node)?;
        let parent = self.world.get::<ChildOf>(entity)?.parent();
        self.node_of(parent)
    }

    fn part_count(&self, object: NodeId) -> usize {
        if self.contains(object) {
            self.object_nodes(object).len()
        } else {
            0
        }
    }

    fn world_transform(&self, node: NodeId) -> Option<Transform> {
        let entity = self.entity(node)?;
        let local = self.local_transform(entity);
        match self.parent(node) {
            Some(parent) => Some(math::compose(&self.world_transform(parent)?, &local)),
            None => Some(local),
        }
    }

    fn set_world_transform(&mut self, node: NodeId, transform: &Transform) {
        let Some(entity) = self.entity(node) else {
            return;
        };
        let local = match self.parent(node).and_then(|p| self.world_transform(p)) {
            Some(parent_world) => math::relative_to(transform, &parent_world),
            None => *transform,
        };
        self.world.entity_mut(entity).insert(local);
    }

    fn mobility(&self, node: NodeId) -> Mobility {
        match self.entity(node) {
            Some(entity) => self.world.get::<NodeMobility>(entity).map(|m| m.0).unwrap_or_default(),
            None => Mobility::Static,
        }
    }

    fn set_mobility(&mut self, node: NodeId, mobility: Mobility) {
        if let Some(entity) = self.entity(node) {
            self.world.entity_mut(entity).insert(NodeMobility(mobility));
        }
    }

    fn trace(&self, query: &TraceQuery<'_>) -> Vec<TraceHit> {
        let Some(index) = self.world.get_resource::<NodeIndex>() else {
            return Vec::new();
        };
        let default_layer = TraceLayer::default();
        let mut hits: Vec<TraceHit> = index
            .iter()
            .filter_map(|(id, entity)| {
                let pick = self.world.get::<PickBox>(entity)?;
                let layer = self.world.get::<TraceLayer>(entity).unwrap_or(&default_layer);
                if !layer.passes(query.filter) {
                    return None;
                }
                let object = self.owner(id)?;
                if query.ignored.contains(&id) || query.ignored.contains(&object) {
                    return None;
                }
                let world = self.world_transform(id)?;
                let distance = math::ray_obb(
                    &query.ray,
                    world.translation,
                    world.rotation,
                    pick.half_extents * world.scale.abs(),
                )?;
                Some(TraceHit {
                    object,
                    part: id,
                    distance,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn duplicate_object(&mut self, object: NodeId) -> Option<NodeId> {
        let root = self.entity(object)?;
        if !self.is_object(root) {
            return None;
        }
        // originals come parent first, so every parent is mapped before its children
        let mut mapping: Vec<(NodeId, Entity)> = Vec::new();
        let mut root_clone = None;
        for original in self.object_nodes(object) {
            let Some(source) = self.entity(original) else {
                continue;
            };
            let parent = if original == object {
                self.world.get::<ChildOf>(source).map(ChildOf::parent)
            } else {
                let original_parent = self.parent(original);
                mapping
                    .iter()
                    .find(|(o, _)| Some(*o) == original_parent)
                    .map(|(_, clone)| *clone)
            };
            let local = self.local_transform(source);
            let (id, entity) = self.clone_node(source, parent, local, original == object);
            if original == object {
                root_clone = Some(id);
            }
            mapping.push((original, entity));
        }
        root_clone
    }

    fn duplicate_part(&mut self, part: NodeId) -> Option<NodeId> {
        let source = self.entity(part)?;
        if self.is_object(source) {
            // a copied root becomes a part placed on the original root
            return Some(self.clone_node(source, Some(source), Transform::IDENTITY, false).0);
        }
        let parent = self.world.get::<ChildOf>(source).map(ChildOf::parent);
        let local = self.local_transform(source);
        Some(self.clone_node(source, parent, local, false).0)
    }

    fn attach(&mut self, node: NodeId, parent: NodeId) {
        if node == parent || !self.contains(parent) || self.is_descendant(parent, node) {
            tracing::warn!("[scene] refusing to attach {node} under {parent}");
            return;
        }
        let Some(world) = self.world_transform(node) else {
            return;
        };
        self.set_parent(node, Some(parent));
        self.set_world_transform(node, &world);
    }

    fn destroy_part(&mut self, part: NodeId) {
        let Some(entity) = self.entity(part) else {
            return;
        };
        if self.is_object(entity) {
            self.destroy_object(part);
        } else {
            self.remove_nodes(&[part]);
        }
    }

    fn destroy_object(&mut self, object: NodeId) {
        if !self.contains(object) {
            return;
        }
        let nodes = self.object_nodes(object);
        self.remove_nodes(&nodes);
    }

    fn focus_hook(&mut self, node: NodeId) -> Option<&mut dyn FocusHook> {
        let entity = self.entity(node)?;
        self.world
            .get_mut::<Focusable>(entity)
            .map(|focusable| focusable.into_inner() as &mut dyn FocusHook)
    }

    fn is_replicated(&self, node: NodeId) -> bool {
        self.entity(node)
            .is_some_and(|entity| self.world.get::<NotReplicated>(entity).is_none())
    }

    fn has_begun_play(&self, node: NodeId) -> bool {
        self.entity(node)
            .is_some_and(|entity| self.world.get::<AwaitingPlay>(entity).is_none())
    }
}
