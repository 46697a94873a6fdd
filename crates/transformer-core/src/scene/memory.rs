//! In-memory scene used by tests, tools and the loopback network.

use std::collections::BTreeMap;

use bevy::prelude::*;
use transformer_proto::{NodeId, PawnId, TraceChannel, TraceFilter};

use super::{FocusHook, Mobility, SceneGraph, TraceHit, TraceQuery};
use crate::math;

/// Notification received by a focusable node.
#[derive(Debug, Clone, PartialEq)]
pub enum FocusNotice {
    Focus(PawnId),
    Unfocus(PawnId),
    NewTransform {
        pawn: PawnId,
        transform: Transform,
        part_based: bool,
    },
}

#[derive(Debug, Clone, Default)]
struct FocusRecorder {
    notices: Vec<FocusNotice>,
}

impl FocusHook for FocusRecorder {
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

#[derive(Debug, Clone)]
struct MemoryNode {
    parent: Option<NodeId>,
    is_root: bool,
    local: Transform,
    mobility: Mobility,
    pick_half_extents: Option<Vec3>,
    object_type: TraceChannel,
    blocks: Vec<TraceChannel>,
    profile: String,
    replicated: bool,
    begun_play: bool,
    focus: Option<FocusRecorder>,
}

impl MemoryNode {
    fn new(parent: Option<NodeId>, is_root: bool, local: Transform, begun_play: bool) -> Self {
        Self {
            parent,
            is_root,
            local,
            mobility: Mobility::Movable,
            pick_half_extents: None,
            object_type: TraceChannel::WORLD_DYNAMIC,
            blocks: vec![TraceChannel::VISIBILITY],
            profile: String::from("BlockAll"),
            replicated: true,
            begun_play,
            focus: None,
        }
    }

    fn passes(&self, filter: &TraceFilter) -> bool {
        match filter {
            TraceFilter::ObjectTypes(types) => types.contains(&self.object_type),
            TraceFilter::Channel(channel) => self.blocks.contains(channel),
            TraceFilter::Profile(name) => self.profile == *name,
        }
    }
}

/// A plain node tree: objects are root nodes, parts are their non-root descendants.
///
/// Object roots may themselves be attached under nodes of other objects.
#[derive(Debug, Clone)]
pub struct MemoryScene {
    nodes: BTreeMap<NodeId, MemoryNode>,
    next_id: u64,
    auto_begin_play: bool,
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryScene {
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            next_id: 1,
            auto_begin_play: true,
        }
    }

    /// Whether nodes spawned from now on are immediately ready.
    pub fn set_auto_begin_play(&mut self, enabled: bool) {
        self.auto_begin_play = enabled;
    }

    fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn insert(&mut self, parent: Option<NodeId>, is_root: bool, local: Transform) -> NodeId {
        let id = self.allocate();
        self.nodes
            .insert(id, MemoryNode::new(parent, is_root, local, self.auto_begin_play));
        id
    }

    /// Spawn a top-level object with a unit pick box.
    pub fn spawn_object(&mut self, transform: Transform) -> NodeId {
        let id = self.insert(None, true, transform);
        self.set_pick_box(id, Vec3::ONE);
        id
    }

    /// Spawn an object attached under `parent` at `local`.
    pub fn spawn_child_object(&mut self, parent: NodeId, local: Transform) -> NodeId {
        let id = self.insert(Some(parent), true, local);
        self.set_pick_box(id, Vec3::ONE);
        id
    }

    /// Add a part under `parent` (an object root or another part).
    pub fn spawn_part(&mut self, parent: NodeId, local: Transform) -> NodeId {
        let id = self.insert(Some(parent), false, local);
        self.set_pick_box(id, Vec3::splat(0.5));
        id
    }

    pub fn set_pick_box(&mut self, node: NodeId, half_extents: Vec3) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.pick_half_extents = Some(half_extents);
        }
    }

    pub fn clear_pick_box(&mut self, node: NodeId) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.pick_half_extents = None;
        }
    }

    pub fn set_trace_layer(&mut self, node: NodeId, object_type: TraceChannel, blocks: Vec<TraceChannel>, profile: &str) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.object_type = object_type;
            n.blocks = blocks;
            n.profile = profile.to_string();
        }
    }

    pub fn set_replicated(&mut self, node: NodeId, replicated: bool) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.replicated = replicated;
        }
    }

    pub fn set_focusable(&mut self, node: NodeId) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.focus.get_or_insert_with(FocusRecorder::default);
        }
    }

    pub fn mark_begun_play(&mut self, node: NodeId) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.begun_play = true;
        }
    }

    pub fn focus_notices(&self, node: NodeId) -> &[FocusNotice] {
        self.nodes
            .get(&node)
            .and_then(|n| n.focus.as_ref())
            .map_or(&[], |f| f.notices.as_slice())
    }

    pub fn local_transform(&self, node: NodeId) -> Option<Transform> {
        self.nodes.get(&node).map(|n| n.local)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.parent == Some(node))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn objects(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.is_root)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Nodes of `object`: its root and every descendant that is not another object.
    fn object_nodes(&self, object: NodeId) -> Vec<NodeId> {
        let mut out = vec![object];
        let mut cursor = 0;
        while cursor < out.len() {
            let current = out[cursor];
            out.extend(
                self.nodes
                    .iter()
                    .filter(|(_, n)| n.parent == Some(current) && !n.is_root)
                    .map(|(id, _)| *id),
            );
            cursor += 1;
        }
        out
    }

    /// Copy `object` from another peer's scene keeping its node ids, as replication would.
    pub fn import_object(&mut self, source: &MemoryScene, object: NodeId) -> bool {
        if !source.nodes.get(&object).is_some_and(|n| n.is_root) {
            return false;
        }
        for id in source.object_nodes(object) {
            if let Some(node) = source.nodes.get(&id) {
                self.nodes.insert(id, node.clone());
                self.next_id = self.next_id.max(id.0 + 1);
            }
        }
        true
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

    /// Remove `nodes` (ancestors first in the slice), re-attaching surviving
    /// children to the parent of the removed node.
    fn remove_nodes(&mut self, nodes: &[NodeId]) {
        for id in nodes.iter().rev() {
            let Some(parent) = self.nodes.get(id).map(|n| n.parent) else {
                continue;
            };
            for child in self.children(*id) {
                if nodes.contains(&child) {
                    continue;
                }
                let world = self.world_transform(child);
                if let Some(n) = self.nodes.get_mut(&child) {
                    n.parent = parent;
                }
                if let Some(world) = world {
                    self.set_world_transform(child, &world);
                }
            }
            self.nodes.remove(id);
        }
    }
}

impl SceneGraph for MemoryScene {
    fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn owner(&self, node: NodeId) -> Option<NodeId> {
        let mut cursor = node;
        loop {
            let current = self.nodes.get(&cursor)?;
            if current.is_root {
                return Some(cursor);
            }
            cursor = current.parent?;
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    fn part_count(&self, object: NodeId) -> usize {
        if self.contains(object) {
            self.object_nodes(object).len()
        } else {
            0
        }
    }

    fn world_transform(&self, node: NodeId) -> Option<Transform> {
        let current = self.nodes.get(&node)?;
        match current.parent {
            Some(parent) => Some(math::compose(&self.world_transform(parent)?, &current.local)),
            None => Some(current.local),
        }
    }

    fn set_world_transform(&mut self, node: NodeId, transform: &Transform) {
        let parent_world = self.parent(node).and_then(|p| self.world_transform(p));
        if let Some(n) = self.nodes.get_mut(&node) {
            n.local = match parent_world {
                Some(parent_world) => math::relative_to(transform, &parent_world),
                None => *transform,
            };
        }
    }

    fn mobility(&self, node: NodeId) -> Mobility {
        self.nodes.get(&node).map_or(Mobility::Static, |n| n.mobility)
    }

    fn set_mobility(&mut self, node: NodeId, mobility: Mobility) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.mobility = mobility;
        }
    }

    fn trace(&self, query: &TraceQuery<'_>) -> Vec<TraceHit> {
        let mut hits: Vec<TraceHit> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.passes(query.filter))
            .filter_map(|(id, n)| {
                let half_extents = n.pick_half_extents?;
                let object = self.owner(*id)?;
                if query.ignored.contains(id) || query.ignored.contains(&object) {
                    return None;
                }
                let world = self.world_transform(*id)?;
                let distance = math::ray_obb(
                    &query.ray,
                    world.translation,
                    world.rotation,
                    half_extents * world.scale.abs(),
                )?;
                Some(TraceHit {
                    object,
                    part: *id,
                    distance,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn duplicate_object(&mut self, object: NodeId) -> Option<NodeId> {
        if !self.nodes.get(&object)?.is_root {
            return None;
        }
        let originals = self.object_nodes(object);
        let mut mapping = BTreeMap::new();
        for original in &originals {
            mapping.insert(*original, self.allocate());
        }
        for original in &originals {
            let Some(mut node) = self.nodes.get(original).cloned() else {
                continue;
            };
            if *original != object {
                node.parent = node.parent.and_then(|p| mapping.get(&p).copied());
            }
            node.begun_play = self.auto_begin_play;
            if let Some(focus) = node.focus.as_mut() {
                focus.notices.clear();
            }
            self.nodes.insert(mapping[original], node);
        }
        mapping.get(&object).copied()
    }

    fn duplicate_part(&mut self, part: NodeId) -> Option<NodeId> {
        let original = self.nodes.get(&part)?.clone();
        let mut node = original;
        if node.is_root {
            // a copied root becomes a part placed on the original root
            node.parent = Some(part);
            node.local = Transform::IDENTITY;
            node.is_root = false;
        }
        node.begun_play = self.auto_begin_play;
        if let Some(focus) = node.focus.as_mut() {
            focus.notices.clear();
        }
        let id = self.allocate();
        self.nodes.insert(id, node);
        Some(id)
    }

    fn attach(&mut self, node: NodeId, parent: NodeId) {
        if node == parent || !self.contains(parent) || self.is_descendant(parent, node) {
            tracing::warn!("[scene] refusing to attach {node} under {parent}");
            return;
        }
        let Some(world) = self.world_transform(node) else {
            return;
        };
        if let Some(n) = self.nodes.get_mut(&node) {
            n.parent = Some(parent);
        }
        self.set_world_transform(node, &world);
    }

    fn destroy_part(&mut self, part: NodeId) {
        let Some(node) = self.nodes.get(&part) else {
            return;
        };
        if node.is_root {
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
        self.nodes
            .get_mut(&node)?
            .focus
            .as_mut()
            .map(|f| f as &mut dyn FocusHook)
    }

    fn is_replicated(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.replicated)
    }

    fn has_begun_play(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.begun_play)
    }
}
