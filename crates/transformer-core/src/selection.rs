//! Ordered selection of transform targets.
//!
//! Targets are object roots in object mode and individual parts in
//! part-based mode. Insertion order is kept because the gizmo is placed on
//! the first or last selected target.

use transformer_proto::{NodeId, PawnId};

use crate::scene::SceneGraph;

/// A target entered or left the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionChange {
    pub node: NodeId,
    pub selected: bool,
    /// The target exposes a focus hook and presents its own highlight.
    pub self_managed_focus: bool,
}

#[derive(Debug, Clone)]
pub struct SelectionManager {
    pawn: PawnId,
    selected: Vec<NodeId>,
    part_based: bool,
    toggle_in_multi_selection: bool,
    events: Vec<SelectionChange>,
}

impl SelectionManager {
    pub fn new(pawn: PawnId, part_based: bool, toggle_in_multi_selection: bool) -> Self {
        Self {
            pawn,
            selected: Vec::new(),
            part_based,
            toggle_in_multi_selection,
            events: Vec::new(),
        }
    }

    pub fn selected(&self) -> &[NodeId] {
        &self.selected
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.selected.contains(&node)
    }

    pub fn first(&self) -> Option<NodeId> {
        self.selected.first().copied()
    }

    pub fn last(&self) -> Option<NodeId> {
        self.selected.last().copied()
    }

    pub fn part_based(&self) -> bool {
        self.part_based
    }

    pub(crate) fn set_part_based(&mut self, part_based: bool) {
        self.part_based = part_based;
    }

    pub fn set_toggle_in_multi_selection(&mut self, toggle: bool) {
        self.toggle_in_multi_selection = toggle;
    }

    /// The node that represents `node` as a target in the current mode.
    pub fn resolve_target(&self, scene: &dyn SceneGraph, node: NodeId) -> Option<NodeId> {
        if !scene.contains(node) {
            return None;
        }
        if self.part_based {
            Some(node)
        } else {
            scene.owner(node)
        }
    }

    /// Select one target, replacing the selection unless `append` is set.
    ///
    /// Returns whether the target was valid in this scene.
    pub fn select(&mut self, scene: &mut dyn SceneGraph, node: NodeId, append: bool) -> bool {
        let Some(target) = self.resolve_target(scene, node) else {
            return false;
        };
        if !append {
            self.deselect_all(scene, false);
        }
        self.add(scene, target);
        true
    }

    /// Select several targets in order. The existing selection is only
    /// replaced if at least one entry is valid.
    ///
    /// Returns the number of valid entries.
    pub fn select_multiple(&mut self, scene: &mut dyn SceneGraph, nodes: &[NodeId], mut append: bool) -> usize {
        let mut valid = 0;
        for node in nodes {
            let Some(target) = self.resolve_target(scene, *node) else {
                continue;
            };
            if !append {
                self.deselect_all(scene, false);
                append = true;
            }
            valid += 1;
            self.add(scene, target);
        }
        valid
    }

    fn add(&mut self, scene: &mut dyn SceneGraph, target: NodeId) {
        if let Some(index) = self.selected.iter().position(|n| *n == target) {
            if self.toggle_in_multi_selection {
                self.remove_at(scene, index);
            }
            return;
        }
        self.selected.push(target);
        let self_managed_focus = match scene.focus_hook(target) {
            Some(hook) => {
                hook.on_focus(self.pawn, target);
                true
            }
            None => false,
        };
        self.events.push(SelectionChange {
            node: target,
            selected: true,
            self_managed_focus,
        });
    }

    fn remove_at(&mut self, scene: &mut dyn SceneGraph, index: usize) {
        let target = self.selected.remove(index);
        let self_managed_focus = match scene.focus_hook(target) {
            Some(hook) => {
                hook.on_unfocus(self.pawn, target);
                true
            }
            None => false,
        };
        self.events.push(SelectionChange {
            node: target,
            selected: false,
            self_managed_focus,
        });
    }

    pub fn deselect(&mut self, scene: &mut dyn SceneGraph, node: NodeId) -> bool {
        let target = self.resolve_target(scene, node).unwrap_or(node);
        match self.selected.iter().position(|n| *n == target) {
            Some(index) => {
                self.remove_at(scene, index);
                true
            }
            None => false,
        }
    }

    /// Clear the selection and return what was selected.
    ///
    /// With `destroy`, every removed target is deleted from the scene: a part
    /// of a multi-part object in part-based mode removes only that part,
    /// anything else removes the whole object.
    pub fn deselect_all(&mut self, scene: &mut dyn SceneGraph, destroy: bool) -> Vec<NodeId> {
        let removed = self.selected.clone();
        while !self.selected.is_empty() {
            self.remove_at(scene, 0);
        }

        if destroy {
            for target in &removed {
                if !scene.contains(*target) {
                    continue;
                }
                let Some(object) = scene.owner(*target) else {
                    continue;
                };
                if self.part_based && scene.part_count(object) > 1 {
                    scene.destroy_part(*target);
                } else {
                    scene.destroy_object(object);
                }
            }
            tracing::info!("[selection] destroyed {} deselected target(s)", removed.len());
        }

        removed
    }

    /// Drop targets that no longer exist in the scene.
    pub fn prune(&mut self, scene: &mut dyn SceneGraph) {
        let mut index = 0;
        while index < self.selected.len() {
            if scene.contains(self.selected[index]) {
                index += 1;
            } else {
                self.remove_at(scene, index);
            }
        }
    }

    pub fn drain_events(&mut self) -> Vec<SelectionChange> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{FocusNotice, MemoryScene};
    use bevy::prelude::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn scene_with(n: usize) -> (MemoryScene, Vec<NodeId>) {
        let mut scene = MemoryScene::new();
        let ids = (0..n)
            .map(|i| scene.spawn_object(Transform::from_xyz(i as f32 * 3.0, 0.0, 0.0)))
            .collect();
        (scene, ids)
    }

    #[test]
    fn test_select_replaces_unless_append() {
        let (mut scene, ids) = scene_with(3);
        let mut selection = SelectionManager::new(PawnId::new(), false, true);
        selection.select(&mut scene, ids[0], false);
        selection.select(&mut scene, ids[1], true);
        assert_eq!(selection.selected(), &[ids[0], ids[1]]);

        selection.select(&mut scene, ids[2], false);
        assert_eq!(selection.selected(), &[ids[2]]);
    }

    #[test]
    fn test_toggle_invariant_random_sequences() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..50 {
            let (mut scene, ids) = scene_with(6);
            let mut selection = SelectionManager::new(PawnId::new(), false, true);
            let mut model: Vec<NodeId> = Vec::new();

            for _ in 0..40 {
                let node = ids[rng.random_range(0..ids.len())];
                if rng.random_bool(0.7) {
                    selection.select(&mut scene, node, true);
                    if let Some(i) = model.iter().position(|n| *n == node) {
                        model.remove(i);
                    } else {
                        model.push(node);
                    }
                } else {
                    selection.deselect(&mut scene, node);
                    model.retain(|n| *n != node);
                }
            }
            assert_eq!(selection.selected(), model.as_slice());
        }
    }

    #[test]
    fn test_odd_selection_counts_survive() {
        let (mut scene, ids) = scene_with(4);
        let mut selection = SelectionManager::new(PawnId::new(), false, true);
        let picks = [0, 1, 2, 1, 3, 3, 3, 0, 0];
        for p in picks {
            selection.select(&mut scene, ids[p], true);
        }
        // counts: 0 -> 3, 1 -> 2, 2 -> 1, 3 -> 3
        let mut expected = vec![ids[0], ids[2], ids[3]];
        expected.sort();
        let mut got = selection.selected().to_vec();
        got.sort();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_no_toggle_keeps_single_entry() {
        let (mut scene, ids) = scene_with(1);
        let mut selection = SelectionManager::new(PawnId::new(), false, false);
        selection.select(&mut scene, ids[0], true);
        selection.select(&mut scene, ids[0], true);
        assert_eq!(selection.selected(), &[ids[0]]);
    }

    #[test]
    fn test_object_mode_resolves_parts_to_owner() {
        let mut scene = MemoryScene::new();
        let root = scene.spawn_object(Transform::IDENTITY);
        let part = scene.spawn_part(root, Transform::from_xyz(0.0, 1.0, 0.0));
        let mut selection = SelectionManager::new(PawnId::new(), false, true);
        selection.select(&mut scene, part, false);
        assert_eq!(selection.selected(), &[root]);

        let mut parts = SelectionManager::new(PawnId::new(), true, true);
        parts.select(&mut scene, part, false);
        assert_eq!(parts.selected(), &[part]);
    }

    #[test]
    fn test_focus_hooks_and_events() {
        let (mut scene, ids) = scene_with(2);
        scene.set_focusable(ids[0]);
        let pawn = PawnId::new();
        let mut selection = SelectionManager::new(pawn, false, true);
        selection.select(&mut scene, ids[0], false);
        selection.select(&mut scene, ids[1], true);
        selection.deselect_all(&mut scene, false);

        assert_eq!(
            scene.focus_notices(ids[0]),
            &[FocusNotice::Focus(pawn), FocusNotice::Unfocus(pawn)]
        );
        let events = selection.drain_events();
        assert_eq!(events.len(), 4);
        assert!(events[0].selected && events[0].self_managed_focus);
        assert!(events[1].selected && !events[1].self_managed_focus);
        assert!(!events[2].selected);
    }

    #[test]
    fn test_select_multiple_ignores_invalid_and_keeps_selection_on_empty() {
        let (mut scene, ids) = scene_with(2);
        let mut selection = SelectionManager::new(PawnId::new(), false, true);
        selection.select(&mut scene, ids[0], false);

        assert_eq!(selection.select_multiple(&mut scene, &[NodeId(999)], false), 0);
        assert_eq!(selection.selected(), &[ids[0]]);

        assert_eq!(selection.select_multiple(&mut scene, &[NodeId(999), ids[1]], false), 1);
        assert_eq!(selection.selected(), &[ids[1]]);
    }

    #[test]
    fn test_deselect_all_destroy() {
        let mut scene = MemoryScene::new();
        let multi = scene.spawn_object(Transform::IDENTITY);
        let part = scene.spawn_part(multi, Transform::IDENTITY);
        let single = scene.spawn_object(Transform::from_xyz(5.0, 0.0, 0.0));

        let mut selection = SelectionManager::new(PawnId::new(), true, true);
        selection.select_multiple(&mut scene, &[part, single], false);
        let removed = selection.deselect_all(&mut scene, true);
        assert_eq!(removed, vec![part, single]);
        assert!(selection.is_empty());
        assert!(scene.contains(multi));
        assert!(!scene.contains(part));
        assert!(!scene.contains(single));

        let mut objects = SelectionManager::new(PawnId::new(), false, true);
        objects.select(&mut scene, multi, false);
        objects.deselect_all(&mut scene, true);
        assert!(scene.is_empty());
    }
}
