//! Hierarchy-preserving duplication of the selected targets.
//!
//! Cloning runs in two phases. First every target is duplicated, building
//! an original -> clone map. Then each clone is re-parented: if the
//! original's parent was cloned too the clone goes under that clone,
//! otherwise the parent chain is walked upwards until a cloned ancestor is
//! found or the top of the hierarchy is reached, in which case the clone
//! stays under the original parent. A clone is never attached to itself.

use std::collections::{HashMap, HashSet};

use transformer_proto::NodeId;

use crate::scene::SceneGraph;

/// Decide the new parent of every clone.
///
/// `parent_of` walks the hierarchy the targets live in and `is_top` marks
/// nodes above which no cloned ancestor can exist. A top node is its own
/// original parent, so its clone is placed on the original.
pub fn plan_reparenting(
    clones: &[(NodeId, NodeId)],
    parent_of: impl Fn(NodeId) -> Option<NodeId>,
    is_top: impl Fn(NodeId) -> bool,
) -> Vec<(NodeId, NodeId)> {
    let cloned: HashMap<NodeId, NodeId> = clones.iter().copied().collect();

    clones
        .iter()
        .filter_map(|&(original, clone)| {
            let original_parent = if is_top(original) {
                original
            } else {
                parent_of(original)?
            };

            if let Some(&cloned_parent) = cloned.get(&original_parent) {
                let parent = if cloned_parent == clone {
                    original_parent
                } else {
                    cloned_parent
                };
                return Some((clone, parent));
            }

            let mut cursor = original_parent;
            loop {
                if is_top(cursor) {
                    return Some((clone, original_parent));
                }
                let Some(up) = parent_of(cursor) else {
                    return Some((clone, original_parent));
                };
                if let Some(&cloned_parent) = cloned.get(&up) {
                    if cloned_parent != clone {
                        return Some((clone, cloned_parent));
                    }
                }
                cursor = up;
            }
        })
        .collect()
}

/// Duplicate `targets` and rebuild their hierarchy among the clones.
///
/// In object mode whole objects are duplicated (each owner once) and the
/// hierarchy considered is the object attachment tree. In part-based mode
/// parts are duplicated within their owner and the walk stops at the
/// owner's root. Returns the clones in target order.
pub fn clone_targets(scene: &mut dyn SceneGraph, targets: &[NodeId], part_based: bool) -> Vec<NodeId> {
    let mut pairs = Vec::new();
    let mut seen = HashSet::new();

    for target in targets {
        let Some(owner) = scene.owner(*target) else {
            continue;
        };
        let original = if part_based { *target } else { owner };
        if !seen.insert(original) {
            continue;
        }
        let duplicate = if part_based {
            scene.duplicate_part(original)
        } else {
            scene.duplicate_object(original)
        };
        match duplicate {
            Some(clone) => pairs.push((original, clone)),
            None => tracing::warn!("[clone] failed to duplicate {original}"),
        }
    }

    let plan = {
        let view: &dyn SceneGraph = scene;
        if part_based {
            plan_reparenting(
                &pairs,
                |n| view.parent(n),
                |n| view.owner(n) == Some(n),
            )
        } else {
            plan_reparenting(
                &pairs,
                |n| view.parent(n).and_then(|p| view.owner(p)),
                |_| false,
            )
        }
    };

    for (clone, parent) in plan {
        if clone != parent && scene.parent(clone) != Some(parent) {
            scene.attach(clone, parent);
        }
    }

    tracing::info!("[clone] cloned {} target(s)", pairs.len());
    pairs.into_iter().map(|(_, clone)| clone).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MemoryScene;
    use bevy::prelude::*;

    #[test]
    fn test_plan_never_attaches_clone_to_itself() {
        // a top node cloned alone: its original parent is itself
        let plan = plan_reparenting(&[(NodeId(1), NodeId(10))], |_| None, |n| n == NodeId(1));
        assert_eq!(plan, vec![(NodeId(10), NodeId(1))]);
    }

    #[test]
    fn test_plan_skips_uncloned_middle() {
        // 1 <- 2 <- 3, only 1 and 3 cloned
        let parent = |n: NodeId| match n.0 {
            2 => Some(NodeId(1)),
            3 => Some(NodeId(2)),
            _ => None,
        };
        let plan = plan_reparenting(&[(NodeId(1), NodeId(11)), (NodeId(3), NodeId(13))], parent, |_| false);
        assert!(plan.contains(&(NodeId(13), NodeId(11))));
        assert!(!plan.iter().any(|(c, _)| *c == NodeId(11)));
    }

    #[test]
    fn test_clone_three_level_objects() {
        let mut scene = MemoryScene::new();
        let parent = scene.spawn_object(Transform::from_xyz(1.0, 0.0, 0.0));
        let child = scene.spawn_child_object(parent, Transform::from_xyz(0.0, 2.0, 0.0));
        let grandchild = scene.spawn_child_object(child, Transform::from_xyz(0.0, 0.0, 3.0));

        let clones = clone_targets(&mut scene, &[parent, child, grandchild], false);
        assert_eq!(clones.len(), 3);
        let (p, c, g) = (clones[0], clones[1], clones[2]);

        assert_eq!(scene.parent(p), None);
        assert_eq!(scene.parent(c), Some(p));
        assert_eq!(scene.parent(g), Some(c));

        for (original, clone) in [(parent, p), (child, c), (grandchild, g)] {
            let a = scene.local_transform(original).expect("original");
            let b = scene.local_transform(clone).expect("clone");
            assert!(a.translation.abs_diff_eq(b.translation, 1e-4));
        }
        // originals untouched
        assert_eq!(scene.parent(child), Some(parent));
        assert_eq!(scene.parent(grandchild), Some(child));
    }

    #[test]
    fn test_clone_parts_walks_to_cloned_ancestor() {
        let mut scene = MemoryScene::new();
        let root = scene.spawn_object(Transform::IDENTITY);
        let a = scene.spawn_part(root, Transform::from_xyz(1.0, 0.0, 0.0));
        let b = scene.spawn_part(a, Transform::from_xyz(1.0, 0.0, 0.0));
        let c = scene.spawn_part(b, Transform::from_xyz(1.0, 0.0, 0.0));

        let clones = clone_targets(&mut scene, &[a, c], true);
        assert_eq!(clones.len(), 2);
        assert_eq!(scene.parent(clones[0]), Some(root));
        assert_eq!(scene.parent(clones[1]), Some(clones[0]));
        let world = scene.world_transform(clones[1]).expect("clone");
        assert!(world.translation.abs_diff_eq(Vec3::new(3.0, 0.0, 0.0), 1e-4));
        assert_eq!(scene.owner(clones[1]), Some(root));
    }

    #[test]
    fn test_clone_root_part_lands_on_original_root() {
        let mut scene = MemoryScene::new();
        let root = scene.spawn_object(Transform::from_xyz(0.0, 4.0, 0.0));
        let clones = clone_targets(&mut scene, &[root], true);
        assert_eq!(clones.len(), 1);
        assert_ne!(clones[0], root);
        assert_eq!(scene.parent(clones[0]), Some(root));
        assert_eq!(scene.part_count(root), 2);
    }

    #[test]
    fn test_object_mode_clones_each_owner_once() {
        let mut scene = MemoryScene::new();
        let root = scene.spawn_object(Transform::IDENTITY);
        let part = scene.spawn_part(root, Transform::IDENTITY);
        let clones = clone_targets(&mut scene, &[root, part], false);
        assert_eq!(clones.len(), 1);
        assert_eq!(scene.objects().len(), 2);
    }
}
