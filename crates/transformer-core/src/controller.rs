//! Per-pawn transform controller.
//!
//! Owns the selection, the active gizmo and the current domain of one
//! pawn, and runs the per-tick manipulation: pointer ray -> gizmo delta ->
//! optional snapping -> application to every selected target.

use bevy::prelude::*;
use transformer_proto::{
    NodeId, PawnId, SpaceType, TraceChannel, TraceFilter, TransformationDomain, TransformationType,
};

use crate::cloning;
use crate::config::{GizmoPlacement, TransformerConfig};
use crate::gizmo::{Gizmo, GizmoStateChange, HitRegionId};
use crate::math::{self, RaySegment};
use crate::scene::{Mobility, SceneGraph, TraceHit, TraceQuery};
use crate::selection::{SelectionChange, SelectionManager};

/// Length of the pointer ray used while dragging.
const MANIPULATION_RAY_LENGTH: f32 = 1.0e6;

/// Camera state of the local view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub location: Vec3,
    pub forward: Vec3,
    pub fov_degrees: f32,
}

/// Pointer and camera collaborator.
pub trait ViewSource {
    /// World-space ray under the pointer as `(origin, direction)`.
    fn pointer_ray(&self) -> Option<(Vec3, Vec3)>;

    fn camera(&self) -> Option<CameraView>;
}

/// A view whose pointer and camera are set explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StaticView {
    pub ray: Option<(Vec3, Vec3)>,
    pub camera: Option<CameraView>,
}

impl StaticView {
    /// Pointer ray straight down the camera's forward axis from `location`.
    pub fn looking(location: Vec3, forward: Vec3, fov_degrees: f32) -> Self {
        Self {
            ray: Some((location, forward)),
            camera: Some(CameraView {
                location,
                forward,
                fov_degrees,
            }),
        }
    }

    pub fn with_ray(mut self, origin: Vec3, direction: Vec3) -> Self {
        self.ray = Some((origin, direction));
        self
    }
}

impl ViewSource for StaticView {
    fn pointer_ray(&self) -> Option<(Vec3, Vec3)> {
        self.ray
    }

    fn camera(&self) -> Option<CameraView> {
        self.camera
    }
}

/// One hit considered while resolving a trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickHit {
    Gizmo(HitRegionId),
    Scene(TraceHit),
}

/// Result of one manipulation tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformStep {
    /// Delta computed by the gizmo.
    pub raw: Transform,
    /// Delta actually applied after snapping.
    pub applied: Transform,
}

impl TransformStep {
    fn none() -> Self {
        Self {
            raw: math::zero_delta(),
            applied: math::zero_delta(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransformController {
    pawn: PawnId,
    config: TransformerConfig,
    selection: SelectionManager,
    gizmo: Option<Gizmo>,
    domain: TransformationDomain,
    accumulated: Transform,
    gizmo_events: Vec<GizmoStateChange>,
}

impl TransformController {
    pub fn new(pawn: PawnId, config: TransformerConfig) -> Self {
        let selection = SelectionManager::new(
            pawn,
            config.part_based,
            config.toggle_selected_in_multi_selection,
        );
        Self {
            pawn,
            config,
            selection,
            gizmo: None,
            domain: TransformationDomain::None,
            accumulated: math::zero_delta(),
            gizmo_events: Vec::new(),
        }
    }

    pub fn pawn(&self) -> PawnId {
        self.pawn
    }

    pub fn config(&self) -> &TransformerConfig {
        &self.config
    }

    pub fn selected(&self) -> &[NodeId] {
        self.selection.selected()
    }

    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    pub fn gizmo(&self) -> Option<&Gizmo> {
        self.gizmo.as_ref()
    }

    pub fn domain(&self) -> TransformationDomain {
        self.domain
    }

    /// Current domain and whether a transform is in progress.
    pub fn current_domain(&self) -> (TransformationDomain, bool) {
        (self.domain, !self.domain.is_none())
    }

    pub fn transformation(&self) -> TransformationType {
        self.config.transformation
    }

    pub fn space(&self) -> SpaceType {
        self.config.space
    }

    pub fn part_based(&self) -> bool {
        self.config.part_based
    }

    pub fn accumulated(&self) -> &Transform {
        &self.accumulated
    }

    /// Selected targets and the target the gizmo is placed on.
    pub fn selected_components(&self) -> (Vec<NodeId>, Option<NodeId>) {
        (
            self.selected().to_vec(),
            self.gizmo.as_ref().and_then(Gizmo::attached_to),
        )
    }

    // ========================================================================
    // Settings
    // ========================================================================

    pub fn set_snapping_enabled(&mut self, kind: TransformationType, enabled: bool) {
        self.config.snapping.set_enabled(kind, enabled);
    }

    pub fn set_snapping_value(&mut self, kind: TransformationType, value: f32) {
        self.config.snapping.set_value(kind, value);
    }

    pub fn set_gizmo_placement(&mut self, scene: &mut dyn SceneGraph, placement: GizmoPlacement) {
        self.config.gizmo_placement = placement;
        self.update_gizmo_placement(scene);
    }

    pub fn set_force_mobility(&mut self, force: bool) {
        self.config.force_mobility = force;
    }

    pub fn set_toggle_selected_in_multi_selection(&mut self, toggle: bool) {
        self.config.toggle_selected_in_multi_selection = toggle;
        self.selection.set_toggle_in_multi_selection(toggle);
    }

    pub fn set_transformation_type(&mut self, scene: &mut dyn SceneGraph, kind: TransformationType) {
        if self.config.transformation == kind {
            return;
        }
        if kind == TransformationType::NoTransform {
            tracing::warn!("[controller] transformation set to NoTransform");
        }
        self.config.transformation = kind;
        self.accumulated = math::zero_delta();
        self.update_gizmo_placement(scene);
    }

    pub fn set_space_type(&mut self, scene: &mut dyn SceneGraph, space: SpaceType) {
        self.config.space = space;
        self.update_gizmo_placement(scene);
    }

    pub fn set_rotate_on_local_axis(&mut self, local: bool) {
        self.config.rotate_on_local_axis = local;
    }

    /// Switch between part and object selection, reselecting the equivalent targets.
    pub fn set_part_based(&mut self, scene: &mut dyn SceneGraph, part_based: bool) {
        let previous = self.deselect_all(scene, false);
        self.config.part_based = part_based;
        self.selection.set_part_based(part_based);

        let targets: Vec<NodeId> = if part_based {
            previous
        } else {
            let mut owners = Vec::new();
            for node in previous {
                if let Some(owner) = scene.owner(node) {
                    if !owners.contains(&owner) {
                        owners.push(owner);
                    }
                }
            }
            owners
        };
        self.select_multiple(scene, &targets, false);
    }

    // ========================================================================
    // Domain
    // ========================================================================

    pub fn set_domain(&mut self, domain: TransformationDomain) {
        self.domain = domain;
        if let Some(gizmo) = self.gizmo.as_mut() {
            gizmo.set_transform_progress_state(!domain.is_none(), domain);
        }
    }

    /// End the gesture: drop the snapping remainder and leave the domain.
    pub fn clear_domain(&mut self) {
        self.accumulated = math::zero_delta();
        self.set_domain(TransformationDomain::None);
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn select(&mut self, scene: &mut dyn SceneGraph, node: NodeId, append: bool) {
        if self.selection.select(scene, node, append) {
            self.update_gizmo_placement(scene);
        }
    }

    pub fn select_multiple(&mut self, scene: &mut dyn SceneGraph, nodes: &[NodeId], append: bool) {
        if self.selection.select_multiple(scene, nodes, append) > 0 {
            self.update_gizmo_placement(scene);
        }
    }

    pub fn deselect(&mut self, scene: &mut dyn SceneGraph, node: NodeId) {
        self.selection.deselect(scene, node);
        self.update_gizmo_placement(scene);
    }

    pub fn deselect_all(&mut self, scene: &mut dyn SceneGraph, destroy: bool) -> Vec<NodeId> {
        let removed = self.selection.deselect_all(scene, destroy);
        self.update_gizmo_placement(scene);
        removed
    }

    /// Duplicate the selection. Clones are optionally selected, and an
    /// active gesture carries on with them.
    pub fn clone_selected(&mut self, scene: &mut dyn SceneGraph, select_new_clones: bool, append: bool) -> Vec<NodeId> {
        let targets = self.selected().to_vec();
        let clones = cloning::clone_targets(scene, &targets, self.config.part_based);

        if select_new_clones {
            self.select_multiple(scene, &clones, append);
        }
        if !self.domain.is_none() {
            let domain = self.domain;
            if let Some(gizmo) = self.gizmo.as_mut() {
                gizmo.set_transform_progress_state(true, domain);
            }
        }
        clones
    }

    pub fn log_selection(&self, scene: &dyn SceneGraph) {
        tracing::info!("[selection] {} selected target(s)", self.selection.len());
        for (i, node) in self.selected().iter().enumerate() {
            match scene.owner(*node) {
                Some(owner) => tracing::info!("[selection]   [{i}] {node} owner {owner}"),
                None => tracing::info!("[selection]   [{i}] {node} owner [INVALID]"),
            }
        }
    }

    // ========================================================================
    // Gizmo lifecycle
    // ========================================================================

    /// Create, replace or drop the gizmo to match the selection and kind.
    fn set_gizmo(&mut self) {
        if self.selection.is_empty() {
            self.drop_gizmo();
            return;
        }
        if self
            .gizmo
            .as_ref()
            .is_some_and(|g| g.kind() == self.config.transformation)
        {
            return;
        }
        self.drop_gizmo();
        self.gizmo = Gizmo::new(self.config.transformation, self.config.gizmo);
        if let Some(gizmo) = &self.gizmo {
            tracing::debug!("[gizmo] spawned {:?} gizmo", gizmo.kind());
        }
    }

    fn drop_gizmo(&mut self) {
        if let Some(mut gizmo) = self.gizmo.take() {
            self.gizmo_events.extend(gizmo.drain_events());
            tracing::debug!("[gizmo] destroyed {:?} gizmo", gizmo.kind());
        }
    }

    /// Attach the gizmo to the first or last selected target and align it.
    pub fn update_gizmo_placement(&mut self, scene: &mut dyn SceneGraph) {
        self.set_gizmo();
        let target = match self.config.gizmo_placement {
            GizmoPlacement::FirstSelection => self.selection.first(),
            GizmoPlacement::LastSelection => self.selection.last(),
        };
        let space = self.config.space;
        let Some(gizmo) = self.gizmo.as_mut() else {
            return;
        };
        match target.and_then(|t| scene.world_transform(t).map(|w| (t, w))) {
            Some((node, world)) => gizmo.attach_to(node, &world, space),
            None => gizmo.detach(),
        }
    }

    /// Move the gizmo with its target and keep it sized for `camera`.
    pub fn refresh(&mut self, scene: &mut dyn SceneGraph, camera: Option<CameraView>) {
        if self
            .gizmo
            .as_ref()
            .and_then(Gizmo::attached_to)
            .is_some_and(|node| !scene.contains(node))
        {
            self.selection.prune(scene);
            self.update_gizmo_placement(scene);
        }

        let space = self.config.space;
        let Some(gizmo) = self.gizmo.as_mut() else {
            return;
        };
        if let Some((node, world)) = gizmo
            .attached_to()
            .and_then(|node| scene.world_transform(node).map(|world| (node, world)))
        {
            gizmo.attach_to(node, &world, space);
        }
        if let Some(camera) = camera {
            gizmo.scale_to_view(camera.location, camera.forward, camera.fov_degrees);
        }
    }

    // ========================================================================
    // Tracing
    // ========================================================================

    pub fn pointer_segment(&self, view: &dyn ViewSource) -> Option<RaySegment> {
        view.pointer_ray()
            .map(|(origin, direction)| RaySegment::from_origin(origin, direction, self.config.trace_distance))
    }

    fn filter_hits(&self, scene: &dyn SceneGraph, hits: &mut Vec<TraceHit>) {
        if !self.config.ignore_non_replicated {
            return;
        }
        let part_based = self.config.part_based;
        hits.retain(|hit| {
            let keep = scene.is_replicated(hit.object) && (!part_based || scene.is_replicated(hit.part));
            if !keep {
                tracing::warn!(
                    "[controller] dropping hit on {} (part {}): not replicated",
                    hit.object,
                    hit.part
                );
            }
            keep
        });
    }

    /// Trace the scene (and, if `use_gizmo`, this pawn's gizmo) and resolve the hits.
    pub fn trace_with(
        &mut self,
        scene: &mut dyn SceneGraph,
        ray: &RaySegment,
        filter: &TraceFilter,
        ignored: &[NodeId],
        append: bool,
        use_gizmo: bool,
    ) -> bool {
        let mut hits = scene.trace(&TraceQuery {
            ray: *ray,
            filter,
            ignored,
        });
        self.filter_hits(scene, &mut hits);

        let mut picks: Vec<PickHit> = Vec::with_capacity(hits.len() + 1);
        if use_gizmo {
            if let Some(hit) = self.gizmo.as_ref().and_then(|g| g.trace(ray)) {
                picks.push(PickHit::Gizmo(hit.region));
            }
        }
        picks.extend(hits.into_iter().map(PickHit::Scene));

        if picks.is_empty() {
            return false;
        }
        self.handle_traced_hits(scene, &picks, append)
    }

    pub fn trace(
        &mut self,
        scene: &mut dyn SceneGraph,
        ray: &RaySegment,
        filter: &TraceFilter,
        ignored: &[NodeId],
        append: bool,
    ) -> bool {
        self.trace_with(scene, ray, filter, ignored, append, true)
    }

    pub fn trace_by_object_types(
        &mut self,
        scene: &mut dyn SceneGraph,
        start: Vec3,
        end: Vec3,
        channels: Vec<TraceChannel>,
        ignored: &[NodeId],
        append: bool,
    ) -> bool {
        let filter = TraceFilter::ObjectTypes(channels);
        self.trace(scene, &RaySegment::new(start, end), &filter, ignored, append)
    }

    pub fn trace_by_channel(
        &mut self,
        scene: &mut dyn SceneGraph,
        start: Vec3,
        end: Vec3,
        channel: TraceChannel,
        ignored: &[NodeId],
        append: bool,
    ) -> bool {
        let filter = TraceFilter::Channel(channel);
        self.trace(scene, &RaySegment::new(start, end), &filter, ignored, append)
    }

    pub fn trace_by_profile(
        &mut self,
        scene: &mut dyn SceneGraph,
        start: Vec3,
        end: Vec3,
        profile: &str,
        ignored: &[NodeId],
        append: bool,
    ) -> bool {
        let filter = TraceFilter::Profile(profile.to_string());
        self.trace(scene, &RaySegment::new(start, end), &filter, ignored, append)
    }

    /// Trace from the pointer. A miss without `append` clears the selection.
    ///
    /// Returns whether the trace hit the gizmo or selected something.
    pub fn mouse_trace(
        &mut self,
        scene: &mut dyn SceneGraph,
        view: &dyn ViewSource,
        filter: &TraceFilter,
        ignored: &[NodeId],
        append: bool,
    ) -> bool {
        let Some(ray) = self.pointer_segment(view) else {
            return false;
        };
        let success = self.trace(scene, &ray, filter, ignored, append);
        if !success && !append {
            self.deselect_all(scene, false);
        }
        success
    }

    pub fn mouse_trace_by_object_types(
        &mut self,
        scene: &mut dyn SceneGraph,
        view: &dyn ViewSource,
        channels: Vec<TraceChannel>,
        ignored: &[NodeId],
        append: bool,
    ) -> bool {
        self.mouse_trace(scene, view, &TraceFilter::ObjectTypes(channels), ignored, append)
    }

    pub fn mouse_trace_by_channel(
        &mut self,
        scene: &mut dyn SceneGraph,
        view: &dyn ViewSource,
        channel: TraceChannel,
        ignored: &[NodeId],
        append: bool,
    ) -> bool {
        self.mouse_trace(scene, view, &TraceFilter::Channel(channel), ignored, append)
    }

    pub fn mouse_trace_by_profile(
        &mut self,
        scene: &mut dyn SceneGraph,
        view: &dyn ViewSource,
        profile: &str,
        ignored: &[NodeId],
        append: bool,
    ) -> bool {
        self.mouse_trace(scene, view, &TraceFilter::Profile(profile.to_string()), ignored, append)
    }

    /// Resolve traced hits: our gizmo first, then the first scene hit becomes a selection.
    pub fn handle_traced_hits(&mut self, scene: &mut dyn SceneGraph, hits: &[PickHit], append: bool) -> bool {
        self.clear_domain();

        if let Some(gizmo) = self.gizmo.as_ref() {
            let domain = hits
                .iter()
                .filter_map(|hit| match hit {
                    PickHit::Gizmo(region) => Some(gizmo.domain_for(*region)),
                    PickHit::Scene(_) => None,
                })
                .find(|domain| !domain.is_none());
            if let Some(domain) = domain {
                self.set_domain(domain);
                return true;
            }
        }

        let first = hits.iter().find_map(|hit| match hit {
            PickHit::Scene(hit) => Some(*hit),
            PickHit::Gizmo(_) => None,
        });
        let Some(hit) = first else {
            return false;
        };
        let target = if self.config.part_based { hit.part } else { hit.object };
        self.select(scene, target, append);
        true
    }

    // ========================================================================
    // Manipulation
    // ========================================================================

    /// Gizmo delta for `ray`, snapped if enabled, applied to the selection.
    pub fn update_transform(&mut self, scene: &mut dyn SceneGraph, look: Vec3, ray: &RaySegment) -> TransformStep {
        let domain = self.domain;
        let snap = self.config.snapping.active_value(self.config.transformation);
        let Some(gizmo) = self.gizmo.as_mut() else {
            return TransformStep::none();
        };
        if domain.is_none() {
            return TransformStep::none();
        }

        let raw = gizmo.delta_transform(look, ray, domain);
        let applied = match snap {
            Some(snap) => gizmo.snapped_transform(&mut self.accumulated, &raw, domain, snap),
            None => raw,
        };
        self.apply_delta_transform(scene, &applied);
        TransformStep { raw, applied }
    }

    /// Snap a whole-gesture delta the way a fresh gesture would.
    pub fn quantize_gesture(&self, delta: &Transform) -> Transform {
        let snap = self.config.snapping.active_value(self.config.transformation);
        match (self.gizmo.as_ref(), snap) {
            (Some(gizmo), Some(snap)) if !self.domain.is_none() => {
                let mut remainder = math::zero_delta();
                gizmo.snapped_transform(&mut remainder, delta, self.domain, snap)
            }
            _ => *delta,
        }
    }

    fn has_selected_ancestor(&self, scene: &dyn SceneGraph, node: NodeId) -> bool {
        let mut cursor = scene.parent(node);
        while let Some(current) = cursor {
            if self.selection.contains(current) {
                return true;
            }
            cursor = scene.parent(current);
        }
        false
    }

    /// Apply `delta` about the gizmo to every selected target.
    ///
    /// Targets below another selected target are carried by it and are not
    /// moved a second time.
    pub fn apply_delta_transform(&mut self, scene: &mut dyn SceneGraph, delta: &Transform) {
        let Some(gizmo) = self.gizmo.as_ref() else {
            return;
        };
        let origin = gizmo.location();
        let domain = self.domain;
        let snap = self.config.snapping.active_value(self.config.transformation);

        let targets: Vec<(NodeId, Transform)> = self
            .selected()
            .iter()
            .filter(|node| !self.has_selected_ancestor(scene, **node))
            .filter_map(|node| scene.world_transform(*node).map(|t| (*node, t)))
            .collect();

        let mut updates = Vec::with_capacity(targets.len());
        for (node, current) in targets {
            if !self.config.force_mobility && scene.mobility(node) != Mobility::Movable {
                tracing::warn!("[controller] {node} is not movable, transform skipped");
                continue;
            }

            let mut offset = current.translation - origin;
            if !self.config.rotate_on_local_axis {
                offset = delta.rotation * offset;
            }
            let mut next = Transform {
                translation: offset + origin + delta.translation,
                rotation: (delta.rotation * current.rotation).normalize(),
                scale: current.scale + current.rotation.inverse() * delta.scale,
            };
            if let Some(snap) = snap {
                next = gizmo.snapped_per_component(&current, &next, domain, snap);
            }
            updates.push((node, next));
        }

        for (node, next) in updates {
            scene.set_mobility(node, Mobility::Movable);
            self.set_transform(scene, node, &next);
        }
    }

    /// Deliver a new world transform, honouring the target's focus hook.
    fn set_transform(&self, scene: &mut dyn SceneGraph, node: NodeId, transform: &Transform) {
        let focusable = match scene.focus_hook(node) {
            Some(hook) => {
                hook.on_new_transform(self.pawn, node, transform, self.config.part_based);
                true
            }
            None => false,
        };
        if !focusable || self.config.transform_focusable_objects {
            scene.set_world_transform(node, transform);
        }
    }

    /// One frame of manipulation for a locally controlled pawn.
    pub fn tick(&mut self, scene: &mut dyn SceneGraph, view: &dyn ViewSource) -> Option<TransformStep> {
        self.gizmo.as_ref()?;

        let camera = view.camera();
        let step = match (view.pointer_ray(), camera) {
            (Some((origin, direction)), Some(camera)) => {
                let ray = RaySegment::from_origin(origin, direction, MANIPULATION_RAY_LENGTH);
                Some(self.update_transform(scene, camera.forward, &ray))
            }
            _ => None,
        };
        self.refresh(scene, camera);
        step
    }

    pub fn drain_selection_events(&mut self) -> Vec<SelectionChange> {
        self.selection.drain_events()
    }

    pub fn drain_gizmo_events(&mut self) -> Vec<GizmoStateChange> {
        let mut events = std::mem::take(&mut self.gizmo_events);
        if let Some(gizmo) = self.gizmo.as_mut() {
            events.extend(gizmo.drain_events());
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{FocusNotice, MemoryScene};
    use crate::test_utils::init_test_tracing;
    use std::f32::consts::FRAC_PI_2;

    fn down(x: f32, y: f32) -> StaticView {
        StaticView::looking(Vec3::new(x, y, 100.0), Vec3::NEG_Z, 90.0)
    }

    fn controller() -> TransformController {
        TransformController::new(PawnId::new(), TransformerConfig::default())
    }

    fn filter() -> TraceFilter {
        TraceFilter::default()
    }

    #[test]
    fn test_trace_selects_and_attaches_gizmo() {
        init_test_tracing();
        let mut scene = MemoryScene::new();
        let a = scene.spawn_object(Transform::from_xyz(0.0, 0.0, 0.0));
        let mut c = controller();
        assert!(c.selected().is_empty());

        assert!(c.mouse_trace(&mut scene, &down(0.0, 0.0), &filter(), &[], false));

        assert_eq!(c.selected(), &[a]);
        let gizmo = c.gizmo().expect("gizmo spawned");
        assert_eq!(gizmo.kind(), TransformationType::Translation);
        assert_eq!(gizmo.attached_to(), Some(a));
        assert_eq!(c.selected_components(), (vec![a], Some(a)));
    }

    #[test]
    fn test_missed_trace_deselects_unless_appending() {
        let mut scene = MemoryScene::new();
        let a = scene.spawn_object(Transform::default());
        let mut c = controller();
        c.select(&mut scene, a, false);

        assert!(!c.mouse_trace(&mut scene, &down(500.0, 500.0), &filter(), &[], true));
        assert_eq!(c.selected(), &[a]);

        assert!(!c.mouse_trace(&mut scene, &down(500.0, 500.0), &filter(), &[], false));
        assert!(c.selected().is_empty());
        assert!(c.gizmo().is_none());
    }

    #[test]
    fn test_gizmo_hit_takes_priority_over_scene() {
        let mut scene = MemoryScene::new();
        let a = scene.spawn_object(Transform::default());
        // Sits right below the unscaled x axis handle.
        let b = scene.spawn_object(Transform::from_xyz(50.0, 0.0, -10.0));
        let mut c = controller();
        c.select(&mut scene, a, false);

        let hits = scene.trace(&TraceQuery {
            ray: RaySegment::new(Vec3::new(50.0, 0.0, 100.0), Vec3::new(50.0, 0.0, -100.0)),
            filter: &filter(),
            ignored: &[],
        });
        assert_eq!(hits.first().map(|h| h.object), Some(b));

        assert!(c.mouse_trace(&mut scene, &down(50.0, 0.0), &filter(), &[], false));
        assert_eq!(c.current_domain(), (TransformationDomain::XAxis, true));
        assert_eq!(c.selected(), &[a]);
        assert!(c.gizmo().is_some_and(Gizmo::is_in_progress));
    }

    #[test]
    fn test_ignored_nodes_are_not_traced() {
        let mut scene = MemoryScene::new();
        let a = scene.spawn_object(Transform::default());
        let mut c = controller();
        assert!(!c.mouse_trace(&mut scene, &down(0.0, 0.0), &filter(), &[a], false));
        assert!(c.selected().is_empty());
    }

    #[test]
    fn test_non_replicated_hits_are_filtered() {
        let mut scene = MemoryScene::new();
        let a = scene.spawn_object(Transform::default());
        scene.set_replicated(a, false);
        let config = TransformerConfig {
            ignore_non_replicated: true,
            ..TransformerConfig::default()
        };
        let mut c = TransformController::new(PawnId::new(), config);

        assert!(!c.mouse_trace(&mut scene, &down(0.0, 0.0), &filter(), &[], false));
        assert!(c.selected().is_empty());
    }

    fn drag(c: &mut TransformController, scene: &mut MemoryScene, xs: &[f32]) {
        for x in xs {
            c.tick(scene, &down(*x, 0.0));
        }
    }

    fn grab_x_axis(c: &mut TransformController, scene: &mut MemoryScene) {
        assert!(c.mouse_trace(scene, &down(50.0, 0.0), &filter(), &[], false));
        assert_eq!(c.domain(), TransformationDomain::XAxis);
    }

    #[test]
    fn test_drag_along_axis_moves_selection() {
        let mut scene = MemoryScene::new();
        let a = scene.spawn_object(Transform::default());
        let mut c = controller();
        c.select(&mut scene, a, false);
        grab_x_axis(&mut c, &mut scene);

        drag(&mut c, &mut scene, &[50.0, 60.0, 77.0]);

        let world = scene.world_transform(a).expect("alive");
        assert!(world.translation.abs_diff_eq(Vec3::new(27.0, 0.0, 0.0), 1e-3));
        assert_eq!(c.gizmo().map(Gizmo::location), Some(world.translation));
    }

    #[test]
    fn test_snapped_drag_moves_whole_steps() {
        let mut scene = MemoryScene::new();
        let a = scene.spawn_object(Transform::default());
        let mut c = controller();
        c.set_snapping_enabled(TransformationType::Translation, true);
        c.set_snapping_value(TransformationType::Translation, 5.0);
        c.select(&mut scene, a, false);
        grab_x_axis(&mut c, &mut scene);

        drag(&mut c, &mut scene, &[50.0, 57.0, 64.0, 71.0]);

        let world = scene.world_transform(a).expect("alive");
        assert!(world.translation.abs_diff_eq(Vec3::new(20.0, 0.0, 0.0), 1e-3));
        assert!((c.accumulated().translation.x - 1.0).abs() < 1e-3);

        c.clear_domain();
        assert_eq!(*c.accumulated(), math::zero_delta());
    }

    #[test]
    fn test_quantize_gesture_matches_incremental_snapping() {
        let mut scene = MemoryScene::new();
        let a = scene.spawn_object(Transform::default());
        let mut c = controller();
        c.set_snapping_enabled(TransformationType::Translation, true);
        c.set_snapping_value(TransformationType::Translation, 5.0);
        c.select(&mut scene, a, false);
        c.set_domain(TransformationDomain::XAxis);

        let raw = Transform {
            translation: Vec3::new(21.0, 0.0, 0.0),
            ..math::zero_delta()
        };
        let settled = c.quantize_gesture(&raw);
        assert!(settled.translation.abs_diff_eq(Vec3::new(20.0, 0.0, 0.0), 1e-4));

        c.clear_domain();
        assert_eq!(c.quantize_gesture(&raw), raw);
    }

    #[test]
    fn test_rotation_pivots_around_gizmo() {
        let mut scene = MemoryScene::new();
        let a = scene.spawn_object(Transform::from_xyz(0.0, 0.0, 0.0));
        let b = scene.spawn_object(Transform::from_xyz(10.0, 0.0, 0.0));
        let mut c = controller();
        c.select(&mut scene, a, false);
        c.select(&mut scene, b, true);
        assert_eq!(c.gizmo().and_then(Gizmo::attached_to), Some(b));

        let delta = Transform {
            rotation: Quat::from_rotation_z(FRAC_PI_2),
            ..math::zero_delta()
        };
        c.apply_delta_transform(&mut scene, &delta);

        let moved = scene.world_transform(a).expect("alive").translation;
        assert!(moved.abs_diff_eq(Vec3::new(10.0, -10.0, 0.0), 1e-3));
        let pivot = scene.world_transform(b).expect("alive").translation;
        assert!(pivot.abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), 1e-3));
    }

    #[test]
    fn test_rotate_on_local_axis_keeps_positions() {
        let mut scene = MemoryScene::new();
        let a = scene.spawn_object(Transform::from_xyz(0.0, 0.0, 0.0));
        let b = scene.spawn_object(Transform::from_xyz(10.0, 0.0, 0.0));
        let mut c = controller();
        c.set_rotate_on_local_axis(true);
        c.select_multiple(&mut scene, &[a, b], false);

        let turn = Quat::from_rotation_z(FRAC_PI_2);
        let delta = Transform {
            rotation: turn,
            ..math::zero_delta()
        };
        c.apply_delta_transform(&mut scene, &delta);

        let world = scene.world_transform(a).expect("alive");
        assert!(world.translation.abs_diff_eq(Vec3::ZERO, 1e-4));
        assert!(world.rotation.abs_diff_eq(turn, 1e-4));
    }

    #[test]
    fn test_static_targets_need_forced_mobility() {
        let mut scene = MemoryScene::new();
        let a = scene.spawn_object(Transform::default());
        scene.set_mobility(a, Mobility::Static);
        let mut c = controller();
        c.select(&mut scene, a, false);

        let delta = Transform {
            translation: Vec3::X,
            ..math::zero_delta()
        };
        c.apply_delta_transform(&mut scene, &delta);
        assert_eq!(scene.world_transform(a).map(|t| t.translation), Some(Vec3::ZERO));

        c.set_force_mobility(true);
        c.apply_delta_transform(&mut scene, &delta);
        assert_eq!(scene.world_transform(a).map(|t| t.translation), Some(Vec3::X));
        assert_eq!(scene.mobility(a), Mobility::Movable);
    }

    #[test]
    fn test_static_target_is_skipped_but_batch_moves() {
        let mut scene = MemoryScene::new();
        let fixed = scene.spawn_object(Transform::default());
        let free = scene.spawn_object(Transform::from_xyz(0.0, 5.0, 0.0));
        scene.set_mobility(fixed, Mobility::Static);
        let mut c = controller();
        c.select_multiple(&mut scene, &[fixed, free], false);

        let delta = Transform {
            translation: Vec3::new(2.0, 0.0, 0.0),
            ..math::zero_delta()
        };
        c.apply_delta_transform(&mut scene, &delta);

        assert_eq!(scene.world_transform(fixed).map(|t| t.translation), Some(Vec3::ZERO));
        let moved = scene.world_transform(free).map(|t| t.translation).expect("free");
        assert!(moved.abs_diff_eq(Vec3::new(2.0, 5.0, 0.0), 1e-5));
        assert_eq!(scene.mobility(fixed), Mobility::Static);
    }

    #[test]
    fn test_nested_selection_moves_once() {
        let mut scene = MemoryScene::new();
        let parent = scene.spawn_object(Transform::default());
        let child = scene.spawn_child_object(parent, Transform::from_xyz(3.0, 0.0, 0.0));
        let mut c = controller();
        c.select_multiple(&mut scene, &[parent, child], false);

        let delta = Transform {
            translation: Vec3::new(5.0, 0.0, 0.0),
            ..math::zero_delta()
        };
        c.apply_delta_transform(&mut scene, &delta);

        let child_world = scene.world_transform(child).expect("alive").translation;
        assert!(child_world.abs_diff_eq(Vec3::new(8.0, 0.0, 0.0), 1e-4));
    }

    #[test]
    fn test_focusable_targets_can_veto_transforms() {
        let mut scene = MemoryScene::new();
        let a = scene.spawn_object(Transform::default());
        scene.set_focusable(a);
        let config = TransformerConfig {
            transform_focusable_objects: false,
            ..TransformerConfig::default()
        };
        let pawn = PawnId::new();
        let mut c = TransformController::new(pawn, config);
        c.select(&mut scene, a, false);

        let delta = Transform {
            translation: Vec3::Y,
            ..math::zero_delta()
        };
        c.apply_delta_transform(&mut scene, &delta);

        assert_eq!(scene.world_transform(a).map(|t| t.translation), Some(Vec3::ZERO));
        assert!(matches!(
            scene.focus_notices(a).last(),
            Some(FocusNotice::NewTransform { pawn: p, .. }) if *p == pawn
        ));
    }

    #[test]
    fn test_transformation_type_swaps_gizmo() {
        let mut scene = MemoryScene::new();
        let a = scene.spawn_object(Transform::default());
        let mut c = controller();
        c.select(&mut scene, a, false);

        c.set_transformation_type(&mut scene, TransformationType::Rotation);
        assert_eq!(c.gizmo().map(Gizmo::kind), Some(TransformationType::Rotation));
        assert_eq!(c.gizmo().and_then(Gizmo::attached_to), Some(a));

        c.set_transformation_type(&mut scene, TransformationType::NoTransform);
        assert!(c.gizmo().is_none());
        assert_eq!(c.selected(), &[a]);
    }

    #[test]
    fn test_space_type_aligns_gizmo() {
        let mut scene = MemoryScene::new();
        let turned = Quat::from_rotation_z(0.5);
        let a = scene.spawn_object(Transform::from_rotation(turned));
        let mut c = controller();
        c.select(&mut scene, a, false);
        assert_eq!(c.gizmo().map(Gizmo::rotation), Some(Quat::IDENTITY));

        c.set_space_type(&mut scene, SpaceType::Local);
        assert!(c.gizmo().is_some_and(|g| g.rotation().abs_diff_eq(turned, 1e-5)));
    }

    #[test]
    fn test_part_mode_switch_collapses_to_owners() {
        let mut scene = MemoryScene::new();
        let a = scene.spawn_object(Transform::default());
        let p1 = scene.spawn_part(a, Transform::from_xyz(1.0, 0.0, 0.0));
        let p2 = scene.spawn_part(a, Transform::from_xyz(-1.0, 0.0, 0.0));
        let mut c = controller();
        c.set_part_based(&mut scene, true);
        c.select_multiple(&mut scene, &[p1, p2], false);
        assert_eq!(c.selected(), &[p1, p2]);

        c.set_part_based(&mut scene, false);
        assert_eq!(c.selected(), &[a]);
    }

    #[test]
    fn test_clone_selected_carries_on_gesture() {
        let mut scene = MemoryScene::new();
        let a = scene.spawn_object(Transform::default());
        let mut c = controller();
        c.select(&mut scene, a, false);
        c.set_domain(TransformationDomain::XAxis);
        c.drain_gizmo_events();

        let clones = c.clone_selected(&mut scene, true, false);
        assert_eq!(clones.len(), 1);
        assert_eq!(c.selected(), clones.as_slice());
        assert!(c.gizmo().is_some_and(Gizmo::is_in_progress));
        assert_eq!(c.domain(), TransformationDomain::XAxis);
    }

    #[test]
    fn test_gizmo_events_cover_progress_changes() {
        let mut scene = MemoryScene::new();
        let a = scene.spawn_object(Transform::default());
        let mut c = controller();
        c.select(&mut scene, a, false);
        c.set_domain(TransformationDomain::YAxis);
        c.clear_domain();

        let events = c.drain_gizmo_events();
        assert_eq!(events.len(), 2);
        assert!(events[0].in_progress);
        assert_eq!(events[0].domain, TransformationDomain::YAxis);
        assert!(!events[1].in_progress);
        assert!(c.drain_gizmo_events().is_empty());
    }
}
