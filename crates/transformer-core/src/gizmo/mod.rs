//! Gizmos: hit regions, domain lookup and ray-driven delta computation.
//!
//! A [`Gizmo`] is bound to exactly one transformation kind. It owns a set of
//! hit regions, each mapped to a [`TransformationDomain`], and turns two
//! consecutive pointer rays into a delta transform constrained to the active
//! domain. Kind-specific math lives in the `translation`, `rotation` and
//! `scale` submodules; dispatch is a plain `match` on the kind.

pub mod rotation;
pub mod scale;
pub mod translation;

use bevy::prelude::*;
use transformer_proto::{NodeId, SpaceType, TransformationDomain, TransformationType};

use crate::config::GizmoTuning;
use crate::math::{self, RaySegment};

/// Smallest camera distance used when sizing the gizmo.
const MIN_VIEW_DISTANCE: f32 = 1.0;

/// Identifies one hit region within a gizmo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HitRegionId(pub u8);

/// Region shape in gizmo local units (before the view scale is applied).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitShape {
    Box { center: Vec3, half_extents: Vec3 },
    Sphere { center: Vec3, radius: f32 },
    /// Quarter ring about local axis `axis`, covering the quadrant where the
    /// two other local coordinates are non-negative.
    Arc {
        axis: usize,
        radius: f32,
        thickness: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRegion {
    pub id: HitRegionId,
    pub shape: HitShape,
    pub domain: TransformationDomain,
}

/// A ray hit on one of the gizmo's regions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GizmoHit {
    pub region: HitRegionId,
    pub distance: f32,
}

/// Emitted whenever a gizmo enters or leaves the in-progress state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GizmoStateChange {
    pub kind: TransformationType,
    pub in_progress: bool,
    pub domain: TransformationDomain,
}

/// Axis boxes shared by every gizmo kind.
pub(crate) fn axis_regions() -> Vec<HitRegion> {
    [
        TransformationDomain::XAxis,
        TransformationDomain::YAxis,
        TransformationDomain::ZAxis,
    ]
    .into_iter()
    .enumerate()
    .map(|(i, domain)| {
        let mut center = Vec3::ZERO;
        center[i] = 56.0;
        let mut half_extents = Vec3::splat(4.0);
        half_extents[i] = 44.0;
        HitRegion {
            id: HitRegionId(i as u8),
            shape: HitShape::Box {
                center,
                half_extents,
            },
            domain,
        }
    })
    .collect()
}

/// Plane handles and the center sphere used by translation and scale gizmos.
pub(crate) fn plane_and_center_regions() -> Vec<HitRegion> {
    let planes = [
        (TransformationDomain::XYPlane, Vec3::new(24.0, 24.0, 0.0), Vec3::new(12.0, 12.0, 1.5)),
        (TransformationDomain::YZPlane, Vec3::new(0.0, 24.0, 24.0), Vec3::new(1.5, 12.0, 12.0)),
        (TransformationDomain::XZPlane, Vec3::new(24.0, 0.0, 24.0), Vec3::new(12.0, 1.5, 12.0)),
    ];
    let mut regions: Vec<HitRegion> = planes
        .into_iter()
        .enumerate()
        .map(|(i, (domain, center, half_extents))| HitRegion {
            id: HitRegionId(3 + i as u8),
            shape: HitShape::Box {
                center,
                half_extents,
            },
            domain,
        })
        .collect();
    regions.push(HitRegion {
        id: HitRegionId(6),
        shape: HitShape::Sphere {
            center: Vec3::ZERO,
            radius: 10.0,
        },
        domain: TransformationDomain::XYZ,
    });
    regions
}

#[derive(Debug, Clone)]
pub struct Gizmo {
    kind: TransformationType,
    regions: Vec<HitRegion>,
    location: Vec3,
    rotation: Quat,
    view_scale: f32,
    /// Per-axis mirroring of the visual root (rotation gizmo faces the camera).
    view_flip: Vec3,
    attached_to: Option<NodeId>,
    previous_ray: Option<RaySegment>,
    in_progress: bool,
    tuning: GizmoTuning,
    events: Vec<GizmoStateChange>,
}

impl Gizmo {
    /// Create a gizmo for `kind`. There is no gizmo for `NoTransform`.
    pub fn new(kind: TransformationType, tuning: GizmoTuning) -> Option<Self> {
        let regions = match kind {
            TransformationType::NoTransform => return None,
            TransformationType::Translation => translation::hit_regions(),
            TransformationType::Rotation => rotation::hit_regions(),
            TransformationType::Scale => scale::hit_regions(),
        };
        Some(Self {
            kind,
            regions,
            location: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            view_scale: 1.0,
            view_flip: Vec3::ONE,
            attached_to: None,
            previous_ray: None,
            in_progress: false,
            tuning,
            events: Vec::new(),
        })
    }

    pub fn kind(&self) -> TransformationType {
        self.kind
    }

    pub fn location(&self) -> Vec3 {
        self.location
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn view_scale(&self) -> f32 {
        self.view_scale
    }

    pub fn view_flip(&self) -> Vec3 {
        self.view_flip
    }

    pub fn attached_to(&self) -> Option<NodeId> {
        self.attached_to
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn regions(&self) -> &[HitRegion] {
        &self.regions
    }

    pub(crate) fn tuning(&self) -> &GizmoTuning {
        &self.tuning
    }

    /// World direction of local axis `index` (0 = X, 1 = Y, 2 = Z).
    pub fn axis(&self, index: usize) -> Vec3 {
        let mut unit = Vec3::ZERO;
        unit[index.min(2)] = 1.0;
        self.rotation * unit
    }

    pub(crate) fn frame(&self) -> [Vec3; 3] {
        [self.axis(0), self.axis(1), self.axis(2)]
    }

    /// Attach to `node`, snapping to its world transform, then align for `space`.
    pub fn attach_to(&mut self, node: NodeId, target_world: &Transform, space: SpaceType) {
        self.attached_to = Some(node);
        self.location = target_world.translation;
        self.update_space(space, target_world.rotation);
    }

    pub fn detach(&mut self) {
        self.attached_to = None;
    }

    /// Align with the world or with the attached target. Scale gizmos are always local.
    pub fn update_space(&mut self, space: SpaceType, attached_rotation: Quat) {
        self.rotation = match (self.kind, space) {
            (TransformationType::Scale, _) | (_, SpaceType::Local) => attached_rotation,
            (_, SpaceType::World) => Quat::IDENTITY,
        };
    }

    /// Domain mapped to `region`, `None` if the region is not registered.
    pub fn domain_for(&self, region: HitRegionId) -> TransformationDomain {
        self.regions
            .iter()
            .find(|r| r.id == region)
            .map_or(TransformationDomain::None, |r| r.domain)
    }

    fn to_world(&self, local: Vec3) -> Vec3 {
        self.location + self.rotation * (local * self.view_flip * self.view_scale)
    }

    /// Closest region hit by `ray`.
    pub fn trace(&self, ray: &RaySegment) -> Option<GizmoHit> {
        self.regions
            .iter()
            .filter_map(|region| {
                self.trace_region(ray, &region.shape).map(|distance| GizmoHit {
                    region: region.id,
                    distance,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn trace_region(&self, ray: &RaySegment, shape: &HitShape) -> Option<f32> {
        match *shape {
            HitShape::Box {
                center,
                half_extents,
            } => math::ray_obb(
                ray,
                self.to_world(center),
                self.rotation,
                half_extents * self.view_scale,
            ),
            HitShape::Sphere { center, radius } => {
                math::ray_sphere(ray, self.to_world(center), radius * self.view_scale)
            }
            HitShape::Arc {
                axis,
                radius,
                thickness,
            } => {
                let point = math::line_plane_intersection(ray, self.location, self.axis(axis))?;
                let distance = (point - ray.start).dot(ray.direction());
                if distance < 0.0 || distance > ray.length() || self.view_scale <= 0.0 {
                    return None;
                }
                let local =
                    self.rotation.inverse() * (point - self.location) / self.view_scale * self.view_flip;
                let (j, k) = ((axis + 1) % 3, (axis + 2) % 3);
                if local[j] < 0.0 || local[k] < 0.0 {
                    return None;
                }
                let radial = local[j].hypot(local[k]);
                ((radial - radius).abs() <= thickness).then_some(distance)
            }
        }
    }

    /// Enter or leave a gesture. A change invalidates the stored ray and is recorded as an event.
    pub fn set_transform_progress_state(&mut self, in_progress: bool, domain: TransformationDomain) {
        if in_progress == self.in_progress {
            return;
        }
        self.previous_ray = None;
        self.in_progress = in_progress;
        self.events.push(GizmoStateChange {
            kind: self.kind,
            in_progress,
            domain,
        });
        tracing::debug!("[gizmo] {:?} in_progress={in_progress} domain={domain:?}", self.kind);
    }

    pub fn drain_events(&mut self) -> Vec<GizmoStateChange> {
        std::mem::take(&mut self.events)
    }

    pub fn are_rays_valid(&self) -> bool {
        self.previous_ray.is_some()
    }

    pub fn update_rays(&mut self, ray: RaySegment) {
        self.previous_ray = Some(ray);
    }

    /// Keep a constant on-screen size for a camera at `camera_location`.
    pub fn scale_to_view(&mut self, camera_location: Vec3, look: Vec3, fov_degrees: f32) {
        let distance = math::project_onto(self.location - camera_location, look.normalize_or_zero())
            .length()
            .max(MIN_VIEW_DISTANCE);
        self.view_scale = (fov_degrees.to_radians() * 0.5).tan() * distance
            * self.tuning.scene_scale_factor
            / self.tuning.camera_arc_radius;

        if self.kind == TransformationType::Rotation && !self.in_progress {
            self.view_flip = rotation::view_flip(self, camera_location);
        }
    }

    /// Delta between the previous ray and `ray`, constrained to `domain`.
    ///
    /// The first call after the rays were invalidated only stores `ray` and
    /// returns a zero delta.
    pub fn delta_transform(&mut self, look: Vec3, ray: &RaySegment, domain: TransformationDomain) -> Transform {
        let delta = match self.previous_ray {
            Some(previous) => match self.kind {
                TransformationType::Translation => translation::delta(self, look, &previous, ray, domain),
                TransformationType::Rotation => rotation::delta(self, &previous, ray, domain),
                TransformationType::Scale => scale::delta(self, look, &previous, ray, domain),
                TransformationType::NoTransform => math::zero_delta(),
            },
            None => math::zero_delta(),
        };
        self.update_rays(*ray);
        delta
    }

    /// Add `delta` to `accumulated` and return the whole snap steps it now holds,
    /// leaving the remainder in `accumulated`.
    pub fn snapped_transform(
        &self,
        accumulated: &mut Transform,
        delta: &Transform,
        domain: TransformationDomain,
        snap: f32,
    ) -> Transform {
        if snap <= 0.0 {
            return *delta;
        }
        match self.kind {
            TransformationType::Translation | TransformationType::Scale => {
                translation::snap_delta(self, accumulated, delta, domain, snap)
            }
            TransformationType::Rotation => rotation::snap_delta(self, accumulated, delta, domain, snap),
            TransformationType::NoTransform => *delta,
        }
    }

    /// Snap the absolute transform a target is about to receive. Only scale gizmos change it.
    pub fn snapped_per_component(
        &self,
        old: &Transform,
        new: &Transform,
        domain: TransformationDomain,
        snap: f32,
    ) -> Transform {
        match self.kind {
            TransformationType::Scale if snap > 0.0 => scale::snap_per_component(old, new, domain, snap),
            _ => *new,
        }
    }
}

/// Plane the pointer is projected onto for translation and scale drags.
pub(crate) fn drag_plane_normal(gizmo: &Gizmo, look: Vec3, domain: TransformationDomain) -> Option<Vec3> {
    match domain {
        TransformationDomain::None => None,
        TransformationDomain::XAxis
        | TransformationDomain::YAxis
        | TransformationDomain::ZAxis
        | TransformationDomain::XYZ => Some(look),
        TransformationDomain::XYPlane => Some(gizmo.axis(2)),
        TransformationDomain::YZPlane => Some(gizmo.axis(0)),
        TransformationDomain::XZPlane => Some(gizmo.axis(1)),
    }
}

/// Pointer displacement on the drag plane between two rays.
pub(crate) fn drag_displacement(
    gizmo: &Gizmo,
    normal: Vec3,
    previous: &RaySegment,
    current: &RaySegment,
) -> Option<Vec3> {
    let now = math::line_plane_intersection(current, gizmo.location, normal);
    let before = math::line_plane_intersection(previous, gizmo.location, normal);
    match (now, before) {
        (Some(now), Some(before)) => Some(now - before),
        _ => {
            if cfg!(debug_assertions) {
                tracing::debug!("[gizmo] pointer ray parallel to drag plane, skipping delta");
            }
            None
        }
    }
}

/// Index of the single local axis of an axis domain.
pub(crate) fn axis_index(domain: TransformationDomain) -> Option<usize> {
    match domain {
        TransformationDomain::XAxis => Some(0),
        TransformationDomain::YAxis => Some(1),
        TransformationDomain::ZAxis => Some(2),
        _ => None,
    }
}
