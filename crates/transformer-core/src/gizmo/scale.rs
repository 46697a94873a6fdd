//! Scale gizmo. Always aligned with the attached target.

use bevy::prelude::*;
use transformer_proto::TransformationDomain;

use super::{Gizmo, HitRegion, axis_regions, drag_displacement, drag_plane_normal, plane_and_center_regions};
use crate::math::{self, RaySegment};

/// New scales within this of the old one are left unsnapped.
const SCALE_CHANGE_EPSILON: f32 = 1.0e-4;

pub(crate) fn hit_regions() -> Vec<HitRegion> {
    let mut regions = axis_regions();
    regions.extend(plane_and_center_regions());
    regions
}

/// Direction the scale grows along for `domain`, as a sum of gizmo axes.
fn target_direction(gizmo: &Gizmo, domain: TransformationDomain) -> Vec3 {
    domain
        .axes()
        .iter()
        .zip(gizmo.frame())
        .filter(|(active, _)| **active)
        .fold(Vec3::ZERO, |sum, (_, axis)| sum + axis)
}

/// Pointer displacement along the domain direction, converted to scale units.
///
/// The scale delta is expressed along the gizmo's world axes; it is mapped
/// into each target's local frame when applied.
pub(crate) fn delta(
    gizmo: &Gizmo,
    look: Vec3,
    previous: &RaySegment,
    current: &RaySegment,
    domain: TransformationDomain,
) -> Transform {
    let mut delta = math::zero_delta();
    let Some(normal) = drag_plane_normal(gizmo, look, domain) else {
        return delta;
    };
    let Some(displacement) = drag_displacement(gizmo, normal, previous, current) else {
        return delta;
    };
    let along = math::project_onto(displacement, target_direction(gizmo, domain));
    delta.scale = along * gizmo.tuning().scaling_factor;
    delta
}

/// Grid-snap the absolute scale on the domain's axes, leaving the others as computed.
pub(crate) fn snap_per_component(
    old: &Transform,
    new: &Transform,
    domain: TransformationDomain,
    snap: f32,
) -> Transform {
    let mut result = *new;
    if new.scale.abs_diff_eq(old.scale, SCALE_CHANGE_EPSILON) {
        return result;
    }
    let axes = domain.axes();
    for (i, active) in axes.iter().enumerate() {
        if *active {
            result.scale[i] = math::grid_snap(new.scale[i], snap);
        }
    }
    result
}
