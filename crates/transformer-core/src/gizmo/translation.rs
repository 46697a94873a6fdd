//! Translation gizmo.

use bevy::prelude::*;
use transformer_proto::{TransformationDomain, TransformationType};

use super::{Gizmo, HitRegion, axis_regions, drag_displacement, drag_plane_normal, plane_and_center_regions};
use crate::math::{self, RaySegment};

pub(crate) fn hit_regions() -> Vec<HitRegion> {
    let mut regions = axis_regions();
    regions.extend(plane_and_center_regions());
    regions
}

/// Pointer displacement on the drag plane; axis domains keep only the part along the axis.
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
    let Some(mut displacement) = drag_displacement(gizmo, normal, previous, current) else {
        return delta;
    };
    if let Some(axis) = super::axis_index(domain) {
        displacement = math::project_onto(displacement, gizmo.axis(axis));
    }
    delta.translation = displacement;
    delta
}

/// Quantize a vector delta per gizmo axis.
///
/// Used for both translation and scale: the running sum is split along the
/// gizmo frame, each active axis keeps the largest multiple of `snap` that
/// fits, and the rest stays in `accumulated`.
pub(crate) fn snap_delta(
    gizmo: &Gizmo,
    accumulated: &mut Transform,
    delta: &Transform,
    domain: TransformationDomain,
    snap: f32,
) -> Transform {
    let mut result = *delta;
    let frame = gizmo.frame();
    let added = if gizmo.kind() == TransformationType::Scale {
        accumulated.scale + delta.scale
    } else {
        accumulated.translation + delta.translation
    };

    let snapped = domain
        .axes()
        .iter()
        .zip(frame)
        .filter(|(active, _)| **active)
        .fold(Vec3::ZERO, |sum, (_, axis)| {
            sum + axis * math::truncate_to_multiple(added.dot(axis), snap)
        });

    if gizmo.kind() == TransformationType::Scale {
        result.scale = snapped;
        accumulated.scale = added - snapped;
    } else {
        result.translation = snapped;
        accumulated.translation = added - snapped;
    }
    result
}
