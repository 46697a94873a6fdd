//! Rotation gizmo.

use bevy::prelude::*;
use transformer_proto::TransformationDomain;

use super::{Gizmo, HitRegion, HitRegionId, HitShape, axis_index};
use crate::math::{self, RaySegment};

/// Intersections closer than this produce no rotation.
const MIN_ARC_TRAVEL: f32 = 0.01;

pub(crate) fn hit_regions() -> Vec<HitRegion> {
    [
        TransformationDomain::XAxis,
        TransformationDomain::YAxis,
        TransformationDomain::ZAxis,
    ]
    .into_iter()
    .enumerate()
    .map(|(axis, domain)| HitRegion {
        id: HitRegionId(axis as u8),
        shape: HitShape::Arc {
            axis,
            radius: 80.0,
            thickness: 8.0,
        },
        domain,
    })
    .collect()
}

/// Mirror each axis of the visual root so the quarter rings face the camera.
pub(crate) fn view_flip(gizmo: &Gizmo, camera_location: Vec3) -> Vec3 {
    let to_camera = camera_location - gizmo.location();
    let sign = |axis: usize| if gizmo.axis(axis).dot(to_camera) >= 0.0 { 1.0 } else { -1.0 };
    Vec3::new(sign(0), sign(1), sign(2))
}

/// Angle swept by the pointer around the gizmo origin, on the plane normal to the domain axis.
pub(crate) fn delta(
    gizmo: &Gizmo,
    previous: &RaySegment,
    current: &RaySegment,
    domain: TransformationDomain,
) -> Transform {
    let mut delta = math::zero_delta();
    let Some(axis) = axis_index(domain) else {
        return delta;
    };
    let normal = gizmo.axis(axis);
    let origin = gizmo.location();

    let (Some(now), Some(before)) = (
        math::line_plane_intersection(current, origin, normal),
        math::line_plane_intersection(previous, origin, normal),
    ) else {
        if cfg!(debug_assertions) {
            tracing::debug!("[gizmo] pointer ray parallel to rotation plane, skipping delta");
        }
        return delta;
    };

    if now.distance(before) < MIN_ARC_TRAVEL {
        return delta;
    }

    let now_dir = (now - origin).normalize_or_zero();
    let before_dir = (before - origin).normalize_or_zero();
    if now_dir == Vec3::ZERO || before_dir == Vec3::ZERO {
        return delta;
    }

    let angle = now_dir.dot(before_dir).clamp(-1.0, 1.0).acos();
    let sign = if now_dir.cross(before_dir).dot(normal) >= 0.0 { -1.0 } else { 1.0 };
    delta.rotation = Quat::from_axis_angle(normal, sign * angle);
    delta
}

/// Quantize the accumulated twist about the domain axis to whole `snap` degrees.
pub(crate) fn snap_delta(
    gizmo: &Gizmo,
    accumulated: &mut Transform,
    delta: &Transform,
    domain: TransformationDomain,
    snap: f32,
) -> Transform {
    let Some(axis) = axis_index(domain) else {
        return *delta;
    };
    let normal = gizmo.axis(axis);
    let added = (delta.rotation * accumulated.rotation).normalize();
    let degrees = math::twist_angle(added, normal).to_degrees();
    let snapped = Quat::from_axis_angle(normal, math::truncate_to_multiple(degrees, snap).to_radians());

    accumulated.rotation = (snapped.inverse() * added).normalize();
    let mut result = *delta;
    result.rotation = snapped;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GizmoTuning;
    use std::f32::consts::FRAC_PI_2;
    use transformer_proto::TransformationType;

    fn rotation_gizmo() -> Gizmo {
        Gizmo::new(TransformationType::Rotation, GizmoTuning::default()).expect("gizmo")
    }

    fn toward(p: Vec3) -> RaySegment {
        RaySegment::new(p + Vec3::Z * 100.0, p - Vec3::Z * 100.0)
    }

    #[test]
    fn test_quarter_turn_about_z() {
        let mut g = rotation_gizmo();
        g.set_transform_progress_state(true, TransformationDomain::ZAxis);
        g.delta_transform(Vec3::NEG_Z, &toward(Vec3::X * 10.0), TransformationDomain::ZAxis);
        let d = g.delta_transform(Vec3::NEG_Z, &toward(Vec3::Y * 10.0), TransformationDomain::ZAxis);

        assert!((math::twist_angle(d.rotation, Vec3::Z) - FRAC_PI_2).abs() < 1e-4);
        assert!(d.translation.abs_diff_eq(Vec3::ZERO, 1e-6));
        let moved = d.rotation * Vec3::X;
        assert!(moved.abs_diff_eq(Vec3::Y, 1e-4));
    }

    #[test]
    fn test_clockwise_is_negative() {
        let mut g = rotation_gizmo();
        g.delta_transform(Vec3::NEG_Z, &toward(Vec3::Y * 10.0), TransformationDomain::ZAxis);
        let d = g.delta_transform(Vec3::NEG_Z, &toward(Vec3::X * 10.0), TransformationDomain::ZAxis);
        assert!((math::twist_angle(d.rotation, Vec3::Z) + FRAC_PI_2).abs() < 1e-4);
    }

    #[test]
    fn test_tiny_motion_is_ignored() {
        let mut g = rotation_gizmo();
        g.delta_transform(Vec3::NEG_Z, &toward(Vec3::X * 10.0), TransformationDomain::ZAxis);
        let d = g.delta_transform(
            Vec3::NEG_Z,
            &toward(Vec3::new(10.0, 0.001, 0.0)),
            TransformationDomain::ZAxis,
        );
        assert!(math::is_zero_delta(&d, 1e-6));
    }

    #[test]
    fn test_ray_in_rotation_plane_yields_zero_delta() {
        crate::test_utils::init_test_tracing();
        let mut g = rotation_gizmo();
        let flat = RaySegment::new(Vec3::new(-50.0, 10.0, 0.0), Vec3::new(50.0, 10.0, 0.0));
        g.delta_transform(Vec3::NEG_Z, &flat, TransformationDomain::ZAxis);
        let d = g.delta_transform(Vec3::NEG_Z, &flat, TransformationDomain::ZAxis);
        assert!(d.rotation.is_finite());
        assert!(math::is_zero_delta(&d, 1e-6));
    }

    #[test]
    fn test_snap_rotation_degrees() {
        let g = rotation_gizmo();
        let mut accumulated = math::zero_delta();
        let mut delta = math::zero_delta();
        delta.rotation = Quat::from_axis_angle(Vec3::Z, 32.0_f32.to_radians());

        let out = g.snapped_transform(&mut accumulated, &delta, TransformationDomain::ZAxis, 15.0);
        assert!((math::twist_angle(out.rotation, Vec3::Z).to_degrees() - 30.0).abs() < 1e-3);
        assert!((math::twist_angle(accumulated.rotation, Vec3::Z).to_degrees() - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_view_flip_faces_camera_and_freezes_in_gesture() {
        let mut g = rotation_gizmo();
        g.scale_to_view(Vec3::new(-100.0, 100.0, -100.0), Vec3::ONE, 90.0);
        assert_eq!(g.view_flip(), Vec3::new(-1.0, 1.0, -1.0));

        g.set_transform_progress_state(true, TransformationDomain::XAxis);
        g.scale_to_view(Vec3::new(100.0, 100.0, 100.0), Vec3::NEG_ONE, 90.0);
        assert_eq!(g.view_flip(), Vec3::new(-1.0, 1.0, -1.0));
    }

    #[test]
    fn test_arc_trace_respects_flip() {
        let mut g = rotation_gizmo();
        let diagonal = 80.0 * std::f32::consts::FRAC_1_SQRT_2;
        let on_ring = toward(Vec3::new(diagonal, diagonal, 0.0));
        let hit = g.trace(&on_ring).expect("ring hit");
        assert_eq!(g.domain_for(hit.region), TransformationDomain::ZAxis);

        // mirrored towards -X/-Y: the same point is now outside the quarter ring
        g.view_flip = Vec3::new(-1.0, -1.0, 1.0);
        assert!(g.trace(&on_ring).is_none());
        assert!(g.trace(&toward(Vec3::new(-diagonal, -diagonal, 0.0))).is_some());
    }
}
