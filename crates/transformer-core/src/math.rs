//! Geometry helpers for ray picking, gizmo deltas and snapping.

use std::f32::consts::PI;

use bevy::prelude::*;
use transformer_proto::WireTransform;

/// Ray/plane denominators below this are treated as parallel.
pub const PARALLEL_EPSILON: f32 = 1.0e-4;

/// A finite ray from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaySegment {
    pub start: Vec3,
    pub end: Vec3,
}

impl RaySegment {
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }

    pub fn from_origin(origin: Vec3, direction: Vec3, length: f32) -> Self {
        Self::new(origin, origin + direction.normalize_or_zero() * length)
    }

    pub fn direction(&self) -> Vec3 {
        (self.end - self.start).normalize_or_zero()
    }

    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    pub fn point_at(&self, distance: f32) -> Vec3 {
        self.start + self.direction() * distance
    }
}

/// Intersection of the infinite line through `ray` with a plane.
///
/// Returns `None` when the line is (nearly) parallel to the plane or either
/// the ray or the normal is degenerate.
pub fn line_plane_intersection(ray: &RaySegment, plane_origin: Vec3, plane_normal: Vec3) -> Option<Vec3> {
    let direction = ray.direction();
    let normal = plane_normal.normalize_or_zero();
    if direction == Vec3::ZERO || normal == Vec3::ZERO {
        return None;
    }

    let denom = direction.dot(normal);
    if denom.abs() < PARALLEL_EPSILON {
        return None;
    }

    let t = (plane_origin - ray.start).dot(normal) / denom;
    Some(ray.start + direction * t)
}

/// Projection of `v` onto `onto`, zero when `onto` has no length.
pub fn project_onto(v: Vec3, onto: Vec3) -> Vec3 {
    let len_sq = onto.length_squared();
    if len_sq <= f32::EPSILON {
        return Vec3::ZERO;
    }
    onto * (v.dot(onto) / len_sq)
}

/// Largest multiple of `step` not exceeding `value` in magnitude.
pub fn truncate_to_multiple(value: f32, step: f32) -> f32 {
    if step <= 0.0 {
        return value;
    }
    (value / step).trunc() * step
}

/// Nearest multiple of `step`.
pub fn grid_snap(value: f32, step: f32) -> f32 {
    if step <= 0.0 {
        return value;
    }
    (value / step).round() * step
}

/// Signed rotation angle (radians, in `(-PI, PI]`) of `rotation` about `axis`.
pub fn twist_angle(rotation: Quat, axis: Vec3) -> f32 {
    let axis = axis.normalize_or_zero();
    if axis == Vec3::ZERO {
        return 0.0;
    }
    let along = Vec3::new(rotation.x, rotation.y, rotation.z).dot(axis);
    let mut angle = 2.0 * along.atan2(rotation.w);
    if angle > PI {
        angle -= 2.0 * PI;
    } else if angle <= -PI {
        angle += 2.0 * PI;
    }
    angle
}

// ============================================================================
// Hit tests (distances are measured from the ray start, in world units)
// ============================================================================

/// Ray against an oriented box.
pub fn ray_obb(ray: &RaySegment, center: Vec3, rotation: Quat, half_extents: Vec3) -> Option<f32> {
    let inverse = rotation.inverse();
    let origin = inverse * (ray.start - center);
    let direction = inverse * ray.direction();
    let length = ray.length();

    let mut t_min = 0.0_f32;
    let mut t_max = length;
    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];
        let h = half_extents[axis];
        if d.abs() < PARALLEL_EPSILON {
            if o.abs() > h {
                return None;
            }
            continue;
        }
        let mut t1 = (-h - o) / d;
        let mut t2 = (h - o) / d;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_min > t_max {
            return None;
        }
    }
    Some(t_min)
}

/// Ray against a sphere.
pub fn ray_sphere(ray: &RaySegment, center: Vec3, radius: f32) -> Option<f32> {
    let direction = ray.direction();
    let m = ray.start - center;
    let b = m.dot(direction);
    let c = m.length_squared() - radius * radius;
    if c > 0.0 && b > 0.0 {
        return None;
    }
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let t = (-b - discriminant.sqrt()).max(0.0);
    (t <= ray.length()).then_some(t)
}

// ============================================================================
// Transforms
// ============================================================================

/// Delta that changes nothing when applied additively to scale.
pub fn zero_delta() -> Transform {
    Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ZERO,
    }
}

pub fn is_zero_delta(delta: &Transform, epsilon: f32) -> bool {
    delta.translation.abs_diff_eq(Vec3::ZERO, epsilon)
        && delta.scale.abs_diff_eq(Vec3::ZERO, epsilon)
        && delta.rotation.xyz().length() <= epsilon
}

/// Running sum of deltas: rotations compose, translation and scale add.
pub fn accumulate_delta(total: &Transform, delta: &Transform) -> Transform {
    Transform {
        translation: total.translation + delta.translation,
        rotation: (delta.rotation * total.rotation).normalize(),
        scale: total.scale + delta.scale,
    }
}

fn to_mat4(t: &Transform) -> Mat4 {
    Mat4::from_scale_rotation_translation(t.scale, t.rotation, t.translation)
}

fn from_mat4(m: Mat4) -> Transform {
    let (scale, rotation, translation) = m.to_scale_rotation_translation();
    Transform {
        translation,
        rotation,
        scale,
    }
}

/// World transform of a node given its parent's world transform and its local one.
pub fn compose(parent_world: &Transform, local: &Transform) -> Transform {
    from_mat4(to_mat4(parent_world) * to_mat4(local))
}

/// Local transform that places a node at `world` under a parent at `parent_world`.
pub fn relative_to(world: &Transform, parent_world: &Transform) -> Transform {
    from_mat4(to_mat4(parent_world).inverse() * to_mat4(world))
}

pub fn to_wire(t: &Transform) -> WireTransform {
    WireTransform {
        translation: t.translation.to_array(),
        rotation: t.rotation.to_array(),
        scale: t.scale.to_array(),
    }
}

pub fn from_wire(w: &WireTransform) -> Transform {
    Transform {
        translation: Vec3::from_array(w.translation),
        rotation: Quat::from_array(w.rotation).normalize(),
        scale: Vec3::from_array(w.scale),
    }
}
