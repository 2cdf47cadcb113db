// Interpolation utilities for keyframe values

use nalgebra_glm as glm;
use serde::{Deserialize, Serialize};

/// How rotation keyframes are blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RotationInterpolation {
    /// Spherical interpolation along the shorter arc.
    #[default]
    Slerp,
    /// Component-wise blend, renormalized. Only close to slerp for small steps.
    Linear,
}

/// Linear interpolation for vectors
pub fn lerp_vec3(a: &glm::Vec3, b: &glm::Vec3, t: f32) -> glm::Vec3 {
    glm::lerp(a, b, t)
}

/// Component-wise quaternion blend followed by normalization.
pub fn nlerp(a: &glm::Quat, b: &glm::Quat, t: f32) -> glm::Quat {
    let q = a.coords * (1.0 - t) + b.coords * t;
    let len = q.norm();
    if len > f32::EPSILON {
        glm::Quat::from(q / len)
    } else {
        *a
    }
}

/// Spherical interpolation between unit quaternions, taking the shorter arc.
pub fn slerp(a: &glm::Quat, b: &glm::Quat, t: f32) -> glm::Quat {
    let mut dot = glm::quat_dot(a, b);
    let mut b = *b;
    if dot < 0.0 {
        b = -b;
        dot = -dot;
    }

    // sin(theta) vanishes for nearly parallel inputs
    if dot > 0.9995 {
        return nlerp(a, &b, t);
    }
    glm::quat_slerp(a, &b, t)
}

pub fn interpolate_rotation(
    a: &glm::Quat,
    b: &glm::Quat,
    t: f32,
    mode: RotationInterpolation,
) -> glm::Quat {
    match mode {
        RotationInterpolation::Slerp => slerp(a, b, t),
        RotationInterpolation::Linear => nlerp(a, b, t),
    }
}
