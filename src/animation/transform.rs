// Homogeneous transform helpers
//
// Column-vector convention throughout: `compose(a, b)` applies `b` first,
// then `a`. The hierarchy walk, skinning and TRS assembly all rely on it.

use nalgebra_glm as glm;

/// Product `a * b`, i.e. apply `b`, then `a`.
#[inline]
pub fn compose(a: &glm::Mat4, b: &glm::Mat4) -> glm::Mat4 {
    a * b
}

pub fn from_translation(v: &glm::Vec3) -> glm::Mat4 {
    glm::translation(v)
}

/// Rotation matrix of a unit quaternion. The input is not normalized.
pub fn from_quaternion(q: &glm::Quat) -> glm::Mat4 {
    let x2 = q.i + q.i;
    let y2 = q.j + q.j;
    let z2 = q.k + q.k;

    let xx = q.i * x2;
    let xy = q.i * y2;
    let xz = q.i * z2;
    let yy = q.j * y2;
    let yz = q.j * z2;
    let zz = q.k * z2;
    let wx = q.w * x2;
    let wy = q.w * y2;
    let wz = q.w * z2;

    // glm::mat4 takes its arguments row by row
    glm::mat4(
        1.0 - (yy + zz), xy - wz, xz + wy, 0.0,
        xy + wz, 1.0 - (xx + zz), yz - wx, 0.0,
        xz - wy, yz + wx, 1.0 - (xx + yy), 0.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

pub fn from_scale(s: &glm::Vec3) -> glm::Mat4 {
    glm::scaling(s)
}

/// `T * R * S`: scale first, then rotate, then translate.
pub fn from_trs(t: &glm::Vec3, r: &glm::Quat, s: &glm::Vec3) -> glm::Mat4 {
    compose(&from_translation(t), &compose(&from_quaternion(r), &from_scale(s)))
}

/// Transform `p` as a point (w = 1). No perspective divide.
#[inline]
pub fn apply_to_point(m: &glm::Mat4, p: &glm::Vec3) -> glm::Vec3 {
    let h = m * glm::vec4(p.x, p.y, p.z, 1.0);
    glm::vec3(h.x, h.y, h.z)
}

/// Split an affine matrix without shear into translation, rotation and scale.
pub fn decompose(m: &glm::Mat4) -> (glm::Vec3, glm::Quat, glm::Vec3) {
    let translation = glm::vec3(m[(0, 3)], m[(1, 3)], m[(2, 3)]);

    let cols = [
        glm::vec3(m[(0, 0)], m[(1, 0)], m[(2, 0)]),
        glm::vec3(m[(0, 1)], m[(1, 1)], m[(2, 1)]),
        glm::vec3(m[(0, 2)], m[(1, 2)], m[(2, 2)]),
    ];
    let scale = glm::vec3(cols[0].norm(), cols[1].norm(), cols[2].norm());

    let unit = |v: glm::Vec3, s: f32| if s > f32::EPSILON { v / s } else { v };
    let (a, b, c) = (
        unit(cols[0], scale.x),
        unit(cols[1], scale.y),
        unit(cols[2], scale.z),
    );
    let rot = glm::mat3(
        a.x, b.x, c.x,
        a.y, b.y, c.y,
        a.z, b.z, c.z,
    );

    (translation, glm::mat3_to_quat(&rot), scale)
}
