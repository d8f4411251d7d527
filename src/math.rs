//! Vector and matrix algebra shared by every pipeline stage.
//!
//! One convention everywhere: points are row vectors multiplied on the left
//! of a 4x4 matrix (`p' = p * M`), so translation lives in row 3 and
//! `a * b` applies `a` first. Camera space is left-handed: x right, y up,
//! z pointing away from the viewer.

use nalgebra as na;
use na::{Matrix4, Vector3, Vector4};

use crate::error::RenderError;

pub type Vec3 = Vector3<f32>;
pub type Mat4 = Matrix4<f32>;

/// Magnitudes below this are treated as zero.
pub const EPSILON: f32 = 1e-6;

/// Approximate `1 / sqrt(x)` via exponent bit manipulation and two Newton steps.
///
/// Relative error stays below roughly 0.2% (much less after the second
/// iteration). Returns 0 for non-positive input.
pub fn fast_inv_sqrt(x: f32) -> f32 {
    if x <= 0.0 || !x.is_finite() {
        return 0.0;
    }
    let half = 0.5 * x;
    let mut y = f32::from_bits(0x5f37_59df - (x.to_bits() >> 1));
    y = y * (1.5 - half * y * y);
    y = y * (1.5 - half * y * y);
    return y;
}

/// Exact length of a vector.
pub fn length(v: &Vec3) -> f32 {
    return v.dot(v).sqrt();
}

/// Length using [`fast_inv_sqrt`]. Interchangeable with [`length`] up to its error bound.
pub fn length_fast(v: &Vec3) -> f32 {
    let sq = v.dot(v);
    return sq * fast_inv_sqrt(sq);
}

/// Unit vector in the direction of `v`, or `v` unchanged when it has no usable length.
pub fn normalize(v: Vec3) -> Vec3 {
    let len = length(&v);
    if len < EPSILON {
        return v;
    }
    return v / len;
}

pub fn normalize_in_place(v: &mut Vec3) {
    *v = normalize(*v);
}

/// Face normal `(a - b) x (a - c)`. Not normalized.
pub fn surface_normal(a: &Vec3, b: &Vec3, c: &Vec3) -> Vec3 {
    return (a - b).cross(&(a - c));
}

pub fn lerp(a: &Vec3, b: &Vec3, t: f32) -> Vec3 {
    return a + (b - a) * t;
}

pub fn translation(t: &Vec3) -> Mat4 {
    return Mat4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        t.x, t.y, t.z, 1.0,
    );
}

pub fn scaling(s: &Vec3) -> Mat4 {
    return Mat4::new(
        s.x, 0.0, 0.0, 0.0,
        0.0, s.y, 0.0, 0.0,
        0.0, 0.0, s.z, 0.0,
        0.0, 0.0, 0.0, 1.0,
    );
}

/// Rotation about the x axis by `theta` radians.
pub fn rotation_x(theta: f32) -> Mat4 {
    let (s, c) = theta.sin_cos();
    return Mat4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, c,   s,   0.0,
        0.0, -s,  c,   0.0,
        0.0, 0.0, 0.0, 1.0,
    );
}

/// Rotation about the y axis by `theta` radians.
pub fn rotation_y(theta: f32) -> Mat4 {
    let (s, c) = theta.sin_cos();
    return Mat4::new(
        c,   0.0, -s,  0.0,
        0.0, 1.0, 0.0, 0.0,
        s,   0.0, c,   0.0,
        0.0, 0.0, 0.0, 1.0,
    );
}

/// Rotation about the z axis by `theta` radians.
pub fn rotation_z(theta: f32) -> Mat4 {
    let (s, c) = theta.sin_cos();
    return Mat4::new(
        c,   s,   0.0, 0.0,
        -s,  c,   0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    );
}

/// Rotation about x, then y, then z.
pub fn rotation_xyz(angles: &Vec3) -> Mat4 {
    return rotation_x(angles.x) * rotation_y(angles.y) * rotation_z(angles.z);
}

/// Transforms a point (w = 1) as a row vector.
pub fn transform_point(p: &Vec3, m: &Mat4) -> Vec3 {
    let r = Vector4::new(p.x, p.y, p.z, 1.0).transpose() * m;
    if (r[3] - 1.0).abs() > EPSILON && r[3].abs() > EPSILON {
        return Vec3::new(r[0] / r[3], r[1] / r[3], r[2] / r[3]);
    }
    return Vec3::new(r[0], r[1], r[2]);
}

/// Transforms a direction (w = 0), ignoring translation.
pub fn transform_direction(v: &Vec3, m: &Mat4) -> Vec3 {
    let r = Vector4::new(v.x, v.y, v.z, 0.0).transpose() * m;
    return Vec3::new(r[0], r[1], r[2]);
}

/// Orthonormal camera basis (right, up, forward) looking from `position` at `target`.
fn view_basis(position: &Vec3, target: &Vec3, up: &Vec3) -> (Vec3, Vec3, Vec3) {
    let mut forward = normalize(target - position);
    if length(&forward) < EPSILON {
        log::warn!("camera target coincides with its position, looking down +z");
        forward = Vec3::z();
    }
    // Gram-Schmidt: strip the forward component out of the up hint.
    let mut new_up = up - forward * up.dot(&forward);
    if length(&new_up) < EPSILON {
        // Up hint parallel to forward, pick any perpendicular axis.
        let fallback = if forward.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
        new_up = fallback - forward * fallback.dot(&forward);
    }
    let new_up = normalize(new_up);
    let new_right = new_up.cross(&forward);
    return (new_right, new_up, forward);
}

/// Camera-to-world matrix: rows are the camera's right, up and forward axes, then its position.
pub fn point_at(position: &Vec3, target: &Vec3, up: &Vec3) -> Mat4 {
    let (r, u, f) = view_basis(position, target, up);
    return Mat4::new(
        r.x, r.y, r.z, 0.0,
        u.x, u.y, u.z, 0.0,
        f.x, f.y, f.z, 0.0,
        position.x, position.y, position.z, 1.0,
    );
}

/// World-to-camera matrix, the closed-form inverse of [`point_at`].
pub fn look_at(position: &Vec3, target: &Vec3, up: &Vec3) -> Mat4 {
    return quick_inverse(&point_at(position, target, up));
}

/// Inverse of a rigid transform (orthonormal rotation block plus translation row).
///
/// Transposes the rotation and recomputes the translation as `-(pos . axis)`.
pub fn quick_inverse(m: &Mat4) -> Mat4 {
    let pos = Vec3::new(m[(3, 0)], m[(3, 1)], m[(3, 2)]);
    let right = Vec3::new(m[(0, 0)], m[(0, 1)], m[(0, 2)]);
    let up = Vec3::new(m[(1, 0)], m[(1, 1)], m[(1, 2)]);
    let forward = Vec3::new(m[(2, 0)], m[(2, 1)], m[(2, 2)]);
    return Mat4::new(
        right.x, up.x, forward.x, 0.0,
        right.y, up.y, forward.y, 0.0,
        right.z, up.z, forward.z, 0.0,
        -pos.dot(&right), -pos.dot(&up), -pos.dot(&forward), 1.0,
    );
}

/// General inverse by Gauss-Jordan elimination with partial pivoting.
///
/// Runs exactly one pivot step per column, so it always terminates.
pub fn invert(m: &Mat4) -> Result<Mat4, RenderError> {
    let mut a = *m;
    let mut inv = Mat4::identity();
    for col in 0..4 {
        let mut pivot = col;
        for row in col + 1..4 {
            if a[(row, col)].abs() > a[(pivot, col)].abs() {
                pivot = row;
            }
        }
        if a[(pivot, col)].abs() < EPSILON {
            return Err(RenderError::SingularMatrix);
        }
        if pivot != col {
            a.swap_rows(pivot, col);
            inv.swap_rows(pivot, col);
        }

        let p = a[(col, col)];
        for k in 0..4 {
            a[(col, k)] /= p;
            inv[(col, k)] /= p;
        }
        for row in 0..4 {
            if row == col {
                continue;
            }
            let factor = a[(row, col)];
            if factor == 0.0 {
                continue;
            }
            for k in 0..4 {
                a[(row, k)] -= factor * a[(col, k)];
                inv[(row, k)] -= factor * inv[(col, k)];
            }
        }
    }
    return Ok(inv);
}

/// [`invert`], falling back to identity for singular input.
pub fn invert_or_identity(m: &Mat4) -> Mat4 {
    match invert(m) {
        Ok(inv) => inv,
        Err(e) => {
            log::warn!("{e}, substituting identity");
            Mat4::identity()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn approx_vec(a: &Vec3, b: &Vec3, tol: f32) -> bool {
        return (a - b).abs().max() < tol;
    }

    fn approx_mat(a: &Mat4, b: &Mat4, tol: f32) -> bool {
        return (a - b).abs().max() < tol;
    }

    #[test]
    fn normalized_vectors_have_unit_length() {
        for v in [
            Vec3::new(3.0, 4.0, 0.0),
            Vec3::new(-0.01, 0.002, 0.5),
            Vec3::new(100.0, -250.0, 7.0),
        ] {
            assert!((length(&normalize(v)) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn normalize_zero_vector_is_guarded() {
        let v = normalize(Vec3::zeros());
        assert!(v.iter().all(|c| c.is_finite()));
        assert_eq!(v, Vec3::zeros());
    }

    #[test]
    fn fast_length_is_close_to_exact() {
        for v in [Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.3, -7.0, 12.5), Vec3::new(1e3, 1.0, 0.0)] {
            let exact = length(&v);
            let fast = length_fast(&v);
            assert!(((fast - exact) / exact).abs() < 0.002);
        }
        assert_eq!(fast_inv_sqrt(0.0), 0.0);
    }

    #[test]
    fn cross_is_anticommutative_and_dot_commutes() {
        let a = Vec3::new(1.0, -2.0, 0.5);
        let b = Vec3::new(4.0, 0.25, -3.0);
        assert!(approx_vec(&a.cross(&b), &-b.cross(&a), 1e-6));
        assert_eq!(a.dot(&b), b.dot(&a));
    }

    #[test]
    fn identity_is_neutral_for_multiplication() {
        let m = rotation_xyz(&Vec3::new(0.3, -1.2, 2.0)) * translation(&Vec3::new(1.0, 2.0, 3.0));
        assert!(approx_mat(&(Mat4::identity() * m), &m, 1e-6));
        assert!(approx_mat(&(m * Mat4::identity()), &m, 1e-6));
    }

    #[test]
    fn rotation_and_inverse_rotation_cancel() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        for theta in [0.1, PI / 3.0, 2.5] {
            for rot in [rotation_x, rotation_y, rotation_z] {
                let there = transform_point(&v, &rot(theta));
                let back = transform_point(&there, &rot(-theta));
                assert!(approx_vec(&v, &back, 1e-5));
            }
        }
    }

    #[test]
    fn rotation_y_turns_z_towards_x() {
        // Quarter turn about y maps forward onto right in a left-handed frame.
        let v = transform_point(&Vec3::new(0.0, 0.0, 1.0), &rotation_y(PI / 2.0));
        assert!(approx_vec(&v, &Vec3::new(1.0, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn translation_lives_in_row_three() {
        let m = translation(&Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(m[(3, 0)], 1.0);
        assert_eq!(m[(3, 2)], 3.0);
        let p = transform_point(&Vec3::new(1.0, 1.0, 1.0), &m);
        assert!(approx_vec(&p, &Vec3::new(2.0, 3.0, 4.0), 1e-6));
        // Directions ignore translation.
        let d = transform_direction(&Vec3::new(1.0, 1.0, 1.0), &m);
        assert!(approx_vec(&d, &Vec3::new(1.0, 1.0, 1.0), 1e-6));
    }

    #[test]
    fn point_at_then_look_at_is_identity() {
        let pos = Vec3::new(3.0, -2.0, 7.0);
        let target = Vec3::new(-1.0, 4.0, 0.5);
        let up = Vec3::y();
        let round_trip = point_at(&pos, &target, &up) * look_at(&pos, &target, &up);
        assert!(approx_mat(&round_trip, &Mat4::identity(), 1e-5));
    }

    #[test]
    fn look_at_matches_general_inverse() {
        let pos = Vec3::new(0.5, 1.0, -4.0);
        let target = Vec3::new(2.0, 0.0, 3.0);
        let camera = point_at(&pos, &target, &Vec3::y());
        let inverse = invert(&camera).unwrap();
        assert!(approx_mat(&look_at(&pos, &target, &Vec3::y()), &inverse, 1e-4));
    }

    #[test]
    fn look_at_maps_target_onto_forward_axis() {
        let pos = Vec3::new(0.0, 0.0, -5.0);
        let view = look_at(&pos, &Vec3::zeros(), &Vec3::y());
        let p = transform_point(&Vec3::zeros(), &view);
        assert!(approx_vec(&p, &Vec3::new(0.0, 0.0, 5.0), 1e-5));
        let right = transform_point(&Vec3::new(1.0, 0.0, 0.0), &view);
        assert!(right.x > 0.0);
    }

    #[test]
    fn degenerate_up_vector_still_builds_a_basis() {
        let m = point_at(&Vec3::zeros(), &Vec3::new(0.0, 10.0, 0.0), &Vec3::y());
        assert!(m.iter().all(|c| c.is_finite()));
        assert!(approx_mat(&(m * quick_inverse(&m)), &Mat4::identity(), 1e-5));
    }

    #[test]
    fn singular_matrix_is_reported() {
        let m = scaling(&Vec3::new(1.0, 0.0, 1.0));
        assert!(matches!(invert(&m), Err(RenderError::SingularMatrix)));
        assert_eq!(invert_or_identity(&m), Mat4::identity());
    }

    #[test]
    fn invert_needs_pivoting() {
        // Zero on the leading diagonal forces a row swap.
        let m = Mat4::new(
            0.0, 1.0, 0.0, 0.0,
            1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 2.0, 0.0,
            5.0, 0.0, 0.0, 1.0,
        );
        let inv = invert(&m).unwrap();
        assert!(approx_mat(&(m * inv), &Mat4::identity(), 1e-6));
    }
}
