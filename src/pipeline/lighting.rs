//! Per-polygon and per-vertex light accumulation.
//!
//! Each light adds `light_color * base_color / 256` scaled by its geometric
//! intensity: 1 for ambient, `cos(angle)` for directional terms (skipped when
//! the surface faces away), divided by `kc + kl*d + kq*d^2` for positional
//! lights. Channel sums are clamped to `[0, 255]`.

use crate::color::Color;
use crate::math::{self, Vec3, EPSILON};
use crate::scene::light::{Light, LightKind, SceneResources};
use crate::scene::object::{Object, ShadeMode};

/// Geometric intensity of one light at `point` with surface normal `normal` (any length).
fn intensity(light: &Light, normal: &Vec3, point: &Vec3) -> f32 {
    let nl = math::length(normal);
    if nl < EPSILON {
        return 0.0;
    }
    match light.kind {
        LightKind::Ambient => 1.0,
        LightKind::Infinite => {
            let dp = normal.dot(&-light.direction);
            if dp <= 0.0 {
                return 0.0;
            }
            dp / nl
        }
        LightKind::Point => {
            let to_light = light.position - point;
            let dist = math::length(&to_light);
            let dp = normal.dot(&to_light);
            if dp <= 0.0 {
                return 0.0;
            }
            let atten = light.attenuation(dist);
            if atten < EPSILON {
                return 0.0;
            }
            if dist < EPSILON {
                return 1.0 / atten;
            }
            dp / (nl * dist * atten)
        }
        LightKind::SpotlightSimple => {
            let dp = normal.dot(&-light.direction);
            if dp <= 0.0 {
                return 0.0;
            }
            let dist = math::length(&(light.position - point));
            let atten = light.attenuation(dist);
            if atten < EPSILON {
                return 0.0;
            }
            dp / (nl * atten)
        }
        LightKind::SpotlightComplex => {
            let dp = normal.dot(&-light.direction);
            if dp <= 0.0 {
                return 0.0;
            }
            let from_light = point - light.position;
            let dist = math::length(&from_light);
            if dist < EPSILON {
                return 0.0;
            }
            // Cosine between the cone axis and the ray towards the surface.
            let dpsl = from_light.dot(&light.direction) / dist;
            if dpsl <= 0.0 {
                return 0.0;
            }
            if light.spot_outer > 0.0 && dpsl < (light.spot_outer * 0.5).to_radians().cos() {
                return 0.0;
            }
            let atten = light.attenuation(dist);
            if atten < EPSILON {
                return 0.0;
            }
            dp * cone_falloff(light, dpsl) / (nl * atten)
        }
    }
}

/// `(cos / cos_inner)^power` past the inner cone, 1 inside it.
fn cone_falloff(light: &Light, cos_axis: f32) -> f32 {
    let cos_inner = (light.spot_inner * 0.5).to_radians().cos();
    if cos_axis >= cos_inner {
        return 1.0;
    }
    let power = i32::try_from(light.power).unwrap_or(i32::MAX);
    return (cos_axis / cos_inner).powi(power);
}

/// Lit color of a surface point with base color `base`.
pub fn shade_point<'a>(
    base: Color,
    normal: &Vec3,
    point: &Vec3,
    lights: impl IntoIterator<Item = &'a Light>,
) -> Color {
    let base = base.to_f32();
    let mut sum = [0.0f32; 3];
    for light in lights {
        let color = match light.kind {
            LightKind::Ambient => light.ambient,
            _ => light.diffuse,
        };
        let i = intensity(light, normal, point);
        if i <= 0.0 {
            continue;
        }
        let c = color.to_f32();
        for ch in 0..3 {
            sum[ch] += c[ch] * base[ch] * i / 256.0;
        }
    }
    return Color::from_f32(sum);
}

/// Normal at corner `k` of a polygon, from its two adjacent edges, with the face's orientation.
fn corner_normal(points: &[Vec3], k: usize) -> Vec3 {
    let n = points.len();
    let next = points[(k + 1) % n];
    let prev = points[(k + n - 1) % n];
    return (next - points[k]).cross(&(prev - points[k]));
}

/// Fills the shade slots of every renderable polygon from the world pool.
/// Returns the number of polygons lit.
pub fn light_object(object: &mut Object, resources: &SceneResources) -> usize {
    let mut lit = 0;
    for polygon in object.polygons.iter_mut() {
        if !polygon.is_renderable() {
            continue;
        }
        let n = polygon.vertex_count;
        match polygon.shading {
            ShadeMode::Constant => {
                polygon.shades = [polygon.color; 4];
            }
            ShadeMode::Flat => {
                let v0 = object.world[polygon.indices[0]];
                let shade = shade_point(polygon.color, &polygon.normal, &v0, resources.active_lights());
                polygon.shades = [shade; 4];
                lit += 1;
            }
            ShadeMode::Gouraud => {
                let points: Vec<Vec3> = polygon.vertices().iter().map(|&i| object.world[i]).collect();
                for k in 0..n {
                    let mut normal = corner_normal(&points, k);
                    if math::length(&normal) < EPSILON {
                        normal = polygon.normal;
                    }
                    polygon.shades[k] = shade_point(polygon.color, &normal, &points[k], resources.active_lights());
                }
                lit += 1;
            }
        }
    }
    return lit;
}
