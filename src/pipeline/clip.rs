//! Near-plane clipping of the frame polygon list.
//!
//! Works on facets, never on object polygons, so splitting a polygon only
//! grows the frame arena. After this pass every active facet lies at or in
//! front of the near plane and is safe to project.

use super::polylist::{Facet, FramePolyList};
use crate::color::Color;
use crate::error::RenderError;
use crate::math::{self, Vec3};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClipStats {
    /// Quads split into two triangles because they crossed the near plane.
    pub quads_split: usize,
    /// Triangles shrunk in place (two vertices behind the plane).
    pub triangles_trimmed: usize,
    /// Triangles split in two (one vertex behind the plane).
    pub triangles_split: usize,
    /// Facets entirely behind the plane.
    pub rejected: usize,
}

impl ClipStats {
    /// Facets added to the list by this pass.
    pub fn facets_added(&self) -> usize {
        return self.quads_split + self.triangles_split;
    }
}

/// Point where segment `from -> to` crosses `z = near_z`, with the interpolation parameter.
fn intersect_near(from: &Vec3, to: &Vec3, near_z: f32) -> (Vec3, f32) {
    let dz = to.z - from.z;
    let t = if dz.abs() < math::EPSILON { 0.0 } else { (near_z - from.z) / dz };
    let mut p = math::lerp(from, to, t);
    p.z = near_z;
    return (p, t);
}

fn lerp_color(a: Color, b: Color, t: f32) -> Color {
    return Color::blend(b, a, t);
}

/// Splits quad `v0 v1 v2 v3` into `v0 v1 v2` (kept in place) and `v0 v2 v3` (returned).
fn split_quad(facet: &mut Facet) -> Facet {
    let mut second = facet.clone();
    second.vertices = [facet.vertices[0], facet.vertices[2], facet.vertices[3], Vec3::zeros()];
    // Shades follow the same 0,2,3 -> 0,1,2 remap as the positions.
    second.shades = [facet.shades[0], facet.shades[2], facet.shades[3], facet.shades[3]];
    second.vertex_count = 3;
    second.compute_normal();

    facet.vertex_count = 3;
    facet.compute_normal();
    return second;
}

/// Clips one triangle against the near plane. Returns the extra facet produced
/// when a single vertex was behind the plane.
fn clip_triangle(facet: &mut Facet, near_z: f32, stats: &mut ClipStats) -> Option<Facet> {
    let behind: Vec<usize> = (0..3).filter(|&i| facet.vertices[i].z < near_z).collect();
    match behind.len() {
        0 => None,
        3 => {
            facet.active = false;
            stats.rejected += 1;
            None
        }
        2 => {
            // Pull both outside vertices along their edges to the single inside vertex.
            let inside = (0..3).find(|i| !behind.contains(i)).unwrap_or(0);
            let anchor = facet.vertices[inside];
            let anchor_shade = facet.shades[inside];
            for &i in behind.iter() {
                let (p, t) = intersect_near(&anchor, &facet.vertices[i], near_z);
                facet.vertices[i] = p;
                facet.shades[i] = lerp_color(anchor_shade, facet.shades[i], t);
            }
            facet.compute_normal();
            stats.triangles_trimmed += 1;
            None
        }
        _ => {
            // One vertex behind: the visible part is a quad, covered by two triangles
            // that keep the original winding.
            let o = behind[0];
            let a = (o + 1) % 3;
            let b = (o + 2) % 3;
            let outside = facet.vertices[o];
            let outside_shade = facet.shades[o];

            let (pa, ta) = intersect_near(&outside, &facet.vertices[a], near_z);
            let (pb, tb) = intersect_near(&outside, &facet.vertices[b], near_z);
            let shade_a = lerp_color(outside_shade, facet.shades[a], ta);
            let shade_b = lerp_color(outside_shade, facet.shades[b], tb);

            let mut second = facet.clone();
            second.vertices[o] = pb;
            second.shades[o] = shade_b;
            second.vertices[a] = pa;
            second.shades[a] = shade_a;
            second.compute_normal();

            facet.vertices[o] = pa;
            facet.shades[o] = shade_a;
            facet.compute_normal();

            stats.triangles_split += 1;
            Some(second)
        }
    }
}

/// Clips every active facet in `list` against `z = near_z`, appending split-off facets.
///
/// Appended facets are visited by the same pass, so a quad split into two
/// triangles has both halves clipped.
pub fn clip_polygons(list: &mut FramePolyList, near_z: f32) -> Result<ClipStats, RenderError> {
    let mut stats = ClipStats::default();
    let mut slot = 0;
    while slot < list.len() {
        let mut extra = Vec::with_capacity(2);
        if let Some(facet) = list.get_mut(slot) {
            if facet.active {
                if facet.vertex_count == 4 && facet.points().iter().any(|p| p.z < near_z) {
                    extra.push(split_quad(facet));
                    stats.quads_split += 1;
                }
                if let Some(second) = clip_triangle(facet, near_z, &mut stats) {
                    extra.push(second);
                }
            }
        }
        for facet in extra {
            list.push(facet)?;
        }
        slot += 1;
    }
    return Ok(stats);
}
