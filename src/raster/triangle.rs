//! Scanline triangle filling with a depth test.
//!
//! A triangle is sorted by y and split at its middle vertex into a part whose
//! first scanline is flat and a part whose last scanline is flat. Both halves
//! are filled row by row, sampling at pixel centers, so triangles sharing an
//! edge neither overlap nor leave gaps.

use crate::color::Color;
use crate::raster::buffer::{FrameBuffer, ZBuffer};

/// Projected vertex: viewport position, camera depth and color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterVertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub color: [f32; 3],
}

impl RasterVertex {
    pub fn new(x: f32, y: f32, z: f32, color: Color) -> RasterVertex {
        return RasterVertex { x, y, z, color: color.to_f32() };
    }

    fn lerp(&self, other: &RasterVertex, t: f32) -> RasterVertex {
        return RasterVertex {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
            color: [
                self.color[0] + (other.color[0] - self.color[0]) * t,
                self.color[1] + (other.color[1] - self.color[1]) * t,
                self.color[2] + (other.color[2] - self.color[2]) * t,
            ],
        };
    }

    fn is_finite(&self) -> bool {
        return self.x.is_finite() && self.y.is_finite() && self.z.is_finite();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FillMode {
    /// One color for every pixel.
    Flat(Color),
    /// Vertex colors interpolated along edges and spans.
    Gouraud,
}

struct Raster<'a> {
    pixels: &'a mut FrameBuffer,
    zbuffer: &'a mut ZBuffer,
    mode: FillMode,
    width: i32,
    height: i32,
    // Set when part of the triangle lies off screen.
    clip: bool,
}

impl Raster<'_> {
    /// First scanline flat: `a` and `b` share a y, `apex` is below them in row order.
    fn fill_flat_top(&mut self, a: RasterVertex, b: RasterVertex, apex: RasterVertex) -> usize {
        let (left, right) = if a.x <= b.x { (a, b) } else { (b, a) };
        return self.fill_edges((&left, &apex), (&right, &apex), a.y, apex.y);
    }

    /// Last scanline flat: `a` and `b` share a y, `apex` comes first in row order.
    fn fill_flat_bottom(&mut self, apex: RasterVertex, a: RasterVertex, b: RasterVertex) -> usize {
        let (left, right) = if a.x <= b.x { (a, b) } else { (b, a) };
        return self.fill_edges((&apex, &left), (&apex, &right), apex.y, a.y);
    }

    fn fill_edges(
        &mut self,
        left: (&RasterVertex, &RasterVertex),
        right: (&RasterVertex, &RasterVertex),
        y_start: f32,
        y_end: f32,
    ) -> usize {
        let mut row_start = (y_start - 0.5).ceil() as i32;
        let mut row_end = (y_end - 0.5).ceil() as i32;
        if self.clip {
            row_start = row_start.max(0);
            row_end = row_end.min(self.height);
        }
        let mut written = 0;
        for y in row_start..row_end {
            let yc = y as f32 + 0.5;
            let l = edge_at(left.0, left.1, yc);
            let r = edge_at(right.0, right.1, yc);
            written += self.span(y, &l, &r);
        }
        return written;
    }

    fn span(&mut self, y: i32, left: &RasterVertex, right: &RasterVertex) -> usize {
        let mut x_start = (left.x - 0.5).ceil() as i32;
        let mut x_end = (right.x - 0.5).ceil() as i32;
        if self.clip {
            x_start = x_start.max(0);
            x_end = x_end.min(self.width);
        }
        if x_end <= x_start {
            return 0;
        }

        let dx = right.x - left.x;
        let (dz, dc) = if dx > f32::EPSILON {
            (
                (right.z - left.z) / dx,
                [
                    (right.color[0] - left.color[0]) / dx,
                    (right.color[1] - left.color[1]) / dx,
                    (right.color[2] - left.color[2]) / dx,
                ],
            )
        } else {
            (0.0, [0.0; 3])
        };

        let mut written = 0;
        for x in x_start..x_end {
            let offset = x as f32 + 0.5 - left.x;
            let z = left.z + dz * offset;
            if !self.zbuffer.test_and_set(x, y, z) {
                continue;
            }
            let color = match self.mode {
                FillMode::Flat(color) => color,
                FillMode::Gouraud => Color::from_f32([
                    left.color[0] + dc[0] * offset,
                    left.color[1] + dc[1] * offset,
                    left.color[2] + dc[2] * offset,
                ]),
            };
            self.pixels.set_pixel(x, y, color);
            written += 1;
        }
        return written;
    }
}

/// Point on edge `a`-`b` at height `y`.
fn edge_at(a: &RasterVertex, b: &RasterVertex, y: f32) -> RasterVertex {
    let dy = b.y - a.y;
    if dy.abs() < f32::EPSILON {
        return *a;
    }
    return a.lerp(b, (y - a.y) / dy);
}

/// Pixels and triangles that actually reached scan conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coverage {
    pub triangles: usize,
    pub pixels: usize,
}

/// Fills a triangle, writing each pixel whose depth beats the z-buffer.
/// Returns the number of pixels written, or `None` for degenerate and
/// off-screen triangles, which are rejected before scan conversion.
pub fn draw_triangle(
    a: RasterVertex,
    b: RasterVertex,
    c: RasterVertex,
    mode: FillMode,
    pixels: &mut FrameBuffer,
    zbuffer: &mut ZBuffer,
) -> Option<usize> {
    if !(a.is_finite() && b.is_finite() && c.is_finite()) {
        return None;
    }
    if (a.x == b.x && b.x == c.x) || (a.y == b.y && b.y == c.y) {
        return None;
    }

    let mut v = [a, b, c];
    v.sort_by(|p, q| p.y.total_cmp(&q.y));
    let [v0, v1, v2] = v;

    let width = pixels.width.min(zbuffer.width) as i32;
    let height = pixels.height.min(zbuffer.height) as i32;
    let min_x = v0.x.min(v1.x).min(v2.x);
    let max_x = v0.x.max(v1.x).max(v2.x);
    if v2.y < 0.0 || v0.y >= height as f32 || max_x < 0.0 || min_x >= width as f32 {
        return None;
    }
    let inside = min_x >= 0.0 && max_x <= width as f32 && v0.y >= 0.0 && v2.y <= height as f32;

    let mut raster = Raster { pixels, zbuffer, mode, width, height, clip: !inside };
    if v0.y == v1.y {
        return Some(raster.fill_flat_top(v0, v1, v2));
    }
    if v1.y == v2.y {
        return Some(raster.fill_flat_bottom(v0, v1, v2));
    }
    let mut split = v0.lerp(&v2, (v1.y - v0.y) / (v2.y - v0.y));
    split.y = v1.y;
    return Some(raster.fill_flat_bottom(v0, v1, split) + raster.fill_flat_top(v1, split, v2));
}

/// Fills a convex polygon as a fan of triangles around its first vertex.
pub fn draw_polygon(
    points: &[RasterVertex],
    mode: FillMode,
    pixels: &mut FrameBuffer,
    zbuffer: &mut ZBuffer,
) -> Coverage {
    let mut coverage = Coverage::default();
    for i in 1..points.len().saturating_sub(1) {
        if let Some(written) = draw_triangle(points[0], points[i], points[i + 1], mode, pixels, zbuffer) {
            coverage.triangles += 1;
            coverage.pixels += written;
        }
    }
    return coverage;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLACK, BLUE, RED, WHITE};

    fn buffers(w: u32, h: u32) -> (FrameBuffer, ZBuffer) {
        let mut fb = FrameBuffer::new(w, h);
        fb.clear(BLACK);
        return (fb, ZBuffer::new(w, h));
    }

    fn square(x0: f32, y0: f32, x1: f32, y1: f32, z: f32) -> [RasterVertex; 4] {
        return [
            RasterVertex::new(x0, y0, z, WHITE),
            RasterVertex::new(x1, y0, z, WHITE),
            RasterVertex::new(x1, y1, z, WHITE),
            RasterVertex::new(x0, y1, z, WHITE),
        ];
    }

    fn count(fb: &FrameBuffer, color: Color) -> usize {
        return fb.as_packed().iter().filter(|&&p| p == color.to_packed()).count();
    }

    #[test]
    fn shared_edges_have_no_gaps_or_overlaps() {
        let (mut fb, mut z) = buffers(20, 20);
        let quad = square(0.0, 0.0, 10.0, 10.0, 1.0);
        let coverage = draw_polygon(&quad, FillMode::Flat(RED), &mut fb, &mut z);
        assert_eq!(coverage, Coverage { triangles: 2, pixels: 100 });
        assert_eq!(count(&fb, RED), 100);
        assert_eq!(fb.get_pixel(9, 9), Some(RED));
        assert_eq!(fb.get_pixel(10, 9), Some(BLACK));
        assert_eq!(fb.get_pixel(9, 10), Some(BLACK));
    }

    #[test]
    fn general_triangle_is_split_at_its_middle_vertex() {
        let (mut fb, mut z) = buffers(20, 20);
        let a = RasterVertex::new(2.0, 1.0, 1.0, WHITE);
        let b = RasterVertex::new(15.0, 7.0, 1.0, WHITE);
        let c = RasterVertex::new(6.0, 16.0, 1.0, WHITE);
        let written = draw_triangle(a, b, c, FillMode::Flat(RED), &mut fb, &mut z).unwrap();
        assert_eq!(written, count(&fb, RED));
        // Close to the geometric area of 85.5.
        assert!((78..=93).contains(&written), "{written}");
        assert_eq!(fb.get_pixel(7, 8), Some(RED));
        assert_eq!(fb.get_pixel(14, 14), Some(BLACK));
    }

    #[test]
    fn degenerate_triangles_draw_nothing() {
        let (mut fb, mut z) = buffers(10, 10);
        let a = RasterVertex::new(1.0, 1.0, 1.0, WHITE);
        let same_x = draw_triangle(
            a,
            RasterVertex::new(1.0, 5.0, 1.0, WHITE),
            RasterVertex::new(1.0, 8.0, 1.0, WHITE),
            FillMode::Flat(RED),
            &mut fb,
            &mut z,
        );
        let same_y = draw_triangle(
            a,
            RasterVertex::new(5.0, 1.0, 1.0, WHITE),
            RasterVertex::new(8.0, 1.0, 1.0, WHITE),
            FillMode::Flat(RED),
            &mut fb,
            &mut z,
        );
        let nan = draw_triangle(
            a,
            RasterVertex::new(f32::NAN, 1.0, 1.0, WHITE),
            RasterVertex::new(8.0, 4.0, 1.0, WHITE),
            FillMode::Flat(RED),
            &mut fb,
            &mut z,
        );
        assert_eq!((same_x, same_y, nan), (None, None, None));
        assert_eq!(count(&fb, RED), 0);
    }

    #[test]
    fn partially_visible_triangles_are_clipped_to_the_screen() {
        let (mut fb, mut z) = buffers(10, 10);
        let quad = square(-5.0, -5.0, 5.0, 5.0, 1.0);
        assert_eq!(draw_polygon(&quad, FillMode::Flat(RED), &mut fb, &mut z).pixels, 25);

        let (mut fb, mut z) = buffers(10, 10);
        let off = square(20.0, 20.0, 30.0, 30.0, 1.0);
        assert_eq!(draw_polygon(&off, FillMode::Flat(RED), &mut fb, &mut z), Coverage::default());
    }

    #[test]
    fn only_scan_converted_triangles_are_counted() {
        let (mut fb, mut z) = buffers(10, 10);
        let sliver = [
            RasterVertex::new(1.0, 1.0, 1.0, WHITE),
            RasterVertex::new(4.0, 1.0, 1.0, WHITE),
            RasterVertex::new(8.0, 1.0, 1.0, WHITE),
            RasterVertex::new(2.0, 6.0, 1.0, WHITE),
        ];
        // The first fan triangle is flat on one row, the second is real.
        let coverage = draw_polygon(&sliver, FillMode::Flat(RED), &mut fb, &mut z);
        assert_eq!(coverage.triangles, 1);

        // Fully hidden behind nearer depth still went through the rasterizer.
        let behind = square(0.0, 0.0, 4.0, 4.0, 9.0);
        draw_polygon(&square(0.0, 0.0, 4.0, 4.0, 1.0), FillMode::Flat(RED), &mut fb, &mut z);
        let coverage = draw_polygon(&behind, FillMode::Flat(BLUE), &mut fb, &mut z);
        assert_eq!(coverage, Coverage { triangles: 2, pixels: 0 });
    }

    #[test]
    fn nearest_surface_wins_in_any_draw_order() {
        let near = square(0.0, 0.0, 8.0, 8.0, 2.0);
        let far = square(4.0, 4.0, 12.0, 12.0, 5.0);

        let (mut fb_a, mut z_a) = buffers(16, 16);
        draw_polygon(&near, FillMode::Flat(RED), &mut fb_a, &mut z_a);
        draw_polygon(&far, FillMode::Flat(BLUE), &mut fb_a, &mut z_a);

        let (mut fb_b, mut z_b) = buffers(16, 16);
        draw_polygon(&far, FillMode::Flat(BLUE), &mut fb_b, &mut z_b);
        draw_polygon(&near, FillMode::Flat(RED), &mut fb_b, &mut z_b);

        assert_eq!(fb_a.as_packed(), fb_b.as_packed());
        assert_eq!(fb_a.get_pixel(5, 5), Some(RED));
        assert_eq!(fb_a.get_pixel(10, 10), Some(BLUE));
        assert_eq!(z_a.get(5, 5), Some(2.0));
    }

    #[test]
    fn depth_is_interpolated_across_the_triangle() {
        let (mut fb, mut z) = buffers(10, 10);
        let a = RasterVertex::new(0.0, 0.0, 1.0, WHITE);
        let b = RasterVertex::new(10.0, 0.0, 11.0, WHITE);
        let c = RasterVertex::new(0.0, 10.0, 1.0, WHITE);
        draw_triangle(a, b, c, FillMode::Flat(RED), &mut fb, &mut z);
        let d = z.get(4, 0).unwrap();
        assert!((d - 5.5).abs() < 1e-4, "{d}");
    }

    #[test]
    fn gouraud_blends_vertex_colors() {
        let (mut fb, mut z) = buffers(40, 40);
        let a = RasterVertex::new(0.0, 0.0, 1.0, RED);
        let b = RasterVertex::new(40.0, 0.0, 1.0, BLUE);
        let c = RasterVertex::new(0.0, 40.0, 1.0, RED);
        draw_triangle(a, b, c, FillMode::Gouraud, &mut fb, &mut z);
        let near_red = fb.get_pixel(1, 1).unwrap();
        let near_blue = fb.get_pixel(37, 1).unwrap();
        assert!(near_red.r > 200 && near_red.b < 50);
        assert!(near_blue.b > 200 && near_blue.r < 50);
        let middle = fb.get_pixel(19, 0).unwrap();
        assert!((middle.r as i32 - middle.b as i32).abs() < 16);
    }
}
