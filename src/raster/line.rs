use crate::color::Color;
use crate::raster::buffer::{FrameBuffer, ZBuffer};

/// Depth used by screen-space overlays; it beats every camera-space depth.
pub const OVERLAY_DEPTH: f32 = 0.0;

/// Plots a single pixel if `depth` is no farther than what the z-buffer holds.
pub fn draw_point(x: i32, y: i32, depth: f32, color: Color, pixels: &mut FrameBuffer, zbuffer: &mut ZBuffer) -> bool {
    if zbuffer.test_le_and_set(x, y, depth) {
        pixels.set_pixel(x, y, color);
        return true;
    }
    return false;
}

/// Draws a line between a and b at a constant depth via Bresenham's algorithm
/// as presented in https://en.wikipedia.org/wiki/Bresenham%27s_line_algorithm
/// Pixels off screen are skipped. Returns the number of pixels written.
pub fn draw_line(
    a: (i32, i32),
    b: (i32, i32),
    depth: f32,
    color: Color,
    pixels: &mut FrameBuffer,
    zbuffer: &mut ZBuffer,
) -> usize {
    let (mut x_0, mut y_0) = a;
    let (x_1, y_1) = b;
    let dx: i32 = (x_1 - x_0).abs();
    let sx: i32 = if x_0 < x_1 { 1 } else { -1 };
    let dy: i32 = -(y_1 - y_0).abs();
    let sy: i32 = if y_0 < y_1 { 1 } else { -1 };
    let mut error: i32 = dx + dy;

    let mut written = 0;
    loop {
        if draw_point(x_0, y_0, depth, color, pixels, zbuffer) {
            written += 1;
        }
        if x_0 == x_1 && y_0 == y_1 {
            break;
        }
        let e2 = 2 * error;
        if e2 >= dy {
            if x_0 == x_1 {
                break;
            }
            error += dy;
            x_0 += sx;
        }
        if e2 <= dx {
            if y_0 == y_1 {
                break;
            }
            error += dx;
            y_0 += sy;
        }
    }
    return written;
}

/// Outline of a closed polygon.
pub fn draw_outline(
    points: &[(i32, i32)],
    depth: f32,
    color: Color,
    pixels: &mut FrameBuffer,
    zbuffer: &mut ZBuffer,
) -> usize {
    let mut written = 0;
    for (i, &start) in points.iter().enumerate() {
        let end = points[(i + 1) % points.len()];
        written += draw_line(start, end, depth, color, pixels, zbuffer);
    }
    return written;
}
