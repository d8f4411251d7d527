use std::path::Path;

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};

use crate::color::Color;
use crate::error::RenderError;

/// Packed `0x00RRGGBB` pixels, row-major. (0, 0) is the bottom left pixel.
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    pixels: Vec<u32>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> FrameBuffer {
        let n_pixels = (width * height) as usize;
        return FrameBuffer { width, height, pixels: vec![0; n_pixels] };
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        return Some(x as usize + y as usize * self.width as usize);
    }

    /// Fills every pixel with `color`.
    pub fn clear(&mut self, color: Color) {
        self.pixels.fill(color.to_packed());
    }

    /// Writes a pixel. Out of bounds coordinates are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if let Some(index) = self.index(x, y) {
            self.pixels[index] = color.to_packed();
        }
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Color> {
        return self.index(x, y).map(|i| Color::from_packed(self.pixels[i]));
    }

    pub fn as_packed(&self) -> &[u32] {
        return &self.pixels;
    }

    /// Top-down rgb8 bytes, the layout images and windows expect.
    pub fn as_render_data(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.pixels.len() * 3);
        for row in (0..self.height as usize).rev() {
            let start = row * self.width as usize;
            for &pixel in &self.pixels[start..start + self.width as usize] {
                let c = Color::from_packed(pixel);
                data.extend_from_slice(&[c.r, c.g, c.b]);
            }
        }
        return data;
    }

    pub fn to_image(&self) -> RgbImage {
        return ImageBuffer::from_fn(self.width, self.height, |x, y| {
            let c = Color::from_packed(self.pixels[x as usize + (self.height - 1 - y) as usize * self.width as usize]);
            Rgb([c.r, c.g, c.b])
        });
    }

    pub fn save(&self, path: &Path) -> Result<(), RenderError> {
        return self.to_image().save(path).map_err(|e| RenderError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        });
    }
}

/// Per-pixel nearest depth, same layout as [`FrameBuffer`]. Lower values are closer.
pub struct ZBuffer {
    pub width: u32,
    pub height: u32,
    depth: Vec<f32>,
}

impl ZBuffer {
    pub fn new(width: u32, height: u32) -> ZBuffer {
        let n_pixels = (width * height) as usize;
        return ZBuffer { width, height, depth: vec![f32::INFINITY; n_pixels] };
    }

    /// Resets every entry to "infinitely far".
    pub fn clear(&mut self) {
        self.depth.fill(f32::INFINITY);
    }

    pub fn get(&self, x: i32, y: i32) -> Option<f32> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        return Some(self.depth[x as usize + y as usize * self.width as usize]);
    }

    /// Stores `z` if it is closer than what the pixel holds. Returns whether it was stored.
    #[inline]
    pub fn test_and_set(&mut self, x: i32, y: i32, z: f32) -> bool {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return false;
        }
        let index = x as usize + y as usize * self.width as usize;
        if z < self.depth[index] {
            self.depth[index] = z;
            return true;
        }
        return false;
    }

    /// Like [`ZBuffer::test_and_set`] but also passes on equal depth, so overlays
    /// drawn later at the same depth land on top of earlier ones.
    #[inline]
    pub fn test_le_and_set(&mut self, x: i32, y: i32, z: f32) -> bool {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return false;
        }
        let index = x as usize + y as usize * self.width as usize;
        if z <= self.depth[index] {
            self.depth[index] = z;
            return true;
        }
        return false;
    }

    /// Grayscale view of the buffer: near is bright, far is dark, empty pixels black.
    /// Computed only when asked for.
    pub fn to_depth_image(&self) -> GrayImage {
        let written = self.depth.iter().filter(|z| z.is_finite());
        let z_min = written.clone().fold(f32::MAX, |min_value, &value| value.min(min_value));
        let z_max = written.fold(f32::MIN, |max_value, &value| value.max(max_value));
        let scale = (z_max - z_min).max(f32::EPSILON);
        return ImageBuffer::from_fn(self.width, self.height, |x, y| {
            let z = self.depth[x as usize + (self.height - 1 - y) as usize * self.width as usize];
            if !z.is_finite() {
                return Luma([0]);
            }
            let scaled = 255.0 - ((z - z_min) / scale) * 223.0;
            Luma([scaled as u8])
        });
    }
}
