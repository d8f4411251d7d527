use serde::{Deserialize, Serialize};

/// 8-bit per channel RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

pub const WHITE: Color = Color { r: 255, g: 255, b: 255 };
pub const BLACK: Color = Color { r: 0,   g: 0,   b: 0   };
pub const RED:   Color = Color { r: 255, g: 0,   b: 0   };
pub const GREEN: Color = Color { r: 0,   g: 255, b: 0   };
pub const BLUE:  Color = Color { r: 0,   g: 0,   b: 255 };

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Color {
        return Color { r, g, b };
    }

    /// Unpacks `0x00RRGGBB`. Bits above 24 are ignored.
    pub const fn from_packed(value: u32) -> Color {
        return Color {
            r: ((value >> 16) & 0xff) as u8,
            g: ((value >> 8) & 0xff) as u8,
            b: (value & 0xff) as u8,
        };
    }

    /// Packs into `0x00RRGGBB`, the framebuffer pixel format.
    pub const fn to_packed(self) -> u32 {
        return (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32;
    }

    /// Builds a color from float channels, rounding and clamping each to `[0, 255]`.
    pub fn from_f32(rgb: [f32; 3]) -> Color {
        fn channel(v: f32) -> u8 {
            if v.is_nan() {
                return 0;
            }
            return v.round().clamp(0.0, 255.0) as u8;
        }
        return Color { r: channel(rgb[0]), g: channel(rgb[1]), b: channel(rgb[2]) };
    }

    pub fn to_f32(self) -> [f32; 3] {
        return [self.r as f32, self.g as f32, self.b as f32];
    }

    /// Get convex combination of two colors: t * c_1 + (1 - t) * c_2.
    /// t is unrestricted, result is clamped.
    pub fn blend(color_1: Color, color_2: Color, t: f32) -> Color {
        let a = color_1.to_f32();
        let b = color_2.to_f32();
        return Color::from_f32([
            t * a[0] + (1.0 - t) * b[0],
            t * a[1] + (1.0 - t) * b[1],
            t * a[2] + (1.0 - t) * b[2],
        ]);
    }
}
