// src/color.rs

//! 8-bit RGBA color values and their packing into pixel buffers.

use crate::surface::PixelFormat;
use serde::{Deserialize, Serialize};

/// A straight (non-premultiplied) 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Packs the color in the byte order of `format`.
    pub fn to_bytes(self, format: PixelFormat) -> [u8; 4] {
        match format {
            PixelFormat::Rgba8 => [self.r, self.g, self.b, self.a],
            PixelFormat::Bgra8 => [self.b, self.g, self.r, self.a],
        }
    }

    /// Reads a color packed in the byte order of `format`.
    pub fn from_bytes(bytes: [u8; 4], format: PixelFormat) -> Self {
        match format {
            PixelFormat::Rgba8 => Self::new(bytes[0], bytes[1], bytes[2], bytes[3]),
            PixelFormat::Bgra8 => Self::new(bytes[2], bytes[1], bytes[0], bytes[3]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_swap_red_and_blue_for_bgra() {
        let c = Rgba::new(1, 2, 3, 4);
        assert_eq!(c.to_bytes(PixelFormat::Bgra8), [3, 2, 1, 4]);
        assert_eq!(Rgba::from_bytes([3, 2, 1, 4], PixelFormat::Bgra8), c);
        assert_eq!(c.to_bytes(PixelFormat::Rgba8), [1, 2, 3, 4]);
    }
}
