// src/surface.rs

//! Owned pixel buffers.
//!
//! A `Surface` has fixed dimensions, mutable contents and an optional color
//! space tag. Every accessor checks that the `System` which created the
//! surface is still alive and reports `SystemError::Disposed` otherwise.

use crate::color::Rgba;
use crate::color_space::{ColorSpace, ColorSpaceDescriptor, ColorSpaceRef};
use crate::error::{ResourceKind, Result, SystemError};
use crate::lifetime::HandleToken;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Byte order of a 4-channel, 8-bit pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Portable layout used by the `*_rgba_*` creation calls.
    #[default]
    Rgba8,
    /// Native layout of most windowing systems.
    Bgra8,
}

impl PixelFormat {
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Byte offsets of the red and blue channels.
    pub(crate) fn rb_offsets(self) -> (usize, usize) {
        match self {
            PixelFormat::Rgba8 => (0, 2),
            PixelFormat::Bgra8 => (2, 0),
        }
    }
}

/// Validates caller-supplied dimensions.
pub(crate) fn checked_size(width: i32, height: i32) -> Result<(u32, u32)> {
    if width <= 0 || height <= 0 {
        return Err(SystemError::invalid(format!(
            "surface size must be positive, got {}x{}",
            width, height
        )));
    }
    Ok((width as u32, height as u32))
}

fn buffer_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(PixelFormat::BYTES_PER_PIXEL))
        .ok_or_else(|| {
            SystemError::creation(
                ResourceKind::Surface,
                format!("{}x{} pixels overflow the address space", width, height),
            )
        })
}

#[derive(Debug)]
pub struct Surface {
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Vec<u8>,
    color_space: Option<ColorSpaceRef>,
    token: HandleToken,
}

impl Surface {
    /// Allocates a transparent surface.
    pub(crate) fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        color_space: Option<ColorSpaceRef>,
        token: HandleToken,
    ) -> Result<Self> {
        let len = buffer_len(width, height)?;
        trace!(
            "Surface::new {}x{} {:?} cs={:?}",
            width,
            height,
            format,
            color_space.as_ref().map(|cs| cs.name())
        );
        Ok(Self {
            width,
            height,
            format,
            pixels: vec![0; len],
            color_space,
            token,
        })
    }

    /// Decodes a PNG file into a surface with the given layout.
    ///
    /// The surface is tagged with the file's embedded ICC profile, or sRGB
    /// when the file carries an sRGB chunk, or left untagged.
    pub(crate) fn load_png(path: &Path, format: PixelFormat, token: HandleToken) -> Result<Self> {
        let file = File::open(path).map_err(|e| SystemError::decode(path, e))?;
        let mut decoder = png::Decoder::new(BufReader::new(file));
        decoder.set_transformations(png::Transformations::normalize_to_color8());
        let mut reader = decoder
            .read_info()
            .map_err(|e| SystemError::decode(path, e))?;

        let color_space = {
            let info = reader.info();
            if let Some(icc) = info.icc_profile.as_ref() {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "embedded".to_string());
                Some(ColorSpace::shared(ColorSpaceDescriptor::icc(
                    name,
                    icc.to_vec(),
                )))
            } else if info.srgb.is_some() {
                Some(ColorSpace::shared(ColorSpaceDescriptor::srgb()))
            } else {
                None
            }
        };

        let mut buf = vec![0; reader.output_buffer_size()];
        let frame = reader
            .next_frame(&mut buf)
            .map_err(|e| SystemError::decode(path, e))?;

        let channels = match frame.color_type {
            png::ColorType::Grayscale => 1,
            png::ColorType::GrayscaleAlpha => 2,
            png::ColorType::Rgb => 3,
            png::ColorType::Rgba => 4,
            png::ColorType::Indexed => {
                return Err(SystemError::decode(path, "palette image was not expanded"));
            }
        };

        let mut surface = Self::new(frame.width, frame.height, format, color_space, token)
            .map_err(|e| SystemError::decode(path, e))?;
        let (r_at, b_at) = format.rb_offsets();
        let row_px = frame.width as usize;
        for y in 0..frame.height as usize {
            let src_row = &buf[y * frame.line_size..y * frame.line_size + row_px * channels];
            let dst_row = &mut surface.pixels[y * row_px * 4..(y + 1) * row_px * 4];
            for (src, dst) in src_row.chunks_exact(channels).zip(dst_row.chunks_exact_mut(4)) {
                let (r, g, b, a) = match channels {
                    1 => (src[0], src[0], src[0], 255),
                    2 => (src[0], src[0], src[0], src[1]),
                    3 => (src[0], src[1], src[2], 255),
                    _ => (src[0], src[1], src[2], src[3]),
                };
                dst[r_at] = r;
                dst[1] = g;
                dst[b_at] = b;
                dst[3] = a;
            }
        }

        debug!(
            "Surface: decoded '{}' ({}x{}, {:?} -> {:?})",
            path.display(),
            frame.width,
            frame.height,
            frame.color_type,
            format
        );
        Ok(surface)
    }

    /// False once the owning `System` has been disposed.
    pub fn is_valid(&self) -> bool {
        self.token.is_alive()
    }

    pub fn width(&self) -> Result<u32> {
        self.token.check()?;
        Ok(self.width)
    }

    pub fn height(&self) -> Result<u32> {
        self.token.check()?;
        Ok(self.height)
    }

    /// Bytes per row. Rows are tightly packed.
    pub fn stride(&self) -> Result<usize> {
        self.token.check()?;
        Ok(self.width as usize * PixelFormat::BYTES_PER_PIXEL)
    }

    pub fn format(&self) -> Result<PixelFormat> {
        self.token.check()?;
        Ok(self.format)
    }

    pub fn color_space(&self) -> Result<Option<&ColorSpaceRef>> {
        self.token.check()?;
        Ok(self.color_space.as_ref())
    }

    /// Retags the surface without touching its pixels.
    pub fn set_color_space(&mut self, color_space: Option<ColorSpaceRef>) -> Result<()> {
        self.token.check()?;
        self.color_space = color_space;
        Ok(())
    }

    fn offset(&self, x: u32, y: u32) -> Result<usize> {
        if x >= self.width || y >= self.height {
            return Err(SystemError::invalid(format!(
                "pixel ({}, {}) outside {}x{} surface",
                x, y, self.width, self.height
            )));
        }
        Ok((y as usize * self.width as usize + x as usize) * PixelFormat::BYTES_PER_PIXEL)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Result<Rgba> {
        self.token.check()?;
        let at = self.offset(x, y)?;
        let bytes = [
            self.pixels[at],
            self.pixels[at + 1],
            self.pixels[at + 2],
            self.pixels[at + 3],
        ];
        Ok(Rgba::from_bytes(bytes, self.format))
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, color: Rgba) -> Result<()> {
        self.token.check()?;
        let at = self.offset(x, y)?;
        self.pixels[at..at + 4].copy_from_slice(&color.to_bytes(self.format));
        Ok(())
    }

    pub fn fill(&mut self, color: Rgba) -> Result<()> {
        self.token.check()?;
        let bytes = color.to_bytes(self.format);
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
        Ok(())
    }

    pub fn pixels(&self) -> Result<&[u8]> {
        self.token.check()?;
        Ok(&self.pixels)
    }

    pub fn pixels_mut(&mut self) -> Result<&mut [u8]> {
        self.token.check()?;
        Ok(&mut self.pixels)
    }

    /// Applies a conversion to the pixels and retags the surface.
    pub fn apply_conversion(&mut self, conversion: &crate::ColorSpaceConversion) -> Result<()> {
        conversion.convert_surface(self)
    }
}
