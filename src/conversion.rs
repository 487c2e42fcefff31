// src/conversion.rs

//! Pixel conversion between two color spaces.
//!
//! A conversion is negotiated once for an ordered (source, destination)
//! pair and then applied to any number of 8-bit RGBA buffers. Alpha is
//! passed through untouched.

use crate::color_space::{ColorSpaceRef, Primaries, TransferFn};
use crate::error::{ResourceKind, Result, SystemError};
use crate::surface::{PixelFormat, Surface};
use log::{debug, trace};

type Mat3 = [[f64; 3]; 3];

fn mul(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

fn apply(m: &Mat3, v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

fn invert(m: &Mat3) -> Option<Mat3> {
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
    if det.abs() < 1e-12 || !det.is_finite() {
        return None;
    }
    let inv_det = 1.0 / det;
    Some([
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
        ],
    ])
}

fn xyz_of(x: f64, y: f64) -> [f64; 3] {
    [x / y, 1.0, (1.0 - x - y) / y]
}

/// Linear RGB to CIE XYZ for the given primaries. `None` when the primaries
/// do not span a color volume.
pub(crate) fn rgb_to_xyz(p: &Primaries) -> Option<Mat3> {
    let r = xyz_of(p.red.x, p.red.y);
    let g = xyz_of(p.green.x, p.green.y);
    let b = xyz_of(p.blue.x, p.blue.y);
    let m = [[r[0], g[0], b[0]], [r[1], g[1], b[1]], [r[2], g[2], b[2]]];
    let s = apply(&invert(&m)?, xyz_of(p.white.x, p.white.y));
    Some([
        [m[0][0] * s[0], m[0][1] * s[1], m[0][2] * s[2]],
        [m[1][0] * s[0], m[1][1] * s[1], m[1][2] * s[2]],
        [m[2][0] * s[0], m[2][1] * s[1], m[2][2] * s[2]],
    ])
}

const BRADFORD: Mat3 = [
    [0.8951, 0.2664, -0.1614],
    [-0.7502, 1.7135, 0.0367],
    [0.0389, -0.0685, 1.0296],
];

/// Bradford chromatic adaptation from one white point to another.
fn adaptation(src: &Primaries, dst: &Primaries) -> Option<Mat3> {
    if src.white == dst.white {
        return Some([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
    }
    let src_cone = apply(&BRADFORD, xyz_of(src.white.x, src.white.y));
    let dst_cone = apply(&BRADFORD, xyz_of(dst.white.x, dst.white.y));
    let scale = [
        [dst_cone[0] / src_cone[0], 0.0, 0.0],
        [0.0, dst_cone[1] / src_cone[1], 0.0],
        [0.0, 0.0, dst_cone[2] / src_cone[2]],
    ];
    Some(mul(&invert(&BRADFORD)?, &mul(&scale, &BRADFORD)))
}

enum Transform {
    Identity,
    Matrix {
        decode: Box<[f64; 256]>,
        matrix: Mat3,
        encode: TransferFn,
    },
}

/// Deterministic function from one color space's encoding to another's.
///
/// Exclusively owned by its caller. Stateless once built: applying it to a
/// buffer never changes the conversion.
pub struct ColorSpaceConversion {
    src: ColorSpaceRef,
    dst: ColorSpaceRef,
    transform: Transform,
}

impl std::fmt::Debug for ColorSpaceConversion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColorSpaceConversion")
            .field("src", &self.src.name())
            .field("dst", &self.dst.name())
            .field("identity", &self.is_identity())
            .finish()
    }
}

impl ColorSpaceConversion {
    /// Negotiates the transform for `src` → `dst`.
    ///
    /// Fails with `CreationFailed` when either side is an ICC profile that
    /// differs from the other side, since no transform tables are available
    /// for it.
    pub fn new(src: ColorSpaceRef, dst: ColorSpaceRef) -> Result<Self> {
        if src.descriptor() == dst.descriptor() {
            debug!("ColorSpaceConversion: identity for '{}'", src.name());
            return Ok(Self {
                src,
                dst,
                transform: Transform::Identity,
            });
        }

        let (Some((src_tf, src_p)), Some((dst_tf, dst_p))) =
            (src.descriptor().parametric(), dst.descriptor().parametric())
        else {
            return Err(SystemError::creation(
                ResourceKind::ColorSpaceConversion,
                format!(
                    "no transform tables to bridge '{}' and '{}'",
                    src.name(),
                    dst.name()
                ),
            ));
        };

        if src_tf == dst_tf && src_p == dst_p {
            debug!(
                "ColorSpaceConversion: '{}' and '{}' share parameters, identity",
                src.name(),
                dst.name()
            );
            return Ok(Self {
                src,
                dst,
                transform: Transform::Identity,
            });
        }

        let degenerate = || {
            SystemError::creation(
                ResourceKind::ColorSpaceConversion,
                format!("degenerate primaries between '{}' and '{}'", src.name(), dst.name()),
            )
        };
        let to_xyz = rgb_to_xyz(&src_p).ok_or_else(degenerate)?;
        let from_xyz = rgb_to_xyz(&dst_p)
            .and_then(|m| invert(&m))
            .ok_or_else(degenerate)?;
        let adapt = adaptation(&src_p, &dst_p).ok_or_else(degenerate)?;
        let matrix = mul(&from_xyz, &mul(&adapt, &to_xyz));

        let mut decode = Box::new([0.0; 256]);
        for (i, slot) in decode.iter_mut().enumerate() {
            *slot = src_tf.decode(i as f64 / 255.0);
        }

        debug!(
            "ColorSpaceConversion: built transform '{}' -> '{}'",
            src.name(),
            dst.name()
        );
        Ok(Self {
            src,
            dst,
            transform: Transform::Matrix {
                decode,
                matrix,
                encode: dst_tf,
            },
        })
    }

    pub fn source(&self) -> &ColorSpaceRef {
        &self.src
    }

    pub fn destination(&self) -> &ColorSpaceRef {
        &self.dst
    }

    pub fn is_identity(&self) -> bool {
        matches!(self.transform, Transform::Identity)
    }

    fn convert_pixel(&self, rgb: [u8; 3]) -> [u8; 3] {
        match &self.transform {
            Transform::Identity => rgb,
            Transform::Matrix {
                decode,
                matrix,
                encode,
            } => {
                let linear = [
                    decode[rgb[0] as usize],
                    decode[rgb[1] as usize],
                    decode[rgb[2] as usize],
                ];
                let out = apply(matrix, linear);
                let quantize =
                    |l: f64| (encode.encode(l.clamp(0.0, 1.0)) * 255.0).round().clamp(0.0, 255.0) as u8;
                [quantize(out[0]), quantize(out[1]), quantize(out[2])]
            }
        }
    }

    /// Converts `src` into `dst`, both tightly packed RGBA8 of equal length.
    pub fn convert_rgba8(&self, src: &[u8], dst: &mut [u8]) -> Result<()> {
        self.convert_packed(src, dst, PixelFormat::Rgba8)
    }

    /// Converts a packed buffer of `format` in place.
    pub fn convert_in_place(&self, pixels: &mut [u8], format: PixelFormat) -> Result<()> {
        if pixels.len() % 4 != 0 {
            return Err(SystemError::invalid(format!(
                "buffer length {} is not a whole number of 4-byte pixels",
                pixels.len()
            )));
        }
        if self.is_identity() {
            return Ok(());
        }
        let (r, b) = format.rb_offsets();
        for px in pixels.chunks_exact_mut(4) {
            let out = self.convert_pixel([px[r], px[1], px[b]]);
            px[r] = out[0];
            px[1] = out[1];
            px[b] = out[2];
        }
        Ok(())
    }

    fn convert_packed(&self, src: &[u8], dst: &mut [u8], format: PixelFormat) -> Result<()> {
        if src.len() != dst.len() {
            return Err(SystemError::invalid(format!(
                "source ({} bytes) and destination ({} bytes) differ in size",
                src.len(),
                dst.len()
            )));
        }
        dst.copy_from_slice(src);
        self.convert_in_place(dst, format)
    }

    /// Converts a surface's pixels and retags it with the destination space.
    ///
    /// An untagged surface is assumed to be in the source space; a surface
    /// tagged with a different space is rejected.
    pub fn convert_surface(&self, surface: &mut Surface) -> Result<()> {
        if let Some(tag) = surface.color_space()? {
            if !tag.descriptor().same_encoding(self.src.descriptor()) {
                return Err(SystemError::invalid(format!(
                    "surface is tagged '{}' but the conversion expects '{}'",
                    tag.name(),
                    self.src.name()
                )));
            }
        }
        let format = surface.format()?;
        trace!(
            "ColorSpaceConversion: converting {}x{} surface",
            surface.width()?,
            surface.height()?
        );
        self.convert_in_place(surface.pixels_mut()?, format)?;
        surface.set_color_space(Some(self.dst.clone()))
    }
}
