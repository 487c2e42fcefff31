// src/font/mod.rs
//! Loaded font resources.
//!
//! Fonts are decoded once by the `FontManager` and handed out as cheap
//! shared handles. Rasterization is left to the renderer; a `Font` only
//! answers metric and coverage queries.

mod manager;
mod sprite_sheet;

pub use manager::FontManager;
pub use sprite_sheet::SpriteGlyph;

use crate::error::Result;
use crate::lifetime::HandleToken;
use sprite_sheet::SpriteSheet;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use ttf_parser::Face;

/// How a font was loaded. Part of the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontKind {
    /// Bitmap glyphs cut from an image, magnified by an integer `scale`.
    SpriteSheet { scale: u32 },
    /// Outline font rendered at `height` pixels.
    TrueType { height: u32 },
}

/// Vertical metrics of a TrueType face, in font units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontMetrics {
    pub units_per_em: u16,
    pub ascent: i16,
    pub descent: i16,
    pub line_gap: i16,
    pub glyph_count: u16,
}

enum FontData {
    TrueType { bytes: Vec<u8>, metrics: FontMetrics },
    SpriteSheet(SpriteSheet),
}

struct FontInner {
    path: PathBuf,
    kind: FontKind,
    data: FontData,
    token: HandleToken,
}

/// Shared handle to a loaded font.
#[derive(Clone)]
pub struct Font {
    inner: Rc<FontInner>,
}

impl Font {
    fn new(path: PathBuf, kind: FontKind, data: FontData, token: HandleToken) -> Self {
        Self {
            inner: Rc::new(FontInner {
                path,
                kind,
                data,
                token,
            }),
        }
    }

    /// False once the owning `System` has been disposed.
    pub fn is_valid(&self) -> bool {
        self.inner.token.is_alive()
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn kind(&self) -> FontKind {
        self.inner.kind
    }

    /// True when both handles refer to the same loaded resource.
    pub fn same_font(&self, other: &Font) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn face(bytes: &[u8]) -> Option<Face<'_>> {
        // Validated at load time.
        Face::parse(bytes, 0).ok()
    }

    /// Distance between baselines in pixels.
    pub fn line_height(&self) -> Result<u32> {
        self.inner.token.check()?;
        Ok(match (&self.inner.data, self.inner.kind) {
            // Magnified sheet dimensions are bounded at load.
            (FontData::SpriteSheet(sheet), FontKind::SpriteSheet { scale }) => {
                sheet.height() * scale
            }
            (FontData::TrueType { metrics, .. }, FontKind::TrueType { height }) => {
                let em = f64::from(metrics.units_per_em.max(1));
                let units = f64::from(metrics.ascent) - f64::from(metrics.descent)
                    + f64::from(metrics.line_gap);
                (units * f64::from(height) / em).ceil().max(0.0) as u32
            }
            _ => 0,
        })
    }

    /// Whether the font can draw `ch`.
    pub fn has_glyph(&self, ch: char) -> Result<bool> {
        self.inner.token.check()?;
        Ok(match &self.inner.data {
            FontData::SpriteSheet(sheet) => sheet.glyph(ch).is_some(),
            FontData::TrueType { bytes, .. } => Self::face(bytes)
                .and_then(|face| face.glyph_index(ch))
                .is_some(),
        })
    }

    /// Horizontal advance of `ch` in pixels, `None` when the glyph is missing.
    pub fn advance(&self, ch: char) -> Result<Option<u32>> {
        self.inner.token.check()?;
        Ok(match (&self.inner.data, self.inner.kind) {
            (FontData::SpriteSheet(sheet), FontKind::SpriteSheet { scale }) => {
                sheet.glyph(ch).map(|g| g.width * scale)
            }
            (FontData::TrueType { bytes, metrics }, FontKind::TrueType { height }) => {
                Self::face(bytes).and_then(|face| {
                    let id = face.glyph_index(ch)?;
                    let units = face.glyph_hor_advance(id)?;
                    let em = f64::from(metrics.units_per_em.max(1));
                    Some((f64::from(units) * f64::from(height) / em).round() as u32)
                })
            }
            _ => None,
        })
    }

    /// Face metrics. `None` for sprite-sheet fonts.
    pub fn metrics(&self) -> Result<Option<FontMetrics>> {
        self.inner.token.check()?;
        Ok(match &self.inner.data {
            FontData::TrueType { metrics, .. } => Some(*metrics),
            FontData::SpriteSheet(_) => None,
        })
    }

    /// Cell of `ch` in the source image. `None` for TrueType fonts.
    pub fn sprite_glyph(&self, ch: char) -> Result<Option<SpriteGlyph>> {
        self.inner.token.check()?;
        Ok(match &self.inner.data {
            FontData::SpriteSheet(sheet) => sheet.glyph(ch),
            FontData::TrueType { .. } => None,
        })
    }

    /// Number of glyphs the font provides.
    pub fn glyph_count(&self) -> Result<usize> {
        self.inner.token.check()?;
        Ok(match &self.inner.data {
            FontData::SpriteSheet(sheet) => sheet.len(),
            FontData::TrueType { metrics, .. } => usize::from(metrics.glyph_count),
        })
    }
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("path", &self.inner.path)
            .field("kind", &self.inner.kind)
            .field("valid", &self.is_valid())
            .finish()
    }
}
