// src/font/manager.rs
//! Owner of every font loaded through a `System`.

use super::sprite_sheet::SpriteSheet;
use super::{Font, FontData, FontKind, FontMetrics};
use crate::error::{Result, SystemError};
use crate::lifetime::{HandleKind, HandleToken, Lifetime};
use crate::surface::{PixelFormat, Surface};
use log::{debug, info};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use ttf_parser::Face;

/// Loads fonts and keeps them, keyed by source path and load parameters.
///
/// A font stays valid until the `System` that owns this manager is disposed.
pub struct FontManager {
    lifetime: Rc<Lifetime>,
    fonts: RefCell<HashMap<(PathBuf, FontKind), Font>>,
}

impl FontManager {
    pub(crate) fn new(lifetime: Rc<Lifetime>) -> Self {
        Self {
            lifetime,
            fonts: RefCell::new(HashMap::new()),
        }
    }

    /// Number of distinct fonts loaded so far.
    pub fn len(&self) -> usize {
        self.fonts.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.borrow().is_empty()
    }

    /// Loads a bitmap font from an image, magnified `scale` times.
    pub fn load_sprite_sheet_font(&self, path: impl AsRef<Path>, scale: i32) -> Result<Font> {
        if scale <= 0 {
            return Err(SystemError::invalid(format!(
                "sprite sheet scale must be positive, got {}",
                scale
            )));
        }
        let kind = FontKind::SpriteSheet {
            scale: scale as u32,
        };
        self.load(path.as_ref(), kind, |path| {
            let token = HandleToken::new(&self.lifetime, HandleKind::Font);
            let image = Surface::load_png(path, PixelFormat::Rgba8, token)?;
            let sheet = SpriteSheet::from_surface(&image)?
                .ok_or_else(|| SystemError::decode(path, "no glyph cells found"))?;
            let magnified = (
                image.width()?.checked_mul(scale as u32),
                sheet.height().checked_mul(scale as u32),
            );
            if let (None, _) | (_, None) = magnified {
                return Err(SystemError::invalid(format!(
                    "sprite sheet '{}' at scale {} overflows the pixel range",
                    path.display(),
                    scale
                )));
            }
            debug!(
                "FontManager: '{}' has {} sprite glyph(s)",
                path.display(),
                sheet.len()
            );
            Ok(FontData::SpriteSheet(sheet))
        })
    }

    /// Loads a TrueType/OpenType font to be rendered `height` pixels tall.
    pub fn load_true_type_font(&self, path: impl AsRef<Path>, height: i32) -> Result<Font> {
        if height <= 0 {
            return Err(SystemError::invalid(format!(
                "font height must be positive, got {}",
                height
            )));
        }
        let kind = FontKind::TrueType {
            height: height as u32,
        };
        self.load(path.as_ref(), kind, |path| {
            let bytes = std::fs::read(path).map_err(|e| SystemError::decode(path, e))?;
            let metrics = {
                let face = Face::parse(&bytes, 0).map_err(|e| SystemError::decode(path, e))?;
                FontMetrics {
                    units_per_em: face.units_per_em(),
                    ascent: face.ascender(),
                    descent: face.descender(),
                    line_gap: face.line_gap(),
                    glyph_count: face.number_of_glyphs(),
                }
            };
            Ok(FontData::TrueType { bytes, metrics })
        })
    }

    fn load(
        &self,
        path: &Path,
        kind: FontKind,
        decode: impl FnOnce(&Path) -> Result<FontData>,
    ) -> Result<Font> {
        if !self.lifetime.is_alive() {
            return Err(SystemError::Disposed);
        }
        let key = (path.to_path_buf(), kind);
        if let Some(font) = self.fonts.borrow().get(&key) {
            debug!("FontManager: cache hit for '{}' {:?}", path.display(), kind);
            return Ok(font.clone());
        }

        let data = decode(path)?;
        let token = HandleToken::new(&self.lifetime, HandleKind::Font);
        let font = Font::new(key.0.clone(), kind, data, token);
        info!("FontManager: loaded '{}' as {:?}", path.display(), kind);
        self.fonts.borrow_mut().insert(key, font.clone());
        Ok(font)
    }
}

impl std::fmt::Debug for FontManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontManager")
            .field("fonts", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "displaykit-font-{}-{}",
            std::process::id(),
            name
        ));
        std::fs::write(&path, bytes).expect("write fixture");
        path
    }

    #[test]
    fn it_should_reject_non_positive_sizes() {
        let manager = FontManager::new(Lifetime::new());
        assert!(matches!(
            manager.load_sprite_sheet_font("font.png", 0),
            Err(SystemError::InvalidArgument(_))
        ));
        assert!(matches!(
            manager.load_true_type_font("font.ttf", -3),
            Err(SystemError::InvalidArgument(_))
        ));
        assert!(manager.is_empty());
    }

    #[test]
    fn it_should_report_decode_failures_for_bad_files() {
        let manager = FontManager::new(Lifetime::new());
        let garbage = temp_file("garbage.ttf", b"definitely not a font");
        assert!(matches!(
            manager.load_true_type_font(&garbage, 12),
            Err(SystemError::DecodeFailed { .. })
        ));
        assert!(matches!(
            manager.load_sprite_sheet_font(&garbage, 1),
            Err(SystemError::DecodeFailed { .. })
        ));
        assert!(matches!(
            manager.load_true_type_font("/nonexistent/font.ttf", 12),
            Err(SystemError::DecodeFailed { .. })
        ));
        let _ = std::fs::remove_file(garbage);
    }

    fn sprite_sheet_png(name: &str) -> Result<PathBuf> {
        // 3x4: separator column, one ink column, separator column.
        let sep = [255u8, 0, 255, 255];
        let ink = [255u8, 255, 255, 255];
        let data: Vec<u8> = (0..4).flat_map(|_| [sep, ink, sep].concat()).collect();
        let mut bytes = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut bytes, 3, 4);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder
                .write_header()
                .map_err(|e| SystemError::invalid(e.to_string()))?;
            writer
                .write_image_data(&data)
                .map_err(|e| SystemError::invalid(e.to_string()))?;
            writer
                .finish()
                .map_err(|e| SystemError::invalid(e.to_string()))?;
        }
        Ok(temp_file(name, &bytes))
    }

    #[test]
    fn it_should_reject_sprite_scales_that_overflow_the_pixel_range() -> Result<()> {
        let path = sprite_sheet_png("huge-scale.png")?;
        let manager = FontManager::new(Lifetime::new());
        assert!(matches!(
            manager.load_sprite_sheet_font(&path, i32::MAX),
            Err(SystemError::InvalidArgument(_))
        ));
        assert!(manager.is_empty());

        let big = manager.load_sprite_sheet_font(&path, 1_000_000)?;
        assert_eq!(big.line_height()?, 4_000_000);
        assert_eq!(big.advance(' ')?, Some(1_000_000));
        let _ = std::fs::remove_file(path);
        Ok(())
    }

    #[test]
    fn it_should_refuse_to_load_after_disposal() {
        let lifetime = Lifetime::new();
        let manager = FontManager::new(Rc::clone(&lifetime));
        lifetime.invalidate();
        assert!(matches!(
            manager.load_true_type_font("font.ttf", 12),
            Err(SystemError::Disposed)
        ));
    }

    #[test]
    fn it_should_read_metrics_from_an_installed_true_type_font() -> Result<()> {
        let candidate = Path::new("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf");
        if !candidate.exists() {
            return Ok(());
        }
        let manager = FontManager::new(Lifetime::new());
        let font = manager.load_true_type_font(candidate, 16)?;
        let metrics = font.metrics()?.expect("truetype metrics");
        assert!(metrics.units_per_em > 0);
        assert!(metrics.ascent > 0);
        assert!(font.has_glyph('A')?);
        assert!(font.advance('A')?.is_some());
        assert!(font.line_height()? >= 16);

        let again = manager.load_true_type_font(candidate, 16)?;
        assert!(font.same_font(&again));
        assert_eq!(manager.len(), 1);
        Ok(())
    }
}
