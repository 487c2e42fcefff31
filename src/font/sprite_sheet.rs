// src/font/sprite_sheet.rs
//! Bitmap fonts cut from a single image.
//!
//! The top-left pixel gives the separator color. Columns made only of that
//! color split the image into glyph cells, which are assigned consecutive
//! code points starting at `' '`.

use crate::color::Rgba;
use crate::error::Result;
use crate::surface::Surface;

/// Location of one glyph inside the source image, in unscaled pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteGlyph {
    pub ch: char,
    pub x: u32,
    pub width: u32,
}

#[derive(Debug)]
pub(crate) struct SpriteSheet {
    height: u32,
    glyphs: Vec<SpriteGlyph>,
}

const FIRST_CHAR: u32 = ' ' as u32;

impl SpriteSheet {
    /// Splits `image` into glyph cells. Returns `None` when no cell is found.
    pub(crate) fn from_surface(image: &Surface) -> Result<Option<Self>> {
        let width = image.width()?;
        let height = image.height()?;
        let separator = image.pixel(0, 0)?;

        let mut is_separator = Vec::with_capacity(width as usize);
        for x in 0..width {
            is_separator.push(column_matches(image, x, height, separator)?);
        }

        let mut glyphs = Vec::new();
        let mut x = 0;
        while x < width {
            if is_separator[x as usize] {
                x += 1;
                continue;
            }
            let start = x;
            while x < width && !is_separator[x as usize] {
                x += 1;
            }
            let Some(ch) = char::from_u32(FIRST_CHAR + glyphs.len() as u32) else {
                break;
            };
            glyphs.push(SpriteGlyph {
                ch,
                x: start,
                width: x - start,
            });
        }

        if glyphs.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self { height, glyphs }))
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub(crate) fn glyph(&self, ch: char) -> Option<SpriteGlyph> {
        let index = (ch as u32).checked_sub(FIRST_CHAR)?;
        self.glyphs.get(index as usize).copied()
    }
}

fn column_matches(image: &Surface, x: u32, height: u32, separator: Rgba) -> Result<bool> {
    for y in 0..height {
        if image.pixel(x, y)? != separator {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifetime::{HandleKind, HandleToken, Lifetime};
    use crate::surface::PixelFormat;

    const SEP: Rgba = Rgba::opaque(255, 0, 255);

    /// Builds a sheet where `cells` gives the width of each glyph, with one
    /// separator column before, between and after them.
    fn sheet(cells: &[u32]) -> Result<Surface> {
        let width = 1 + cells.iter().map(|w| w + 1).sum::<u32>();
        let lifetime = Lifetime::new();
        let token = HandleToken::new(&lifetime, HandleKind::Font);
        let mut image = Surface::new(width, 3, PixelFormat::Rgba8, None, token)?;
        image.fill(SEP)?;
        let mut x = 1;
        for &w in cells {
            for dx in 0..w {
                image.put_pixel(x + dx, 1, Rgba::WHITE)?;
            }
            x += w + 1;
        }
        Ok(image)
    }

    #[test]
    fn it_should_cut_cells_between_separator_columns() -> Result<()> {
        let image = sheet(&[2, 3, 1])?;
        let parsed = SpriteSheet::from_surface(&image)?.expect("cells");
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed.height(), 3);
        assert_eq!(
            parsed.glyph(' '),
            Some(SpriteGlyph {
                ch: ' ',
                x: 1,
                width: 2
            })
        );
        assert_eq!(parsed.glyph('!').map(|g| (g.x, g.width)), Some((4, 3)));
        assert_eq!(parsed.glyph('"').map(|g| g.width), Some(1));
        assert_eq!(parsed.glyph('#'), None);
        assert_eq!(parsed.glyph('\n'), None);
        Ok(())
    }

    #[test]
    fn it_should_find_nothing_in_a_separator_only_image() -> Result<()> {
        let image = sheet(&[])?;
        assert!(SpriteSheet::from_surface(&image)?.is_none());
        Ok(())
    }
}
