//! TrueType text rendering onto the snapshot canvas using fontdue (pure Rust)

use anyhow::{Context, Result};
use fontdue::{Font, FontSettings};
use resvg::tiny_skia::{Pixmap, PremultipliedColorU8};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants::text::TITLE_PREFIX;

/// Horizontal anchor of a text run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// Compile-time font path (packaging builds set FONT_PATH)
const FONT_PATH: Option<&str> = option_env!("FONT_PATH");

/// CJK-capable fonts first so the title and legend labels render
const SYSTEM_FONT_PATHS: [&str; 12] = [
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Bold.ttc",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/usr/share/fonts/wenquanyi/wqy-microhei/wqy-microhei.ttc",
    "/System/Library/Fonts/PingFang.ttc",
    "C:\\Windows\\Fonts\\msyh.ttc",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
];

/// Existing font files: FONT_PATH first, then the well-known locations
pub(crate) fn system_font_paths() -> impl Iterator<Item = PathBuf> {
    FONT_PATH
        .into_iter()
        .chain(SYSTEM_FONT_PATHS)
        .map(PathBuf::from)
        .filter(|path| path.exists())
}

/// Font renderer using fontdue
#[derive(Debug)]
pub struct FontRenderer {
    font: Font,
}

impl FontRenderer {
    /// Load a TrueType/OpenType font from a file path
    pub fn from_path(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "Attempting to load font from path");

        let font_data = fs::read(path)
            .with_context(|| format!("Failed to read font file: {}", path.display()))?;

        let font = Font::from_bytes(font_data, FontSettings::default())
            .map_err(|e| anyhow::anyhow!("Failed to parse font: {}", e))?;

        info!(path = %path.display(), "Successfully loaded font from path");
        Ok(Self { font })
    }

    /// Load the preferred font, falling back to a system font with CJK coverage
    pub fn load(preferred: Option<&Path>) -> Result<Self> {
        if let Some(path) = preferred {
            match Self::from_path(path) {
                Ok(renderer) => {
                    renderer.warn_if_no_cjk(path);
                    return Ok(renderer);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to load configured font, trying system fonts"),
            }
        }
        Self::from_system_font()
    }

    /// Try to find and load a common system font, preferring one that can
    /// draw the Chinese title and legend labels
    pub fn from_system_font() -> Result<Self> {
        let mut fallback: Option<(PathBuf, Self)> = None;

        for path in system_font_paths() {
            let Ok(renderer) = Self::from_path(&path) else {
                continue;
            };
            if renderer.covers(TITLE_PREFIX) {
                return Ok(renderer);
            }
            if fallback.is_none() {
                fallback = Some((path, renderer));
            }
        }

        match fallback {
            Some((path, renderer)) => {
                renderer.warn_if_no_cjk(&path);
                Ok(renderer)
            }
            None => Err(anyhow::anyhow!(
                "Could not find any system fonts. Tried FONT_PATH ({:?}) and hardcoded paths: {:?}",
                FONT_PATH,
                SYSTEM_FONT_PATHS
            )),
        }
    }

    /// Whether every non-whitespace char of `text` has a glyph
    pub fn covers(&self, text: &str) -> bool {
        text.chars()
            .filter(|ch| !ch.is_whitespace())
            .all(|ch| self.font.lookup_glyph_index(ch) != 0)
    }

    fn warn_if_no_cjk(&self, path: &Path) {
        if !self.covers(TITLE_PREFIX) {
            warn!(path = %path.display(), "Font has no Chinese glyphs, title and legend labels will render as missing glyphs");
        }
    }

    /// Advance width of `text` at `size` pixels
    pub fn measure(&self, text: &str, size: f32) -> f32 {
        text.chars()
            .map(|ch| self.font.metrics(ch, size).advance_width)
            .sum()
    }

    /// Draw `text` with its baseline at `baseline`, anchored at `x` per `align`.
    /// `rgb` is 0xRRGGBB; glyph coverage is alpha-blended over the canvas.
    pub fn draw(
        &self,
        canvas: &mut Pixmap,
        text: &str,
        size: f32,
        rgb: u32,
        x: f32,
        baseline: f32,
        align: TextAlign,
    ) {
        let mut pen_x = match align {
            TextAlign::Left => x,
            TextAlign::Center => x - self.measure(text, size) / 2.0,
            TextAlign::Right => x - self.measure(text, size),
        };

        let width = canvas.width() as i32;
        let height = canvas.height() as i32;

        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, size);

            // Bitmap top-left relative to the baseline
            let left = pen_x.round() as i32 + metrics.xmin;
            let top = baseline.round() as i32 - (metrics.height as i32 + metrics.ymin);

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let px = left + gx as i32;
                    let py = top + gy as i32;

                    if px < 0 || py < 0 || px >= width || py >= height {
                        continue;
                    }

                    let coverage = bitmap[gy * metrics.width + gx] as f32 / 255.0;
                    if coverage > 0.0 {
                        let idx = py as usize * width as usize + px as usize;
                        let pixels = canvas.pixels_mut();
                        pixels[idx] = blend(pixels[idx], rgb, coverage);
                    }
                }
            }

            pen_x += metrics.advance_width;
        }
    }
}

/// Source-over blend of a solid color with `coverage` onto a premultiplied pixel
pub(crate) fn blend(dst: PremultipliedColorU8, rgb: u32, coverage: f32) -> PremultipliedColorU8 {
    let inv = 1.0 - coverage;
    let alpha = (255.0 * coverage + dst.alpha() as f32 * inv).round().min(255.0) as u8;
    let channel = |src: u32, dst: u8| -> u8 {
        let src = (src & 0xFF) as f32 * coverage;
        ((src + dst as f32 * inv).round() as u8).min(alpha)
    };

    PremultipliedColorU8::from_rgba(
        channel(rgb >> 16, dst.red()),
        channel(rgb >> 8, dst.green()),
        channel(rgb, dst.blue()),
        alpha,
    )
    .unwrap_or(dst)
}
