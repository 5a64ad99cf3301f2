//! Composite stage: map raster + header title + footer legend + watermark

use anyhow::{Context, Result};
use resvg::tiny_skia::{
    Color, FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, Transform,
};
use tracing::warn;

use super::font::{FontRenderer, TextAlign};
use crate::constants::layout::*;
use crate::constants::palette;
use crate::constants::text::WATERMARK;
use crate::level::LevelColor;

/// Canvas geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub map_width: u32,
    pub map_height: u32,
    pub header_height: u32,
    pub footer_height: u32,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            map_width: MAP_WIDTH,
            map_height: MAP_HEIGHT,
            header_height: HEADER_HEIGHT,
            footer_height: FOOTER_HEIGHT,
        }
    }
}

impl Layout {
    pub fn with_map_size(map_width: u32, map_height: u32) -> Self {
        Self {
            map_width,
            map_height,
            ..Self::default()
        }
    }

    pub fn canvas_width(&self) -> u32 {
        self.map_width
    }

    pub fn canvas_height(&self) -> u32 {
        self.header_height + self.map_height + self.footer_height
    }

    /// Center of legend swatch `index` (0-based, left to right)
    pub fn legend_center(&self, index: usize) -> (f32, f32) {
        (
            LEGEND_START_X + index as f32 * LEGEND_SPACING,
            self.canvas_height() as f32 - LEGEND_OFFSET_FROM_BOTTOM,
        )
    }
}

fn paint(rgb: u32) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8, 255);
    paint.anti_alias = true;
    paint
}

fn fill_band(canvas: &mut Pixmap, y: u32, height: u32, rgb: u32) -> Result<()> {
    let rect = Rect::from_xywh(0.0, y as f32, canvas.width() as f32, height as f32)
        .ok_or_else(|| anyhow::anyhow!("Invalid band rectangle at y={} height={}", y, height))?;
    canvas.fill_rect(rect, &paint(rgb), Transform::identity(), None);
    Ok(())
}

/// Composite the final canvas. Without a font the text is skipped.
pub fn compose(map: &Pixmap, title: &str, font: Option<&FontRenderer>, layout: &Layout) -> Result<Pixmap> {
    let width = layout.canvas_width();
    let height = layout.canvas_height();
    let mut canvas = Pixmap::new(width, height)
        .ok_or_else(|| anyhow::anyhow!("Invalid canvas size {}x{}", width, height))?;

    let bg = palette::BACKGROUND;
    canvas.fill(Color::from_rgba8((bg >> 16) as u8, (bg >> 8) as u8, bg as u8, 255));

    // Map pane, scaled if the raster came back at a different size
    let transform = Transform::from_row(
        layout.map_width as f32 / map.width() as f32,
        0.0,
        0.0,
        layout.map_height as f32 / map.height() as f32,
        0.0,
        layout.header_height as f32,
    );
    canvas.draw_pixmap(0, 0, map.as_ref(), &PixmapPaint::default(), transform, None);

    fill_band(&mut canvas, 0, layout.header_height, bg).context("Failed to paint header")?;
    fill_band(&mut canvas, height - layout.footer_height, layout.footer_height, bg)
        .context("Failed to paint footer")?;

    if font.is_none() {
        warn!("No font available, snapshot text will be omitted");
    }

    if let Some(font) = font {
        font.draw(&mut canvas, title, TITLE_SIZE, palette::TEXT, width as f32 / 2.0, TITLE_BASELINE, TextAlign::Center);
    }

    draw_legend(&mut canvas, font, layout)?;

    if let Some(font) = font {
        font.draw(
            &mut canvas,
            WATERMARK,
            WATERMARK_SIZE,
            palette::MUTED,
            width as f32 - WATERMARK_MARGIN_RIGHT,
            height as f32 - WATERMARK_MARGIN_BOTTOM,
            TextAlign::Right,
        );
    }

    Ok(canvas)
}

fn draw_legend(canvas: &mut Pixmap, font: Option<&FontRenderer>, layout: &Layout) -> Result<()> {
    let stroke = Stroke {
        width: 1.0,
        ..Stroke::default()
    };

    for (index, color) in LevelColor::LEGEND.into_iter().enumerate() {
        let (x, y) = layout.legend_center(index);
        let circle = PathBuilder::from_circle(x, y, LEGEND_SWATCH_RADIUS)
            .ok_or_else(|| anyhow::anyhow!("Invalid legend swatch at ({}, {})", x, y))?;

        canvas.fill_path(&circle, &paint(color.rgb()), FillRule::Winding, Transform::identity(), None);
        canvas.stroke_path(&circle, &paint(palette::MUTED), &stroke, Transform::identity(), None);

        if let Some(font) = font {
            font.draw(
                canvas,
                color.label(),
                LEGEND_LABEL_SIZE,
                palette::TEXT,
                x + LEGEND_LABEL_GAP,
                y + LEGEND_LABEL_BASELINE_SHIFT,
                TextAlign::Left,
            );
        }
    }
    Ok(())
}

/// Encode as 8-bit RGBA PNG
pub fn encode_png(canvas: &Pixmap) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(canvas.pixels().len() * 4);
    for pixel in canvas.pixels() {
        let c = pixel.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }

    let mut buffer = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buffer, canvas.width(), canvas.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().context("Failed to write PNG header")?;
        writer.write_image_data(&data).context("Failed to encode PNG data")?;
        writer.finish().context("Failed to finish PNG stream")?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgb: u32) -> Pixmap {
        let mut pixmap = Pixmap::new(width, height).unwrap();
        pixmap.fill(Color::from_rgba8((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8, 255));
        pixmap
    }

    fn rgb_at(canvas: &Pixmap, x: u32, y: u32) -> u32 {
        let c = canvas.pixel(x, y).unwrap().demultiply();
        (c.red() as u32) << 16 | (c.green() as u32) << 8 | c.blue() as u32
    }

    #[test]
    fn test_canvas_dimensions() {
        let layout = Layout::default();
        let canvas = compose(&solid(800, 960, 0x00ff00), "制沪等级 0", None, &layout).unwrap();
        assert_eq!(canvas.width(), 800);
        assert_eq!(canvas.height(), 70 + 960 + 50);
    }

    #[test]
    fn test_bands_and_map_placement() {
        let layout = Layout::default();
        let canvas = compose(&solid(800, 960, 0x00ff00), "", None, &layout).unwrap();

        assert_eq!(rgb_at(&canvas, 400, 10), palette::BACKGROUND);
        assert_eq!(rgb_at(&canvas, 400, 69), palette::BACKGROUND);
        assert_eq!(rgb_at(&canvas, 400, 70), 0x00ff00);
        assert_eq!(rgb_at(&canvas, 400, 70 + 959), 0x00ff00);
        assert_eq!(rgb_at(&canvas, 790, 70 + 960 + 5), palette::BACKGROUND);
    }

    #[test]
    fn test_map_is_scaled_into_pane() {
        let layout = Layout::with_map_size(200, 100);
        let canvas = compose(&solid(20, 10, 0xff0000), "", None, &layout).unwrap();
        assert_eq!(rgb_at(&canvas, 199, 70 + 99), 0xff0000);
        assert_eq!(rgb_at(&canvas, 0, 70), 0xff0000);
    }

    #[test]
    fn test_legend_swatches_in_fixed_order() {
        let layout = Layout::default();
        let canvas = compose(&solid(800, 960, 0x000000), "", None, &layout).unwrap();

        for (index, color) in LevelColor::LEGEND.into_iter().enumerate() {
            let (x, y) = layout.legend_center(index);
            assert_eq!(rgb_at(&canvas, x as u32, y as u32), color.rgb(), "swatch {index}");
        }
        assert_eq!(layout.legend_center(0), (50.0, 1052.0));
        assert_eq!(layout.legend_center(5), (650.0, 1052.0));
    }

    #[test]
    fn test_swatch_border_is_muted() {
        let layout = Layout::default();
        let canvas = compose(&solid(800, 960, 0x000000), "", None, &layout).unwrap();
        // White swatch: its outline at the top edge is darker than the fill
        let (x, y) = layout.legend_center(5);
        let edge = canvas.pixel(x as u32, (y - LEGEND_SWATCH_RADIUS) as u32).unwrap().demultiply();
        assert!(edge.red() < 0xf0);
    }

    /// Columns (min, max) of non-background pixels inside a rectangle
    fn ink_span(canvas: &Pixmap, xs: std::ops::Range<u32>, ys: std::ops::Range<u32>) -> Option<(u32, u32)> {
        let mut span: Option<(u32, u32)> = None;
        for y in ys {
            for x in xs.clone() {
                if rgb_at(canvas, x, y) != palette::BACKGROUND {
                    span = Some(match span {
                        Some((lo, hi)) => (lo.min(x), hi.max(x)),
                        None => (x, x),
                    });
                }
            }
        }
        span
    }

    #[test]
    fn test_text_stages_with_font() {
        let Ok(font) = FontRenderer::from_system_font() else {
            eprintln!("skipping: no system font on this host");
            return;
        };
        let layout = Layout::default();
        let (width, height) = (layout.canvas_width(), layout.canvas_height());
        let title = "Ann 8";
        let canvas = compose(&solid(800, 960, 0x00ff00), title, Some(&font), &layout).unwrap();

        // Title: centered on width / 2 inside the header band
        let (lo, hi) = ink_span(&canvas, 0..width, 0..layout.header_height).expect("title pixels");
        let center = (lo + hi) as f32 / 2.0;
        assert!((center - width as f32 / 2.0).abs() <= 12.0, "title centered, got {lo}..{hi}");
        assert!(hi - lo <= font.measure(title, TITLE_SIZE) as u32 + 4);

        // Watermark: right-aligned against the bottom-right margin
        let watermark_width = font.measure(WATERMARK, WATERMARK_SIZE).ceil() as u32;
        let right = width - WATERMARK_MARGIN_RIGHT as u32;
        let (_, hi) = ink_span(&canvas, right - watermark_width..width, height - 16..height)
            .expect("watermark pixels");
        assert!(hi <= right + 2, "watermark stays inside the margin, got {hi}");
        if font.covers(WATERMARK) {
            assert!(hi + 8 >= right, "watermark ends near the margin, got {hi}");
        }

        // Legend labels: to the right of each swatch
        for (index, color) in LevelColor::LEGEND.into_iter().enumerate() {
            if !font.covers(color.label()) {
                eprintln!("skipping legend label check: font has no glyphs for {}", color.label());
                break;
            }
            let (x, y) = layout.legend_center(index);
            let label_x = (x + LEGEND_LABEL_GAP) as u32;
            let span = ink_span(&canvas, label_x - 2..label_x + 60, y as u32 - 12..y as u32 + 8);
            assert!(span.is_some(), "label pixels for {color:?}");
        }
    }

    #[test]
    fn test_no_font_leaves_header_blank() {
        let layout = Layout::default();
        let canvas = compose(&solid(800, 960, 0x00ff00), "Ann 8", None, &layout).unwrap();
        assert_eq!(ink_span(&canvas, 0..800, 0..layout.header_height), None);
    }

    #[test]
    fn test_encode_png_signature_and_size() {
        let png = encode_png(&solid(4, 3, 0x123456)).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let decoder = png::Decoder::new(std::io::Cursor::new(png));
        let reader = decoder.read_info().unwrap();
        assert_eq!(reader.info().width, 4);
        assert_eq!(reader.info().height, 3);
    }
}
