//! Text rasterization with fontdue, falling back to a built-in bitmap font

use anyhow::{Context, Result};
use fontdue::{Font, FontSettings};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use super::bitmap_font;
use crate::config::Settings;
use crate::constants::fonts::SYSTEM_FONT_PATHS;

/// Multi-line text as a coverage mask (0 = transparent, 255 = opaque)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedText {
    pub width: usize,
    pub height: usize,
    pub coverage: Vec<u8>,
}

impl RenderedText {
    fn blank(width: usize, height: usize) -> Self {
        Self { width, height, coverage: vec![0; width * height] }
    }

    fn cover(&mut self, x: i64, y: i64, value: u8) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        self.coverage[idx] = self.coverage[idx].max(value);
    }
}

#[derive(Debug)]
enum Face {
    Outline(Box<Font>),
    Bitmap,
}

/// Vertical metrics for one pixel size, whole pixels
#[derive(Debug, Clone, Copy)]
struct LineMetrics {
    ascent: u32,
    descent: u32,
    advance: u32,
}

/// How far one line's ink reaches outside its advance and line box
#[derive(Debug, Clone, Copy, Default)]
struct InkExtent {
    left: u32,
    right: u32,
    above: u32,
    below: u32,
}

#[derive(Debug, Clone, Copy)]
struct TextLayout {
    width: u32,
    height: u32,
    /// Pen origin of every line within the mask
    left: u32,
    /// Extra rows above the first line's ascent
    above: u32,
    metrics: LineMetrics,
}

/// Font renderer for the watermark, sized per call
#[derive(Debug)]
pub struct FontRenderer {
    face: Face,
    source: String,
}

impl FontRenderer {
    /// Load a TrueType/OpenType font from a file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let font_data = fs::read(path).with_context(|| format!("Failed to read font file: {}", path.display()))?;

        let font = Font::from_bytes(font_data, FontSettings::default())
            .map_err(|e| anyhow::anyhow!("Failed to parse font {}: {}", path.display(), e))?;

        info!(path = %path.display(), "Loaded font");
        Ok(Self {
            face: Face::Outline(Box::new(font)),
            source: path.display().to_string(),
        })
    }

    /// Load a font by family (and optional style) via fontconfig
    #[cfg(unix)]
    pub fn from_font_name(font_name: &str) -> Result<Self> {
        let path = super::font_discovery::find_font_path(font_name)
            .with_context(|| format!("Failed to resolve font '{font_name}'"))?;
        info!(font_name, resolved_path = %path.display(), "Resolved font name via fontconfig");
        Self::from_path(&path)
    }

    /// First loadable file among well-known system fonts
    pub fn from_system_font() -> Result<Self> {
        for path in SYSTEM_FONT_PATHS {
            if let Ok(renderer) = Self::from_path(Path::new(path)) {
                return Ok(renderer);
            }
        }
        anyhow::bail!("No system font found, tried {:?}", SYSTEM_FONT_PATHS)
    }

    /// Built-in bitmap font; always available
    pub fn builtin() -> Self {
        Self { face: Face::Bitmap, source: "builtin".to_string() }
    }

    /// Best available font for `settings`: configured file, configured family,
    /// system fonts, then the built-in bitmap font.
    pub fn load(settings: &Settings) -> Self {
        if let Some(path) = &settings.font_path {
            match Self::from_path(path) {
                Ok(renderer) => return renderer,
                Err(e) => warn!(path = %path.display(), error = %format!("{e:#}"), "Configured font file unusable"),
            }
        }

        #[cfg(unix)]
        match Self::from_font_name(&settings.font_family) {
            Ok(renderer) => return renderer,
            Err(e) => warn!(font = %settings.font_family, error = %format!("{e:#}"), "Font family unavailable"),
        }

        match Self::from_system_font() {
            Ok(renderer) => renderer,
            Err(e) => {
                warn!(error = %e, "Falling back to built-in bitmap font");
                Self::builtin()
            }
        }
    }

    /// Where the font came from: a file path or `builtin`
    pub fn source(&self) -> &str {
        &self.source
    }

    fn line_metrics(&self, size: u32) -> LineMetrics {
        match &self.face {
            Face::Outline(font) => {
                let px = size as f32;
                match font.horizontal_line_metrics(px) {
                    Some(m) => LineMetrics {
                        ascent: m.ascent.ceil().max(0.0) as u32,
                        descent: (-m.descent).ceil().max(0.0) as u32,
                        advance: m.new_line_size.ceil().max(1.0) as u32,
                    },
                    None => LineMetrics {
                        ascent: size,
                        descent: size.div_ceil(4),
                        advance: size + size.div_ceil(4),
                    },
                }
            }
            Face::Bitmap => {
                let k = bitmap_font::scale_for(size);
                LineMetrics {
                    ascent: (bitmap_font::GLYPH_ROWS - 1) * k,
                    descent: k,
                    advance: bitmap_font::LINE_ADVANCE * k,
                }
            }
        }
    }

    /// Ink extents of one line around its pen origin and layout box
    fn line_extent(&self, line: &str, size: u32, metrics: LineMetrics) -> InkExtent {
        match &self.face {
            Face::Outline(font) => {
                let px = size as f32;
                let mut pen = 0.0f32;
                let (mut min_x, mut max_x, mut max_top, mut max_drop) = (0i64, 0i64, 0i64, 0i64);

                for ch in line.chars() {
                    let glyph = font.metrics(ch, px);
                    if glyph.width > 0 && glyph.height > 0 {
                        // Same origin rounding as render_outline_line
                        let ink_left = pen as i64 + i64::from(glyph.xmin);
                        min_x = min_x.min(ink_left);
                        max_x = max_x.max(ink_left + glyph.width as i64);
                        max_top = max_top.max(glyph.height as i64 + i64::from(glyph.ymin));
                        max_drop = max_drop.max(-i64::from(glyph.ymin));
                    }
                    pen += glyph.advance_width;
                }

                InkExtent {
                    left: (-min_x).max(0) as u32,
                    right: (pen.ceil() as i64).max(max_x).max(0) as u32,
                    above: (max_top - i64::from(metrics.ascent)).max(0) as u32,
                    below: (max_drop - i64::from(metrics.descent)).max(0) as u32,
                }
            }
            Face::Bitmap => InkExtent {
                right: line.chars().count() as u32 * bitmap_font::ADVANCE * bitmap_font::scale_for(size),
                ..InkExtent::default()
            },
        }
    }

    /// Mask size and line origins for `text`. The box covers every glyph's
    /// ink, including overhang past the advance, ascent or descent.
    fn layout(&self, text: &str, size: u32) -> TextLayout {
        let metrics = self.line_metrics(size);
        let extents: Vec<InkExtent> = text.split('\n').map(|line| self.line_extent(line, size, metrics)).collect();

        let left = extents.iter().map(|e| e.left).max().unwrap_or(0);
        let right = extents.iter().map(|e| e.right).max().unwrap_or(0);
        let above = extents.first().map_or(0, |e| e.above);
        let below = extents.last().map_or(0, |e| e.below);
        let lines = extents.len().max(1) as u32;

        TextLayout {
            width: left + right,
            height: above + (lines - 1) * metrics.advance + metrics.ascent + metrics.descent + below,
            left,
            above,
            metrics,
        }
    }

    /// Bounding box `(width, height)` of `text` laid out line by line
    pub fn measure(&self, text: &str, size: u32) -> (u32, u32) {
        let layout = self.layout(text, size);
        (layout.width, layout.height)
    }

    /// Rasterize `text` into a coverage mask of exactly `measure(text, size)`
    pub fn render_text(&self, text: &str, size: u32) -> RenderedText {
        let layout = self.layout(text, size);
        let mut out = RenderedText::blank(layout.width as usize, layout.height as usize);
        if layout.width == 0 || layout.height == 0 {
            return out;
        }

        let metrics = layout.metrics;
        for (i, line) in text.split('\n').enumerate() {
            let baseline = i64::from(layout.above + i as u32 * metrics.advance + metrics.ascent);
            match &self.face {
                Face::Outline(font) => {
                    render_outline_line(&mut out, font, line, size as f32, i64::from(layout.left), baseline)
                }
                Face::Bitmap => render_bitmap_line(&mut out, line, size, baseline),
            }
        }
        out
    }
}

fn render_outline_line(out: &mut RenderedText, font: &Font, line: &str, px: f32, origin_x: i64, baseline: i64) {
    let mut pen = 0.0f32;
    for ch in line.chars() {
        let (metrics, bitmap) = font.rasterize(ch, px);

        let left = origin_x + pen as i64 + i64::from(metrics.xmin);
        let top = baseline - (metrics.height as i64 + i64::from(metrics.ymin));

        for gy in 0..metrics.height {
            for gx in 0..metrics.width {
                let value = bitmap[gy * metrics.width + gx];
                if value > 0 {
                    out.cover(left + gx as i64, top + gy as i64, value);
                }
            }
        }
        pen += metrics.advance_width;
    }
}

fn render_bitmap_line(out: &mut RenderedText, line: &str, size: u32, baseline: i64) {
    let k = bitmap_font::scale_for(size);
    // Row 6 is the baseline row of the cell
    let top = baseline - i64::from((bitmap_font::GLYPH_ROWS - 1) * k);

    for (n, ch) in line.chars().enumerate() {
        let left = i64::from(n as u32 * bitmap_font::ADVANCE * k);
        for col in 0..bitmap_font::GLYPH_COLUMNS {
            for row in 0..bitmap_font::GLYPH_ROWS {
                if !bitmap_font::is_set(ch, col, row) {
                    continue;
                }
                for dy in 0..k {
                    for dx in 0..k {
                        out.cover(left + i64::from(col * k + dx), top + i64::from(row * k + dy), 255);
                    }
                }
            }
        }
    }
}

/// Alpha-blend `color` onto `canvas` through `text` with its top-left at (`x`, `y`).
/// Parts outside the canvas are clipped.
pub fn blend(canvas: &mut RgbImage, text: &RenderedText, x: i64, y: i64, color: Rgb<u8>) {
    let (cw, ch) = (i64::from(canvas.width()), i64::from(canvas.height()));

    for ty in 0..text.height {
        let py = y + ty as i64;
        if py < 0 || py >= ch {
            continue;
        }
        for tx in 0..text.width {
            let px = x + tx as i64;
            if px < 0 || px >= cw {
                continue;
            }
            let alpha = u32::from(text.coverage[ty * text.width + tx]);
            if alpha == 0 {
                continue;
            }
            let pixel = canvas.get_pixel_mut(px as u32, py as u32);
            for (dst, src) in pixel.0.iter_mut().zip(color.0) {
                *dst = ((u32::from(src) * alpha + u32::from(*dst) * (255 - alpha) + 127) / 255) as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_measure_is_deterministic() {
        let font = FontRenderer::builtin();

        // size 10 -> scale 1: 6px per char, 7 + 1 rows per line, 10px line advance
        assert_eq!(font.measure("abc", 10), (18, 8));
        assert_eq!(font.measure("abc\nde", 10), (18, 18));
        // size 21 -> scale 3
        assert_eq!(font.measure("IP: 1", 21), (90, 24));
    }

    #[test]
    fn test_measure_uses_widest_line() {
        let font = FontRenderer::builtin();
        let (w, _) = font.measure("a\n    indented line\nb", 10);
        assert_eq!(w, 17 * 6);
    }

    #[test]
    fn test_render_matches_measure() {
        let font = FontRenderer::builtin();
        let text = "Computer name: PC1\nIP: 10.0.0.1";

        let rendered = font.render_text(text, 16);

        let (w, h) = font.measure(text, 16);
        assert_eq!((rendered.width, rendered.height), (w as usize, h as usize));
        assert_eq!(rendered.coverage.len(), rendered.width * rendered.height);
        assert!(rendered.coverage.iter().any(|c| *c == 255));
    }

    #[test]
    fn test_blank_text_renders_nothing() {
        let font = FontRenderer::builtin();
        let rendered = font.render_text("   ", 10);
        assert!(rendered.coverage.iter().all(|c| *c == 0));
    }

    #[test]
    fn test_blend_full_and_clipped() {
        let mut canvas = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let text = RenderedText { width: 3, height: 1, coverage: vec![255, 128, 0] };

        blend(&mut canvas, &text, 2, 1, Rgb([255, 255, 255]));

        assert_eq!(canvas.get_pixel(2, 1), &Rgb([255, 255, 255]));
        assert_eq!(canvas.get_pixel(3, 1), &Rgb([128, 128, 128]));
        assert_eq!(canvas.get_pixel(1, 1), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_blend_twice_strengthens_partial_coverage() {
        let mut canvas = RgbImage::from_pixel(1, 1, Rgb([0, 0, 0]));
        let text = RenderedText { width: 1, height: 1, coverage: vec![128] };

        blend(&mut canvas, &text, 0, 0, Rgb([255, 255, 255]));
        let once = canvas.get_pixel(0, 0).0[0];
        blend(&mut canvas, &text, 0, 0, Rgb([255, 255, 255]));
        let twice = canvas.get_pixel(0, 0).0[0];

        assert!(twice > once);
    }

    #[test]
    fn test_outline_overhang_stays_inside_mask() {
        let Some(renderer) = SYSTEM_FONT_PATHS
            .iter()
            .find_map(|path| FontRenderer::from_path(Path::new(path)).ok())
        else {
            return;
        };
        let Face::Outline(font) = &renderer.face else {
            panic!("system font loaded as bitmap");
        };

        // Accented capitals rise above the ascent; j and f hang past their advance
        for ch in ['Å', 'É', 'j', 'f', 'W'] {
            let (_, bitmap) = font.rasterize(ch, 48.0);
            let rendered = renderer.render_text(&ch.to_string(), 48);

            let inked = |c: &&u8| **c > 0;
            assert_eq!(
                rendered.coverage.iter().filter(inked).count(),
                bitmap.iter().filter(inked).count(),
                "ink of {ch:?} was clipped"
            );
        }
    }

    #[test]
    fn test_bitmap_layout_has_no_padding() {
        let font = FontRenderer::builtin();
        let layout = font.layout("Computer name: PC1\nIP: 10.0.0.1", 24);

        assert_eq!((layout.left, layout.above), (0, 0));
    }

    #[test]
    fn test_missing_font_file_is_error() {
        assert!(FontRenderer::from_path(Path::new("/nonexistent/font.ttf")).is_err());
    }

    #[test]
    fn test_load_never_fails() {
        let settings = Settings {
            font_path: Some("/nonexistent/font.ttf".into()),
            font_family: "No Such Family Xyz".to_string(),
            ..Settings::default()
        };
        let font = FontRenderer::load(&settings);
        let (w, h) = font.measure("x", 12);
        assert!(w > 0 && h > 0);
    }
}
