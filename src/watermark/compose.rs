//! Compositing: cover-scaled canvas plus the fitted, shadowed watermark text

use image::{DynamicImage, Rgb, RgbImage};
use tracing::{debug, info};

use super::font::{FontRenderer, blend};
use super::geometry::fill_canvas;
use crate::constants::layout::{
    FALLBACK_MARGIN, FONT_SIZE_DIVISOR, MARGIN_RATIO, MIN_FONT_SIZE, MIN_START_FONT_SIZE, MIN_TEXT_X,
    SHADOW_DIVISOR, SHRINK_FACTOR,
};
use crate::platform::ScreenSize;

const SHADOW: Rgb<u8> = Rgb([0, 0, 0]);
const TEXT: Rgb<u8> = Rgb([255, 255, 255]);

/// Final font size and text origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPlacement {
    pub size: u32,
    pub x: i64,
    pub y: i64,
}

impl TextPlacement {
    pub fn shadow_offset(&self) -> i64 {
        i64::from((self.size / SHADOW_DIVISOR).max(1))
    }
}

/// `max(12, height / 50)`
pub fn start_font_size(canvas_height: u32) -> u32 {
    (canvas_height / FONT_SIZE_DIVISOR).max(MIN_START_FONT_SIZE)
}

/// 5% of the canvas width, or a fixed margin for a zero width
pub fn margin_for(canvas_width: u32) -> i64 {
    if canvas_width == 0 {
        return i64::from(FALLBACK_MARGIN);
    }
    (f64::from(canvas_width) * MARGIN_RATIO) as i64
}

/// One shrink step: 90% of `size`, floored, never below the minimum
pub fn shrink(size: u32) -> u32 {
    ((f64::from(size) * SHRINK_FACTOR) as u32).max(MIN_FONT_SIZE)
}

/// Pick the font size and origin for right-aligned text.
///
/// Shrinks from `start_size` while the text would start left of `MIN_TEXT_X`,
/// stopping at `MIN_FONT_SIZE`; whatever still overflows is clamped.
/// `text_width` maps a font size to the rendered width.
pub fn fit_text(canvas_width: u32, margin: i64, start_size: u32, text_width: impl Fn(u32) -> u32) -> TextPlacement {
    let x_for = |size: u32| i64::from(canvas_width) - i64::from(text_width(size)) - margin;

    let mut size = start_size;
    let mut x = x_for(size);
    while x < MIN_TEXT_X && size > MIN_FONT_SIZE {
        size = shrink(size);
        x = x_for(size);
    }

    TextPlacement {
        size,
        x: x.max(MIN_TEXT_X),
        y: margin,
    }
}

/// Scale `source` to cover the screen (or keep its own size when the screen
/// is unknown) and stamp `text` into the top-right corner.
pub fn compose(source: &DynamicImage, text: &str, screen: Option<ScreenSize>, font: &FontRenderer) -> RgbImage {
    let canvas_size = screen
        .or_else(|| ScreenSize::new(source.width(), source.height()))
        .unwrap_or(ScreenSize { width: 1, height: 1 });

    let mut canvas = fill_canvas(source, canvas_size);
    debug!(width = canvas_size.width, height = canvas_size.height, "Filled canvas");

    let placement = fit_text(
        canvas_size.width,
        margin_for(canvas_size.width),
        start_font_size(canvas_size.height),
        |size| font.measure(text, size).0,
    );

    let rendered = font.render_text(text, placement.size);
    let offset = placement.shadow_offset();

    blend(&mut canvas, &rendered, placement.x + offset, placement.y + offset, SHADOW);
    blend(&mut canvas, &rendered, placement.x, placement.y, TEXT);
    blend(&mut canvas, &rendered, placement.x, placement.y, TEXT);

    info!(
        size = placement.size,
        x = placement.x,
        y = placement.y,
        font = font.source(),
        "Drew watermark text"
    );
    canvas
}
