//! Cover/fill placement of the source image on a screen-sized canvas

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use tracing::debug;

use crate::platform::ScreenSize;

/// How the source image lands on the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverLayout {
    pub scale: f64,
    pub resized_width: u32,
    pub resized_height: u32,
    /// Top-left of the resized image on the canvas; negative values crop
    pub offset_x: i64,
    pub offset_y: i64,
}

/// `scale = max(cw/w, ch/h)`, centered. The resized image covers the canvas
/// on both axes and overflows (is cropped) symmetrically on at most one.
pub fn cover_layout(image_width: u32, image_height: u32, canvas: ScreenSize) -> CoverLayout {
    let (w, h) = (f64::from(image_width.max(1)), f64::from(image_height.max(1)));
    let (cw, ch) = (f64::from(canvas.width), f64::from(canvas.height));

    let scale = (cw / w).max(ch / h);

    // Float error can floor the covering axis one pixel short of the canvas
    let resized_width = ((w * scale) as u32).max(canvas.width);
    let resized_height = ((h * scale) as u32).max(canvas.height);

    CoverLayout {
        scale,
        resized_width,
        resized_height,
        offset_x: (i64::from(canvas.width) - i64::from(resized_width)).div_euclid(2),
        offset_y: (i64::from(canvas.height) - i64::from(resized_height)).div_euclid(2),
    }
}

/// Black canvas of exactly `canvas` size with `source` scaled to cover it
pub fn fill_canvas(source: &DynamicImage, canvas: ScreenSize) -> RgbImage {
    let layout = cover_layout(source.width(), source.height(), canvas);
    debug!(
        scale = layout.scale,
        width = layout.resized_width,
        height = layout.resized_height,
        offset_x = layout.offset_x,
        offset_y = layout.offset_y,
        "Cover layout"
    );

    let resized = imageops::resize(
        &source.to_rgb8(),
        layout.resized_width,
        layout.resized_height,
        FilterType::Lanczos3,
    );

    let mut out = RgbImage::from_pixel(canvas.width, canvas.height, Rgb([0, 0, 0]));
    imageops::replace(&mut out, &resized, layout.offset_x, layout.offset_y);
    out
}
