use std::fs::{self, File};
use std::io::{BufWriter, Write};

use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use tracing::info;

use super::WallpaperPaths;
use crate::constants::output::WRITE_BUFFER_SIZE;
use crate::error::WatermarkError;
use crate::platform::Desktop;

/// Encode `image` into the output slot and make it the desktop background.
///
/// The JPEG is written to a sibling temp file and renamed into place, so the
/// desktop is only ever pointed at a complete file.
pub fn apply(
    image: &RgbImage,
    quality: u8,
    paths: &WallpaperPaths,
    desktop: &dyn Desktop,
) -> Result<(), WatermarkError> {
    fs::create_dir_all(&paths.tool_dir).map_err(|e| WatermarkError::io(&paths.tool_dir, e))?;

    let staging = paths.output.with_extension("jpg.part");
    write_jpeg(image, quality, &staging)?;
    fs::rename(&staging, &paths.output).map_err(|e| WatermarkError::io(&paths.output, e))?;
    info!(path = %paths.output.display(), width = image.width(), height = image.height(), quality, "Saved watermarked wallpaper");

    desktop
        .set_wallpaper(&paths.output)
        .map_err(|e| WatermarkError::ApplyFailed {
            path: paths.output.clone(),
            reason: format!("{e:#}"),
        })
}

fn write_jpeg(image: &RgbImage, quality: u8, path: &std::path::Path) -> Result<(), WatermarkError> {
    let file = File::create(path).map_err(|e| WatermarkError::io(path, e))?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);

    JpegEncoder::new_with_quality(&mut writer, quality)
        .encode_image(image)
        .map_err(|source| WatermarkError::ImageEncode {
            path: path.to_path_buf(),
            source,
        })?;

    writer.flush().map_err(|e| WatermarkError::io(path, e))
}
