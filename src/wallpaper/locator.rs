use std::path::PathBuf;

use tracing::{debug, info};

use super::WallpaperPaths;
use crate::error::WatermarkError;

/// Resolve the active wallpaper file: the desktop's own report first, then
/// the canonical theme path, then its legacy `.jpg` variant
pub fn locate(paths: &WallpaperPaths) -> Result<PathBuf, WatermarkError> {
    let candidates = paths.source_candidates();

    for candidate in &candidates {
        if candidate.is_file() {
            info!(path = %candidate.display(), "Located current wallpaper");
            return Ok(candidate.clone());
        }
        debug!(path = %candidate.display(), "Wallpaper candidate missing");
    }

    Err(WatermarkError::WallpaperNotFound { tried: candidates })
}
