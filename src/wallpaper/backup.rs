use std::fs;
use std::path::Path;

use tracing::info;

use super::WallpaperPaths;
use crate::error::WatermarkError;
use crate::platform::Desktop;

/// Copy `source` into the backup slot, overwriting any previous backup.
///
/// Callers treat the error as non-fatal.
pub fn backup(source: &Path, paths: &WallpaperPaths) -> Result<(), WatermarkError> {
    let write = || -> std::io::Result<u64> {
        fs::create_dir_all(&paths.tool_dir)?;
        fs::copy(source, &paths.backup)
    };

    let bytes = write().map_err(|source| WatermarkError::BackupWriteFailed {
        path: paths.backup.clone(),
        source,
    })?;

    info!(from = %source.display(), to = %paths.backup.display(), bytes, "Backed up current wallpaper");
    Ok(())
}

/// Point the desktop back at the backup slot. No recompositing happens.
pub fn restore(paths: &WallpaperPaths, desktop: &dyn Desktop) -> Result<(), WatermarkError> {
    if !paths.backup.is_file() {
        return Err(WatermarkError::BackupNotFound {
            path: paths.backup.clone(),
        });
    }

    desktop
        .set_wallpaper(&paths.backup)
        .map_err(|e| WatermarkError::ApplyFailed {
            path: paths.backup.clone(),
            reason: format!("{e:#}"),
        })?;

    info!(path = %paths.backup.display(), "Restored wallpaper from backup");
    Ok(())
}
