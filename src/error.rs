//! Error taxonomy for the watermark operation

use std::path::PathBuf;

use thiserror::Error;

/// Failures of the core watermark and restore operations.
///
/// Everything except [`WatermarkError::BackupWriteFailed`] aborts the
/// operation. A backup failure is logged and the operation carries on.
#[derive(Debug, Error)]
pub enum WatermarkError {
    /// Neither the canonical nor the legacy wallpaper file exists.
    #[error("current wallpaper file not found (tried: {})", display_paths(.tried))]
    WallpaperNotFound { tried: Vec<PathBuf> },

    /// Copying the current wallpaper into the backup slot failed.
    #[error("failed to back up wallpaper to {path}: {source}")]
    BackupWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Restore was requested but the backup slot is empty.
    #[error("no wallpaper backup found at {path}")]
    BackupNotFound { path: PathBuf },

    /// No field selected and no remark given.
    #[error("nothing to write: select at least one field or enter a remark")]
    EmptyWatermark,

    /// The OS refused to change the desktop background.
    #[error("failed to set desktop wallpaper to {path}: {reason}")]
    ApplyFailed { path: PathBuf, reason: String },

    #[error("failed to decode wallpaper image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("wallpaper image {path} has zero size")]
    EmptyImage { path: PathBuf },

    #[error("failed to encode watermarked image {path}: {source}")]
    ImageEncode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WatermarkError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Whether the operation may continue after this error
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::BackupWriteFailed { .. })
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
