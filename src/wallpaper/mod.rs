//! Wallpaper file lifecycle
//!
//! Fixed single-slot paths under the user profile, resolution of the active
//! wallpaper, the backup slot and writing/applying the composited output.

mod apply;
mod backup;
mod locator;

pub use apply::apply;
pub use backup::{backup, restore};
pub use locator::locate;

use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::constants::paths;
use crate::platform::Desktop;

/// Every fixed path the operation touches, derived from one profile directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallpaperPaths {
    pub profile: PathBuf,
    /// File the desktop reports as its background, tried first
    pub active: Option<PathBuf>,
    /// Canonical (extensionless) active wallpaper
    pub source: PathBuf,
    /// Legacy `.jpg` variant, absent for an explicitly configured source
    pub legacy_source: Option<PathBuf>,
    pub tool_dir: PathBuf,
    pub backup: PathBuf,
    pub output: PathBuf,
}

impl WallpaperPaths {
    pub fn new(profile: &Path, settings: &Settings) -> Self {
        let (source, legacy_source) = match &settings.wallpaper_source {
            Some(explicit) => (explicit.clone(), None),
            None => {
                let theme_dir = paths::THEME_DIR.iter().fold(profile.to_path_buf(), |p, c| p.join(c));
                let source = theme_dir.join(paths::TRANSCODED_WALLPAPER);
                let legacy = theme_dir.join(format!("{}{}", paths::TRANSCODED_WALLPAPER, paths::LEGACY_SUFFIX));
                (source, Some(legacy))
            }
        };

        let tool_dir = profile.join(&settings.tool_folder);

        Self {
            profile: profile.to_path_buf(),
            active: None,
            source,
            legacy_source,
            backup: tool_dir.join(paths::BACKUP_FILE),
            output: tool_dir.join(paths::OUTPUT_FILE),
            tool_dir,
        }
    }

    /// Paths for `profile` plus whatever wallpaper `desktop` reports.
    ///
    /// An explicitly configured source always wins. A desktop already showing
    /// our output (or the backup, after a restore) resolves to the backup,
    /// which holds the unmarked image.
    pub fn for_desktop(profile: &Path, settings: &Settings, desktop: &dyn Desktop) -> Self {
        let mut paths = Self::new(profile, settings);
        if settings.wallpaper_source.is_some() {
            return paths;
        }

        paths.active = desktop.current_wallpaper().map(|active| {
            if same_file(&active, &paths.output) || same_file(&active, &paths.backup) {
                paths.backup.clone()
            } else {
                active
            }
        });
        paths
    }

    /// Candidate source files in the order they are tried
    pub fn source_candidates(&self) -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = self
            .active
            .iter()
            .cloned()
            .chain(std::iter::once(self.source.clone()))
            .chain(self.legacy_source.clone())
            .collect();
        candidates.dedup();
        candidates
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
