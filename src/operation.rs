//! The watermark and restore operations
//!
//! Shared by every front-end. Each run takes a fresh identity snapshot and an
//! options snapshot, and holds the profile lock while it touches the backup
//! and output slots.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use image::ImageReader;
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::WatermarkError;
use crate::identity::{self, IdentityProvider, NetworkIdentity};
use crate::platform::Desktop;
use crate::wallpaper::{self, WallpaperPaths};
use crate::watermark::{self, FontRenderer, WatermarkOptions};

/// Status line sink; front-ends print these
pub type StatusFn<'a> = &'a (dyn Fn(&str) + Sync);

/// Everything an operation needs from the outside world
pub struct AppContext {
    pub settings: Settings,
    pub desktop: Arc<dyn Desktop>,
    pub identity: Arc<dyn IdentityProvider>,
    font: OnceLock<FontRenderer>,
}

impl AppContext {
    pub fn new(settings: Settings, desktop: Arc<dyn Desktop>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            settings,
            desktop,
            identity,
            font: OnceLock::new(),
        }
    }

    /// Use `font` instead of resolving one from the settings
    #[cfg(test)]
    pub fn with_font(self, font: FontRenderer) -> Self {
        let _ = self.font.set(font);
        self
    }

    /// Font resolved on first use, so restore never pays for font lookup
    pub fn font(&self) -> &FontRenderer {
        self.font.get_or_init(|| FontRenderer::load(&self.settings))
    }

    /// Text the watermark would carry right now
    pub fn preview_text(&self, options: &WatermarkOptions) -> Option<String> {
        let identity = identity::fetch_or_minimal(self.identity.as_ref());
        watermark::assemble_text(&identity, options)
    }

    /// Fetch identity, then composite and apply; returns the applied file
    pub fn watermark(&self, options: &WatermarkOptions, status: StatusFn) -> Result<PathBuf, WatermarkError> {
        if options.is_empty() {
            return Err(WatermarkError::EmptyWatermark);
        }
        status("Reading network identity");
        let identity = identity::fetch_or_minimal(self.identity.as_ref());
        run_watermark(&identity, options, &self.settings, self.desktop.as_ref(), self.font(), status)
    }

    /// Re-apply the backed-up wallpaper; returns the applied file
    pub fn restore(&self, status: StatusFn) -> Result<PathBuf, WatermarkError> {
        let profile = identity::user_profile_dir();
        restore_wallpaper(&profile, &self.settings, self.desktop.as_ref(), status)
    }
}

/// Lock serializing access to one profile's backup and output slots
fn profile_lock(profile: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

    let mut locks = LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(profile.to_path_buf()).or_default())
}

fn hold(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Locate, back up, composite and apply.
///
/// Blank text fails before any file is touched. A failed backup is logged and
/// skipped; every other failure stops the run before the desktop changes.
pub fn run_watermark(
    identity: &NetworkIdentity,
    options: &WatermarkOptions,
    settings: &Settings,
    desktop: &dyn Desktop,
    font: &FontRenderer,
    status: StatusFn,
) -> Result<PathBuf, WatermarkError> {
    let text = watermark::assemble_text(identity, options).ok_or(WatermarkError::EmptyWatermark)?;
    let paths = WallpaperPaths::for_desktop(&identity.user_profile, settings, desktop);

    let lock = profile_lock(&paths.profile);
    let _guard = hold(&lock);

    status("Locating current wallpaper");
    let source = wallpaper::locate(&paths)?;

    if source == paths.backup {
        // Copying the slot onto itself would truncate it
        info!(path = %source.display(), "Watermarking from the existing backup");
        status("Using existing backup as source");
    } else {
        status("Backing up current wallpaper");
        if let Err(e) = wallpaper::backup(&source, &paths) {
            if e.is_fatal() {
                return Err(e);
            }
            warn!(error = %e, "Backup failed, continuing without one");
            status("Backup failed, continuing");
        }
    }

    status("Compositing watermark");
    let image = ImageReader::open(&source)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| WatermarkError::io(&source, e))?
        .decode()
        .map_err(|e| WatermarkError::ImageDecode {
            path: source.clone(),
            source: e,
        })?;
    if image.width() == 0 || image.height() == 0 {
        return Err(WatermarkError::EmptyImage { path: source });
    }

    let composed = watermark::compose(&image, &text, desktop.screen_size(), font);

    status("Applying wallpaper");
    wallpaper::apply(&composed, settings.jpeg_quality, &paths, desktop)?;

    info!(output = %paths.output.display(), "Watermarked wallpaper applied");
    Ok(paths.output)
}

/// Point the desktop back at the backup slot of `profile`
pub fn restore_wallpaper(
    profile: &Path,
    settings: &Settings,
    desktop: &dyn Desktop,
    status: StatusFn,
) -> Result<PathBuf, WatermarkError> {
    let paths = WallpaperPaths::new(profile, settings);

    let lock = profile_lock(&paths.profile);
    let _guard = hold(&lock);

    status("Restoring backed-up wallpaper");
    wallpaper::restore(&paths, desktop)?;
    Ok(paths.backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaticIdentityProvider;
    use crate::platform::MemoryDesktop;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::fs;

    fn quiet(_: &str) {}

    fn identity_for(profile: &Path) -> NetworkIdentity {
        NetworkIdentity {
            hostname: "PC1".to_string(),
            ip_addresses: vec!["192.168.1.5".to_string()],
            mac_addresses: vec!["AA:BB:CC:DD:EE:FF".to_string()],
            user_profile: profile.to_path_buf(),
        }
    }

    fn seed_wallpaper(profile: &Path, name: &str) -> PathBuf {
        let themes = profile.join("AppData/Roaming/Microsoft/Windows/Themes");
        fs::create_dir_all(&themes).unwrap();
        let path = themes.join(name);
        RgbImage::from_pixel(120, 80, Rgb([30, 90, 150]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();
        path
    }

    #[test]
    fn test_watermark_end_to_end() {
        let profile = tempfile::tempdir().unwrap();
        let source = seed_wallpaper(profile.path(), "TranscodedWallpaper");
        let desktop = MemoryDesktop::with_screen(320, 180);
        let settings = Settings::default();

        let output = run_watermark(
            &identity_for(profile.path()),
            &WatermarkOptions::default(),
            &settings,
            &desktop,
            &FontRenderer::builtin(),
            &quiet,
        )
        .unwrap();

        let paths = WallpaperPaths::new(profile.path(), &settings);
        assert_eq!(output, paths.output);
        assert_eq!(fs::read(&paths.backup).unwrap(), fs::read(&source).unwrap());
        let written = image::open(&paths.output).unwrap();
        assert_eq!((written.width(), written.height()), (320, 180));
        assert_eq!(desktop.applied(), vec![paths.output]);
    }

    #[test]
    fn test_legacy_jpg_source_is_used() {
        let profile = tempfile::tempdir().unwrap();
        seed_wallpaper(profile.path(), "TranscodedWallpaper.jpg");
        let desktop = MemoryDesktop::with_screen(64, 36);

        let result = run_watermark(
            &identity_for(profile.path()),
            &WatermarkOptions::default(),
            &Settings::default(),
            &desktop,
            &FontRenderer::builtin(),
            &quiet,
        );

        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn test_empty_watermark_touches_nothing() {
        let profile = tempfile::tempdir().unwrap();
        seed_wallpaper(profile.path(), "TranscodedWallpaper");
        let desktop = MemoryDesktop::with_screen(64, 36);
        let settings = Settings::default();

        let err = run_watermark(
            &identity_for(profile.path()),
            &WatermarkOptions::cleared(),
            &settings,
            &desktop,
            &FontRenderer::builtin(),
            &quiet,
        )
        .unwrap_err();

        assert!(matches!(err, WatermarkError::EmptyWatermark));
        assert!(!WallpaperPaths::new(profile.path(), &settings).tool_dir.exists());
        assert!(desktop.applied().is_empty());
    }

    #[test]
    fn test_missing_wallpaper_changes_nothing() {
        let profile = tempfile::tempdir().unwrap();
        let desktop = MemoryDesktop::with_screen(64, 36);
        let settings = Settings::default();

        let err = run_watermark(
            &identity_for(profile.path()),
            &WatermarkOptions::default(),
            &settings,
            &desktop,
            &FontRenderer::builtin(),
            &quiet,
        )
        .unwrap_err();

        assert!(matches!(err, WatermarkError::WallpaperNotFound { .. }));
        assert!(!WallpaperPaths::new(profile.path(), &settings).tool_dir.exists());
        assert!(desktop.applied().is_empty());
    }

    #[test]
    fn test_undecodable_wallpaper_is_not_applied() {
        let profile = tempfile::tempdir().unwrap();
        let themes = profile.path().join("AppData/Roaming/Microsoft/Windows/Themes");
        fs::create_dir_all(&themes).unwrap();
        fs::write(themes.join("TranscodedWallpaper"), b"not an image").unwrap();
        let desktop = MemoryDesktop::with_screen(64, 36);

        let err = run_watermark(
            &identity_for(profile.path()),
            &WatermarkOptions::default(),
            &Settings::default(),
            &desktop,
            &FontRenderer::builtin(),
            &quiet,
        )
        .unwrap_err();

        assert!(matches!(err, WatermarkError::ImageDecode { .. }));
        assert!(desktop.applied().is_empty());
    }

    #[test]
    fn test_apply_failure_is_reported() {
        let profile = tempfile::tempdir().unwrap();
        seed_wallpaper(profile.path(), "TranscodedWallpaper");
        let desktop = MemoryDesktop {
            fail_apply: true,
            ..MemoryDesktop::with_screen(64, 36)
        };

        let err = run_watermark(
            &identity_for(profile.path()),
            &WatermarkOptions::default(),
            &Settings::default(),
            &desktop,
            &FontRenderer::builtin(),
            &quiet,
        )
        .unwrap_err();

        assert!(matches!(err, WatermarkError::ApplyFailed { .. }));
    }

    #[test]
    fn test_unknown_screen_keeps_source_size() {
        let profile = tempfile::tempdir().unwrap();
        seed_wallpaper(profile.path(), "TranscodedWallpaper");
        let desktop = MemoryDesktop::default();
        let settings = Settings::default();

        run_watermark(
            &identity_for(profile.path()),
            &WatermarkOptions::default(),
            &settings,
            &desktop,
            &FontRenderer::builtin(),
            &quiet,
        )
        .unwrap();

        let written = image::open(WallpaperPaths::new(profile.path(), &settings).output).unwrap();
        assert_eq!((written.width(), written.height()), (120, 80));
    }

    #[test]
    fn test_desktop_reported_wallpaper_without_theme_copy() {
        let profile = tempfile::tempdir().unwrap();
        let pictures = profile.path().join("Pictures");
        fs::create_dir_all(&pictures).unwrap();
        let sea = pictures.join("sea.png");
        RgbImage::from_pixel(90, 60, Rgb([10, 120, 200]))
            .save_with_format(&sea, ImageFormat::Png)
            .unwrap();
        let desktop = MemoryDesktop {
            current: Some(sea.clone()),
            ..MemoryDesktop::with_screen(64, 36)
        };
        let settings = Settings::default();

        let output = run_watermark(
            &identity_for(profile.path()),
            &WatermarkOptions::default(),
            &settings,
            &desktop,
            &FontRenderer::builtin(),
            &quiet,
        )
        .unwrap();

        let paths = WallpaperPaths::new(profile.path(), &settings);
        assert_eq!(fs::read(&paths.backup).unwrap(), fs::read(&sea).unwrap());
        assert_eq!(desktop.applied(), vec![output]);
    }

    #[test]
    fn test_rerun_on_watermarked_desktop_keeps_clean_backup() {
        let profile = tempfile::tempdir().unwrap();
        let sea = profile.path().join("sea.png");
        RgbImage::from_pixel(90, 60, Rgb([10, 120, 200]))
            .save_with_format(&sea, ImageFormat::Png)
            .unwrap();
        let settings = Settings::default();
        let paths = WallpaperPaths::new(profile.path(), &settings);
        let identity = identity_for(profile.path());
        let font = FontRenderer::builtin();

        let first = MemoryDesktop {
            current: Some(sea.clone()),
            ..MemoryDesktop::with_screen(64, 36)
        };
        run_watermark(&identity, &WatermarkOptions::default(), &settings, &first, &font, &quiet).unwrap();

        // The desktop now shows the watermarked output
        let second = MemoryDesktop {
            current: Some(paths.output.clone()),
            ..MemoryDesktop::with_screen(64, 36)
        };
        let lines = Mutex::new(Vec::new());
        let record = |line: &str| lines.lock().unwrap().push(line.to_string());
        run_watermark(&identity, &WatermarkOptions::default(), &settings, &second, &font, &record).unwrap();

        assert_eq!(fs::read(&paths.backup).unwrap(), fs::read(&sea).unwrap());
        let lines = lines.into_inner().unwrap();
        assert!(lines.iter().any(|l| l == "Using existing backup as source"));
        assert!(!lines.iter().any(|l| l == "Backing up current wallpaper"));
        assert_eq!(second.applied(), vec![paths.output.clone()]);
    }

    #[test]
    fn test_restore_after_watermark_applies_backup() {
        let profile = tempfile::tempdir().unwrap();
        seed_wallpaper(profile.path(), "TranscodedWallpaper");
        let desktop = MemoryDesktop::with_screen(64, 36);
        let settings = Settings::default();

        run_watermark(
            &identity_for(profile.path()),
            &WatermarkOptions::default(),
            &settings,
            &desktop,
            &FontRenderer::builtin(),
            &quiet,
        )
        .unwrap();
        let restored = restore_wallpaper(profile.path(), &settings, &desktop, &quiet).unwrap();

        let paths = WallpaperPaths::new(profile.path(), &settings);
        assert_eq!(restored, paths.backup);
        assert_eq!(desktop.applied(), vec![paths.output, paths.backup]);
    }

    #[test]
    fn test_status_lines_are_reported_in_order() {
        let profile = tempfile::tempdir().unwrap();
        seed_wallpaper(profile.path(), "TranscodedWallpaper");
        let desktop = MemoryDesktop::with_screen(64, 36);
        let lines = Mutex::new(Vec::new());
        let record = |line: &str| lines.lock().unwrap().push(line.to_string());

        run_watermark(
            &identity_for(profile.path()),
            &WatermarkOptions::default(),
            &Settings::default(),
            &desktop,
            &FontRenderer::builtin(),
            &record,
        )
        .unwrap();

        let lines = lines.into_inner().unwrap();
        assert_eq!(lines.first().map(String::as_str), Some("Locating current wallpaper"));
        assert_eq!(lines.last().map(String::as_str), Some("Applying wallpaper"));
    }

    #[test]
    fn test_concurrent_runs_on_one_profile_both_succeed() {
        let profile = tempfile::tempdir().unwrap();
        seed_wallpaper(profile.path(), "TranscodedWallpaper");
        let desktop = MemoryDesktop::with_screen(64, 36);
        let identity = identity_for(profile.path());
        let settings = Settings::default();
        let font = FontRenderer::builtin();

        std::thread::scope(|scope| {
            let runs: Vec<_> = (0..2)
                .map(|_| {
                    scope.spawn(|| {
                        run_watermark(
                            &identity,
                            &WatermarkOptions::default(),
                            &settings,
                            &desktop,
                            &font,
                            &quiet,
                        )
                    })
                })
                .collect();
            for run in runs {
                assert!(run.join().unwrap().is_ok());
            }
        });

        assert_eq!(desktop.applied().len(), 2);
        assert!(image::open(WallpaperPaths::new(profile.path(), &settings).output).is_ok());
    }

    #[test]
    fn test_context_rejects_empty_options_before_identity_fetch() {
        let profile = tempfile::tempdir().unwrap();
        let context = AppContext::new(
            Settings::default(),
            Arc::new(MemoryDesktop::with_screen(64, 36)),
            Arc::new(StaticIdentityProvider(identity_for(profile.path()))),
        )
        .with_font(FontRenderer::builtin());

        let err = context.watermark(&WatermarkOptions::cleared(), &quiet).unwrap_err();

        assert!(matches!(err, WatermarkError::EmptyWatermark));
    }

    #[test]
    fn test_context_preview_text() {
        let profile = tempfile::tempdir().unwrap();
        let context = AppContext::new(
            Settings::default(),
            Arc::new(MemoryDesktop::default()),
            Arc::new(StaticIdentityProvider(identity_for(profile.path()))),
        );

        let text = context.preview_text(&WatermarkOptions { include_mac: false, ..WatermarkOptions::default() });

        assert_eq!(text.as_deref(), Some("Computer name: PC1\nIP: 192.168.1.5"));
    }
}
