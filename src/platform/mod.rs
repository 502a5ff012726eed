//! Desktop primitives: screen size and wallpaper assignment.
//!
//! Each platform implements [`Desktop`]; the correct one is selected at
//! compile time and re-exported as `NativeDesktop`. Core logic only ever
//! sees the trait.

use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::Mutex;

use anyhow::Result;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::UnixDesktop as NativeDesktop;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsDesktop as NativeDesktop;

/// Pixel size of the primary screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    /// Rejects zero-sized screens, which some OS calls report on failure
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }
}

pub trait Desktop: Send + Sync {
    /// `None` when screen metrics are unavailable
    fn screen_size(&self) -> Option<ScreenSize>;

    /// Make `image` the desktop background immediately and across sessions
    fn set_wallpaper(&self, image: &Path) -> Result<()>;

    /// Image file the desktop reports as its background, if it reports one.
    ///
    /// Windows keeps a transcoded copy under the theme directory instead, so
    /// the default is `None`.
    fn current_wallpaper(&self) -> Option<PathBuf> {
        None
    }
}

/// In-memory desktop that records wallpaper changes
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryDesktop {
    pub screen: Option<ScreenSize>,
    /// Reported by `current_wallpaper`
    pub current: Option<PathBuf>,
    pub fail_apply: bool,
    pub applied: Mutex<Vec<PathBuf>>,
}

#[cfg(test)]
impl MemoryDesktop {
    pub fn with_screen(width: u32, height: u32) -> Self {
        Self {
            screen: ScreenSize::new(width, height),
            ..Self::default()
        }
    }

    /// Every path passed to `set_wallpaper`, oldest first
    pub fn applied(&self) -> Vec<PathBuf> {
        self.applied.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
impl Desktop for MemoryDesktop {
    fn screen_size(&self) -> Option<ScreenSize> {
        self.screen
    }

    fn current_wallpaper(&self) -> Option<PathBuf> {
        self.current.clone()
    }

    fn set_wallpaper(&self, image: &Path) -> Result<()> {
        if self.fail_apply {
            anyhow::bail!("desktop rejected wallpaper");
        }
        self.applied
            .lock()
            .map_err(|_| anyhow::anyhow!("desktop state poisoned"))?
            .push(image.to_path_buf());
        Ok(())
    }
}
