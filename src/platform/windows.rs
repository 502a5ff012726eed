//! Windows desktop via user32

use std::ffi::c_void;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};
use ::windows::Win32::UI::HiDpi::{
    DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2, SetProcessDpiAwarenessContext,
};
use ::windows::Win32::UI::WindowsAndMessaging::{
    GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN, SPI_SETDESKWALLPAPER, SPIF_SENDCHANGE,
    SPIF_UPDATEINIFILE, SystemParametersInfoW,
};

use super::{Desktop, ScreenSize};

#[derive(Debug)]
pub struct WindowsDesktop;

impl WindowsDesktop {
    /// Opts the process into per-monitor DPI awareness so screen metrics
    /// are physical pixels rather than scaled ones
    pub fn new() -> Self {
        unsafe {
            if SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2).is_err() {
                warn!("Failed to set process DPI awareness to PerMonitorV2; screen size may be scaled");
            }
        }
        Self
    }
}

impl Default for WindowsDesktop {
    fn default() -> Self {
        Self::new()
    }
}

impl Desktop for WindowsDesktop {
    fn screen_size(&self) -> Option<ScreenSize> {
        let (width, height) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        info!(width, height, "Queried primary screen metrics");
        ScreenSize::new(u32::try_from(width).ok()?, u32::try_from(height).ok()?)
    }

    fn set_wallpaper(&self, image: &Path) -> Result<()> {
        let absolute = std::fs::canonicalize(image)
            .with_context(|| format!("Failed to resolve {}", image.display()))?;
        let path = absolute
            .to_str()
            .ok_or_else(|| anyhow!("path is not valid UTF-8"))?
            .trim_start_matches(r"\\?\");

        let mut wide: Vec<u16> = path.encode_utf16().chain(Some(0)).collect();

        // UPDATEINIFILE persists the choice, SENDCHANGE applies it now
        unsafe {
            SystemParametersInfoW(
                SPI_SETDESKWALLPAPER,
                0,
                Some(wide.as_mut_ptr() as *mut c_void),
                SPIF_UPDATEINIFILE | SPIF_SENDCHANGE,
            )
        }
        .with_context(|| format!("SystemParametersInfoW rejected {path}"))?;

        info!(path = %path, "Wallpaper set");
        Ok(())
    }
}
