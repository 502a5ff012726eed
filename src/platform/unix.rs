//! Unix desktop: X11 root screen metrics, GNOME/KDE wallpaper backends

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, warn};
use x11rb::connection::Connection;

use super::{Desktop, ScreenSize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DesktopKind {
    Gnome,
    Kde,
}

/// Classify `XDG_CURRENT_DESKTOP`; anything unrecognized is driven through
/// gsettings, which GNOME derivatives (Unity, Cinnamon, Budgie) honor.
fn detect_desktop(xdg_current_desktop: &str) -> DesktopKind {
    let lower = xdg_current_desktop.to_ascii_lowercase();
    if lower.split(':').any(|part| part == "kde") {
        DesktopKind::Kde
    } else {
        DesktopKind::Gnome
    }
}

fn file_uri(path: &Path) -> Result<String> {
    let s = path.to_str().ok_or_else(|| anyhow!("path is not valid UTF-8"))?;
    Ok(format!("file://{s}"))
}

/// Local path behind a `file://` URI or a bare absolute path
fn path_from_uri(value: &str) -> Option<PathBuf> {
    let value = value.trim();
    match value.strip_prefix("file://") {
        Some(encoded) => urlencoding::decode(encoded).ok().map(|p| PathBuf::from(p.into_owned())),
        None if value.starts_with('/') => Some(PathBuf::from(value)),
        None => None,
    }
}

/// Path from a `gsettings get` string value such as `'file:///a/b.jpg'`
fn path_from_gsettings(output: &str) -> Option<PathBuf> {
    let value = output.trim();
    let value = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value);
    path_from_uri(value)
}

/// First `Image=` entry of an image wallpaper in Plasma's applet config
fn image_from_appletsrc(contents: &str) -> Option<PathBuf> {
    let mut in_image_group = false;
    for line in contents.lines().map(str::trim) {
        if line.starts_with('[') {
            in_image_group = line.ends_with("[Wallpaper][org.kde.image][General]");
            continue;
        }
        if !in_image_group {
            continue;
        }
        if let Some(value) = line.strip_prefix("Image=") {
            if let Some(path) = path_from_uri(value) {
                return Some(path);
            }
        }
    }
    None
}

#[derive(Debug, Default)]
pub struct UnixDesktop;

impl UnixDesktop {
    pub fn new() -> Self {
        Self
    }
}

impl Desktop for UnixDesktop {
    fn screen_size(&self) -> Option<ScreenSize> {
        let (conn, screen_num) = x11rb::connect(None)
            .inspect_err(|e| warn!(error = %e, "Failed to connect to X11 server, screen size unknown"))
            .ok()?;
        let screen = conn.setup().roots.get(screen_num)?;
        info!(
            screen = screen_num,
            width = screen.width_in_pixels,
            height = screen.height_in_pixels,
            "Queried X11 root screen"
        );
        ScreenSize::new(u32::from(screen.width_in_pixels), u32::from(screen.height_in_pixels))
    }

    fn set_wallpaper(&self, image: &Path) -> Result<()> {
        let absolute = std::fs::canonicalize(image)
            .with_context(|| format!("Failed to resolve {}", image.display()))?;
        let kind = detect_desktop(&std::env::var("XDG_CURRENT_DESKTOP").unwrap_or_default());
        debug!(desktop = ?kind, path = %absolute.display(), "Setting wallpaper");

        match kind {
            DesktopKind::Gnome => set_gnome(&absolute).context("GNOME wallpaper"),
            DesktopKind::Kde => set_kde(&absolute).context("KDE wallpaper"),
        }
    }

    fn current_wallpaper(&self) -> Option<PathBuf> {
        let kind = detect_desktop(&std::env::var("XDG_CURRENT_DESKTOP").unwrap_or_default());
        let found = match kind {
            DesktopKind::Gnome => current_gnome().context("GNOME wallpaper"),
            DesktopKind::Kde => current_kde().context("KDE wallpaper"),
        };

        match found {
            Ok(Some(path)) => {
                debug!(desktop = ?kind, path = %path.display(), "Desktop reports current wallpaper");
                Some(path)
            }
            Ok(None) => {
                debug!(desktop = ?kind, "Desktop reports no wallpaper file");
                None
            }
            Err(e) => {
                warn!(desktop = ?kind, error = %format!("{e:#}"), "Failed to query current wallpaper");
                None
            }
        }
    }
}

fn gsettings_get(schema: &str, key: &str) -> Result<String> {
    let output = Command::new("gsettings")
        .arg("get")
        .arg(schema)
        .arg(key)
        .output()
        .with_context(|| format!("run gsettings get ({key})"))?;
    if !output.status.success() {
        return Err(anyhow!("gsettings get failed ({key})"));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn current_gnome() -> Result<Option<PathBuf>> {
    // Dark style shows picture-uri-dark when it is set
    let prefers_dark = gsettings_get("org.gnome.desktop.interface", "color-scheme")
        .is_ok_and(|scheme| scheme.contains("prefer-dark"));
    if prefers_dark {
        if let Ok(value) = gsettings_get("org.gnome.desktop.background", "picture-uri-dark") {
            if let Some(path) = path_from_gsettings(&value) {
                return Ok(Some(path));
            }
        }
    }

    let value = gsettings_get("org.gnome.desktop.background", "picture-uri")?;
    Ok(path_from_gsettings(&value))
}

fn current_kde() -> Result<Option<PathBuf>> {
    let config = dirs::config_dir()
        .ok_or_else(|| anyhow!("no config directory"))?
        .join("plasma-org.kde.plasma.desktop-appletsrc");
    let contents = fs::read_to_string(&config).with_context(|| format!("read {}", config.display()))?;
    Ok(image_from_appletsrc(&contents))
}

fn gsettings_set(key: &str, value: &str) -> Result<std::process::ExitStatus> {
    Command::new("gsettings")
        .arg("set")
        .arg("org.gnome.desktop.background")
        .arg(key)
        .arg(value)
        .status()
        .with_context(|| format!("run gsettings ({key})"))
}

fn set_gnome(image_abs: &Path) -> Result<()> {
    let uri = file_uri(image_abs)?;

    // gsettings writes through dconf, which persists across sessions
    if !gsettings_set("picture-uri", &uri)?.success() {
        return Err(anyhow!("gsettings failed (picture-uri)"));
    }

    // GNOME 42+ keeps a separate dark-style wallpaper
    if let Err(e) = gsettings_set("picture-uri-dark", &uri) {
        debug!(error = %e, "picture-uri-dark not set");
    }

    // The image is already composited at screen size; zoom == Fill
    if let Err(e) = gsettings_set("picture-options", "zoom") {
        debug!(error = %e, "picture-options not set");
    }

    Ok(())
}

fn find_qdbus() -> Option<&'static str> {
    // Plasma 6 ships qdbus6, Plasma 5 ships qdbus
    ["qdbus6", "qdbus"]
        .into_iter()
        .find(|exe| Command::new(exe).arg("--version").output().is_ok())
}

fn set_kde(image_abs: &Path) -> Result<()> {
    let qdbus = find_qdbus().ok_or_else(|| anyhow!("qdbus not found (qdbus6/qdbus)"))?;
    let uri = file_uri(image_abs)?;

    let script = format!(
        "var allDesktops = desktops();\n\
         for (var i = 0; i < allDesktops.length; i++) {{\n\
           var d = allDesktops[i];\n\
           d.wallpaperPlugin = 'org.kde.image';\n\
           d.currentConfigGroup = ['Wallpaper', 'org.kde.image', 'General'];\n\
           d.writeConfig('Image', '{uri}');\n\
           d.writeConfig('FillMode', '2');\n\
         }}\n"
    );

    let status = Command::new(qdbus)
        .arg("org.kde.plasmashell")
        .arg("/PlasmaShell")
        .arg("org.kde.PlasmaShell.evaluateScript")
        .arg(script)
        .status()
        .with_context(|| format!("run {qdbus} PlasmaShell.evaluateScript"))?;

    if !status.success() {
        return Err(anyhow!("qdbus wallpaper script failed"));
    }

    Ok(())
}
