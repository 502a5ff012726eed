//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Configuration file location
pub mod config {
    /// Directory under the platform config dir
    pub const APP_DIR: &str = "wallpaper-watermark";

    /// Settings file name
    pub const FILENAME: &str = "config.json";

    /// Environment variable overriding the log level
    pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
}

/// Filesystem layout relative to the user profile directory
pub mod paths {
    /// Theme directory holding the transcoded copy of the active wallpaper
    pub const THEME_DIR: &[&str] = &["AppData", "Roaming", "Microsoft", "Windows", "Themes"];

    /// Active wallpaper file name (modern, extensionless)
    pub const TRANSCODED_WALLPAPER: &str = "TranscodedWallpaper";

    /// Suffix appended for the legacy variant
    pub const LEGACY_SUFFIX: &str = ".jpg";

    /// Default folder holding the backup and output slots
    pub const DEFAULT_TOOL_FOLDER: &str = "WallpaperTool";

    /// Single-slot backup of the wallpaper that was active before watermarking
    pub const BACKUP_FILE: &str = "Wallpaper_Backup.jpg";

    /// Single-slot composited output
    pub const OUTPUT_FILE: &str = "Wallpaper_Watermark.jpg";
}

/// Watermark text labels
pub mod labels {
    pub const HOSTNAME: &str = "Computer name: ";
    pub const IP: &str = "IP: ";
    pub const MAC: &str = "MAC: ";
    pub const REMARK: &str = "Remark: ";

    /// Prefix for continuation lines under a block
    pub const CONTINUATION: &str = "    ";
}

/// Text placement and fitting
pub mod layout {
    /// Starting font size is screen height divided by this
    pub const FONT_SIZE_DIVISOR: u32 = 50;

    /// Lower bound for the starting font size
    pub const MIN_START_FONT_SIZE: u32 = 12;

    /// Shrink loop never goes below this size
    pub const MIN_FONT_SIZE: u32 = 10;

    /// Each shrink step keeps this fraction of the size
    pub const SHRINK_FACTOR: f64 = 0.9;

    /// Right/top margin as a fraction of canvas width
    pub const MARGIN_RATIO: f64 = 0.05;

    /// Margin used when the canvas width is unknown
    pub const FALLBACK_MARGIN: u32 = 90;

    /// Leftmost allowed text origin
    pub const MIN_TEXT_X: i64 = 10;

    /// Shadow offset is font size divided by this (at least 1px)
    pub const SHADOW_DIVISOR: u32 = 20;
}

/// Output encoding
pub mod output {
    /// JPEG quality for the composited wallpaper
    pub const DEFAULT_JPEG_QUALITY: u8 = 95;

    /// Write buffer for the encoder
    pub const WRITE_BUFFER_SIZE: usize = 512 * 1024;
}

/// Identity enumeration
pub mod identity {
    /// IPv6 link-local prefix excluded from the IP list
    pub const LINK_LOCAL_PREFIX: &str = "fe80";

    /// Hostname used when the OS does not report one
    pub const UNKNOWN_HOSTNAME: &str = "Unknown";

    /// PNP device id prefixes of hardware-backed adapters
    #[cfg(windows)]
    pub const PHYSICAL_PNP_PREFIXES: [&str; 2] = ["PCI", "USB"];

    /// Sysfs root for network interfaces
    #[cfg(unix)]
    pub const SYSFS_NET: &str = "/sys/class/net";
}

/// Font lookup
pub mod fonts {
    /// Family requested through fontconfig when nothing is configured
    pub const DEFAULT_FAMILY: &str = "DejaVu Sans Bold";

    /// Well-known bold sans-serif files, tried in order
    #[cfg(unix)]
    pub const SYSTEM_FONT_PATHS: &[&str] = &[
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
        "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
        "/usr/share/fonts/liberation/LiberationSans-Bold.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    ];

    #[cfg(windows)]
    pub const SYSTEM_FONT_PATHS: &[&str] = &[
        r"C:\Windows\Fonts\arialbd.ttf",
        r"C:\Windows\Fonts\segoeuib.ttf",
        r"C:\Windows\Fonts\simhei.ttf",
        r"C:\Windows\Fonts\arial.ttf",
    ];

    #[cfg(not(any(unix, windows)))]
    pub const SYSTEM_FONT_PATHS: &[&str] = &[];
}

/// Interactive front-end
pub mod interactive {
    /// Seconds shown before the program exits after success
    pub const EXIT_COUNTDOWN_SECS: u64 = 5;
}

/// Configuration validation ranges
pub mod validation {
    pub const MIN_JPEG_QUALITY: u8 = 1;
    pub const MAX_JPEG_QUALITY: u8 = 100;
}
