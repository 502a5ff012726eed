//! Font discovery via fontconfig
//!
//! Resolve "Family Style" names to font files and list installed fonts

use anyhow::{Context, Result};
use fontconfig::{Fontconfig, Pattern};
use std::collections::BTreeSet;
use std::ffi::CString;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Style suffixes recognised at the end of a font name.
/// Longer styles come first so "SemiBold Italic" is not read as "Bold Italic".
const KNOWN_STYLES: &[&str] = &[
    "Condensed Bold Italic",
    "Condensed Bold",
    "SemiBold Italic",
    "Bold Italic",
    "Bold Oblique",
    "Black Italic",
    "Medium Italic",
    "Light Italic",
    "ExtraBold",
    "ExtraLight",
    "SemiBold",
    "Italic",
    "Oblique",
    "Bold",
    "Light",
    "Medium",
    "Black",
    "Regular",
    "Condensed",
];

/// Split `"DejaVu Sans Bold"` into `("DejaVu Sans", Some("Bold"))`.
///
/// A style only counts when it ends the name and follows a space.
pub fn split_family_style(font_name: &str) -> (&str, Option<&'static str>) {
    let font_name = font_name.trim();

    for style in KNOWN_STYLES {
        let Some(prefix) = font_name.strip_suffix(style) else {
            continue;
        };
        if prefix.ends_with(' ') && !prefix.trim().is_empty() {
            return (prefix.trim(), Some(style));
        }
    }

    (font_name, None)
}

/// Installed fonts as "Family Style" names, sorted, `Regular` omitted
pub fn list_fonts() -> Result<Vec<String>> {
    let fc = Fontconfig::new().context("Failed to initialize fontconfig")?;
    let pattern = Pattern::new(&fc);
    let font_set = fontconfig::list_fonts(&pattern, None);

    let mut fonts = BTreeSet::new();
    for font in font_set.iter() {
        let Some(family) = font.get_string(fontconfig::FC_FAMILY) else {
            continue;
        };
        let name = match font.get_string(fontconfig::FC_STYLE) {
            Some("Regular") | None => family.to_string(),
            Some(style) => format!("{family} {style}"),
        };
        fonts.insert(name);
    }

    info!(count = fonts.len(), "Discovered fonts via fontconfig");
    Ok(fonts.into_iter().collect())
}

/// Font file for a family name with optional trailing style
pub fn find_font_path(font_name: &str) -> Result<PathBuf> {
    let fc = Fontconfig::new().context("Failed to initialize fontconfig")?;
    let (family, style) = split_family_style(font_name);
    debug!(font = font_name, family, style = ?style, "Parsed font name");

    let mut pattern = Pattern::new(&fc);
    let family_cstr = CString::new(family).with_context(|| format!("Invalid family name: {family}"))?;
    pattern.add_string(fontconfig::FC_FAMILY, &family_cstr);

    if let Some(style) = style {
        let style_cstr = CString::new(style).with_context(|| format!("Invalid style name: {style}"))?;
        pattern.add_string(fontconfig::FC_STYLE, &style_cstr);
    }

    let matched = pattern.font_match();

    // fontconfig always returns something; reject substitutes from another family
    if let Some(matched_family) = matched.get_string(fontconfig::FC_FAMILY) {
        if !matched_family.eq_ignore_ascii_case(family) {
            warn!(requested = font_name, matched_family, "Requested font is not installed");
            anyhow::bail!("Font '{font_name}' not found, fontconfig offered '{matched_family}'");
        }
    }

    let path = matched
        .filename()
        .map(PathBuf::from)
        .with_context(|| format!("No font file found for '{font_name}'"))?;

    if !path.exists() {
        anyhow::bail!("Font file '{}' does not exist", path.display());
    }

    debug!(font = font_name, path = %path.display(), "Resolved font path");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_family_and_style() {
        assert_eq!(split_family_style("DejaVu Sans Bold"), ("DejaVu Sans", Some("Bold")));
        assert_eq!(
            split_family_style("Roboto Mono SemiBold Italic"),
            ("Roboto Mono", Some("SemiBold Italic"))
        );
        assert_eq!(split_family_style("Liberation Sans"), ("Liberation Sans", None));
    }

    #[test]
    fn test_style_must_be_a_separate_word() {
        assert_eq!(split_family_style("Arialbold"), ("Arialbold", None));
        assert_eq!(split_family_style("Bold"), ("Bold", None));
    }

    #[test]
    fn test_find_common_fonts() {
        // Only checks shape; which fonts exist depends on the machine
        for name in ["DejaVu Sans Bold", "Liberation Sans", "Monospace"] {
            if let Ok(path) = find_font_path(name) {
                assert!(path.is_absolute(), "{name} -> {}", path.display());
            }
        }
    }
}
