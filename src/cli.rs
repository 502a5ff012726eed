//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::watermark::WatermarkOptions;

#[derive(Debug, Parser)]
#[command(name = "wallpaper-watermark", version)]
#[command(about = "Stamp computer name, IP and MAC addresses onto the desktop wallpaper", long_about = None)]
pub struct Cli {
    /// Silent mode: all fields, no remark, no prompts, always exit 0
    #[arg(short, long)]
    pub quiet: bool,

    /// Omit the computer name
    #[arg(long)]
    pub no_hostname: bool,

    /// Omit IP addresses
    #[arg(long)]
    pub no_ip: bool,

    /// Omit MAC addresses
    #[arg(long)]
    pub no_mac: bool,

    /// Remark line; repeat for several lines
    #[arg(short, long = "remark", value_name = "TEXT")]
    pub remark: Vec<String>,

    /// Settings file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Watermark and apply using the flags above.
    Apply,

    /// Re-apply the wallpaper saved before the last watermark.
    Restore,

    /// Menu-driven terminal front-end (default when attached to a terminal).
    Interactive,

    /// Print the watermark text and exit.
    Show,

    /// List installed font names usable as `font_family`.
    #[cfg(unix)]
    Fonts,
}

/// What the program does after parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Silent,
    Apply,
    Restore,
    Interactive,
    Show,
    #[cfg(unix)]
    Fonts,
}

impl Cli {
    /// Parse process arguments, accepting the legacy `q` and `/q` switches
    pub fn parse_normalized() -> Self {
        Self::parse_from(normalize_args(std::env::args()))
    }

    /// `--quiet` wins unless another command was named explicitly; without a
    /// command, a terminal gets the menu and anything else applies directly.
    pub fn mode(&self, interactive_terminal: bool) -> Mode {
        match self.cmd {
            None | Some(Command::Apply) if self.quiet => Mode::Silent,
            None if interactive_terminal => Mode::Interactive,
            None | Some(Command::Apply) => Mode::Apply,
            Some(Command::Restore) => Mode::Restore,
            Some(Command::Interactive) => Mode::Interactive,
            Some(Command::Show) => Mode::Show,
            #[cfg(unix)]
            Some(Command::Fonts) => Mode::Fonts,
        }
    }

    /// Options snapshot for this invocation; silent mode ignores field flags
    pub fn options(&self) -> WatermarkOptions {
        if self.mode(false) == Mode::Silent {
            return WatermarkOptions::default();
        }
        WatermarkOptions {
            include_hostname: !self.no_hostname,
            include_ip: !self.no_ip,
            include_mac: !self.no_mac,
            remark: self.remark.join("\n").trim().to_string(),
        }
    }
}

/// Rewrite `q` and `/q` (any case) to `--quiet`, except as a remark value
pub fn normalize_args(args: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out = Vec::new();
    let mut value_expected = false;

    for arg in args {
        let is_legacy_quiet = !out.is_empty()
            && !value_expected
            && (arg.eq_ignore_ascii_case("q") || arg.eq_ignore_ascii_case("/q"));

        value_expected = matches!(arg.as_str(), "-r" | "--remark" | "--config");
        out.push(if is_legacy_quiet { "--quiet".to_string() } else { arg });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let args = std::iter::once("wallpaper-watermark")
            .chain(args.iter().copied())
            .map(String::from);
        Cli::parse_from(normalize_args(args))
    }

    #[test]
    fn test_legacy_quiet_spellings() {
        for flag in ["q", "/q", "/Q", "-q", "--quiet"] {
            let cli = parse(&[flag]);
            assert!(cli.quiet, "{flag}");
            assert_eq!(cli.mode(true), Mode::Silent);
        }
    }

    #[test]
    fn test_remark_value_q_is_not_quiet() {
        let cli = parse(&["-r", "q"]);

        assert!(!cli.quiet);
        assert_eq!(cli.options().remark, "q");
    }

    #[test]
    fn test_program_name_is_never_rewritten() {
        assert_eq!(normalize_args(["q".to_string()]), vec!["q"]);
    }

    #[test]
    fn test_default_mode_depends_on_terminal() {
        let cli = parse(&[]);

        assert_eq!(cli.mode(true), Mode::Interactive);
        assert_eq!(cli.mode(false), Mode::Apply);
    }

    #[test]
    fn test_explicit_commands() {
        assert_eq!(parse(&["restore"]).mode(true), Mode::Restore);
        assert_eq!(parse(&["show"]).mode(false), Mode::Show);
        assert_eq!(parse(&["apply"]).mode(true), Mode::Apply);
        assert_eq!(parse(&["interactive"]).mode(false), Mode::Interactive);
        // Quiet only shapes the apply path
        assert_eq!(parse(&["-q", "restore"]).mode(true), Mode::Restore);
    }

    #[test]
    fn test_flags_build_options() {
        let cli = parse(&["--no-mac", "-r", "asset 42", "--remark", "floor 3", "apply"]);

        assert_eq!(
            cli.options(),
            WatermarkOptions {
                include_hostname: true,
                include_ip: true,
                include_mac: false,
                remark: "asset 42\nfloor 3".to_string(),
            }
        );
    }

    #[test]
    fn test_silent_mode_uses_all_fields_without_remark() {
        let cli = parse(&["/q", "--no-ip", "-r", "ignored"]);

        assert_eq!(cli.options(), WatermarkOptions::default());
    }

    #[test]
    fn test_config_path() {
        let cli = parse(&["--config", "/tmp/wm.json", "show"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/wm.json")));
    }
}
