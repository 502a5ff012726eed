#![cfg_attr(not(windows), forbid(unsafe_code))]

mod cli;
mod config;
mod constants;
mod error;
mod identity;
mod interactive;
mod operation;
mod platform;
mod wallpaper;
mod watermark;
mod worker;

use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use tracing::{Level as TraceLevel, debug, error, warn};
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Mode};
use config::Settings;
use error::WatermarkError;
use identity::NativeIdentityProvider;
use operation::AppContext;
use platform::NativeDesktop;

fn parse_level(level: &str) -> TraceLevel {
    match level.trim().to_lowercase().as_str() {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    }
}

fn run(cli: &Cli, mode: Mode, config_path: &Path) -> Result<()> {
    let settings = Settings::load(config_path).unwrap_or_else(|e| {
        warn!(path = %config_path.display(), error = %format!("{e:#}"), "Unusable config, using defaults");
        Settings::default()
    });

    let context = Arc::new(AppContext::new(
        settings,
        Arc::new(NativeDesktop::new()),
        Arc::new(NativeIdentityProvider),
    ));
    let options = cli.options();
    let log_status = |line: &str| debug!(status = line);

    match mode {
        Mode::Silent => {
            context.watermark(&options, &log_status)?;
        }
        Mode::Apply => {
            let output = context.watermark(&options, &log_status)?;
            println!("Watermark applied: {}", output.display());
        }
        Mode::Restore => {
            let backup = context.restore(&log_status)?;
            println!("Wallpaper restored from {}", backup.display());
        }
        Mode::Interactive => interactive::run(context, options)?,
        Mode::Show => {
            let text = context.preview_text(&options).ok_or(WatermarkError::EmptyWatermark)?;
            println!("{text}");
        }
        #[cfg(unix)]
        Mode::Fonts => {
            for font in watermark::list_fonts()? {
                println!("{font}");
            }
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse_normalized();
    let config_path = cli.config.clone().unwrap_or_else(Settings::default_path);

    // LOG_LEVEL wins over the configured level
    let log_level = std::env::var(constants::config::LOG_LEVEL_ENV)
        .ok()
        .or_else(|| Settings::peek_log_level(&config_path))
        .unwrap_or_else(|| "info".to_string());

    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(&log_level))
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install logger: {e}");
    }

    let mode = cli.mode(std::io::stdin().is_terminal());
    debug!(?mode, config = %config_path.display(), "Starting");

    match run(&cli, mode, &config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), ?mode, "Operation failed");
            if mode == Mode::Silent {
                // Silent runs come from login scripts; never fail them
                ExitCode::SUCCESS
            } else {
                eprintln!("Error: {e:#}");
                ExitCode::FAILURE
            }
        }
    }
}
