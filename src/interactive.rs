//! Menu-driven terminal front-end
//!
//! Field toggles and a remark prompt, then an action menu. Apply and restore
//! run on the background worker while status lines are printed; success
//! counts down and exits, failure returns to the menu.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use console::{Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, MultiSelect, Select};
use tracing::{info, warn};

use crate::constants::interactive::EXIT_COUNTDOWN_SECS;
use crate::operation::AppContext;
use crate::watermark::WatermarkOptions;
use crate::worker::{Worker, WorkerEvent};

const FIELDS: [&str; 3] = ["Computer name", "IP addresses", "MAC addresses"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Apply,
    Clear,
    Restore,
    Quit,
}

impl Action {
    const ALL: [Action; 4] = [Action::Apply, Action::Clear, Action::Restore, Action::Quit];

    fn label(self) -> &'static str {
        match self {
            Action::Apply => "Apply watermark",
            Action::Clear => "Clear selections",
            Action::Restore => "Restore backup",
            Action::Quit => "Quit",
        }
    }
}

/// Rebuild the options snapshot from the menu answers
fn options_from(selected: &[usize], remark: &str) -> WatermarkOptions {
    WatermarkOptions {
        include_hostname: selected.contains(&0),
        include_ip: selected.contains(&1),
        include_mac: selected.contains(&2),
        remark: remark.trim().to_string(),
    }
}

/// Run the menu until an operation succeeds or the user quits
pub fn run(context: Arc<AppContext>, initial: WatermarkOptions) -> Result<()> {
    let theme = ColorfulTheme::default();
    let worker = Worker::new();
    let mut options = initial;

    loop {
        println!();
        let selected = MultiSelect::with_theme(&theme)
            .with_prompt("Fields to include (space toggles)")
            .items(&FIELDS)
            .defaults(&[options.include_hostname, options.include_ip, options.include_mac])
            .interact()?;

        let remark: String = Input::with_theme(&theme)
            .with_prompt("Remark (optional)")
            .allow_empty(true)
            .with_initial_text(options.remark.clone())
            .interact_text()?;

        options = options_from(&selected, &remark);

        let labels: Vec<&str> = Action::ALL.iter().map(|a| a.label()).collect();
        let choice = Select::with_theme(&theme)
            .with_prompt("Action")
            .items(&labels)
            .default(0)
            .interact()?;

        let done = match Action::ALL[choice] {
            Action::Apply => {
                if options.is_empty() {
                    println!("{}", style("Select at least one field or enter a remark").yellow());
                    continue;
                }
                let context = Arc::clone(&context);
                let snapshot = options.clone();
                run_on_worker(&worker, move |status| {
                    context
                        .watermark(&snapshot, &|line| status.report(line))
                        .map(|path| format!("Watermark applied: {}", path.display()))
                        .map_err(|e| e.to_string())
                })?
            }
            Action::Clear => {
                options = WatermarkOptions::cleared();
                false
            }
            Action::Restore => {
                let context = Arc::clone(&context);
                run_on_worker(&worker, move |status| {
                    context
                        .restore(&|line| status.report(line))
                        .map(|path| format!("Wallpaper restored from {}", path.display()))
                        .map_err(|e| e.to_string())
                })?
            }
            Action::Quit => return Ok(()),
        };

        if done {
            countdown(EXIT_COUNTDOWN_SECS)?;
            return Ok(());
        }
    }
}

/// Run `job` on the worker and print its events; `true` on success
fn run_on_worker<F>(worker: &Worker, job: F) -> Result<bool>
where
    F: FnOnce(&crate::worker::StatusReporter) -> Result<String, String> + Send + 'static,
{
    let events = match worker.spawn(job) {
        Ok(events) => events,
        Err(e) => {
            println!("{}", style(e).red());
            return Ok(false);
        }
    };

    for event in events {
        match event {
            WorkerEvent::Started => println!("{}", style("Working...").dim()),
            WorkerEvent::Status(line) => println!("  {}", style(line).dim()),
            WorkerEvent::Finished(Ok(message)) => {
                info!(%message, "Operation succeeded");
                println!("{}", style(message).green());
                return Ok(true);
            }
            WorkerEvent::Finished(Err(message)) => {
                warn!(%message, "Operation failed");
                println!("{} {}", style("Error:").red().bold(), message);
                return Ok(false);
            }
        }
    }

    // Channel closed without Finished: the job panicked
    println!("{}", style("Error: operation aborted unexpectedly").red().bold());
    Ok(false)
}

fn countdown(seconds: u64) -> Result<()> {
    let term = Term::stdout();
    for remaining in (1..=seconds).rev() {
        term.clear_line()?;
        term.write_str(&format!("Done, exiting in {remaining} s"))?;
        thread::sleep(Duration::from_secs(1));
    }
    term.clear_line()?;
    Ok(())
}
