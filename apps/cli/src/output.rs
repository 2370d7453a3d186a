//! Rendering of the progress channel on the terminal.

use std::time::Duration;

use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use boardshelf_core::{ProgressEvent, StepStatus};

/// How a run is shown to the user.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Progress bar plus a one-line summary.
    Progress,
    /// Every progress event as a JSON line on stdout.
    Events,
    /// Only the final run report, as JSON.
    Json,
}

/// Consume events until the producer closes the channel.
pub(crate) async fn render(mut rx: mpsc::Receiver<ProgressEvent>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Events => {
            while let Some(event) = rx.recv().await {
                println!("{}", serde_json::to_string(&event)?);
            }
        }
        OutputFormat::Json => while rx.recv().await.is_some() {},
        OutputFormat::Progress => {
            let mut bar = RunProgress::new();
            while let Some(event) = rx.recv().await {
                bar.apply(&event);
            }
            bar.finish();
        }
    }
    Ok(())
}

/// indicatif bar tracking entries through a run.
struct RunProgress {
    bar: ProgressBar,
    current: String,
}

impl RunProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{pos}/{len}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Self {
            bar,
            current: String::new(),
        }
    }

    fn apply(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Start { total, .. } => {
                self.bar.set_length(*total as u64);
            }
            ProgressEvent::EntityStart { name, .. } => {
                self.current = name.clone();
                self.bar.set_message(name.clone());
            }
            ProgressEvent::Step { stage, status, error, .. } => match status {
                StepStatus::Running => {
                    self.bar.set_message(format!("{}: {stage}", self.current));
                }
                StepStatus::Complete => {}
                StepStatus::Error => {
                    let reason = error.as_deref().unwrap_or("unknown error");
                    self.bar
                        .println(format!("  ✗ {} failed at {stage}: {reason}", self.current));
                }
            },
            ProgressEvent::EntityComplete {
                success,
                previous_state,
                new_state,
                ..
            } => {
                if *success {
                    self.bar.println(format!(
                        "  ✓ {} ({previous_state} → {new_state})",
                        self.current
                    ));
                }
                self.bar.inc(1);
            }
            ProgressEvent::EntitySkip { reason, .. } => {
                self.bar
                    .println(format!("  - {} skipped: {reason}", self.current));
                self.bar.inc(1);
            }
            ProgressEvent::Complete {
                total,
                processed,
                skipped,
                errors,
                duration_ms,
                error,
            } => {
                self.bar.finish_and_clear();
                if let Some(error) = error {
                    println!("Run failed: {error}");
                }
                println!(
                    "{total} entries: {processed} processed, {skipped} skipped, {errors} errors ({:.1}s)",
                    *duration_ms as f64 / 1000.0
                );
            }
        }
    }

    fn finish(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
