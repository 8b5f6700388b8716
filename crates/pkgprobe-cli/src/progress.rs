//! Verbose progress output using indicatif.

use indicatif::{ProgressBar, ProgressStyle};
use pkgprobe::engine::{EventListener, Stage};
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

/// Listener that shows a spinner per running scenario and a line per verdict on stderr.
#[derive(Default)]
pub struct VerboseProgress {
    spinner: Mutex<Option<ProgressBar>>,
}

impl VerboseProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn update_spinner(&self, stage: Stage, message: &str) {
        let Ok(mut spinner) = self.spinner.lock() else {
            return;
        };
        let pb = spinner.get_or_insert_with(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        pb.set_message(format!("{stage}: {message}"));
    }

    fn finish(&self, stage: Stage, message: &str) {
        if let Ok(mut spinner) = self.spinner.lock() {
            if let Some(pb) = spinner.take() {
                pb.finish_and_clear();
            }
        }
        let icon = match stage {
            Stage::Passed => "\x1b[32m✓\x1b[0m",
            Stage::Violated => "\x1b[31m✗\x1b[0m",
            _ => "\x1b[31m!\x1b[0m",
        };
        // stderr keeps stdout clean for --json
        let _ = writeln!(std::io::stderr(), "  {icon} {message}");
    }
}

impl EventListener for VerboseProgress {
    fn on_event(&self, stage: Stage, message: &str) {
        match stage {
            Stage::Setup | Stage::Execute | Stage::Validate => self.update_spinner(stage, message),
            Stage::Passed | Stage::Violated | Stage::Failed => self.finish(stage, message),
        }
    }
}
