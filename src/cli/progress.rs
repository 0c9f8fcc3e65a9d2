//! Single-line console progress for translation jobs

use indicatif::{ProgressBar, ProgressStyle};

use crate::core::errors::SyncError;
use crate::core::poller::{PollState, ProgressSink};

/// Progress bar redrawn in place on every status update
#[derive(Debug)]
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    pub fn new(label: &str) -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        bar.set_message(label.to_string());
        Self { bar }
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_progress(&mut self, completed: u64, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(completed);
    }

    fn on_finished(&mut self, state: PollState, error: Option<&SyncError>) {
        match error {
            Some(e) => self.bar.abandon_with_message(format!("{}: {}", state, e)),
            None => self.bar.finish_with_message(state.to_string()),
        }
    }
}
