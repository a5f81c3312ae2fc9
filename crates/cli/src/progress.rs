//! Terminal progress bar for uploads.

use castup_client::{ProgressReporter, ProgressUpdate};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Renders upload progress as a percentage bar on stderr. Hidden when
/// stderr is not a terminal.
pub struct BarReporter {
    bar: ProgressBar,
}

impl BarReporter {
    pub fn new(label: &str) -> Self {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} {prefix} [{bar:40.cyan/bright.black}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#-");
        bar.set_style(style);
        bar.set_prefix(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

impl ProgressReporter for BarReporter {
    fn report(&self, update: ProgressUpdate) {
        self.bar.set_position(u64::from(update.percent));
        self.bar
            .set_message(format!("chunk {}/{}", update.chunk, update.total_chunks));
    }
}
