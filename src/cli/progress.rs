//! Progress reporting on stderr.

use indicatif::{ProgressBar, ProgressStyle};

use crate::services::ProgressMonitor;

/// Spinner plus bar for the engine's phases; hidden without a terminal.
pub struct BarMonitor {
    bar: ProgressBar,
}

impl BarMonitor {
    pub fn new() -> Self {
        let bar = if console::user_attended_stderr() { ProgressBar::new(0) } else { ProgressBar::hidden() };
        if let Ok(style) = ProgressStyle::with_template("{spinner} {prefix} [{bar:30}] {pos}/{len} {wide_msg}") {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar }
    }
}

impl Default for BarMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressMonitor for BarMonitor {
    fn begin_task(&mut self, name: &str, total_work: usize) {
        self.bar.reset();
        self.bar.set_length(total_work as u64);
        self.bar.set_prefix(name.to_string());
    }

    fn sub_task(&mut self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn worked(&mut self, units: usize) {
        self.bar.inc(units as u64);
    }

    fn done(&mut self) {
        self.bar.set_message("");
    }

    fn is_cancelled(&self) -> bool {
        false
    }
}

impl Drop for BarMonitor {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}
