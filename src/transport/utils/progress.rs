use std::cell::Cell;
use std::io::{self, Write};

use super::size::format_size;

/// Prints percentage updates for a streaming transfer to stderr, keeping
/// stdout free for results.
pub struct ConsoleProgressReporter {
    label: String,
    total_bytes: u64,
    step_bytes: u64,
    next_report: Cell<u64>,
}

impl ConsoleProgressReporter {
    pub fn new(label: impl Into<String>, total_bytes: u64, step_bytes: u64) -> Self {
        let step_bytes = step_bytes.max(1);
        Self {
            label: label.into(),
            total_bytes,
            step_bytes,
            next_report: Cell::new(step_bytes),
        }
    }

    /// Print progress once another `step_bytes` have been processed.
    pub fn maybe_report(&self, processed_bytes: u64) {
        if self.total_bytes == 0 || processed_bytes < self.next_report.get() {
            return;
        }
        self.next_report.set(processed_bytes + self.step_bytes);
        eprint!(
            "\r {}: {}% of {}",
            self.label,
            percent(processed_bytes, self.total_bytes),
            format_size(self.total_bytes)
        );
        let _ = io::stderr().flush();
    }

    /// Terminate the progress line if anything was printed.
    pub fn finish(&self) {
        if self.next_report.get() > self.step_bytes {
            eprintln!();
        }
    }
}

fn percent(processed: u64, total: u64) -> u32 {
    ((processed.min(total) as f64 / total as f64) * 100.0) as u32
}
