use indicatif::{ProgressBar, ProgressStyle};

use crate::bootstrap::logger::{attach_progress_bar, detach_progress_bar};

/// Counters for the human readable progress report.
#[derive(Debug)]
pub struct Progress {
    pub total: usize,
    pub current: usize,
    pub succeeded: usize,
    pub failed: usize,
    bar: ProgressBar,
}

impl Progress {
    pub fn new(total: usize, show_bar: bool) -> Self {
        let bar = if show_bar {
            let bar = ProgressBar::new(total as u64);
            if let Ok(style) =
                ProgressStyle::with_template("{bar:40.cyan/blue} Image {pos} of {len} {msg}")
            {
                bar.set_style(style);
            }
            attach_progress_bar(bar.clone());
            bar
        } else {
            ProgressBar::hidden()
        };
        Self {
            total,
            current: 0,
            succeeded: 0,
            failed: 0,
            bar,
        }
    }

    /// Count one item leaving `handle`.
    pub fn record(&mut self, succeeded: bool) {
        self.current += 1;
        if succeeded {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.bar.set_position(self.current as u64);
    }

    pub fn describe(&self, filename: &str) {
        self.bar.set_message(filename.to_string());
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.total
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
        detach_progress_bar();
    }
}
