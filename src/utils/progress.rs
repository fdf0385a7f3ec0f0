//! Progress bar utilities using indicatif
//!
//! Wraps indicatif's `ProgressBar` so extraction and resolution report
//! progress the same way. A disabled bar is a no-op, which lets callers
//! thread a single value through regardless of `--progress`.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};

/// Progress bar wrapper for displaying processing status
pub struct ProgressBar {
    bar: IndicatifBar,
}

impl ProgressBar {
    /// Create a new progress bar with known total
    pub fn new(total: usize, label: &str) -> Self {
        let bar = IndicatifBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{msg} [{bar:40.cyan/blue}] {percent:>3}% ({pos}/{len}) ({per_sec}) {eta}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█░"),
        );
        bar.set_message(label.to_string());

        Self { bar }
    }

    /// Bar that never draws.
    pub fn hidden() -> Self {
        Self {
            bar: IndicatifBar::hidden(),
        }
    }

    /// Shown bar when `enabled`, hidden otherwise.
    pub fn maybe(enabled: bool, total: usize, label: &str) -> Self {
        if enabled {
            Self::new(total, label)
        } else {
            Self::hidden()
        }
    }

    /// Increment progress by `n`
    pub fn inc(&self, n: usize) {
        self.bar.inc(n as u64);
    }

    /// Current position
    pub fn position(&self) -> usize {
        self.bar.position() as usize
    }

    /// Finish the progress bar
    pub fn finish(&self) {
        self.bar.finish();
    }
}
