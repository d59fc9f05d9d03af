use std::time::Duration;

use canopy_core::pipeline::{PipelineStage, ProgressReporter};
use indicatif::{ProgressBar, ProgressStyle};

/// Drives a single indicatif bar across pipeline stages.
///
/// Stages with a known item count get a bar, the rest a spinner.
pub struct BarReporter {
    bar: ProgressBar,
}

impl BarReporter {
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::new(0),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("Done");
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{msg:20} [{bar:40}] {pos}/{len}")
        .map(|s| s.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{msg:20} {spinner}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        self.bar.reset();
        match total_items {
            Some(total) => {
                self.bar.disable_steady_tick();
                self.bar.set_style(bar_style());
                self.bar.set_length(total as u64);
            }
            None => {
                self.bar.set_style(spinner_style());
                self.bar.enable_steady_tick(Duration::from_millis(100));
            }
        }
        self.bar.set_message(stage.to_string());
    }

    fn advance(&self, items_done: usize) {
        self.bar.set_position(items_done as u64);
    }

    fn finish_stage(&self) {
        self.bar.disable_steady_tick();
    }
}

impl Default for BarReporter {
    fn default() -> Self {
        Self::new()
    }
}
