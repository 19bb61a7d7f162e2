//! Progress display for batch experiment runs

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// One progress bar across all instance files of a batch
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a bar for the given number of files
    pub fn new(file_count: usize) -> Self {
        let bar = ProgressBar::new(file_count as u64);
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏ ");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(250));
        Self { bar }
    }

    /// Show the file currently being solved
    pub fn start_file(&self, path: &Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.bar.set_message(name);
    }

    /// Mark one file as done
    pub fn file_done(&self) {
        self.bar.inc(1);
    }

    /// Finish and clear the bar
    pub fn finish(&self) {
        self.bar.finish_with_message("done");
    }
}
