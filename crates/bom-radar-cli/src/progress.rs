use bom_radar_core::ProgressReporter;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// CLI progress reporter: one spinner per phase, a check line when it ends.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn start_spinner(&self, message: String) {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        pb.set_style(style);
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));

        let mut slot = self.slot();
        if let Some(old) = slot.take() {
            old.finish_and_clear();
        }
        *slot = Some(pb);
    }

    fn finish_spinner(&self) {
        if let Some(pb) = self.slot().take() {
            pb.finish_and_clear();
        }
    }

    fn println(&self, line: String) {
        match self.slot().as_ref() {
            Some(pb) => pb.println(line),
            None => eprintln!("{}", line),
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_load_start(&self, archive: &str) {
        self.start_spinner(format!("Loading {}...", archive));
    }

    fn on_entry_skipped(&self, entry: &str, reason: &str) {
        self.println(format!("  \x1b[33m!\x1b[0m Skipped {}: {}", entry, reason));
    }

    fn on_load_complete(&self, archive: &str, records: usize, files: usize, secs: f64) {
        self.finish_spinner();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Loaded {}: {} records from {} files in {:.2}s",
            archive, records, files, secs
        );
    }

    fn on_analysis_start(&self) {
        self.start_spinner("Computing metrics and mining rules...".to_string());
    }

    fn on_analysis_complete(&self, pairs: usize, rules: usize, duration_secs: f64) {
        self.finish_spinner();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Analysis complete: {} pairs, {} rules in {:.2}s",
            pairs, rules, duration_secs
        );
    }

    fn on_report_written(&self, path: &str, duration_secs: f64) {
        eprintln!(
            "  \x1b[32m✓\x1b[0m Report written to {} in {:.2}s",
            path, duration_secs
        );
    }

    fn on_merge_start(&self) {
        self.start_spinner("Merging archives...".to_string());
    }

    fn on_merge_complete(&self, entries_written: usize, duration_secs: f64) {
        self.finish_spinner();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Merge complete: {} historical entries in {:.2}s",
            entries_written, duration_secs
        );
    }
}
