/// Trait for reporting run progress.
///
/// The CLI implements it with indicatif spinners. All methods have default
/// no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_load_start(&self, _archive: &str) {}
    fn on_entry_skipped(&self, _entry: &str, _reason: &str) {}
    fn on_load_complete(&self, _archive: &str, _records: usize, _files: usize, _secs: f64) {}
    fn on_analysis_start(&self) {}
    fn on_analysis_complete(&self, _pairs: usize, _rules: usize, _duration_secs: f64) {}
    fn on_report_written(&self, _path: &str, _duration_secs: f64) {}
    fn on_merge_start(&self) {}
    fn on_merge_complete(&self, _entries_written: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
