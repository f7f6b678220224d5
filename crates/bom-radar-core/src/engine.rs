use chrono::{DateTime, Local};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::analysis::{self, Analysis, AnalysisSettings};
use crate::archive::{self, MergeSummary};
use crate::config::AppConfig;
use crate::error::Error;
use crate::loader::{load_critical_items, BomLoader, LoadOutcome, SkippedEntry};
use crate::model::{CriticalSet, SourceType};
use crate::progress::ProgressReporter;
use crate::report;

/// Which side effects a run performs after the analysis.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub write_report: bool,
    pub merge: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            write_report: true,
            merge: true,
        }
    }
}

/// Everything read from disk for one run.
#[derive(Debug)]
pub struct LoadedCorpus {
    pub historical: LoadOutcome,
    pub incoming: LoadOutcome,
    pub critical: CriticalSet,
    pub duration: Duration,
}

impl LoadedCorpus {
    pub fn skipped(&self) -> Vec<SkippedEntry> {
        self.historical
            .skipped
            .iter()
            .chain(&self.incoming.skipped)
            .cloned()
            .collect()
    }
}

#[derive(Debug)]
pub struct RunResult {
    pub started_at: DateTime<Local>,
    pub load_duration: Duration,
    pub analysis_duration: Duration,
    pub report_duration: Duration,
    pub merge_duration: Duration,
    pub historical_records: usize,
    pub incoming_records: usize,
    pub total_files: usize,
    pub pairs: usize,
    pub new_pairs: usize,
    pub rules: usize,
    pub skipped: Vec<SkippedEntry>,
    pub merge: Option<MergeSummary>,
    pub analysis: Analysis,
}

pub struct RunEngine {
    config: AppConfig,
}

impl RunEngine {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn with_report_path(mut self, path: &Path) -> Self {
        self.config.report_path = path.to_path_buf();
        self
    }

    pub fn with_archives(mut self, historical: &Path, incoming: &Path) -> Self {
        self.config.historical_archive = historical.to_path_buf();
        self.config.incoming_archive = incoming.to_path_buf();
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn loader(&self) -> Result<BomLoader, Error> {
        BomLoader::from_config(&self.config)
    }

    /// Read the critical-item list and both archives.
    pub fn load(&self, reporter: &dyn ProgressReporter) -> Result<LoadedCorpus, Error> {
        self.config.validate()?;
        let loader = self.loader()?;
        let start = Instant::now();

        let critical = match &self.config.critical_items {
            Some(path) => load_critical_items(path, &self.config.columns.critical_item)?,
            None => CriticalSet::default(),
        };
        debug!("{} critical items", critical.len());

        let historical = load_one(
            &loader,
            &self.config.historical_archive,
            SourceType::Historical,
            reporter,
        )?;
        let incoming = load_one(
            &loader,
            &self.config.incoming_archive,
            SourceType::Incoming,
            reporter,
        )?;

        Ok(LoadedCorpus {
            historical,
            incoming,
            critical,
            duration: start.elapsed(),
        })
    }

    pub fn analyze(
        &self,
        corpus: &LoadedCorpus,
        reporter: &dyn ProgressReporter,
    ) -> Result<Analysis, Error> {
        reporter.on_analysis_start();
        let start = Instant::now();
        let settings = AnalysisSettings {
            support_threshold: self.config.support_threshold,
            mining: self.config.mining.clone(),
        };
        let analysis = analysis::analyze(
            &corpus.historical.records,
            &corpus.incoming.records,
            &corpus.critical,
            &settings,
        )?;
        reporter.on_analysis_complete(
            analysis.metrics.len(),
            analysis.mining.rules.len(),
            start.elapsed().as_secs_f64(),
        );
        Ok(analysis)
    }

    /// Run the full pipeline:
    /// 1. Load critical items, historical and incoming archives
    /// 2. Compute metrics, statuses and rules
    /// 3. Write the report
    /// 4. Fold the incoming batch into the historical archive
    pub fn run(
        &self,
        reporter: &dyn ProgressReporter,
        options: &RunOptions,
    ) -> Result<RunResult, Error> {
        let started_at = Local::now();
        info!("Run started at {}", started_at.format("%Y-%m-%d %H:%M:%S"));

        let corpus = self.load(reporter)?;
        let load_duration = corpus.duration;

        let analysis_start = Instant::now();
        let analysis = self.analyze(&corpus, reporter)?;
        let analysis_duration = analysis_start.elapsed();
        debug!("Analysis completed in {:.2}s", analysis_duration.as_secs_f64());

        let skipped = corpus.skipped();

        let report_start = Instant::now();
        if options.write_report {
            report::write_report(&self.config.report_path, &analysis, &skipped)?;
            reporter.on_report_written(
                &self.config.report_path.display().to_string(),
                report_start.elapsed().as_secs_f64(),
            );
        }
        let report_duration = report_start.elapsed();

        let merge_start = Instant::now();
        let merge = if options.merge {
            reporter.on_merge_start();
            let summary = archive::merge_archives(
                &self.config.historical_archive,
                &corpus.historical,
                &self.config.incoming_archive,
                &corpus.incoming,
                &self.loader()?,
            )?;
            reporter.on_merge_complete(
                summary.historical_entries,
                merge_start.elapsed().as_secs_f64(),
            );
            Some(summary)
        } else {
            info!("Archive merge disabled");
            None
        };
        let merge_duration = merge_start.elapsed();

        Ok(RunResult {
            started_at,
            load_duration,
            analysis_duration,
            report_duration,
            merge_duration,
            historical_records: corpus.historical.records.len(),
            incoming_records: corpus.incoming.records.len(),
            total_files: analysis.metrics.total_files(),
            pairs: analysis.metrics.len(),
            new_pairs: analysis.new_pairs().count(),
            rules: analysis.mining.rules.len(),
            skipped,
            merge,
            analysis,
        })
    }
}

fn load_one(
    loader: &BomLoader,
    path: &Path,
    source_type: SourceType,
    reporter: &dyn ProgressReporter,
) -> Result<LoadOutcome, Error> {
    let label = path.display().to_string();
    reporter.on_load_start(&label);
    let start = Instant::now();

    let outcome = loader.load_archive(path, source_type)?;
    for skipped in &outcome.skipped {
        reporter.on_entry_skipped(&skipped.entry, &skipped.reason.to_string());
    }
    reporter.on_load_complete(
        &label,
        outcome.records.len(),
        outcome.files_loaded(),
        start.elapsed().as_secs_f64(),
    );
    Ok(outcome)
}
