pub mod classify;
pub mod metrics;
pub mod transactions;

use ahash::AHashMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

use crate::config::MiningConfig;
use crate::error::Error;
use crate::mining::{MiningOutcome, RuleMiner};
use crate::model::{CriticalFlag, CriticalSet, PairKey, PairMetrics, Record, SourceType, Status};
use classify::{classify, Baseline};
use metrics::MetricsTable;
use transactions::StatusLookup;

/// One distinct pair of a batch, joined with its corpus metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairRow {
    pub component: String,
    pub material: String,
    pub description: String,
    /// Distinct source files of this batch holding the pair, sorted.
    pub source_files: Vec<String>,
    pub source_type: SourceType,
    pub metrics: PairMetrics,
    pub critical: CriticalFlag,
    pub status: Status,
}

/// Raw row count of a pair across the combined corpus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalCountRow {
    pub component: String,
    pub material: String,
    pub total_count: usize,
    pub description: String,
    pub metrics: PairMetrics,
    pub critical: CriticalFlag,
    pub status: Status,
}

#[derive(Debug, Clone)]
pub struct Analysis {
    pub metrics: MetricsTable,
    pub historical_pairs: Vec<PairRow>,
    pub incoming_pairs: Vec<PairRow>,
    pub total_counts: Vec<TotalCountRow>,
    pub mining: MiningOutcome,
}

impl Analysis {
    /// Historical rows followed by incoming rows.
    pub fn merged_pairs(&self) -> impl Iterator<Item = &PairRow> {
        self.historical_pairs.iter().chain(self.incoming_pairs.iter())
    }

    pub fn new_pairs(&self) -> impl Iterator<Item = &PairRow> {
        self.incoming_pairs
            .iter()
            .filter(|row| row.status == Status::New)
    }
}

/// Settings the analysis depends on.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub support_threshold: f64,
    pub mining: MiningConfig,
}

/// Compute metrics, statuses and rules for the combined corpus. Pure: no I/O.
pub fn analyze(
    historical: &[Record],
    incoming: &[Record],
    critical: &CriticalSet,
    settings: &AnalysisSettings,
) -> Result<Analysis, Error> {
    let combined: Vec<Record> = historical.iter().chain(incoming).cloned().collect();
    if combined.is_empty() {
        return Err(Error::EmptyCorpus);
    }

    let metrics = MetricsTable::compute(&combined)?;
    let baseline = Baseline::from_records(historical);
    info!(
        "Analyzing {} records: {} files, {} pairs, {} in baseline",
        combined.len(),
        metrics.total_files(),
        metrics.len(),
        baseline.len()
    );

    let statuses: StatusLookup = metrics
        .rows()
        .iter()
        .map(|m| {
            let pair = m.pair();
            let status = classify(m.support, baseline.contains(&pair), settings.support_threshold);
            (pair, status)
        })
        .collect();

    let historical_pairs = pair_rows(historical, &metrics, &statuses, critical)?;
    let incoming_pairs = pair_rows(incoming, &metrics, &statuses, critical)?;
    let total_counts = total_count_rows(&combined, &metrics, &statuses, critical)?;

    let mining = RuleMiner::new(settings.mining.clone()).mine_records(&combined, Some(&statuses))?;

    Ok(Analysis {
        metrics,
        historical_pairs,
        incoming_pairs,
        total_counts,
        mining,
    })
}

fn lookup<'a>(
    pair: &PairKey,
    metrics: &'a MetricsTable,
    statuses: &StatusLookup,
) -> Result<(&'a PairMetrics, Status), Error> {
    match (metrics.get(pair), statuses.get(pair)) {
        (Some(m), Some(&status)) => Ok((m, status)),
        _ => Err(Error::InvalidInput(format!("no metrics for pair {}", pair))),
    }
}

/// Distinct pairs of one batch in first-seen order.
fn pair_rows(
    records: &[Record],
    metrics: &MetricsTable,
    statuses: &StatusLookup,
    critical: &CriticalSet,
) -> Result<Vec<PairRow>, Error> {
    let mut order: Vec<&Record> = Vec::new();
    let mut files: AHashMap<PairKey, BTreeSet<&str>> = AHashMap::new();
    for record in records {
        let entry = files.entry(record.pair()).or_default();
        if entry.is_empty() {
            order.push(record);
        }
        entry.insert(record.source_file.as_str());
    }

    order
        .into_iter()
        .map(|first| {
            let pair = first.pair();
            let (m, status) = lookup(&pair, metrics, statuses)?;
            let source_files = files
                .get(&pair)
                .map(|f| f.iter().map(|name| name.to_string()).collect())
                .unwrap_or_default();
            Ok(PairRow {
                component: first.component.clone(),
                material: first.material.clone(),
                description: first.description.clone(),
                source_files,
                source_type: first.source_type,
                metrics: m.clone(),
                critical: critical.flag(&first.component),
                status,
            })
        })
        .collect()
}

/// One row per pair of the combined corpus, sorted by pair.
fn total_count_rows(
    combined: &[Record],
    metrics: &MetricsTable,
    statuses: &StatusLookup,
    critical: &CriticalSet,
) -> Result<Vec<TotalCountRow>, Error> {
    let mut groups: BTreeMap<PairKey, (usize, &str)> = BTreeMap::new();
    for record in combined {
        groups
            .entry(record.pair())
            .or_insert((0, record.description.as_str()))
            .0 += 1;
    }

    groups
        .into_iter()
        .map(|(pair, (total_count, description))| {
            let (m, status) = lookup(&pair, metrics, statuses)?;
            Ok(TotalCountRow {
                critical: critical.flag(&pair.component),
                component: pair.component,
                material: pair.material,
                total_count,
                description: description.to_string(),
                metrics: m.clone(),
                status,
            })
        })
        .collect()
}
