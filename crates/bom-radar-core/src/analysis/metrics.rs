use ahash::{AHashMap, AHashSet};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::Error;
use crate::model::{PairKey, PairMetrics, Record};

const PRECISION: f64 = 100_000.0;

/// Round to the 5 decimal places used in reports.
pub fn round5(value: f64) -> f64 {
    (value * PRECISION).round() / PRECISION
}

/// Per-pair support and confidence over a corpus snapshot.
#[derive(Debug, Clone)]
pub struct MetricsTable {
    total_files: usize,
    rows: Vec<PairMetrics>,
    index: AHashMap<PairKey, usize>,
}

impl MetricsTable {
    /// Counts are taken over distinct files: a pair repeated within one file
    /// counts once.
    pub fn compute(records: &[Record]) -> Result<Self, Error> {
        let files: AHashSet<&str> = records.iter().map(|r| r.source_file.as_str()).collect();
        let total_files = files.len();
        if total_files == 0 {
            return Err(Error::EmptyCorpus);
        }

        let triples: AHashSet<(&str, &str, &str)> = records
            .iter()
            .map(|r| {
                (
                    r.component.as_str(),
                    r.material.as_str(),
                    r.source_file.as_str(),
                )
            })
            .collect();

        let mut pair_counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();
        let mut component_files: AHashMap<&str, AHashSet<&str>> = AHashMap::new();
        for &(component, material, file) in &triples {
            *pair_counts.entry((component, material)).or_default() += 1;
            component_files.entry(component).or_default().insert(file);
        }

        let mut rows = Vec::with_capacity(pair_counts.len());
        for ((component, material), count) in pair_counts {
            let component_total_files = component_files.get(component).map_or(0, |f| f.len());
            if component_total_files == 0 {
                return Err(Error::InvalidInput(format!(
                    "component {} has no files",
                    component
                )));
            }
            let support = count as f64 / total_files as f64;
            let confidence = count as f64 / component_total_files as f64;
            rows.push(PairMetrics {
                component: component.to_string(),
                material: material.to_string(),
                count,
                component_total_files,
                support: round5(support),
                confidence: round5(confidence),
                support_confidence_sum: round5(support + confidence),
            });
        }

        let index = rows
            .iter()
            .enumerate()
            .map(|(i, m)| (m.pair(), i))
            .collect();

        debug!(
            "Computed metrics for {} pairs over {} files",
            rows.len(),
            total_files
        );
        Ok(Self {
            total_files,
            rows,
            index,
        })
    }

    pub fn total_files(&self) -> usize {
        self.total_files
    }

    /// Rows sorted by component, then material.
    pub fn rows(&self) -> &[PairMetrics] {
        &self.rows
    }

    pub fn get(&self, pair: &PairKey) -> Option<&PairMetrics> {
        self.index.get(pair).map(|&i| &self.rows[i])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows by descending support + confidence.
    pub fn ranked(&self) -> Vec<&PairMetrics> {
        let mut ranked: Vec<&PairMetrics> = self.rows.iter().collect();
        ranked.sort_by(|a, b| {
            b.support_confidence_sum
                .total_cmp(&a.support_confidence_sum)
                .then_with(|| a.component.cmp(&b.component))
                .then_with(|| a.material.cmp(&b.material))
        });
        ranked
    }
}
