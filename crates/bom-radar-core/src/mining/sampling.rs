//! Approximate mining mode.
//!
//! Shrinks the row set to the most frequent components, materials and files
//! before itemset search. There is no guarantee that the rules mined from a
//! sample match the rules of the full corpus.

use ahash::{AHashMap, AHashSet};
use serde::Serialize;
use std::hash::Hash;
use tracing::info;

use crate::config::SamplingPolicy;
use crate::model::{Item, Record};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SamplingSummary {
    pub rows_in: usize,
    pub components_kept: usize,
    pub materials_kept: usize,
    pub files_kept: usize,
    pub files_sampled: usize,
    pub items_kept: usize,
    pub rows_kept: usize,
}

/// Linear-interpolated quantile of `values`, `q` in [0, 1].
pub fn quantile(values: &[usize], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let (lo_v, hi_v) = (sorted[lo] as f64, sorted[hi] as f64);
    lo_v + (hi_v - lo_v) * (pos - lo as f64)
}

/// Keys whose row frequency is at or above the `q` quantile of all frequencies.
fn top_quantile<'a, K, F>(rows: &[(&'a Record, Item)], q: f64, key: F) -> AHashSet<K>
where
    K: Eq + Hash + Clone,
    F: Fn(&(&'a Record, Item)) -> K,
{
    let mut counts: AHashMap<K, usize> = AHashMap::new();
    for row in rows {
        *counts.entry(key(row)).or_default() += 1;
    }
    let values: Vec<usize> = counts.values().copied().collect();
    let cutoff = quantile(&values, q);
    counts
        .into_iter()
        .filter(|&(_, count)| count as f64 >= cutoff)
        .map(|(k, _)| k)
        .collect()
}

/// Apply the policy to `(record, item)` rows and return the retained rows.
pub fn sample_rows<'a>(
    rows: Vec<(&'a Record, Item)>,
    policy: &SamplingPolicy,
    min_support: f64,
) -> (Vec<(&'a Record, Item)>, SamplingSummary) {
    let mut summary = SamplingSummary {
        rows_in: rows.len(),
        ..Default::default()
    };
    let q = policy.sampling_quantile;

    let components = top_quantile(&rows, q, |(r, _)| r.component.clone());
    let materials = top_quantile(&rows, q, |(r, _)| r.material.clone());
    let files = top_quantile(&rows, q, |(r, _)| r.source_file.clone());
    summary.components_kept = components.len();
    summary.materials_kept = materials.len();
    summary.files_kept = files.len();
    info!(
        "Sampling kept top {} components, {} materials, {} files",
        components.len(),
        materials.len(),
        files.len()
    );

    let rows: Vec<(&Record, Item)> = rows
        .into_iter()
        .filter(|(r, _)| {
            components.contains(&r.component)
                && materials.contains(&r.material)
                && files.contains(&r.source_file)
        })
        .collect();

    let mut file_counts: AHashMap<&str, usize> = AHashMap::new();
    for (r, _) in &rows {
        *file_counts.entry(r.source_file.as_str()).or_default() += 1;
    }
    let mut ranked: Vec<(&str, usize)> = file_counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let sampled: AHashSet<String> = ranked
        .into_iter()
        .take(policy.max_files_to_sample)
        .map(|(f, _)| f.to_string())
        .collect();
    summary.files_sampled = sampled.len();
    info!("Selected top {} files for mining", sampled.len());

    let rows: Vec<(&Record, Item)> = rows
        .into_iter()
        .filter(|(r, _)| sampled.contains(&r.source_file))
        .collect();

    let mut item_counts: AHashMap<&Item, usize> = AHashMap::new();
    for (_, item) in &rows {
        *item_counts.entry(item).or_default() += 1;
    }
    let min_rows = min_support * policy.item_support_multiplier * sampled.len() as f64;
    let frequent: AHashSet<Item> = item_counts
        .into_iter()
        .filter(|&(_, count)| count as f64 >= min_rows)
        .map(|(item, _)| item.clone())
        .collect();
    summary.items_kept = frequent.len();

    let rows: Vec<(&Record, Item)> = rows
        .into_iter()
        .filter(|(_, item)| frequent.contains(item))
        .collect();
    summary.rows_kept = rows.len();
    info!(
        "After sampling: {} rows, {} unique items, {} files",
        summary.rows_kept, summary.items_kept, summary.files_sampled
    );

    (rows, summary)
}
