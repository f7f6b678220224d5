//! Folds an accepted incoming batch into the historical archive.
//!
//! Both replacement archives are staged completely before either original is
//! touched, so a failure part way through leaves the inputs as they were.

use ahash::{AHashMap, AHashSet};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::bom_file::write_bom_workbook;
use crate::config::ColumnConfig;
use crate::error::Error;
use crate::loader::{source_file_name, BomLoader, LoadOutcome};
use crate::model::Record;
use crate::staged::StagedFile;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    /// Entries in the new historical archive.
    pub historical_entries: usize,
    /// Of those, entries written from records.
    pub rewritten: usize,
    /// Of those, entries copied unchanged from the old historical archive.
    pub copied: usize,
    /// Incoming files that became new historical entries.
    pub incoming_added: usize,
    /// Incoming files folded into a historical entry of the same name.
    pub incoming_folded: usize,
    /// Entries left behind in the incoming archive.
    pub incoming_retained: usize,
}

enum Planned {
    Rewrite(String),
    Copy(usize),
}

type ZipReader = ZipArchive<BufReader<File>>;

fn open_zip(path: &Path) -> Result<ZipReader, Error> {
    let file = File::open(path).map_err(|e| Error::archive(path, e.into()))?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| Error::archive(path, e))
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Names of entries that produced at least one record.
fn contributing(outcome: &LoadOutcome) -> AHashSet<&str> {
    outcome
        .entries
        .iter()
        .filter(|e| e.records > 0)
        .map(|e| e.entry.as_str())
        .collect()
}

/// Order the new historical archive: old entries in place, then new incoming files.
fn plan_historical(
    archive: &mut ZipReader,
    loader: &BomLoader,
    historical: &LoadOutcome,
    incoming: &LoadOutcome,
    summary: &mut MergeSummary,
) -> Vec<(String, Planned)> {
    let loaded = contributing(historical);
    let mut plan: Vec<(String, Planned)> = Vec::new();
    let mut index_of: AHashMap<String, usize> = AHashMap::new();

    for index in 0..archive.len() {
        let entry = match archive.by_index_raw(index) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Dropping unreadable historical entry #{}: {}", index, e);
                continue;
            }
        };
        let name = entry.name().to_string();
        if entry.is_dir() || loader.is_excluded(&name) {
            continue;
        }
        let (target, planned) = if loaded.contains(name.as_str()) {
            let source_file = source_file_name(&name);
            (source_file.clone(), Planned::Rewrite(source_file))
        } else {
            (name, Planned::Copy(index))
        };
        if index_of.contains_key(&target) {
            debug!("Entry {} already planned", target);
            continue;
        }
        index_of.insert(target.clone(), plan.len());
        plan.push((target, planned));
    }

    let mut seen_incoming: AHashSet<&str> = AHashSet::new();
    for entry in incoming.entries.iter().filter(|e| e.records > 0) {
        if !seen_incoming.insert(entry.source_file.as_str()) {
            continue;
        }
        match index_of.get(&entry.source_file).copied() {
            Some(slot) if matches!(plan[slot].1, Planned::Rewrite(_)) => {
                summary.incoming_folded += 1;
            }
            Some(slot) => {
                warn!(
                    "Incoming {} replaces unreadable historical entry of the same name",
                    entry.source_file
                );
                plan[slot].1 = Planned::Rewrite(entry.source_file.clone());
                summary.incoming_added += 1;
            }
            None => {
                index_of.insert(entry.source_file.clone(), plan.len());
                plan.push((
                    entry.source_file.clone(),
                    Planned::Rewrite(entry.source_file.clone()),
                ));
                summary.incoming_added += 1;
            }
        }
    }

    plan
}

/// True when `existing` already ends with exactly the rows of `arriving`.
fn already_folded(existing: &[&Record], arriving: &[&Record]) -> bool {
    if arriving.is_empty() || existing.len() < arriving.len() {
        return false;
    }
    existing[existing.len() - arriving.len()..]
        .iter()
        .zip(arriving)
        .all(|(a, b)| {
            a.component == b.component && a.material == b.material && a.description == b.description
        })
}

/// Historical rows of each file followed by the incoming rows of the same name.
///
/// An incoming group already sitting at the end of its historical file was
/// folded by an earlier run whose incoming commit did not land; it is not
/// appended twice.
fn group_by_source_file<'a>(
    historical: &'a LoadOutcome,
    incoming: &'a LoadOutcome,
) -> AHashMap<&'a str, Vec<&'a Record>> {
    let mut groups: AHashMap<&str, Vec<&Record>> = AHashMap::new();
    for record in &historical.records {
        groups
            .entry(record.source_file.as_str())
            .or_default()
            .push(record);
    }

    let mut arriving: AHashMap<&str, Vec<&Record>> = AHashMap::new();
    for record in &incoming.records {
        arriving
            .entry(record.source_file.as_str())
            .or_default()
            .push(record);
    }
    for (source_file, records) in arriving {
        let group = groups.entry(source_file).or_default();
        if already_folded(group, &records) {
            warn!(
                "Incoming {} is already in the historical archive; not appending it again",
                source_file
            );
            continue;
        }
        group.extend(records);
    }
    groups
}

fn stage_historical(
    target: &Path,
    archive: &mut ZipReader,
    plan: &[(String, Planned)],
    groups: &AHashMap<&str, Vec<&Record>>,
    columns: &ColumnConfig,
    summary: &mut MergeSummary,
) -> Result<StagedFile, Error> {
    let mut staged = StagedFile::new(target)?;
    let mut writer = ZipWriter::new(staged.file_mut());

    for (name, planned) in plan {
        match planned {
            Planned::Rewrite(source_file) => {
                let records = groups.get(source_file.as_str()).map_or(&[][..], |r| r.as_slice());
                let bytes = write_bom_workbook(records, columns)?;
                writer
                    .start_file(name.as_str(), entry_options())
                    .map_err(|e| Error::archive(target, e))?;
                writer.write_all(&bytes)?;
                summary.rewritten += 1;
            }
            Planned::Copy(index) => {
                let entry = archive
                    .by_index_raw(*index)
                    .map_err(|e| Error::archive(target, e))?;
                writer
                    .raw_copy_file(entry)
                    .map_err(|e| Error::archive(target, e))?;
                summary.copied += 1;
            }
        }
    }
    writer.finish().map_err(|e| Error::archive(target, e))?;
    summary.historical_entries = plan.len();
    Ok(staged)
}

/// The incoming archive keeps every entry that contributed no records.
fn stage_incoming(
    target: &Path,
    archive: &mut ZipReader,
    loader: &BomLoader,
    incoming: &LoadOutcome,
    summary: &mut MergeSummary,
) -> Result<StagedFile, Error> {
    let consumed = contributing(incoming);
    let mut staged = StagedFile::new(target)?;
    let mut writer = ZipWriter::new(staged.file_mut());

    for index in 0..archive.len() {
        let entry = match archive.by_index_raw(index) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Dropping unreadable entry #{} of {}: {}", index, target.display(), e);
                continue;
            }
        };
        let name = entry.name().to_string();
        if entry.is_dir() || loader.is_excluded(&name) || consumed.contains(name.as_str()) {
            continue;
        }
        writer
            .raw_copy_file(entry)
            .map_err(|e| Error::archive(target, e))?;
        summary.incoming_retained += 1;
    }
    writer.finish().map_err(|e| Error::archive(target, e))?;
    Ok(staged)
}

/// Rewrite the historical archive to hold the union of both batches and strip
/// the consumed entries from the incoming archive.
///
/// `historical` and `incoming` must be the outcomes of loading the two paths
/// with `loader`. Running the merge again on its own output changes nothing.
pub fn merge_archives(
    historical_path: &Path,
    historical: &LoadOutcome,
    incoming_path: &Path,
    incoming: &LoadOutcome,
    loader: &BomLoader,
) -> Result<MergeSummary, Error> {
    info!(
        "Merging {} into {}",
        incoming_path.display(),
        historical_path.display()
    );
    let mut summary = MergeSummary::default();
    let mut historical_zip = open_zip(historical_path)?;
    let mut incoming_zip = open_zip(incoming_path)?;

    let plan = plan_historical(&mut historical_zip, loader, historical, incoming, &mut summary);
    let groups = group_by_source_file(historical, incoming);

    let staged_historical = stage_historical(
        historical_path,
        &mut historical_zip,
        &plan,
        &groups,
        loader.columns(),
        &mut summary,
    )?;
    let staged_incoming = stage_incoming(
        incoming_path,
        &mut incoming_zip,
        loader,
        incoming,
        &mut summary,
    )?;

    drop(historical_zip);
    drop(incoming_zip);
    staged_historical.commit()?;
    staged_incoming.commit()?;

    info!(
        "Historical archive now holds {} entries ({} added, {} folded); {} left in incoming",
        summary.historical_entries,
        summary.incoming_added,
        summary.incoming_folded,
        summary.incoming_retained
    );
    Ok(summary)
}
