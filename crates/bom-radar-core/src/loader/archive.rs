use glob::Pattern;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use zip::ZipArchive;

use super::sheet;
use crate::config::{AppConfig, ColumnConfig};
use crate::error::Error;
use crate::model::{Record, SourceType};
use crate::normalize::Normalizer;

/// Why an archive entry contributed no records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    MissingColumns(Vec<String>),
    NoWorksheet,
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingColumns(cols) => write!(f, "missing columns: {}", cols.join(", ")),
            SkipReason::NoWorksheet => write!(f, "workbook has no worksheet"),
            SkipReason::Unreadable(msg) => write!(f, "unreadable: {}", msg),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedEntry {
    pub archive: PathBuf,
    pub entry: String,
    pub reason: SkipReason,
}

/// An entry that parsed successfully.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedEntry {
    pub entry: String,
    pub source_file: String,
    pub records: usize,
}

#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub records: Vec<Record>,
    pub entries: Vec<LoadedEntry>,
    pub skipped: Vec<SkippedEntry>,
}

impl LoadOutcome {
    pub fn files_loaded(&self) -> usize {
        self.entries.len()
    }
}

/// Reads BOM workbooks out of zip archives.
#[derive(Debug, Clone)]
pub struct BomLoader {
    normalizer: Normalizer,
    columns: ColumnConfig,
    extension: String,
    exclude_patterns: Vec<Pattern>,
}

impl BomLoader {
    pub fn new(
        normalizer: Normalizer,
        columns: ColumnConfig,
        extension: &str,
        exclude_globs: &[String],
    ) -> Self {
        let exclude_patterns = exclude_globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();

        Self {
            normalizer,
            columns,
            extension: extension.to_string(),
            exclude_patterns,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let normalizer = Normalizer::from_config(&config.normalizer)?;
        Ok(Self::new(
            normalizer,
            config.columns.clone(),
            &config.loader.extension,
            &config.loader.exclude_patterns,
        ))
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn columns(&self) -> &ColumnConfig {
        &self.columns
    }

    pub fn is_excluded(&self, entry_name: &str) -> bool {
        self.exclude_patterns.iter().any(|p| p.matches(entry_name))
    }

    pub fn is_candidate(&self, entry_name: &str) -> bool {
        entry_name.ends_with(&self.extension) && !self.is_excluded(entry_name)
    }

    /// Load every BOM entry of the archive at `path`. Failing to open the archive
    /// is fatal; a bad entry is recorded in [`LoadOutcome::skipped`].
    pub fn load_archive(&self, path: &Path, source_type: SourceType) -> Result<LoadOutcome, Error> {
        info!("Loading {} BOMs from {}", source_type, path.display());
        let file = File::open(path).map_err(|e| Error::archive(path, e.into()))?;
        self.load_reader(BufReader::new(file), path, source_type)
    }

    pub fn load_reader<R: Read + Seek>(
        &self,
        reader: R,
        label: &Path,
        source_type: SourceType,
    ) -> Result<LoadOutcome, Error> {
        let mut archive = ZipArchive::new(reader).map_err(|e| Error::archive(label, e))?;
        let mut outcome = LoadOutcome::default();

        for index in 0..archive.len() {
            let mut entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping entry #{} of {}: {}", index, label.display(), e);
                    outcome.skipped.push(SkippedEntry {
                        archive: label.to_path_buf(),
                        entry: format!("#{}", index),
                        reason: SkipReason::Unreadable(e.to_string()),
                    });
                    continue;
                }
            };

            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            if !self.is_candidate(&name) {
                continue;
            }

            debug!("Processing entry: {}", name);
            // The declared size comes from the archive header and is not trusted.
            let mut bytes = Vec::new();
            let parsed = match entry.read_to_end(&mut bytes) {
                Ok(_) => self.parse_workbook(bytes, &source_file_name(&name), source_type),
                Err(e) => Err(SkipReason::Unreadable(e.to_string())),
            };

            match parsed {
                Ok(records) => {
                    outcome.entries.push(LoadedEntry {
                        entry: name.clone(),
                        source_file: source_file_name(&name),
                        records: records.len(),
                    });
                    outcome.records.extend(records);
                }
                Err(reason) => {
                    warn!("Skipping {} in {}: {}", name, label.display(), reason);
                    outcome.skipped.push(SkippedEntry {
                        archive: label.to_path_buf(),
                        entry: name,
                        reason,
                    });
                }
            }
        }

        info!(
            "Loaded {} records from {} files ({} skipped)",
            outcome.records.len(),
            outcome.entries.len(),
            outcome.skipped.len(),
        );
        Ok(outcome)
    }

    /// Parse one workbook into records, or say why it cannot be used.
    pub fn parse_workbook(
        &self,
        bytes: Vec<u8>,
        source_file: &str,
        source_type: SourceType,
    ) -> Result<Vec<Record>, SkipReason> {
        let range = match sheet::first_worksheet(Cursor::new(bytes)) {
            Ok(Some(range)) => range,
            Ok(None) => return Err(SkipReason::NoWorksheet),
            Err(e) => return Err(SkipReason::Unreadable(e.to_string())),
        };

        let headers = sheet::header_row(&range);
        let component_idx = sheet::column_index(&headers, &self.columns.component);
        let material_idx = sheet::column_index(&headers, &self.columns.material);
        let (component_idx, material_idx) = match (component_idx, material_idx) {
            (Some(c), Some(m)) => (c, m),
            (c, m) => {
                let mut missing = Vec::new();
                if c.is_none() {
                    missing.push(self.columns.component.clone());
                }
                if m.is_none() {
                    missing.push(self.columns.material.clone());
                }
                return Err(SkipReason::MissingColumns(missing));
            }
        };
        let description_idx = sheet::column_index(&headers, &self.columns.description);

        let records = range
            .rows()
            .skip(1)
            .filter_map(|row| {
                let raw_component = row.get(component_idx).and_then(sheet::cell_text)?;
                let raw_material = row.get(material_idx).and_then(sheet::cell_text)?;
                let component = self.normalizer.component(&raw_component);
                let material = self.normalizer.material(&raw_material);
                if component.is_empty() || material.is_empty() {
                    return None;
                }
                // A present but blank description disqualifies the row.
                let description = match description_idx {
                    Some(idx) => row
                        .get(idx)
                        .and_then(sheet::cell_text)
                        .filter(|d| !d.is_empty())?,
                    None => String::new(),
                };
                Some(Record {
                    component,
                    material,
                    description,
                    source_file: source_file.to_string(),
                    source_type,
                })
            })
            .collect();

        Ok(records)
    }
}

/// Base file name of an archive entry.
pub fn source_file_name(entry_name: &str) -> String {
    Path::new(entry_name)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| entry_name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn loader() -> BomLoader {
        BomLoader::from_config(&AppConfig::default()).unwrap()
    }

    fn workbook(headers: &[&str], rows: &[&[&str]]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, header) in headers.iter().enumerate() {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        for (r, row) in rows.iter().enumerate() {
            for (col, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    sheet.write_string(r as u32 + 1, col as u16, *value).unwrap();
                }
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    fn zipped(name: &str, bytes: &[u8]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file(name, SimpleFileOptions::default()).unwrap();
        writer.write_all(bytes).unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn overwrite_u32_after(bytes: &mut [u8], signature: &[u8; 4], offset: usize, value: u32) {
        let start = bytes
            .windows(4)
            .position(|w| w == signature)
            .expect("signature present");
        bytes[start + offset..start + offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[test]
    fn test_blank_description_drops_row() {
        let bytes = workbook(
            &["Component", "kmfg material", "Description / TITLE"],
            &[&["KM1", "M1", "Bracket"], &["KM2", "M2", ""], &["KM3", "M3", "Bolt"]],
        );
        let records = loader()
            .parse_workbook(bytes, "a.xlsx", SourceType::Historical)
            .unwrap();
        let components: Vec<&str> = records.iter().map(|r| r.component.as_str()).collect();
        assert_eq!(components, vec!["KM1", "KM3"]);
        assert_eq!(records[1].description, "Bolt");
    }

    #[test]
    fn test_missing_description_column_defaults_to_empty() {
        let bytes = workbook(&["Component", "kmfg material"], &[&["KM1", "M1"]]);
        let records = loader()
            .parse_workbook(bytes, "a.xlsx", SourceType::Historical)
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "");
    }

    #[test]
    fn test_inflated_declared_size_does_not_abort_loading() {
        let bytes = workbook(
            &["Component", "kmfg material", "Description / TITLE"],
            &[&["KM1", "M1", "Bracket"]],
        );
        let mut archive = zipped("a.xlsx", &bytes);
        // uncompressed size in the local and central headers
        overwrite_u32_after(&mut archive, b"PK\x03\x04", 22, 0x7FFF_FFF0);
        overwrite_u32_after(&mut archive, b"PK\x01\x02", 24, 0x7FFF_FFF0);

        let outcome = loader()
            .load_reader(Cursor::new(archive), Path::new("sized.zip"), SourceType::Historical)
            .unwrap();
        assert_eq!(outcome.entries.len() + outcome.skipped.len(), 1);
    }

    #[test]
    fn test_candidate_filtering() {
        let loader = loader();
        assert!(loader.is_candidate("boms/pump.xlsx"));
        assert!(!loader.is_candidate("__MACOSX/boms/._pump.xlsx"));
        assert!(!loader.is_candidate("boms/readme.txt"));
        assert!(!loader.is_candidate("boms/pump.xls"));
    }

    #[test]
    fn test_source_file_name_strips_directories() {
        assert_eq!(source_file_name("a/b/pump.xlsx"), "pump.xlsx");
        assert_eq!(source_file_name("pump.xlsx"), "pump.xlsx");
    }

    #[test]
    fn test_garbage_workbook_is_skipped_not_fatal() {
        let result = loader().parse_workbook(
            b"definitely not a workbook".to_vec(),
            "bad.xlsx",
            SourceType::Historical,
        );
        assert!(matches!(result, Err(SkipReason::Unreadable(_))));
    }

    #[test]
    fn test_skip_reason_display() {
        let reason = SkipReason::MissingColumns(vec!["kmfg material".to_string()]);
        assert_eq!(reason.to_string(), "missing columns: kmfg material");
    }
}
