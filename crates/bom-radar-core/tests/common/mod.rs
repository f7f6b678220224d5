#![allow(dead_code)]

use bom_radar_core::config::AppConfig;
use bom_radar_core::loader::BomLoader;
use bom_radar_core::model::SourceType;
use rust_xlsxwriter::Workbook;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

pub const BOM_HEADERS: &[&str] = &["Component", "kmfg material", "Description / TITLE"];

/// An xlsx workbook with one sheet holding `headers` and `rows` as strings.
pub fn xlsx(headers: &[&str], rows: &[&[&str]]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    for (r, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            sheet.write_string(r as u32 + 1, col as u16, *value).unwrap();
        }
    }
    workbook.save_to_buffer().unwrap()
}

/// A BOM workbook of (component, material) rows with a generated description.
pub fn bom(pairs: &[(&str, &str)]) -> Vec<u8> {
    let descriptions: Vec<String> = pairs.iter().map(|(c, m)| format!("{} {}", c, m)).collect();
    let rows: Vec<Vec<&str>> = pairs
        .iter()
        .zip(&descriptions)
        .map(|((c, m), d)| vec![*c, *m, d.as_str()])
        .collect();
    let row_refs: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
    xlsx(BOM_HEADERS, &row_refs)
}

pub fn write_zip(path: &Path, entries: &[(&str, Vec<u8>)]) {
    let file = File::create(path).unwrap();
    let mut writer = ZipWriter::new(file);
    for (name, bytes) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap();
}

pub fn zip_entry_names(path: &Path) -> Vec<String> {
    let archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(|n| n.to_string()).collect();
    names.sort();
    names
}

pub fn zip_entry_bytes(path: &Path, name: &str) -> Vec<u8> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).unwrap();
    bytes
}

/// Config pointing every path into `dir`.
pub fn config_in(dir: &Path) -> AppConfig {
    AppConfig {
        historical_archive: dir.join("Historical_BOM.zip"),
        incoming_archive: dir.join("To_be_Added.zip"),
        report_path: dir.join("BOM_Report.xlsx"),
        ..Default::default()
    }
}

/// Distinct (component, material, source file) triples of an archive.
pub fn triples(config: &AppConfig, path: &Path) -> BTreeSet<(String, String, String)> {
    let loader = BomLoader::from_config(config).unwrap();
    loader
        .load_archive(path, SourceType::Historical)
        .unwrap()
        .records
        .into_iter()
        .map(|r| (r.component, r.material, r.source_file))
        .collect()
}

pub fn triple(c: &str, m: &str, f: &str) -> (String, String, String) {
    (c.to_string(), m.to_string(), f.to_string())
}
