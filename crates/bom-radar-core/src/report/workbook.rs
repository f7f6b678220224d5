use rust_xlsxwriter::{Color, Format, FormatPattern, Workbook, Worksheet};
use std::path::Path;
use tracing::{debug, info};

use super::annotate::{self, Highlight};
use crate::analysis::{Analysis, PairRow, TotalCountRow};
use crate::error::Error;
use crate::loader::SkippedEntry;
use crate::model::{PairMetrics, Rule};
use crate::staged;

pub const HISTORICAL_SHEET: &str = "1_Historical";
pub const INCOMING_SHEET: &str = "2_To_Be_Added";
pub const MERGED_SHEET: &str = "3_Merged";
pub const METRICS_SHEET: &str = "4_Metrics";
pub const TOTAL_COUNT_SHEET: &str = "5_Total_Count";
pub const RULES_SHEET: &str = "6_Rules";
pub const SKIPPED_SHEET: &str = "7_Skipped";

const RATIO_FORMAT: &str = "0.00000";

/// Longest string Excel stores in a single cell.
const MAX_CELL_CHARS: usize = 32_767;

const PAIR_HEADERS: &[&str] = &[
    "Component",
    "Material",
    "Description",
    "Source_File",
    "Source_Type",
    "Count",
    "Component_Total_Files",
    "Support",
    "Confidence",
    "Support_Confidence_Sum",
    "Critical_Flag",
    "Status",
];

const METRICS_HEADERS: &[&str] = &[
    "Component",
    "Material",
    "Count",
    "Component_Total_Files",
    "Support",
    "Confidence",
    "Support_Confidence_Sum",
];

const TOTAL_COUNT_HEADERS: &[&str] = &[
    "Component",
    "Material",
    "Total_Count",
    "Description",
    "Critical_Flag",
    "Count",
    "Component_Total_Files",
    "Support",
    "Confidence",
    "Support_Confidence_Sum",
    "Status",
];

const RULES_HEADERS: &[&str] = &[
    "Component",
    "Material",
    "Status",
    "Support",
    "Confidence",
    "Lift",
    "Antecedent",
    "Consequent",
];

const SKIPPED_HEADERS: &[&str] = &["Archive", "Entry", "Reason"];

enum Cell {
    Text(String),
    Count(usize),
    Ratio(f64),
}

type Row = (Vec<Cell>, Option<Highlight>);

fn metric_cells(m: &PairMetrics) -> [Cell; 5] {
    [
        Cell::Count(m.count),
        Cell::Count(m.component_total_files),
        Cell::Ratio(m.support),
        Cell::Ratio(m.confidence),
        Cell::Ratio(m.support_confidence_sum),
    ]
}

fn pair_cells(row: &PairRow) -> Vec<Cell> {
    let mut cells = vec![
        Cell::Text(row.component.clone()),
        Cell::Text(row.material.clone()),
        Cell::Text(row.description.clone()),
        Cell::Text(file_list(&row.source_files)),
        Cell::Text(row.source_type.to_string()),
    ];
    cells.extend(metric_cells(&row.metrics));
    cells.push(Cell::Text(row.critical.to_string()));
    cells.push(Cell::Text(row.status.to_string()));
    cells
}

/// Comma-joined file names, cut short with a count of the rest once a cell would overflow.
fn file_list(files: &[String]) -> String {
    let joined = files.join(", ");
    if joined.chars().count() <= MAX_CELL_CHARS {
        return joined;
    }

    // room for ", … (+N more)"
    let budget = MAX_CELL_CHARS - 32;
    let mut text = String::new();
    let mut used = 0;
    let mut shown = 0;
    for name in files {
        let cost = name.chars().count() + if shown == 0 { 0 } else { 2 };
        if used + cost > budget {
            break;
        }
        if shown > 0 {
            text.push_str(", ");
        }
        text.push_str(name);
        used += cost;
        shown += 1;
    }
    let rest = files.len() - shown;
    if shown > 0 {
        text.push_str(", ");
    }
    text.push_str(&format!("… (+{} more)", rest));
    text
}

fn total_count_cells(row: &TotalCountRow) -> Vec<Cell> {
    let mut cells = vec![
        Cell::Text(row.component.clone()),
        Cell::Text(row.material.clone()),
        Cell::Count(row.total_count),
        Cell::Text(row.description.clone()),
        Cell::Text(row.critical.to_string()),
    ];
    cells.extend(metric_cells(&row.metrics));
    cells.push(Cell::Text(row.status.to_string()));
    cells
}

fn rule_cells(rule: &Rule) -> Vec<Cell> {
    vec![
        Cell::Text(rule.component.clone()),
        Cell::Text(rule.material.clone()),
        Cell::Text(rule.status.map(|s| s.to_string()).unwrap_or_default()),
        Cell::Ratio(rule.support),
        Cell::Ratio(rule.confidence),
        Cell::Ratio(rule.lift),
        Cell::Text(rule.antecedent.key()),
        Cell::Text(rule.consequent.key()),
    ]
}

fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
    highlight: Option<Highlight>,
) -> Result<(), Error> {
    let mut format = Format::new();
    if let Some(h) = highlight {
        format = format
            .set_background_color(Color::RGB(h.fill()))
            .set_pattern(FormatPattern::Solid);
    }
    match cell {
        Cell::Text(s) => sheet.write_string_with_format(row, col, s, &format)?,
        Cell::Count(n) => sheet.write_number_with_format(row, col, *n as f64, &format)?,
        Cell::Ratio(v) => {
            sheet.write_number_with_format(row, col, *v, &format.set_num_format(RATIO_FORMAT))?
        }
    };
    Ok(())
}

fn add_sheet(
    workbook: &mut Workbook,
    name: &str,
    headers: &[&str],
    rows: Vec<Row>,
) -> Result<(), Error> {
    let header_format = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(name)?;

    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }
    let row_count = rows.len();
    for (i, (cells, highlight)) in rows.iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            write_cell(sheet, i as u32 + 1, col as u16, cell, *highlight)?;
        }
    }
    sheet.set_freeze_panes(1, 0)?;
    sheet.autofit();

    debug!("Sheet {} written with {} rows", name, row_count);
    Ok(())
}

/// Assemble the multi-sheet report in memory.
pub fn build_report(analysis: &Analysis, skipped: &[SkippedEntry]) -> Result<Workbook, Error> {
    let mut workbook = Workbook::new();

    let by_status = |row: &PairRow| (pair_cells(row), annotate::by_status(row.status));
    add_sheet(
        &mut workbook,
        HISTORICAL_SHEET,
        PAIR_HEADERS,
        analysis.historical_pairs.iter().map(by_status).collect(),
    )?;
    add_sheet(
        &mut workbook,
        INCOMING_SHEET,
        PAIR_HEADERS,
        analysis.incoming_pairs.iter().map(by_status).collect(),
    )?;
    add_sheet(
        &mut workbook,
        MERGED_SHEET,
        PAIR_HEADERS,
        analysis
            .merged_pairs()
            .map(|row| (pair_cells(row), annotate::by_source(row.source_type)))
            .collect(),
    )?;

    add_sheet(
        &mut workbook,
        METRICS_SHEET,
        METRICS_HEADERS,
        analysis
            .metrics
            .ranked()
            .into_iter()
            .map(|m| {
                let mut cells = vec![
                    Cell::Text(m.component.clone()),
                    Cell::Text(m.material.clone()),
                ];
                cells.extend(metric_cells(m));
                (cells, None)
            })
            .collect(),
    )?;

    add_sheet(
        &mut workbook,
        TOTAL_COUNT_SHEET,
        TOTAL_COUNT_HEADERS,
        analysis
            .total_counts
            .iter()
            .map(|row| (total_count_cells(row), annotate::by_status(row.status)))
            .collect(),
    )?;

    add_sheet(
        &mut workbook,
        RULES_SHEET,
        RULES_HEADERS,
        analysis
            .mining
            .rules
            .iter()
            .map(|rule| (rule_cells(rule), None))
            .collect(),
    )?;

    add_sheet(
        &mut workbook,
        SKIPPED_SHEET,
        SKIPPED_HEADERS,
        skipped
            .iter()
            .map(|s| {
                let cells = vec![
                    Cell::Text(s.archive.display().to_string()),
                    Cell::Text(s.entry.clone()),
                    Cell::Text(s.reason.to_string()),
                ];
                (cells, None)
            })
            .collect(),
    )?;

    Ok(workbook)
}

/// Write the report beside `path` and move it into place.
pub fn write_report(path: &Path, analysis: &Analysis, skipped: &[SkippedEntry]) -> Result<(), Error> {
    let mut workbook = build_report(analysis, skipped)?;
    let buffer = workbook.save_to_buffer()?;
    staged::write_atomically(path, &buffer)?;
    info!("Report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze, AnalysisSettings};
    use crate::config::MiningConfig;
    use crate::loader::SkipReason;
    use crate::model::{CriticalSet, Record, SourceType};
    use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
    use std::io::Cursor;
    use std::path::PathBuf;

    fn record(component: &str, material: &str, file: &str, source_type: SourceType) -> Record {
        Record {
            component: component.to_string(),
            material: material.to_string(),
            description: String::new(),
            source_file: file.to_string(),
            source_type,
        }
    }

    fn sample_analysis() -> Analysis {
        let historical = vec![
            record("KM1", "M1", "h1.xlsx", SourceType::Historical),
            record("KM1", "M1", "h2.xlsx", SourceType::Historical),
        ];
        let incoming = vec![record("KM9", "M9", "n1.xlsx", SourceType::Incoming)];
        let settings = AnalysisSettings {
            support_threshold: 0.05,
            mining: MiningConfig::default(),
        };
        analyze(&historical, &incoming, &CriticalSet::default(), &settings).unwrap()
    }

    fn read_back(workbook: &mut Workbook) -> Xlsx<Cursor<Vec<u8>>> {
        let buffer = workbook.save_to_buffer().unwrap();
        open_workbook_from_rs(Cursor::new(buffer)).unwrap()
    }

    #[test]
    fn test_pair_in_many_files_fits_one_cell() {
        let historical: Vec<Record> = (0..1_500)
            .map(|i| {
                record(
                    "KM1",
                    "BOLT",
                    &format!("BOM_assembly_line_{:05}.xlsx", i),
                    SourceType::Historical,
                )
            })
            .collect();
        let settings = AnalysisSettings {
            support_threshold: 0.05,
            mining: MiningConfig::default(),
        };
        let analysis = analyze(&historical, &[], &CriticalSet::default(), &settings).unwrap();
        assert_eq!(analysis.historical_pairs[0].source_files.len(), 1_500);

        let mut workbook = build_report(&analysis, &[]).unwrap();
        let mut reader = read_back(&mut workbook);
        let range = reader.worksheet_range(HISTORICAL_SHEET).unwrap();
        let cell = range.get_value((1, 3)).unwrap().to_string();
        assert!(cell.chars().count() <= MAX_CELL_CHARS);
        assert!(cell.starts_with("BOM_assembly_line_00000.xlsx, BOM_assembly_line_00001.xlsx"));
        assert!(cell.ends_with("more)"));
    }

    #[test]
    fn test_file_list_short_enough_is_joined_whole() {
        let files = vec!["a.xlsx".to_string(), "b.xlsx".to_string()];
        assert_eq!(file_list(&files), "a.xlsx, b.xlsx");

        let long: Vec<String> = (0..5_000).map(|i| format!("{:08}.xlsx", i)).collect();
        let text = file_list(&long);
        assert!(text.chars().count() <= MAX_CELL_CHARS);
        let shown = text.matches(".xlsx").count();
        assert!(text.ends_with(&format!("… (+{} more)", 5_000 - shown)));
    }

    #[test]
    fn test_sheets_in_order() {
        let mut workbook = build_report(&sample_analysis(), &[]).unwrap();
        let reader = read_back(&mut workbook);
        assert_eq!(
            reader.sheet_names(),
            vec![
                HISTORICAL_SHEET,
                INCOMING_SHEET,
                MERGED_SHEET,
                METRICS_SHEET,
                TOTAL_COUNT_SHEET,
                RULES_SHEET,
                SKIPPED_SHEET
            ]
        );
    }

    #[test]
    fn test_rows_and_values() {
        let skipped = vec![SkippedEntry {
            archive: PathBuf::from("To_be_Added.zip"),
            entry: "broken.xlsx".to_string(),
            reason: SkipReason::NoWorksheet,
        }];
        let mut workbook = build_report(&sample_analysis(), &skipped).unwrap();
        let mut reader = read_back(&mut workbook);

        let incoming = reader.worksheet_range(INCOMING_SHEET).unwrap();
        assert_eq!(incoming.height(), 2);
        assert_eq!(incoming.get_value((0, 0)), Some(&Data::String("Component".into())));
        assert_eq!(incoming.get_value((1, 0)), Some(&Data::String("KM9".into())));
        assert_eq!(incoming.get_value((1, 11)), Some(&Data::String("New".into())));

        let merged = reader.worksheet_range(MERGED_SHEET).unwrap();
        assert_eq!(merged.height(), 3);

        let metrics = reader.worksheet_range(METRICS_SHEET).unwrap();
        assert_eq!(metrics.get_value((1, 0)), Some(&Data::String("KM1".into())));
        assert_eq!(metrics.get_value((1, 2)), Some(&Data::Float(2.0)));

        let skipped = reader.worksheet_range(SKIPPED_SHEET).unwrap();
        assert_eq!(skipped.get_value((1, 1)), Some(&Data::String("broken.xlsx".into())));
    }

    #[test]
    fn test_write_report_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        std::fs::write(&path, b"stale").unwrap();

        write_report(&path, &sample_analysis(), &[]).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], b"PK");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
