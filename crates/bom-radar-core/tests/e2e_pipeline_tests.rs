mod common;

use bom_radar_core::report::workbook::{INCOMING_SHEET, METRICS_SHEET, SKIPPED_SHEET};
use bom_radar_core::{RunEngine, RunOptions, SilentReporter};
use calamine::{open_workbook, Data, Reader, Xlsx};
use common::*;

fn text(value: &str) -> Data {
    Data::String(value.to_string())
}

#[test]
fn test_full_run_writes_report_and_merges() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.support_threshold = 0.3;

    let critical_path = dir.path().join("critical.xlsx");
    std::fs::write(&critical_path, xlsx(&["ItemID_KONE"], &[&["km200"], &[""]])).unwrap();
    config.critical_items = Some(critical_path);

    write_zip(
        &config.historical_archive,
        &[
            (
                "boms/a.xlsx",
                xlsx(BOM_HEADERS, &[&["Assy KM100 rev B", "steel", "Frame"]]),
            ),
            ("boms/b.xlsx", bom(&[("KM100", "STEEL")])),
            ("boms/c.xlsx", bom(&[("KM100", "BOLT")])),
        ],
    );
    write_zip(
        &config.incoming_archive,
        &[
            ("n1.xlsx", bom(&[("KM100", "STEEL"), ("km200/x", "nut")])),
            ("empty.xlsx", xlsx(&["Component"], &[])),
        ],
    );

    let result = RunEngine::new(config.clone())
        .run(&SilentReporter, &RunOptions::default())
        .unwrap();

    assert_eq!(result.historical_records, 3);
    assert_eq!(result.incoming_records, 2);
    assert_eq!(result.total_files, 4);
    assert_eq!(result.pairs, 3);
    assert_eq!(result.new_pairs, 1);
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].entry, "empty.xlsx");
    assert!(result.merge.is_some());

    let mut report: Xlsx<_> = open_workbook(&config.report_path).unwrap();

    let metrics = report.worksheet_range(METRICS_SHEET).unwrap();
    assert_eq!(metrics.height(), 4);
    // KM100/STEEL: 3 of 4 files, 3 of 4 KM100 files
    assert_eq!(metrics.get_value((1, 0)), Some(&text("KM100")));
    assert_eq!(metrics.get_value((1, 1)), Some(&text("STEEL")));
    assert_eq!(metrics.get_value((1, 4)), Some(&Data::Float(0.75)));
    assert_eq!(metrics.get_value((1, 6)), Some(&Data::Float(1.5)));
    assert_eq!(metrics.get_value((2, 0)), Some(&text("KM200")));
    assert_eq!(metrics.get_value((3, 1)), Some(&text("BOLT")));

    let incoming = report.worksheet_range(INCOMING_SHEET).unwrap();
    assert_eq!(incoming.get_value((1, 11)), Some(&text("Not Rare")));
    assert_eq!(incoming.get_value((2, 0)), Some(&text("KM200")));
    assert_eq!(incoming.get_value((2, 10)), Some(&text("Critical")));
    assert_eq!(incoming.get_value((2, 11)), Some(&text("New")));

    let skipped = report.worksheet_range(SKIPPED_SHEET).unwrap();
    assert_eq!(skipped.height(), 2);

    assert_eq!(
        zip_entry_names(&config.historical_archive),
        vec!["a.xlsx", "b.xlsx", "c.xlsx", "n1.xlsx"]
    );
    assert_eq!(zip_entry_names(&config.incoming_archive), vec!["empty.xlsx"]);
}

#[test]
fn test_report_only_run_keeps_archives() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    write_zip(&config.historical_archive, &[("h1.xlsx", bom(&[("KM1", "M1")]))]);
    write_zip(&config.incoming_archive, &[("n1.xlsx", bom(&[("KM2", "M2")]))]);
    let historical_before = std::fs::read(&config.historical_archive).unwrap();

    let options = RunOptions {
        write_report: true,
        merge: false,
    };
    let result = RunEngine::new(config.clone())
        .run(&SilentReporter, &options)
        .unwrap();

    assert!(result.merge.is_none());
    assert!(config.report_path.exists());
    assert_eq!(
        std::fs::read(&config.historical_archive).unwrap(),
        historical_before
    );
    assert_eq!(zip_entry_names(&config.incoming_archive), vec!["n1.xlsx"]);
}

#[test]
fn test_invalid_config_is_rejected_before_loading() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.mining.min_support = 1.5;

    let err = RunEngine::new(config)
        .run(&SilentReporter, &RunOptions::default())
        .unwrap_err();
    assert!(matches!(err, bom_radar_core::Error::InvalidConfig(_)));
}
