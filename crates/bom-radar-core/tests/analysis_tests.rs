mod common;

use bom_radar_core::analysis::metrics::MetricsTable;
use bom_radar_core::analysis::{analyze, AnalysisSettings};
use bom_radar_core::config::{AppConfig, MiningAlgorithm, MiningConfig};
use bom_radar_core::loader::BomLoader;
use bom_radar_core::mining::RuleMiner;
use bom_radar_core::model::{CriticalSet, Item, PairKey, Record, SourceType, Status};
use common::*;
use std::io::Cursor;
use std::path::Path;

fn zip_bytes(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bundle.zip");
    write_zip(&path, entries);
    std::fs::read(path).unwrap()
}

fn load(entries: &[(&str, Vec<u8>)], source_type: SourceType) -> Vec<Record> {
    let loader = BomLoader::from_config(&AppConfig::default()).unwrap();
    loader
        .load_reader(Cursor::new(zip_bytes(entries)), Path::new("bundle.zip"), source_type)
        .unwrap()
        .records
}

#[test]
fn test_metrics_from_loaded_archive() {
    let records = load(
        &[
            ("f1.xlsx", bom(&[("KM1", "M1")])),
            ("f2.xlsx", bom(&[("KM1", "M1")])),
            ("f3.xlsx", bom(&[("KM1", "M2")])),
        ],
        SourceType::Historical,
    );
    let table = MetricsTable::compute(&records).unwrap();

    assert_eq!(table.total_files(), 3);
    let m = table.get(&PairKey::new("KM1", "M1")).unwrap();
    assert_eq!(m.count, 2);
    assert_eq!(m.component_total_files, 3);
    assert_eq!(m.support, 0.66667);
    assert_eq!(m.confidence, 0.66667);

    for row in table.rows() {
        assert!((0.0..=1.0).contains(&row.support));
        assert!((0.0..=1.0).contains(&row.confidence));
        assert!(row.count <= row.component_total_files);
        assert!(row.component_total_files <= table.total_files());
    }
}

#[test]
fn test_normalization_merges_spellings_of_one_component() {
    let records = load(
        &[(
            "f1.xlsx",
            xlsx(
                BOM_HEADERS,
                &[
                    &["Motor KM555 (new)", " cable ", "a"],
                    &["km555 / spare", "CABLE", "b"],
                    &["", "CABLE", "dropped"],
                    &["KM556", "", "dropped"],
                ],
            ),
        )],
        SourceType::Incoming,
    );
    let pairs: Vec<PairKey> = records.iter().map(|r| r.pair()).collect();
    assert_eq!(
        pairs,
        vec![PairKey::new("KM555", "CABLE"), PairKey::new("KM555", "CABLE")]
    );
    assert!(records.iter().all(|r| r.source_type == SourceType::Incoming));
}

#[test]
fn test_classification_against_history() {
    let historical = load(
        &[
            ("h1.xlsx", bom(&[("KM1", "M1"), ("KM2", "M2")])),
            ("h2.xlsx", bom(&[("KM1", "M1")])),
            ("h3.xlsx", bom(&[("KM1", "M1")])),
        ],
        SourceType::Historical,
    );
    let incoming = load(
        &[("n1.xlsx", bom(&[("KM2", "M2"), ("KM3", "M3")]))],
        SourceType::Incoming,
    );
    let settings = AnalysisSettings {
        support_threshold: 0.5,
        mining: MiningConfig::default(),
    };
    let analysis = analyze(&historical, &incoming, &CriticalSet::new(["KM3"]), &settings).unwrap();

    let statuses: Vec<(String, Status)> = analysis
        .incoming_pairs
        .iter()
        .map(|r| (r.component.clone(), r.status))
        .collect();
    // KM2/M2 is in 2 of 4 files, KM3/M3 is unseen
    assert_eq!(
        statuses,
        vec![("KM2".to_string(), Status::NotRare), ("KM3".to_string(), Status::New)]
    );
    assert_eq!(analysis.total_counts.len(), 3);
}

#[test]
fn test_rules_mined_from_archive_agree_across_algorithms() {
    let records = load(
        &[
            ("a.xlsx", bom(&[("KM1", "M1"), ("KM2", "M2")])),
            ("b.xlsx", bom(&[("KM1", "M1"), ("KM2", "M2")])),
            ("c.xlsx", bom(&[("KM1", "M1")])),
            ("d.xlsx", bom(&[("KM3", "M3")])),
        ],
        SourceType::Historical,
    );
    let mine = |algorithm| {
        let config = MiningConfig {
            algorithm,
            min_support: 0.5,
            min_confidence: 0.6,
            ..Default::default()
        };
        RuleMiner::new(config).mine_records(&records, None).unwrap()
    };

    let apriori = mine(MiningAlgorithm::Apriori);
    let fp_growth = mine(MiningAlgorithm::FpGrowth);
    assert_eq!(apriori.rules, fp_growth.rules);
    assert_eq!(apriori.transactions, 4);

    // KM2/M2 -> KM1/M1 holds in every basket with KM2; the reverse only in 2 of 3
    assert_eq!(apriori.rules.len(), 2);
    let strongest = apriori
        .rules
        .iter()
        .find(|r| r.antecedent == Item::new("KM2", "M2", None))
        .unwrap();
    assert_eq!(strongest.confidence, 1.0);
    assert_eq!(strongest.support, 0.5);
    assert_eq!(strongest.component, "KM2");
    assert_eq!(strongest.material, "M1");
}
