pub mod annotate;
pub mod csv_export;
pub mod workbook;

pub use csv_export::{write_metrics_csv, write_rules_csv};
pub use workbook::{build_report, write_report};
