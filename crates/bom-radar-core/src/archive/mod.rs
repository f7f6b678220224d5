pub mod bom_file;
pub mod merge;

pub use bom_file::write_bom_workbook;
pub use merge::{merge_archives, MergeSummary};
