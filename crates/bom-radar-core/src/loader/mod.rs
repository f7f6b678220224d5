pub mod archive;
pub mod critical;
pub(crate) mod sheet;

pub use archive::{source_file_name, BomLoader, LoadOutcome, LoadedEntry, SkipReason, SkippedEntry};
pub use critical::load_critical_items;
