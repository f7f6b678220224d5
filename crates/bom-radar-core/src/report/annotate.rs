//! Row highlighting for visual review, derived from data the analysis already holds.

use crate::model::{SourceType, Status};

/// Fill colour of highlighted rows.
pub const ADDED_FILL: u32 = 0xC6EFCE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    Added,
}

impl Highlight {
    pub fn fill(&self) -> u32 {
        match self {
            Highlight::Added => ADDED_FILL,
        }
    }
}

/// Pairs never seen in the historical archive.
pub fn by_status(status: Status) -> Option<Highlight> {
    (status == Status::New).then_some(Highlight::Added)
}

/// Rows that came from the incoming batch.
pub fn by_source(source_type: SourceType) -> Option<Highlight> {
    (source_type == SourceType::Incoming).then_some(Highlight::Added)
}
