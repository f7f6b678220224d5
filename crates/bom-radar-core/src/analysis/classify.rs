use ahash::AHashSet;

use crate::model::{PairKey, Record, Status};

/// New when the pair is absent from the baseline, otherwise Rare below the
/// threshold and Not Rare at or above it.
pub fn classify(support: f64, in_baseline: bool, threshold: f64) -> Status {
    if !in_baseline {
        Status::New
    } else if support < threshold {
        Status::Rare
    } else {
        Status::NotRare
    }
}

/// Pairs already present in the historical archive.
#[derive(Debug, Clone, Default)]
pub struct Baseline {
    pairs: AHashSet<PairKey>,
}

impl Baseline {
    pub fn from_records(records: &[Record]) -> Self {
        Self {
            pairs: records.iter().map(Record::pair).collect(),
        }
    }

    pub fn contains(&self, pair: &PairKey) -> bool {
        self.pairs.contains(pair)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
