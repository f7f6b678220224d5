use ahash::AHashSet;
use serde::Serialize;
use std::fmt;

/// Which archive a record was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SourceType {
    Historical,
    Incoming,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Historical => write!(f, "Historical"),
            SourceType::Incoming => write!(f, "To_be_Added"),
        }
    }
}

/// One normalized BOM row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub component: String,
    pub material: String,
    pub description: String,
    pub source_file: String,
    pub source_type: SourceType,
}

impl Record {
    pub fn pair(&self) -> PairKey {
        PairKey::new(&self.component, &self.material)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PairKey {
    pub component: String,
    pub material: String,
}

impl PairKey {
    pub fn new(component: &str, material: &str) -> Self {
        Self {
            component: component.to_string(),
            material: material.to_string(),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.component, self.material)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Status {
    New,
    Rare,
    NotRare,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::New => "New",
            Status::Rare => "Rare",
            Status::NotRare => "Not Rare",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CriticalFlag {
    Critical,
    Safe,
}

impl fmt::Display for CriticalFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CriticalFlag::Critical => write!(f, "Critical"),
            CriticalFlag::Safe => write!(f, "Safe"),
        }
    }
}

/// Component identifiers flagged as operationally critical.
#[derive(Debug, Clone, Default)]
pub struct CriticalSet {
    items: AHashSet<String>,
}

impl CriticalSet {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let items = items
            .into_iter()
            .map(|s| s.as_ref().trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self { items }
    }

    pub fn contains(&self, component: &str) -> bool {
        self.items.contains(component)
    }

    pub fn flag(&self, component: &str) -> CriticalFlag {
        if self.contains(component) {
            CriticalFlag::Critical
        } else {
            CriticalFlag::Safe
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Co-occurrence statistics of one (component, material) pair across the corpus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairMetrics {
    pub component: String,
    pub material: String,
    pub count: usize,
    pub component_total_files: usize,
    pub support: f64,
    pub confidence: f64,
    pub support_confidence_sum: f64,
}

impl PairMetrics {
    pub fn pair(&self) -> PairKey {
        PairKey::new(&self.component, &self.material)
    }
}

/// Atomic unit of a transaction.
///
/// Kept as a struct inside the crate; [`Item::key`] gives the joined text form
/// used in reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Item {
    pub component: String,
    pub material: String,
    pub status: Option<Status>,
}

pub const ITEM_DELIMITER: &str = "__";

impl Item {
    pub fn new(component: &str, material: &str, status: Option<Status>) -> Self {
        Self {
            component: component.to_string(),
            material: material.to_string(),
            status,
        }
    }

    pub fn key(&self) -> String {
        match self.status {
            Some(status) => format!(
                "{}{d}{}{d}{}",
                self.component,
                self.material,
                status,
                d = ITEM_DELIMITER
            ),
            None => format!("{}{}{}", self.component, ITEM_DELIMITER, self.material),
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// The distinct items of one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub source_file: String,
    pub items: Vec<Item>,
}

/// One-to-one implication mined from the transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub component: String,
    pub material: String,
    pub status: Option<Status>,
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
    pub antecedent: Item,
    pub consequent: Item,
}
