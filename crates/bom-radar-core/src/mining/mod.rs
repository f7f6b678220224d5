pub mod apriori;
pub mod fp_growth;
pub mod itemsets;
pub mod rules;
pub mod sampling;

use serde::Serialize;
use tracing::{debug, info};

use crate::analysis::transactions::{build_transactions, item_for, StatusLookup};
use crate::config::{MiningAlgorithm, MiningConfig};
use crate::error::Error;
use crate::model::{Record, Rule, Transaction};
use itemsets::{EncodedTransactions, FrequentItemset, SearchParams};
pub use sampling::SamplingSummary;

#[derive(Debug, Clone, Default, Serialize)]
pub struct MiningOutcome {
    pub rules: Vec<Rule>,
    pub transactions: usize,
    pub frequent_itemsets: usize,
    /// Rules of any shape before restricting to one-to-one.
    pub rules_derived: usize,
    pub sampling: Option<SamplingSummary>,
}

/// Mines one-to-one component → material rules from BOM baskets.
#[derive(Debug, Clone)]
pub struct RuleMiner {
    config: MiningConfig,
}

impl RuleMiner {
    pub fn new(config: MiningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MiningConfig {
        &self.config
    }

    pub fn frequent_itemsets(&self, encoded: &EncodedTransactions) -> Vec<FrequentItemset> {
        let params = SearchParams {
            n_transactions: encoded.len(),
            min_support: self.config.min_support,
            max_len: self.config.max_itemset_len,
        };
        match self.config.algorithm {
            MiningAlgorithm::Apriori => apriori::frequent_itemsets(&encoded.baskets, &params),
            MiningAlgorithm::FpGrowth => fp_growth::frequent_itemsets(&encoded.baskets, &params),
        }
    }

    /// An empty rule set is a valid result, not an error.
    pub fn mine_transactions(&self, transactions: &[Transaction]) -> MiningOutcome {
        let encoded = EncodedTransactions::encode(transactions);
        let itemsets = self.frequent_itemsets(&encoded);
        debug!(
            "Found {} frequent itemsets over {} transactions ({} items)",
            itemsets.len(),
            encoded.len(),
            encoded.catalog.len()
        );

        let derived = rules::derive_rules(&itemsets, encoded.len(), self.config.min_confidence);
        let simple = rules::simple_rules(&derived, &encoded.catalog);
        info!(
            "Mined {} one-to-one rules ({} rules derived)",
            simple.len(),
            derived.len()
        );

        MiningOutcome {
            rules: simple,
            transactions: encoded.len(),
            frequent_itemsets: itemsets.len(),
            rules_derived: derived.len(),
            sampling: None,
        }
    }

    /// Build baskets from records (tagging items with status when configured
    /// and `statuses` is given), apply the sampling policy if enabled, and mine.
    pub fn mine_records(
        &self,
        records: &[Record],
        statuses: Option<&StatusLookup>,
    ) -> Result<MiningOutcome, Error> {
        let lookup = if self.config.items_include_status {
            Some(statuses.ok_or_else(|| {
                Error::InvalidInput("status-tagged mining requires pair statuses".to_string())
            })?)
        } else {
            None
        };

        let rows = records
            .iter()
            .map(|r| Ok((r, item_for(r, lookup)?)))
            .collect::<Result<Vec<_>, Error>>()?;

        let (rows, summary) = if self.config.sampling.enabled {
            let (rows, summary) =
                sampling::sample_rows(rows, &self.config.sampling, self.config.min_support);
            (rows, Some(summary))
        } else {
            (rows, None)
        };

        let transactions =
            build_transactions(rows.into_iter().map(|(r, item)| (r.source_file.as_str(), item)));
        let mut outcome = self.mine_transactions(&transactions);
        outcome.sampling = summary;
        Ok(outcome)
    }
}
