use ahash::AHashMap;
use std::collections::BTreeSet;

use crate::model::{Item, Transaction};

pub type ItemId = u32;

/// Dense ids for the distinct items of a transaction set, assigned in item order.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: Vec<Item>,
}

impl ItemCatalog {
    pub fn item(&self, id: ItemId) -> &Item {
        &self.items[id as usize]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Transactions as sorted id lists.
#[derive(Debug, Clone, Default)]
pub struct EncodedTransactions {
    pub catalog: ItemCatalog,
    pub baskets: Vec<Vec<ItemId>>,
}

impl EncodedTransactions {
    pub fn encode(transactions: &[Transaction]) -> Self {
        let distinct: BTreeSet<&Item> = transactions.iter().flat_map(|t| t.items.iter()).collect();

        let items: Vec<Item> = distinct.into_iter().cloned().collect();
        let ids: AHashMap<Item, ItemId> = items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.clone(), i as ItemId))
            .collect();

        let baskets = transactions
            .iter()
            .map(|t| {
                let mut basket: Vec<ItemId> = t
                    .items
                    .iter()
                    .filter_map(|item| ids.get(item).copied())
                    .collect();
                basket.sort_unstable();
                basket.dedup();
                basket
            })
            .filter(|basket| !basket.is_empty())
            .collect();

        Self {
            catalog: ItemCatalog { items },
            baskets,
        }
    }

    pub fn len(&self) -> usize {
        self.baskets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baskets.is_empty()
    }
}

/// A set of item ids (sorted ascending) and the number of baskets containing it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FrequentItemset {
    pub items: Vec<ItemId>,
    pub count: usize,
}

impl FrequentItemset {
    pub fn support(&self, n_transactions: usize) -> f64 {
        self.count as f64 / n_transactions as f64
    }
}

/// Itemset search shared by both algorithms.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    pub n_transactions: usize,
    pub min_support: f64,
    /// 0 means unbounded.
    pub max_len: usize,
}

impl SearchParams {
    pub fn is_frequent(&self, count: usize) -> bool {
        self.n_transactions > 0 && count as f64 / self.n_transactions as f64 >= self.min_support
    }

    pub fn can_grow(&self, len: usize) -> bool {
        self.max_len == 0 || len < self.max_len
    }
}

/// Canonical order: by length, then lexicographically by ids.
pub fn sort_itemsets(itemsets: &mut [FrequentItemset]) {
    itemsets.sort_by(|a, b| {
        a.items
            .len()
            .cmp(&b.items.len())
            .then_with(|| a.items.cmp(&b.items))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_assigns_ids_in_item_order() {
        let transactions = vec![
            Transaction {
                source_file: "a".to_string(),
                items: vec![Item::new("C2", "M2", None), Item::new("C1", "M1", None)],
            },
            Transaction {
                source_file: "b".to_string(),
                items: vec![Item::new("C1", "M1", None)],
            },
        ];
        let encoded = EncodedTransactions::encode(&transactions);
        assert_eq!(encoded.catalog.len(), 2);
        assert_eq!(encoded.catalog.item(0), &Item::new("C1", "M1", None));
        assert_eq!(encoded.baskets, vec![vec![0, 1], vec![0]]);
    }

    #[test]
    fn test_search_params_threshold_is_inclusive() {
        let params = SearchParams {
            n_transactions: 4,
            min_support: 0.5,
            max_len: 2,
        };
        assert!(params.is_frequent(2));
        assert!(!params.is_frequent(1));
        assert!(params.can_grow(1));
        assert!(!params.can_grow(2));
    }
}
