use ahash::AHashMap;
use tracing::warn;

use super::itemsets::{FrequentItemset, ItemCatalog, ItemId};
use crate::model::Rule;

/// Largest itemset whose splits are enumerated; a bitmask covers the subsets.
const MAX_SPLIT_LEN: usize = 20;

/// A directional rule between two disjoint itemsets.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationRule {
    pub antecedent: Vec<ItemId>,
    pub consequent: Vec<ItemId>,
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
}

impl AssociationRule {
    pub fn is_one_to_one(&self) -> bool {
        self.antecedent.len() == 1 && self.consequent.len() == 1
    }
}

/// Every antecedent/consequent split of every frequent itemset whose
/// confidence reaches `min_confidence`.
pub fn derive_rules(
    itemsets: &[FrequentItemset],
    n_transactions: usize,
    min_confidence: f64,
) -> Vec<AssociationRule> {
    if n_transactions == 0 {
        return Vec::new();
    }
    let n = n_transactions as f64;
    let counts: AHashMap<&[ItemId], usize> = itemsets
        .iter()
        .map(|f| (f.items.as_slice(), f.count))
        .collect();

    let mut rules = Vec::new();
    for itemset in itemsets.iter().filter(|f| f.items.len() >= 2) {
        let len = itemset.items.len();
        if len > MAX_SPLIT_LEN {
            warn!("Skipping rule derivation for itemset of {} items", len);
            continue;
        }
        let support = itemset.count as f64 / n;

        for mask in 1..(1u32 << len) - 1 {
            let (antecedent, consequent): (Vec<ItemId>, Vec<ItemId>) = split(&itemset.items, mask);
            let (Some(&a_count), Some(&c_count)) = (
                counts.get(antecedent.as_slice()),
                counts.get(consequent.as_slice()),
            ) else {
                continue;
            };

            let confidence = itemset.count as f64 / a_count as f64;
            if confidence < min_confidence {
                continue;
            }
            let lift = confidence / (c_count as f64 / n);
            rules.push(AssociationRule {
                antecedent,
                consequent,
                support,
                confidence,
                lift,
            });
        }
    }
    rules
}

fn split(items: &[ItemId], mask: u32) -> (Vec<ItemId>, Vec<ItemId>) {
    let mut antecedent = Vec::new();
    let mut consequent = Vec::new();
    for (bit, &id) in items.iter().enumerate() {
        if mask & (1 << bit) != 0 {
            antecedent.push(id);
        } else {
            consequent.push(id);
        }
    }
    (antecedent, consequent)
}

/// Keep one-to-one rules and read them as component (from the antecedent)
/// implies material (from the consequent). Sorted by component, material,
/// then the full item keys.
pub fn simple_rules(rules: &[AssociationRule], catalog: &ItemCatalog) -> Vec<Rule> {
    let mut simple: Vec<Rule> = rules
        .iter()
        .filter(|r| r.is_one_to_one())
        .map(|r| {
            let antecedent = catalog.item(r.antecedent[0]).clone();
            let consequent = catalog.item(r.consequent[0]).clone();
            Rule {
                component: antecedent.component.clone(),
                material: consequent.material.clone(),
                status: consequent.status,
                support: r.support,
                confidence: r.confidence,
                lift: r.lift,
                antecedent,
                consequent,
            }
        })
        .collect();

    simple.sort_by(|a, b| {
        a.component
            .cmp(&b.component)
            .then_with(|| a.material.cmp(&b.material))
            .then_with(|| a.antecedent.cmp(&b.antecedent))
            .then_with(|| a.consequent.cmp(&b.consequent))
    });
    simple
}
