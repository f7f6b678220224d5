use ahash::{AHashMap, AHashSet};
use tracing::debug;

use super::itemsets::{sort_itemsets, FrequentItemset, ItemId, SearchParams};

/// Level-wise frequent itemset search.
///
/// Level k candidates join two frequent (k-1)-itemsets sharing their first
/// k-2 ids, and are pruned unless every (k-1)-subset is frequent.
pub fn frequent_itemsets(baskets: &[Vec<ItemId>], params: &SearchParams) -> Vec<FrequentItemset> {
    let mut single_counts: AHashMap<ItemId, usize> = AHashMap::new();
    for basket in baskets {
        for &item in basket {
            *single_counts.entry(item).or_default() += 1;
        }
    }

    let mut level: Vec<FrequentItemset> = single_counts
        .into_iter()
        .filter(|&(_, count)| params.is_frequent(count))
        .map(|(item, count)| FrequentItemset {
            items: vec![item],
            count,
        })
        .collect();
    sort_itemsets(&mut level);

    let mut result: Vec<FrequentItemset> = Vec::new();
    let mut k = 1;
    while !level.is_empty() {
        debug!("Apriori level {}: {} frequent itemsets", k, level.len());
        let next = if params.can_grow(k) {
            let candidates = generate_candidates(&level);
            count_candidates(baskets, candidates, params)
        } else {
            Vec::new()
        };
        result.append(&mut level);
        level = next;
        k += 1;
    }

    sort_itemsets(&mut result);
    result
}

fn generate_candidates(level: &[FrequentItemset]) -> Vec<Vec<ItemId>> {
    let known: AHashSet<&[ItemId]> = level.iter().map(|f| f.items.as_slice()).collect();
    let mut candidates = Vec::new();

    for (i, a) in level.iter().enumerate() {
        for b in &level[i + 1..] {
            let prefix_len = a.items.len() - 1;
            if a.items[..prefix_len] != b.items[..prefix_len] {
                // Level is sorted, so no later itemset shares this prefix.
                break;
            }
            let mut candidate = a.items.clone();
            candidate.push(b.items[prefix_len]);

            let all_subsets_frequent = (0..candidate.len()).all(|skip| {
                let subset: Vec<ItemId> = candidate
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != skip)
                    .map(|(_, &id)| id)
                    .collect();
                known.contains(subset.as_slice())
            });
            if all_subsets_frequent {
                candidates.push(candidate);
            }
        }
    }
    candidates
}

fn count_candidates(
    baskets: &[Vec<ItemId>],
    candidates: Vec<Vec<ItemId>>,
    params: &SearchParams,
) -> Vec<FrequentItemset> {
    candidates
        .into_iter()
        .filter_map(|items| {
            let count = baskets
                .iter()
                .filter(|basket| items.iter().all(|id| basket.binary_search(id).is_ok()))
                .count();
            params
                .is_frequent(count)
                .then_some(FrequentItemset { items, count })
        })
        .collect()
}
