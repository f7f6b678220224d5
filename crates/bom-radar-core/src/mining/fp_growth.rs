use ahash::AHashMap;
use std::collections::BTreeMap;
use tracing::debug;

use super::itemsets::{sort_itemsets, FrequentItemset, ItemId, SearchParams};

const ROOT: usize = 0;

struct Node {
    item: ItemId,
    count: usize,
    parent: usize,
    children: AHashMap<ItemId, usize>,
}

/// Prefix tree of frequency-ordered transactions with per-item node lists.
struct FpTree {
    nodes: Vec<Node>,
    header: BTreeMap<ItemId, Vec<usize>>,
}

impl FpTree {
    /// Build from weighted paths, dropping items that are not frequent.
    fn build(paths: &[(Vec<ItemId>, usize)], params: &SearchParams) -> Self {
        let mut counts: AHashMap<ItemId, usize> = AHashMap::new();
        for (path, weight) in paths {
            for &item in path {
                *counts.entry(item).or_default() += weight;
            }
        }
        counts.retain(|_, count| params.is_frequent(*count));

        let mut tree = FpTree {
            nodes: vec![Node {
                item: 0,
                count: 0,
                parent: ROOT,
                children: AHashMap::new(),
            }],
            header: BTreeMap::new(),
        };

        for (path, weight) in paths {
            let mut ordered: Vec<ItemId> = path
                .iter()
                .copied()
                .filter(|item| counts.contains_key(item))
                .collect();
            let freq = |item: &ItemId| counts.get(item).copied().unwrap_or(0);
            ordered.sort_by(|a, b| freq(b).cmp(&freq(a)).then_with(|| a.cmp(b)));
            tree.insert(&ordered, *weight);
        }
        tree
    }

    fn insert(&mut self, path: &[ItemId], weight: usize) {
        let mut current = ROOT;
        for &item in path {
            current = match self.nodes[current].children.get(&item) {
                Some(&child) => {
                    self.nodes[child].count += weight;
                    child
                }
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(Node {
                        item,
                        count: weight,
                        parent: current,
                        children: AHashMap::new(),
                    });
                    self.nodes[current].children.insert(item, child);
                    self.header.entry(item).or_default().push(child);
                    child
                }
            };
        }
    }

    fn is_empty(&self) -> bool {
        self.header.is_empty()
    }

    /// Ancestor path (root excluded, root-first) of every node holding `item`,
    /// weighted by that node's count.
    fn conditional_paths(&self, item: ItemId) -> Vec<(Vec<ItemId>, usize)> {
        let Some(node_ids) = self.header.get(&item) else {
            return Vec::new();
        };
        node_ids
            .iter()
            .map(|&id| {
                let mut path = Vec::new();
                let mut current = self.nodes[id].parent;
                while current != ROOT {
                    path.push(self.nodes[current].item);
                    current = self.nodes[current].parent;
                }
                path.reverse();
                (path, self.nodes[id].count)
            })
            .filter(|(path, _)| !path.is_empty())
            .collect()
    }

    fn item_support(&self, item: ItemId) -> usize {
        self.header
            .get(&item)
            .map_or(0, |ids| ids.iter().map(|&id| self.nodes[id].count).sum())
    }
}

/// Frequent itemsets by FP-Growth. Produces the same itemsets as
/// [`super::apriori::frequent_itemsets`].
pub fn frequent_itemsets(baskets: &[Vec<ItemId>], params: &SearchParams) -> Vec<FrequentItemset> {
    let paths: Vec<(Vec<ItemId>, usize)> = baskets.iter().map(|b| (b.clone(), 1)).collect();
    let tree = FpTree::build(&paths, params);
    debug!("FP-tree built with {} nodes", tree.nodes.len());

    let mut result = Vec::new();
    mine(&tree, &[], params, &mut result);

    for itemset in &mut result {
        itemset.items.sort_unstable();
    }
    sort_itemsets(&mut result);
    result
}

fn mine(tree: &FpTree, suffix: &[ItemId], params: &SearchParams, out: &mut Vec<FrequentItemset>) {
    for &item in tree.header.keys() {
        let count = tree.item_support(item);
        if !params.is_frequent(count) {
            continue;
        }

        let mut itemset = Vec::with_capacity(suffix.len() + 1);
        itemset.push(item);
        itemset.extend_from_slice(suffix);
        out.push(FrequentItemset {
            items: itemset.clone(),
            count,
        });

        if !params.can_grow(itemset.len()) {
            continue;
        }
        let conditional = FpTree::build(&tree.conditional_paths(item), params);
        if !conditional.is_empty() {
            mine(&conditional, &itemset, params, out);
        }
    }
}
