use ahash::AHashMap;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::Error;
use crate::model::{Item, PairKey, Record, Status, Transaction};

/// Status of every pair in the corpus, used to tag items in the extended mode.
pub type StatusLookup = AHashMap<PairKey, Status>;

/// The item a record contributes to its file's basket.
pub fn item_for(record: &Record, statuses: Option<&StatusLookup>) -> Result<Item, Error> {
    let status = match statuses {
        Some(lookup) => Some(*lookup.get(&record.pair()).ok_or_else(|| {
            Error::InvalidInput(format!(
                "no status for pair {} from {}",
                record.pair(),
                record.source_file
            ))
        })?),
        None => None,
    };
    Ok(Item::new(&record.component, &record.material, status))
}

/// Group `(source_file, item)` rows into one basket per file. Duplicates within
/// a file collapse; baskets come out in file-name order with sorted items.
pub fn build_transactions<'a, I>(rows: I) -> Vec<Transaction>
where
    I: IntoIterator<Item = (&'a str, Item)>,
{
    let mut baskets: BTreeMap<&'a str, BTreeSet<Item>> = BTreeMap::new();
    for (file, item) in rows {
        baskets.entry(file).or_default().insert(item);
    }

    baskets
        .into_iter()
        .filter(|(_, items)| !items.is_empty())
        .map(|(file, items)| Transaction {
            source_file: file.to_string(),
            items: items.into_iter().collect(),
        })
        .collect()
}

pub fn transactions_from_records(
    records: &[Record],
    statuses: Option<&StatusLookup>,
) -> Result<Vec<Transaction>, Error> {
    let rows = records
        .iter()
        .map(|r| Ok((r.source_file.as_str(), item_for(r, statuses)?)))
        .collect::<Result<Vec<_>, Error>>()?;
    Ok(build_transactions(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceType;

    fn record(component: &str, material: &str, file: &str) -> Record {
        Record {
            component: component.to_string(),
            material: material.to_string(),
            description: String::new(),
            source_file: file.to_string(),
            source_type: SourceType::Historical,
        }
    }

    #[test]
    fn test_one_basket_per_file_without_duplicates() {
        let records = vec![
            record("C1", "M1", "b.xlsx"),
            record("C1", "M1", "b.xlsx"),
            record("C2", "M2", "b.xlsx"),
            record("C1", "M1", "a.xlsx"),
        ];
        let transactions = transactions_from_records(&records, None).unwrap();

        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].source_file, "a.xlsx");
        assert_eq!(transactions[0].items, vec![Item::new("C1", "M1", None)]);
        assert_eq!(transactions[1].source_file, "b.xlsx");
        assert_eq!(
            transactions[1].items,
            vec![Item::new("C1", "M1", None), Item::new("C2", "M2", None)]
        );
    }

    #[test]
    fn test_basket_contents_independent_of_row_order() {
        let mut records = vec![
            record("C2", "M2", "f.xlsx"),
            record("C1", "M1", "f.xlsx"),
            record("C3", "M3", "g.xlsx"),
        ];
        let first = transactions_from_records(&records, None).unwrap();
        records.reverse();
        let second = transactions_from_records(&records, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_status_tagging_requires_lookup_entry() {
        let records = vec![record("C1", "M1", "a.xlsx"), record("C9", "M9", "a.xlsx")];
        let mut lookup = StatusLookup::new();
        lookup.insert(PairKey::new("C1", "M1"), Status::Rare);

        let err = transactions_from_records(&records, Some(&lookup)).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        lookup.insert(PairKey::new("C9", "M9"), Status::New);
        let transactions = transactions_from_records(&records, Some(&lookup)).unwrap();
        assert_eq!(
            transactions[0].items,
            vec![
                Item::new("C1", "M1", Some(Status::Rare)),
                Item::new("C9", "M9", Some(Status::New)),
            ]
        );
    }

    #[test]
    fn test_no_records_no_baskets() {
        assert!(transactions_from_records(&[], None).unwrap().is_empty());
    }
}
