use std::collections::HashMap;

use crate::model::Relation;
use crate::normalize::normalize_cell;

/// Row positions of one relation grouped by normalized identity key.
///
/// Positions keep file order, so `first` is the row a per-key scan of the
/// relation would have hit first.
#[derive(Debug, Default)]
pub struct KeyIndex {
    rows_by_key: HashMap<String, Vec<usize>>,
    pub rows: usize,
    pub blank_keys: usize,
}

impl KeyIndex {
    pub fn matches(&self, key: &str) -> &[usize] {
        self.rows_by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, key: &str) -> Option<usize> {
        self.matches(key).first().copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.rows_by_key.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows_by_key.keys().map(String::as_str)
    }

    pub fn key_count(&self) -> usize {
        self.rows_by_key.len()
    }

    /// Keys carried by more than one row.
    pub fn duplicated(&self) -> impl Iterator<Item = (&str, usize)> {
        self.rows_by_key
            .iter()
            .filter(|(_, rows)| rows.len() > 1)
            .map(|(k, rows)| (k.as_str(), rows.len()))
    }
}

/// Normalize the identity column of `relation` and index it by key.
/// Rows whose key normalizes to nothing are counted and left out.
pub fn index_relation(relation: &Relation) -> KeyIndex {
    let mut index = KeyIndex {
        rows: relation.len(),
        ..Default::default()
    };

    for row in 0..relation.len() {
        let key = normalize_cell(relation.cell(row, relation.columns.identity));
        if key.is_empty() {
            index.blank_keys += 1;
            continue;
        }
        index.rows_by_key.entry(key).or_default().push(row);
    }

    if index.blank_keys > 0 {
        log::warn!(
            "{}: {} row(s) without a usable document were skipped",
            relation.name,
            index.blank_keys
        );
    }

    index
}
