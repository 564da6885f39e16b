use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{Document, Value};

/// Orderable wrapper giving `Value` the total order required by the
/// index tree and the sort stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexKey(pub Value);

impl Eq for IndexKey {}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        Value::compare(&self.0, &other.0)
    }
}

/// Single-field ascending index: field value to the ids of the documents
/// holding that value, ids kept in insertion order per entry.
///
/// Documents missing the field are indexed under `Null`, so the explicit
/// null-check predicate stays servable from the index. Inserts and
/// single-document updates maintain entries incrementally; bulk deletes
/// rebuild the whole index, trading O(n log n) per delete batch for not
/// having to track shifting storage positions.
#[derive(Debug, Clone)]
pub struct FieldIndex {
    field: String,
    entries: BTreeMap<IndexKey, Vec<Value>>,
}

impl FieldIndex {
    pub fn new(field: impl Into<String>) -> Self {
        FieldIndex {
            field: field.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Build eagerly from the current collection contents.
    pub fn build(field: impl Into<String>, docs: &[Document]) -> Self {
        let mut index = FieldIndex::new(field);
        for doc in docs {
            if let Some(id) = doc.id() {
                index.insert_document(id.clone(), doc);
            }
        }
        index
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Index a document under its value for this field (or `Null` when
    /// the field is missing).
    pub fn insert_document(&mut self, id: Value, doc: &Document) {
        let key = doc.get(&self.field).cloned().unwrap_or(Value::Null);
        self.insert(id, key);
    }

    pub fn insert(&mut self, id: Value, value: Value) {
        self.entries.entry(IndexKey(value)).or_default().push(id);
    }

    pub fn remove(&mut self, id: &Value, old_value: &Value) {
        let key = IndexKey(old_value.clone());
        if let Some(ids) = self.entries.get_mut(&key) {
            ids.retain(|existing| !Value::equals(existing, id));
            if ids.is_empty() {
                self.entries.remove(&key);
            }
        }
    }

    /// Ids of documents whose field strictly equals `value`.
    pub fn lookup(&self, value: &Value) -> Vec<Value> {
        self.entries
            .get(&IndexKey(value.clone()))
            .cloned()
            .unwrap_or_default()
    }

    /// Ids of documents whose field is >= `value`, staying within the
    /// probe value's type class.
    pub fn lookup_gte(&self, value: &Value) -> Vec<Value> {
        self.entries
            .range(IndexKey(value.clone())..)
            .take_while(|(key, _)| Value::same_class(&key.0, value))
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect()
    }

    /// Ids of documents whose field is <= `value`, staying within the
    /// probe value's type class.
    pub fn lookup_lte(&self, value: &Value) -> Vec<Value> {
        self.entries
            .range(..=IndexKey(value.clone()))
            .filter(|(key, _)| Value::same_class(&key.0, value))
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}
