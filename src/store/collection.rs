use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Document, ID_FIELD, Value};
use crate::index::{FieldIndex, IndexKey};
use crate::query::ast::Predicate;
use crate::query::matcher;

/// A named, insertion-ordered sequence of documents plus its indexes.
///
/// Storage order is never rearranged; sorting happens only in result
/// streams. The version counter increments on every mutation and keys
/// cached query results.
#[derive(Debug)]
pub struct Collection {
    name: String,
    docs: Vec<Document>,
    id_positions: BTreeMap<IndexKey, usize>,
    indexes: HashMap<String, FieldIndex>,
    version: u64,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Collection {
            name: name.into(),
            docs: Vec::new(),
            id_positions: BTreeMap::new(),
            indexes: HashMap::new(),
            version: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn documents(&self) -> &[Document] {
        &self.docs
    }

    /// Point-in-time copy for snapshot-isolated readers.
    pub fn snapshot(&self) -> Vec<Document> {
        self.docs.clone()
    }

    pub fn contains_id(&self, id: &Value) -> bool {
        self.id_positions.contains_key(&IndexKey(id.clone()))
    }

    /// Append a document, assigning a fresh `_id` when the caller did not
    /// supply one. An explicit id colliding with a stored one is a
    /// `DuplicateKey` error and leaves the collection untouched.
    pub fn insert(&mut self, mut doc: Document) -> Result<Value> {
        let id = match doc.id() {
            Some(id) => id.clone(),
            None => {
                let id = Value::Text(uuid::Uuid::new_v4().to_string());
                doc.set(ID_FIELD, id.clone());
                id
            }
        };

        if self.contains_id(&id) {
            return Err(Error::duplicate_key(format!(
                "duplicate _id {:?} in collection '{}'",
                id, self.name
            )));
        }

        for index in self.indexes.values_mut() {
            index.insert_document(id.clone(), &doc);
        }
        self.id_positions.insert(IndexKey(id.clone()), self.docs.len());
        self.docs.push(doc);
        self.version += 1;

        Ok(id)
    }

    /// Overwrite or add the named fields of the document at `position`,
    /// leaving every other field untouched. Returns whether any value
    /// actually changed. `_id` is immutable and must not appear in `set`.
    pub fn apply_set(&mut self, position: usize, set: &Document) -> Result<bool> {
        if set.contains(ID_FIELD) {
            return Err(Error::invalid_argument("_id is immutable and cannot be set"));
        }

        let doc = self
            .docs
            .get_mut(position)
            .ok_or_else(|| Error::new(ErrorKind::Internal, "document position out of range".to_string()))?;
        let id = doc
            .id()
            .cloned()
            .ok_or_else(|| Error::new(ErrorKind::Internal, "stored document lacks _id".to_string()))?;

        let mut modified = false;
        for (field, new_value) in set.iter() {
            let old_value = doc.get(field).cloned();
            let changed = match &old_value {
                Some(existing) => existing != new_value,
                None => true,
            };
            if !changed {
                continue;
            }

            doc.set(field, new_value.clone());
            modified = true;

            if let Some(index) = self.indexes.get_mut(field) {
                index.remove(&id, &old_value.unwrap_or(Value::Null));
                index.insert(id.clone(), new_value.clone());
            }
        }

        if modified {
            self.version += 1;
        }
        Ok(modified)
    }

    /// Remove every document matching the predicate. Positions shift, so
    /// the id map and all field indexes are rebuilt afterwards.
    pub fn delete_where(&mut self, predicate: &Predicate) -> usize {
        let before = self.docs.len();
        self.docs.retain(|doc| !matcher::matches(doc, predicate));
        let deleted = before - self.docs.len();

        if deleted > 0 {
            self.rebuild_lookups();
            self.version += 1;
            debug!(
                collection = %self.name,
                deleted,
                "rebuilt id map and {} index(es) after delete",
                self.indexes.len()
            );
        }
        deleted
    }

    /// Create a single-field ascending index, built eagerly. Creating an
    /// index that already exists is a no-op returning `false`.
    pub fn create_index(&mut self, field: &str) -> bool {
        if self.indexes.contains_key(field) {
            return false;
        }
        let index = FieldIndex::build(field, &self.docs);
        debug!(collection = %self.name, field, entries = index.entry_count(), "created index");
        self.indexes.insert(field.to_string(), index);
        true
    }

    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn index_count(&self) -> usize {
        self.indexes.len()
    }

    /// Storage positions of documents matching the predicate, in storage
    /// order.
    pub fn matching_positions(&self, predicate: &Predicate) -> Vec<usize> {
        match self.candidate_positions(predicate) {
            Some(candidates) => candidates
                .into_iter()
                .filter(|&pos| matcher::matches(&self.docs[pos], predicate))
                .collect(),
            None => self
                .docs
                .iter()
                .enumerate()
                .filter(|(_, doc)| matcher::matches(doc, predicate))
                .map(|(pos, _)| pos)
                .collect(),
        }
    }

    /// Matching documents in storage order, using an index for candidate
    /// pruning when one applies. Results never depend on index presence.
    pub fn find_matching(&self, predicate: &Predicate) -> Vec<Document> {
        self.matching_positions(predicate)
            .into_iter()
            .map(|pos| self.docs[pos].clone())
            .collect()
    }

    /// Candidate storage positions from an applicable field index, or
    /// `None` when no index can serve the predicate. Candidates may be a
    /// superset of the true matches; callers re-verify with the matcher.
    fn candidate_positions(&self, predicate: &Predicate) -> Option<Vec<usize>> {
        match predicate {
            Predicate::Eq { field, value } => {
                let index = self.indexes.get(field)?;
                Some(self.positions_of(index.lookup(value)))
            }
            Predicate::Gte { field, value } => {
                let index = self.indexes.get(field)?;
                Some(self.positions_of(index.lookup_gte(value)))
            }
            Predicate::Lte { field, value } => {
                let index = self.indexes.get(field)?;
                Some(self.positions_of(index.lookup_lte(value)))
            }
            Predicate::And(children) => children
                .iter()
                .find_map(|child| self.candidate_positions(child)),
            _ => None,
        }
    }

    fn positions_of(&self, ids: Vec<Value>) -> Vec<usize> {
        let mut positions: Vec<usize> = ids
            .iter()
            .filter_map(|id| self.id_positions.get(&IndexKey(id.clone())).copied())
            .collect();
        positions.sort_unstable();
        positions
    }

    fn rebuild_lookups(&mut self) {
        self.id_positions = self
            .docs
            .iter()
            .enumerate()
            .filter_map(|(pos, doc)| doc.id().map(|id| (IndexKey(id.clone()), pos)))
            .collect();

        for index in self.indexes.values_mut() {
            *index = FieldIndex::build(index.field().to_string(), &self.docs);
        }
    }
}
