use std::collections::BTreeMap;

use tracing::debug;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Document, ID_FIELD, Value};
use crate::index::IndexKey;

/// Emit function: zero or more (key, value) pairs per source document.
pub type EmitFn<'a> = dyn Fn(&Document) -> Result<Vec<(Value, Value)>> + 'a;

/// Reduce function: folds all of a key's emitted values into one value.
/// Called exactly once per distinct key, with the values in emission
/// order across the full input scan.
pub type ReduceFn<'a> = dyn Fn(&Value, &[Value]) -> Result<Value> + 'a;

/// Run a map/reduce job over a snapshot of documents.
///
/// Documents are scanned in storage order; emitted values group per key
/// preserving arrival order; output documents are `{_id: key, value:
/// reduced}` in first-emission key order. Any emit or reduce error aborts
/// the whole job with `ReductionFailure`; callers see all of the output
/// or none of it.
pub fn execute(snapshot: &[Document], emit: &EmitFn, reduce: &ReduceFn) -> Result<Vec<Document>> {
    let mut slot_of: BTreeMap<IndexKey, usize> = BTreeMap::new();
    let mut grouped: Vec<(Value, Vec<Value>)> = Vec::new();

    for doc in snapshot {
        let pairs = emit(doc)
            .map_err(|err| Error::reduction_failure(format!("emit failed: {}", err)))?;

        for (key, value) in pairs {
            let slot = *slot_of.entry(IndexKey(key.clone())).or_insert_with(|| {
                grouped.push((key, Vec::new()));
                grouped.len() - 1
            });
            grouped[slot].1.push(value);
        }
    }

    let mut out = Vec::with_capacity(grouped.len());
    for (key, values) in grouped {
        let reduced = reduce(&key, &values).map_err(|err| {
            Error::reduction_failure(format!("reduce failed for key {:?}: {}", key, err))
        })?;
        out.push(
            Document::new()
                .with(ID_FIELD, key)
                .with("value", reduced),
        );
    }

    debug!(keys = out.len(), scanned = snapshot.len(), "map/reduce complete");
    Ok(out)
}
