use std::cmp::Ordering;

use crate::core::types::{Document, Value};
use crate::query::ast::Predicate;

/// Check whether a document satisfies a predicate.
///
/// Absent fields never error: a comparison against a missing field simply
/// fails the match, except for the explicit null-check `Eq(field, Null)`,
/// which treats a missing field like an explicit null.
pub fn matches(doc: &Document, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::All => true,

        Predicate::Eq { field, value } => match doc.get(field) {
            Some(actual) => Value::equals(actual, value),
            None => matches!(value, Value::Null),
        },

        Predicate::In { field, values } => match doc.get(field) {
            Some(actual) => values.iter().any(|v| Value::equals(actual, v)),
            None => false,
        },

        Predicate::Gte { field, value } => {
            compare_field(doc, field, value)
                .map(|ord| ord != Ordering::Less)
                .unwrap_or(false)
        }

        Predicate::Lte { field, value } => {
            compare_field(doc, field, value)
                .map(|ord| ord != Ordering::Greater)
                .unwrap_or(false)
        }

        Predicate::And(children) => children.iter().all(|p| matches(doc, p)),

        Predicate::Or(children) => children.iter().any(|p| matches(doc, p)),
    }
}

/// Ordering of the document's field relative to the literal, or `None`
/// when the field is absent or the values are type-incomparable.
fn compare_field(doc: &Document, field: &str, literal: &Value) -> Option<Ordering> {
    let actual = doc.get(field)?;
    if !Value::same_class(actual, literal) {
        return None;
    }
    Some(Value::compare(actual, literal))
}
