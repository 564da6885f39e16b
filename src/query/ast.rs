use serde::{Deserialize, Serialize};

use crate::core::types::Value;

/// Predicate tree evaluated against a single document.
///
/// Comparison nodes name a field and a literal; combinators compose
/// sub-predicates. `All` matches every document and is the identity for
/// `And`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Matches every document.
    All,
    /// Field present and strictly equal to the literal. As the explicit
    /// null-check, `Eq(field, Null)` also matches a missing field.
    Eq { field: String, value: Value },
    /// Field value is a member of the literal set.
    In { field: String, values: Vec<Value> },
    /// Field present, same type class, and >= the literal.
    Gte { field: String, value: Value },
    /// Field present, same type class, and <= the literal.
    Lte { field: String, value: Value },
    /// All sub-predicates match; empty list matches everything.
    And(Vec<Predicate>),
    /// At least one sub-predicate matches; empty list matches nothing.
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_in<V: Into<Value>>(field: impl Into<String>, values: Vec<V>) -> Self {
        Predicate::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Gte {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Lte {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn and(predicates: Vec<Predicate>) -> Self {
        Predicate::And(predicates)
    }

    pub fn or(predicates: Vec<Predicate>) -> Self {
        Predicate::Or(predicates)
    }

    /// Equality bindings contributed by this predicate, used to seed an
    /// upserted document. `Eq` contributes its field; `And` contributes
    /// its children's bindings. Range and `Or` nodes pin down no single
    /// value and contribute nothing.
    pub fn equality_fields(&self) -> Vec<(&str, &Value)> {
        let mut out = Vec::new();
        self.collect_equality_fields(&mut out);
        out
    }

    fn collect_equality_fields<'a>(&'a self, out: &mut Vec<(&'a str, &'a Value)>) {
        match self {
            Predicate::Eq { field, value } => out.push((field.as_str(), value)),
            Predicate::And(children) => {
                for child in children {
                    child.collect_equality_fields(out);
                }
            }
            _ => {}
        }
    }
}
