use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::Value;
use crate::query::ast::Predicate;

/// Sort order for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Sort specification for `find`: field plus direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        SortSpec {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        SortSpec {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }
}

/// Field-inclusion projection. Output keeps the declared field order;
/// `_id` is emitted first when included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub fields: Vec<String>,
    pub include_id: bool,
}

impl Projection {
    pub fn include<S: Into<String>>(fields: Vec<S>) -> Self {
        Projection {
            fields: fields.into_iter().map(Into::into).collect(),
            include_id: true,
        }
    }

    pub fn without_id(mut self) -> Self {
        self.include_id = false;
        self
    }

    /// Emit a new document containing only the projected fields, `_id`
    /// first when included, then the named fields in declared order.
    /// Fields absent from the source are skipped.
    pub fn apply(&self, doc: &crate::core::types::Document) -> crate::core::types::Document {
        use crate::core::types::{Document, ID_FIELD};

        let mut out = Document::new();
        if self.include_id {
            if let Some(id) = doc.id() {
                out.set(ID_FIELD, id.clone());
            }
        }
        for field in &self.fields {
            if field == ID_FIELD {
                continue;
            }
            if let Some(value) = doc.get(field) {
                out.set(field.clone(), value.clone());
            }
        }
        out
    }
}

/// Options applied by `find` after filtering: sort, then limit, then
/// projection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindOptions {
    pub projection: Option<Projection>,
    pub sort: Option<SortSpec>,
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn new() -> Self {
        FindOptions::default()
    }

    pub fn sort(mut self, spec: SortSpec) -> Self {
        self.sort = Some(spec);
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn project(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }
}

/// Outcome of `update_one` / `update_many`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateResult {
    pub matched_count: usize,
    pub modified_count: usize,
    pub upserted_id: Option<Value>,
}

/// Outcome of `delete_many`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub deleted_count: usize,
}

/// Predicate validation limits.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub max_clauses: usize,
    pub max_depth: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig {
            max_clauses: 1024,
            max_depth: 10,
        }
    }
}

/// Validates predicate structure before execution: bounded nesting depth
/// and bounded combinator fan-out.
pub struct PredicateValidator {
    config: ValidationConfig,
}

impl PredicateValidator {
    pub fn new(config: ValidationConfig) -> Self {
        PredicateValidator { config }
    }

    pub fn validate(&self, predicate: &Predicate) -> Result<()> {
        self.validate_node(predicate, 0)
    }

    fn validate_node(&self, predicate: &Predicate, depth: usize) -> Result<()> {
        if depth > self.config.max_depth {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!(
                    "predicate depth {} exceeds maximum {}",
                    depth, self.config.max_depth
                ),
            ));
        }

        match predicate {
            Predicate::And(children) | Predicate::Or(children) => {
                if children.len() > self.config.max_clauses {
                    return Err(Error::new(
                        ErrorKind::InvalidArgument,
                        format!(
                            "combinator has {} clauses, max is {}",
                            children.len(),
                            self.config.max_clauses
                        ),
                    ));
                }
                for child in children {
                    self.validate_node(child, depth + 1)?;
                }
            }
            _ => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validator_rejects_deep_nesting() {
        let mut pred = Predicate::eq("a", 1);
        for _ in 0..12 {
            pred = Predicate::and(vec![pred]);
        }

        let validator = PredicateValidator::new(ValidationConfig::default());
        let err = validator.validate(&pred).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn validator_accepts_reasonable_predicates() {
        let pred = Predicate::and(vec![
            Predicate::is_in("dname", vec!["COMP", "IT"]),
            Predicate::gte("salary", 10000),
        ]);
        let validator = PredicateValidator::new(ValidationConfig::default());
        assert!(validator.validate(&pred).is_ok());
    }
}
