use serde::{Deserialize, Serialize};

use crate::query::ast::Predicate;
use crate::query::types::{Projection, SortOrder};

/// What a `Sum` accumulator adds up per document: a named field's numeric
/// value, or a constant (the `sum(1)` counting idiom).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SumOperand {
    Field(String),
    Constant(i64),
}

/// Per-group reduction applied inside a `Group` stage, in document
/// arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Accumulator {
    /// Adds numeric field values (non-numeric and missing values are
    /// ignored) or a constant per document. All-integer input stays
    /// `Int`; any float makes the total `Float`.
    Sum(SumOperand),
    /// Mean of the field's numeric values; `Null` when none. Always
    /// `Float`.
    Avg(String),
    /// The field value of the first document that arrived in the group
    /// (`Null` when that document lacks the field). Order-sensitive: a
    /// preceding `Sort` stage is the only way to control which document
    /// is first.
    First(String),
    /// Number of documents in the group.
    Count,
}

/// A named accumulator: `field` is the output field on the group's
/// result document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorSpec {
    pub field: String,
    pub op: Accumulator,
}

impl AccumulatorSpec {
    pub fn sum_field(field: impl Into<String>, source: impl Into<String>) -> Self {
        AccumulatorSpec {
            field: field.into(),
            op: Accumulator::Sum(SumOperand::Field(source.into())),
        }
    }

    pub fn sum_constant(field: impl Into<String>, constant: i64) -> Self {
        AccumulatorSpec {
            field: field.into(),
            op: Accumulator::Sum(SumOperand::Constant(constant)),
        }
    }

    pub fn avg(field: impl Into<String>, source: impl Into<String>) -> Self {
        AccumulatorSpec {
            field: field.into(),
            op: Accumulator::Avg(source.into()),
        }
    }

    pub fn first(field: impl Into<String>, source: impl Into<String>) -> Self {
        AccumulatorSpec {
            field: field.into(),
            op: Accumulator::First(source.into()),
        }
    }

    pub fn count(field: impl Into<String>) -> Self {
        AccumulatorSpec {
            field: field.into(),
            op: Accumulator::Count,
        }
    }
}

/// One aggregation pipeline stage. Stages apply strictly in order; each
/// consumes the full output of the previous stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stage {
    Match(Predicate),
    Sort { field: String, order: SortOrder },
    Group {
        /// Grouping field; `None` folds the whole stream into a single
        /// group with `_id: Null`.
        key: Option<String>,
        accumulators: Vec<AccumulatorSpec>,
    },
    Project(Projection),
    /// Truncates to the first `n` documents; negative `n` is rejected
    /// with `InvalidArgument` at evaluation time.
    Limit(i64),
}

/// An ordered sequence of stages, built fluently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline { stages: Vec::new() }
    }

    pub fn matching(mut self, predicate: Predicate) -> Self {
        self.stages.push(Stage::Match(predicate));
        self
    }

    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.stages.push(Stage::Sort {
            field: field.into(),
            order,
        });
        self
    }

    pub fn group(mut self, key: Option<&str>, accumulators: Vec<AccumulatorSpec>) -> Self {
        self.stages.push(Stage::Group {
            key: key.map(str::to_string),
            accumulators,
        });
        self
    }

    pub fn project(mut self, projection: Projection) -> Self {
        self.stages.push(Stage::Project(projection));
        self
    }

    pub fn limit(mut self, n: i64) -> Self {
        self.stages.push(Stage::Limit(n));
        self
    }
}
