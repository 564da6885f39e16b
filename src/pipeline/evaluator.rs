use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Document, ID_FIELD, Value};
use crate::index::IndexKey;
use crate::pipeline::stage::{Accumulator, AccumulatorSpec, Pipeline, Stage, SumOperand};
use crate::query::matcher;
use crate::query::types::SortOrder;

/// Execute a pipeline over a snapshot of documents.
///
/// Stages run eagerly, left to right, each consuming the full output of
/// the previous one. The evaluator is a pure function of its input:
/// running the same pipeline twice on the same snapshot yields identical
/// output.
pub fn run(snapshot: Vec<Document>, pipeline: &Pipeline) -> Result<Vec<Document>> {
    let mut stream = snapshot;
    for stage in &pipeline.stages {
        stream = apply_stage(stream, stage)?;
    }
    Ok(stream)
}

fn apply_stage(docs: Vec<Document>, stage: &Stage) -> Result<Vec<Document>> {
    match stage {
        Stage::Match(predicate) => Ok(docs
            .into_iter()
            .filter(|doc| matcher::matches(doc, predicate))
            .collect()),

        Stage::Sort { field, order } => Ok(sort_stage(docs, field, *order)),

        Stage::Group { key, accumulators } => Ok(group_stage(docs, key.as_deref(), accumulators)),

        Stage::Project(projection) => Ok(docs.iter().map(|doc| projection.apply(doc)).collect()),

        Stage::Limit(n) => {
            if *n < 0 {
                return Err(Error::invalid_argument(format!(
                    "limit must be non-negative, got {}",
                    n
                )));
            }
            let mut docs = docs;
            docs.truncate(*n as usize);
            Ok(docs)
        }
    }
}

/// Stable sort on one field. A document missing the field sorts as less
/// than any present value (so it comes last under `Desc`); ties keep
/// their arrival order in both directions.
pub fn sort_stage(mut docs: Vec<Document>, field: &str, order: SortOrder) -> Vec<Document> {
    docs.sort_by(|a, b| {
        let ord = compare_sort_keys(a.get(field), b.get(field));
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
    docs
}

fn compare_sort_keys(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => Value::compare(x, y),
    }
}

fn group_stage(docs: Vec<Document>, key: Option<&str>, accumulators: &[AccumulatorSpec]) -> Vec<Document> {
    // Groups are emitted in the order their keys are first seen, and
    // accumulators observe documents in arrival order.
    let mut slot_of: BTreeMap<IndexKey, usize> = BTreeMap::new();
    let mut groups: Vec<(Value, Vec<AccState>)> = Vec::new();

    for doc in &docs {
        let key_value = match key {
            Some(field) => doc.get(field).cloned().unwrap_or(Value::Null),
            None => Value::Null,
        };

        let slot = *slot_of
            .entry(IndexKey(key_value.clone()))
            .or_insert_with(|| {
                groups.push((key_value, accumulators.iter().map(AccState::new).collect()));
                groups.len() - 1
            });

        let (_, states) = &mut groups[slot];
        for (state, spec) in states.iter_mut().zip(accumulators) {
            state.update(doc, &spec.op);
        }
    }

    groups
        .into_iter()
        .map(|(key_value, states)| {
            let mut out = Document::new().with(ID_FIELD, key_value);
            for (spec, state) in accumulators.iter().zip(states) {
                out.set(spec.field.clone(), state.finish());
            }
            out
        })
        .collect()
}

/// Running state of one accumulator within one group.
enum AccState {
    Sum {
        int_total: i64,
        float_total: f64,
        any_float: bool,
    },
    Avg {
        total: f64,
        count: usize,
    },
    First(Option<Value>),
    Count(usize),
}

impl AccState {
    fn new(spec: &AccumulatorSpec) -> Self {
        match &spec.op {
            Accumulator::Sum(_) => AccState::Sum {
                int_total: 0,
                float_total: 0.0,
                any_float: false,
            },
            Accumulator::Avg(_) => AccState::Avg {
                total: 0.0,
                count: 0,
            },
            Accumulator::First(_) => AccState::First(None),
            Accumulator::Count => AccState::Count(0),
        }
    }

    fn update(&mut self, doc: &Document, op: &Accumulator) {
        match (self, op) {
            (
                AccState::Sum {
                    int_total,
                    float_total,
                    any_float,
                },
                Accumulator::Sum(operand),
            ) => match operand {
                SumOperand::Constant(k) => *int_total += k,
                SumOperand::Field(field) => match doc.get(field) {
                    Some(Value::Int(n)) => *int_total += n,
                    Some(Value::Float(f)) => {
                        *float_total += f;
                        *any_float = true;
                    }
                    _ => {}
                },
            },

            (AccState::Avg { total, count }, Accumulator::Avg(field)) => {
                if let Some(x) = doc.get(field).and_then(Value::as_f64) {
                    *total += x;
                    *count += 1;
                }
            }

            (AccState::First(slot), Accumulator::First(field)) => {
                if slot.is_none() {
                    *slot = Some(doc.get(field).cloned().unwrap_or(Value::Null));
                }
            }

            (AccState::Count(n), Accumulator::Count) => *n += 1,

            _ => {}
        }
    }

    fn finish(self) -> Value {
        match self {
            AccState::Sum {
                int_total,
                float_total,
                any_float,
            } => {
                if any_float {
                    Value::Float(float_total + int_total as f64)
                } else {
                    Value::Int(int_total)
                }
            }
            AccState::Avg { total, count } => {
                if count == 0 {
                    Value::Null
                } else {
                    Value::Float(total / count as f64)
                }
            }
            AccState::First(slot) => slot.unwrap_or(Value::Null),
            AccState::Count(n) => Value::Int(n as i64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stage::AccumulatorSpec;
    use crate::query::ast::Predicate;
    use crate::query::types::Projection;

    fn book(title: &str, author: &str, genre: &str, price: i64) -> Document {
        Document::new()
            .with("title", title)
            .with("author", author)
            .with("genre", genre)
            .with("price", price)
    }

    fn bookstore() -> Vec<Document> {
        vec![
            book("Echoes of Tomorrow", "Ravi Sharma", "Fiction", 500),
            book("Whispers in the Fog", "Anita Rao", "Mystery", 600),
            book("The Last Horizon", "Ravi Sharma", "Fiction", 700),
            book("Stars Beyond Reach", "Karan Mehta", "Sci-Fi", 800),
            book("The Hidden Truth", "Anita Rao", "Mystery", 550),
        ]
    }

    #[test]
    fn average_price_over_single_group() {
        let pipeline =
            Pipeline::new().group(None, vec![AccumulatorSpec::avg("avgPrice", "price")]);
        let out = run(bookstore(), &pipeline).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get(ID_FIELD), Some(&Value::Null));
        assert_eq!(out[0].get("avgPrice"), Some(&Value::Float(630.0)));
    }

    #[test]
    fn count_per_genre() {
        let pipeline = Pipeline::new().group(
            Some("genre"),
            vec![AccumulatorSpec::sum_constant("count", 1)],
        );
        let out = run(bookstore(), &pipeline).unwrap();

        assert_eq!(out.len(), 3);
        // first-seen key order
        assert_eq!(out[0].get(ID_FIELD), Some(&Value::Text("Fiction".into())));
        assert_eq!(out[0].get("count"), Some(&Value::Int(2)));
        assert_eq!(out[1].get(ID_FIELD), Some(&Value::Text("Mystery".into())));
        assert_eq!(out[2].get(ID_FIELD), Some(&Value::Text("Sci-Fi".into())));
        assert_eq!(out[2].get("count"), Some(&Value::Int(1)));
    }

    #[test]
    fn sort_then_first_picks_group_maximum() {
        let pipeline = Pipeline::new().sort("price", SortOrder::Desc).group(
            Some("genre"),
            vec![
                AccumulatorSpec::first("mostExpensiveBook", "title"),
                AccumulatorSpec::first("price", "price"),
            ],
        );
        let out = run(bookstore(), &pipeline).unwrap();
        assert_eq!(out.len(), 3);

        let by_genre = |genre: &str| {
            out.iter()
                .find(|d| d.get(ID_FIELD) == Some(&Value::Text(genre.into())))
                .unwrap()
        };
        let fiction = by_genre("Fiction");
        assert_eq!(
            fiction.get("mostExpensiveBook"),
            Some(&Value::Text("The Last Horizon".into()))
        );
        assert_eq!(fiction.get("price"), Some(&Value::Int(700)));

        assert_eq!(by_genre("Mystery").get("price"), Some(&Value::Int(600)));
        assert_eq!(by_genre("Sci-Fi").get("price"), Some(&Value::Int(800)));
    }

    #[test]
    fn top_author_tie_breaks_by_first_seen() {
        // Ravi Sharma and Anita Rao both wrote two books; Ravi's first
        // book arrives first, so the stable sort keeps him on top.
        let pipeline = Pipeline::new()
            .group(
                Some("author"),
                vec![AccumulatorSpec::sum_constant("bookCount", 1)],
            )
            .sort("bookCount", SortOrder::Desc)
            .limit(1);
        let out = run(bookstore(), &pipeline).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].get(ID_FIELD),
            Some(&Value::Text("Ravi Sharma".into()))
        );
        assert_eq!(out[0].get("bookCount"), Some(&Value::Int(2)));
    }

    #[test]
    fn match_preserves_order() {
        let pipeline = Pipeline::new().matching(Predicate::gte("price", 600));
        let out = run(bookstore(), &pipeline).unwrap();

        let titles: Vec<&Value> = out.iter().map(|d| d.get("title").unwrap()).collect();
        assert_eq!(
            titles,
            vec![
                &Value::Text("Whispers in the Fog".into()),
                &Value::Text("The Last Horizon".into()),
                &Value::Text("Stars Beyond Reach".into()),
            ]
        );
    }

    #[test]
    fn missing_sort_field_sorts_lowest() {
        let docs = vec![
            Document::new().with("title", "priced").with("price", 100),
            Document::new().with("title", "unpriced"),
        ];

        let asc = sort_stage(docs.clone(), "price", SortOrder::Asc);
        assert_eq!(asc[0].get("title"), Some(&Value::Text("unpriced".into())));

        let desc = sort_stage(docs, "price", SortOrder::Desc);
        assert_eq!(desc[1].get("title"), Some(&Value::Text("unpriced".into())));
    }

    #[test]
    fn sort_is_stable_on_equal_keys() {
        let docs = vec![
            Document::new().with("n", 1).with("tag", "a"),
            Document::new().with("n", 1).with("tag", "b"),
            Document::new().with("n", 0).with("tag", "c"),
        ];
        let sorted = sort_stage(docs, "n", SortOrder::Desc);
        assert_eq!(sorted[0].get("tag"), Some(&Value::Text("a".into())));
        assert_eq!(sorted[1].get("tag"), Some(&Value::Text("b".into())));
    }

    #[test]
    fn project_keeps_declared_order() {
        let pipeline = Pipeline::new()
            .project(Projection::include(vec!["price", "title"]).without_id());
        let out = run(bookstore(), &pipeline).unwrap();

        let names: Vec<&str> = out[0].field_names().collect();
        assert_eq!(names, vec!["price", "title"]);
    }

    #[test]
    fn negative_limit_is_invalid() {
        let pipeline = Pipeline::new().limit(-1);
        let err = run(bookstore(), &pipeline).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn pipeline_is_idempotent_on_a_snapshot() {
        let pipeline = Pipeline::new()
            .sort("price", SortOrder::Desc)
            .group(
                Some("genre"),
                vec![AccumulatorSpec::first("top", "title")],
            )
            .limit(2);

        let first = run(bookstore(), &pipeline).unwrap();
        let second = run(bookstore(), &pipeline).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn sum_mixes_int_and_float_to_float() {
        let docs = vec![
            Document::new().with("amount", 100),
            Document::new().with("amount", 0.5),
            Document::new().with("amount", "skipped"),
        ];
        let pipeline =
            Pipeline::new().group(None, vec![AccumulatorSpec::sum_field("total", "amount")]);
        let out = run(docs, &pipeline).unwrap();
        assert_eq!(out[0].get("total"), Some(&Value::Float(100.5)));
    }

    #[test]
    fn avg_of_no_numeric_values_is_null() {
        let docs = vec![Document::new().with("amount", "n/a")];
        let pipeline =
            Pipeline::new().group(None, vec![AccumulatorSpec::avg("avg", "amount")]);
        let out = run(docs, &pipeline).unwrap();
        assert_eq!(out[0].get("avg"), Some(&Value::Null));
    }
}
