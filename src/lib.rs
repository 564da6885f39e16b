pub mod core;
pub mod index;
pub mod mapreduce;
pub mod pipeline;
pub mod query;
pub mod store;

pub use crate::core::config::Config;
pub use crate::core::database::{CollectionHandle, Database};
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::types::{Document, ID_FIELD, Value};
pub use crate::pipeline::{Accumulator, AccumulatorSpec, Pipeline, Stage, SumOperand};
pub use crate::query::ast::Predicate;
pub use crate::query::types::{
    DeleteResult, FindOptions, Projection, SortOrder, SortSpec, UpdateResult,
};

/*
┌──────────────────────────────────────────────────────────────────────────┐
│                        PAPYRA STRUCT ARCHITECTURE                        │
└──────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────── CORE LAYER ────────────────────────────────┐
│  struct Database                                                         │
│    config: Config                   // limits + cache sizing             │
│    collections: RwLock<HashMap<String, Arc<RwLock<Collection>>>>         │
│    validator: PredicateValidator    // depth/clause bounds               │
│    query_cache: QueryCache          // (collection, version, pipeline)   │
│    query_count / write_count: AtomicU64                                  │
│                                                                          │
│  struct Document  // insertion-ordered field map, `_id` unique           │
│  enum Value       // Null/Bool/Int/Float/Text/Date/Array/Object          │
└──────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────── STORE LAYER ───────────────────────────────┐
│  struct Collection                                                       │
│    docs: Vec<Document>              // storage order, never resorted     │
│    id_positions: BTreeMap<IndexKey, usize>                               │
│    indexes: HashMap<String, FieldIndex>                                  │
│    version: u64                     // bumped per mutation               │
└──────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────── QUERY LAYER ───────────────────────────────┐
│  enum Predicate   // Eq / In / Gte / Lte / And / Or / All                │
│  matcher::matches(doc, predicate) -> bool                                │
│  struct FieldIndex // value -> doc ids, ascending, candidate pruning     │
└──────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────── EXECUTION LAYER ─────────────────────────────┐
│  pipeline::evaluator::run(snapshot, Pipeline) -> Vec<Document>           │
│    Match | Sort | Group(sum/avg/first/count) | Project | Limit           │
│  mapreduce::execute(snapshot, emit, reduce) -> Vec<{_id, value}>         │
│    all-or-nothing; output collection swapped atomically                  │
└──────────────────────────────────────────────────────────────────────────┘

  Database ──owns──> Collection ──maintains──> FieldIndex
     │
     ├──runs──> pipeline::evaluator ──uses──> query::matcher
     │
     ├──runs──> mapreduce::executor ──replaces──> Collection (output)
     │
     └──caches──> QueryCache ──keyed-by──> collection version
*/
