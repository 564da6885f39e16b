use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::stats::{CollectionStats, DatabaseStats};
use crate::core::types::{Document, ID_FIELD, Value};
use crate::mapreduce::{EmitFn, ReduceFn, executor};
use crate::pipeline::{Pipeline, Stage, evaluator};
use crate::query::ast::Predicate;
use crate::query::cache::{QueryCache, ResultKey};
use crate::query::types::{
    DeleteResult, FindOptions, PredicateValidator, UpdateResult, ValidationConfig,
};
use crate::store::Collection;

/// Shared handle to one collection. Readers holding a handle across a
/// map/reduce output swap keep seeing the collection they started with.
pub type CollectionHandle = Arc<RwLock<Collection>>;

/// The engine's entry point: a registry of named collections behind an
/// explicit handle. All state lives here; there is no ambient "current
/// database".
///
/// Locking: the registry lock is held only to look up or swap handles;
/// each collection has its own `RwLock`, so mutations take one writer at
/// a time per collection while readers of that collection run
/// concurrently with each other (and with snapshots taken at call start).
pub struct Database {
    config: Config,
    collections: RwLock<HashMap<String, CollectionHandle>>,
    validator: PredicateValidator,
    query_cache: QueryCache,

    start_time: Instant,
    query_count: AtomicU64,
    write_count: AtomicU64,
}

impl Database {
    pub fn open(config: Config) -> Self {
        let validator = PredicateValidator::new(ValidationConfig {
            max_clauses: config.max_predicate_clauses,
            max_depth: config.max_predicate_depth,
        });
        let query_cache = QueryCache::new(config.query_cache_size);

        Database {
            config,
            collections: RwLock::new(HashMap::new()),
            validator,
            query_cache,
            start_time: Instant::now(),
            query_count: AtomicU64::new(0),
            write_count: AtomicU64::new(0),
        }
    }

    pub fn new() -> Self {
        Database::open(Config::default())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle to an existing collection.
    pub fn collection(&self, name: &str) -> Option<CollectionHandle> {
        self.collections.read().get(name).cloned()
    }

    fn collection_or_create(&self, name: &str) -> CollectionHandle {
        if let Some(handle) = self.collection(name) {
            return handle;
        }
        let mut registry = self.collections.write();
        registry
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(Collection::new(name))))
            .clone()
    }

    fn required(&self, name: &str) -> Result<CollectionHandle> {
        self.collection(name)
            .ok_or_else(|| Error::not_found(format!("collection '{}' does not exist", name)))
    }

    /// Insert a batch, creating the collection on first use. Explicit ids
    /// are checked against the store and against the rest of the batch up
    /// front, so a `DuplicateKey` error inserts nothing.
    pub fn insert_many(&self, name: &str, docs: Vec<Document>) -> Result<Vec<Value>> {
        let handle = self.collection_or_create(name);
        let mut coll = handle.write();

        let mut batch_ids: Vec<Value> = Vec::new();
        for doc in &docs {
            if let Some(id) = doc.id() {
                if coll.contains_id(id) || batch_ids.iter().any(|seen| Value::equals(seen, id)) {
                    return Err(Error::new(
                        ErrorKind::DuplicateKey,
                        format!("duplicate _id {:?} in batch for collection '{}'", id, name),
                    ));
                }
                batch_ids.push(id.clone());
            }
        }

        let mut ids = Vec::with_capacity(docs.len());
        for doc in docs {
            ids.push(coll.insert(doc)?);
        }

        self.write_count.fetch_add(1, Ordering::Relaxed);
        debug!(collection = name, inserted = ids.len(), "insert_many");
        Ok(ids)
    }

    pub fn insert_one(&self, name: &str, doc: Document) -> Result<Value> {
        let mut ids = self.insert_many(name, vec![doc])?;
        ids.pop()
            .ok_or_else(|| Error::new(ErrorKind::Internal, "insert produced no id".to_string()))
    }

    /// Filter + optional sort, limit and projection, applied in that
    /// order. A missing collection yields empty results.
    pub fn find(
        &self,
        name: &str,
        predicate: &Predicate,
        options: &FindOptions,
    ) -> Result<Vec<Document>> {
        self.validator.validate(predicate)?;
        self.query_count.fetch_add(1, Ordering::Relaxed);

        let Some(handle) = self.collection(name) else {
            return Ok(Vec::new());
        };
        let mut results = handle.read().find_matching(predicate);

        if let Some(sort) = &options.sort {
            results = evaluator::sort_stage(results, &sort.field, sort.order);
        }
        if let Some(limit) = options.limit {
            results.truncate(limit);
        }
        if let Some(projection) = &options.projection {
            results = results.iter().map(|doc| projection.apply(doc)).collect();
        }

        trace!(collection = name, hits = results.len(), "find");
        Ok(results)
    }

    /// `$set` the first match in storage order. With `upsert`, a zero
    /// match synthesizes one document from the predicate's equality
    /// fields overlaid with the update fields.
    pub fn update_one(
        &self,
        name: &str,
        predicate: &Predicate,
        set: &Document,
        upsert: bool,
    ) -> Result<UpdateResult> {
        self.validator.validate(predicate)?;
        reject_id_set(set)?;

        let handle = if upsert {
            self.collection_or_create(name)
        } else {
            match self.collection(name) {
                Some(handle) => handle,
                None => return Ok(no_match_update()),
            }
        };
        let mut coll = handle.write();

        let positions = coll.matching_positions(predicate);
        if let Some(&position) = positions.first() {
            let modified = coll.apply_set(position, set)?;
            self.write_count.fetch_add(1, Ordering::Relaxed);
            return Ok(UpdateResult {
                matched_count: 1,
                modified_count: modified as usize,
                upserted_id: None,
            });
        }

        if !upsert {
            return Ok(no_match_update());
        }

        let mut doc = Document::new();
        for (field, value) in predicate.equality_fields() {
            doc.set(field, value.clone());
        }
        for (field, value) in set.iter() {
            doc.set(field, value.clone());
        }
        let id = coll.insert(doc)?;

        self.write_count.fetch_add(1, Ordering::Relaxed);
        debug!(collection = name, id = ?id, "upserted");
        Ok(UpdateResult {
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(id),
        })
    }

    /// `$set` every match. Each matched document updates independently,
    /// so a mid-way error leaves earlier matches updated. That partial
    /// application across matches is expected behavior, not a failure.
    pub fn update_many(
        &self,
        name: &str,
        predicate: &Predicate,
        set: &Document,
    ) -> Result<UpdateResult> {
        self.validator.validate(predicate)?;
        reject_id_set(set)?;

        let Some(handle) = self.collection(name) else {
            return Ok(no_match_update());
        };
        let mut coll = handle.write();

        let positions = coll.matching_positions(predicate);
        let matched_count = positions.len();
        let mut modified_count = 0;
        for position in positions {
            if coll.apply_set(position, set)? {
                modified_count += 1;
            }
        }

        if matched_count > 0 {
            self.write_count.fetch_add(1, Ordering::Relaxed);
        }
        debug!(collection = name, matched_count, modified_count, "update_many");
        Ok(UpdateResult {
            matched_count,
            modified_count,
            upserted_id: None,
        })
    }

    pub fn delete_many(&self, name: &str, predicate: &Predicate) -> Result<DeleteResult> {
        self.validator.validate(predicate)?;

        let Some(handle) = self.collection(name) else {
            return Ok(DeleteResult { deleted_count: 0 });
        };
        let deleted_count = handle.write().delete_where(predicate);

        if deleted_count > 0 {
            self.write_count.fetch_add(1, Ordering::Relaxed);
        }
        Ok(DeleteResult { deleted_count })
    }

    /// Run an aggregation pipeline against a point-in-time snapshot of
    /// the collection. Results are cached per (collection, version,
    /// pipeline); any mutation bumps the version and sidelines stale
    /// entries.
    pub fn aggregate(&self, name: &str, pipeline: &Pipeline) -> Result<Vec<Document>> {
        for stage in &pipeline.stages {
            if let Stage::Match(predicate) = stage {
                self.validator.validate(predicate)?;
            }
        }
        self.query_count.fetch_add(1, Ordering::Relaxed);

        let Some(handle) = self.collection(name) else {
            return Ok(Vec::new());
        };
        let (snapshot, version) = {
            let coll = handle.read();
            (coll.snapshot(), coll.version())
        };

        let cache_key = serde_json::to_string(pipeline).ok().map(|query| ResultKey {
            collection: name.to_string(),
            version,
            query,
        });
        if let Some(key) = &cache_key {
            if let Some(hit) = self.query_cache.get(key) {
                trace!(collection = name, "aggregation served from cache");
                return Ok(hit);
            }
        }

        let results = evaluator::run(snapshot, pipeline)?;
        if let Some(key) = cache_key {
            self.query_cache.put(key, results.clone());
        }
        Ok(results)
    }

    /// Map/reduce over the source collection, writing one `{_id, value}`
    /// document per key into `output_name`. The output collection is
    /// dropped and recreated atomically: the replacement is fully built
    /// before the registry entry is swapped, and any emit/reduce error
    /// leaves the previous output untouched.
    pub fn map_reduce(
        &self,
        source: &str,
        emit: &EmitFn,
        reduce: &ReduceFn,
        output_name: &str,
    ) -> Result<CollectionHandle> {
        let source_handle = self.required(source)?;
        self.query_count.fetch_add(1, Ordering::Relaxed);

        let snapshot = source_handle.read().snapshot();
        let output_docs = executor::execute(&snapshot, emit, reduce)?;

        let mut replacement = Collection::new(output_name);
        for doc in output_docs {
            replacement.insert(doc)?;
        }
        let replacement = Arc::new(RwLock::new(replacement));
        self.collections
            .write()
            .insert(output_name.to_string(), replacement.clone());

        // A recreated collection restarts its version counter, so cached
        // results keyed on the old instance could collide; drop them all.
        self.query_cache.clear();
        self.write_count.fetch_add(1, Ordering::Relaxed);
        debug!(source, output = output_name, "map/reduce output replaced");
        Ok(replacement)
    }

    /// Create a single-field ascending index. Returns whether a new index
    /// was built; an existing index on the field is a no-op.
    pub fn create_index(&self, name: &str, field: &str) -> Result<bool> {
        let handle = self.required(name)?;
        let created = handle.write().create_index(field);
        Ok(created)
    }

    pub fn list_indexes(&self, name: &str) -> Result<Vec<String>> {
        let handle = self.required(name)?;
        let names = handle.read().index_names();
        Ok(names)
    }

    pub fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Document count; zero for a collection that does not exist.
    pub fn count(&self, name: &str) -> usize {
        self.collection(name)
            .map(|handle| handle.read().len())
            .unwrap_or(0)
    }

    pub fn drop_collection(&self, name: &str) -> bool {
        let removed = self.collections.write().remove(name).is_some();
        if removed {
            self.query_cache.clear();
            self.write_count.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    pub fn collection_stats(&self, name: &str) -> Result<CollectionStats> {
        let handle = self.required(name)?;
        let coll = handle.read();
        Ok(CollectionStats {
            name: coll.name().to_string(),
            document_count: coll.len(),
            index_count: coll.index_count(),
            version: coll.version(),
        })
    }

    pub fn stats(&self) -> DatabaseStats {
        let registry = self.collections.read();
        let mut total_documents = 0;
        let mut index_count = 0;
        for handle in registry.values() {
            let coll = handle.read();
            total_documents += coll.len();
            index_count += coll.index_count();
        }

        DatabaseStats {
            uptime_secs: self.start_time.elapsed().as_secs(),
            collection_count: registry.len(),
            total_documents,
            index_count,
            query_count: self.query_count.load(Ordering::Relaxed),
            write_count: self.write_count.load(Ordering::Relaxed),
            cache_stats: self.query_cache.stats(),
        }
    }
}

impl Default for Database {
    fn default() -> Self {
        Database::new()
    }
}

fn reject_id_set(set: &Document) -> Result<()> {
    if set.contains(ID_FIELD) {
        return Err(Error::invalid_argument("_id is immutable and cannot be set"));
    }
    Ok(())
}

fn no_match_update() -> UpdateResult {
    UpdateResult {
        matched_count: 0,
        modified_count: 0,
        upserted_id: None,
    }
}
