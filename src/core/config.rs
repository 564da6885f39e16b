#[derive(Debug, Clone)]
pub struct Config {
    /// Entries held by the aggregation result cache.
    pub query_cache_size: usize,
    /// Maximum predicate nesting depth accepted by the API.
    pub max_predicate_depth: usize,
    /// Maximum clause count per `And`/`Or` combinator.
    pub max_predicate_clauses: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            query_cache_size: 1000,
            max_predicate_depth: 10,
            max_predicate_clauses: 1024,
        }
    }
}
