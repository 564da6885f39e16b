use serde::{Deserialize, Serialize};

use crate::query::cache::CacheStats;

/// Database statistics for monitoring
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub uptime_secs: u64,

    pub collection_count: usize,
    pub total_documents: usize,
    pub index_count: usize,

    pub query_count: u64,
    pub write_count: u64,
    pub cache_stats: CacheStats,
}

/// Per-collection statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionStats {
    pub name: String,
    pub document_count: usize,
    pub index_count: usize,
    pub version: u64,
}
