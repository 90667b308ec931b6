use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use sb_graph::{EdgeId, Graph};

use crate::orchestrator::Partition;

pub struct CacheEntry {
    pub partition: Partition,
    pub graph: Graph,
    pub interior_edges_by_superblock: HashMap<String, Vec<EdgeId>>,
}

/// Process-wide cache keyed by canonicalized bounding box, holding the
/// last computed partition plus the graph used to produce it. Writers
/// (the partition endpoint) take the write lock only to insert; readers
/// (the route endpoint) take the read lock. Entries are immutable once
/// inserted; eviction is out of scope (§5).
#[derive(Clone, Default)]
pub struct PartitionCache {
    inner: Arc<RwLock<HashMap<String, Arc<CacheEntry>>>>,
}

impl PartitionCache {
    pub fn new() -> PartitionCache {
        PartitionCache::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<CacheEntry>> {
        self.inner.read().unwrap().get(key).cloned()
    }

    pub fn insert(&self, key: String, entry: Arc<CacheEntry>) {
        self.inner.write().unwrap().entry(key).or_insert(entry);
    }
}
