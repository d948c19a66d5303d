//! Sharded key -> value map.
//!
//! Sessions are independent, so state keyed by session lives in one of
//! [`SHARDS`] buckets, each behind its own lock. Work on one session never
//! waits on a lock held for an unrelated session in another bucket.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

use parking_lot::RwLock;

/// Number of shards (power of 2 for fast modular indexing).
pub const SHARDS: usize = 16;

pub(crate) struct ShardedMap<K, V> {
    shards: Box<[RwLock<HashMap<K, V>>; SHARDS]>,
    hasher: RandomState,
}

impl<K: Hash + Eq, V> ShardedMap<K, V> {
    pub fn new() -> Self {
        Self {
            shards: Box::new(std::array::from_fn(|_| RwLock::new(HashMap::new()))),
            hasher: RandomState::new(),
        }
    }

    /// The bucket that owns `key`.
    pub fn shard(&self, key: &K) -> &RwLock<HashMap<K, V>> {
        let index = (self.hasher.hash_one(key) as usize) & (SHARDS - 1);
        &self.shards[index]
    }

    /// Total entries across all shards.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }
}

impl<K: Hash + Eq, V> Default for ShardedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
