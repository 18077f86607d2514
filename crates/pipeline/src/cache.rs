//! Bounded, content-addressed result store.
//!
//! Eviction is strictly first-in-first-out: when an insert pushes the store
//! over capacity, the oldest-inserted key goes, however often it was read.
//! Every operation takes the store's mutex for its whole duration, so the
//! capacity bound holds under concurrent writers. Values are cloned in and
//! out; nothing stored is shared with a caller.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::{CacheKey, LayerId};

/// Number of leading characters of the source that feed the key.
///
/// Inputs that agree on this prefix and the layer set share a key.
pub const KEY_PREFIX_CHARS: usize = 1000;

/// Derives the cache key for `code` run through `layers`.
///
/// The key is the SHA-256 of the first [`KEY_PREFIX_CHARS`] characters of the
/// code, followed by the comma-joined, ascending layer ids.
pub fn cache_key(code: &str, layers: &[LayerId]) -> CacheKey {
    let prefix_end = code
        .char_indices()
        .nth(KEY_PREFIX_CHARS)
        .map_or(code.len(), |(idx, _)| idx);
    let digest = Sha256::digest(code[..prefix_end].as_bytes());

    let mut ids: Vec<u8> = layers.iter().map(|l| l.as_u8()).collect();
    ids.sort_unstable();
    ids.dedup();
    let joined = ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");

    CacheKey::from_parts(&format!("{digest:x}"), &joined)
}

struct Entries<V> {
    values: HashMap<CacheKey, V>,
    order: VecDeque<CacheKey>,
}

/// FIFO-bounded key/value store.
pub struct ResultCache<V> {
    capacity: usize,
    entries: Mutex<Entries<V>>,
}

impl<V: Clone> ResultCache<V> {
    /// Creates an empty store holding at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(Entries {
                values: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            }),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<V> {
        self.entries.lock().values.get(key).cloned()
    }

    /// Stores `value` under `key`, evicting the oldest entry if full.
    ///
    /// Replacing an existing key keeps its original insertion position.
    pub fn put(&self, key: CacheKey, value: V) {
        let mut entries = self.entries.lock();
        if entries.values.insert(key.clone(), value).is_some() {
            return;
        }
        entries.order.push_back(key);
        while entries.order.len() > self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.values.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.values.clear();
        entries.order.clear();
    }
}

impl<V> std::fmt::Debug for ResultCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("capacity", &self.capacity)
            .field("len", &self.entries.lock().values.len())
            .finish()
    }
}
