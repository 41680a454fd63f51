//! In-memory Storage backends.
//!
//! Two shapes mirror the reference implementation's `MemoryStorage` (a
//! bucket-key -> set multimap) and `MemoryMapStorage` (a fingerprint ->
//! obj_id map, which happens to satisfy the same four-operation trait
//! since `get` on a map key returns at most one value). Both guard their
//! state with `tokio::sync::RwLock`, the same `Arc<RwLock<_>>` shape used
//! elsewhere in this codebase for shared mutable state on async server
//! paths — readers run concurrently with each other, writers are exclusive.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;

use super::Storage;

/// Process-local bucket-key -> set-of-hex-fingerprints multimap. Safe for
/// concurrent use from multiple async tasks within one process; buckets
/// are created lazily on first insert and dropped when they empty out.
#[derive(Default)]
pub struct MemoryStorage {
    buckets: RwLock<HashMap<String, HashSet<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<HashSet<String>> {
        Ok(self
            .buckets
            .read()
            .await
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn add(&self, key: &str, value: &str) -> Result<()> {
        self.buckets
            .write()
            .await
            .entry(key.to_string())
            .or_default()
            .insert(value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str, value: &str) -> Result<()> {
        let mut guard = self.buckets.write().await;
        if let Some(set) = guard.get_mut(key) {
            set.remove(value);
            if set.is_empty() {
                guard.remove(key);
            }
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.buckets.write().await.clear();
        Ok(())
    }
}

/// Process-local fingerprint -> obj_id map. `add` overwrites any existing
/// mapping for the same hex fingerprint: unique-per-fingerprint, last
/// writer wins.
///
/// `remove` ignores its `value` argument and drops by key only, matching
/// the reference `MemoryMapStorage.remove` quirk: at most one id is ever
/// stored per fingerprint, so dropping by key is correct and the value
/// argument (expected to be the fingerprint's own hex form, by convention)
/// is accepted but never required to match.
#[derive(Default)]
pub struct MemoryMapStorage {
    map: RwLock<HashMap<String, String>>,
}

impl MemoryMapStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryMapStorage {
    async fn get(&self, key: &str) -> Result<HashSet<String>> {
        Ok(self.map.read().await.get(key).cloned().into_iter().collect())
    }

    async fn add(&self, key: &str, value: &str) -> Result<()> {
        self.map
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str, _value: &str) -> Result<()> {
        self.map.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.map.write().await.clear();
        Ok(())
    }
}
