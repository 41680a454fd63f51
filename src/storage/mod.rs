//! The Storage contract: a multimap of bucket-key -> set of hex
//! fingerprint strings. A second instance with the same trait serves
//! as the fingerprint -> obj_id map in with-id mode.
//!
//! Expressed as `async_trait` so a backend doing real network I/O (the
//! Redis backend) can `.await` without blocking a worker thread; the
//! in-memory backend's futures resolve without ever yielding.

pub mod memory;
pub mod redis;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::Result;

pub use memory::{MemoryMapStorage, MemoryStorage};
pub use redis::RedisStorage;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Empty set if the key is absent; `None` and an empty set are
    /// indistinguishable to callers.
    async fn get(&self, key: &str) -> Result<HashSet<String>>;

    /// Idempotent: adding a value already present in the bucket is a
    /// no-op to callers (no error, no duplicate).
    async fn add(&self, key: &str, value: &str) -> Result<()>;

    /// Idempotent: removing an absent value, or a value from an absent
    /// key, is a no-op.
    async fn remove(&self, key: &str, value: &str) -> Result<()>;

    /// Drops all state the backend holds.
    async fn clear(&self) -> Result<()>;
}
