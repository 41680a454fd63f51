//! Redis-backed Storage, mirroring the reference implementation's
//! `RedisStorage`: each bucket is a Redis `SET`, refreshed with `EXPIRE`
//! on every `add`, and a well-known meta-key accumulates the set of all
//! live bucket keys so `clear()` can do a batched bulk expiry instead of
//! a `KEYS`/`SCAN` sweep.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashSet;

use crate::config::RedisStorageConfig;
use crate::error::Result;

use super::Storage;

/// Holds a `ConnectionManager`, which reconnects transparently, so
/// callers don't need to scope connection acquisition themselves.
#[derive(Clone)]
pub struct RedisStorage {
    conn: ConnectionManager,
    ttl_secs: u64,
    keys_meta_key: String,
}

impl RedisStorage {
    /// Opens a connection to the backend described by `config`.
    pub async fn connect(config: &RedisStorageConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())?;
        let conn = client.get_connection_manager().await?;
        Ok(Self {
            conn,
            ttl_secs: config.ttl_secs,
            keys_meta_key: config.keys_meta_key.clone(),
        })
    }

    /// Wraps an already-established connection manager, e.g. one shared
    /// with other parts of an application.
    pub fn from_connection_manager(conn: ConnectionManager, config: &RedisStorageConfig) -> Self {
        Self {
            conn,
            ttl_secs: config.ttl_secs,
            keys_meta_key: config.keys_meta_key.clone(),
        }
    }
}

#[async_trait]
impl Storage for RedisStorage {
    async fn get(&self, key: &str) -> Result<HashSet<String>> {
        let mut conn = self.conn.clone();
        let members: HashSet<String> = conn.smembers(key).await?;
        Ok(members)
    }

    async fn add(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.sadd(key, value).await?;
        let _: () = conn.expire(key, self.ttl_secs as i64).await?;
        let _: () = conn.sadd(&self.keys_meta_key, key).await?;
        Ok(())
    }

    async fn remove(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.srem(key, value).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let keys: HashSet<String> = conn.smembers(&self.keys_meta_key).await?;
        for key in &keys {
            let _: () = conn.expire(key, 0).await?;
        }
        let _: () = conn.del(&self.keys_meta_key).await?;
        Ok(())
    }
}
