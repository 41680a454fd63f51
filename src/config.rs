//! Configuration structs for the index and the Redis backend.
//!
//! Derives `Serialize`/`Deserialize` so a deployment can load these from a
//! JSON or TOML file instead of constructing them in code.

use serde::{Deserialize, Serialize};

/// Default fingerprint bit width.
pub const DEFAULT_F: u32 = 64;
/// Default Hamming-distance tolerance.
pub const DEFAULT_K: usize = 7;
/// Default hot-bucket threshold for read-only probes (`get_one_near_dup`, `get_near_dups`).
pub const DEFAULT_HOT_BUCKET_READ_THRESHOLD: usize = 2000;
/// Default hot-bucket threshold for the probe-and-add path (`get_near_dups_and_add`).
pub const DEFAULT_HOT_BUCKET_WRITE_THRESHOLD: usize = 3000;
/// Default TTL (seconds) for the reference remote backend: 7 days.
pub const DEFAULT_REDIS_TTL_SECS: u64 = 7 * 24 * 60 * 60;
/// Default meta-key holding the set of all live bucket keys.
pub const DEFAULT_REDIS_KEYS_META_KEY: &str = "bucket_keys";

fn default_f() -> u32 {
    DEFAULT_F
}

fn default_k() -> usize {
    DEFAULT_K
}

fn default_hot_read() -> usize {
    DEFAULT_HOT_BUCKET_READ_THRESHOLD
}

fn default_hot_write() -> usize {
    DEFAULT_HOT_BUCKET_WRITE_THRESHOLD
}

fn default_with_id() -> bool {
    true
}

/// Which pigeonhole split strategy an `Index` should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    /// Offset/mask arithmetic directly on the integer value.
    BitArithmetic,
    /// Even split over the bit string, with legacy descending chunk numbering.
    Even,
    /// Two-level even split (k+1)^2 keys.
    TwoLevel,
}

impl Default for SplitStrategy {
    fn default() -> Self {
        Self::BitArithmetic
    }
}

/// Construction-time configuration for an `Index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Fingerprint bit width.
    #[serde(default = "default_f")]
    pub f: u32,
    /// Hamming-distance tolerance.
    #[serde(default = "default_k")]
    pub k: usize,
    /// Prefix prepended to every bucket key, useful for sharing one Storage
    /// across multiple corpora.
    pub prefix: String,
    /// Whether the index built from this config should track a fingerprint
    /// -> obj_id map. Since the with-id/anonymous distinction is modeled at
    /// the type level (`IdentifiedIndex` vs `AnonymousIndex`) rather than as
    /// a runtime branch, this field doesn't switch behavior on `IndexConfig`
    /// itself — it lets a config loaded from JSON/TOML round-trip which
    /// index type a deployment wants, so a dispatcher can pick the matching
    /// constructor without a separate out-of-band flag.
    #[serde(default = "default_with_id")]
    pub with_id: bool,
    /// Split strategy used by the `KeyDeriver`.
    pub split: SplitStrategy,
    /// Threshold above which a probed bucket logs a hot-bucket warning
    /// during `get_one_near_dup` / `get_near_dups`.
    #[serde(default = "default_hot_read")]
    pub hot_bucket_read_threshold: usize,
    /// Threshold above which a probed bucket logs a hot-bucket warning
    /// during `get_near_dups_and_add`.
    #[serde(default = "default_hot_write")]
    pub hot_bucket_write_threshold: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            f: DEFAULT_F,
            k: DEFAULT_K,
            prefix: String::new(),
            with_id: true,
            split: SplitStrategy::default(),
            hot_bucket_read_threshold: DEFAULT_HOT_BUCKET_READ_THRESHOLD,
            hot_bucket_write_threshold: DEFAULT_HOT_BUCKET_WRITE_THRESHOLD,
        }
    }
}

/// Construction-time configuration for the Redis storage backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisStorageConfig {
    /// Redis connection URL, e.g. `redis://127.0.0.1/`.
    pub url: String,
    /// TTL refreshed on every `add`, in seconds.
    pub ttl_secs: u64,
    /// Meta-key holding the set of all live bucket keys, for bulk `clear()`.
    pub keys_meta_key: String,
}

impl Default for RedisStorageConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1/".to_string(),
            ttl_secs: DEFAULT_REDIS_TTL_SECS,
            keys_meta_key: DEFAULT_REDIS_KEYS_META_KEY.to_string(),
        }
    }
}

impl IndexConfig {
    /// Loads a config from a TOML document, e.g. read from a deployment's
    /// config file. Missing fields fall back to their defaults.
    pub fn from_toml_str(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

impl RedisStorageConfig {
    /// Loads a config from a TOML document. Missing fields fall back to
    /// their defaults.
    pub fn from_toml_str(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
