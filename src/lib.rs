//! A locality-sensitive near-duplicate detection engine built on SimHash
//! fingerprinting.
//!
//! Given a stream of documents identified by opaque object ids, the
//! [`index`] module answers two queries efficiently against a growing
//! corpus: "is there an indexed item within Hamming distance k of this
//! fingerprint?" and "return all such items." It also supports real-time
//! insertion, deletion, and a mode that combines lookup with conditional
//! insertion ([`index::IdentifiedIndex::get_near_dups_and_add`]).
//!
//! The hard engineering is the locality-sensitive bucketing index
//! ([`index`], [`key_deriver`], [`storage`]) that makes the Hamming-near-
//! neighbor query sub-linear. Fingerprint construction ([`fingerprint`])
//! is in scope because the index's semantics depend on its bit-level
//! contract; tokenization, IDF weighting, and persistence beyond the two
//! shipped backends are external collaborators described only by the
//! interfaces the core consumes.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod hash;
pub mod index;
pub mod key_deriver;
pub mod storage;
pub mod tokenize;

pub use config::{IndexConfig, RedisStorageConfig, SplitStrategy};
pub use error::{Error, Result};
pub use fingerprint::{FeatureInput, Fingerprint, FingerprintBuilder};
pub use hash::{FingerprintHash, Md5Hash};
pub use index::{AnonymousIndex, IdentifiedIndex};
pub use key_deriver::{BitArithmeticSplit, EvenSplit, KeyDeriver, TwoLevelSplit};
pub use storage::{MemoryMapStorage, MemoryStorage, RedisStorage, Storage};
pub use tokenize::{IdfWeights, Tokenize, WordBoundaryTokenizer};
