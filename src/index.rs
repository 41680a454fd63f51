//! The Index: orchestrates KeyDeriver + Storage to answer lookups,
//! insert, delete, and the atomic "lookup-or-insert" operation.
//!
//! Modeled as two thin wrappers (`IdentifiedIndex`, `AnonymousIndex`)
//! around a shared `IndexCore`, rather than a single type with an
//! optional id-map field.

use tracing::{debug, info, instrument, warn};

use crate::config::{IndexConfig, SplitStrategy};
use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;
use crate::key_deriver::{BitArithmeticSplit, EvenSplit, KeyDeriver, TwoLevelSplit};
use crate::storage::Storage;

fn key_deriver_for(strategy: SplitStrategy) -> Box<dyn KeyDeriver> {
    match strategy {
        SplitStrategy::BitArithmetic => Box::new(BitArithmeticSplit),
        SplitStrategy::Even => Box::new(EvenSplit::default()),
        SplitStrategy::TwoLevel => Box::new(TwoLevelSplit),
    }
}

/// The bucket-indexing core shared by `IdentifiedIndex` and
/// `AnonymousIndex`: KeyDeriver selection, bucket writes, and the probe
/// loop that both wrappers resolve candidates on top of.
struct IndexCore<S: Storage> {
    config: IndexConfig,
    storage: S,
    key_deriver: Box<dyn KeyDeriver>,
}

impl<S: Storage> IndexCore<S> {
    fn new(config: IndexConfig, storage: S) -> Self {
        let key_deriver = key_deriver_for(config.split);
        Self {
            config,
            storage,
            key_deriver,
        }
    }

    fn keys_for(&self, fp: &Fingerprint) -> Vec<String> {
        self.key_deriver.derive(fp, self.config.k, &self.config.prefix)
    }

    fn check_dimension(&self, fp: &Fingerprint) -> Result<()> {
        if fp.f() != self.config.f {
            return Err(Error::DimensionMismatch {
                expected: self.config.f,
                actual: fp.f(),
            });
        }
        Ok(())
    }

    async fn insert_hex(&self, fp: &Fingerprint, hex: &str) -> Result<()> {
        for key in self.keys_for(fp) {
            self.storage.add(&key, hex).await?;
        }
        Ok(())
    }

    async fn remove_hex(&self, fp: &Fingerprint, hex: &str) -> Result<()> {
        for key in self.keys_for(fp) {
            self.storage.remove(&key, hex).await?;
        }
        Ok(())
    }

    /// Reads and sorts one bucket, logging the hot-bucket diagnostic if
    /// its size exceeds `hot_threshold`. Sorting gives backend-independent
    /// determinism within a bucket, needed for reproducible
    /// tests; it never changes which candidates are found.
    async fn probe_bucket(&self, key: &str, hot_threshold: usize) -> Result<Vec<String>> {
        let dups = self.storage.get(key).await?;
        debug!(key, "probing bucket");
        if dups.len() > hot_threshold {
            warn!(key, len = dups.len(), "hot bucket");
        }
        let mut sorted: Vec<String> = dups.into_iter().collect();
        sorted.sort();
        Ok(sorted)
    }

    /// Stops at the first candidate within tolerance, probing buckets in
    /// KeyDeriver order. Backs `get_one_near_dup`.
    async fn probe_first(&self, fp: &Fingerprint, hot_threshold: usize) -> Result<Option<(String, u32)>> {
        self.check_dimension(fp)?;
        for key in self.keys_for(fp) {
            for dup_hex in self.probe_bucket(&key, hot_threshold).await? {
                let dup_fp = Fingerprint::from_hex(&dup_hex, self.config.f)?;
                let d = fp.distance(&dup_fp)?;
                if d <= self.config.k as u32 {
                    return Ok(Some((dup_hex, d)));
                }
            }
        }
        Ok(None)
    }

    /// Probes every bucket, deduplicating candidates by hex fingerprint
    /// (first occurrence wins). Backs `get_near_dups` and
    /// `get_near_dups_and_add`.
    async fn probe_all(&self, fp: &Fingerprint, hot_threshold: usize) -> Result<Vec<(String, u32)>> {
        self.check_dimension(fp)?;
        let mut seen = std::collections::HashSet::new();
        let mut hits = Vec::new();
        for key in self.keys_for(fp) {
            for dup_hex in self.probe_bucket(&key, hot_threshold).await? {
                if !seen.insert(dup_hex.clone()) {
                    continue;
                }
                let dup_fp = Fingerprint::from_hex(&dup_hex, self.config.f)?;
                let d = fp.distance(&dup_fp)?;
                if d <= self.config.k as u32 {
                    hits.push((dup_hex, d));
                }
            }
        }
        Ok(hits)
    }
}

/// An Index that tracks an obj_id per fingerprint, returning ids from its
/// queries. Owns a second Storage instance as the fingerprint -> obj_id
/// map.
pub struct IdentifiedIndex<S: Storage, M: Storage> {
    core: IndexCore<S>,
    map: M,
}

impl<S: Storage, M: Storage> IdentifiedIndex<S, M> {
    /// Builds an index from `config`. Warns if `config.with_id` is `false`,
    /// since a config loaded for an anonymous deployment was handed to the
    /// identified constructor; the index is still built and used normally.
    pub fn new(config: IndexConfig, storage: S, map: M) -> Self {
        if !config.with_id {
            warn!("IndexConfig.with_id is false but an IdentifiedIndex was constructed");
        }
        Self {
            core: IndexCore::new(config, storage),
            map,
        }
    }

    /// Builds an index and inserts an initial batch of `(obj_id,
    /// fingerprint)` pairs in order, logging progress every 10,000 items
    /// (and on the final item), mirroring the reference implementation's
    /// `self.log.info('%s/%s', i + 1, count)`.
    pub async fn with_batch(
        config: IndexConfig,
        storage: S,
        map: M,
        batch: Vec<(String, Fingerprint)>,
    ) -> Result<Self> {
        let index = Self::new(config, storage, map);
        let count = batch.len();
        for (i, (id, fp)) in batch.into_iter().enumerate() {
            if count > 0 && (i % 10_000 == 0 || i + 1 == count) {
                info!(i = i + 1, count, "indexing batch");
            }
            index.add(id, fp).await?;
        }
        Ok(index)
    }

    pub fn config(&self) -> &IndexConfig {
        &self.core.config
    }

    /// Inserts `fp` under `obj_id`. In with-id mode the map is written
    /// before the buckets.
    #[instrument(skip(self, fp))]
    pub async fn add(&self, obj_id: impl Into<String>, fp: Fingerprint) -> Result<()> {
        self.core.check_dimension(&fp)?;
        let hex = fp.to_hex();
        self.map.add(&hex, &obj_id.into()).await?;
        self.core.insert_hex(&fp, &hex).await
    }

    /// Removes `fp`: buckets first, then the map entry (reverse of
    /// insert order).
    #[instrument(skip(self, fp))]
    pub async fn remove(&self, fp: Fingerprint) -> Result<()> {
        self.core.check_dimension(&fp)?;
        let hex = fp.to_hex();
        self.core.remove_hex(&fp, &hex).await?;
        self.map.remove(&hex, "").await
    }

    async fn resolve(&self, hex: &str) -> Result<Option<String>> {
        Ok(self.map.get(hex).await?.into_iter().next())
    }

    #[instrument(skip(self, fp))]
    pub async fn get_one_near_dup(&self, fp: &Fingerprint) -> Result<Option<(String, u32)>> {
        match self
            .core
            .probe_first(fp, self.core.config.hot_bucket_read_threshold)
            .await?
        {
            Some((hex, d)) => Ok(self.resolve(&hex).await?.map(|id| (id, d))),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, fp))]
    pub async fn get_near_dups(&self, fp: &Fingerprint) -> Result<Vec<(String, u32)>> {
        let hits = self
            .core
            .probe_all(fp, self.core.config.hot_bucket_read_threshold)
            .await?;
        let mut out = Vec::with_capacity(hits.len());
        for (hex, d) in hits {
            if let Some(id) = self.resolve(&hex).await? {
                out.push((id, d));
            }
        }
        Ok(out)
    }

    /// `get_near_dups` plus conditional insert: if no candidate had
    /// distance exactly 0, `fp` is added under `cur_id`. Never returns
    /// `cur_id` itself, even if an identical fingerprint already happens
    /// to be indexed under it.
    #[instrument(skip(self, fp))]
    pub async fn get_near_dups_and_add(
        &self,
        fp: Fingerprint,
        cur_id: impl Into<String>,
    ) -> Result<Vec<(String, u32)>> {
        let cur_id = cur_id.into();
        let hits = self
            .core
            .probe_all(&fp, self.core.config.hot_bucket_write_threshold)
            .await?;
        let mut out = Vec::with_capacity(hits.len());
        let mut exact_match = false;
        for (hex, d) in hits {
            if d == 0 {
                exact_match = true;
            }
            if let Some(id) = self.resolve(&hex).await? {
                if id == cur_id {
                    continue;
                }
                out.push((id, d));
            }
        }
        if !exact_match {
            self.add(cur_id, fp).await?;
        }
        Ok(out)
    }
}

/// An Index that returns the hex fingerprint itself rather than an
/// obj_id. No map Storage is owned.
pub struct AnonymousIndex<S: Storage> {
    core: IndexCore<S>,
}

impl<S: Storage> AnonymousIndex<S> {
    /// Builds an index from `config`. Warns if `config.with_id` is `true`,
    /// since a config loaded for an identified deployment was handed to the
    /// anonymous constructor; the index is still built and used normally.
    pub fn new(config: IndexConfig, storage: S) -> Self {
        if config.with_id {
            warn!("IndexConfig.with_id is true but an AnonymousIndex was constructed");
        }
        Self {
            core: IndexCore::new(config, storage),
        }
    }

    pub async fn with_batch(
        config: IndexConfig,
        storage: S,
        batch: Vec<Fingerprint>,
    ) -> Result<Self> {
        let index = Self::new(config, storage);
        let count = batch.len();
        for (i, fp) in batch.into_iter().enumerate() {
            if count > 0 && (i % 10_000 == 0 || i + 1 == count) {
                info!(i = i + 1, count, "indexing batch");
            }
            index.add(fp).await?;
        }
        Ok(index)
    }

    pub fn config(&self) -> &IndexConfig {
        &self.core.config
    }

    #[instrument(skip(self, fp))]
    pub async fn add(&self, fp: Fingerprint) -> Result<()> {
        self.core.check_dimension(&fp)?;
        let hex = fp.to_hex();
        self.core.insert_hex(&fp, &hex).await
    }

    #[instrument(skip(self, fp))]
    pub async fn remove(&self, fp: Fingerprint) -> Result<()> {
        self.core.check_dimension(&fp)?;
        let hex = fp.to_hex();
        self.core.remove_hex(&fp, &hex).await
    }

    #[instrument(skip(self, fp))]
    pub async fn get_one_near_dup(&self, fp: &Fingerprint) -> Result<Option<(Fingerprint, u32)>> {
        match self
            .core
            .probe_first(fp, self.core.config.hot_bucket_read_threshold)
            .await?
        {
            Some((hex, d)) => Ok(Some((Fingerprint::from_hex(&hex, self.core.config.f)?, d))),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, fp))]
    pub async fn get_near_dups(&self, fp: &Fingerprint) -> Result<Vec<(Fingerprint, u32)>> {
        let hits = self
            .core
            .probe_all(fp, self.core.config.hot_bucket_read_threshold)
            .await?;
        hits.into_iter()
            .map(|(hex, d)| Ok((Fingerprint::from_hex(&hex, self.core.config.f)?, d)))
            .collect()
    }

    #[instrument(skip(self, fp))]
    pub async fn get_near_dups_and_add(
        &self,
        fp: Fingerprint,
    ) -> Result<Vec<(Fingerprint, u32)>> {
        let hits = self
            .core
            .probe_all(&fp, self.core.config.hot_bucket_write_threshold)
            .await?;
        let exact_match = hits.iter().any(|(_, d)| *d == 0);
        let out: Result<Vec<(Fingerprint, u32)>> = hits
            .into_iter()
            .map(|(hex, d)| Ok((Fingerprint::from_hex(&hex, self.core.config.f)?, d)))
            .collect();
        let out = out?;
        if !exact_match {
            self.add(fp).await?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryMapStorage, MemoryStorage};

    fn config(k: usize) -> IndexConfig {
        IndexConfig {
            f: 64,
            k,
            ..IndexConfig::default()
        }
    }

    fn identified(k: usize) -> IdentifiedIndex<MemoryStorage, MemoryMapStorage> {
        IdentifiedIndex::new(config(k), MemoryStorage::new(), MemoryMapStorage::new())
    }

    // S1 — exact duplicate.
    #[tokio::test]
    async fn exact_duplicate_is_found_at_distance_zero() {
        let idx = identified(3);
        let fp = Fingerprint::from_int(0xDEADBEEFCAFEBABE, 64).unwrap();
        idx.add("A", fp).await.unwrap();
        let (id, d) = idx.get_one_near_dup(&fp).await.unwrap().unwrap();
        assert_eq!(id, "A");
        assert_eq!(d, 0);
    }

    // S2 — one-bit neighbor.
    #[tokio::test]
    async fn one_bit_neighbor_is_found_at_distance_one() {
        let idx = identified(3);
        let fp = Fingerprint::from_int(0xDEADBEEFCAFEBABE, 64).unwrap();
        idx.add("A", fp).await.unwrap();
        let query = Fingerprint::from_int(0xDEADBEEFCAFEBABF, 64).unwrap();
        let (id, d) = idx.get_one_near_dup(&query).await.unwrap().unwrap();
        assert_eq!(id, "A");
        assert_eq!(d, 1);
    }

    // S3 — out of tolerance.
    #[tokio::test]
    async fn out_of_tolerance_is_not_found() {
        let idx = identified(3);
        let fp = Fingerprint::from_int(0b0000, 64).unwrap();
        idx.add("A", fp).await.unwrap();
        let query = Fingerprint::from_int(0b1111, 64).unwrap();
        assert_eq!(query.distance(&fp).unwrap(), 4);
        assert!(idx.get_one_near_dup(&query).await.unwrap().is_none());
        assert!(idx.get_near_dups(&query).await.unwrap().is_empty());
    }

    // S4 — multi-hit dedup.
    #[tokio::test]
    async fn multi_hit_dedup_returns_each_id_once() {
        let idx = identified(7);
        let query = Fingerprint::from_int(0, 64).unwrap();
        let near = Fingerprint::from_int(0b11, 64).unwrap(); // distance 2
        let far = Fingerprint::from_int(0b11111, 64).unwrap(); // distance 5
        idx.add("near", near).await.unwrap();
        idx.add("far", far).await.unwrap();
        let mut hits = idx.get_near_dups(&query).await.unwrap();
        hits.sort();
        assert_eq!(hits.len(), 2);
        assert!(hits.contains(&("near".to_string(), 2)));
        assert!(hits.contains(&("far".to_string(), 5)));
    }

    // S5 — probe-and-add with exact duplicate: no insert.
    #[tokio::test]
    async fn probe_and_add_with_exact_duplicate_does_not_insert() {
        let idx = identified(3);
        let fp = Fingerprint::from_int(0xABCDEF, 64).unwrap();
        idx.add("A", fp).await.unwrap();
        let hits = idx.get_near_dups_and_add(fp, "B").await.unwrap();
        assert_eq!(hits, vec![("A".to_string(), 0)]);
        let after = idx.get_near_dups(&fp).await.unwrap();
        assert_eq!(after, vec![("A".to_string(), 0)]);
    }

    // S6 — probe-and-add without exact match: inserts.
    #[tokio::test]
    async fn probe_and_add_without_exact_match_inserts() {
        let idx = identified(7);
        let fp1 = Fingerprint::from_int(0, 64).unwrap();
        let fp2 = Fingerprint::from_int(0b11, 64).unwrap(); // distance 2
        idx.add("A", fp1).await.unwrap();
        let hits = idx.get_near_dups_and_add(fp2, "B").await.unwrap();
        assert_eq!(hits, vec![("A".to_string(), 2)]);
        let mut after = idx.get_near_dups(&fp2).await.unwrap();
        after.sort();
        assert_eq!(after.len(), 2);
        assert!(after.contains(&("A".to_string(), 2)));
        assert!(after.contains(&("B".to_string(), 0)));
    }

    #[tokio::test]
    async fn add_then_remove_balances_buckets() {
        let idx = identified(3);
        let fp = Fingerprint::from_int(0x1234, 64).unwrap();
        idx.add("A", fp).await.unwrap();
        idx.remove(fp).await.unwrap();
        assert!(idx.get_near_dups(&fp).await.unwrap().is_empty());
        assert!(idx.get_one_near_dup(&fp).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn add_rejects_dimension_mismatch() {
        let idx = identified(3);
        let fp = Fingerprint::from_int(0, 32).unwrap();
        match idx.add("A", fp).await {
            Err(Error::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 64);
                assert_eq!(actual, 32);
            }
            other => panic!("expected DimensionMismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn get_near_dups_and_add_never_returns_self() {
        let idx = identified(7);
        let fp = Fingerprint::from_int(0xCAFE, 64).unwrap();
        // Nothing indexed yet: cur_id "B" must not appear in its own results.
        let hits = idx.get_near_dups_and_add(fp, "B").await.unwrap();
        assert!(hits.is_empty());
        // Re-querying the exact same fingerprint under the same id must not
        // surface "B" as a match of itself.
        let hits_again = idx.get_near_dups_and_add(fp, "B").await.unwrap();
        assert!(hits_again.is_empty());
    }

    #[tokio::test]
    async fn anonymous_index_returns_hex_fingerprint() {
        let idx = AnonymousIndex::new(config(3), MemoryStorage::new());
        let fp = Fingerprint::from_int(0xABCDEF, 64).unwrap();
        idx.add(fp).await.unwrap();
        let (found, d) = idx.get_one_near_dup(&fp).await.unwrap().unwrap();
        assert_eq!(found, fp);
        assert_eq!(d, 0);
    }

    #[tokio::test]
    async fn anonymous_index_probe_and_add_skips_insert_on_exact_match() {
        let idx = AnonymousIndex::new(config(3), MemoryStorage::new());
        let fp = Fingerprint::from_int(0x42, 64).unwrap();
        idx.add(fp).await.unwrap();
        let hits = idx.get_near_dups_and_add(fp).await.unwrap();
        assert_eq!(hits, vec![(fp, 0)]);
    }

    #[tokio::test]
    async fn with_batch_inserts_all_pairs_in_order() {
        let batch = vec![
            ("A".to_string(), Fingerprint::from_int(1, 64).unwrap()),
            ("B".to_string(), Fingerprint::from_int(2, 64).unwrap()),
        ];
        let idx = IdentifiedIndex::with_batch(
            config(3),
            MemoryStorage::new(),
            MemoryMapStorage::new(),
            batch,
        )
        .await
        .unwrap();
        let fp_a = Fingerprint::from_int(1, 64).unwrap();
        assert_eq!(
            idx.get_one_near_dup(&fp_a).await.unwrap(),
            Some(("A".to_string(), 0))
        );
    }
}
