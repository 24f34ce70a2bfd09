//! The public Repository API (§4.1): put blocks, get blocks, exist, delete,
//! reindex, set-txindex, get-tx-by-id, get-block-id-by-tx-id, initialize,
//! dispose.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::num::NonZeroUsize;

use block_repo_common::BlockLike;
use block_repo_common::Codec;
use block_repo_common::GenesisData;
use block_repo_common::Hash32;
use block_repo_common::TransactionLike;
use lru::LruCache;
use spin::Mutex;

use crate::backend::KvBackend;
use crate::backend::KvTransaction;
use crate::config::RepoConfig;
use crate::error::RepoError;
use crate::hooks::Hooks;
use crate::schema::META_KEY_TIP;
use crate::schema::META_KEY_TXINDEX;
use crate::schema::TABLE_BLOCK;
use crate::schema::TABLE_META;
use crate::schema::TABLE_TX_INDEX;

/// The durable storage layer for a full node: blocks keyed by hash, an
/// optional tx-index, and a crash-consistent tip, on top of a pluggable
/// [`KvBackend`].
pub struct Repository<Kv: KvBackend, C: Codec> {
    kv: Kv,
    codec: C,
    genesis: GenesisData<C::Block>,
    tip: Mutex<Option<(Hash32, u32)>>,
    tx_index_flag: Mutex<Option<bool>>,
    block_cache: Mutex<Option<LruCache<Hash32, C::Block>>>,
    hooks: Hooks<C>,
    reindex_progress_interval: u64,
}

fn encode_flag(flag: bool) -> [u8; 1] {
    [flag as u8]
}

fn decode_flag<E>(bytes: &[u8]) -> Result<bool, RepoError<E>> {
    match bytes {
        [0] => Ok(false),
        [1] => Ok(true),
        _ => Err(RepoError::Corrupted {
            what: "txindex flag",
        }),
    }
}

impl<Kv, C> Repository<Kv, C>
where
    Kv: KvBackend,
    C: Codec,
    C::Block: BlockLike<Transaction = C::Transaction>,
    C::Transaction: TransactionLike,
{
    pub fn new(kv: Kv, codec: C, genesis: GenesisData<C::Block>, config: &RepoConfig) -> Self {
        let block_cache = NonZeroUsize::new(config.block_cache_capacity).map(LruCache::new);

        Repository {
            kv,
            codec,
            genesis,
            tip: Mutex::new(None),
            tx_index_flag: Mutex::new(None),
            block_cache: Mutex::new(block_cache),
            hooks: Hooks::default(),
            reindex_progress_interval: config.reindex_progress_interval.max(1),
        }
    }

    /// Attaches the §9 "Inheritance in the source" capability hooks.
    pub fn with_hooks(mut self, hooks: Hooks<C>) -> Self {
        self.hooks = hooks;
        self
    }

    pub(crate) fn codec(&self) -> &C {
        &self.codec
    }

    pub(crate) fn kv(&self) -> &Kv {
        &self.kv
    }

    pub(crate) fn reindex_progress_interval(&self) -> u64 {
        self.reindex_progress_interval
    }

    pub(crate) fn hooks(&self) -> &Hooks<C> {
        &self.hooks
    }

    /// Idempotent bootstrap. Must be called before any other operation.
    pub fn initialize(&self) -> Result<(), RepoError<Kv::Error>> {
        let mut txn = self.kv.begin(true).map_err(RepoError::Storage)?;
        txn.synchronize(&[TABLE_META]).map_err(RepoError::Storage)?;
        txn.set_lazy(false);

        let mut wrote = false;

        let tip_row = txn
            .select(TABLE_META, META_KEY_TIP)
            .map_err(RepoError::Storage)?;
        let tip = match tip_row.into_value() {
            Some(bytes) => self
                .codec
                .deserialize_tip(&bytes)
                .map_err(|_| RepoError::Corrupted { what: "tip" })?,
            None => {
                let genesis_tip = (self.genesis.hash(), 0);
                let bytes = self.codec.serialize_tip(&genesis_tip);
                txn.insert(TABLE_META, META_KEY_TIP, &bytes)
                    .map_err(RepoError::Storage)?;
                wrote = true;
                genesis_tip
            }
        };

        let flag_row = txn
            .select(TABLE_META, META_KEY_TXINDEX)
            .map_err(RepoError::Storage)?;
        let flag = match flag_row.into_value() {
            Some(bytes) => decode_flag(&bytes)?,
            None => {
                txn.insert(TABLE_META, META_KEY_TXINDEX, &encode_flag(false))
                    .map_err(RepoError::Storage)?;
                wrote = true;
                false
            }
        };

        if wrote {
            txn.commit().map_err(RepoError::Storage)?;
            tracing::info!(tip_height = tip.1, txindex = flag, "repository initialized");
        } else {
            tracing::debug!("repository already initialized");
        }

        *self.tip.lock() = Some(tip);
        *self.tx_index_flag.lock() = Some(flag);

        Ok(())
    }

    /// Writes a contiguous batch of blocks and advances the tip atomically.
    #[tracing::instrument(skip(self, blocks), fields(batch_len = blocks.len()))]
    pub fn put_blocks(
        &self,
        new_tip: (Hash32, u32),
        blocks: Vec<C::Block>,
    ) -> Result<(), RepoError<Kv::Error>> {
        // 1. De-duplicate by block hash, keeping the first occurrence.
        let mut seen = BTreeSet::new();
        let mut deduped = Vec::with_capacity(blocks.len());
        for block in blocks {
            if seen.insert(block.block_hash()) {
                deduped.push(block);
            }
        }

        // 2. Sort ascending by raw-byte key: B-tree-friendly bulk insert.
        deduped.sort_by_key(|b| b.block_hash());

        let tx_index_enabled = self.tx_index()?;

        let mut txn = self.kv.begin(true).map_err(RepoError::Storage)?;
        let mut tables = vec![TABLE_BLOCK, TABLE_META];
        if tx_index_enabled {
            tables.push(TABLE_TX_INDEX);
        }
        txn.synchronize(&tables).map_err(RepoError::Storage)?;

        // 3. Skip rows already present; collect the rest as newly inserted.
        let mut newly_inserted = Vec::new();
        for block in &deduped {
            let hash = block.block_hash();
            let exists = txn
                .select(TABLE_BLOCK, hash.as_bytes())
                .map_err(RepoError::Storage)?
                .exists();
            if !exists {
                let bytes = self.codec.serialize_block(block);
                txn.insert(TABLE_BLOCK, hash.as_bytes(), &bytes)
                    .map_err(RepoError::Storage)?;
                newly_inserted.push(block.clone());
            }
        }

        // 4. Tx-index only covers newly inserted blocks' transactions.
        let mut tx_pairs = Vec::new();
        if tx_index_enabled {
            for block in &newly_inserted {
                let block_hash = block.block_hash();
                for tx in block.transactions() {
                    tx_pairs.push((tx.tx_hash(), block_hash));
                }
            }
            tx_pairs.sort_by_key(|(txid, _)| *txid);

            for (txid, block_hash) in &tx_pairs {
                txn.insert(TABLE_TX_INDEX, txid.as_bytes(), block_hash.as_bytes())
                    .map_err(RepoError::Storage)?;
            }
        }

        // 5. Advance the tip.
        let tip_bytes = self.codec.serialize_tip(&new_tip);
        txn.insert(TABLE_META, META_KEY_TIP, &tip_bytes)
            .map_err(RepoError::Storage)?;

        // 6. Commit.
        txn.commit().map_err(RepoError::Storage)?;

        *self.tip.lock() = Some(new_tip);
        if let Some(cache) = self.block_cache.lock().as_mut() {
            for block in &newly_inserted {
                cache.put(block.block_hash(), block.clone());
            }
        }

        tracing::info!(
            inserted = newly_inserted.len(),
            requested = deduped.len(),
            "committed blocks"
        );

        self.hooks.fire_insert_blocks(&newly_inserted);
        if !tx_pairs.is_empty() {
            self.hooks.fire_insert_transactions(&tx_pairs);
        }

        Ok(())
    }

    /// Reads a single block, consulting the genesis map first (I4).
    pub fn get_block(&self, hash: Hash32) -> Result<Option<C::Block>, RepoError<Kv::Error>> {
        if self.genesis.is_genesis_hash(&hash) {
            return Ok(Some(self.genesis.block().clone()));
        }

        if let Some(block) = self
            .block_cache
            .lock()
            .as_mut()
            .and_then(|cache| cache.get(&hash).cloned())
        {
            tracing::debug!(%hash, "block cache hit");
            return Ok(Some(block));
        }

        let mut txn = self.kv.begin(false).map_err(RepoError::Storage)?;
        txn.set_lazy(false);
        let row = txn
            .select(TABLE_BLOCK, hash.as_bytes())
            .map_err(RepoError::Storage)?;

        match row.into_value() {
            None => Ok(None),
            Some(bytes) => {
                let block = self
                    .codec
                    .deserialize_block(&bytes)
                    .map_err(|_| RepoError::Corrupted { what: "block" })?;
                if let Some(cache) = self.block_cache.lock().as_mut() {
                    cache.put(hash, block.clone());
                }
                Ok(Some(block))
            }
        }
    }

    /// Batched [`Repository::get_block`]. Internally sorts for access
    /// locality; results are returned in the caller's requested order.
    pub fn get_blocks(
        &self,
        hashes: &[Hash32],
    ) -> Result<Vec<Option<C::Block>>, RepoError<Kv::Error>> {
        let mut results: Vec<Option<C::Block>> = vec![None; hashes.len()];
        let mut pending = Vec::new();

        for (i, hash) in hashes.iter().enumerate() {
            if self.genesis.is_genesis_hash(hash) {
                results[i] = Some(self.genesis.block().clone());
                continue;
            }
            if let Some(block) = self
                .block_cache
                .lock()
                .as_mut()
                .and_then(|cache| cache.get(hash).cloned())
            {
                results[i] = Some(block);
                continue;
            }
            pending.push(i);
        }

        pending.sort_by_key(|&i| hashes[i]);

        if !pending.is_empty() {
            let mut txn = self.kv.begin(false).map_err(RepoError::Storage)?;
            txn.set_lazy(false);

            for i in pending {
                let hash = hashes[i];
                let row = txn
                    .select(TABLE_BLOCK, hash.as_bytes())
                    .map_err(RepoError::Storage)?;
                if let Some(bytes) = row.into_value() {
                    let block = self
                        .codec
                        .deserialize_block(&bytes)
                        .map_err(|_| RepoError::Corrupted { what: "block" })?;
                    if let Some(cache) = self.block_cache.lock().as_mut() {
                        cache.put(hash, block.clone());
                    }
                    results[i] = Some(block);
                }
            }
        }

        Ok(results)
    }

    /// Key-only probe of the `block` table. Genesis is *not* special-cased
    /// here: existence reflects literal row presence, preserving the
    /// asymmetry with [`Repository::get_block`] noted as an open question.
    pub fn exist(&self, hash: Hash32) -> Result<bool, RepoError<Kv::Error>> {
        let txn = self.kv.begin(false).map_err(RepoError::Storage)?;
        let row = txn
            .select(TABLE_BLOCK, hash.as_bytes())
            .map_err(RepoError::Storage)?;
        Ok(row.exists())
    }

    fn lookup_tx_index_block(&self, txid: Hash32) -> Result<Option<Hash32>, RepoError<Kv::Error>> {
        let mut txn = self.kv.begin(false).map_err(RepoError::Storage)?;
        txn.set_lazy(false);
        let row = txn
            .select(TABLE_TX_INDEX, txid.as_bytes())
            .map_err(RepoError::Storage)?;
        match row.into_value() {
            None => Ok(None),
            Some(bytes) => Hash32::from_slice(&bytes).map(Some).ok_or(RepoError::Corrupted {
                what: "tx_index block hash",
            }),
        }
    }

    /// Resolves a transaction by id, gated on the tx-index flag.
    pub fn get_transaction_by_id(
        &self,
        txid: Hash32,
    ) -> Result<Option<C::Transaction>, RepoError<Kv::Error>> {
        if !self.tx_index()? {
            return Ok(None);
        }

        if let Some(tx) = self.genesis.transaction(&txid) {
            return Ok(Some(tx.clone()));
        }

        let block_hash = match self.lookup_tx_index_block(txid)? {
            Some(hash) => hash,
            None => return Ok(None),
        };

        let block = match self.get_block(block_hash)? {
            Some(block) => block,
            None => return Ok(None),
        };

        Ok(block
            .transactions()
            .iter()
            .find(|tx| tx.tx_hash() == txid)
            .cloned())
    }

    /// Batched [`Repository::get_transaction_by_id`] with an all-or-nothing
    /// contract: any missing id nulls the whole result. Duplicate ids are
    /// served from the already-resolved set without a second lookup.
    /// `is_cancelled` is polled between ids.
    pub fn get_transactions_by_ids(
        &self,
        txids: &[Hash32],
        is_cancelled: &dyn Fn() -> bool,
    ) -> Result<Option<Vec<C::Transaction>>, RepoError<Kv::Error>> {
        if !self.tx_index()? {
            return Ok(None);
        }

        let mut resolved: HashMap<Hash32, C::Transaction> = HashMap::new();
        let mut out = Vec::with_capacity(txids.len());

        for txid in txids {
            if is_cancelled() {
                return Err(RepoError::Cancelled);
            }

            if let Some(tx) = resolved.get(txid) {
                out.push(tx.clone());
                continue;
            }

            let tx = match self.get_transaction_by_id(*txid)? {
                Some(tx) => tx,
                None => return Ok(None),
            };

            resolved.insert(*txid, tx.clone());
            out.push(tx);
        }

        Ok(Some(out))
    }

    /// Resolves the block hash containing a transaction, gated on the
    /// tx-index flag, with a genesis shortcut.
    pub fn get_block_id_by_transaction_id(
        &self,
        txid: Hash32,
    ) -> Result<Option<Hash32>, RepoError<Kv::Error>> {
        if !self.tx_index()? {
            return Ok(None);
        }

        if self.genesis.contains_transaction(&txid) {
            return Ok(Some(self.genesis.hash()));
        }

        self.lookup_tx_index_block(txid)
    }

    fn delete_inner(
        &self,
        new_tip: Option<(Hash32, u32)>,
        hashes: &[Hash32],
    ) -> Result<(), RepoError<Kv::Error>> {
        let tx_index_enabled = self.tx_index()?;

        let mut txn = self.kv.begin(true).map_err(RepoError::Storage)?;
        let mut tables = vec![TABLE_BLOCK];
        if tx_index_enabled {
            tables.push(TABLE_TX_INDEX);
        }
        if new_tip.is_some() {
            tables.push(TABLE_META);
        }
        txn.synchronize(&tables).map_err(RepoError::Storage)?;
        txn.set_lazy(false);

        let mut removed_blocks = Vec::new();
        let mut removed_tx_ids = Vec::new();

        for &hash in hashes {
            let row = txn
                .select(TABLE_BLOCK, hash.as_bytes())
                .map_err(RepoError::Storage)?;
            let bytes = match row.into_value() {
                Some(bytes) => bytes,
                // Missing block hashes are silently skipped.
                None => continue,
            };

            if tx_index_enabled {
                let block = self
                    .codec
                    .deserialize_block(&bytes)
                    .map_err(|_| RepoError::Corrupted { what: "block" })?;
                for tx in block.transactions() {
                    let txid = tx.tx_hash();
                    txn.remove_key(TABLE_TX_INDEX, txid.as_bytes())
                        .map_err(RepoError::Storage)?;
                    removed_tx_ids.push(txid);
                }
            }

            txn.remove_key(TABLE_BLOCK, hash.as_bytes())
                .map_err(RepoError::Storage)?;
            removed_blocks.push(hash);
        }

        if let Some(tip) = new_tip {
            let tip_bytes = self.codec.serialize_tip(&tip);
            txn.insert(TABLE_META, META_KEY_TIP, &tip_bytes)
                .map_err(RepoError::Storage)?;
        }

        txn.commit().map_err(RepoError::Storage)?;

        if let Some(tip) = new_tip {
            *self.tip.lock() = Some(tip);
        }
        if let Some(cache) = self.block_cache.lock().as_mut() {
            for hash in &removed_blocks {
                cache.pop(hash);
            }
        }

        tracing::info!(removed = removed_blocks.len(), "deleted blocks");

        self.hooks.fire_delete_blocks(&removed_blocks);
        if !removed_tx_ids.is_empty() {
            self.hooks.fire_delete_transactions(&removed_tx_ids);
        }

        Ok(())
    }

    /// Removes blocks and advances the tip atomically.
    pub fn delete(
        &self,
        new_tip: (Hash32, u32),
        hashes: &[Hash32],
    ) -> Result<(), RepoError<Kv::Error>> {
        self.delete_inner(Some(new_tip), hashes)
    }

    /// Removes blocks without touching the tip.
    pub fn delete_blocks(&self, hashes: &[Hash32]) -> Result<(), RepoError<Kv::Error>> {
        self.delete_inner(None, hashes)
    }

    /// Flips the tx-index flag. Does not trigger or undo indexing; pair
    /// with [`crate::reindex::reindex`] when the data needs to catch up.
    pub fn set_tx_index(&self, flag: bool) -> Result<(), RepoError<Kv::Error>> {
        let mut txn = self.kv.begin(true).map_err(RepoError::Storage)?;
        txn.synchronize(&[TABLE_META]).map_err(RepoError::Storage)?;
        txn.insert(TABLE_META, META_KEY_TXINDEX, &encode_flag(flag))
            .map_err(RepoError::Storage)?;
        txn.commit().map_err(RepoError::Storage)?;

        *self.tx_index_flag.lock() = Some(flag);
        tracing::info!(enabled = flag, "tx index flag updated");
        Ok(())
    }

    /// Cached in-memory tip, loaded lazily if `initialize` hasn't run yet
    /// in this process.
    pub fn tip_hash_and_height(&self) -> Result<(Hash32, u32), RepoError<Kv::Error>> {
        if let Some(tip) = *self.tip.lock() {
            return Ok(tip);
        }

        let mut txn = self.kv.begin(false).map_err(RepoError::Storage)?;
        txn.set_lazy(false);
        let row = txn
            .select(TABLE_META, META_KEY_TIP)
            .map_err(RepoError::Storage)?;
        let bytes = row.into_value().ok_or(RepoError::InvalidArgument(
            "repository not initialized: no tip in meta",
        ))?;
        let tip = self
            .codec
            .deserialize_tip(&bytes)
            .map_err(|_| RepoError::Corrupted { what: "tip" })?;

        *self.tip.lock() = Some(tip);
        Ok(tip)
    }

    /// Cached in-memory tx-index flag, loaded lazily if `initialize` hasn't
    /// run yet in this process.
    pub fn tx_index(&self) -> Result<bool, RepoError<Kv::Error>> {
        if let Some(flag) = *self.tx_index_flag.lock() {
            return Ok(flag);
        }

        let mut txn = self.kv.begin(false).map_err(RepoError::Storage)?;
        txn.set_lazy(false);
        let row = txn
            .select(TABLE_META, META_KEY_TXINDEX)
            .map_err(RepoError::Storage)?;
        let bytes = row.into_value().ok_or(RepoError::InvalidArgument(
            "repository not initialized: no txindex flag in meta",
        ))?;
        let flag = decode_flag(&bytes)?;

        *self.tx_index_flag.lock() = Some(flag);
        Ok(flag)
    }

    /// Releases the KV handle. Must be the last call; any subsequent
    /// invocation on `self` is prevented at compile time since this takes
    /// `self` by value.
    pub fn dispose(self) {
        tracing::info!("repository disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::hash_byte;
    use crate::test_support::test_repo;
    use crate::test_support::TestBlock;
    use crate::test_support::TestTx;

    fn block(hash: u8, tx_hashes: &[u8]) -> TestBlock {
        TestBlock {
            hash: hash_byte(hash),
            txs: tx_hashes
                .iter()
                .map(|&h| TestTx {
                    hash: hash_byte(h),
                })
                .collect(),
        }
    }

    #[test]
    fn s1_fresh_repo_has_genesis_tip_and_no_blocks() {
        let repo = test_repo();
        repo.initialize().unwrap();

        assert_eq!(repo.tip_hash_and_height().unwrap(), (hash_byte(0xFF), 0));
        assert!(!repo.tx_index().unwrap());
        assert_eq!(repo.get_block(hash_byte(0x01)).unwrap(), None);
        // I4 / the Exist-vs-GetBlock asymmetry: no genesis row is ever
        // persisted, so Exist(genesis_hash) is false even though
        // GetBlock(genesis_hash) always succeeds.
        assert!(!repo.exist(hash_byte(0xFF)).unwrap());
    }

    #[test]
    fn round_trip_invariant() {
        let repo = test_repo();
        repo.initialize().unwrap();

        let b1 = block(0x01, &[0x11, 0x12]);
        repo.put_blocks((hash_byte(0x01), 1), vec![b1.clone()])
            .unwrap();

        assert_eq!(repo.get_block(hash_byte(0x01)).unwrap(), Some(b1));
        assert!(repo.exist(hash_byte(0x01)).unwrap());
        assert_eq!(repo.tip_hash_and_height().unwrap(), (hash_byte(0x01), 1));
    }

    #[test]
    fn s2_txindex_and_batch_lookups() {
        let repo = test_repo();
        repo.initialize().unwrap();
        repo.set_tx_index(true).unwrap();

        let b1 = block(0x01, &[0x11]);
        let b2 = block(0x02, &[0x21]);
        repo.put_blocks((hash_byte(0x02), 2), vec![b1.clone(), b2.clone()])
            .unwrap();

        assert_eq!(repo.get_block(hash_byte(0x01)).unwrap(), Some(b1));

        let missing = hash_byte(0x99);
        let fetched = repo
            .get_blocks(&[hash_byte(0x02), hash_byte(0x01), missing])
            .unwrap();
        assert_eq!(fetched, vec![Some(b2), Some(block(0x01, &[0x11])), None]);

        assert_eq!(
            repo.get_transaction_by_id(hash_byte(0x11)).unwrap(),
            Some(TestTx {
                hash: hash_byte(0x11)
            })
        );
        assert_eq!(
            repo.get_block_id_by_transaction_id(hash_byte(0x11))
                .unwrap(),
            Some(hash_byte(0x01))
        );
    }

    #[test]
    fn batch_order_is_preserved_regardless_of_access_order() {
        let repo = test_repo();
        repo.initialize().unwrap();

        let blocks: Vec<TestBlock> = (1..=5).map(|h| block(h, &[])).collect();
        repo.put_blocks((hash_byte(5), 5), blocks.clone()).unwrap();

        let hashes: Vec<_> = [3u8, 1, 5, 2, 4].iter().map(|&h| hash_byte(h)).collect();
        let fetched = repo.get_blocks(&hashes).unwrap();

        for (i, expected_hash) in hashes.iter().enumerate() {
            assert_eq!(fetched[i].as_ref().unwrap().hash, *expected_hash);
        }
    }

    #[test]
    fn deduplication_within_a_batch() {
        let repo_a = test_repo();
        repo_a.initialize().unwrap();
        let b1 = block(0x01, &[]);
        repo_a
            .put_blocks((hash_byte(1), 1), vec![b1.clone(), b1.clone()])
            .unwrap();

        let repo_b = test_repo();
        repo_b.initialize().unwrap();
        repo_b
            .put_blocks((hash_byte(1), 1), vec![b1.clone()])
            .unwrap();

        assert_eq!(
            repo_a.get_block(hash_byte(1)).unwrap(),
            repo_b.get_block(hash_byte(1)).unwrap()
        );
    }

    #[test]
    fn txindex_gating_nulls_every_lookup_including_genesis() {
        let repo = test_repo();
        repo.initialize().unwrap();

        assert_eq!(repo.get_transaction_by_id(hash_byte(0xEE)).unwrap(), None);
        assert_eq!(
            repo.get_block_id_by_transaction_id(hash_byte(0xEE))
                .unwrap(),
            None
        );
        assert_eq!(
            repo.get_transactions_by_ids(&[hash_byte(0xEE)], &|| false)
                .unwrap(),
            None
        );
    }

    #[test]
    fn genesis_shortcut_resolves_without_any_block_ever_inserted() {
        let repo = test_repo();
        repo.initialize().unwrap();
        repo.set_tx_index(true).unwrap();

        assert_eq!(
            repo.get_transaction_by_id(hash_byte(0xEE)).unwrap(),
            Some(TestTx {
                hash: hash_byte(0xEE)
            })
        );
        assert_eq!(
            repo.get_block_id_by_transaction_id(hash_byte(0xEE))
                .unwrap(),
            Some(hash_byte(0xFF))
        );
    }

    #[test]
    fn s3_delete_consistency() {
        let repo = test_repo();
        repo.initialize().unwrap();
        repo.set_tx_index(true).unwrap();

        let b1 = block(0x01, &[0x11]);
        let b2 = block(0x02, &[0x21]);
        repo.put_blocks((hash_byte(2), 2), vec![b1, b2]).unwrap();

        repo.delete((hash_byte(1), 1), &[hash_byte(2)]).unwrap();

        assert!(!repo.exist(hash_byte(2)).unwrap());
        assert_eq!(repo.get_transaction_by_id(hash_byte(0x21)).unwrap(), None);
        assert_eq!(
            repo.get_block_id_by_transaction_id(hash_byte(0x11))
                .unwrap(),
            Some(hash_byte(1))
        );
        assert_eq!(repo.tip_hash_and_height().unwrap(), (hash_byte(1), 1));
    }

    #[test]
    fn delete_blocks_does_not_touch_the_tip() {
        let repo = test_repo();
        repo.initialize().unwrap();

        let b1 = block(0x01, &[]);
        repo.put_blocks((hash_byte(1), 1), vec![b1]).unwrap();
        let tip_before = repo.tip_hash_and_height().unwrap();

        repo.delete_blocks(&[hash_byte(1)]).unwrap();

        assert!(!repo.exist(hash_byte(1)).unwrap());
        assert_eq!(repo.tip_hash_and_height().unwrap(), tip_before);
    }

    #[test]
    fn delete_silently_skips_missing_hashes() {
        let repo = test_repo();
        repo.initialize().unwrap();

        repo.delete((hash_byte(9), 9), &[hash_byte(0x42)]).unwrap();
        assert_eq!(repo.tip_hash_and_height().unwrap(), (hash_byte(9), 9));
    }

    #[test]
    fn s6_batched_tx_lookup_dedupes_and_is_all_or_nothing() {
        let repo = test_repo();
        repo.initialize().unwrap();
        repo.set_tx_index(true).unwrap();

        let b1 = block(0x01, &[0x11]);
        repo.put_blocks((hash_byte(1), 1), vec![b1]).unwrap();

        let missing = hash_byte(0x77);
        let result = repo
            .get_transactions_by_ids(&[hash_byte(0x11), hash_byte(0x11), missing], &|| false)
            .unwrap();
        assert_eq!(result, None);

        let result = repo
            .get_transactions_by_ids(&[hash_byte(0x11), hash_byte(0x11)], &|| false)
            .unwrap()
            .unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0], result[1]);
    }

    #[test]
    fn cancellation_surfaces_as_an_error() {
        let repo = test_repo();
        repo.initialize().unwrap();
        repo.set_tx_index(true).unwrap();

        let err = repo
            .get_transactions_by_ids(&[hash_byte(0x11), hash_byte(0x12)], &|| true)
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn hooks_fire_after_commit() {
        use std::sync::atomic::AtomicUsize;
        use std::sync::atomic::Ordering;
        use std::sync::Arc;

        use crate::hooks::Hooks;

        let inserted = Arc::new(AtomicUsize::new(0));
        let inserted_in_hook = inserted.clone();

        let config = RepoConfig::new("unused-by-the-memory-backend");
        let repo = Repository::new(
            crate::backend::MemoryBackend::new(),
            crate::test_support::TestCodec,
            crate::test_support::test_genesis(),
            &config,
        )
        .with_hooks(Hooks {
            on_insert_blocks: Some(Box::new(move |blocks| {
                inserted_in_hook.fetch_add(blocks.len(), Ordering::SeqCst);
            })),
            ..Hooks::default()
        });

        repo.initialize().unwrap();
        repo.put_blocks((hash_byte(1), 1), vec![block(0x01, &[])])
            .unwrap();

        assert_eq!(inserted.load(Ordering::SeqCst), 1);
    }
}
