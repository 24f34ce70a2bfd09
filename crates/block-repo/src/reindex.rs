//! `ReIndex` (§4.3): rebuilds or discards the tx-index in a single forward
//! scan of the `block` table.

use block_repo_common::BlockLike;
use block_repo_common::Codec;
use block_repo_common::TransactionLike;

use crate::backend::KvBackend;
use crate::backend::KvTransaction;
use crate::error::RepoError;
use crate::repository::Repository;
use crate::schema::TABLE_BLOCK;
use crate::schema::TABLE_TX_INDEX;

impl<Kv, C> Repository<Kv, C>
where
    Kv: KvBackend,
    C: Codec,
    C::Block: BlockLike<Transaction = C::Transaction>,
    C::Transaction: TransactionLike,
{
    /// Synchronises `tx_index` to the *current* tx-index flag over the full
    /// block population: rebuilds it when the flag is `true`, truncates it
    /// when `false`. Does not itself change the flag — pair with
    /// [`Repository::set_tx_index`] when the flag also needs to change.
    ///
    /// A forward scan of `block` in ascending key order, one write
    /// transaction locking both tables. Progress is logged every
    /// [`crate::config::RepoConfig::reindex_progress_interval`] blocks.
    #[tracing::instrument(skip(self))]
    pub fn reindex(&self) -> Result<(), RepoError<Kv::Error>> {
        let flag = self.tx_index()?;
        let progress_interval = self.reindex_progress_interval();

        let mut txn = self.kv().begin(true).map_err(RepoError::Storage)?;
        txn.synchronize(&[TABLE_BLOCK, TABLE_TX_INDEX])
            .map_err(RepoError::Storage)?;
        txn.set_lazy(false);

        // Truncate unconditionally: a rebuild starts from a clean slate too.
        txn.remove_all(TABLE_TX_INDEX).map_err(RepoError::Storage)?;

        let mut scanned: u64 = 0;

        if flag {
            let rows = txn
                .select_forward(TABLE_BLOCK)
                .map_err(RepoError::Storage)?;

            for (_hash_bytes, block_bytes) in &rows {
                let block = self
                    .codec()
                    .deserialize_block(block_bytes)
                    .map_err(|_| RepoError::Corrupted { what: "block" })?;
                let block_hash = block.block_hash();

                for tx in block.transactions() {
                    txn.insert(TABLE_TX_INDEX, tx.tx_hash().as_bytes(), block_hash.as_bytes())
                        .map_err(RepoError::Storage)?;
                }

                scanned += 1;
                if scanned % progress_interval == 0 {
                    tracing::info!(scanned, total = rows.len(), "reindex progress");
                }
            }
        }

        txn.commit().map_err(RepoError::Storage)?;

        tracing::info!(enabled = flag, blocks_scanned = scanned, "reindex complete");

        Ok(())
    }
}
