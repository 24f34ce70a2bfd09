//! The in-memory genesis lookup table (invariant I4: genesis is never persisted).

use std::collections::BTreeMap;

use crate::codec::BlockLike;
use crate::codec::TransactionLike;
use crate::hash::Hash32;

/// Everything the repository needs to know about a network's genesis block,
/// built once at startup and shared read-only for the life of the process.
///
/// This is constructed from the network's genesis definition (an external
/// concern: network parameters are not this crate's business), but the
/// lookup table itself — "is this a genesis transaction, and if so which
/// one" — belongs here because the repository consults it on every read
/// path before touching the KV store.
pub struct GenesisData<B: BlockLike> {
    hash: Hash32,
    block: B,
    tx_index: BTreeMap<Hash32, B::Transaction>,
}

impl<B: BlockLike> GenesisData<B> {
    /// Builds the lookup table from a genesis hash and block. The hash is
    /// taken as given rather than recomputed from the block, since some
    /// networks' genesis blocks are not valid under their own consensus
    /// rules and the canonical hash is simply a well-known constant.
    pub fn new(hash: Hash32, block: B) -> Self {
        let tx_index = block
            .transactions()
            .iter()
            .map(|tx| (tx.tx_hash(), tx.clone()))
            .collect();

        GenesisData {
            hash,
            block,
            tx_index,
        }
    }

    pub fn hash(&self) -> Hash32 {
        self.hash
    }

    pub fn block(&self) -> &B {
        &self.block
    }

    pub fn is_genesis_hash(&self, hash: &Hash32) -> bool {
        &self.hash == hash
    }

    /// Looks up a genesis transaction by id. Returns `None` for any id not
    /// found among the genesis block's own transactions.
    pub fn transaction(&self, txid: &Hash32) -> Option<&B::Transaction> {
        self.tx_index.get(txid)
    }

    pub fn contains_transaction(&self, txid: &Hash32) -> bool {
        self.tx_index.contains_key(txid)
    }
}
