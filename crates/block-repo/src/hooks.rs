//! Replaces the source's virtual `OnInsertBlocks`/`OnInsertTransactions`/
//! `OnDeleteBlocks`/`OnDeleteTransactions` hooks (an inheritance-based
//! extension point) with a capability struct of optional closures, so a
//! derived store (e.g. a coin-view augmentation) can observe repository
//! mutations without subclassing anything.
//!
//! Hooks run after the KV transaction they describe has committed
//! successfully; they observe committed state only and cannot veto a write.

use block_repo_common::Codec;
use block_repo_common::Hash32;

type BlockHook<C> = Box<dyn Fn(&[<C as Codec>::Block]) + Send + Sync>;
type TxIndexHook = Box<dyn Fn(&[(Hash32, Hash32)]) + Send + Sync>;
type HashesHook = Box<dyn Fn(&[Hash32]) + Send + Sync>;

/// Optional callbacks fired after each kind of committed mutation.
pub struct Hooks<C: Codec> {
    pub on_insert_blocks: Option<BlockHook<C>>,
    pub on_insert_transactions: Option<TxIndexHook>,
    pub on_delete_blocks: Option<HashesHook>,
    pub on_delete_transactions: Option<HashesHook>,
}

impl<C: Codec> Default for Hooks<C> {
    fn default() -> Self {
        Hooks {
            on_insert_blocks: None,
            on_insert_transactions: None,
            on_delete_blocks: None,
            on_delete_transactions: None,
        }
    }
}

impl<C: Codec> Hooks<C> {
    pub fn fire_insert_blocks(&self, blocks: &[C::Block]) {
        if let Some(hook) = &self.on_insert_blocks {
            hook(blocks);
        }
    }

    pub fn fire_insert_transactions(&self, pairs: &[(Hash32, Hash32)]) {
        if let Some(hook) = &self.on_insert_transactions {
            hook(pairs);
        }
    }

    pub fn fire_delete_blocks(&self, hashes: &[Hash32]) {
        if let Some(hook) = &self.on_delete_blocks {
            hook(hashes);
        }
    }

    pub fn fire_delete_transactions(&self, hashes: &[Hash32]) {
        if let Some(hook) = &self.on_delete_transactions {
            hook(hashes);
        }
    }
}
