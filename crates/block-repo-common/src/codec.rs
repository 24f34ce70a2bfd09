//! The codec contract: the boundary between the repository and whatever
//! crate knows how to turn domain objects into bytes.
//!
//! The repository never inspects block or transaction contents beyond what
//! these traits expose. Validation, script interpretation and everything
//! else domain-specific lives upstream of this crate.

use crate::hash::Hash32;

/// A block: something with a canonical hash and an ordered list of transactions.
pub trait BlockLike: Clone {
    type Transaction: TransactionLike;

    /// The block's canonical hash, as produced by the codec.
    fn block_hash(&self) -> Hash32;

    /// The block's transactions, in on-chain order.
    fn transactions(&self) -> &[Self::Transaction];
}

/// A transaction: something with a canonical hash.
pub trait TransactionLike: Clone {
    fn tx_hash(&self) -> Hash32;
}

/// Converts between domain objects and the opaque byte strings the storage
/// layer persists.
///
/// Implementations are expected to be cheap to clone (or reference types),
/// since the repository holds one for its whole lifetime.
pub trait Codec: Clone {
    type Block: BlockLike<Transaction = Self::Transaction>;
    type Transaction: TransactionLike;
    type Error: core::fmt::Display + core::fmt::Debug;

    fn serialize_block(&self, block: &Self::Block) -> Vec<u8>;
    fn deserialize_block(&self, bytes: &[u8]) -> Result<Self::Block, Self::Error>;

    /// Serializes the (tip hash, tip height) pair stored under the fixed
    /// empty meta key.
    fn serialize_tip(&self, tip: &(Hash32, u32)) -> Vec<u8>;
    fn deserialize_tip(&self, bytes: &[u8]) -> Result<(Hash32, u32), Self::Error>;
}
