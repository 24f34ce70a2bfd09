//! Common types and functions for the block repository.
//!
//! This crate has no opinion on what a block or a transaction *is*: it only
//! fixes the shape every caller must agree on — a 32-byte canonical hash with
//! lexicographic ordering, the [`Codec`] contract used to move domain objects
//! in and out of byte strings, and the genesis lookup table that lets the
//! storage layer serve genesis data without ever persisting it.

pub mod codec;
pub mod genesis;
pub mod hash;

pub use codec::BlockLike;
pub use codec::Codec;
pub use codec::TransactionLike;
pub use genesis::GenesisData;
pub use hash::Hash32;
