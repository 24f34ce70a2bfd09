//! Shared fixtures for unit tests: a minimal in-memory block/transaction
//! model and a byte codec for it, so `repository.rs` and `reindex.rs` tests
//! don't each reinvent one.

#![cfg(test)]

use block_repo_common::BlockLike;
use block_repo_common::Codec;
use block_repo_common::GenesisData;
use block_repo_common::Hash32;
use block_repo_common::TransactionLike;

use crate::backend::MemoryBackend;
use crate::config::RepoConfig;
use crate::repository::Repository;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TestTx {
    pub(crate) hash: Hash32,
}

impl TransactionLike for TestTx {
    fn tx_hash(&self) -> Hash32 {
        self.hash
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TestBlock {
    pub(crate) hash: Hash32,
    pub(crate) txs: Vec<TestTx>,
}

impl BlockLike for TestBlock {
    type Transaction = TestTx;

    fn block_hash(&self) -> Hash32 {
        self.hash
    }

    fn transactions(&self) -> &[TestTx] {
        &self.txs
    }
}

#[derive(Debug)]
pub(crate) struct TestCodecError;

impl std::fmt::Display for TestCodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "test codec error")
    }
}

#[derive(Clone)]
pub(crate) struct TestCodec;

impl Codec for TestCodec {
    type Block = TestBlock;
    type Transaction = TestTx;
    type Error = TestCodecError;

    fn serialize_block(&self, block: &TestBlock) -> Vec<u8> {
        let mut out = block.hash.to_vec();
        out.push(block.txs.len() as u8);
        for tx in &block.txs {
            out.extend_from_slice(tx.hash.as_bytes());
        }
        out
    }

    fn deserialize_block(&self, bytes: &[u8]) -> Result<TestBlock, TestCodecError> {
        if bytes.len() < 33 {
            return Err(TestCodecError);
        }
        let hash = Hash32::from_slice(&bytes[0..32]).ok_or(TestCodecError)?;
        let count = bytes[32] as usize;
        let mut txs = Vec::with_capacity(count);
        let mut offset = 33;
        for _ in 0..count {
            let tx_hash =
                Hash32::from_slice(bytes.get(offset..offset + 32).ok_or(TestCodecError)?)
                    .ok_or(TestCodecError)?;
            txs.push(TestTx { hash: tx_hash });
            offset += 32;
        }
        Ok(TestBlock { hash, txs })
    }

    fn serialize_tip(&self, tip: &(Hash32, u32)) -> Vec<u8> {
        let mut out = tip.0.to_vec();
        out.extend_from_slice(&tip.1.to_le_bytes());
        out
    }

    fn deserialize_tip(&self, bytes: &[u8]) -> Result<(Hash32, u32), TestCodecError> {
        if bytes.len() != 36 {
            return Err(TestCodecError);
        }
        let hash = Hash32::from_slice(&bytes[0..32]).ok_or(TestCodecError)?;
        let mut h = [0u8; 4];
        h.copy_from_slice(&bytes[32..36]);
        Ok((hash, u32::from_le_bytes(h)))
    }
}

pub(crate) fn hash_byte(b: u8) -> Hash32 {
    let mut bytes = [0u8; 32];
    bytes[31] = b;
    Hash32::new(bytes)
}

pub(crate) fn test_genesis() -> GenesisData<TestBlock> {
    let gtx = TestTx {
        hash: hash_byte(0xEE),
    };
    let gblock = TestBlock {
        hash: hash_byte(0xFF),
        txs: vec![gtx],
    };
    GenesisData::new(hash_byte(0xFF), gblock)
}

pub(crate) fn test_repo() -> Repository<MemoryBackend, TestCodec> {
    let config = RepoConfig::new("unused-by-the-memory-backend");
    Repository::new(MemoryBackend::new(), TestCodec, test_genesis(), &config)
}
