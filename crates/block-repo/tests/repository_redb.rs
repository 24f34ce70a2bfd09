//! Integration tests against the production `redb` backend: everything the
//! unit tests exercise against the in-memory mock, plus a process-restart
//! simulation (closing and reopening the backing file).

use block_repo::BlockLike;
use block_repo::Codec;
use block_repo::GenesisData;
use block_repo::Hash32;
use block_repo::RedbBackend;
use block_repo::RepoConfig;
use block_repo::Repository;
use block_repo::TransactionLike;

#[derive(Clone, Debug, PartialEq, Eq)]
struct Tx {
    hash: Hash32,
}

impl TransactionLike for Tx {
    fn tx_hash(&self) -> Hash32 {
        self.hash
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Block {
    hash: Hash32,
    txs: Vec<Tx>,
}

impl BlockLike for Block {
    type Transaction = Tx;

    fn block_hash(&self) -> Hash32 {
        self.hash
    }

    fn transactions(&self) -> &[Tx] {
        &self.txs
    }
}

#[derive(Debug)]
struct CodecError;

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "codec error")
    }
}

#[derive(Clone)]
struct BytesCodec;

impl Codec for BytesCodec {
    type Block = Block;
    type Transaction = Tx;
    type Error = CodecError;

    fn serialize_block(&self, block: &Block) -> Vec<u8> {
        let mut out = block.hash.to_vec();
        out.push(block.txs.len() as u8);
        for tx in &block.txs {
            out.extend_from_slice(tx.hash.as_bytes());
        }
        out
    }

    fn deserialize_block(&self, bytes: &[u8]) -> Result<Block, CodecError> {
        if bytes.len() < 33 {
            return Err(CodecError);
        }
        let hash = Hash32::from_slice(&bytes[0..32]).ok_or(CodecError)?;
        let count = bytes[32] as usize;
        let mut txs = Vec::with_capacity(count);
        let mut offset = 33;
        for _ in 0..count {
            let tx_hash = Hash32::from_slice(bytes.get(offset..offset + 32).ok_or(CodecError)?)
                .ok_or(CodecError)?;
            txs.push(Tx { hash: tx_hash });
            offset += 32;
        }
        Ok(Block { hash, txs })
    }

    fn serialize_tip(&self, tip: &(Hash32, u32)) -> Vec<u8> {
        let mut out = tip.0.to_vec();
        out.extend_from_slice(&tip.1.to_le_bytes());
        out
    }

    fn deserialize_tip(&self, bytes: &[u8]) -> Result<(Hash32, u32), CodecError> {
        if bytes.len() != 36 {
            return Err(CodecError);
        }
        let hash = Hash32::from_slice(&bytes[0..32]).ok_or(CodecError)?;
        let mut h = [0u8; 4];
        h.copy_from_slice(&bytes[32..36]);
        Ok((hash, u32::from_le_bytes(h)))
    }
}

fn hash_byte(b: u8) -> Hash32 {
    let mut bytes = [0u8; 32];
    bytes[31] = b;
    Hash32::new(bytes)
}

/// Builds a hash from a 64-character hex string, for tests where a
/// realistic-looking hash reads better than a single varied byte.
fn hash_hex(s: &str) -> Hash32 {
    Hash32::from_slice(&hex::decode(s).unwrap()).unwrap()
}

/// Routes `tracing` output through the test harness's captured writer so a
/// failing test shows the repository's own log lines alongside the panic.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("block_repo=debug")
        .try_init();
}

fn genesis() -> GenesisData<Block> {
    let gtx = Tx {
        hash: hash_byte(0xEE),
    };
    let gblock = Block {
        hash: hash_byte(0xFF),
        txs: vec![gtx],
    };
    GenesisData::new(hash_byte(0xFF), gblock)
}

fn block(hash: u8, tx_hashes: &[u8]) -> Block {
    Block {
        hash: hash_byte(hash),
        txs: tx_hashes
            .iter()
            .map(|&h| Tx {
                hash: hash_byte(h),
            })
            .collect(),
    }
}

#[test]
fn fresh_store_bootstraps_to_genesis_tip() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let backend = RedbBackend::open(dir.path()).unwrap();
    let config = RepoConfig::new(dir.path());
    let repo = Repository::new(backend, BytesCodec, genesis(), &config);

    repo.initialize().unwrap();

    assert_eq!(repo.tip_hash_and_height().unwrap(), (hash_byte(0xFF), 0));
    assert!(!repo.tx_index().unwrap());
    assert_eq!(repo.get_block(hash_byte(0x01)).unwrap(), None);
}

#[test]
fn put_get_and_delete_round_trip() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let backend = RedbBackend::open(dir.path()).unwrap();
    let config = RepoConfig::new(dir.path());
    let repo = Repository::new(backend, BytesCodec, genesis(), &config);
    repo.initialize().unwrap();
    repo.set_tx_index(true).unwrap();

    let b1 = block(0x01, &[0x11]);
    let b2 = block(0x02, &[0x21]);
    repo.put_blocks((hash_byte(2), 2), vec![b1.clone(), b2.clone()])
        .unwrap();

    assert_eq!(repo.get_block(hash_byte(1)).unwrap(), Some(b1));
    assert_eq!(
        repo.get_blocks(&[hash_byte(2), hash_byte(1), hash_byte(9)])
            .unwrap(),
        vec![Some(b2), Some(block(0x01, &[0x11])), None]
    );
    assert_eq!(
        repo.get_transaction_by_id(hash_byte(0x11)).unwrap(),
        Some(Tx {
            hash: hash_byte(0x11)
        })
    );

    repo.delete((hash_byte(1), 1), &[hash_byte(2)]).unwrap();
    assert!(!repo.exist(hash_byte(2)).unwrap());
    assert_eq!(repo.get_transaction_by_id(hash_byte(0x21)).unwrap(), None);
    assert_eq!(repo.tip_hash_and_height().unwrap(), (hash_byte(1), 1));
}

#[test]
fn reopening_the_store_preserves_committed_state() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    {
        let backend = RedbBackend::open(dir.path()).unwrap();
        let config = RepoConfig::new(dir.path());
        let repo = Repository::new(backend, BytesCodec, genesis(), &config);
        repo.initialize().unwrap();
        repo.set_tx_index(true).unwrap();
        repo.put_blocks((hash_byte(1), 1), vec![block(0x01, &[0x11])])
            .unwrap();
        repo.dispose();
    }

    // Simulates a process restart: a fresh Repository over the same files.
    let backend = RedbBackend::open(dir.path()).unwrap();
    let config = RepoConfig::new(dir.path());
    let repo = Repository::new(backend, BytesCodec, genesis(), &config);
    repo.initialize().unwrap();

    assert_eq!(repo.tip_hash_and_height().unwrap(), (hash_byte(1), 1));
    assert!(repo.tx_index().unwrap());
    assert_eq!(
        repo.get_block(hash_byte(1)).unwrap(),
        Some(block(0x01, &[0x11]))
    );
    assert_eq!(
        repo.get_transaction_by_id(hash_byte(0x11)).unwrap(),
        Some(Tx {
            hash: hash_byte(0x11)
        })
    );
}

#[test]
fn reindex_rebuilds_tx_index_after_reopen() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    {
        let backend = RedbBackend::open(dir.path()).unwrap();
        let config = RepoConfig::new(dir.path());
        let repo = Repository::new(backend, BytesCodec, genesis(), &config);
        repo.initialize().unwrap();
        repo.put_blocks(
            (hash_byte(2), 2),
            vec![block(0x01, &[0x11]), block(0x02, &[0x21])],
        )
        .unwrap();
        repo.dispose();
    }

    let backend = RedbBackend::open(dir.path()).unwrap();
    let config = RepoConfig::new(dir.path());
    let repo = Repository::new(backend, BytesCodec, genesis(), &config);
    repo.initialize().unwrap();

    repo.set_tx_index(true).unwrap();
    repo.reindex().unwrap();

    assert_eq!(
        repo.get_transaction_by_id(hash_byte(0x11)).unwrap(),
        Some(Tx {
            hash: hash_byte(0x11)
        })
    );
    assert_eq!(
        repo.get_transaction_by_id(hash_byte(0x21)).unwrap(),
        Some(Tx {
            hash: hash_byte(0x21)
        })
    );
}

#[test]
fn accepts_hashes_built_from_hex_literals() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let backend = RedbBackend::open(dir.path()).unwrap();
    let config = RepoConfig::new(dir.path());
    let repo = Repository::new(backend, BytesCodec, genesis(), &config);
    repo.initialize().unwrap();

    let block_hash = hash_hex(&"ab".repeat(32));
    let b = Block {
        hash: block_hash,
        txs: vec![],
    };
    repo.put_blocks((block_hash, 1), vec![b.clone()]).unwrap();

    assert_eq!(repo.get_block(block_hash).unwrap(), Some(b));
}
