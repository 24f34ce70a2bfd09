//! The abstract KV engine contract (see the on-disk schema's external
//! interfaces): named tables, multi-table transactions, a lazy/eager value
//! toggle, point ops and a forward scan.
//!
//! This is the seam the "Backend substitution" design note asks for: the
//! repository is generic over [`KvBackend`] so it can run against a real
//! embedded store or an in-memory mock in tests, without either one knowing
//! about the other.

pub mod memory;
pub mod redb_backend;

pub use memory::MemoryBackend;
pub use redb_backend::RedbBackend;

/// The result of a point lookup: whether the key exists, and — if the
/// transaction has eager value loading enabled — its value.
#[derive(Debug, Clone)]
pub struct Row {
    exists: bool,
    value: Option<Vec<u8>>,
}

impl Row {
    pub fn absent() -> Self {
        Row {
            exists: false,
            value: None,
        }
    }

    pub fn exists_only() -> Self {
        Row {
            exists: true,
            value: None,
        }
    }

    pub fn with_value(value: Vec<u8>) -> Self {
        Row {
            exists: true,
            value: Some(value),
        }
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    pub fn into_value(self) -> Option<Vec<u8>> {
        self.value
    }
}

/// An embedded ordered KV backend: named tables, multi-table transactions.
pub trait KvBackend {
    type Error: std::error::Error + Send + Sync + 'static;
    type Txn<'a>: KvTransaction<Error = Self::Error>
    where
        Self: 'a;

    /// Opens a transaction. Write transactions serialise with each other
    /// (and, depending on the backend, with readers) per the single-writer
    /// discipline the repository's callers are expected to uphold.
    fn begin(&self, write: bool) -> Result<Self::Txn<'_>, Self::Error>;
}

/// A single KV transaction, scoped by explicit `commit` or drop-to-rollback.
pub trait KvTransaction: Sized {
    type Error;

    /// Declares the tables this transaction will touch, for lock
    /// acquisition. Backends that don't need explicit lock declarations
    /// (e.g. because they already serialise all writers) may treat this as
    /// a no-op.
    fn synchronize(&mut self, tables: &[&'static str]) -> Result<(), Self::Error>;

    /// Toggles eager value loading. Lazy (the default) only probes key
    /// existence; disabling it fetches the full value on `select`.
    fn set_lazy(&mut self, lazy: bool);

    fn select(&self, table: &'static str, key: &[u8]) -> Result<Row, Self::Error>;
    fn insert(&mut self, table: &'static str, key: &[u8], value: &[u8]) -> Result<(), Self::Error>;
    fn remove_key(&mut self, table: &'static str, key: &[u8]) -> Result<(), Self::Error>;

    /// Removes every key from `table`. The backend's on-disk footprint need
    /// not shrink: this is a logical truncate, not a compaction.
    fn remove_all(&mut self, table: &'static str) -> Result<(), Self::Error>;

    fn count(&self, table: &'static str) -> Result<u64, Self::Error>;

    /// A forward (ascending key order) scan of every row in `table`.
    /// Materialised eagerly: reindex is the only internal caller and is
    /// explicitly not expected to stream to external clients.
    fn select_forward(&self, table: &'static str) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Self::Error>;

    fn commit(self) -> Result<(), Self::Error>;
}
