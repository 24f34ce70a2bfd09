//! Error kinds for the block repository.
//!
//! No derive-macro error crate here: the reference chain-storage module this
//! crate is modelled after hand-writes `Display`/`Error` for its own backend
//! error type, and we follow the same pattern rather than adding a dependency
//! the rest of the stack doesn't otherwise need.

use core::fmt;

/// Everything that can go wrong calling into the repository.
#[derive(Debug)]
pub enum RepoError<B> {
    /// The KV backend surfaced a fault: I/O, lock contention, corruption.
    /// The transaction that hit this has already been rolled back.
    Storage(B),

    /// A block or tip row failed to deserialize. Treated like a storage
    /// fault by callers, but kept distinct since it usually points at a
    /// codec mismatch rather than a disk problem.
    Corrupted { what: &'static str },

    /// `GetTransactionsByIds` was asked to stop mid-batch.
    Cancelled,

    /// A precondition was violated (e.g. an empty data directory path).
    /// Raised before any I/O is attempted.
    InvalidArgument(&'static str),
}

impl<B: fmt::Display> fmt::Display for RepoError<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoError::Storage(err) => write!(f, "storage backend error: {err}"),
            RepoError::Corrupted { what } => write!(f, "corrupted row: {what}"),
            RepoError::Cancelled => write!(f, "operation cancelled"),
            RepoError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
        }
    }
}

impl<B: fmt::Debug + fmt::Display> std::error::Error for RepoError<B> {}

impl<B> RepoError<B> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RepoError::Cancelled)
    }
}
