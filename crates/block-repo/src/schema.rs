//! Fixed, on-disk-format-compatible names and key encodings.
//!
//! These are deliberately `const`: the table names and meta keys are part of
//! the on-disk format contract, not an implementation detail, and must never
//! drift at runtime (see the "Global mutable state" design note: make the
//! table-name constants module-level immutables).

/// Block rows: block hash -> serialized block.
pub const TABLE_BLOCK: &str = "Block";

/// Tx-index rows: tx hash -> containing block hash. Only populated while
/// tx-indexing is enabled.
pub const TABLE_TX_INDEX: &str = "Transaction";

/// Singleton rows: the tip and the tx-index flag.
pub const TABLE_META: &str = "Common";

/// The tip is stored under the empty key, the one logical value `meta` has
/// always carried in the reference on-disk format.
pub const META_KEY_TIP: &[u8] = b"";

/// The tx-index flag lives under a single `0x00` byte, disjoint from the
/// (empty) tip key by construction.
pub const META_KEY_TXINDEX: &[u8] = &[0x00];
