//! A 32-byte canonical hash, ordered lexicographically over its raw bytes.
//!
//! `Hash32`'s `Ord` impl is what the storage layer relies on for its
//! B-tree-friendly bulk-insert ordering (see the repository's key encoding):
//! since `[u8; 32]` already compares lexicographically byte-by-byte, deriving
//! `Ord` gives us the right order for free.

use core::cmp::Ordering;
use core::fmt;

/// A canonical 32-byte hash: a block hash or a transaction hash.
///
/// The codec that produces these is responsible for canonicalisation (e.g.
/// double-SHA256, byte order); this type just carries the bytes around and
/// gives them a total, lexicographic order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    pub const ZERO: Hash32 = Hash32([0u8; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Hash32(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_vec(self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Parses a hash from a 32-byte slice, failing if the length doesn't match.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 32 {
            return None;
        }
        let mut buf = [0u8; 32];
        buf.copy_from_slice(bytes);
        Some(Hash32(buf))
    }
}

impl From<[u8; 32]> for Hash32 {
    fn from(bytes: [u8; 32]) -> Self {
        Hash32(bytes)
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", hex::encode(self.0))
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Hash32 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Hash32 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(D::Error::custom)?;
        Hash32::from_slice(&bytes).ok_or_else(|| D::Error::custom("expected 32 bytes"))
    }
}
