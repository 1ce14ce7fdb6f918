//! # Hash
//!
//! A fixed-width 32-byte digest with hex text coding, plus the difficulty
//! predicate that mined blocks must satisfy.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// A 32-byte hash. Textual form is lowercase hex, with no `0x` prefix —
/// see `Account` for the `0x`-prefixed convention used by addresses.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash([u8; 32]);

/// Errors decoding a hash from its textual or binary form.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("hash must be exactly 32 bytes, got {0}")]
    WrongLength(usize),
    #[error("invalid hex in hash: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

impl Hash {
    pub const LEN: usize = 32;

    /// The all-zero hash. Used as the "no parent" / "scan from start"
    /// sentinel throughout the block log and sync protocol.
    pub const EMPTY: Hash = Hash([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// True iff every byte is zero.
    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// True iff the hash meets the fixed difficulty target: first three
    /// bytes zero, fourth byte non-zero (a 3.5-byte leading-zero target).
    pub fn satisfies_difficulty(&self) -> bool {
        self.0[0] == 0 && self.0[1] == 0 && self.0[2] == 0 && self.0[3] != 0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// sha-256 of arbitrary bytes.
pub fn sha256(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Hash(out)
}

/// sha-256 of a value's canonical JSON encoding, as used for block and
/// transaction hashing. Field order is whatever `serde_json` produces for
/// the given type, so the type's field declaration order IS the wire
/// order — callers must not reorder struct fields carelessly.
pub fn sha256_of_json<T: Serialize>(value: &T) -> Result<Hash, serde_json::Error> {
    let bytes = serde_json::to_vec(value)?;
    Ok(sha256(&bytes))
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Hash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        if bytes.len() != Hash::LEN {
            return Err(HashError::WrongLength(bytes.len()));
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Hash(out))
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_str(&s).map_err(DeError::custom)
    }
}
