//! # Transactions
//!
//! An unsigned transaction is a plain transfer instruction; a signed
//! transaction adds a fixed-length recoverable signature over the
//! unsigned payload's canonical-JSON hash. Field order in both structs
//! matches `spec.md` §4.1/§6 exactly — `serde_json` serializes struct
//! fields in declaration order, so that order IS the wire/hashing order.

use std::fmt;
use std::str::FromStr;

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::account::{recover_account, Account, Keypair};
use crate::config::REWARD_DATA;
use crate::hash::{sha256_of_json, Hash};

/// An unsigned transfer instruction.
///
/// `time` is nanosecond wall-clock at construction; it is the stable
/// sort key for ordering transactions inside a block, and is otherwise
/// not consensus-verified (clock skew between nodes is an acknowledged
/// weakness, not a rejection condition).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub from: Account,
    pub to: Account,
    pub value: u64,
    pub data: String,
    pub time: u64,
}

impl UnsignedTransaction {
    pub fn new(from: Account, to: Account, value: u64, data: impl Into<String>) -> Self {
        UnsignedTransaction {
            from,
            to,
            value,
            data: data.into(),
            time: now_nanos(),
        }
    }

    /// `data == "reward"` designates a mint with no sender debit.
    pub fn is_reward(&self) -> bool {
        self.data == REWARD_DATA
    }

    /// sha-256 of the canonical JSON encoding of the unsigned payload —
    /// the digest that gets signed, and the one signature recovery is
    /// checked against.
    pub fn hash(&self) -> Hash {
        sha256_of_json(self).expect("UnsignedTransaction always serializes")
    }

    /// Signs this payload with `keypair`, producing a `SignedTransaction`.
    pub fn sign(self, keypair: &Keypair) -> SignedTransaction {
        let digest = *self.hash().as_bytes();
        let recoverable = keypair.sign_digest(&digest);
        SignedTransaction {
            unsigned: self,
            signature: SignatureBytes::from_recoverable(&recoverable),
        }
    }
}

fn now_nanos() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_nanos() as u64
}

/// An unsigned transaction plus a fixed-length recoverable signature over
/// `unsigned.hash()`.
///
/// Field order on the wire is `from, to, value, data, time, signature` —
/// `#[serde(flatten)]` over `UnsignedTransaction` followed by the
/// `signature` field reproduces exactly that order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    #[serde(flatten)]
    pub unsigned: UnsignedTransaction,
    pub signature: SignatureBytes,
}

impl SignedTransaction {
    pub fn from(&self) -> Account {
        self.unsigned.from
    }

    pub fn to(&self) -> Account {
        self.unsigned.to
    }

    pub fn value(&self) -> u64 {
        self.unsigned.value
    }

    pub fn time(&self) -> u64 {
        self.unsigned.time
    }

    pub fn is_reward(&self) -> bool {
        self.unsigned.is_reward()
    }

    /// Recovers the signer's address from the signature and compares it
    /// against the declared `from`. This is the sole authenticity check —
    /// there is no separate "verify" step against a stored public key.
    pub fn is_authentic(&self) -> bool {
        let digest = *self.unsigned.hash().as_bytes();
        match self.signature.to_recoverable() {
            Ok(recoverable) => match recover_account(&digest, &recoverable) {
                Ok(recovered) => recovered == self.unsigned.from,
                Err(_) => false,
            },
            Err(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Signature encoding
// ---------------------------------------------------------------------------

/// A fixed-length (65-byte) recoverable ECDSA signature: 64 bytes of
/// `(r, s)` followed by a one-byte recovery id. Textual form is lowercase
/// hex, matching the `"<hexN>"` shape in `spec.md` §6.
#[derive(Clone, PartialEq, Eq)]
pub struct SignatureBytes([u8; 65]);

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("signature must decode to 65 bytes, got {0}")]
    WrongLength(usize),
    #[error("invalid hex in signature: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("invalid recovery id byte: {0}")]
    InvalidRecoveryId(u8),
}

impl SignatureBytes {
    pub fn from_recoverable(signature: &RecoverableSignature) -> Self {
        let (recovery_id, compact) = signature.serialize_compact();
        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&compact);
        bytes[64] = recovery_id.to_i32() as u8;
        SignatureBytes(bytes)
    }

    pub fn to_recoverable(&self) -> Result<RecoverableSignature, SignatureError> {
        let recovery_id = RecoveryId::from_i32(self.0[64] as i32)
            .map_err(|_| SignatureError::InvalidRecoveryId(self.0[64]))?;
        let mut compact = [0u8; 64];
        compact.copy_from_slice(&self.0[..64]);
        RecoverableSignature::from_compact(&compact, recovery_id)
            .map_err(|_| SignatureError::InvalidRecoveryId(self.0[64]))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureBytes({})", self.to_hex())
    }
}

impl FromStr for SignatureBytes {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = hex::decode(s)?;
        if decoded.len() != 65 {
            return Err(SignatureError::WrongLength(decoded.len()));
        }
        let mut out = [0u8; 65];
        out.copy_from_slice(&decoded);
        Ok(SignatureBytes(out))
    }
}

impl Serialize for SignatureBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SignatureBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        SignatureBytes::from_str(&s).map_err(DeError::custom)
    }
}
