//! # Accounts & Keys
//!
//! An `Account` is a 20-byte address derived from a secp256k1 public key,
//! the same way an Ethereum address is derived: Keccak-256 of the
//! uncompressed public key (minus its leading `0x04` prefix byte), keeping
//! the low 20 bytes.
//!
//! Signing itself — and the on-disk key store backing it — is treated as
//! an external collaborator by the core (see `spec.md` §6). `Keypair` and
//! `LocalKeystore` here are the minimal stand-in needed to make the CLI
//! and the test suite runnable end to end; they are not a production
//! secrets store.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rand::rngs::OsRng;
use secp256k1::{ecdsa::RecoverableSignature, Message, PublicKey, Secp256k1, SecretKey};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// A 20-byte account address. Textual form is lowercase hex with a `0x`
/// prefix. The sentinel is all zeros (the "empty" `from`/`to`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Account([u8; 20]);

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("account address must decode to 20 bytes, got {0}")]
    WrongLength(usize),
    #[error("invalid hex in account address: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("account address must start with 0x")]
    MissingPrefix,
}

impl Account {
    pub const LEN: usize = 20;

    /// The sentinel "empty" address — never a legitimate transaction
    /// counterparty.
    pub const EMPTY: Account = Account([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Account(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Derives the address belonging to a public key: Keccak-256 of the
    /// 64-byte uncompressed public key body (the serialized key minus its
    /// `0x04` prefix), keeping the low 20 bytes.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let uncompressed = public_key.serialize_uncompressed();
        debug_assert_eq!(uncompressed[0], 0x04);
        let body = &uncompressed[1..];

        let mut hasher = Keccak256::new();
        hasher.update(body);
        let digest = hasher.finalize();

        let mut out = [0u8; 20];
        out.copy_from_slice(&digest[12..]);
        Account(out)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Account({})", self.to_hex())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Account {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").ok_or(AccountError::MissingPrefix)?;
        let bytes = hex::decode(stripped)?;
        if bytes.len() != Account::LEN {
            return Err(AccountError::WrongLength(bytes.len()));
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Account(out))
    }
}

impl Serialize for Account {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Account {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Account::from_str(&s).map_err(DeError::custom)
    }
}

// ---------------------------------------------------------------------------
// Keypair
// ---------------------------------------------------------------------------

/// A secp256k1 keypair and the address it derives.
pub struct Keypair {
    secret_key: SecretKey,
    public_key: PublicKey,
    account: Account,
}

impl Keypair {
    /// Generates a fresh keypair using the OS RNG.
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        let account = Account::from_public_key(&public_key);
        Keypair {
            secret_key,
            public_key,
            account,
        }
    }

    /// Reconstructs a keypair from a 32-byte secret scalar.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, secp256k1::Error> {
        let secp = Secp256k1::new();
        let secret_key = SecretKey::from_slice(bytes)?;
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        let account = Account::from_public_key(&public_key);
        Ok(Keypair {
            secret_key,
            public_key,
            account,
        })
    }

    pub fn account(&self) -> Account {
        self.account
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret_key.secret_bytes()
    }

    /// Signs a 32-byte message digest, producing a recoverable signature.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> RecoverableSignature {
        let secp = Secp256k1::new();
        let message = Message::from_digest(*digest);
        secp.sign_ecdsa_recoverable(&message, &self.secret_key)
    }
}

/// Recovers the public key (and therefore the address) that produced a
/// recoverable signature over a given 32-byte digest.
pub fn recover_account(
    digest: &[u8; 32],
    signature: &RecoverableSignature,
) -> Result<Account, secp256k1::Error> {
    let secp = Secp256k1::new();
    let message = Message::from_digest(*digest);
    let public_key = secp.recover_ecdsa(&message, signature)?;
    Ok(Account::from_public_key(&public_key))
}

// ---------------------------------------------------------------------------
// Local keystore stand-in
// ---------------------------------------------------------------------------

/// Errors from the local keystore stand-in.
#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("keystore io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("keystore hex error: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("keystore key error: {0}")]
    Key(#[from] secp256k1::Error),
    #[error("no key file found for account {0}")]
    NotFound(Account),
}

/// A development stand-in for the keystore + signing-service interface
/// described in `spec.md` §6. Secret keys are stored as hex text under
/// `{dataDir}/keystore/{address}.key`, unencrypted. A real deployment is
/// expected to swap in an encrypted keystore behind the same shape.
pub struct LocalKeystore {
    keystore_dir: PathBuf,
}

impl LocalKeystore {
    pub fn new(keystore_dir: impl Into<PathBuf>) -> Self {
        LocalKeystore {
            keystore_dir: keystore_dir.into(),
        }
    }

    fn key_path(&self, account: Account) -> PathBuf {
        self.keystore_dir.join(format!("{}.key", account.to_hex()))
    }

    /// Generates a new keypair and persists its secret key. Returns the
    /// resulting account address.
    pub fn new_keystore_account(&self) -> Result<Account, KeystoreError> {
        fs::create_dir_all(&self.keystore_dir)?;
        let keypair = Keypair::generate();
        let path = self.key_path(keypair.account());
        fs::write(&path, hex::encode(keypair.secret_bytes()))?;
        Ok(keypair.account())
    }

    /// Loads the keypair previously persisted for `account`.
    pub fn load(&self, account: Account) -> Result<Keypair, KeystoreError> {
        let path = self.key_path(account);
        if !Path::new(&path).exists() {
            return Err(KeystoreError::NotFound(account));
        }
        let hex_secret = fs::read_to_string(&path)?;
        let bytes = hex::decode(hex_secret.trim())?;
        Ok(Keypair::from_secret_bytes(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_round_trips_through_hex() {
        let account = Keypair::generate().account();
        let text = account.to_hex();
        assert!(text.starts_with("0x"));
        let decoded: Account = text.parse().unwrap();
        assert_eq!(account, decoded);
    }

    #[test]
    fn empty_account_is_empty() {
        assert!(Account::EMPTY.is_empty());
    }

    #[test]
    fn missing_prefix_is_rejected() {
        let err = "aabbccddeeff00112233445566778899aabbccdd"
            .parse::<Account>()
            .unwrap_err();
        assert!(matches!(err, AccountError::MissingPrefix));
    }

    #[test]
    fn wrong_length_is_rejected() {
        let err = "0xaabb".parse::<Account>().unwrap_err();
        assert!(matches!(err, AccountError::WrongLength(_)));
    }

    #[test]
    fn sign_and_recover_round_trip() {
        let keypair = Keypair::generate();
        let digest = crate::hash::sha256(b"hello ledger").as_bytes().to_owned();
        let signature = keypair.sign_digest(&digest);
        let recovered = recover_account(&digest, &signature).unwrap();
        assert_eq!(recovered, keypair.account());
    }

    #[test]
    fn recovery_fails_for_wrong_signer() {
        let a = Keypair::generate();
        let b = Keypair::generate();
        let digest = crate::hash::sha256(b"hello ledger").as_bytes().to_owned();
        let signature = a.sign_digest(&digest);
        let recovered = recover_account(&digest, &signature).unwrap();
        assert_ne!(recovered, b.account());
    }

    #[test]
    fn keystore_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let keystore = LocalKeystore::new(dir.path());
        let account = keystore.new_keystore_account().unwrap();
        let loaded = keystore.load(account).unwrap();
        assert_eq!(loaded.account(), account);
    }

    #[test]
    fn keystore_rejects_unknown_account() {
        let dir = tempfile::tempdir().unwrap();
        let keystore = LocalKeystore::new(dir.path());
        let unknown = Keypair::generate().account();
        let err = keystore.load(unknown).unwrap_err();
        assert!(matches!(err, KeystoreError::NotFound(_)));
    }
}
