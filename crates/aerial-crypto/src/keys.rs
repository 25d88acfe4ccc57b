//! secp256k1 key types and signing

use aerial_types::{Address, AddressError};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::RngCore;
use signature::{Signer, Verifier};
use std::fmt;
use thiserror::Error;

/// Length of a raw private scalar
pub const PRIVATE_KEY_LEN: usize = 32;

/// Length of a compressed public key point
pub const COMPRESSED_PUBKEY_LEN: usize = 33;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Raw key material was not exactly 32 bytes
    #[error("invalid key length: expected {PRIVATE_KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    /// Bytes did not form a valid curve element
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// Signature failed to parse or verify
    #[error("signature verification failed")]
    InvalidSignature,
}

/// A secp256k1 public key with its cached compressed encoding
#[derive(Clone)]
pub struct PublicKey {
    verifying_key: VerifyingKey,
    compressed: [u8; COMPRESSED_PUBKEY_LEN],
}

/// A secp256k1 private scalar with its derived public key.
///
/// The underlying signing key zeroizes its material on drop. Debug
/// output never includes key bytes.
#[derive(Clone)]
pub struct PrivateKey {
    signing_key: SigningKey,
    public_key: PublicKey,
}

impl PublicKey {
    /// Parse a compressed (or uncompressed) SEC1 public key
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(bytes).map_err(|e| KeyError::InvalidKey(e.to_string()))?;
        Ok(Self::from_verifying_key(verifying_key))
    }

    fn from_verifying_key(verifying_key: VerifyingKey) -> Self {
        let point = verifying_key.to_encoded_point(true);
        let mut compressed = [0u8; COMPRESSED_PUBKEY_LEN];
        compressed.copy_from_slice(point.as_bytes());
        Self {
            verifying_key,
            compressed,
        }
    }

    /// The compressed 33-byte point
    pub fn to_bytes(&self) -> &[u8; COMPRESSED_PUBKEY_LEN] {
        &self.compressed
    }

    /// Derive the chain address for this key under the given prefix
    pub fn address(&self, prefix: &str) -> Result<Address, AddressError> {
        Address::from_pubkey(&self.compressed, prefix)
    }

    /// Get the protobuf type URL for this key type
    pub fn type_url(&self) -> &'static str {
        "/cosmos.crypto.secp256k1.PubKey"
    }

    /// Verify a 64-byte compact signature over a payload.
    ///
    /// The payload is hashed with SHA-256, mirroring `PrivateKey::sign`.
    pub fn verify(&self, payload: &[u8], signature: &[u8]) -> Result<(), KeyError> {
        let sig = Signature::from_slice(signature).map_err(|_| KeyError::InvalidSignature)?;
        self.verifying_key
            .verify(payload, &sig)
            .map_err(|_| KeyError::InvalidSignature)
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.compressed == other.compressed
    }
}

impl Eq for PublicKey {}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("compressed", &hex_lower(&self.compressed))
            .finish()
    }
}

impl PrivateKey {
    /// Generate a fresh key from cryptographically secure randomness
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let mut bytes = [0u8; PRIVATE_KEY_LEN];
            rng.fill_bytes(&mut bytes);
            // from_bytes only rejects zero or >= curve order, which
            // random bytes hit with negligible probability
            if let Ok(key) = Self::from_bytes(&bytes) {
                return key;
            }
        }
    }

    /// Import a key from its raw 32-byte scalar
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != PRIVATE_KEY_LEN {
            return Err(KeyError::InvalidKeyLength(bytes.len()));
        }
        let signing_key =
            SigningKey::from_slice(bytes).map_err(|e| KeyError::InvalidKey(e.to_string()))?;
        let public_key = PublicKey::from_verifying_key(*signing_key.verifying_key());
        Ok(Self {
            signing_key,
            public_key,
        })
    }

    /// Export the raw 32-byte scalar
    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_LEN] {
        let bytes = self.signing_key.to_bytes();
        let mut out = [0u8; PRIVATE_KEY_LEN];
        out.copy_from_slice(bytes.as_slice());
        out
    }

    /// Get the corresponding public key
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Derive the chain address for this key under the given prefix
    pub fn address(&self, prefix: &str) -> Result<Address, AddressError> {
        self.public_key.address(prefix)
    }

    /// Sign a payload, returning the 64-byte compact `r || s` signature.
    ///
    /// The payload is hashed with SHA-256 and signed with an RFC 6979
    /// nonce derived from the key and message, so the same key and
    /// payload always yield the same signature.
    pub fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(payload);
        signature.to_bytes().as_slice().to_vec()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
