//! Bech32 account and validator-operator addresses

use bech32::primitives::decode::{CheckedHrpstring, CheckedHrpstringError};
use bech32::{Bech32, Hrp};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Number of raw bytes behind every address
pub const ADDRESS_LEN: usize = 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Raw payload was not exactly 20 bytes
    #[error("invalid address length: expected {ADDRESS_LEN} bytes, got {0}")]
    InvalidLength(usize),

    /// The checksum did not match the prefix and payload
    #[error("invalid address checksum")]
    InvalidChecksum,

    /// Missing separator, empty or malformed prefix, or disallowed characters
    #[error("invalid address format: {0}")]
    InvalidFormat(String),
}

/// A chain address: 20 raw bytes displayed under a bech32 prefix.
///
/// The prefix selects the namespace (account vs. validator-operator);
/// equality and hashing consider only the raw bytes, so the same key
/// re-encoded under another prefix compares equal.
#[derive(Clone, Debug, Eq)]
pub struct Address {
    bytes: [u8; ADDRESS_LEN],
    prefix: String,
}

impl Address {
    /// Construct from raw bytes and a bech32 prefix
    pub fn from_bytes(bytes: &[u8], prefix: &str) -> Result<Self, AddressError> {
        let bytes: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self {
            bytes,
            prefix: validate_prefix(prefix)?,
        })
    }

    /// Derive an address from a public key using the standard derivation
    /// ripemd160(sha256(pubkey_bytes))
    pub fn from_pubkey(pubkey_bytes: &[u8], prefix: &str) -> Result<Self, AddressError> {
        let sha256_hash = Sha256::digest(pubkey_bytes);
        let ripemd160_hash = Ripemd160::digest(sha256_hash);
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&ripemd160_hash);
        Ok(Self {
            bytes,
            prefix: validate_prefix(prefix)?,
        })
    }

    /// Parse from a bech32 string; decoding is case-insensitive
    pub fn from_bech32(s: &str) -> Result<Self, AddressError> {
        let checked = CheckedHrpstring::new::<Bech32>(s).map_err(|e| match e {
            CheckedHrpstringError::Checksum(_) => AddressError::InvalidChecksum,
            other => AddressError::InvalidFormat(other.to_string()),
        })?;

        let prefix = checked.hrp().to_lowercase();
        let data: Vec<u8> = checked.byte_iter().collect();
        let bytes: [u8; ADDRESS_LEN] = data
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength(data.len()))?;

        Ok(Self { bytes, prefix })
    }

    /// Re-encode the same raw bytes under a different prefix, e.g. to
    /// derive the validator-operator form of an account address
    pub fn with_prefix(&self, prefix: &str) -> Result<Self, AddressError> {
        Ok(Self {
            bytes: self.bytes,
            prefix: validate_prefix(prefix)?,
        })
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.bytes
    }

    /// Get the bech32 prefix this address displays under
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

// Prefixes are stored lower-case and validated once at construction so
// that Display can encode infallibly.
fn validate_prefix(prefix: &str) -> Result<String, AddressError> {
    Hrp::parse(prefix)
        .map_err(|e| AddressError::InvalidFormat(format!("invalid prefix {prefix:?}: {e}")))?;
    Ok(prefix.to_lowercase())
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hrp = Hrp::parse(&self.prefix).expect("prefix validated at construction");
        let encoded = bech32::encode::<Bech32>(hrp, &self.bytes)
            .expect("20-byte payload is always encodable");
        write!(f, "{encoded}")
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bech32(s)
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl serde::Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_bech32(&s).map_err(serde::de::Error::custom)
    }
}
