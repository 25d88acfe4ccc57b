//! Local wallet for the aerial client toolkit.
//!
//! A `LocalWallet` holds one secp256k1 key in process memory and derives
//! its chain address once at construction. Key persistence is the
//! caller's concern; the wallet only deals in raw 32-byte scalars and
//! BIP-39 mnemonics.

pub mod hd;

use aerial_crypto::{KeyError, PrivateKey, PublicKey};
use aerial_types::{Address, AddressError};
use thiserror::Error;

pub use hd::DerivationPath;

/// Default bech32 prefix for account addresses
pub const DEFAULT_PREFIX: &str = "kii";

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("invalid mnemonic phrase")]
    InvalidMnemonic,

    #[error("key derivation failed: {0}")]
    Derivation(String),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Address(#[from] AddressError),
}

/// An in-memory wallet around a single private key
#[derive(Debug, Clone)]
pub struct LocalWallet {
    private_key: PrivateKey,
    prefix: String,
    address: Address,
}

impl LocalWallet {
    /// Wrap an existing private key
    pub fn new(private_key: PrivateKey, prefix: &str) -> Result<Self, WalletError> {
        let address = private_key.address(prefix)?;
        Ok(Self {
            private_key,
            prefix: prefix.to_string(),
            address,
        })
    }

    /// Generate a wallet from fresh randomness
    pub fn generate(prefix: &str) -> Result<Self, WalletError> {
        Self::new(PrivateKey::generate(), prefix)
    }

    /// Generate a wallet together with its 24-word recovery phrase
    pub fn generate_with_mnemonic(prefix: &str) -> Result<(Self, String), WalletError> {
        let mnemonic = hd::generate_mnemonic()?.to_string();
        let wallet = Self::from_mnemonic(&mnemonic, prefix)?;
        Ok((wallet, mnemonic))
    }

    /// Import a wallet from a raw 32-byte private scalar
    pub fn from_bytes(bytes: &[u8], prefix: &str) -> Result<Self, WalletError> {
        Self::new(PrivateKey::from_bytes(bytes)?, prefix)
    }

    /// Recover a wallet from a BIP-39 mnemonic using the standard
    /// Cosmos derivation path
    pub fn from_mnemonic(phrase: &str, prefix: &str) -> Result<Self, WalletError> {
        Self::new(hd::derive_private_key_from_mnemonic(phrase, None)?, prefix)
    }

    /// Recover a wallet from a mnemonic using a custom derivation path
    pub fn from_mnemonic_with_path(
        phrase: &str,
        path: &DerivationPath,
        prefix: &str,
    ) -> Result<Self, WalletError> {
        Self::new(
            hd::derive_private_key_from_mnemonic(phrase, Some(path))?,
            prefix,
        )
    }

    /// The wallet's account address
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The wallet's public key
    pub fn public_key(&self) -> &PublicKey {
        self.private_key.public_key()
    }

    /// The wallet's signing key
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// The bech32 prefix this wallet was created with
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Sign a payload with the wallet key
    pub fn sign(&self, payload: &[u8]) -> Vec<u8> {
        self.private_key.sign(payload)
    }
}
