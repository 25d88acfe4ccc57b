//! Hierarchical Deterministic (HD) wallet support
//!
//! BIP-32/BIP-44 key derivation following Cosmos SDK conventions.
//! Standard derivation path: m/44'/118'/0'/0/0
//!
//! Reference: https://github.com/bitcoin/bips/blob/master/bip-0032.mediawiki
//!            https://github.com/bitcoin/bips/blob/master/bip-0044.mediawiki

use crate::WalletError;
use aerial_crypto::PrivateKey;
use bip39::{Language, Mnemonic};
use hmac::{Hmac, Mac};
use k256::ecdsa::SigningKey as Secp256k1PrivKey;
use k256::Scalar;
use sha2::Sha512;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha512 = Hmac<Sha512>;

/// Cosmos SDK coin type as defined in SLIP-0044
pub const COSMOS_COIN_TYPE: u32 = 118;

/// Standard Cosmos HD derivation path
pub const COSMOS_HD_PATH: &str = "m/44'/118'/0'/0/0";

const HARDENED_OFFSET: u32 = 1 << 31;

/// HD derivation path component
#[derive(Debug, Clone, Copy)]
pub struct PathComponent {
    /// Index value, including the hardened offset where applicable
    pub index: u32,
    /// Whether this is a hardened derivation
    pub hardened: bool,
}

/// HD derivation path
#[derive(Debug, Clone)]
pub struct DerivationPath {
    components: Vec<PathComponent>,
}

impl DerivationPath {
    /// Parse a derivation path string (e.g., "m/44'/118'/0'/0/0")
    pub fn parse(path: &str) -> Result<Self, WalletError> {
        if !path.starts_with("m/") && !path.starts_with("M/") {
            return Err(WalletError::Derivation(
                "derivation path must start with 'm/'".to_string(),
            ));
        }

        let path = &path[2..];
        let mut components = Vec::new();
        for component in path.split('/') {
            if component.is_empty() {
                continue;
            }

            let (index_str, hardened) = if component.ends_with('\'') || component.ends_with('h') {
                (&component[..component.len() - 1], true)
            } else {
                (component, false)
            };

            let index = index_str.parse::<u32>().map_err(|_| {
                WalletError::Derivation(format!("invalid path component:: {component}"))
            })?;

            if index >= HARDENED_OFFSET {
                return Err(WalletError::Derivation(format!(
                    "path index out of range:: {component}"
                )));
            }

            components.push(PathComponent {
                index: if hardened {
                    index + HARDENED_OFFSET
                } else {
                    index
                },
                hardened,
            });
        }

        Ok(DerivationPath { components })
    }

    /// The standard Cosmos derivation path
    pub fn cosmos_default() -> Self {
        Self::parse(COSMOS_HD_PATH).expect("constant path parses")
    }

    /// A Cosmos path with custom account and address indices
    pub fn cosmos_custom(account: u32, address_index: u32) -> Result<Self, WalletError> {
        Self::parse(&format!("m/44'/{COSMOS_COIN_TYPE}'/{account}'/0/{address_index}"))
    }

    /// Get the components of this path
    pub fn components(&self) -> &[PathComponent] {
        &self.components
    }
}

/// Extended private key for BIP-32 derivation
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ExtendedPrivateKey {
    /// The private key (32 bytes)
    private_key: [u8; 32],
    /// Chain code (32 bytes) for child key derivation
    chain_code: [u8; 32],
    /// Depth in the derivation tree
    #[zeroize(skip)]
    depth: u8,
}

impl ExtendedPrivateKey {
    /// Create the master key from a seed (root of the HD tree)
    pub fn from_seed(seed: &[u8]) -> Result<Self, WalletError> {
        if seed.len() < 16 || seed.len() > 64 {
            return Err(WalletError::Derivation(
                "seed must be between 16 and 64 bytes".to_string(),
            ));
        }

        // HMAC-SHA512 keyed with "Bitcoin seed" per BIP-32
        let mut mac = HmacSha512::new_from_slice(b"Bitcoin seed")
            .map_err(|_| WalletError::Derivation("failed to create HMAC".to_string()))?;
        mac.update(seed);
        let result = mac.finalize().into_bytes();

        let mut private_key = [0u8; 32];
        let mut chain_code = [0u8; 32];
        private_key.copy_from_slice(&result[..32]);
        chain_code.copy_from_slice(&result[32..]);

        if Secp256k1PrivKey::from_slice(&private_key).is_err() {
            return Err(WalletError::Derivation(
                "master key is invalid for secp256k1".to_string(),
            ));
        }

        Ok(ExtendedPrivateKey {
            private_key,
            chain_code,
            depth: 0,
        })
    }

    /// Derive a child key at the given index
    pub fn derive_child(&self, index: u32) -> Result<ExtendedPrivateKey, WalletError> {
        let hardened = index >= HARDENED_OFFSET;

        let mut mac = HmacSha512::new_from_slice(&self.chain_code)
            .map_err(|_| WalletError::Derivation("failed to create HMAC".to_string()))?;

        if hardened {
            // Hardened derivation: HMAC(chain_code, 0x00 || private_key || index)
            mac.update(&[0x00]);
            mac.update(&self.private_key);
        } else {
            // Non-hardened derivation: HMAC(chain_code, public_key || index)
            let private_key = Secp256k1PrivKey::from_slice(&self.private_key)
                .map_err(|_| WalletError::Derivation("invalid parent key".to_string()))?;
            let public_key = private_key.verifying_key().to_encoded_point(true);
            mac.update(public_key.as_bytes());
        }

        mac.update(&index.to_be_bytes());
        let result = mac.finalize().into_bytes();

        let mut tweak = [0u8; 32];
        let mut new_chain_code = [0u8; 32];
        tweak.copy_from_slice(&result[..32]);
        new_chain_code.copy_from_slice(&result[32..]);

        // child = (parse256(IL) + parent) mod n; parse256(IL) must itself
        // be a valid scalar per BIP-32
        let tweak_key = Secp256k1PrivKey::from_slice(&tweak).map_err(|_| {
            WalletError::Derivation("child derivation produced an invalid tweak".to_string())
        })?;
        let parent_key = Secp256k1PrivKey::from_slice(&self.private_key)
            .map_err(|_| WalletError::Derivation("invalid parent key".to_string()))?;

        let tweak_scalar: &Scalar = tweak_key.as_nonzero_scalar().as_ref();
        let parent_scalar: &Scalar = parent_key.as_nonzero_scalar().as_ref();
        let child_scalar = *tweak_scalar + *parent_scalar;
        let child_bytes = child_scalar.to_bytes();
        if Secp256k1PrivKey::from_slice(child_bytes.as_slice()).is_err() {
            return Err(WalletError::Derivation(
                "child derivation produced an invalid key".to_string(),
            ));
        }

        let mut new_private_key = [0u8; 32];
        new_private_key.copy_from_slice(child_bytes.as_slice());

        Ok(ExtendedPrivateKey {
            private_key: new_private_key,
            chain_code: new_chain_code,
            depth: self.depth + 1,
        })
    }

    /// Derive a key following a full derivation path
    pub fn derive_path(&self, path: &DerivationPath) -> Result<ExtendedPrivateKey, WalletError> {
        let mut current = self.clone();
        for component in path.components() {
            current = current.derive_child(component.index)?;
        }
        Ok(current)
    }

    /// Depth of this key in the derivation tree
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Convert to a signing private key
    pub fn private_key(&self) -> Result<PrivateKey, WalletError> {
        Ok(PrivateKey::from_bytes(&self.private_key)?)
    }
}

/// Derive a private key from a mnemonic, using the standard Cosmos path
/// unless another is given
pub fn derive_private_key_from_mnemonic(
    mnemonic: &str,
    path: Option<&DerivationPath>,
) -> Result<PrivateKey, WalletError> {
    let mnemonic =
        Mnemonic::parse_in(Language::English, mnemonic).map_err(|_| WalletError::InvalidMnemonic)?;

    // Seed from mnemonic with an empty passphrase
    let seed = mnemonic.to_seed("");
    let master_key = ExtendedPrivateKey::from_seed(&seed)?;

    let default_path = DerivationPath::cosmos_default();
    let derivation_path = path.unwrap_or(&default_path);

    master_key.derive_path(derivation_path)?.private_key()
}

/// Generate a new random 24-word mnemonic phrase
pub fn generate_mnemonic() -> Result<Mnemonic, WalletError> {
    use rand::RngCore;
    let mut entropy = [0u8; 32]; // 256 bits = 24 words
    rand::thread_rng().fill_bytes(&mut entropy);

    Mnemonic::from_entropy(&entropy)
        .map_err(|_| WalletError::Derivation("failed to generate mnemonic".to_string()))
}

/// Validate a mnemonic phrase
pub fn validate_mnemonic(mnemonic: &str) -> Result<(), WalletError> {
    Mnemonic::parse_in(Language::English, mnemonic).map_err(|_| WalletError::InvalidMnemonic)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_derivation_path_parsing() {
        let path = DerivationPath::parse(COSMOS_HD_PATH).unwrap();
        let components = path.components();
        assert_eq!(components.len(), 5);
        assert_eq!(components[0].index, 44 + HARDENED_OFFSET);
        assert_eq!(components[1].index, 118 + HARDENED_OFFSET);
        assert_eq!(components[2].index, HARDENED_OFFSET);
        assert!(!components[3].hardened);
        assert_eq!(components[4].index, 0);

        let custom = DerivationPath::cosmos_custom(1, 5).unwrap();
        assert_eq!(custom.components()[2].index, 1 + HARDENED_OFFSET);
        assert_eq!(custom.components()[4].index, 5);
    }

    #[test]
    fn test_derivation_path_parsing_errors() {
        assert!(DerivationPath::parse("44'/118'/0'/0/0").is_err());
        assert!(DerivationPath::parse("m/44'/abc'/0'/0/0").is_err());
        assert!(DerivationPath::parse("m/2147483648/0").is_err());
    }

    #[test]
    fn test_master_key_generation() {
        let master = ExtendedPrivateKey::from_seed(b"test seed for master key generation").unwrap();
        assert_eq!(master.depth(), 0);
        master.private_key().unwrap();

        assert!(ExtendedPrivateKey::from_seed(b"short").is_err());
    }

    #[test]
    fn test_child_key_derivation() {
        let master = ExtendedPrivateKey::from_seed(b"test seed for child key derivation").unwrap();

        let hardened = master.derive_child(HARDENED_OFFSET).unwrap();
        assert_eq!(hardened.depth(), 1);

        let normal = master.derive_child(0).unwrap();
        assert_eq!(normal.depth(), 1);

        assert_ne!(
            hardened.private_key().unwrap().to_bytes(),
            normal.private_key().unwrap().to_bytes()
        );
    }

    #[test]
    fn test_full_path_derivation() {
        let master = ExtendedPrivateKey::from_seed(b"test seed for full path derivation").unwrap();
        let derived = master.derive_path(&DerivationPath::cosmos_default()).unwrap();
        assert_eq!(derived.depth(), 5);
        derived.private_key().unwrap();
    }

    #[test]
    fn test_mnemonic_derivation_is_deterministic() {
        let key1 = derive_private_key_from_mnemonic(MNEMONIC, None).unwrap();
        let key2 = derive_private_key_from_mnemonic(MNEMONIC, None).unwrap();
        assert_eq!(key1.to_bytes(), key2.to_bytes());

        let custom = DerivationPath::cosmos_custom(1, 0).unwrap();
        let key3 = derive_private_key_from_mnemonic(MNEMONIC, Some(&custom)).unwrap();
        assert_ne!(key1.to_bytes(), key3.to_bytes());
    }

    #[test]
    fn test_mnemonic_generation() {
        let mnemonic = generate_mnemonic().unwrap();
        let phrase = mnemonic.to_string();
        assert_eq!(phrase.split_whitespace().count(), 24);
        validate_mnemonic(&phrase).unwrap();
        derive_private_key_from_mnemonic(&phrase, None).unwrap();
    }

    #[test]
    fn test_mnemonic_validation() {
        validate_mnemonic(MNEMONIC).unwrap();

        // wrong checksum
        assert!(validate_mnemonic(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon"
        )
        .is_err());

        // word outside the list
        assert!(validate_mnemonic(
            "zzzzzz abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about"
        )
        .is_err());
    }
}
