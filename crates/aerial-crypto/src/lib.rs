//! Cryptographic primitives for the aerial client toolkit.
//!
//! Account keys are secp256k1, signatures are deterministic ECDSA
//! (RFC 6979) in the 64-byte compact form the chain verifies, built on
//! well-audited implementations from the RustCrypto project.

pub mod keys;

pub use keys::{KeyError, PrivateKey, PublicKey, COMPRESSED_PUBKEY_LEN, PRIVATE_KEY_LEN};
