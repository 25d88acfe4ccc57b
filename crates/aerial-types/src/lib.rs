//! Address and transaction types for the aerial client toolkit.
//!
//! This crate holds the bech32 address codec, the transaction envelope
//! with its protobuf wire representation, and the message trait the
//! transaction builder consumes.

pub mod address;
pub mod msg;
pub mod tx;

pub use address::{Address, AddressError};
pub use msg::{ChainMsg, MsgError, MsgSend};
pub use tx::{
    AuthInfo, Fee, ModeInfo, ModeInfoSingle, SignMode, SignerInfo, TxBody, TxCodecError,
    TxEnvelope, TxMessage,
};
