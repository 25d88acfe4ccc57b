//! Transaction envelope types and their protobuf wire representation

use prost::Message;
use serde::{Deserialize, Serialize};

/// Transaction codec error types
#[derive(Debug, thiserror::Error)]
pub enum TxCodecError {
    /// Failed to decode protobuf
    #[error("protobuf decode error: {0}")]
    Protobuf(String),

    /// Missing required fields
    #[error("missing required field: {0}")]
    MissingField(String),
}

/// Transaction body containing messages and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxBody {
    /// Messages in the transaction
    pub messages: Vec<TxMessage>,
    /// Transaction memo
    pub memo: String,
    /// Timeout height for the transaction
    pub timeout_height: u64,
}

/// An opaque message payload: protobuf type URL plus encoded bytes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxMessage {
    /// Type URL for the message
    pub type_url: String,
    /// Encoded message data
    pub value: Vec<u8>,
}

/// Authentication info for a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthInfo {
    /// Signer information
    pub signer_infos: Vec<SignerInfo>,
    /// Fee information
    pub fee: Fee,
}

/// Signer information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignerInfo {
    /// Public key, as a type URL + bytes pair
    pub public_key: Option<TxMessage>,
    /// Mode info
    pub mode_info: ModeInfo,
    /// Sequence number
    pub sequence: u64,
}

/// Signing mode info
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeInfo {
    /// Single signer mode
    pub single: Option<ModeInfoSingle>,
}

/// Single signer mode info
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeInfoSingle {
    /// Signing mode
    pub mode: u32,
}

/// Fee information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fee {
    /// Fee amounts
    pub amount: Vec<FeeAmount>,
    /// Gas limit
    pub gas_limit: u64,
    /// Payer address
    pub payer: String,
    /// Granter address
    pub granter: String,
}

/// Fee amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeAmount {
    /// Denomination
    pub denom: String,
    /// Amount
    pub amount: String,
}

/// A transaction envelope: body, auth info and any attached signatures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxEnvelope {
    /// Transaction body
    pub body: TxBody,
    /// Authentication info
    pub auth_info: AuthInfo,
    /// Signatures
    pub signatures: Vec<Vec<u8>>,
}

impl TxBody {
    /// Canonical protobuf encoding of the body
    pub fn to_proto_bytes(&self) -> Vec<u8> {
        TxBodyProto::from(self).encode_to_vec()
    }
}

impl AuthInfo {
    /// Canonical protobuf encoding of the auth info
    pub fn to_proto_bytes(&self) -> Vec<u8> {
        AuthInfoProto::from(self).encode_to_vec()
    }
}

impl TxEnvelope {
    /// Encode the envelope to its wire form
    pub fn to_bytes(&self) -> Vec<u8> {
        let proto = TxProto {
            body: Some(TxBodyProto::from(&self.body)),
            auth_info: Some(AuthInfoProto::from(&self.auth_info)),
            signatures: self.signatures.clone(),
        };
        proto.encode_to_vec()
    }

    /// Decode an envelope from its wire form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TxCodecError> {
        let proto = TxProto::decode(bytes).map_err(|e| TxCodecError::Protobuf(e.to_string()))?;

        let body_proto = proto
            .body
            .ok_or_else(|| TxCodecError::MissingField("body".to_string()))?;
        let body = TxBody {
            messages: body_proto
                .messages
                .into_iter()
                .map(|any| TxMessage {
                    type_url: any.type_url,
                    value: any.value,
                })
                .collect(),
            memo: body_proto.memo,
            timeout_height: body_proto.timeout_height,
        };

        let auth_proto = proto
            .auth_info
            .ok_or_else(|| TxCodecError::MissingField("auth_info".to_string()))?;
        let auth_info = AuthInfo {
            signer_infos: auth_proto
                .signer_infos
                .into_iter()
                .map(|signer| SignerInfo {
                    public_key: signer.public_key.map(|any| TxMessage {
                        type_url: any.type_url,
                        value: any.value,
                    }),
                    mode_info: ModeInfo {
                        single: signer.mode_info.and_then(|mi| mi.sum).map(
                            |mode_info_proto::Sum::Single(single)| ModeInfoSingle {
                                mode: single.mode as u32,
                            },
                        ),
                    },
                    sequence: signer.sequence,
                })
                .collect(),
            fee: auth_proto
                .fee
                .map(|fee| Fee {
                    amount: fee
                        .amount
                        .into_iter()
                        .map(|coin| FeeAmount {
                            denom: coin.denom,
                            amount: coin.amount,
                        })
                        .collect(),
                    gas_limit: fee.gas_limit,
                    payer: fee.payer,
                    granter: fee.granter,
                })
                .ok_or_else(|| TxCodecError::MissingField("fee".to_string()))?,
        };

        Ok(Self {
            body,
            auth_info,
            signatures: proto.signatures,
        })
    }
}

/// Canonical sign bytes for SIGN_MODE_DIRECT: the protobuf encoding of
/// the sign document over the already-encoded body and auth info.
/// Identical inputs always yield byte-identical output.
pub fn sign_doc_bytes(
    body_bytes: Vec<u8>,
    auth_info_bytes: Vec<u8>,
    chain_id: &str,
    account_number: u64,
) -> Vec<u8> {
    SignDocProto {
        body_bytes,
        auth_info_bytes,
        chain_id: chain_id.to_string(),
        account_number,
    }
    .encode_to_vec()
}

// Protobuf wire representations

/// Protobuf `Any`: type URL plus serialized value
#[derive(Clone, PartialEq, Message)]
pub struct AnyProto {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

/// Protobuf representation of a complete transaction
#[derive(Clone, PartialEq, Message)]
struct TxProto {
    #[prost(message, optional, tag = "1")]
    pub body: Option<TxBodyProto>,
    #[prost(message, optional, tag = "2")]
    pub auth_info: Option<AuthInfoProto>,
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub signatures: Vec<Vec<u8>>,
}

/// Protobuf representation of transaction body
#[derive(Clone, PartialEq, Message)]
pub struct TxBodyProto {
    #[prost(message, repeated, tag = "1")]
    pub messages: Vec<AnyProto>,
    #[prost(string, tag = "2")]
    pub memo: String,
    #[prost(uint64, tag = "3")]
    pub timeout_height: u64,
}

/// Protobuf representation of auth info
#[derive(Clone, PartialEq, Message)]
pub struct AuthInfoProto {
    #[prost(message, repeated, tag = "1")]
    pub signer_infos: Vec<SignerInfoProto>,
    #[prost(message, optional, tag = "2")]
    pub fee: Option<FeeProto>,
}

/// Protobuf representation of signer info
#[derive(Clone, PartialEq, Message)]
pub struct SignerInfoProto {
    #[prost(message, optional, tag = "1")]
    pub public_key: Option<AnyProto>,
    #[prost(message, optional, tag = "2")]
    pub mode_info: Option<ModeInfoProto>,
    #[prost(uint64, tag = "3")]
    pub sequence: u64,
}

/// Protobuf representation of mode info
#[derive(Clone, PartialEq, Message)]
pub struct ModeInfoProto {
    #[prost(oneof = "mode_info_proto::Sum", tags = "1")]
    pub sum: Option<mode_info_proto::Sum>,
}

/// Nested module for mode info variants
mod mode_info_proto {
    use super::*;

    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Sum {
        #[prost(message, tag = "1")]
        Single(ModeInfoSingleProto),
    }
}

/// Protobuf representation of single mode info
#[derive(Clone, PartialEq, Message)]
pub struct ModeInfoSingleProto {
    #[prost(enumeration = "SignMode", tag = "1")]
    pub mode: i32,
}

/// Protobuf representation of fee
#[derive(Clone, PartialEq, Message)]
pub struct FeeProto {
    #[prost(message, repeated, tag = "1")]
    pub amount: Vec<CoinProto>,
    #[prost(uint64, tag = "2")]
    pub gas_limit: u64,
    #[prost(string, tag = "3")]
    pub payer: String,
    #[prost(string, tag = "4")]
    pub granter: String,
}

/// Protobuf representation of coin
#[derive(Clone, PartialEq, Message)]
pub struct CoinProto {
    #[prost(string, tag = "1")]
    pub denom: String,
    #[prost(string, tag = "2")]
    pub amount: String,
}

/// Protobuf representation of the SIGN_MODE_DIRECT sign document
#[derive(Clone, PartialEq, Message)]
pub struct SignDocProto {
    #[prost(bytes = "vec", tag = "1")]
    pub body_bytes: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub auth_info_bytes: Vec<u8>,
    #[prost(string, tag = "3")]
    pub chain_id: String,
    #[prost(uint64, tag = "4")]
    pub account_number: u64,
}

/// Sign mode enumeration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum SignMode {
    Unspecified = 0,
    Direct = 1,
    Textual = 2,
    LegacyAminoJson = 127,
}

// Conversions between envelope types and protobuf types

impl From<&TxBody> for TxBodyProto {
    fn from(body: &TxBody) -> Self {
        Self {
            messages: body
                .messages
                .iter()
                .map(|msg| AnyProto {
                    type_url: msg.type_url.clone(),
                    value: msg.value.clone(),
                })
                .collect(),
            memo: body.memo.clone(),
            timeout_height: body.timeout_height,
        }
    }
}

impl From<&AuthInfo> for AuthInfoProto {
    fn from(auth_info: &AuthInfo) -> Self {
        Self {
            signer_infos: auth_info
                .signer_infos
                .iter()
                .map(|info| SignerInfoProto {
                    public_key: info.public_key.as_ref().map(|pk| AnyProto {
                        type_url: pk.type_url.clone(),
                        value: pk.value.clone(),
                    }),
                    mode_info: info.mode_info.single.as_ref().map(|single| ModeInfoProto {
                        sum: Some(mode_info_proto::Sum::Single(ModeInfoSingleProto {
                            mode: single.mode as i32,
                        })),
                    }),
                    sequence: info.sequence,
                })
                .collect(),
            fee: Some(FeeProto {
                amount: auth_info
                    .fee
                    .amount
                    .iter()
                    .map(|fee_amount| CoinProto {
                        denom: fee_amount.denom.clone(),
                        amount: fee_amount.amount.clone(),
                    })
                    .collect(),
                gas_limit: auth_info.fee.gas_limit,
                payer: auth_info.fee.payer.clone(),
                granter: auth_info.fee.granter.clone(),
            }),
        }
    }
}
