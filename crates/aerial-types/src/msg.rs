//! Message trait and the bank send message

use crate::address::Address;
use crate::tx::{CoinProto, TxMessage};
use aerial_math::{Coin, Coins, Int};
use prost::Message;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MsgError {
    #[error("invalid message: {0}")]
    Invalid(String),

    #[error("failed to decode message: {0}")]
    Decode(String),
}

/// Contract for messages a transaction can carry.
///
/// Message kinds this crate does not model can still enter a
/// transaction as raw `(type_url, bytes)` payloads.
pub trait ChainMsg: Send + Sync {
    /// Get the protobuf type URL (e.g., "/cosmos.bank.v1beta1.MsgSend")
    fn type_url(&self) -> &'static str;

    /// Perform stateless validation
    fn validate_basic(&self) -> Result<(), MsgError>;

    /// Encode the message to protobuf bytes
    fn encode(&self) -> Vec<u8>;

    /// Package the message as a type URL + bytes pair
    fn to_any(&self) -> TxMessage {
        TxMessage {
            type_url: self.type_url().to_string(),
            value: self.encode(),
        }
    }
}

/// Internal protobuf representation of MsgSend
#[derive(Clone, PartialEq, Message)]
struct MsgSendProto {
    #[prost(string, tag = "1")]
    pub from_address: String,
    #[prost(string, tag = "2")]
    pub to_address: String,
    #[prost(message, repeated, tag = "3")]
    pub amount: Vec<CoinProto>,
}

/// MsgSend moves coins from one account to another
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MsgSend {
    /// The sender's address
    pub from_address: Address,
    /// The recipient's address
    pub to_address: Address,
    /// The amount to send
    pub amount: Coins,
}

impl MsgSend {
    pub const TYPE_URL: &'static str = "/cosmos.bank.v1beta1.MsgSend";

    /// Create a new MsgSend
    pub fn new(from_address: Address, to_address: Address, amount: Coins) -> Self {
        Self {
            from_address,
            to_address,
            amount,
        }
    }

    /// Decode from protobuf bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, MsgError> {
        let proto = MsgSendProto::decode(bytes).map_err(|e| MsgError::Decode(e.to_string()))?;

        let mut amount = Coins::empty();
        for coin in proto.amount {
            let parsed = Int::from_str(&coin.amount)
                .map_err(|_| MsgError::Decode(format!("invalid coin amount:: {}", coin.amount)))?;
            amount.push(
                Coin::new(coin.denom, parsed).map_err(|e| MsgError::Decode(e.to_string()))?,
            );
        }

        Ok(Self {
            from_address: proto
                .from_address
                .parse()
                .map_err(|e: crate::AddressError| MsgError::Decode(e.to_string()))?,
            to_address: proto
                .to_address
                .parse()
                .map_err(|e: crate::AddressError| MsgError::Decode(e.to_string()))?,
            amount,
        })
    }
}

impl ChainMsg for MsgSend {
    fn type_url(&self) -> &'static str {
        Self::TYPE_URL
    }

    fn validate_basic(&self) -> Result<(), MsgError> {
        if self.amount.is_empty() {
            return Err(MsgError::Invalid("amount cannot be empty".to_string()));
        }

        for coin in self.amount.as_slice() {
            if coin.is_zero() {
                return Err(MsgError::Invalid(format!(
                    "amount cannot be zero for denom {}",
                    coin.denom
                )));
            }
        }

        Ok(())
    }

    fn encode(&self) -> Vec<u8> {
        let proto = MsgSendProto {
            from_address: self.from_address.to_string(),
            to_address: self.to_address.to_string(),
            amount: self
                .amount
                .iter()
                .map(|coin| CoinProto {
                    denom: coin.denom.clone(),
                    amount: coin.amount.to_string(),
                })
                .collect(),
        };

        proto.encode_to_vec()
    }
}
