//! Transaction builder: envelope assembly, sign bytes, and signing

use aerial_crypto::PrivateKey;
use aerial_math::Coins;
use aerial_types::{
    tx::sign_doc_bytes, AuthInfo, ChainMsg, Fee, ModeInfo, ModeInfoSingle, MsgError, SignMode,
    SignerInfo, TxBody, TxEnvelope, TxMessage,
};
use prost::Message;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Gas limit used when the caller sets none
pub const DEFAULT_GAS_LIMIT: u64 = 200_000;

/// Transaction construction error types
#[derive(Error, Debug)]
pub enum TxError {
    #[error("no messages provided")]
    NoMessages,

    #[error("account number not set")]
    MissingAccountNumber,

    #[error("sequence not set")]
    MissingSequence,

    #[error(transparent)]
    Msg(#[from] MsgError),
}

/// Result of signing: the final wire bytes and their hash
#[derive(Debug, Clone)]
pub struct SignedTx {
    /// Envelope with the signature attached
    pub envelope: TxEnvelope,
    /// Encoded transaction, the unit handed to the network
    pub tx_bytes: Vec<u8>,
    /// Upper-case hex transaction hash
    pub tx_hash: String,
}

/// Assembles an unsigned envelope and signs it.
///
/// Building is deterministic: the same chain id, account state, fee,
/// memo and messages always produce byte-identical sign bytes, which is
/// what makes the signature reproducible.
#[derive(Debug, Clone)]
pub struct TxBuilder {
    chain_id: String,
    account_number: Option<u64>,
    sequence: Option<u64>,
    gas_limit: u64,
    fee_amount: Coins,
    memo: String,
    timeout_height: u64,
    messages: Vec<TxMessage>,
}

impl TxBuilder {
    /// Create a builder for the given chain
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            account_number: None,
            sequence: None,
            gas_limit: DEFAULT_GAS_LIMIT,
            fee_amount: Coins::empty(),
            memo: String::new(),
            timeout_height: 0,
            messages: Vec::new(),
        }
    }

    /// Set account number
    pub fn account_number(mut self, account_number: u64) -> Self {
        self.account_number = Some(account_number);
        self
    }

    /// Set sequence number
    pub fn sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Set gas limit
    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Set fee amount
    pub fn fee_amount(mut self, fee_amount: Coins) -> Self {
        self.fee_amount = fee_amount;
        self
    }

    /// Set memo
    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    /// Set timeout height
    pub fn timeout_height(mut self, timeout_height: u64) -> Self {
        self.timeout_height = timeout_height;
        self
    }

    /// Validate and add a typed message
    pub fn add_message(mut self, msg: &dyn ChainMsg) -> Result<Self, TxError> {
        msg.validate_basic()?;
        self.messages.push(msg.to_any());
        Ok(self)
    }

    /// Add an already-encoded message payload the builder does not model
    pub fn add_raw_message(mut self, type_url: impl Into<String>, value: Vec<u8>) -> Self {
        self.messages.push(TxMessage {
            type_url: type_url.into(),
            value,
        });
        self
    }

    /// Whether account number and sequence are both set
    pub fn has_account_info(&self) -> bool {
        self.account_number.is_some() && self.sequence.is_some()
    }

    /// Fill in account number and sequence in one call
    pub fn with_account_info(self, account_number: u64, sequence: u64) -> Self {
        self.account_number(account_number).sequence(sequence)
    }

    /// Build the unsigned envelope
    pub fn build(&self) -> Result<TxEnvelope, TxError> {
        if self.messages.is_empty() {
            return Err(TxError::NoMessages);
        }
        if self.account_number.is_none() {
            return Err(TxError::MissingAccountNumber);
        }
        let sequence = self.sequence.ok_or(TxError::MissingSequence)?;

        let body = TxBody {
            messages: self.messages.clone(),
            memo: self.memo.clone(),
            timeout_height: self.timeout_height,
        };

        let fee = Fee {
            amount: self
                .fee_amount
                .iter()
                .map(|coin| aerial_types::tx::FeeAmount {
                    denom: coin.denom.clone(),
                    amount: coin.amount.to_string(),
                })
                .collect(),
            gas_limit: self.gas_limit,
            payer: String::new(),
            granter: String::new(),
        };

        // public key is attached at signing time
        let signer_info = SignerInfo {
            public_key: None,
            mode_info: ModeInfo {
                single: Some(ModeInfoSingle {
                    mode: SignMode::Direct as u32,
                }),
            },
            sequence,
        };

        Ok(TxEnvelope {
            body,
            auth_info: AuthInfo {
                signer_infos: vec![signer_info],
                fee,
            },
            signatures: vec![],
        })
    }

    /// Canonical sign bytes for this builder state and signer
    pub fn sign_doc(&self, private_key: &PrivateKey) -> Result<Vec<u8>, TxError> {
        let envelope = self.envelope_with_pubkey(private_key)?;
        Ok(self.sign_doc_for(&envelope))
    }

    /// Sign the transaction with the provided private key
    pub fn sign(&self, private_key: &PrivateKey) -> Result<SignedTx, TxError> {
        let mut envelope = self.envelope_with_pubkey(private_key)?;

        let sign_bytes = self.sign_doc_for(&envelope);
        let signature = private_key.sign(&sign_bytes);
        envelope.signatures = vec![signature];

        let tx_bytes = envelope.to_bytes();
        let tx_hash = tx_hash(&tx_bytes);

        Ok(SignedTx {
            envelope,
            tx_bytes,
            tx_hash,
        })
    }

    fn envelope_with_pubkey(&self, private_key: &PrivateKey) -> Result<TxEnvelope, TxError> {
        let mut envelope = self.build()?;

        let public_key = private_key.public_key();
        let pubkey_proto = SecpPubKeyProto {
            key: public_key.to_bytes().to_vec(),
        };
        envelope.auth_info.signer_infos[0].public_key = Some(TxMessage {
            type_url: public_key.type_url().to_string(),
            value: pubkey_proto.encode_to_vec(),
        });

        Ok(envelope)
    }

    fn sign_doc_for(&self, envelope: &TxEnvelope) -> Vec<u8> {
        sign_doc_bytes(
            envelope.body.to_proto_bytes(),
            envelope.auth_info.to_proto_bytes(),
            &self.chain_id,
            self.account_number.unwrap_or_default(),
        )
    }
}

/// Transaction hash: upper-case hex of sha256 over the wire bytes
pub fn tx_hash(tx_bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tx_bytes);
    hex::encode(hasher.finalize()).to_uppercase()
}

/// Protobuf wrapper carrying a compressed secp256k1 public key
#[derive(Clone, PartialEq, Message)]
struct SecpPubKeyProto {
    #[prost(bytes = "vec", tag = "1")]
    key: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerial_math::{Coin, Int};
    use aerial_types::{Address, MsgSend};

    fn test_key() -> PrivateKey {
        PrivateKey::from_bytes(&[7u8; 32]).unwrap()
    }

    fn test_msg() -> MsgSend {
        let from = Address::from_pubkey(&[1u8; 33], "kii").unwrap();
        let to = Address::from_pubkey(&[2u8; 33], "kii").unwrap();
        let coins = Coins::one("ukii", Int::from_u64(1000)).unwrap();
        MsgSend::new(from, to, coins)
    }

    fn test_builder() -> TxBuilder {
        TxBuilder::new("test-chain")
            .add_message(&test_msg())
            .unwrap()
            .account_number(1)
            .sequence(0)
            .fee_amount(Coins::new(vec![
                Coin::new("ukii", Int::from_u64(5000)).unwrap()
            ]))
            .memo("test tx")
    }

    #[test]
    fn test_build_unsigned_envelope() {
        let envelope = test_builder().build().unwrap();
        assert_eq!(envelope.body.messages.len(), 1);
        assert_eq!(envelope.body.memo, "test tx");
        assert_eq!(envelope.auth_info.signer_infos.len(), 1);
        assert_eq!(envelope.auth_info.signer_infos[0].sequence, 0);
        assert_eq!(envelope.auth_info.fee.gas_limit, DEFAULT_GAS_LIMIT);
        assert_eq!(envelope.auth_info.fee.amount[0].amount, "5000");
        assert!(envelope.signatures.is_empty());
    }

    #[test]
    fn test_build_requires_account_info_and_messages() {
        let builder = TxBuilder::new("test-chain");
        assert!(matches!(builder.build(), Err(TxError::NoMessages)));

        let builder = TxBuilder::new("test-chain").add_message(&test_msg()).unwrap();
        assert!(matches!(builder.build(), Err(TxError::MissingAccountNumber)));

        let builder = builder.account_number(1);
        assert!(matches!(builder.build(), Err(TxError::MissingSequence)));

        assert!(builder.sequence(0).build().is_ok());
    }

    #[test]
    fn test_add_message_validates() {
        let from = Address::from_pubkey(&[1u8; 33], "kii").unwrap();
        let to = Address::from_pubkey(&[2u8; 33], "kii").unwrap();
        let empty = MsgSend::new(from, to, Coins::empty());
        assert!(TxBuilder::new("test-chain").add_message(&empty).is_err());
    }

    #[test]
    fn test_sign_doc_deterministic() {
        let key = test_key();
        let a = test_builder().sign_doc(&key).unwrap();
        let b = test_builder().sign_doc(&key).unwrap();
        assert_eq!(a, b);

        // any field change moves the sign bytes
        let c = test_builder().memo("other memo").sign_doc(&key).unwrap();
        assert_ne!(a, c);
        let d = test_builder().sequence(1).sign_doc(&key).unwrap();
        assert_ne!(a, d);
    }

    #[test]
    fn test_sign_produces_verifiable_signature() {
        let key = test_key();
        let builder = test_builder();

        let signed = builder.sign(&key).unwrap();
        assert_eq!(signed.envelope.signatures.len(), 1);
        assert_eq!(signed.envelope.signatures[0].len(), 64);

        let sign_bytes = builder.sign_doc(&key).unwrap();
        key.public_key()
            .verify(&sign_bytes, &signed.envelope.signatures[0])
            .unwrap();

        // signing twice yields identical bytes and hash
        let again = builder.sign(&key).unwrap();
        assert_eq!(signed.tx_bytes, again.tx_bytes);
        assert_eq!(signed.tx_hash, again.tx_hash);
    }

    #[test]
    fn test_signed_tx_roundtrips_and_carries_pubkey() {
        let key = test_key();
        let signed = test_builder().sign(&key).unwrap();

        let decoded = TxEnvelope::from_bytes(&signed.tx_bytes).unwrap();
        assert_eq!(decoded, signed.envelope);

        let pubkey = decoded.auth_info.signer_infos[0]
            .public_key
            .as_ref()
            .unwrap();
        assert_eq!(pubkey.type_url, "/cosmos.crypto.secp256k1.PubKey");

        // the embedded message decodes back to what we sent
        let msg = MsgSend::decode(&decoded.body.messages[0].value).unwrap();
        assert_eq!(msg, test_msg());
    }

    #[test]
    fn test_tx_hash_format() {
        let hash = tx_hash(b"test transaction bytes");
        assert_eq!(hash.len(), 64);
        assert!(hash
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_raw_message_passthrough() {
        let builder = TxBuilder::new("test-chain")
            .add_raw_message("/cosmwasm.wasm.v1.MsgExecuteContract", vec![1, 2, 3])
            .account_number(4)
            .sequence(2);
        let envelope = builder.build().unwrap();
        assert_eq!(
            envelope.body.messages[0].type_url,
            "/cosmwasm.wasm.v1.MsgExecuteContract"
        );
        assert_eq!(envelope.body.messages[0].value, vec![1, 2, 3]);
    }
}
