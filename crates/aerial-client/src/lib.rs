//! Ledger client for aerial.
//!
//! This crate orchestrates the transaction lifecycle against a remote
//! node: query account state, build and sign a transaction, broadcast
//! it, and poll the resulting handle until the chain settles it. The
//! node itself sits behind the [`NodeApi`] trait, so tests and custom
//! transports can stand in for the REST implementation.

pub mod config;
pub mod node;
pub mod staking;
pub mod submitted;
pub mod tx_builder;

pub use config::{ConfigError, NetworkConfig};
pub use node::{
    AccountInfo, BroadcastResult, Delegation, NodeApi, RestNodeApi, Reward, StakingPositions,
    TxResponse, UnbondingEntry, Validator, ValidatorStatus,
};
pub use staking::{StakedPosition, StakingSummary, UnbondingPosition};
pub use submitted::SubmittedTx;
pub use tx_builder::{SignedTx, TxBuilder, TxError, DEFAULT_GAS_LIMIT};

use aerial_math::{CoinError, Coins, Int};
use aerial_types::{Address, MsgSend};
use aerial_wallet::LocalWallet;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Client error types
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request error
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("json parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Node answered with a non-success HTTP status
    #[error("node error {status}: {message}")]
    Node { status: u16, message: String },

    /// Response arrived but did not have the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Queried entity does not exist where existence is required
    #[error("not found: {0}")]
    NotFound(String),

    /// Node synchronously rejected the broadcast; the transaction never
    /// entered the mempool and resubmitting with corrected input is safe
    #[error("broadcast rejected (code {code}): {log}")]
    Broadcast { code: u32, log: String },

    /// Transaction was included but chain-level execution failed;
    /// terminal, the client never retries it
    #[error("transaction {hash} failed on chain (code {code}): {log}")]
    ExecutionFailure { hash: String, code: u32, log: String },

    /// The confirmation poll budget ran out. Ambiguous: the transaction
    /// may still be included later, so re-query by hash instead of
    /// resubmitting
    #[error("transaction {hash} not confirmed after {attempts} polls")]
    ConfirmationTimeout { hash: String, attempts: u32 },

    /// Transaction construction error
    #[error(transparent)]
    Tx(#[from] TxError),

    /// Coin error
    #[error(transparent)]
    Coin(#[from] CoinError),
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client for one network.
///
/// Holds the network configuration and a node handle, nothing else: no
/// per-transaction state, so one client can serve any number of
/// concurrent submissions. Each submission should fetch a fresh
/// sequence number right before signing; two transactions signed
/// against the same sequence slot race, and the chain settles at most
/// one of them.
#[derive(Clone)]
pub struct LedgerClient {
    config: NetworkConfig,
    node: Arc<dyn NodeApi>,
}

impl LedgerClient {
    /// Connect to the configured network over REST
    pub fn new(config: NetworkConfig) -> Result<Self> {
        config.validate()?;
        let node: Arc<dyn NodeApi> = Arc::new(RestNodeApi::new(&config)?);
        Ok(Self { config, node })
    }

    /// Build a client over a custom node implementation
    pub fn with_node(config: NetworkConfig, node: Arc<dyn NodeApi>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, node })
    }

    /// The network this client talks to
    pub fn network(&self) -> &NetworkConfig {
        &self.config
    }

    /// A transaction builder preloaded with this network's chain id,
    /// default gas limit and the matching fee
    pub fn tx_builder(&self) -> TxBuilder {
        TxBuilder::new(self.config.chain_id.clone())
            .gas_limit(self.config.default_gas_limit)
            .fee_amount(self.config.fee_for_gas(self.config.default_gas_limit))
    }

    /// Account number and sequence for an address
    pub async fn query_account(&self, address: &Address) -> Result<AccountInfo> {
        self.node.get_account(address).await
    }

    /// Balance of one denomination; defaults to the staking denom.
    /// An address the chain has never seen reports zero.
    pub async fn query_bank_balance(
        &self,
        address: &Address,
        denom: Option<&str>,
    ) -> Result<Int> {
        let denom = denom.unwrap_or(&self.config.staking_denomination);
        self.node.get_balance(address, denom).await
    }

    /// All balances of an address, in the node's reported order
    pub async fn query_bank_all_balances(&self, address: &Address) -> Result<Coins> {
        self.node.get_all_balances(address).await
    }

    /// Validators known to the staking module
    pub async fn query_validators(&self) -> Result<Vec<Validator>> {
        self.node.get_validators().await
    }

    /// Raw staking positions of an address
    pub async fn query_staking_positions(&self, address: &Address) -> Result<StakingPositions> {
        self.node.get_staking_positions(address).await
    }

    /// Staking positions aggregated per validator, with totals
    pub async fn query_staking_summary(&self, address: &Address) -> Result<StakingSummary> {
        let positions = self.node.get_staking_positions(address).await?;
        Ok(StakingSummary::aggregate(&positions))
    }

    /// Look up a settled transaction by hash; `None` while not included
    pub async fn query_tx(&self, hash: &str) -> Result<Option<TxResponse>> {
        self.node.get_tx_by_hash(hash).await
    }

    /// Hand signed bytes to the node.
    ///
    /// A synchronous rejection (non-zero broadcast code, e.g. a bad
    /// signature or a stale sequence) surfaces as
    /// [`ClientError::Broadcast`] and yields no handle. The client never
    /// re-signs and retries on its own: the first submission may have
    /// been accepted even if this call failed, and a silent retry could
    /// double-spend. Re-fetch the sequence and rebuild to retry.
    pub async fn broadcast_tx(&self, signed: &SignedTx) -> Result<SubmittedTx> {
        let result = self.node.broadcast_tx(&signed.tx_bytes).await?;
        if result.code != 0 {
            return Err(ClientError::Broadcast {
                code: result.code,
                log: result.raw_log,
            });
        }

        let tx_hash = if result.tx_hash.is_empty() {
            signed.tx_hash.clone()
        } else {
            result.tx_hash
        };
        info!(%tx_hash, "transaction accepted into mempool");

        Ok(SubmittedTx::new(
            tx_hash,
            Arc::clone(&self.node),
            self.config.poll_interval(),
            self.config.tx_poll_attempts,
        ))
    }

    /// Fetch the wallet's current account state if the builder lacks
    /// it, sign, and broadcast
    pub async fn sign_and_broadcast(
        &self,
        mut builder: TxBuilder,
        wallet: &LocalWallet,
    ) -> Result<SubmittedTx> {
        if !builder.has_account_info() {
            let account = self.query_account(wallet.address()).await?;
            builder = builder.with_account_info(account.account_number, account.sequence);
        }

        let signed = builder.sign(wallet.private_key())?;
        self.broadcast_tx(&signed).await
    }

    /// Send tokens from the wallet to another address, with the
    /// network's default gas and fee
    pub async fn send_tokens(
        &self,
        destination: &Address,
        amount: Int,
        denom: &str,
        wallet: &LocalWallet,
    ) -> Result<SubmittedTx> {
        let coins = Coins::one(denom, amount)?;
        let msg = MsgSend::new(wallet.address().clone(), destination.clone(), coins);
        let builder = self.tx_builder().add_message(&msg)?;
        self.sign_and_broadcast(builder, wallet).await
    }
}
