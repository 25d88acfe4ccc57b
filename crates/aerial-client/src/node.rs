//! Remote node contract and its REST (LCD) implementation

use crate::config::NetworkConfig;
use crate::{ClientError, Result};
use aerial_math::{Coin, Coins, Int};
use aerial_types::Address;
use async_trait::async_trait;
use base64::Engine;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tracing::debug;
use url::Url;

/// Account state needed to build a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    pub address: String,
    pub account_number: u64,
    pub sequence: u64,
}

/// Immediate result of handing transaction bytes to the node
#[derive(Debug, Clone)]
pub struct BroadcastResult {
    pub tx_hash: String,
    pub code: u32,
    pub raw_log: String,
}

/// Bonding state of a validator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorStatus {
    Bonded,
    Unbonding,
    Unbonded,
    Unspecified,
}

impl ValidatorStatus {
    fn from_chain(status: &str) -> Self {
        match status {
            "BOND_STATUS_BONDED" => Self::Bonded,
            "BOND_STATUS_UNBONDING" => Self::Unbonding,
            "BOND_STATUS_UNBONDED" => Self::Unbonded,
            _ => Self::Unspecified,
        }
    }
}

/// A validator as reported by the staking module
#[derive(Debug, Clone)]
pub struct Validator {
    /// Operator address (validator-operator prefix)
    pub address: Address,
    pub moniker: String,
    pub status: ValidatorStatus,
    pub tokens: Int,
}

/// One delegation of the queried account
#[derive(Debug, Clone, PartialEq)]
pub struct Delegation {
    pub validator: Address,
    pub amount: Int,
}

/// Tokens of the queried account in the unbonding cooldown
#[derive(Debug, Clone, PartialEq)]
pub struct UnbondingEntry {
    pub validator: Address,
    pub amount: Int,
}

/// Accrued, unclaimed staking reward
#[derive(Debug, Clone, PartialEq)]
pub struct Reward {
    pub validator: Address,
    pub amount: Int,
}

/// Raw staking state of one account, as returned by the node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StakingPositions {
    pub delegations: Vec<Delegation>,
    pub unbonding: Vec<UnbondingEntry>,
    pub rewards: Vec<Reward>,
}

/// Final on-chain record of an included transaction
#[derive(Debug, Clone, PartialEq)]
pub struct TxResponse {
    pub tx_hash: String,
    pub height: u64,
    /// Execution result code; zero is success
    pub code: u32,
    pub raw_log: String,
    pub gas_wanted: u64,
    pub gas_used: u64,
    pub timestamp: Option<String>,
}

impl TxResponse {
    /// Whether chain-level execution succeeded
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Contract the ledger client needs from a remote node.
///
/// Queries are read-only and tolerate absence: an unknown address has a
/// zero balance and no positions, an unknown transaction hash is `None`.
/// `broadcast_tx` is the only state-changing call.
#[async_trait]
pub trait NodeApi: Send + Sync {
    /// Account number and sequence for an address; errors if the
    /// account has never been seen by the chain
    async fn get_account(&self, address: &Address) -> Result<AccountInfo>;

    /// Balance of a single denomination; zero when absent
    async fn get_balance(&self, address: &Address, denom: &str) -> Result<Int>;

    /// All balances of an address, in the node's reported order
    async fn get_all_balances(&self, address: &Address) -> Result<Coins>;

    /// Validators known to the staking module
    async fn get_validators(&self) -> Result<Vec<Validator>>;

    /// Delegations, unbonding entries and pending rewards of an address
    async fn get_staking_positions(&self, address: &Address) -> Result<StakingPositions>;

    /// Hand signed transaction bytes to the node's mempool
    async fn broadcast_tx(&self, tx_bytes: &[u8]) -> Result<BroadcastResult>;

    /// Look up a transaction by hash; `None` while not yet included
    async fn get_tx_by_hash(&self, hash: &str) -> Result<Option<TxResponse>>;
}

/// `NodeApi` over the Cosmos LCD REST interface
pub struct RestNodeApi {
    base_url: Url,
    staking_denom: String,
    http: reqwest::Client,
}

impl RestNodeApi {
    /// Build a REST client from the network configuration
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url)?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            base_url,
            staking_denom: config.staking_denomination.clone(),
            http,
        })
    }

    /// GET a JSON document; `None` when the node answers 404
    async fn get_json(&self, path: &str) -> Result<Option<Value>> {
        let url = self.base_url.join(path)?;
        debug!(%url, "node query");
        let response = self.http.get(url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Node { status, message });
        }

        Ok(Some(response.json().await?))
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.base_url.join(path)?;
        debug!(%url, "node submit");
        let response = self.http.post(url).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Node { status, message });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl NodeApi for RestNodeApi {
    async fn get_account(&self, address: &Address) -> Result<AccountInfo> {
        let path = format!("cosmos/auth/v1beta1/accounts/{address}");
        let response = self
            .get_json(&path)
            .await?
            .ok_or_else(|| ClientError::NotFound(format!("account {address}")))?;

        let account = response
            .get("account")
            .ok_or_else(|| ClientError::InvalidResponse("missing account field".to_string()))?;
        // vesting and module accounts nest the base account one level down
        let base = account.get("base_account").unwrap_or(account);

        Ok(AccountInfo {
            address: address.to_string(),
            account_number: json_u64(base, "account_number").ok_or_else(|| {
                ClientError::InvalidResponse("missing account_number".to_string())
            })?,
            sequence: json_u64(base, "sequence").unwrap_or(0),
        })
    }

    async fn get_balance(&self, address: &Address, denom: &str) -> Result<Int> {
        let path = format!("cosmos/bank/v1beta1/balances/{address}/by_denom?denom={denom}");
        let response = match self.get_json(&path).await? {
            Some(response) => response,
            None => return Ok(Int::zero()),
        };

        match response.get("balance").and_then(|b| b.get("amount")) {
            Some(amount) => parse_int_value(amount),
            None => Ok(Int::zero()),
        }
    }

    async fn get_all_balances(&self, address: &Address) -> Result<Coins> {
        let path = format!("cosmos/bank/v1beta1/balances/{address}");
        let response = match self.get_json(&path).await? {
            Some(response) => response,
            None => return Ok(Coins::empty()),
        };

        let mut coins = Coins::empty();
        if let Some(balances) = response.get("balances").and_then(|b| b.as_array()) {
            for balance in balances {
                let denom = balance
                    .get("denom")
                    .and_then(|d| d.as_str())
                    .ok_or_else(|| {
                        ClientError::InvalidResponse("balance entry missing denom".to_string())
                    })?;
                let amount = balance.get("amount").map(parse_int_value).ok_or_else(|| {
                    ClientError::InvalidResponse("balance entry missing amount".to_string())
                })??;
                coins.push(
                    Coin::new(denom, amount)
                        .map_err(|e| ClientError::InvalidResponse(e.to_string()))?,
                );
            }
        }
        Ok(coins)
    }

    async fn get_validators(&self) -> Result<Vec<Validator>> {
        let response = match self.get_json("cosmos/staking/v1beta1/validators").await? {
            Some(response) => response,
            None => return Ok(Vec::new()),
        };

        let mut validators = Vec::new();
        if let Some(entries) = response.get("validators").and_then(|v| v.as_array()) {
            for entry in entries {
                let operator = entry
                    .get("operator_address")
                    .and_then(|a| a.as_str())
                    .ok_or_else(|| {
                        ClientError::InvalidResponse("validator missing operator_address".to_string())
                    })?;
                validators.push(Validator {
                    address: Address::from_str(operator)
                        .map_err(|e| ClientError::InvalidResponse(e.to_string()))?,
                    moniker: entry
                        .get("description")
                        .and_then(|d| d.get("moniker"))
                        .and_then(|m| m.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    status: ValidatorStatus::from_chain(
                        entry.get("status").and_then(|s| s.as_str()).unwrap_or(""),
                    ),
                    tokens: entry
                        .get("tokens")
                        .map(parse_int_value)
                        .transpose()?
                        .unwrap_or_else(Int::zero),
                });
            }
        }
        Ok(validators)
    }

    async fn get_staking_positions(&self, address: &Address) -> Result<StakingPositions> {
        let mut positions = StakingPositions::default();

        let path = format!("cosmos/staking/v1beta1/delegations/{address}");
        if let Some(response) = self.get_json(&path).await? {
            if let Some(entries) = response
                .get("delegation_responses")
                .and_then(|d| d.as_array())
            {
                for entry in entries {
                    let validator = entry
                        .get("delegation")
                        .and_then(|d| d.get("validator_address"))
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| {
                            ClientError::InvalidResponse(
                                "delegation missing validator_address".to_string(),
                            )
                        })?;
                    let amount = entry
                        .get("balance")
                        .and_then(|b| b.get("amount"))
                        .map(parse_int_value)
                        .transpose()?
                        .unwrap_or_else(Int::zero);
                    positions.delegations.push(Delegation {
                        validator: Address::from_str(validator)
                            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?,
                        amount,
                    });
                }
            }
        }

        let path = format!("cosmos/staking/v1beta1/delegators/{address}/unbonding_delegations");
        if let Some(response) = self.get_json(&path).await? {
            if let Some(entries) = response
                .get("unbonding_responses")
                .and_then(|u| u.as_array())
            {
                for entry in entries {
                    let validator = entry
                        .get("validator_address")
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| {
                            ClientError::InvalidResponse(
                                "unbonding entry missing validator_address".to_string(),
                            )
                        })?;
                    let validator = Address::from_str(validator)
                        .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
                    // one response row carries an entry per unlock batch
                    if let Some(batches) = entry.get("entries").and_then(|e| e.as_array()) {
                        for batch in batches {
                            let amount = batch
                                .get("balance")
                                .map(parse_int_value)
                                .transpose()?
                                .unwrap_or_else(Int::zero);
                            positions.unbonding.push(UnbondingEntry {
                                validator: validator.clone(),
                                amount,
                            });
                        }
                    }
                }
            }
        }

        let path = format!("cosmos/distribution/v1beta1/delegators/{address}/rewards");
        if let Some(response) = self.get_json(&path).await? {
            if let Some(entries) = response.get("rewards").and_then(|r| r.as_array()) {
                for entry in entries {
                    let validator = entry
                        .get("validator_address")
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| {
                            ClientError::InvalidResponse(
                                "reward entry missing validator_address".to_string(),
                            )
                        })?;
                    let amount = entry
                        .get("reward")
                        .and_then(|r| r.as_array())
                        .and_then(|coins| {
                            coins.iter().find(|c| {
                                c.get("denom").and_then(|d| d.as_str())
                                    == Some(self.staking_denom.as_str())
                            })
                        })
                        .and_then(|c| c.get("amount"))
                        .map(parse_decimal_floor)
                        .transpose()?
                        .unwrap_or_else(Int::zero);
                    positions.rewards.push(Reward {
                        validator: Address::from_str(validator)
                            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?,
                        amount,
                    });
                }
            }
        }

        Ok(positions)
    }

    async fn broadcast_tx(&self, tx_bytes: &[u8]) -> Result<BroadcastResult> {
        let body = serde_json::json!({
            "tx_bytes": base64::engine::general_purpose::STANDARD.encode(tx_bytes),
            "mode": "BROADCAST_MODE_SYNC",
        });
        let response = self.post_json("cosmos/tx/v1beta1/txs", &body).await?;

        let tx_response = response.get("tx_response").ok_or_else(|| {
            ClientError::InvalidResponse("broadcast reply missing tx_response".to_string())
        })?;

        Ok(BroadcastResult {
            tx_hash: tx_response
                .get("txhash")
                .and_then(|h| h.as_str())
                .unwrap_or_default()
                .to_string(),
            code: json_u64(tx_response, "code").unwrap_or(0) as u32,
            raw_log: tx_response
                .get("raw_log")
                .and_then(|l| l.as_str())
                .unwrap_or_default()
                .to_string(),
        })
    }

    async fn get_tx_by_hash(&self, hash: &str) -> Result<Option<TxResponse>> {
        let path = format!("cosmos/tx/v1beta1/txs/{hash}");
        let response = match self.get_json(&path).await? {
            Some(response) => response,
            None => return Ok(None),
        };

        let tx_response = match response.get("tx_response") {
            Some(tx_response) => tx_response,
            None => return Ok(None),
        };

        Ok(Some(TxResponse {
            tx_hash: tx_response
                .get("txhash")
                .and_then(|h| h.as_str())
                .unwrap_or(hash)
                .to_string(),
            height: json_u64(tx_response, "height").unwrap_or(0),
            code: json_u64(tx_response, "code").unwrap_or(0) as u32,
            raw_log: tx_response
                .get("raw_log")
                .and_then(|l| l.as_str())
                .unwrap_or_default()
                .to_string(),
            gas_wanted: json_u64(tx_response, "gas_wanted").unwrap_or(0),
            gas_used: json_u64(tx_response, "gas_used").unwrap_or(0),
            timestamp: tx_response
                .get("timestamp")
                .and_then(|t| t.as_str())
                .filter(|t| !t.is_empty())
                .map(|t| t.to_string()),
        }))
    }
}

// The LCD encodes 64-bit integers as JSON strings; accept both forms.
fn json_u64(value: &Value, key: &str) -> Option<u64> {
    match value.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn parse_int_value(value: &Value) -> Result<Int> {
    let s = match value {
        Value::String(s) => s.as_str(),
        Value::Number(n) => return Ok(Int::from_u64(n.as_u64().unwrap_or(0))),
        _ => {
            return Err(ClientError::InvalidResponse(format!(
                "expected integer amount, got {value}"
            )))
        }
    };
    Int::from_str(s)
        .map_err(|_| ClientError::InvalidResponse(format!("invalid integer amount {s:?}")))
}

// Reward amounts come back as fixed-point decimals; the fractional part
// is below one base unit and is dropped.
fn parse_decimal_floor(value: &Value) -> Result<Int> {
    let s = value
        .as_str()
        .ok_or_else(|| ClientError::InvalidResponse(format!("expected decimal, got {value}")))?;
    let whole = s.split('.').next().unwrap_or("0");
    let whole = if whole.is_empty() { "0" } else { whole };
    Int::from_str(whole)
        .map_err(|_| ClientError::InvalidResponse(format!("invalid decimal amount {s:?}")))
}
