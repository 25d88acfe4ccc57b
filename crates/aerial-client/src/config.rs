//! Network configuration for the ledger client

use aerial_math::{Coin, Coins, Int};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Endpoint URL failed to parse
    #[error("invalid url:: {0}")]
    Url(#[from] url::ParseError),

    /// A field failed validation
    #[error("invalid configuration:: {0}")]
    Invalid(String),
}

/// Everything the client needs to know about one network.
///
/// The configuration is an explicit value handed to `LedgerClient` at
/// construction; there is no process-wide network state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Chain ID signed into every transaction
    pub chain_id: String,
    /// REST (LCD) endpoint of the node
    pub url: String,
    /// Minimum gas price used to derive default fees
    pub fee_minimum_gas_price: f64,
    /// Denomination fees are paid in
    pub fee_denomination: String,
    /// Denomination used by staking queries
    pub staking_denomination: String,
    /// Gas limit applied when the caller does not set one
    pub default_gas_limit: u64,
    /// Delay between confirmation polls, in milliseconds
    pub tx_poll_interval_ms: u64,
    /// Number of confirmation polls before giving up
    pub tx_poll_attempts: u32,
    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
}

impl NetworkConfig {
    /// Configuration for a node running on this machine with the
    /// stock REST port
    pub fn localnet() -> Self {
        Self {
            chain_id: "localnet".to_string(),
            url: "http://localhost:1317".to_string(),
            fee_minimum_gas_price: 0.025,
            fee_denomination: "ukii".to_string(),
            staking_denomination: "ukii".to_string(),
            default_gas_limit: 200_000,
            tx_poll_interval_ms: 2_000,
            tx_poll_attempts: 30,
            request_timeout_secs: 30,
        }
    }

    /// Check the configuration for values the client cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain_id.trim().is_empty() {
            return Err(ConfigError::Invalid("chain_id must not be empty".to_string()));
        }
        Url::parse(&self.url)?;
        if !self.fee_minimum_gas_price.is_finite() || self.fee_minimum_gas_price < 0.0 {
            return Err(ConfigError::Invalid(
                "fee_minimum_gas_price must be a non-negative number".to_string(),
            ));
        }
        Coin::new(self.fee_denomination.clone(), Int::zero()).map_err(|e| {
            ConfigError::Invalid(format!("fee_denomination is not a valid denom: {e}"))
        })?;
        if self.tx_poll_attempts == 0 {
            return Err(ConfigError::Invalid(
                "tx_poll_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Fee covering `gas_limit` units at the configured gas price,
    /// rounded up to a whole fee unit
    pub fn fee_for_gas(&self, gas_limit: u64) -> Coins {
        let amount = (self.fee_minimum_gas_price * gas_limit as f64).ceil() as u128;
        let coin = Coin::new(self.fee_denomination.clone(), Int::from_u128(amount))
            .expect("fee_denomination checked by validate()");
        Coins::new(vec![coin])
    }

    /// Delay between confirmation polls
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.tx_poll_interval_ms)
    }

    /// HTTP request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::localnet()
    }
}
