//! Coin and coin-list types plus the textual coin grammar

use crate::int::Int;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CoinError {
    #[error("invalid denomination:: {0}")]
    InvalidDenom(String),

    #[error("negative amount not allowed")]
    NegativeAmount,

    #[error("invalid coin syntax:: {0}")]
    InvalidCoinSyntax(String),
}

/// A single coin with denomination and amount
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: Int,
}

impl Coin {
    /// Create a new coin, validating denomination and amount
    pub fn new(denom: impl Into<String>, amount: Int) -> Result<Self, CoinError> {
        let denom = denom.into();
        if !is_valid_denom(&denom) {
            return Err(CoinError::InvalidDenom(denom));
        }

        if amount.is_negative() {
            return Err(CoinError::NegativeAmount);
        }

        Ok(Self { denom, amount })
    }

    /// Check if coin is zero
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// An ordered list of coins.
///
/// Entries keep the order they were supplied in; duplicate denominations
/// are kept as distinct entries and never merged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coins(Vec<Coin>);

impl Coins {
    /// Create a coin list from a vector of coins, preserving order
    pub fn new(coins: Vec<Coin>) -> Self {
        Self(coins)
    }

    /// Create an empty coin list
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Create a single-entry coin list
    pub fn one(denom: impl Into<String>, amount: Int) -> Result<Self, CoinError> {
        Ok(Self(vec![Coin::new(denom, amount)?]))
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Get coins as slice
    pub fn as_slice(&self) -> &[Coin] {
        &self.0
    }

    /// Append a coin, keeping it as its own entry
    pub fn push(&mut self, coin: Coin) {
        self.0.push(coin);
    }

    /// Total amount across all entries of a denomination
    pub fn amount_of(&self, denom: &str) -> Int {
        self.0
            .iter()
            .filter(|c| c.denom == denom)
            .map(|c| c.amount.clone())
            .sum()
    }

    /// Iterate over the entries
    pub fn iter(&self) -> std::slice::Iter<'_, Coin> {
        self.0.iter()
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", s.join(", "))
    }
}

impl FromStr for Coins {
    type Err = CoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_coins(s)
    }
}

impl IntoIterator for Coins {
    type Item = Coin;
    type IntoIter = std::vec::IntoIter<Coin>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Parse a comma-separated coin list such as `"50000ukii, 200foobar"`.
///
/// Each entry is one or more decimal digits immediately followed by a
/// denomination; the denomination starts with a letter and may contain
/// letters, digits and `/`. Empty or all-whitespace input yields an
/// empty list. Any malformed entry rejects the whole string.
pub fn parse_coins(input: &str) -> Result<Coins, CoinError> {
    if input.trim().is_empty() {
        return Ok(Coins::empty());
    }

    let mut coins = Vec::new();
    for entry in input.split(',') {
        let entry = entry.trim();

        let split = entry
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| CoinError::InvalidCoinSyntax(entry.to_string()))?;
        if split == 0 {
            return Err(CoinError::InvalidCoinSyntax(entry.to_string()));
        }

        let (amount, denom) = entry.split_at(split);
        if !is_valid_parsed_denom(denom) {
            return Err(CoinError::InvalidCoinSyntax(entry.to_string()));
        }

        let amount = Int::from_str(amount)
            .map_err(|_| CoinError::InvalidCoinSyntax(entry.to_string()))?;
        coins.push(Coin {
            denom: denom.to_string(),
            amount,
        });
    }

    Ok(Coins(coins))
}

// Grammar for parsed denominations: a letter followed by letters,
// digits, or `/` (the slash supports namespaced IBC denominations).
fn is_valid_parsed_denom(denom: &str) -> bool {
    let mut chars = denom.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '/')
}

/// Validate a denomination for programmatic coin construction
fn is_valid_denom(denom: &str) -> bool {
    if denom.is_empty() || denom.len() > 127 {
        return false;
    }

    // Must start with a letter
    let first = match denom.chars().next() {
        Some(c) => c,
        None => return false,
    };
    if !first.is_alphabetic() {
        return false;
    }

    denom
        .chars()
        .all(|c| c.is_alphanumeric() || c == '/' || c == ':' || c == '.' || c == '_' || c == '-')
}
