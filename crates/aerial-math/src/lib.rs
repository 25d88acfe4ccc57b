//! Amount and coin types for the aerial client toolkit.
//!
//! Amounts are arbitrary-precision integers; coin lists keep the exact
//! order and entries the caller supplied.

pub mod coin;
pub mod int;

pub use coin::{parse_coins, Coin, CoinError, Coins};
pub use int::Int;
