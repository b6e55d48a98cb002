//! Balance fetching and alert evaluation for tracked token balances.
//!
//! This crate provides:
//! - [`BalanceFetcher`]: resolves one query's balance and token metadata
//!   through the shared client cache
//! - [`AlertEvaluator`] and [`AlertHistory`]: threshold checks on the
//!   fixed-point balance

pub mod alert;
pub mod fetcher;

pub use alert::{
    AlertConfig, AlertDirection, AlertEvaluator, AlertHistory, AlertOutcome, AlertTrigger,
};
pub use fetcher::BalanceFetcher;

use alloy_primitives::U256;
use client::ClientError;
use normalize::AmountError;
use registry::ChainTarget;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything the fetcher needs to know about one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Query id, used for logging only
    pub id: String,
    /// Chain client selection
    pub target: ChainTarget,
    /// Holder address in canonical form
    pub holder: String,
    /// Token contract in canonical form
    pub token: String,
    /// Previously resolved token metadata, reused without a network call
    pub cached: TokenMetadata,
    /// User-entered symbol, the fallback when the contract reports none
    pub symbol_hint: String,
}

/// Token metadata resolved so far; `None` means not yet known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub decimals: Option<u8>,
    pub symbol: Option<String>,
    pub name: Option<String>,
}

/// Successful result of a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Raw balance in the token's smallest unit
    pub raw_balance: U256,
    /// Decimals used for formatting, 18 when unresolved
    pub decimals: u8,
    /// Resolved symbol, or the user hint
    pub symbol: String,
    /// Resolved name, or the previously known name
    pub name: String,
    /// Human readable balance
    pub balance: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The mandatory balance call (or client construction) failed
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The balance could not be represented at the resolved scale
    #[error("cannot format balance: {0}")]
    Amount(#[from] AmountError),
}
