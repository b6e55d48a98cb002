//! Chain clients for token balance queries.
//!
//! Both chain families are driven through the [`ChainClient`] capability
//! trait. Handles are memoized by [`ClientCache`], keyed by family,
//! normalized endpoint and credential.

mod cache;
mod evm;
mod tron;

pub use cache::{ClientCache, ClientFactory, ClientKey, RpcClientFactory};
pub use evm::{create_provider, EvmClient};
pub use tron::TronClient;

use alloy_primitives::U256;
use async_trait::async_trait;
use normalize::{AddressError, ChainFamily, EndpointError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Error parsing or validating URLs
    #[error("Invalid RPC URL: {0}")]
    InvalidUrl(#[from] EndpointError),

    /// Address rejected before any request was made
    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    /// Request could not be delivered or the node answered with an error
    #[error("Transport error: {0}")]
    Transport(String),

    /// The contract call executed but did not succeed
    #[error("Contract call failed: {0}")]
    Reverted(String),

    /// The node answered with data that does not match the ABI
    #[error("Decode error: {0}")]
    Decode(String),

    /// General error with context
    #[error("Client error: {0}")]
    Other(String),
}

impl ClientError {
    /// Whether retrying the same request may succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Read-only token capabilities shared by every chain family.
///
/// Addresses are passed in their family's canonical string form.
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn family(&self) -> ChainFamily;

    /// Query the token balance of `holder`.
    async fn balance_of(&self, token: &str, holder: &str) -> Result<U256, ClientError>;

    async fn decimals(&self, token: &str) -> Result<u8, ClientError>;

    async fn symbol(&self, token: &str) -> Result<String, ClientError>;

    async fn name(&self, token: &str) -> Result<String, ClientError>;
}
