use crate::{ChainClient, ClientError};
use alloy_primitives::{Address, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use async_trait::async_trait;
use binding::IERC20;
use normalize::{normalize_endpoint, to_evm_address, ChainFamily};
use tracing::debug;
use url::Url;

/// Convenience function to create an ethereum rpc provider from url.
pub fn create_provider(rpc_url: &str) -> Result<DynProvider, ClientError> {
    let url = normalize_endpoint(rpc_url)?;
    Ok(connect(url))
}

fn connect(url: Url) -> DynProvider {
    ProviderBuilder::new().connect_http(url).erased()
}

/// ERC20 reads over JSON-RPC `eth_call`.
#[derive(Clone)]
pub struct EvmClient {
    provider: DynProvider,
    chain_id: Option<u64>,
}

impl EvmClient {
    pub const fn new(provider: DynProvider, chain_id: Option<u64>) -> Self {
        Self { provider, chain_id }
    }

    /// Build a client for an already normalized endpoint.
    pub fn connect(url: Url, chain_id: Option<u64>) -> Self {
        Self::new(connect(url), chain_id)
    }

    pub const fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    fn contract(&self, token: &str) -> Result<IERC20::IERC20Instance<&DynProvider>, ClientError> {
        let token = parse(token)?;
        Ok(IERC20::new(token, &self.provider))
    }
}

fn parse(address: &str) -> Result<Address, ClientError> {
    Ok(to_evm_address(ChainFamily::Evm, address)?)
}

fn transport(e: alloy_contract::Error) -> ClientError {
    ClientError::Transport(e.to_string())
}

#[async_trait]
impl ChainClient for EvmClient {
    fn family(&self) -> ChainFamily {
        ChainFamily::Evm
    }

    async fn balance_of(&self, token: &str, holder: &str) -> Result<U256, ClientError> {
        debug!(chain_id = ?self.chain_id, "Querying erc20 {} balance: address={}", token, holder);

        let holder = parse(holder)?;
        self.contract(token)?
            .balanceOf(holder)
            .call()
            .await
            .map_err(transport)
    }

    async fn decimals(&self, token: &str) -> Result<u8, ClientError> {
        self.contract(token)?.decimals().call().await.map_err(transport)
    }

    async fn symbol(&self, token: &str) -> Result<String, ClientError> {
        self.contract(token)?.symbol().call().await.map_err(transport)
    }

    async fn name(&self, token: &str) -> Result<String, ClientError> {
        self.contract(token)?.name().call().await.map_err(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url() {
        assert!(create_provider("not a url").is_err());
        assert!(create_provider("ftp://node.example").is_err());
    }

    #[tokio::test]
    async fn test_invalid_address_fails_before_request() {
        let client = EvmClient::connect("http://127.0.0.1:1".parse().unwrap(), Some(1));
        let err = client.balance_of("0x1234", "0x1234").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidAddress(_)));
        assert_eq!(client.chain_id(), Some(1));
    }
}
