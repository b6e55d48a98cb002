use crate::{ChainClient, ClientError};
use alloy_primitives::{hex, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use binding::IERC20;
use normalize::{normalize_address, to_evm_address, ChainFamily};
use serde::{Deserialize, Serialize};
use tokio_retry::{strategy::ExponentialBackoff, RetryIf};
use tracing::{debug, warn};
use url::Url;

/// Header carrying the TronGrid API key.
const API_KEY_HEADER: &str = "TRON-PRO-API-KEY";

#[derive(Debug, Serialize)]
struct TriggerRequest<'a> {
    owner_address: &'a str,
    contract_address: &'a str,
    function_selector: &'static str,
    parameter: String,
    visible: bool,
}

#[derive(Debug, Default, Deserialize)]
struct TriggerResponse {
    #[serde(default)]
    result: TriggerResult,
    #[serde(default)]
    constant_result: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TriggerResult {
    #[serde(default)]
    result: bool,
    code: Option<String>,
    message: Option<String>,
}

/// TRC20 reads over the TronGrid `triggerconstantcontract` HTTP API.
#[derive(Clone)]
pub struct TronClient {
    http: reqwest::Client,
    endpoint: Url,
    credential: Option<String>,
}

impl TronClient {
    pub const fn new(http: reqwest::Client, endpoint: Url, credential: Option<String>) -> Self {
        Self {
            http,
            endpoint,
            credential,
        }
    }

    fn trigger_url(&self) -> String {
        format!(
            "{}/wallet/triggerconstantcontract",
            self.endpoint.as_str().trim_end_matches('/')
        )
    }

    /// Execute a constant (view) call and decode its return value.
    async fn call<C: SolCall>(
        &self,
        owner: &str,
        contract: &str,
        call: C,
    ) -> Result<C::Return, ClientError> {
        // Reject malformed addresses before touching the network
        to_evm_address(ChainFamily::AddressModel, owner)?;
        to_evm_address(ChainFamily::AddressModel, contract)?;
        let owner = normalize_address(ChainFamily::AddressModel, owner);
        let contract = normalize_address(ChainFamily::AddressModel, contract);

        let request = build_request(&owner, &contract, &call);
        debug!(
            contract = %contract,
            selector = C::SIGNATURE,
            "Triggering TRON constant call"
        );

        let strategy = ExponentialBackoff::from_millis(100).take(2);
        let response = RetryIf::start(
            strategy,
            || self.post(&request),
            |e: &ClientError| {
                let retry = e.is_transient();
                if retry {
                    warn!(error = %e, "TRON request failed, retrying");
                }
                retry
            },
        )
        .await?;

        decode_response::<C>(response)
    }

    async fn post(&self, request: &TriggerRequest<'_>) -> Result<TriggerResponse, ClientError> {
        let mut builder = self.http.post(self.trigger_url()).json(request);
        if let Some(key) = &self.credential {
            builder = builder.header(API_KEY_HEADER, key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Transport(format!("HTTP {status}")));
        }

        response
            .json::<TriggerResponse>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

fn build_request<'a, C: SolCall>(owner: &'a str, contract: &'a str, call: &C) -> TriggerRequest<'a> {
    let encoded = call.abi_encode();
    TriggerRequest {
        owner_address: owner,
        contract_address: contract,
        function_selector: C::SIGNATURE,
        // The node prepends the selector itself
        parameter: hex::encode(&encoded[4..]),
        visible: true,
    }
}

fn decode_response<C: SolCall>(response: TriggerResponse) -> Result<C::Return, ClientError> {
    if !response.result.result {
        let message = response
            .result
            .message
            .as_deref()
            .map(decode_message)
            .or(response.result.code)
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(ClientError::Reverted(message));
    }

    let data = response
        .constant_result
        .first()
        .ok_or_else(|| ClientError::Decode("empty constant_result".to_string()))?;
    let bytes = hex::decode(data).map_err(|e| ClientError::Decode(e.to_string()))?;

    C::abi_decode_returns(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

/// TronGrid hex-encodes error messages; fall back to the raw text.
fn decode_message(message: &str) -> String {
    hex::decode(message)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| message.to_string())
}

#[async_trait]
impl ChainClient for TronClient {
    fn family(&self) -> ChainFamily {
        ChainFamily::AddressModel
    }

    async fn balance_of(&self, token: &str, holder: &str) -> Result<U256, ClientError> {
        let account = to_evm_address(ChainFamily::AddressModel, holder)?;
        self.call(holder, token, IERC20::balanceOfCall { account })
            .await
    }

    async fn decimals(&self, token: &str) -> Result<u8, ClientError> {
        self.call(token, token, IERC20::decimalsCall {}).await
    }

    async fn symbol(&self, token: &str) -> Result<String, ClientError> {
        self.call(token, token, IERC20::symbolCall {}).await
    }

    async fn name(&self, token: &str) -> Result<String, ClientError> {
        self.call(token, token, IERC20::nameCall {}).await
    }
}
