use crate::{ChainClient, ClientError, EvmClient, TronClient};
use normalize::{normalize_endpoint, ChainFamily};
use parking_lot::Mutex;
use registry::ChainTarget;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tracing::debug;
use url::Url;

/// Identity of a memoized client handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientKey {
    Evm {
        endpoint: String,
        chain_id: Option<u64>,
    },
    AddressModel {
        endpoint: String,
        credential: Option<String>,
    },
}

impl ClientKey {
    pub const fn family(&self) -> ChainFamily {
        match self {
            Self::Evm { .. } => ChainFamily::Evm,
            Self::AddressModel { .. } => ChainFamily::AddressModel,
        }
    }
}

/// Constructs client handles for the cache.
pub trait ClientFactory: Send + Sync {
    fn evm(&self, endpoint: Url, chain_id: Option<u64>) -> Result<Arc<dyn ChainClient>, ClientError>;

    fn address_model(
        &self,
        endpoint: Url,
        credential: Option<String>,
    ) -> Result<Arc<dyn ChainClient>, ClientError>;
}

/// Factory for real network clients.
#[derive(Clone)]
pub struct RpcClientFactory {
    http: reqwest::Client,
}

impl RpcClientFactory {
    pub fn new(request_timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ClientError::Other(e.to_string()))?;
        Ok(Self { http })
    }
}

impl ClientFactory for RpcClientFactory {
    fn evm(&self, endpoint: Url, chain_id: Option<u64>) -> Result<Arc<dyn ChainClient>, ClientError> {
        Ok(Arc::new(EvmClient::connect(endpoint, chain_id)))
    }

    fn address_model(
        &self,
        endpoint: Url,
        credential: Option<String>,
    ) -> Result<Arc<dyn ChainClient>, ClientError> {
        Ok(Arc::new(TronClient::new(
            self.http.clone(),
            endpoint,
            credential,
        )))
    }
}

/// Append-only memo of client handles.
///
/// Entries are never evicted or mutated: an edited endpoint or credential
/// simply produces a different key, and the stale handle is never looked up
/// again. Lookup and insert happen under one lock, so concurrent callers
/// asking for the same key share one handle.
pub struct ClientCache {
    factory: Arc<dyn ClientFactory>,
    clients: Mutex<HashMap<ClientKey, Arc<dyn ChainClient>>>,
}

impl ClientCache {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            factory,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn evm_client(
        &self,
        endpoint: &str,
        chain_id: Option<u64>,
    ) -> Result<Arc<dyn ChainClient>, ClientError> {
        let url = normalize_endpoint(endpoint)?;
        let key = ClientKey::Evm {
            endpoint: url.to_string(),
            chain_id,
        };
        self.get_or_insert(key, || self.factory.evm(url, chain_id))
    }

    pub fn address_model_client(
        &self,
        endpoint: &str,
        credential: Option<&str>,
    ) -> Result<Arc<dyn ChainClient>, ClientError> {
        let url = normalize_endpoint(endpoint)?;
        let credential = credential
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        let key = ClientKey::AddressModel {
            endpoint: url.to_string(),
            credential: credential.clone(),
        };
        self.get_or_insert(key, || self.factory.address_model(url, credential))
    }

    /// Client for a query's resolved chain target.
    pub fn client_for(&self, target: &ChainTarget) -> Result<Arc<dyn ChainClient>, ClientError> {
        match target {
            ChainTarget::Evm { endpoint, chain_id } => self.evm_client(endpoint, *chain_id),
            ChainTarget::AddressModel {
                endpoint,
                credential,
            } => self.address_model_client(endpoint, credential.as_deref()),
        }
    }

    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }

    fn get_or_insert(
        &self,
        key: ClientKey,
        build: impl FnOnce() -> Result<Arc<dyn ChainClient>, ClientError>,
    ) -> Result<Arc<dyn ChainClient>, ClientError> {
        let mut clients = self.clients.lock();
        if let Some(client) = clients.get(&key) {
            return Ok(Arc::clone(client));
        }

        debug!(family = %key.family(), "Constructing chain client");
        let client = build()?;
        clients.insert(key, Arc::clone(&client));
        Ok(client)
    }
}
