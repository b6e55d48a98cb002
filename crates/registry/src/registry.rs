use crate::chain::{ChainDescriptor, DEFAULT_TRON_ENDPOINT, TRON_KEY};
use normalize::ChainFamily;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown chain: {0}")]
    UnknownChain(String),

    #[error("chain {key} is not an {expected} chain")]
    FamilyMismatch { key: String, expected: ChainFamily },
}

/// Ordered catalog of chain descriptors, one per key.
///
/// Every constructor and mutator re-applies the healing rules, so exactly
/// one address-model descriptor, keyed `TRON`, is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRegistry {
    chains: Vec<ChainDescriptor>,
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ChainRegistry {
    /// The built-in catalog.
    pub fn with_defaults() -> Self {
        Self::from_descriptors(default_chains())
    }

    /// Build from descriptors, later duplicates replacing earlier ones.
    pub fn from_descriptors(descriptors: Vec<ChainDescriptor>) -> Self {
        let mut registry = Self { chains: Vec::new() };
        for descriptor in descriptors {
            registry.insert_or_replace(descriptor);
        }
        registry.heal();
        registry
    }

    /// Rebuild from persisted JSON, dropping entries that cannot be sanitized.
    pub fn from_value(value: &Value) -> Option<Self> {
        let entries = value.as_array()?;
        let descriptors = entries
            .iter()
            .filter_map(ChainDescriptor::from_value)
            .collect();
        Some(Self::from_descriptors(descriptors))
    }

    pub fn get(&self, key: &str) -> Option<&ChainDescriptor> {
        self.chains.iter().find(|c| c.key == key)
    }

    pub fn list_all(&self) -> &[ChainDescriptor] {
        &self.chains
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Insert a descriptor or replace the one with the same key in place.
    pub fn upsert(&mut self, descriptor: ChainDescriptor) {
        self.insert_or_replace(descriptor);
        self.heal();
    }

    /// Merge imported descriptors by key; the import wins on conflict.
    pub fn merge(&mut self, incoming: Vec<ChainDescriptor>) {
        for descriptor in incoming {
            self.insert_or_replace(descriptor);
        }
        self.heal();
    }

    /// Replace the whole catalog.
    pub fn replace(&mut self, descriptors: Vec<ChainDescriptor>) {
        *self = Self::from_descriptors(descriptors);
    }

    pub fn set_endpoint(&mut self, key: &str, endpoint: &str) -> Result<(), RegistryError> {
        let chain = self.get_mut(key)?;
        chain.endpoint = endpoint.trim().to_string();
        self.heal();
        Ok(())
    }

    /// Override the numeric chain id of an EVM chain.
    pub fn set_chain_id(&mut self, key: &str, chain_id: u64) -> Result<(), RegistryError> {
        let chain = self.get_mut(key)?;
        if chain.family != ChainFamily::Evm {
            return Err(RegistryError::FamilyMismatch {
                key: key.to_string(),
                expected: ChainFamily::Evm,
            });
        }
        chain.chain_id = Some(chain_id);
        Ok(())
    }

    /// Set or clear the API key of an address-model chain.
    pub fn set_credential(&mut self, key: &str, credential: &str) -> Result<(), RegistryError> {
        let chain = self.get_mut(key)?;
        if chain.family != ChainFamily::AddressModel {
            return Err(RegistryError::FamilyMismatch {
                key: key.to_string(),
                expected: ChainFamily::AddressModel,
            });
        }
        let credential = credential.trim();
        chain.credential = (!credential.is_empty()).then(|| credential.to_string());
        Ok(())
    }

    fn get_mut(&mut self, key: &str) -> Result<&mut ChainDescriptor, RegistryError> {
        self.chains
            .iter_mut()
            .find(|c| c.key == key)
            .ok_or_else(|| RegistryError::UnknownChain(key.to_string()))
    }

    fn insert_or_replace(&mut self, descriptor: ChainDescriptor) {
        match self.chains.iter_mut().find(|c| c.key == descriptor.key) {
            Some(existing) => *existing = descriptor,
            None => self.chains.push(descriptor),
        }
    }

    /// `TRON` is the one address-model descriptor; any other key claiming
    /// that family is dropped.
    fn heal(&mut self) {
        self.chains.retain(|chain| {
            let extra = chain.family == ChainFamily::AddressModel && chain.key != TRON_KEY;
            if extra {
                warn!(key = %chain.key, "Dropping extra address-model chain");
            }
            !extra
        });

        for chain in &mut self.chains {
            if chain.key == TRON_KEY && chain.family != ChainFamily::AddressModel {
                debug!("Restoring TRON chain family");
                chain.family = ChainFamily::AddressModel;
            }
            match chain.family {
                ChainFamily::Evm => chain.credential = None,
                ChainFamily::AddressModel => chain.chain_id = None,
            }
            if chain.key == TRON_KEY && chain.endpoint.trim().is_empty() {
                debug!("Restoring default TRON endpoint");
                chain.endpoint = DEFAULT_TRON_ENDPOINT.to_string();
            }
        }

        if self.get(TRON_KEY).is_none() {
            warn!("Chain registry has no TRON descriptor, inserting default");
            self.chains.push(ChainDescriptor::tron());
        }
    }
}

/// Built-in chain catalog.
pub fn default_chains() -> Vec<ChainDescriptor> {
    vec![
        ChainDescriptor::evm(
            "ETH",
            "Ethereum",
            1,
            "https://ethereum.publicnode.com",
            "https://etherscan.io",
        ),
        ChainDescriptor::evm(
            "BSC",
            "BSC",
            56,
            "https://bsc-dataseed.binance.org/",
            "https://bscscan.com",
        ),
        ChainDescriptor::evm(
            "POLYGON",
            "Polygon",
            137,
            "https://polygon-rpc.com",
            "https://polygonscan.com",
        ),
        ChainDescriptor::evm(
            "ARBITRUM",
            "Arbitrum One",
            42161,
            "https://arb1.arbitrum.io/rpc",
            "https://arbiscan.io",
        ),
        ChainDescriptor::evm(
            "OPTIMISM",
            "Optimism",
            10,
            "https://mainnet.optimism.io",
            "https://optimistic.etherscan.io",
        ),
        ChainDescriptor::evm(
            "BASE",
            "Base",
            8453,
            "https://mainnet.base.org",
            "https://basescan.org",
        ),
        ChainDescriptor::evm(
            "AVAX",
            "Avalanche C-Chain",
            43114,
            "https://api.avax.network/ext/bc/C/rpc",
            "https://snowtrace.io",
        ),
        ChainDescriptor::tron(),
    ]
}
