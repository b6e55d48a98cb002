//! Chain descriptors and the per-query chain target derived from them.

use normalize::ChainFamily;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Registry key of the single address-model chain.
pub const TRON_KEY: &str = "TRON";

/// Public TronGrid endpoint used when the TRON descriptor has none.
pub const DEFAULT_TRON_ENDPOINT: &str = "https://api.trongrid.io";

/// A user-editable chain catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDescriptor {
    /// Unique, stable identifier (e.g. `ETH`, `TRON`)
    pub key: String,
    /// Human readable name
    #[serde(rename = "name")]
    pub display_name: String,
    /// Chain family, EVM when absent
    #[serde(rename = "chainType", default)]
    pub family: ChainFamily,
    /// Numeric chain id (EVM only)
    #[serde(rename = "chainId", default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// RPC endpoint url
    #[serde(rename = "rpcUrl", default)]
    pub endpoint: String,
    /// Block explorer base url
    #[serde(default)]
    pub explorer: String,
    /// TronGrid API key (address-model only)
    #[serde(
        rename = "tronProApiKey",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub credential: Option<String>,
}

impl ChainDescriptor {
    pub fn evm(key: &str, name: &str, chain_id: u64, endpoint: &str, explorer: &str) -> Self {
        Self {
            key: key.to_string(),
            display_name: name.to_string(),
            family: ChainFamily::Evm,
            chain_id: Some(chain_id),
            endpoint: endpoint.to_string(),
            explorer: explorer.to_string(),
            credential: None,
        }
    }

    /// The canonical TRON descriptor injected when the registry lacks one.
    pub fn tron() -> Self {
        Self {
            key: TRON_KEY.to_string(),
            display_name: "TRON".to_string(),
            family: ChainFamily::AddressModel,
            chain_id: None,
            endpoint: DEFAULT_TRON_ENDPOINT.to_string(),
            explorer: "https://tronscan.org".to_string(),
            credential: None,
        }
    }

    /// Leniently rebuild a descriptor from untrusted JSON.
    ///
    /// Returns `None` for non-objects and entries without a key. Fields that
    /// do not belong to the descriptor's family are dropped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let key = obj.get("key")?.as_str()?.trim();
        if key.is_empty() {
            return None;
        }

        let text = |field: &str| {
            obj.get(field)
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default()
                .to_string()
        };

        let family = ChainFamily::from_tag(&text("chainType"));
        let display_name = match text("name") {
            name if name.is_empty() => key.to_string(),
            name => name,
        };
        let chain_id = match family {
            ChainFamily::Evm => obj.get("chainId").and_then(parse_chain_id),
            ChainFamily::AddressModel => None,
        };
        let credential = match family {
            ChainFamily::AddressModel => {
                Some(text("tronProApiKey")).filter(|c| !c.is_empty())
            }
            ChainFamily::Evm => None,
        };

        Some(Self {
            key: key.to_string(),
            display_name,
            family,
            chain_id,
            endpoint: text("rpcUrl"),
            explorer: text("explorer"),
            credential,
        })
    }

    /// Snapshot of the connection parameters a new query should carry.
    pub fn target(&self) -> ChainTarget {
        match self.family {
            ChainFamily::Evm => ChainTarget::Evm {
                endpoint: self.endpoint.clone(),
                chain_id: self.chain_id,
            },
            ChainFamily::AddressModel => ChainTarget::AddressModel {
                endpoint: self.endpoint.clone(),
                credential: self.credential.clone(),
            },
        }
    }
}

/// Accepts JSON numbers and numeric strings.
pub fn parse_chain_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Resolved connection parameters of one query, fixed at creation time.
///
/// Registry edits never reach existing queries: each query keeps its own
/// target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "chainType")]
pub enum ChainTarget {
    #[serde(rename = "EVM")]
    Evm {
        #[serde(rename = "rpcUrl")]
        endpoint: String,
        #[serde(rename = "chainId", default, skip_serializing_if = "Option::is_none")]
        chain_id: Option<u64>,
    },
    #[serde(rename = "TRON")]
    AddressModel {
        #[serde(rename = "rpcUrl")]
        endpoint: String,
        #[serde(
            rename = "tronProApiKey",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        credential: Option<String>,
    },
}

impl ChainTarget {
    pub const fn family(&self) -> ChainFamily {
        match self {
            Self::Evm { .. } => ChainFamily::Evm,
            Self::AddressModel { .. } => ChainFamily::AddressModel,
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            Self::Evm { endpoint, .. } | Self::AddressModel { endpoint, .. } => endpoint,
        }
    }
}

/// What an explorer link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Address,
    Token,
}

/// Build a block explorer link for an address or token contract.
pub fn explorer_link(
    family: ChainFamily,
    explorer: &str,
    kind: LinkKind,
    value: &str,
) -> Option<String> {
    if explorer.is_empty() || value.is_empty() {
        return None;
    }
    let base = explorer.trim_end_matches('/');
    let link = match (family, kind) {
        (ChainFamily::AddressModel, LinkKind::Token) => format!("{base}/#/contract/{value}"),
        (ChainFamily::AddressModel, LinkKind::Address) => format!("{base}/#/address/{value}"),
        (ChainFamily::Evm, LinkKind::Token) => format!("{base}/token/{value}"),
        (ChainFamily::Evm, LinkKind::Address) => format!("{base}/address/{value}"),
    };
    Some(link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_defaults() {
        let chain = ChainDescriptor::from_value(&json!({
            "key": " BSC ",
            "chainId": "56",
            "rpcUrl": "https://bsc-dataseed.binance.org/",
            "tronProApiKey": "ignored"
        }))
        .unwrap();

        assert_eq!(chain.key, "BSC");
        assert_eq!(chain.display_name, "BSC");
        assert_eq!(chain.family, ChainFamily::Evm);
        assert_eq!(chain.chain_id, Some(56));
        assert_eq!(chain.credential, None);
    }

    #[test]
    fn test_from_value_tron_drops_chain_id() {
        let chain = ChainDescriptor::from_value(&json!({
            "key": "TRON",
            "chainType": "TRON",
            "chainId": 1,
            "tronProApiKey": "secret"
        }))
        .unwrap();

        assert_eq!(chain.family, ChainFamily::AddressModel);
        assert_eq!(chain.chain_id, None);
        assert_eq!(chain.credential.as_deref(), Some("secret"));
    }

    #[test]
    fn test_from_value_rejects_keyless() {
        assert!(ChainDescriptor::from_value(&json!({ "name": "x" })).is_none());
        assert!(ChainDescriptor::from_value(&json!({ "key": "  " })).is_none());
        assert!(ChainDescriptor::from_value(&json!(["ETH"])).is_none());
    }

    #[test]
    fn test_target_serializes_with_family_tag() {
        let target = ChainDescriptor::tron().target();
        let value = serde_json::to_value(&target).unwrap();
        assert_eq!(value["chainType"], "TRON");
        assert_eq!(value["rpcUrl"], DEFAULT_TRON_ENDPOINT);
        assert!(value.get("tronProApiKey").is_none());
    }

    #[test]
    fn test_explorer_links() {
        assert_eq!(
            explorer_link(ChainFamily::Evm, "https://etherscan.io/", LinkKind::Token, "0xabc"),
            Some("https://etherscan.io/token/0xabc".to_string())
        );
        assert_eq!(
            explorer_link(
                ChainFamily::AddressModel,
                "https://tronscan.org",
                LinkKind::Address,
                "T123"
            ),
            Some("https://tronscan.org/#/address/T123".to_string())
        );
        assert_eq!(
            explorer_link(ChainFamily::Evm, "", LinkKind::Address, "0xabc"),
            None
        );
    }
}
