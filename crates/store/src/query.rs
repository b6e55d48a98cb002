//! The tracked query entity and its creation rules.

use crate::{
    project::{normalize_project_name, DEFAULT_PROJECT},
    user::new_id,
};
use balance::{AlertConfig, AlertDirection, FetchRequest, TokenMetadata};
use chrono::{DateTime, Utc};
use normalize::{
    normalize_address, normalize_endpoint, validate_address, validate_amount, AddressError,
    AmountError, ChainFamily, EndpointError,
};
use registry::{
    chain::parse_chain_id, find_preset, ChainRegistry, ChainTarget, TRON_KEY,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CreateError {
    #[error(transparent)]
    InvalidAddress(#[from] AddressError),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] EndpointError),

    #[error("unknown chain: {0}")]
    UnknownChain(String),

    #[error("invalid alert threshold: {0}")]
    InvalidAmount(#[from] AmountError),
}

/// User input for a new query.
///
/// Connection fields left `None` are taken from the registry descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewQuery {
    pub chain_key: String,
    pub endpoint: Option<String>,
    pub chain_id: Option<u64>,
    pub credential: Option<String>,
    pub holder: String,
    pub token: String,
    pub symbol_hint: String,
    pub project_name: Option<String>,
    pub alert: AlertConfig,
}

/// One tracked (chain, holder, token) balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEntity {
    pub id: String,
    pub project_name: String,
    pub chain_key: String,
    pub chain_name: String,
    /// Connection snapshot taken at creation
    #[serde(flatten)]
    pub target: ChainTarget,
    #[serde(default)]
    pub explorer: String,
    pub holder_address: String,
    pub token_address: String,
    /// Symbol typed by the user
    #[serde(rename = "symbolInput", default)]
    pub symbol_hint: String,
    #[serde(default)]
    pub symbol_resolved: String,
    #[serde(default)]
    pub name_resolved: String,
    /// Authoritative once set; never re-queried
    #[serde(default)]
    pub decimals: Option<u8>,
    #[serde(default)]
    pub balance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(rename = "loading", default)]
    pub is_loading: bool,
    #[serde(rename = "error", default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default)]
    pub alert: AlertConfig,
    #[serde(rename = "alerting", default)]
    pub is_alerting: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_triggered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl QueryEntity {
    /// Validate user input against the registry and build a fresh entity.
    ///
    /// The project name is normalized here; the caller is responsible for
    /// adding it to the project catalog.
    pub fn create(input: NewQuery, registry: &ChainRegistry) -> Result<Self, CreateError> {
        let chain = registry
            .get(input.chain_key.trim())
            .ok_or_else(|| CreateError::UnknownChain(input.chain_key.clone()))?;
        let family = chain.family;

        let endpoint = input
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(&chain.endpoint)
            .to_string();
        normalize_endpoint(&endpoint)?;

        let holder = validate_address(family, &input.holder)?;
        let token = validate_address(family, &input.token)?;

        let threshold = input.alert.threshold.trim().to_string();
        if !threshold.is_empty() {
            validate_amount(&threshold)?;
        }

        let target = match family {
            ChainFamily::Evm => ChainTarget::Evm {
                endpoint,
                chain_id: input.chain_id.or(chain.chain_id),
            },
            ChainFamily::AddressModel => ChainTarget::AddressModel {
                endpoint,
                credential: input
                    .credential
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .or_else(|| chain.credential.clone()),
            },
        };

        let preset = find_preset(&chain.key, family, &token);

        Ok(Self {
            id: new_id(),
            project_name: normalize_project_name(input.project_name.as_deref().unwrap_or_default()),
            chain_key: chain.key.clone(),
            chain_name: chain.display_name.clone(),
            target,
            explorer: chain.explorer.clone(),
            holder_address: holder,
            token_address: token,
            symbol_hint: input.symbol_hint.trim().to_string(),
            symbol_resolved: preset.map(|p| p.symbol.to_string()).unwrap_or_default(),
            name_resolved: preset.map(|p| p.name.to_string()).unwrap_or_default(),
            decimals: None,
            balance: String::new(),
            last_updated: None,
            is_loading: false,
            last_error: None,
            alert: AlertConfig {
                threshold,
                ..input.alert
            },
            is_alerting: false,
            alert_triggered_at: None,
            created_at: Some(Utc::now()),
        })
    }

    /// Leniently rebuild an entity from persisted or imported JSON.
    ///
    /// Returns `None` only for non-objects. Fields of the wrong type count
    /// as absent, a missing id is generated, the family is inferred from the
    /// chain key when absent, TRON addresses are re-normalized and no fetch
    /// is considered in flight.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |field: &str| trimmed(obj, field);

        let chain_key = text("chainKey");
        let family = match text("chainType").as_str() {
            "TRON" => ChainFamily::AddressModel,
            _ if chain_key == TRON_KEY => ChainFamily::AddressModel,
            _ => ChainFamily::Evm,
        };

        let endpoint = text("rpcUrl");
        let target = match family {
            ChainFamily::Evm => ChainTarget::Evm {
                endpoint,
                chain_id: obj.get("chainId").and_then(parse_chain_id),
            },
            ChainFamily::AddressModel => ChainTarget::AddressModel {
                endpoint,
                credential: Some(text("tronProApiKey")).filter(|c| !c.is_empty()),
            },
        };

        let id = match obj.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => new_id(),
        };
        let chain_name = match text("chainName") {
            name if !name.is_empty() => name,
            _ if !chain_key.is_empty() => chain_key.clone(),
            _ => "CHAIN".to_string(),
        };
        let decimals = obj
            .get("decimals")
            .and_then(Value::as_u64)
            .and_then(|d| u8::try_from(d).ok());

        Some(Self {
            id,
            project_name: normalize_project_name(&text("projectName")),
            chain_key,
            chain_name,
            target,
            explorer: text("explorer"),
            holder_address: normalize_address(family, &text("holderAddress")),
            token_address: normalize_address(family, &text("tokenAddress")),
            symbol_hint: text("symbolInput"),
            symbol_resolved: text("symbolResolved"),
            name_resolved: text("nameResolved"),
            decimals,
            balance: raw(obj, "balance"),
            last_updated: timestamp(obj, "lastUpdated"),
            is_loading: false,
            last_error: Some(raw(obj, "error")).filter(|e| !e.is_empty()),
            alert: obj.get("alert").map(alert_from_value).unwrap_or_default(),
            is_alerting: obj.get("alerting").and_then(Value::as_bool).unwrap_or(false),
            alert_triggered_at: timestamp(obj, "alertTriggeredAt"),
            created_at: timestamp(obj, "createdAt"),
        })
    }

    pub const fn family(&self) -> ChainFamily {
        self.target.family()
    }

    /// Project name with the default applied.
    pub fn project(&self) -> &str {
        match self.project_name.trim() {
            "" => DEFAULT_PROJECT,
            name => name,
        }
    }

    /// Resolved symbol, falling back to the user's hint.
    pub fn display_symbol(&self) -> &str {
        if self.symbol_resolved.is_empty() {
            &self.symbol_hint
        } else {
            &self.symbol_resolved
        }
    }

    /// Everything the fetcher needs, with cached metadata reused.
    pub fn fetch_request(&self) -> FetchRequest {
        FetchRequest {
            id: self.id.clone(),
            target: self.target.clone(),
            holder: self.holder_address.clone(),
            token: self.token_address.clone(),
            cached: TokenMetadata {
                decimals: self.decimals,
                symbol: Some(self.symbol_resolved.clone()).filter(|s| !s.is_empty()),
                name: Some(self.name_resolved.clone()).filter(|s| !s.is_empty()),
            },
            symbol_hint: self.symbol_hint.clone(),
        }
    }
}

fn raw(obj: &Map<String, Value>, field: &str) -> String {
    obj.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn trimmed(obj: &Map<String, Value>, field: &str) -> String {
    raw(obj, field).trim().to_string()
}

fn timestamp(obj: &Map<String, Value>, field: &str) -> Option<DateTime<Utc>> {
    let value = obj.get(field)?.as_str()?;
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn alert_from_value(value: &Value) -> AlertConfig {
    let Some(obj) = value.as_object() else {
        return AlertConfig::default();
    };
    AlertConfig {
        enabled: obj.get("enabled").and_then(Value::as_bool).unwrap_or(false),
        direction: match obj.get("direction").and_then(Value::as_str) {
            Some("above") => AlertDirection::Above,
            _ => AlertDirection::Below,
        },
        threshold: raw(obj, "threshold"),
    }
}
