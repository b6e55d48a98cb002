//! Chain-family aware input normalization.
//!
//! This crate provides:
//! - Address canonicalization and validation for EVM and TRON-style chains
//! - Fixed-point amount parsing/formatting by token decimals
//! - RPC endpoint normalization used for client cache keys

pub mod address;
pub mod endpoint;
pub mod units;

pub use address::{
    is_valid_address, normalize_address, to_evm_address, validate_address, AddressError,
};
pub use endpoint::{normalize_endpoint, EndpointError};
pub use units::{
    format_units, parse_units, validate_amount, AmountError, FixedPoint, DEFAULT_DECIMALS,
    MAX_DECIMALS,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two structurally different chain families a query can target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainFamily {
    /// Account-model chains queried through JSON-RPC `eth_call`.
    #[default]
    #[serde(rename = "EVM")]
    Evm,
    /// TRON-style chains with base58 display addresses.
    #[serde(rename = "TRON")]
    AddressModel,
}

impl ChainFamily {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Evm => "EVM",
            Self::AddressModel => "TRON",
        }
    }

    /// Lenient tag parsing: anything that is not `TRON` is treated as EVM.
    pub fn from_tag(tag: &str) -> Self {
        if tag.trim() == "TRON" {
            Self::AddressModel
        } else {
            Self::Evm
        }
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
