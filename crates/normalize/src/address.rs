//! Address canonicalization per chain family.
//!
//! EVM addresses are validated only; mixed-case input must carry a valid
//! EIP-55 checksum. TRON addresses arrive either as 21-byte hex (`41` prefix)
//! or as base58check display form, and are always stored in display form.

use crate::ChainFamily;
use alloy_primitives::{hex, Address};
use thiserror::Error;

/// Version byte prefixed to every TRON mainnet address.
const TRON_PREFIX: u8 = 0x41;

/// Length of a base58check encoded TRON address.
const TRON_BASE58_LEN: usize = 34;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid {family} address: {address}")]
    Invalid {
        family: ChainFamily,
        address: String,
    },
}

impl AddressError {
    fn invalid(family: ChainFamily, address: &str) -> Self {
        Self::Invalid {
            family,
            address: address.to_string(),
        }
    }
}

/// Canonicalize an address for the given family.
///
/// Never fails: input that cannot be converted is returned trimmed, and is
/// expected to be rejected by [`is_valid_address`].
pub fn normalize_address(family: ChainFamily, address: &str) -> String {
    let trimmed = address.trim();
    match family {
        ChainFamily::Evm => trimmed.to_string(),
        ChainFamily::AddressModel => match tron_hex_bytes(trimmed) {
            Some(bytes) => bs58::encode(bytes).with_check().into_string(),
            None => trimmed.to_string(),
        },
    }
}

/// Validate an address for the given family.
pub fn is_valid_address(family: ChainFamily, address: &str) -> bool {
    let trimmed = address.trim();
    match family {
        ChainFamily::Evm => is_evm_address(trimmed),
        ChainFamily::AddressModel => {
            tron_hex_bytes(trimmed).is_some() || tron_base58_bytes(trimmed).is_some()
        }
    }
}

/// Validate, returning the canonical form or an [`AddressError`].
pub fn validate_address(family: ChainFamily, address: &str) -> Result<String, AddressError> {
    let normalized = normalize_address(family, address);
    if is_valid_address(family, &normalized) {
        Ok(normalized)
    } else {
        Err(AddressError::invalid(family, address))
    }
}

/// Extract the 20-byte account part of an address of either family.
///
/// TRON contract calls ABI-encode addresses without the `41` version byte.
pub fn to_evm_address(family: ChainFamily, address: &str) -> Result<Address, AddressError> {
    let trimmed = address.trim();
    match family {
        ChainFamily::Evm if is_evm_address(trimmed) => trimmed
            .parse::<Address>()
            .map_err(|_| AddressError::invalid(family, address)),
        ChainFamily::Evm => Err(AddressError::invalid(family, address)),
        ChainFamily::AddressModel => {
            let bytes = tron_hex_bytes(trimmed)
                .or_else(|| tron_base58_bytes(trimmed))
                .ok_or_else(|| AddressError::invalid(family, address))?;
            Ok(Address::from_slice(&bytes[1..]))
        }
    }
}

fn is_evm_address(address: &str) -> bool {
    let body = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }

    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Address::parse_checksummed(format!("0x{body}"), None).is_ok();
    }
    true
}

/// `41` followed by 40 hex characters.
fn tron_hex_bytes(address: &str) -> Option<Vec<u8>> {
    if address.len() != 42 || !address.starts_with("41") {
        return None;
    }
    if !address.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    hex::decode(address).ok()
}

/// Structural check first (length, leading `T`, base58 alphabet), then the
/// base58check checksum and version byte.
fn tron_base58_bytes(address: &str) -> Option<Vec<u8>> {
    if address.len() != TRON_BASE58_LEN || !address.starts_with('T') {
        return None;
    }
    if !address.chars().all(is_base58_char) {
        return None;
    }

    let bytes = bs58::decode(address).with_check(None).into_vec().ok()?;
    (bytes.len() == 21 && bytes[0] == TRON_PREFIX).then_some(bytes)
}

const fn is_base58_char(c: char) -> bool {
    matches!(c, '1'..='9' | 'A'..='H' | 'J'..='N' | 'P'..='Z' | 'a'..='k' | 'm'..='z')
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDT_TRON: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";
    const USDT_TRON_HEX: &str = "41a614f803b6fd780986a42c78ec9c7f77e6ded13c";
    const USDT_ETH: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";

    #[test]
    fn test_evm_checksum_rules() {
        assert!(is_valid_address(ChainFamily::Evm, USDT_ETH));
        assert!(is_valid_address(ChainFamily::Evm, &USDT_ETH.to_lowercase()));
        assert!(is_valid_address(
            ChainFamily::Evm,
            "0xDAC17F958D2EE523A2206206994597C13D831EC7"
        ));
        // Mixed case with a broken checksum
        assert!(!is_valid_address(
            ChainFamily::Evm,
            "0xdac17F958D2ee523a2206206994597C13D831ec7"
        ));
        assert!(!is_valid_address(ChainFamily::Evm, "0x1234"));
        assert!(!is_valid_address(ChainFamily::Evm, USDT_TRON));
    }

    #[test]
    fn test_evm_normalization_is_idempotent() {
        let once = normalize_address(ChainFamily::Evm, &format!("  {USDT_ETH} "));
        assert_eq!(once, USDT_ETH);
        assert_eq!(normalize_address(ChainFamily::Evm, &once), once);
    }

    #[test]
    fn test_tron_hex_converts_to_display_form() {
        let display = normalize_address(ChainFamily::AddressModel, USDT_TRON_HEX);
        assert_eq!(display, USDT_TRON);
        assert_eq!(
            normalize_address(ChainFamily::AddressModel, &display),
            display
        );
    }

    #[test]
    fn test_tron_validation() {
        assert!(is_valid_address(ChainFamily::AddressModel, USDT_TRON));
        assert!(is_valid_address(ChainFamily::AddressModel, USDT_TRON_HEX));
        // Last character altered: structure intact, checksum broken
        assert!(!is_valid_address(
            ChainFamily::AddressModel,
            "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6u"
        ));
        // `0` is not in the base58 alphabet
        assert!(!is_valid_address(
            ChainFamily::AddressModel,
            "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj60"
        ));
        assert!(!is_valid_address(ChainFamily::AddressModel, USDT_ETH));
    }

    #[test]
    fn test_to_evm_address_strips_tron_prefix() {
        let from_display = to_evm_address(ChainFamily::AddressModel, USDT_TRON).unwrap();
        let from_hex = to_evm_address(ChainFamily::AddressModel, USDT_TRON_HEX).unwrap();
        assert_eq!(from_display, from_hex);
        assert_eq!(
            from_display,
            "0xa614f803b6fd780986a42c78ec9c7f77e6ded13c"
                .parse::<Address>()
                .unwrap()
        );
    }

    #[test]
    fn test_validate_address_reports_family() {
        let err = validate_address(ChainFamily::AddressModel, "nope").unwrap_err();
        assert_eq!(
            err,
            AddressError::Invalid {
                family: ChainFamily::AddressModel,
                address: "nope".to_string(),
            }
        );
    }
}
