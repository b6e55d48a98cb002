//! Fixed-point amount conversion.
//!
//! Balances and thresholds are compared as raw `U256` integers scaled by the
//! token's decimals. Floating point never enters the path.

use alloy_primitives::U256;
use std::{cmp::Ordering, fmt};
use thiserror::Error;

/// Decimals assumed when a token does not report any.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Largest scale for which `10^decimals` still fits in a `U256`.
pub const MAX_DECIMALS: u8 = 77;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("empty amount")]
    Empty,

    #[error("invalid amount: {0}")]
    Malformed(String),

    #[error("amount {amount} has more than {decimals} fractional digits")]
    TooPrecise { amount: String, decimals: u8 },

    #[error("amount {0} overflows 256 bits")]
    Overflow(String),

    #[error("unsupported decimals: {0}")]
    UnsupportedDecimals(u8),
}

fn scale(decimals: u8) -> Result<U256, AmountError> {
    if decimals > MAX_DECIMALS {
        return Err(AmountError::UnsupportedDecimals(decimals));
    }
    Ok(U256::from(10u64).pow(U256::from(decimals)))
}

fn digits_to_u256(digits: &str, original: &str) -> Result<U256, AmountError> {
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10).map_err(|_| AmountError::Overflow(original.to_string()))
}

/// Split a trimmed numeral into its whole and fractional digits.
fn split_numeral(trimmed: &str) -> Result<(&str, &str), AmountError> {
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(AmountError::Malformed(trimmed.to_string()));
    }
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) {
        return Err(AmountError::Malformed(trimmed.to_string()));
    }
    Ok((whole, fraction))
}

/// Check that `amount` is a non-negative decimal numeral, whatever the scale.
pub fn validate_amount(amount: &str) -> Result<(), AmountError> {
    split_numeral(amount.trim()).map(|_| ())
}

/// Parse a non-negative decimal numeral into its fixed-point representation.
///
/// Accepts `"12"`, `"12.5"`, `".5"` and `"12."`. Trailing fractional zeros
/// beyond the scale are tolerated (`"1.500"` at 1 decimal), any other excess
/// precision is rejected rather than truncated.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let trimmed = amount.trim();
    let (whole, fraction) = split_numeral(trimmed)?;

    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(AmountError::TooPrecise {
            amount: trimmed.to_string(),
            decimals,
        });
    }

    let multiplier = scale(decimals)?;
    let whole = digits_to_u256(whole, trimmed)?
        .checked_mul(multiplier)
        .ok_or_else(|| AmountError::Overflow(trimmed.to_string()))?;

    let padded = format!("{fraction:0<width$}", width = decimals as usize);
    let fraction = digits_to_u256(&padded, trimmed)?;

    whole
        .checked_add(fraction)
        .ok_or_else(|| AmountError::Overflow(trimmed.to_string()))
}

/// Format a fixed-point integer as a human decimal string.
///
/// Trailing fractional zeros are dropped but one fractional digit is kept
/// (`1.0`, `0.5`); zero decimals produce a bare integer.
pub fn format_units(value: U256, decimals: u8) -> Result<String, AmountError> {
    let multiplier = scale(decimals)?;
    let (whole, remainder) = value.div_rem(multiplier);
    if decimals == 0 {
        return Ok(whole.to_string());
    }

    let fraction = format!(
        "{:0>width$}",
        remainder.to_string(),
        width = decimals as usize
    );
    let fraction = fraction.trim_end_matches('0');
    let fraction = if fraction.is_empty() { "0" } else { fraction };

    Ok(format!("{whole}.{fraction}"))
}

/// A raw integer amount together with its scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPoint {
    pub raw: U256,
    pub decimals: u8,
}

impl FixedPoint {
    pub const fn new(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    pub fn parse(amount: &str, decimals: u8) -> Result<Self, AmountError> {
        Ok(Self::new(parse_units(amount, decimals)?, decimals))
    }

    /// The same value at a finer scale; `None` if `decimals` is coarser or unsupported.
    pub fn widen(self, decimals: u8) -> Option<Self> {
        let factor = scale(decimals.checked_sub(self.decimals)?).ok()?;
        self.raw
            .checked_mul(factor)
            .map(|raw| Self::new(raw, decimals))
    }

    /// Sum at the larger of the two scales; `None` on overflow.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        let common = self.decimals.max(other.decimals);
        let (own, theirs) = (self.widen(common)?, other.widen(common)?);
        own.raw
            .checked_add(theirs.raw)
            .map(|raw| Self::new(raw, common))
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    /// Compare the represented values, whatever their scales.
    pub fn cmp_value(&self, other: &Self) -> Ordering {
        let (Ok(own), Ok(theirs)) = (scale(self.decimals), scale(other.decimals)) else {
            return self.raw.cmp(&other.raw);
        };
        let (own_whole, own_fraction) = self.raw.div_rem(own);
        let (their_whole, their_fraction) = other.raw.div_rem(theirs);

        own_whole.cmp(&their_whole).then_with(|| {
            // Both fractions widened to the larger scale stay below 10^77
            let common = self.decimals.max(other.decimals);
            let widen = |fraction: U256, decimals: u8| {
                fraction * U256::from(10u64).pow(U256::from(common - decimals))
            };
            widen(own_fraction, self.decimals).cmp(&widen(their_fraction, other.decimals))
        })
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match format_units(self.raw, self.decimals) {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "{}e-{}", self.raw, self.decimals),
        }
    }
}
