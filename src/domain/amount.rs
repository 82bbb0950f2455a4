//! Token amount conversion between decimal text and minor units.

use alloy::primitives::U256;
use alloy::primitives::utils::{ParseUnits, format_units, parse_units};
use thiserror::Error;

/// Decimals of the native currency and of wrapped native tokens.
pub const NATIVE_DECIMALS: u8 = 18;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount {0:?} is not a decimal number")]
    Invalid(String),

    #[error("amount {0:?} is negative")]
    Negative(String),
}

/// Parse a decimal amount such as `"0.0015"` into minor units.
pub fn parse_amount(text: &str, decimals: u8) -> Result<U256, AmountError> {
    let text = text.trim();
    match parse_units(text, decimals) {
        Ok(ParseUnits::U256(value)) => Ok(value),
        Ok(ParseUnits::I256(_)) => Err(AmountError::Negative(text.to_string())),
        Err(_) => Err(AmountError::Invalid(text.to_string())),
    }
}

/// Render minor units as a decimal string for logs and reports.
pub fn format_amount(value: U256, decimals: u8) -> String {
    format_units(value, decimals).unwrap_or_else(|_| value.to_string())
}
