//! Fixed-point amount conversion
//!
//! On-chain integer amounts are converted to and from decimal strings with
//! pure integer arithmetic. Floating point is never involved: `u128` covers
//! every smallest-unit amount the supported chains can express, and the
//! formatted string always carries exactly `decimals` fractional digits so
//! that `parse(amount) * 10^decimals == scaled_amount` holds bit-exact.

use crate::error::{AdapterError, Result};

/// Format a smallest-unit integer amount as a decimal string with exactly
/// `decimals` fractional digits
pub fn format_units(value: u128, decimals: u32) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let divisor = 10u128.pow(decimals);
    let whole = value / divisor;
    let frac = value % divisor;
    format!("{}.{:0width$}", whole, frac, width = decimals as usize)
}

/// Parse a decimal string into a smallest-unit integer amount
///
/// Rejects empty input, signs, exponents, and fractions finer than
/// `decimals`. `"1"`, `"1."` and `"1.0"` all parse to `10^decimals`.
pub fn parse_units(text: &str, decimals: u32) -> Result<u128> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AdapterError::InvalidInput("empty amount".into()));
    }

    let (whole_str, frac_str) = match text.split_once('.') {
        Some((w, f)) => (w, f),
        None => (text, ""),
    };

    if whole_str.is_empty() && frac_str.is_empty() {
        return Err(AdapterError::InvalidInput(format!(
            "malformed amount: {}",
            text
        )));
    }
    if !whole_str.chars().all(|c| c.is_ascii_digit())
        || !frac_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(AdapterError::InvalidInput(format!(
            "non-numeric amount: {}",
            text
        )));
    }
    if frac_str.len() > decimals as usize {
        return Err(AdapterError::InvalidInput(format!(
            "amount {} has more than {} fractional digits",
            text, decimals
        )));
    }

    let whole: u128 = if whole_str.is_empty() {
        0
    } else {
        whole_str
            .parse()
            .map_err(|_| AdapterError::InvalidInput(format!("amount overflow: {}", text)))?
    };

    // Right-pad the fraction to `decimals` digits before combining
    let mut frac: u128 = 0;
    if !frac_str.is_empty() {
        frac = frac_str
            .parse()
            .map_err(|_| AdapterError::InvalidInput(format!("amount overflow: {}", text)))?;
        frac *= 10u128.pow(decimals - frac_str.len() as u32);
    }

    whole
        .checked_mul(10u128.pow(decimals))
        .and_then(|scaled| scaled.checked_add(frac))
        .ok_or_else(|| AdapterError::InvalidInput(format!("amount overflow: {}", text)))
}
