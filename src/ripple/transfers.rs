//! Transfer extraction from XRPL transaction records
//!
//! A `Payment` yields one transfer. Drops amounts are native XRP; object
//! amounts are issued currencies keyed by currency code and issuer. Issued
//! values are decimal strings; they are scaled with integer arithmetic at
//! XRPL's own precision bound of 15 fractional digits.

use crate::encoding::{format_units, parse_units};
use crate::error::Result;
use crate::types::{Transfer, ZERO_ADDRESS};

/// Drop decimals
pub const XRP_DECIMALS: u32 = 6;

/// Fractional digits used to scale issued-currency values
pub const ISSUED_DECIMALS: u32 = 15;

/// Extract the transfer of a Payment record (`tx` method response)
pub fn extract(record: &serde_json::Value, token_symbol: &str) -> Result<Vec<Transfer>> {
    if record.get("TransactionType").and_then(|t| t.as_str()) != Some("Payment") {
        return Ok(vec![]);
    }
    let from = record
        .get("Account")
        .and_then(|a| a.as_str())
        .unwrap_or_default()
        .to_string();
    let to = record
        .get("Destination")
        .and_then(|d| d.as_str())
        .unwrap_or_default()
        .to_string();

    // Prefer the delivered amount over the requested one
    let amount = record
        .get("meta")
        .and_then(|m| m.get("delivered_amount"))
        .or_else(|| record.get("Amount"));
    let Some(amount) = amount else {
        return Ok(vec![]);
    };

    if let Some(drops) = amount.as_str() {
        let drops: u128 = drops
            .parse()
            .map_err(|_| crate::error::AdapterError::Codec(format!("bad drops: {}", drops)))?;
        return Ok(vec![Transfer {
            from,
            to,
            amount: format_units(drops, XRP_DECIMALS),
            scaled_amount: drops.to_string(),
            token: token_symbol.to_string(),
            is_native: true,
            token_address: ZERO_ADDRESS.to_string(),
        }]);
    }

    let currency = amount
        .get("currency")
        .and_then(|c| c.as_str())
        .unwrap_or_default()
        .to_string();
    let issuer = amount
        .get("issuer")
        .and_then(|i| i.as_str())
        .unwrap_or_default()
        .to_string();
    let value = amount
        .get("value")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    let scaled = parse_units(value, ISSUED_DECIMALS)?;

    Ok(vec![Transfer {
        from,
        to,
        amount: format_units(scaled, ISSUED_DECIMALS),
        scaled_amount: scaled.to_string(),
        token: currency,
        is_native: false,
        token_address: issuer,
    }])
}
