//! Transfer extraction from Horizon operation records
//!
//! `payment` and the two path-payment kinds yield transfers; native XLM is
//! asset type `native`, everything else a credit asset keyed by code and
//! issuer.

use crate::encoding::parse_units;
use crate::error::Result;
use crate::types::{Transfer, ZERO_ADDRESS};

/// Stroop decimals
pub const XLM_DECIMALS: u32 = 7;

/// Extract transfers from the operations of one transaction
pub fn extract(records: &[serde_json::Value], token_symbol: &str) -> Result<Vec<Transfer>> {
    let mut transfers = Vec::new();
    for record in records {
        let op_type = record.get("type").and_then(|t| t.as_str()).unwrap_or("");
        if !matches!(
            op_type,
            "payment" | "path_payment_strict_receive" | "path_payment_strict_send"
        ) {
            continue;
        }

        let amount = record
            .get("amount")
            .and_then(|a| a.as_str())
            .unwrap_or_default();
        // Horizon renders amounts with all seven decimals
        let scaled = parse_units(amount, XLM_DECIMALS)?;
        let from = record
            .get("from")
            .and_then(|f| f.as_str())
            .unwrap_or_default()
            .to_string();
        let to = record
            .get("to")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string();

        let is_native =
            record.get("asset_type").and_then(|a| a.as_str()) == Some("native");
        if is_native {
            transfers.push(Transfer {
                from,
                to,
                amount: amount.to_string(),
                scaled_amount: scaled.to_string(),
                token: token_symbol.to_string(),
                is_native: true,
                token_address: ZERO_ADDRESS.to_string(),
            });
        } else {
            transfers.push(Transfer {
                from,
                to,
                amount: amount.to_string(),
                scaled_amount: scaled.to_string(),
                token: record
                    .get("asset_code")
                    .and_then(|c| c.as_str())
                    .unwrap_or_default()
                    .to_string(),
                is_native: false,
                token_address: record
                    .get("asset_issuer")
                    .and_then(|i| i.as_str())
                    .unwrap_or_default()
                    .to_string(),
            });
        }
    }
    Ok(transfers)
}
