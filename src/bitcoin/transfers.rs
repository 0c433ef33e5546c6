//! Transfer extraction from verbose Bitcoin transactions
//!
//! One transfer is produced per (input address, output address) pair where
//! both sides carry an address; OP_RETURN and other addressless outputs are
//! skipped. The aggregate fee (Σ inputs − Σ outputs) is logged, not emitted.

use tracing::debug;

use super::client::{btc_to_sats, VerboseTransaction};
use crate::encoding::format_units;
use crate::error::Result;
use crate::types::{Transfer, ZERO_ADDRESS};

/// Satoshi decimals
pub const BTC_DECIMALS: u32 = 8;

/// Extract normalized transfers from a verbose transaction record
pub fn extract(tx: &VerboseTransaction, token_symbol: &str) -> Result<Vec<Transfer>> {
    let mut input_addresses = Vec::new();
    let mut total_in: u64 = 0;
    for vin in &tx.vin {
        let Some(prevout) = &vin.prevout else {
            // Coinbase inputs have no previous output
            continue;
        };
        total_in = total_in.saturating_add(btc_to_sats(prevout.value)?);
        if let Some(address) = &prevout.script_pub_key.address {
            if !input_addresses.contains(address) {
                input_addresses.push(address.clone());
            }
        }
    }

    let mut transfers = Vec::new();
    let mut total_out: u64 = 0;
    for vout in &tx.vout {
        let sats = btc_to_sats(vout.value)?;
        total_out = total_out.saturating_add(sats);
        let Some(to) = &vout.script_pub_key.address else {
            continue;
        };
        for from in &input_addresses {
            transfers.push(Transfer {
                from: from.clone(),
                to: to.clone(),
                amount: format_units(sats as u128, BTC_DECIMALS),
                scaled_amount: sats.to_string(),
                token: token_symbol.to_string(),
                is_native: true,
                token_address: ZERO_ADDRESS.to_string(),
            });
        }
    }

    debug!(
        txid = %tx.txid,
        fee_sats = total_in.saturating_sub(total_out),
        transfers = transfers.len(),
        "Extracted bitcoin transfers"
    );
    Ok(transfers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitcoin::client::VerboseTransaction;

    fn verbose(value: serde_json::Value) -> VerboseTransaction {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_simple_spend() {
        let tx = verbose(serde_json::json!({
            "txid": "aa",
            "confirmations": 5,
            "vin": [{
                "txid": "bb", "vout": 0,
                "prevout": {
                    "value": 1.0,
                    "scriptPubKey": { "address": "1Sender", "hex": "" }
                }
            }],
            "vout": [
                { "value": 0.75, "n": 0, "scriptPubKey": { "address": "1Recipient", "hex": "" } },
                { "value": 0.2499, "n": 1, "scriptPubKey": { "address": "1Sender", "hex": "" } }
            ]
        }));

        let transfers = extract(&tx, "BTC").unwrap();
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].from, "1Sender");
        assert_eq!(transfers[0].to, "1Recipient");
        assert_eq!(transfers[0].amount, "0.75000000");
        assert_eq!(transfers[0].scaled_amount, "75000000");
        assert!(transfers[0].is_native);
        assert_eq!(transfers[0].token_address, ZERO_ADDRESS);
    }

    #[test]
    fn test_op_return_output_skipped() {
        let tx = verbose(serde_json::json!({
            "txid": "aa",
            "vin": [{
                "txid": "bb", "vout": 0,
                "prevout": {
                    "value": 0.001,
                    "scriptPubKey": { "address": "1Sender", "hex": "" }
                }
            }],
            "vout": [
                { "value": 0.0, "n": 0, "scriptPubKey": { "hex": "6a0474657374" } }
            ]
        }));

        assert!(extract(&tx, "BTC").unwrap().is_empty());
    }

    #[test]
    fn test_coinbase_input_skipped() {
        let tx = verbose(serde_json::json!({
            "txid": "aa",
            "vin": [{ "coinbase": "04ffff001d" }],
            "vout": [
                { "value": 50.0, "n": 0, "scriptPubKey": { "address": "1Miner", "hex": "" } }
            ]
        }));

        // No input address, so no (from, to) pair exists
        assert!(extract(&tx, "BTC").unwrap().is_empty());
    }
}
