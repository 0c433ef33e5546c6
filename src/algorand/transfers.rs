//! Transfer extraction from indexer transaction records

use serde::Deserialize;

use crate::encoding::format_units;
use crate::error::{AdapterError, Result};
use crate::types::{Transfer, ZERO_ADDRESS};

/// microAlgo decimals
pub const ALGO_DECIMALS: u32 = 6;

/// Indexer transaction record (the fields the extractor reads)
#[derive(Debug, Clone, Deserialize)]
pub struct IndexerTransaction {
    pub sender: String,
    #[serde(rename = "tx-type")]
    pub tx_type: String,
    #[serde(rename = "payment-transaction")]
    pub payment: Option<PaymentFields>,
    #[serde(rename = "asset-transfer-transaction")]
    pub asset_transfer: Option<AssetTransferFields>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentFields {
    pub amount: u64,
    pub receiver: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetTransferFields {
    pub amount: u64,
    pub receiver: String,
    #[serde(rename = "asset-id")]
    pub asset_id: u64,
}

impl IndexerTransaction {
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| AdapterError::Codec(format!("indexer transaction: {}", e)))
    }

    /// ASA id referenced by this transaction, if it is an asset transfer
    pub fn asset_id(&self) -> Option<u64> {
        self.asset_transfer.as_ref().map(|a| a.asset_id)
    }
}

/// Extract the native transfer of a `pay` transaction
pub fn extract_payment(tx: &IndexerTransaction, token_symbol: &str) -> Option<Transfer> {
    if tx.tx_type != "pay" {
        return None;
    }
    let payment = tx.payment.as_ref()?;
    Some(Transfer {
        from: tx.sender.clone(),
        to: payment.receiver.clone(),
        amount: format_units(payment.amount as u128, ALGO_DECIMALS),
        scaled_amount: payment.amount.to_string(),
        token: token_symbol.to_string(),
        is_native: true,
        token_address: ZERO_ADDRESS.to_string(),
    })
}

/// Extract the asset transfer of an `axfer` transaction, with the asset's
/// decimals and unit name already resolved
pub fn extract_asset_transfer(
    tx: &IndexerTransaction,
    decimals: u32,
    unit_name: Option<&str>,
) -> Option<Transfer> {
    if tx.tx_type != "axfer" {
        return None;
    }
    let xfer = tx.asset_transfer.as_ref()?;
    Some(Transfer {
        from: tx.sender.clone(),
        to: xfer.receiver.clone(),
        amount: format_units(xfer.amount as u128, decimals),
        scaled_amount: xfer.amount.to_string(),
        token: unit_name
            .map(str::to_string)
            .unwrap_or_else(|| xfer.asset_id.to_string()),
        is_native: false,
        token_address: xfer.asset_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_microalgo_payment() {
        let tx = IndexerTransaction::from_value(&serde_json::json!({
            "sender": "SENDER",
            "tx-type": "pay",
            "payment-transaction": { "amount": 1, "receiver": "A" }
        }))
        .unwrap();

        let transfer = extract_payment(&tx, "ALGO").unwrap();
        assert_eq!(transfer.to, "A");
        assert_eq!(transfer.amount, "0.000001");
        assert_eq!(transfer.scaled_amount, "1");
        assert_eq!(transfer.token, "ALGO");
        assert!(transfer.is_native);
        assert_eq!(transfer.token_address, ZERO_ADDRESS);
    }

    #[test]
    fn test_asset_transfer_uses_asset_decimals() {
        let tx = IndexerTransaction::from_value(&serde_json::json!({
            "sender": "SENDER",
            "tx-type": "axfer",
            "asset-transfer-transaction": {
                "amount": 2_500_000u64,
                "receiver": "B",
                "asset-id": 31566704u64
            }
        }))
        .unwrap();

        let transfer = extract_asset_transfer(&tx, 6, Some("USDC")).unwrap();
        assert_eq!(transfer.amount, "2.500000");
        assert_eq!(transfer.token, "USDC");
        assert_eq!(transfer.token_address, "31566704");
        assert!(!transfer.is_native);
    }

    #[test]
    fn test_other_tx_types_yield_nothing() {
        let tx = IndexerTransaction::from_value(&serde_json::json!({
            "sender": "SENDER",
            "tx-type": "appl"
        }))
        .unwrap();
        assert!(extract_payment(&tx, "ALGO").is_none());
        assert!(extract_asset_transfer(&tx, 0, None).is_none());
    }
}
