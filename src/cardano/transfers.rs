//! Transfer extraction from resolved Cardano transactions
//!
//! Each output contributes one transfer per value entry: lovelace becomes a
//! native ADA transfer, every other unit a non-native transfer keyed by its
//! `policy ‖ asset_name` unit, with decimals and display name taken from the
//! asset registry.

use super::client::{AssetInfo, TxUtxos};
use crate::encoding::format_units;
use crate::error::Result;
use crate::types::{Transfer, ZERO_ADDRESS};

/// Lovelace decimals
pub const ADA_DECIMALS: u32 = 6;

/// Registry-resolved decimals and display name for one asset unit
#[derive(Debug, Clone)]
pub struct ResolvedAsset {
    pub decimals: u32,
    pub display_name: String,
}

impl ResolvedAsset {
    /// Resolve from a registry entry, falling back to the hex asset-name
    /// suffix and zero decimals for unregistered assets
    pub fn from_registry(unit: &str, info: Option<&AssetInfo>) -> Self {
        let metadata = info.and_then(|i| i.metadata.as_ref());
        let display_name = metadata
            .and_then(|m| m.ticker.clone().or_else(|| m.name.clone()))
            .unwrap_or_else(|| unit.get(56..).unwrap_or(unit).to_string());
        ResolvedAsset {
            decimals: metadata.and_then(|m| m.decimals).unwrap_or(0),
            display_name,
        }
    }
}

/// Extract transfers, resolving non-lovelace units through `resolve`
pub fn extract(
    utxos: &TxUtxos,
    token_symbol: &str,
    resolve: impl Fn(&str) -> ResolvedAsset,
) -> Result<Vec<Transfer>> {
    let from = utxos
        .inputs
        .first()
        .map(|input| input.address.clone())
        .unwrap_or_default();

    let mut transfers = Vec::new();
    for output in &utxos.outputs {
        for entry in &output.amount {
            let quantity = entry.quantity_u64()?;
            if entry.is_lovelace() {
                transfers.push(Transfer {
                    from: from.clone(),
                    to: output.address.clone(),
                    amount: format_units(quantity as u128, ADA_DECIMALS),
                    scaled_amount: quantity.to_string(),
                    token: token_symbol.to_string(),
                    is_native: true,
                    token_address: ZERO_ADDRESS.to_string(),
                });
            } else {
                let asset = resolve(&entry.unit);
                transfers.push(Transfer {
                    from: from.clone(),
                    to: output.address.clone(),
                    amount: format_units(quantity as u128, asset.decimals),
                    scaled_amount: quantity.to_string(),
                    token: asset.display_name,
                    is_native: false,
                    token_address: entry.unit.clone(),
                });
            }
        }
    }
    Ok(transfers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utxos_fixture() -> TxUtxos {
        serde_json::from_value(serde_json::json!({
            "inputs": [
                { "address": "addr1_sender", "amount": [{ "unit": "lovelace", "quantity": "7000000" }] }
            ],
            "outputs": [
                {
                    "address": "addr1_recipient",
                    "amount": [
                        { "unit": "lovelace", "quantity": "5000000" },
                        { "unit": concat!(
                            "11111111111111111111111111111111111111111111111111111111",
                            "544f4b454e"), "quantity": "250" }
                    ]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_lovelace_and_asset_entries() {
        let transfers = extract(&utxos_fixture(), "ADA", |_| ResolvedAsset {
            decimals: 2,
            display_name: "TOKEN".into(),
        })
        .unwrap();

        assert_eq!(transfers.len(), 2);

        assert!(transfers[0].is_native);
        assert_eq!(transfers[0].from, "addr1_sender");
        assert_eq!(transfers[0].to, "addr1_recipient");
        assert_eq!(transfers[0].amount, "5.000000");
        assert_eq!(transfers[0].token_address, ZERO_ADDRESS);

        assert!(!transfers[1].is_native);
        assert_eq!(transfers[1].amount, "2.50");
        assert_eq!(transfers[1].token, "TOKEN");
        assert!(transfers[1].token_address.ends_with("544f4b454e"));
    }

    #[test]
    fn test_unregistered_asset_defaults() {
        let unit = format!("{}{}", "22".repeat(28), hex::encode("RAW"));
        let resolved = ResolvedAsset::from_registry(&unit, None);
        assert_eq!(resolved.decimals, 0);
        assert_eq!(resolved.display_name, hex::encode("RAW"));
    }
}
