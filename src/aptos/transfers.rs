//! Transfer classification for Aptos entry-function payloads
//!
//! Dispatch is on the fully qualified function name. Anything that is not a
//! recognized transfer function yields no transfer (not an error).

use serde::Deserialize;

use crate::error::{AdapterError, Result};

/// APT decimals
pub const APT_DECIMALS: u32 = 8;

/// The native coin's type tag
pub const APTOS_COIN_TYPE: &str = "0x1::aptos_coin::AptosCoin";

/// Entry-function payload as rendered by the fullnode REST API
#[derive(Debug, Clone, Deserialize)]
pub struct EntryFunctionPayload {
    #[serde(rename = "type", default)]
    pub payload_type: String,
    pub function: String,
    #[serde(default)]
    pub type_arguments: Vec<String>,
    #[serde(default)]
    pub arguments: Vec<serde_json::Value>,
}

impl EntryFunctionPayload {
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| AdapterError::Codec(format!("aptos payload: {}", e)))
    }
}

/// What a recognized payload moves and to whom
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferPlan {
    Native {
        to: String,
        scaled_amount: u64,
    },
    Coin {
        coin_type: String,
        to: String,
        scaled_amount: u64,
    },
    FungibleStore {
        metadata: String,
        to: String,
        scaled_amount: u64,
    },
}

/// Classify an entry-function payload into a transfer plan
///
/// Returns `Ok(None)` for functions that move no assets; malformed arguments
/// on a recognized function are an error.
pub fn classify(payload: &EntryFunctionPayload) -> Result<Option<TransferPlan>> {
    match payload.function.as_str() {
        "0x1::primary_fungible_store::transfer" => {
            let metadata = object_address(arg(payload, 0)?)?;
            Ok(Some(TransferPlan::FungibleStore {
                metadata,
                to: string_arg(arg(payload, 1)?)?,
                scaled_amount: amount_arg(arg(payload, 2)?)?,
            }))
        }
        "0x1::aptos_account::transfer" => Ok(Some(TransferPlan::Native {
            to: string_arg(arg(payload, 0)?)?,
            scaled_amount: amount_arg(arg(payload, 1)?)?,
        })),
        "0x1::aptos_account::transfer_coins" | "0x1::coin::transfer" => {
            let to = string_arg(arg(payload, 0)?)?;
            let scaled_amount = amount_arg(arg(payload, 1)?)?;
            for type_arg in &payload.type_arguments {
                if type_arg == APTOS_COIN_TYPE {
                    return Ok(Some(TransferPlan::Native { to, scaled_amount }));
                }
                return Ok(Some(TransferPlan::Coin {
                    coin_type: type_arg.clone(),
                    to,
                    scaled_amount,
                }));
            }
            // No type argument at all: treat as native
            Ok(Some(TransferPlan::Native { to, scaled_amount }))
        }
        _ => Ok(None),
    }
}

/// The address component of a coin type tag (`0x42::m::T` → `0x42`)
pub fn coin_type_address(coin_type: &str) -> Result<String> {
    coin_type
        .split("::")
        .next()
        .filter(|a| a.starts_with("0x"))
        .map(str::to_string)
        .ok_or_else(|| AdapterError::Codec(format!("bad coin type: {}", coin_type)))
}

fn arg<'a>(payload: &'a EntryFunctionPayload, index: usize) -> Result<&'a serde_json::Value> {
    payload.arguments.get(index).ok_or_else(|| {
        AdapterError::Codec(format!(
            "{} missing argument {}",
            payload.function, index
        ))
    })
}

fn string_arg(value: &serde_json::Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| AdapterError::Codec(format!("expected string argument, got {}", value)))
}

/// Object<T> arguments render either as a bare address or `{"inner": addr}`
fn object_address(value: &serde_json::Value) -> Result<String> {
    if let Some(s) = value.as_str() {
        return Ok(s.to_string());
    }
    value
        .get("inner")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| AdapterError::Codec(format!("expected object argument, got {}", value)))
}

fn amount_arg(value: &serde_json::Value) -> Result<u64> {
    let text = value
        .as_str()
        .ok_or_else(|| AdapterError::Codec(format!("expected string amount, got {}", value)))?;
    text.parse()
        .map_err(|_| AdapterError::Codec(format!("bad amount: {}", text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_transfer() {
        let payload = EntryFunctionPayload::from_value(&serde_json::json!({
            "type": "entry_function_payload",
            "function": "0x1::aptos_account::transfer",
            "type_arguments": [],
            "arguments": ["0xrecipient", "79999900000"]
        }))
        .unwrap();

        assert_eq!(
            classify(&payload).unwrap(),
            Some(TransferPlan::Native {
                to: "0xrecipient".into(),
                scaled_amount: 79_999_900_000
            })
        );
    }

    #[test]
    fn test_coin_transfer_with_aptos_coin_is_native() {
        let payload = EntryFunctionPayload::from_value(&serde_json::json!({
            "function": "0x1::coin::transfer",
            "type_arguments": ["0x1::aptos_coin::AptosCoin"],
            "arguments": ["0xdest", "500"]
        }))
        .unwrap();

        assert!(matches!(
            classify(&payload).unwrap(),
            Some(TransferPlan::Native { scaled_amount: 500, .. })
        ));
    }

    #[test]
    fn test_coin_transfer_with_other_coin() {
        let payload = EntryFunctionPayload::from_value(&serde_json::json!({
            "function": "0x1::aptos_account::transfer_coins",
            "type_arguments": ["0xabc::usdt::USDT"],
            "arguments": ["0xdest", "1000000"]
        }))
        .unwrap();

        match classify(&payload).unwrap() {
            Some(TransferPlan::Coin { coin_type, .. }) => {
                assert_eq!(coin_type, "0xabc::usdt::USDT");
                assert_eq!(coin_type_address(&coin_type).unwrap(), "0xabc");
            }
            other => panic!("unexpected plan: {:?}", other),
        }
    }

    #[test]
    fn test_fungible_store_transfer() {
        let payload = EntryFunctionPayload::from_value(&serde_json::json!({
            "function": "0x1::primary_fungible_store::transfer",
            "type_arguments": ["0x1::fungible_asset::Metadata"],
            "arguments": [{"inner": "0xmeta"}, "0xdest", "42"]
        }))
        .unwrap();

        assert_eq!(
            classify(&payload).unwrap(),
            Some(TransferPlan::FungibleStore {
                metadata: "0xmeta".into(),
                to: "0xdest".into(),
                scaled_amount: 42
            })
        );
    }

    #[test]
    fn test_unrelated_function_yields_nothing() {
        let payload = EntryFunctionPayload::from_value(&serde_json::json!({
            "function": "0x1::code::publish_package_txn",
            "arguments": []
        }))
        .unwrap();
        assert_eq!(classify(&payload).unwrap(), None);
    }
}
