//! EVM JSON-RPC client
//!
//! Only the read surface the core needs: gas price, transaction receipts,
//! and the block number used to count confirmations.

use serde::Deserialize;
use tracing::info;

use crate::error::{AdapterError, Result};

/// EVM transaction receipt from RPC
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionReceipt {
    #[serde(rename = "blockNumber")]
    pub block_number: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// JSON-RPC client for one EVM endpoint
pub struct EvmClient {
    http: reqwest::Client,
    rpc_url: String,
}

impl EvmClient {
    pub fn new(http: reqwest::Client, rpc_url: &str) -> Self {
        info!(rpc_url = %rpc_url, "Created EVM client");
        Self {
            http,
            rpc_url: rpc_url.to_string(),
        }
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<T>> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response: RpcResponse<T> = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(AdapterError::Network(format!(
                "{} - {}",
                error.code, error.message
            )));
        }
        Ok(response.result)
    }

    /// Current gas price in wei
    pub async fn gas_price(&self) -> Result<u128> {
        let hex: Option<String> = self.call("eth_gasPrice", serde_json::json!([])).await?;
        let hex = hex.ok_or_else(|| AdapterError::Network("no gas price returned".into()))?;
        parse_hex_quantity(&hex)
    }

    /// Receipt of a transaction, if mined
    pub async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>> {
        self.call("eth_getTransactionReceipt", serde_json::json!([tx_hash]))
            .await
    }

    /// Current block number
    pub async fn block_number(&self) -> Result<u64> {
        let hex: Option<String> = self.call("eth_blockNumber", serde_json::json!([])).await?;
        let hex = hex.ok_or_else(|| AdapterError::Network("no block number returned".into()))?;
        Ok(parse_hex_quantity(&hex)? as u64)
    }
}

/// Parse a 0x-prefixed hex quantity
pub fn parse_hex_quantity(hex: &str) -> Result<u128> {
    u128::from_str_radix(hex.trim_start_matches("0x"), 16)
        .map_err(|e| AdapterError::Codec(format!("bad hex quantity {}: {}", hex, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_quantity() {
        assert_eq!(parse_hex_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_hex_quantity("0x3b9aca00").unwrap(), 1_000_000_000);
        assert!(parse_hex_quantity("0xzz").is_err());
    }
}
