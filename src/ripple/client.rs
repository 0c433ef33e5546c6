//! rippled JSON-RPC client
//!
//! The same message contract as the WebSocket API, carried over the HTTP
//! JSON-RPC transport: one method name plus a single params object.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{AdapterError, Result};

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: serde_json::Value,
}

/// Account data the builder needs
#[derive(Debug, Clone)]
pub struct AccountInfo {
    pub sequence: u32,
}

/// rippled client for one endpoint
pub struct RippleClient {
    http: reqwest::Client,
    rpc_url: String,
}

impl RippleClient {
    pub fn new(http: reqwest::Client, rpc_url: &str) -> Self {
        info!(rpc_url = %rpc_url, "Created Ripple client");
        Self {
            http,
            rpc_url: rpc_url.to_string(),
        }
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        let body = json!({ "method": method, "params": [params] });
        let envelope: RpcEnvelope = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        let result = envelope.result;
        if result.get("status").and_then(|s| s.as_str()) == Some("error") {
            let code = result
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("unknown");
            if code == "txnNotFound" || code == "actNotFound" {
                return Err(AdapterError::NotFound(code.to_string()));
            }
            let message = result
                .get("error_message")
                .and_then(|m| m.as_str())
                .unwrap_or(code);
            return Err(AdapterError::Network(format!("{}: {}", code, message)));
        }
        Ok(result)
    }

    /// Current sequence of an account
    pub async fn account_info(&self, account: &str) -> Result<AccountInfo> {
        let result = self
            .call(
                "account_info",
                json!({ "account": account, "ledger_index": "current" }),
            )
            .await?;
        let sequence = result
            .get("account_data")
            .and_then(|d| d.get("Sequence"))
            .and_then(|s| s.as_u64())
            .ok_or_else(|| AdapterError::Codec("account_info carries no Sequence".into()))?;
        Ok(AccountInfo {
            sequence: sequence as u32,
        })
    }

    /// Current open-ledger fee in drops
    pub async fn fee(&self) -> Result<u64> {
        let result = self.call("fee", json!({})).await?;
        let drops = result
            .get("drops")
            .ok_or_else(|| AdapterError::Codec("fee response carries no drops".into()))?;
        let fee = drops
            .get("open_ledger_fee")
            .or_else(|| drops.get("base_fee"))
            .and_then(|f| f.as_str())
            .and_then(|f| f.parse::<u64>().ok())
            .ok_or_else(|| AdapterError::Codec("unparseable fee".into()))?;
        Ok(fee)
    }

    /// Submit a signed transaction blob; returns the transaction hash
    ///
    /// A non-`tes` engine result is a semantic rejection and is surfaced
    /// verbatim.
    pub async fn submit(&self, tx_blob: &[u8]) -> Result<String> {
        let result = self
            .call("submit", json!({ "tx_blob": hex::encode_upper(tx_blob) }))
            .await?;

        let engine_result = result
            .get("engine_result")
            .and_then(|r| r.as_str())
            .unwrap_or("unknown");
        if !engine_result.starts_with("tes") {
            return Err(AdapterError::ChainRejected(engine_result.to_string()));
        }

        let hash = result
            .get("tx_json")
            .and_then(|t| t.get("hash"))
            .and_then(|h| h.as_str())
            .ok_or_else(|| AdapterError::Codec("submit response carries no hash".into()))?;
        debug!(hash = %hash, engine_result = %engine_result, "Ripple transaction accepted");
        Ok(hash.to_string())
    }

    /// Look up a transaction by hash
    pub async fn tx(&self, hash: &str) -> Result<serde_json::Value> {
        self.call("tx", json!({ "transaction": hash, "binary": false }))
            .await
    }
}
