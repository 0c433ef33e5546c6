//! Bitcoin Core JSON-RPC client

use bitcoin::Amount;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{AdapterError, Result};

/// RPC error code for "no such transaction"
const RPC_INVALID_ADDRESS_OR_KEY: i64 = -5;

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

/// Verbose transaction record (`getrawtransaction` verbosity 2)
#[derive(Debug, Clone, Deserialize)]
pub struct VerboseTransaction {
    pub txid: String,
    #[serde(default)]
    pub confirmations: Option<u64>,
    pub vin: Vec<Vin>,
    pub vout: Vec<Vout>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Vin {
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub vout: Option<u32>,
    /// Populated at verbosity 2
    #[serde(default)]
    pub prevout: Option<PrevOut>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrevOut {
    pub value: f64,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Vout {
    pub value: f64,
    pub n: u32,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptPubKey {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub hex: String,
}

/// One spendable output found by `scantxoutset`
#[derive(Debug, Clone, Deserialize)]
pub struct Unspent {
    pub txid: String,
    pub vout: u32,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: String,
    pub amount: f64,
}

impl Unspent {
    pub fn value_sats(&self) -> Result<u64> {
        btc_to_sats(self.amount)
    }
}

#[derive(Debug, Deserialize)]
struct ScanResult {
    success: bool,
    #[serde(default)]
    unspents: Vec<Unspent>,
}

#[derive(Debug, Deserialize)]
struct FeeEstimate {
    #[serde(default)]
    feerate: Option<f64>,
}

/// Convert an RPC BTC amount to satoshis without precision loss
///
/// Core renders amounts as JSON decimals; every valid value is below 2^53
/// satoshis, and `Amount::from_btc` performs the string-based conversion.
pub fn btc_to_sats(value: f64) -> Result<u64> {
    Amount::from_btc(value)
        .map(|a| a.to_sat())
        .map_err(|e| AdapterError::Codec(format!("bad BTC amount {}: {}", value, e)))
}

/// JSON-RPC client for one Bitcoin Core node
pub struct BitcoinClient {
    http: reqwest::Client,
    rpc_url: String,
    auth: Option<(String, String)>,
}

impl BitcoinClient {
    pub fn new(http: reqwest::Client, rpc_url: &str, credentials: Option<&str>) -> Self {
        let auth = credentials.and_then(|c| {
            c.split_once(':')
                .map(|(user, pass)| (user.to_string(), pass.to_string()))
        });
        info!(rpc_url = %rpc_url, authenticated = auth.is_some(), "Created Bitcoin client");
        Self {
            http,
            rpc_url: rpc_url.to_string(),
            auth,
        }
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let mut request = self.http.post(&self.rpc_url).json(&body);
        if let Some((user, pass)) = &self.auth {
            request = request.basic_auth(user, Some(pass));
        }

        let response: RpcResponse<T> = request.send().await?.json().await?;
        if let Some(error) = response.error {
            return Err(match error.code {
                RPC_INVALID_ADDRESS_OR_KEY => AdapterError::NotFound(error.message),
                // The node's verdict is preserved verbatim
                code if code <= -25 => {
                    AdapterError::ChainRejected(format!("{} ({})", error.message, code))
                }
                code => AdapterError::Network(format!("{} ({})", error.message, code)),
            });
        }
        response
            .result
            .ok_or_else(|| AdapterError::Network(format!("{}: empty RPC result", method)))
    }

    /// Broadcast raw transaction bytes; returns the txid
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<String> {
        let txid: String = self
            .call("sendrawtransaction", serde_json::json!([hex::encode(raw)]))
            .await?;
        debug!(txid = %txid, "Bitcoin transaction accepted");
        Ok(txid)
    }

    /// Fetch a transaction with prevout detail (verbosity 2)
    pub async fn get_transaction(&self, txid: &str) -> Result<VerboseTransaction> {
        self.call("getrawtransaction", serde_json::json!([txid, 2]))
            .await
    }

    /// The scriptPubKey hex of one output of a confirmed transaction
    pub async fn output_script_hex(&self, txid: &str, vout: u32) -> Result<String> {
        let tx = self.get_transaction(txid).await?;
        tx.vout
            .into_iter()
            .find(|o| o.n == vout)
            .map(|o| o.script_pub_key.hex)
            .ok_or_else(|| AdapterError::NotFound(format!("{}:{}", txid, vout)))
    }

    /// Scan the UTXO set for outputs payable to `address`
    pub async fn list_unspent(&self, address: &str) -> Result<Vec<Unspent>> {
        let descriptor = format!("addr({})", address);
        let scan: ScanResult = self
            .call(
                "scantxoutset",
                serde_json::json!(["start", [{ "desc": descriptor }]]),
            )
            .await?;
        if !scan.success {
            return Err(AdapterError::Network("scantxoutset did not complete".into()));
        }
        Ok(scan.unspents)
    }

    /// Suggested fee rate in sat/vB for confirmation within three blocks
    ///
    /// Falls back to 1 sat/vB when the node has no estimate (fresh regtest).
    pub async fn fee_rate_sat_vb(&self) -> Result<u64> {
        let estimate: FeeEstimate = self
            .call("estimatesmartfee", serde_json::json!([3]))
            .await?;
        match estimate.feerate {
            Some(btc_per_kvb) => Ok((btc_to_sats(btc_per_kvb)? / 1000).max(1)),
            None => {
                warn!("estimatesmartfee returned no rate, using 1 sat/vB");
                Ok(1)
            }
        }
    }
}
