//! Algod / Indexer REST client
//!
//! Thin wrapper over the Algod v2 and Indexer v2 APIs: suggested params,
//! raw submission, pending-transaction lookup, and indexer-backed
//! transaction/asset lookups.

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{AdapterError, Result};

const TOKEN_HEADER: &str = "X-Algo-API-Token";

/// Suggested transaction parameters from Algod
#[derive(Debug, Clone)]
pub struct SuggestedParams {
    /// Suggested fee in microAlgos per byte (0 when the network is idle)
    pub fee_per_byte: u64,
    /// Network minimum flat fee
    pub min_fee: u64,
    /// Current last round; the validity window starts here
    pub last_round: u64,
    pub genesis_id: String,
    pub genesis_hash: [u8; 32],
}

impl SuggestedParams {
    /// Flat fee for a transaction of `size` bytes, clamped to the minimum
    pub fn flat_fee(&self, size: usize) -> u64 {
        (self.fee_per_byte * size as u64).max(self.min_fee)
    }
}

/// Pending-transaction record from Algod
#[derive(Debug, Clone, Deserialize)]
pub struct PendingTransaction {
    #[serde(rename = "confirmed-round", default)]
    pub confirmed_round: u64,
    #[serde(rename = "pool-error", default)]
    pub pool_error: String,
}

/// ASA parameters from the indexer
#[derive(Debug, Clone)]
pub struct AssetInfo {
    pub decimals: u32,
    pub unit_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ParamsResponse {
    #[serde(rename = "fee", default)]
    fee: u64,
    #[serde(rename = "min-fee")]
    min_fee: u64,
    #[serde(rename = "last-round")]
    last_round: u64,
    #[serde(rename = "genesis-id")]
    genesis_id: String,
    #[serde(rename = "genesis-hash")]
    genesis_hash: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(rename = "txId")]
    tx_id: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct AssetResponse {
    asset: AssetRecord,
}

#[derive(Debug, Deserialize)]
struct AssetRecord {
    params: AssetParams,
}

#[derive(Debug, Deserialize)]
struct AssetParams {
    #[serde(default)]
    decimals: u32,
    #[serde(rename = "unit-name", default)]
    unit_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionResponse {
    transaction: serde_json::Value,
}

/// Algod + Indexer client for one chain deployment
pub struct AlgorandClient {
    http: reqwest::Client,
    algod_url: String,
    indexer_url: Option<String>,
    token: Option<String>,
}

impl AlgorandClient {
    pub fn new(
        http: reqwest::Client,
        algod_url: &str,
        indexer_url: Option<&str>,
        token: Option<&str>,
    ) -> Self {
        info!(algod_url = %algod_url, has_indexer = indexer_url.is_some(), "Created Algorand client");
        Self {
            http,
            algod_url: algod_url.trim_end_matches('/').to_string(),
            indexer_url: indexer_url.map(|u| u.trim_end_matches('/').to_string()),
            token: token.map(str::to_string),
        }
    }

    fn with_token(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.header(TOKEN_HEADER, token),
            None => req,
        }
    }

    fn indexer_url(&self) -> Result<&str> {
        self.indexer_url.as_deref().ok_or_else(|| {
            AdapterError::InvalidInput("no indexer_url configured for algorand".into())
        })
    }

    /// Fetch suggested transaction parameters
    pub async fn suggested_params(&self) -> Result<SuggestedParams> {
        let url = format!("{}/v2/transactions/params", self.algod_url);
        let response = self.with_token(self.http.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(AdapterError::Network(format!(
                "params query failed: {}",
                response.status()
            )));
        }
        let params: ParamsResponse = response.json().await?;

        let genesis_hash: [u8; 32] = base64_decode(&params.genesis_hash)?
            .try_into()
            .map_err(|_| AdapterError::Codec("genesis hash must be 32 bytes".into()))?;

        Ok(SuggestedParams {
            fee_per_byte: params.fee,
            min_fee: params.min_fee,
            last_round: params.last_round,
            genesis_id: params.genesis_id,
            genesis_hash,
        })
    }

    /// Submit a signed transaction envelope; returns the assigned tx id
    pub async fn submit_raw(&self, envelope: Vec<u8>) -> Result<String> {
        let url = format!("{}/v2/transactions", self.algod_url);
        let response = self
            .with_token(self.http.post(&url))
            .header(reqwest::header::CONTENT_TYPE, "application/x-binary")
            .body(envelope)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let submit: SubmitResponse = response.json().await?;
            debug!(tx_id = %submit.tx_id, "Algorand transaction accepted");
            return Ok(submit.tx_id);
        }

        // 400-class responses carry the node's rejection reason verbatim
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        if status.is_client_error() {
            Err(AdapterError::ChainRejected(message))
        } else {
            Err(AdapterError::Network(format!("{}: {}", status, message)))
        }
    }

    /// Look up a transaction in the node's pending pool
    pub async fn pending_tx(&self, tx_id: &str) -> Result<PendingTransaction> {
        let url = format!("{}/v2/transactions/pending/{}", self.algod_url, tx_id);
        let response = self.with_token(self.http.get(&url)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(AdapterError::NotFound(tx_id.to_string())),
            status if status.is_success() => Ok(response.json().await?),
            status => Err(AdapterError::Network(format!(
                "pending tx query failed: {}",
                status
            ))),
        }
    }

    /// Look up a confirmed transaction through the indexer
    pub async fn lookup_tx(&self, tx_id: &str) -> Result<serde_json::Value> {
        let url = format!("{}/v2/transactions/{}", self.indexer_url()?, tx_id);
        let response = self.with_token(self.http.get(&url)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(AdapterError::NotFound(tx_id.to_string())),
            status if status.is_success() => {
                let body: TransactionResponse = response.json().await?;
                Ok(body.transaction)
            }
            status => Err(AdapterError::Network(format!(
                "indexer tx query failed: {}",
                status
            ))),
        }
    }

    /// Look up an ASA's decimals and unit name
    pub async fn lookup_asset(&self, asset_id: u64) -> Result<AssetInfo> {
        let url = format!("{}/v2/assets/{}", self.indexer_url()?, asset_id);
        let response = self.with_token(self.http.get(&url)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(AdapterError::NotFound(format!("asset {}", asset_id))),
            status if status.is_success() => {
                let body: AssetResponse = response.json().await?;
                Ok(AssetInfo {
                    decimals: body.asset.params.decimals,
                    unit_name: body.asset.params.unit_name,
                })
            }
            status => Err(AdapterError::Network(format!(
                "asset query failed: {}",
                status
            ))),
        }
    }
}

fn base64_decode(input: &str) -> Result<Vec<u8>> {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD
        .decode(input)
        .map_err(|e| AdapterError::Codec(format!("base64: {}", e)))
}
