//! Aptos fullnode REST client

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{AdapterError, Result};

const BCS_CONTENT_TYPE: &str = "application/x.aptos.signed_transaction+bcs";

/// Committed or pending transaction record (the fields the core reads)
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

impl TransactionRecord {
    /// Pending transactions have no execution outcome yet
    pub fn is_pending(&self) -> bool {
        self.record_type == "pending_transaction"
    }
}

/// Decimals and symbol of a coin or fungible asset
#[derive(Debug, Clone, Deserialize)]
pub struct AssetMetadata {
    pub decimals: u32,
    pub symbol: String,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    sequence_number: String,
}

#[derive(Debug, Deserialize)]
struct GasEstimateResponse {
    gas_estimate: u64,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResourceResponse {
    data: AssetMetadata,
}

/// REST client for one Aptos fullnode
pub struct AptosClient {
    http: reqwest::Client,
    base_url: String,
}

impl AptosClient {
    pub fn new(http: reqwest::Client, node_url: &str) -> Self {
        info!(node_url = %node_url, "Created Aptos client");
        Self {
            http,
            base_url: node_url.trim_end_matches('/').to_string(),
        }
    }

    /// Current sequence number of an account
    pub async fn account_sequence(&self, address: &str) -> Result<u64> {
        let url = format!("{}/v1/accounts/{}", self.base_url, address);
        let response = self.http.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(AdapterError::NotFound(format!("account {}", address))),
            status if status.is_success() => {
                let account: AccountResponse = response.json().await?;
                account.sequence_number.parse().map_err(|_| {
                    AdapterError::Codec(format!(
                        "bad sequence number: {}",
                        account.sequence_number
                    ))
                })
            }
            status => Err(AdapterError::Network(format!(
                "account query failed: {}",
                status
            ))),
        }
    }

    /// Suggested gas unit price
    pub async fn estimate_gas_price(&self) -> Result<u64> {
        let url = format!("{}/v1/estimate_gas_price", self.base_url);
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AdapterError::Network(format!(
                "gas estimate failed: {}",
                response.status()
            )));
        }
        let estimate: GasEstimateResponse = response.json().await?;
        Ok(estimate.gas_estimate)
    }

    /// Submit a BCS-encoded signed transaction; returns the tx hash
    pub async fn submit_raw(&self, signed: Vec<u8>) -> Result<String> {
        let url = format!("{}/v1/transactions", self.base_url);
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, BCS_CONTENT_TYPE)
            .body(signed)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let submit: SubmitResponse = response.json().await?;
            debug!(hash = %submit.hash, "Aptos transaction accepted");
            return Ok(submit.hash);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&body)
            .map(|e| match e.error_code {
                Some(code) => format!("{}: {}", code, e.message),
                None => e.message,
            })
            .unwrap_or(body);
        if status.is_client_error() {
            Err(AdapterError::ChainRejected(message))
        } else {
            Err(AdapterError::Network(format!("{}: {}", status, message)))
        }
    }

    /// Look up a transaction by hash
    pub async fn tx_by_hash(&self, hash: &str) -> Result<TransactionRecord> {
        let url = format!("{}/v1/transactions/by_hash/{}", self.base_url, hash);
        let response = self.http.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(AdapterError::NotFound(hash.to_string())),
            status if status.is_success() => Ok(response.json().await?),
            status => Err(AdapterError::Network(format!("tx query failed: {}", status))),
        }
    }

    /// Decimals/symbol of a classic coin type via its `CoinInfo` resource
    pub async fn coin_info(&self, coin_type: &str) -> Result<AssetMetadata> {
        let coin_address = coin_type.split("::").next().ok_or_else(|| {
            AdapterError::InvalidInput(format!("bad coin type: {}", coin_type))
        })?;
        let resource = format!("0x1::coin::CoinInfo<{}>", coin_type);
        self.resource_metadata(coin_address, &resource).await
    }

    /// Decimals/symbol of a fungible asset via its `Metadata` resource
    pub async fn fungible_metadata(&self, metadata_address: &str) -> Result<AssetMetadata> {
        self.resource_metadata(metadata_address, "0x1::fungible_asset::Metadata")
            .await
    }

    async fn resource_metadata(&self, address: &str, resource: &str) -> Result<AssetMetadata> {
        // Angle brackets in generic resource types must be percent-encoded
        let encoded = resource.replace('<', "%3C").replace('>', "%3E");
        let url = format!(
            "{}/v1/accounts/{}/resource/{}",
            self.base_url, address, encoded
        );
        let response = self.http.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(AdapterError::NotFound(format!(
                "resource {} at {}",
                resource, address
            ))),
            status if status.is_success() => {
                let body: ResourceResponse = response.json().await?;
                Ok(body.data)
            }
            status => Err(AdapterError::Network(format!(
                "resource query failed: {}",
                status
            ))),
        }
    }
}
