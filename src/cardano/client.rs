//! Blockfrost REST client

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{AdapterError, Result};

const PROJECT_ID_HEADER: &str = "project_id";

/// One `{unit, quantity}` entry of an output value
#[derive(Debug, Clone, Deserialize)]
pub struct AmountEntry {
    pub unit: String,
    pub quantity: String,
}

impl AmountEntry {
    pub fn quantity_u64(&self) -> Result<u64> {
        self.quantity
            .parse()
            .map_err(|_| AdapterError::Codec(format!("bad quantity: {}", self.quantity)))
    }

    pub fn is_lovelace(&self) -> bool {
        self.unit == "lovelace"
    }
}

/// Transaction summary (`/txs/{hash}`)
#[derive(Debug, Clone, Deserialize)]
pub struct TxSummary {
    #[serde(default)]
    pub block: Option<String>,
}

/// Inputs and outputs of a transaction (`/txs/{hash}/utxos`)
#[derive(Debug, Clone, Deserialize)]
pub struct TxUtxos {
    pub inputs: Vec<TxUtxoEntry>,
    pub outputs: Vec<TxUtxoEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TxUtxoEntry {
    pub address: String,
    pub amount: Vec<AmountEntry>,
}

/// One spendable output of an address (`/addresses/{addr}/utxos`)
#[derive(Debug, Clone, Deserialize)]
pub struct AddressUtxo {
    pub tx_hash: String,
    pub output_index: u64,
    pub amount: Vec<AmountEntry>,
}

impl AddressUtxo {
    pub fn lovelace(&self) -> Result<u64> {
        self.amount
            .iter()
            .find(|a| a.is_lovelace())
            .map(|a| a.quantity_u64())
            .unwrap_or(Ok(0))
    }

    pub fn asset_quantity(&self, unit: &str) -> Result<u64> {
        self.amount
            .iter()
            .find(|a| a.unit == unit)
            .map(|a| a.quantity_u64())
            .unwrap_or(Ok(0))
    }
}

/// Registered asset information (`/assets/{unit}`)
#[derive(Debug, Clone, Deserialize)]
pub struct AssetInfo {
    #[serde(default)]
    pub metadata: Option<AssetRegistryMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetRegistryMetadata {
    #[serde(default)]
    pub decimals: Option<u32>,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LatestBlock {
    #[serde(default)]
    slot: Option<u64>,
}

/// Protocol parameters the fee calculation needs
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolParams {
    pub min_fee_a: u64,
    pub min_fee_b: u64,
    #[serde(default)]
    pub coins_per_utxo_size: Option<String>,
}

impl ProtocolParams {
    /// Linear fee for a transaction of `size` bytes
    pub fn fee_for_size(&self, size: usize) -> u64 {
        self.min_fee_a * size as u64 + self.min_fee_b
    }

    pub fn coins_per_utxo_byte(&self) -> u64 {
        self.coins_per_utxo_size
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(4310)
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Blockfrost client for one Cardano network
pub struct CardanoClient {
    http: reqwest::Client,
    base_url: String,
    project_id: Option<String>,
}

impl CardanoClient {
    pub fn new(http: reqwest::Client, base_url: &str, project_id: Option<&str>) -> Self {
        info!(base_url = %base_url, "Created Cardano client");
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: project_id.map(str::to_string),
        }
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let req = self.http.get(format!("{}{}", self.base_url, path));
        match &self.project_id {
            Some(id) => req.header(PROJECT_ID_HEADER, id),
            None => req,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(path).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(AdapterError::NotFound(path.to_string())),
            status if status.is_success() => Ok(response.json().await?),
            status => Err(AdapterError::Network(format!("{}: {}", path, status))),
        }
    }

    /// Transaction summary; the block field is set once it is in a block
    pub async fn tx(&self, hash: &str) -> Result<TxSummary> {
        self.get_json(&format!("/txs/{}", hash)).await
    }

    /// Resolved inputs and outputs of a transaction
    pub async fn tx_utxos(&self, hash: &str) -> Result<TxUtxos> {
        self.get_json(&format!("/txs/{}/utxos", hash)).await
    }

    /// Asset registry entry for a `policy ‖ asset_name` unit
    pub async fn asset(&self, unit: &str) -> Result<AssetInfo> {
        self.get_json(&format!("/assets/{}", unit)).await
    }

    /// Spendable outputs of an address
    pub async fn address_utxos(&self, address: &str) -> Result<Vec<AddressUtxo>> {
        self.get_json(&format!("/addresses/{}/utxos", address)).await
    }

    /// Current absolute slot
    pub async fn latest_slot(&self) -> Result<u64> {
        let block: LatestBlock = self.get_json("/blocks/latest").await?;
        block
            .slot
            .ok_or_else(|| AdapterError::Network("latest block carries no slot".into()))
    }

    /// Current protocol parameters
    pub async fn protocol_params(&self) -> Result<ProtocolParams> {
        self.get_json("/epochs/latest/parameters").await
    }

    /// Submit CBOR transaction bytes; returns the transaction hash
    pub async fn submit(&self, tx_bytes: Vec<u8>) -> Result<String> {
        let mut request = self
            .http
            .post(format!("{}/tx/submit", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, "application/cbor")
            .body(tx_bytes);
        if let Some(id) = &self.project_id {
            request = request.header(PROJECT_ID_HEADER, id);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            // The submit endpoint returns the tx hash as a JSON string
            let hash: String = response.json().await?;
            debug!(hash = %hash, "Cardano transaction accepted");
            return Ok(hash);
        }

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
}
