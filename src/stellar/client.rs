//! Horizon REST client

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{AdapterError, Result};

/// Account record (`/accounts/{id}`)
#[derive(Debug, Clone, Deserialize)]
pub struct AccountRecord {
    pub sequence: String,
}

impl AccountRecord {
    pub fn sequence_i64(&self) -> Result<i64> {
        self.sequence
            .parse()
            .map_err(|_| AdapterError::Codec(format!("bad sequence: {}", self.sequence)))
    }
}

/// Transaction record (`/transactions/{hash}`)
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRecord {
    pub successful: bool,
}

#[derive(Debug, Deserialize)]
struct FeeStats {
    last_ledger_base_fee: String,
}

#[derive(Debug, Deserialize)]
struct OperationsPage {
    #[serde(rename = "_embedded")]
    embedded: Embedded,
}

#[derive(Debug, Deserialize)]
struct Embedded {
    records: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct HorizonError {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    extras: Option<HorizonExtras>,
}

#[derive(Debug, Deserialize)]
struct HorizonExtras {
    #[serde(default)]
    result_codes: Option<ResultCodes>,
}

#[derive(Debug, Deserialize)]
struct ResultCodes {
    #[serde(default)]
    transaction: Option<String>,
    #[serde(default)]
    operations: Option<Vec<String>>,
}

/// Horizon client for one Stellar network
pub struct StellarClient {
    http: reqwest::Client,
    base_url: String,
}

impl StellarClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        info!(base_url = %base_url, "Created Stellar client");
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(AdapterError::NotFound(path.to_string())),
            status if status.is_success() => Ok(response.json().await?),
            status => Err(AdapterError::Network(format!("{}: {}", path, status))),
        }
    }

    /// Account record with the current sequence number
    pub async fn account(&self, account_id: &str) -> Result<AccountRecord> {
        self.get_json(&format!("/accounts/{}", account_id)).await
    }

    /// Base fee (stroops) of the last closed ledger
    pub async fn base_fee(&self) -> Result<u32> {
        let stats: FeeStats = self.get_json("/fee_stats").await?;
        stats
            .last_ledger_base_fee
            .parse()
            .map_err(|_| AdapterError::Codec(format!("bad base fee: {}", stats.last_ledger_base_fee)))
    }

    /// Transaction record
    pub async fn transaction(&self, hash: &str) -> Result<TransactionRecord> {
        self.get_json(&format!("/transactions/{}", hash)).await
    }

    /// Operations of a transaction
    pub async fn operations(&self, hash: &str) -> Result<Vec<serde_json::Value>> {
        let page: OperationsPage = self
            .get_json(&format!("/transactions/{}/operations?limit=200", hash))
            .await?;
        Ok(page.embedded.records)
    }

    /// Submit a base64 XDR envelope; returns the transaction hash
    pub async fn submit(&self, envelope_base64: &str) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/transactions", self.base_url))
            .form(&[("tx", envelope_base64)])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            #[derive(Deserialize)]
            struct Submitted {
                hash: String,
            }
            let submitted: Submitted = response.json().await?;
            debug!(hash = %submitted.hash, "Stellar transaction accepted");
            return Ok(submitted.hash);
        }

        let body = response.text().await.unwrap_or_default();
        if let Ok(error) = serde_json::from_str::<HorizonError>(&body) {
            // tx_bad_auth and friends come back verbatim
            if let Some(codes) = error.extras.and_then(|e| e.result_codes) {
                let mut message = codes.transaction.unwrap_or_default();
                if let Some(ops) = codes.operations {
                    message = format!("{} [{}]", message, ops.join(", "));
                }
                return Err(AdapterError::ChainRejected(message));
            }
            if let Some(title) = error.title {
                return Err(AdapterError::ChainRejected(title));
            }
        }
        Err(AdapterError::Network(format!("{}: {}", status, body)))
    }
}
