//! Algorand chain adapter
//!
//! Payments and ASA transfers over Algod/Indexer. The signer signs
//! `"TX" ‖ msgpack(body)`; the envelope is `{"sig", "txn"}`.

pub mod address;
pub mod client;
pub mod codec;
pub mod msgpack;
pub mod transfers;

use async_trait::async_trait;
use tracing::debug;

use crate::chain::Blockchain;
use crate::encoding::parse_units;
use crate::error::{AdapterError, Result};
use crate::http::{retry_once, HttpClientCache};
use crate::types::{
    ChainDescriptor, ChainFamily, ConfirmationStatus, KeyCurve, Transfer, UnsignedWithdrawal,
};

use client::AlgorandClient;
use codec::{AlgorandTransaction, TxType};
use transfers::{IndexerTransaction, ALGO_DECIMALS};

/// Validity window length in rounds for built withdrawals
const VALIDITY_WINDOW_ROUNDS: u64 = 1000;

/// Estimated size of a signed payment envelope, used for flat-fee sizing
const ESTIMATED_TX_SIZE: usize = 250;

pub struct AlgorandAdapter {
    client: AlgorandClient,
    signing_encoding: String,
    token_symbol: String,
}

impl AlgorandAdapter {
    pub fn new(descriptor: &ChainDescriptor, cache: &HttpClientCache) -> Result<Self> {
        let http = cache.get_or_create(
            &descriptor.node_url,
            std::time::Duration::from_secs(descriptor.request_timeout_secs),
        )?;
        Ok(Self {
            client: AlgorandClient::new(
                http,
                &descriptor.node_url,
                descriptor.indexer_url.as_deref(),
                descriptor.credentials.as_deref(),
            ),
            signing_encoding: descriptor.signing_encoding.clone(),
            token_symbol: descriptor.token_symbol.clone(),
        })
    }

    async fn lookup_indexer_tx(&self, tx_id: &str) -> Result<IndexerTransaction> {
        let value = retry_once(|| self.client.lookup_tx(tx_id)).await?;
        IndexerTransaction::from_value(&value)
    }
}

#[async_trait]
impl Blockchain for AlgorandAdapter {
    fn chain_name(&self) -> ChainFamily {
        ChainFamily::Algorand
    }

    fn key_curve(&self) -> KeyCurve {
        KeyCurve::Ed25519
    }

    fn signing_encoding(&self) -> &str {
        &self.signing_encoding
    }

    async fn broadcast(
        &self,
        serialized_tx: &[u8],
        signature: &[u8],
        pubkey: Option<&[u8]>,
    ) -> Result<String> {
        let tx = codec::decode_unsigned(serialized_tx)?;

        // The envelope does not carry the key, but when the caller supplies
        // one it must belong to the sender account
        if let Some(pk) = pubkey {
            let pk: [u8; 32] = pk.try_into().map_err(|_| {
                AdapterError::InvalidInput("algorand public key must be 32 bytes".into())
            })?;
            if pk != tx.sender {
                return Err(AdapterError::InvalidInput(
                    "public key does not match transaction sender".into(),
                ));
            }
        }

        let envelope = codec::attach_signature(serialized_tx, signature)?;
        self.client.submit_raw(envelope).await
    }

    async fn get_transfers(&self, tx_id: &str) -> Result<Vec<Transfer>> {
        let tx = self.lookup_indexer_tx(tx_id).await?;

        if let Some(transfer) = transfers::extract_payment(&tx, &self.token_symbol) {
            return Ok(vec![transfer]);
        }
        if let Some(asset_id) = tx.asset_id() {
            let asset = retry_once(|| self.client.lookup_asset(asset_id)).await?;
            if let Some(transfer) =
                transfers::extract_asset_transfer(&tx, asset.decimals, asset.unit_name.as_deref())
            {
                return Ok(vec![transfer]);
            }
        }

        debug!(tx_id = %tx_id, tx_type = %tx.tx_type, "No transfers extracted");
        Ok(vec![])
    }

    async fn is_confirmed(&self, tx_id: &str) -> Result<ConfirmationStatus> {
        // Pending pool first, then fall through to the indexer
        match retry_once(|| self.client.pending_tx(tx_id)).await {
            Ok(pending) => {
                if pending.confirmed_round > 0 {
                    return Ok(ConfirmationStatus::Confirmed);
                }
                if !pending.pool_error.is_empty() {
                    return Ok(ConfirmationStatus::Failed);
                }
                Ok(ConfirmationStatus::Pending)
            }
            Err(AdapterError::NotFound(_)) => {
                match self.lookup_indexer_tx(tx_id).await {
                    Ok(_) => Ok(ConfirmationStatus::Confirmed),
                    Err(AdapterError::NotFound(_)) => Ok(ConfirmationStatus::NotFound),
                    Err(err) => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    async fn build_withdraw(
        &self,
        bridge: &str,
        amount: &str,
        user: &str,
        token_address: Option<&str>,
    ) -> Result<UnsignedWithdrawal> {
        if !address::validate(user) {
            return Err(AdapterError::InvalidRecipient(user.to_string()));
        }
        let sender = address::decode(bridge)
            .map_err(|_| AdapterError::InvalidInput(format!("bad bridge address: {}", bridge)))?;
        let receiver = address::decode(user)?;

        // Resolve kind and base units before touching the network further
        let (tx_type, asset_id, base_units) = match token_address {
            None => (TxType::Payment, 0, parse_units(amount, ALGO_DECIMALS)?),
            Some(token) => {
                let asset_id: u64 = token.parse().map_err(|_| {
                    AdapterError::InvalidInput(format!("bad ASA id: {}", token))
                })?;
                let asset = retry_once(|| self.client.lookup_asset(asset_id)).await?;
                (
                    TxType::AssetTransfer,
                    asset_id,
                    parse_units(amount, asset.decimals)?,
                )
            }
        };

        let params = retry_once(|| self.client.suggested_params()).await?;

        let tx = AlgorandTransaction {
            tx_type,
            sender,
            receiver,
            amount: u64::try_from(base_units)
                .map_err(|_| AdapterError::InvalidInput(format!("amount too large: {}", amount)))?,
            fee: params.flat_fee(ESTIMATED_TX_SIZE),
            first_valid: params.last_round,
            last_valid: params.last_round + VALIDITY_WINDOW_ROUNDS,
            genesis_id: params.genesis_id,
            genesis_hash: params.genesis_hash,
            asset_id,
        };

        Ok(UnsignedWithdrawal {
            serialized_tx: codec::encode_unsigned(&tx),
            signing_payload: codec::signing_preimage(&tx),
        })
    }

    fn pubkey_bytes_to_address(&self, pubkey: &[u8]) -> Result<String> {
        let pk: [u8; 32] = pubkey.try_into().map_err(|_| {
            AdapterError::address("algorand", "public key must be 32 bytes".to_string())
        })?;
        Ok(address::encode(&pk))
    }

    fn pubkey_bytes_to_pubkey_str(&self, pubkey: &[u8]) -> Result<String> {
        if pubkey.len() != 32 {
            return Err(AdapterError::address(
                "algorand",
                "public key must be 32 bytes".to_string(),
            ));
        }
        Ok(hex::encode(pubkey))
    }

    fn validate_address(&self, addr: &str) -> bool {
        address::validate(addr)
    }
}
