//! EVM chain adapter
//!
//! The EVM family is covered by its interface shape only: address rules,
//! curve and encoding accessors, fee queries, and receipt-based
//! confirmation. ERC-20 ABI binding and transaction submission live in
//! their own service, so the remaining operations surface `Unsupported`.

pub mod address;
pub mod client;

use async_trait::async_trait;
use std::time::Duration;

use crate::chain::Blockchain;
use crate::error::{AdapterError, Result};
use crate::http::{retry_once, HttpClientCache};
use crate::types::{
    ChainDescriptor, ChainFamily, ConfirmationStatus, KeyCurve, Transfer, UnsignedWithdrawal,
};

use client::{parse_hex_quantity, EvmClient};

/// Blocks before a transaction counts as confirmed
const CONFIRMATION_THRESHOLD: u64 = 3;

pub struct EvmAdapter {
    client: EvmClient,
    signing_encoding: String,
}

impl EvmAdapter {
    pub fn new(descriptor: &ChainDescriptor, cache: &HttpClientCache) -> Result<Self> {
        let http = cache.get_or_create(
            &descriptor.node_url,
            Duration::from_secs(descriptor.request_timeout_secs),
        )?;
        Ok(Self {
            client: EvmClient::new(http, &descriptor.node_url),
            signing_encoding: descriptor.signing_encoding.clone(),
        })
    }

    /// Suggested gas price in wei
    pub async fn fee_estimate(&self) -> Result<u128> {
        retry_once(|| self.client.gas_price()).await
    }

    fn unsupported(operation: &str) -> AdapterError {
        AdapterError::Unsupported(format!(
            "evm {} is handled by the contract-binding service",
            operation
        ))
    }
}

#[async_trait]
impl Blockchain for EvmAdapter {
    fn chain_name(&self) -> ChainFamily {
        ChainFamily::Evm
    }

    fn key_curve(&self) -> KeyCurve {
        KeyCurve::Secp256k1
    }

    fn signing_encoding(&self) -> &str {
        &self.signing_encoding
    }

    async fn broadcast(
        &self,
        _serialized_tx: &[u8],
        _signature: &[u8],
        _pubkey: Option<&[u8]>,
    ) -> Result<String> {
        Err(Self::unsupported("broadcast"))
    }

    async fn get_transfers(&self, _tx_id: &str) -> Result<Vec<Transfer>> {
        Err(Self::unsupported("transfer extraction"))
    }

    async fn is_confirmed(&self, tx_id: &str) -> Result<ConfirmationStatus> {
        let receipt = retry_once(|| self.client.transaction_receipt(tx_id)).await?;
        let Some(receipt) = receipt else {
            return Ok(ConfirmationStatus::Pending);
        };

        if receipt.status.as_deref() == Some("0x0") {
            return Ok(ConfirmationStatus::Failed);
        }

        let Some(block_hex) = receipt.block_number else {
            return Ok(ConfirmationStatus::Pending);
        };
        let tx_block = parse_hex_quantity(&block_hex)? as u64;
        let current_block = retry_once(|| self.client.block_number()).await?;
        // +1: a transaction in the head block has one confirmation
        if current_block.saturating_sub(tx_block) + 1 >= CONFIRMATION_THRESHOLD {
            Ok(ConfirmationStatus::Confirmed)
        } else {
            Ok(ConfirmationStatus::Pending)
        }
    }

    async fn build_withdraw(
        &self,
        _bridge: &str,
        _amount: &str,
        _user: &str,
        _token_address: Option<&str>,
    ) -> Result<UnsignedWithdrawal> {
        Err(Self::unsupported("withdraw building"))
    }

    fn pubkey_bytes_to_address(&self, pubkey: &[u8]) -> Result<String> {
        address::encode(pubkey)
    }

    fn pubkey_bytes_to_pubkey_str(&self, pubkey: &[u8]) -> Result<String> {
        if !matches!(pubkey.len(), 33 | 64 | 65) {
            return Err(AdapterError::address(
                "evm",
                format!("public key must be 33, 64 or 65 bytes, got {}", pubkey.len()),
            ));
        }
        Ok(format!("0x{}", hex::encode(pubkey)))
    }

    fn validate_address(&self, addr: &str) -> bool {
        address::validate(addr)
    }
}
