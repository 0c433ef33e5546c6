//! Aptos chain adapter
//!
//! BCS transaction bodies with the `APTOS::RawTransaction` signing domain
//! tag. Native APT, classic coin types, and fungible-asset-store transfers
//! share the same signing flow; the token identifier shape selects the
//! entry function (`0x…::mod::Name` ⇒ coin type, bare address ⇒ metadata
//! object).

pub mod address;
pub mod client;
pub mod codec;
pub mod transfers;

use async_trait::async_trait;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::chain::Blockchain;
use crate::encoding::{format_units, parse_units};
use crate::error::{AdapterError, Result};
use crate::http::{retry_once, HttpClientCache};
use crate::types::{
    ChainDescriptor, ChainFamily, ConfirmationStatus, KeyCurve, NetworkType, Transfer,
    UnsignedWithdrawal, ZERO_ADDRESS,
};

use client::AptosClient;
use codec::{AccountAddress, RawTransaction, StructTag};
use transfers::{EntryFunctionPayload, TransferPlan, APT_DECIMALS};

/// Withdrawals expire ten minutes after being built
const EXPIRATION_WINDOW: Duration = Duration::from_secs(600);

/// Gas ceiling for a simple transfer
const MAX_GAS_AMOUNT: u64 = 2000;

pub struct AptosAdapter {
    client: AptosClient,
    chain_id: u8,
    signing_encoding: String,
    token_symbol: String,
}

impl AptosAdapter {
    pub fn new(descriptor: &ChainDescriptor, cache: &HttpClientCache) -> Result<Self> {
        let http = cache.get_or_create(
            &descriptor.node_url,
            Duration::from_secs(descriptor.request_timeout_secs),
        )?;
        let chain_id = match descriptor.network {
            NetworkType::Mainnet => 1,
            NetworkType::Testnet => 2,
            // Devnet resets get fresh ids; the devnet descriptor should be
            // regenerated after a reset
            NetworkType::Devnet => 4,
        };
        Ok(Self {
            client: AptosClient::new(http, &descriptor.node_url),
            chain_id,
            signing_encoding: descriptor.signing_encoding.clone(),
            token_symbol: descriptor.token_symbol.clone(),
        })
    }

    fn expiration_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|now| (now + EXPIRATION_WINDOW).as_secs())
            .unwrap_or(0)
    }

    async fn plan_to_transfer(&self, sender: &str, plan: TransferPlan) -> Result<Transfer> {
        match plan {
            TransferPlan::Native { to, scaled_amount } => Ok(Transfer {
                from: sender.to_string(),
                to,
                amount: format_units(scaled_amount as u128, APT_DECIMALS),
                scaled_amount: scaled_amount.to_string(),
                token: self.token_symbol.clone(),
                is_native: true,
                token_address: ZERO_ADDRESS.to_string(),
            }),
            TransferPlan::Coin {
                coin_type,
                to,
                scaled_amount,
            } => {
                let metadata = retry_once(|| self.client.coin_info(&coin_type)).await?;
                Ok(Transfer {
                    from: sender.to_string(),
                    to,
                    amount: format_units(scaled_amount as u128, metadata.decimals),
                    scaled_amount: scaled_amount.to_string(),
                    token: metadata.symbol,
                    is_native: false,
                    token_address: transfers::coin_type_address(&coin_type)?,
                })
            }
            TransferPlan::FungibleStore {
                metadata,
                to,
                scaled_amount,
            } => {
                let info = retry_once(|| self.client.fungible_metadata(&metadata)).await?;
                Ok(Transfer {
                    from: sender.to_string(),
                    to,
                    amount: format_units(scaled_amount as u128, info.decimals),
                    scaled_amount: scaled_amount.to_string(),
                    token: info.symbol,
                    is_native: false,
                    token_address: metadata,
                })
            }
        }
    }
}

#[async_trait]
impl Blockchain for AptosAdapter {
    fn chain_name(&self) -> ChainFamily {
        ChainFamily::Aptos
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
        let pubkey = pubkey.ok_or_else(|| {
            AdapterError::InvalidInput("aptos broadcast requires the signer public key".into())
        })?;
        let signed = codec::attach_signature(serialized_tx, signature, pubkey)?;
        self.client.submit_raw(signed).await
    }

    async fn get_transfers(&self, tx_id: &str) -> Result<Vec<Transfer>> {
        let record = retry_once(|| self.client.tx_by_hash(tx_id)).await?;
        let (Some(sender), Some(payload)) = (record.sender.as_ref(), record.payload.as_ref())
        else {
            debug!(tx_id = %tx_id, record_type = %record.record_type, "No payload to extract");
            return Ok(vec![]);
        };

        let payload = EntryFunctionPayload::from_value(payload)?;
        match transfers::classify(&payload)? {
            Some(plan) => Ok(vec![self.plan_to_transfer(sender, plan).await?]),
            None => Ok(vec![]),
        }
    }

    async fn is_confirmed(&self, tx_id: &str) -> Result<ConfirmationStatus> {
        match retry_once(|| self.client.tx_by_hash(tx_id)).await {
            Ok(record) if record.is_pending() => Ok(ConfirmationStatus::Pending),
            Ok(record) => match record.success {
                Some(true) => Ok(ConfirmationStatus::Confirmed),
                Some(false) => Ok(ConfirmationStatus::Failed),
                None => Ok(ConfirmationStatus::Pending),
            },
            Err(AdapterError::NotFound(_)) => Ok(ConfirmationStatus::NotFound),
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
        let sender = AccountAddress::parse(bridge)
            .map_err(|_| AdapterError::InvalidInput(format!("bad bridge address: {}", bridge)))?;
        let recipient = AccountAddress::parse(user)?;

        let (payload, decimals) = match token_address {
            None => (None, APT_DECIMALS),
            Some(token) if token.contains("::") => {
                let metadata = retry_once(|| self.client.coin_info(token)).await?;
                (Some(token), metadata.decimals)
            }
            Some(token) => {
                let metadata = retry_once(|| self.client.fungible_metadata(token)).await?;
                (Some(token), metadata.decimals)
            }
        };

        let base_units = parse_units(amount, decimals)?;
        let base_units = u64::try_from(base_units)
            .map_err(|_| AdapterError::InvalidInput(format!("amount too large: {}", amount)))?;

        let payload = match payload {
            None => codec::native_transfer_payload(recipient, base_units)?,
            Some(token) if token.contains("::") => {
                let coin_type: StructTag = token.parse()?;
                codec::coin_transfer_payload(coin_type, recipient, base_units)?
            }
            Some(token) => {
                let metadata = AccountAddress::parse(token)?;
                codec::fungible_transfer_payload(metadata, recipient, base_units)?
            }
        };

        let sender_hex = sender.to_hex();
        let sequence_number = retry_once(|| self.client.account_sequence(&sender_hex)).await?;
        let gas_unit_price = retry_once(|| self.client.estimate_gas_price()).await?;

        let raw = RawTransaction {
            sender,
            sequence_number,
            payload,
            max_gas_amount: MAX_GAS_AMOUNT,
            gas_unit_price,
            expiration_timestamp_secs: Self::expiration_timestamp(),
            chain_id: self.chain_id,
        };

        Ok(UnsignedWithdrawal {
            serialized_tx: codec::encode_unsigned(&raw)?,
            signing_payload: codec::signing_preimage(&raw)?,
        })
    }

    fn pubkey_bytes_to_address(&self, pubkey: &[u8]) -> Result<String> {
        let pk: [u8; 32] = pubkey.try_into().map_err(|_| {
            AdapterError::address("aptos", "public key must be 32 bytes".to_string())
        })?;
        Ok(address::encode(&pk))
    }

    fn pubkey_bytes_to_pubkey_str(&self, pubkey: &[u8]) -> Result<String> {
        if pubkey.len() != 32 {
            return Err(AdapterError::address(
                "aptos",
                "public key must be 32 bytes".to_string(),
            ));
        }
        Ok(format!("0x{}", hex::encode(pubkey)))
    }

    fn validate_address(&self, addr: &str) -> bool {
        address::validate(addr)
    }
}
