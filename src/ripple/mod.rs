//! Ripple (XRPL) chain adapter
//!
//! The network's signing digest covers the SigningPubKey field, so the
//! bridge identity passed to the withdraw builder is the `ED…` signing
//! public key string rather than the classic address; the account id is
//! derived from it and both land in the unsigned body.

pub mod address;
pub mod client;
pub mod codec;
pub mod transfers;

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::chain::Blockchain;
use crate::encoding::parse_units;
use crate::error::{AdapterError, Result};
use crate::http::{retry_once, HttpClientCache};
use crate::types::{
    ChainDescriptor, ChainFamily, ConfirmationStatus, KeyCurve, Transfer, UnsignedWithdrawal,
};

use client::RippleClient;
use codec::{RippleAmount, RipplePayment, TF_FULLY_CANONICAL_SIG};
use transfers::XRP_DECIMALS;

pub struct RippleAdapter {
    client: RippleClient,
    signing_encoding: String,
    token_symbol: String,
}

impl RippleAdapter {
    pub fn new(descriptor: &ChainDescriptor, cache: &HttpClientCache) -> Result<Self> {
        let http = cache.get_or_create(
            &descriptor.node_url,
            Duration::from_secs(descriptor.request_timeout_secs),
        )?;
        Ok(Self {
            client: RippleClient::new(http, &descriptor.node_url),
            signing_encoding: descriptor.signing_encoding.clone(),
            token_symbol: descriptor.token_symbol.clone(),
        })
    }
}

#[async_trait]
impl Blockchain for RippleAdapter {
    fn chain_name(&self) -> ChainFamily {
        ChainFamily::Ripple
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
        // The unsigned body already embeds SigningPubKey; a supplied key
        // must agree with it
        if let Some(pk) = pubkey {
            let tx = codec::decode_unsigned(serialized_tx)?;
            let embedded = tx.signing_pubkey;
            let expected: Vec<u8> = match pk.len() {
                32 => {
                    let mut key = vec![address::ED25519_PREFIX];
                    key.extend_from_slice(pk);
                    key
                }
                _ => pk.to_vec(),
            };
            if embedded != expected {
                return Err(AdapterError::InvalidInput(
                    "public key does not match the embedded SigningPubKey".into(),
                ));
            }
        }

        let signed = codec::attach_signature(serialized_tx, signature)?;
        self.client.submit(&signed).await
    }

    async fn get_transfers(&self, tx_id: &str) -> Result<Vec<Transfer>> {
        let record = retry_once(|| self.client.tx(tx_id)).await?;
        transfers::extract(&record, &self.token_symbol)
    }

    async fn is_confirmed(&self, tx_id: &str) -> Result<ConfirmationStatus> {
        match retry_once(|| self.client.tx(tx_id)).await {
            Ok(record) => {
                let validated = record
                    .get("validated")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                if !validated {
                    return Ok(ConfirmationStatus::Pending);
                }
                let result = record
                    .get("meta")
                    .and_then(|m| m.get("TransactionResult"))
                    .and_then(|r| r.as_str())
                    .unwrap_or_default();
                if result.starts_with("tes") {
                    Ok(ConfirmationStatus::Confirmed)
                } else {
                    Ok(ConfirmationStatus::Failed)
                }
            }
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
        // The signing digest covers SigningPubKey, so the bridge identity is
        // its ED… signing key; the account id falls out of it
        let signing_pubkey = address::parse_pubkey_str(bridge).map_err(|_| {
            AdapterError::InvalidInput(format!(
                "bridge identity must be the ED-prefixed signing public key, got {}",
                bridge
            ))
        })?;
        let account = address::account_id(&signing_pubkey);
        let destination = address::decode(user)?;

        let amount = match token_address {
            None => {
                let drops = u64::try_from(parse_units(amount, XRP_DECIMALS)?).map_err(|_| {
                    AdapterError::InvalidInput(format!("amount too large: {}", amount))
                })?;
                RippleAmount::Drops(drops)
            }
            Some(token) => {
                // Issued currencies are addressed as CODE:issuer
                let (code, issuer) = token
                    .split_once(':')
                    .or_else(|| token.split_once('.'))
                    .ok_or_else(|| {
                        AdapterError::InvalidInput(format!(
                            "issued currency must be CODE:issuer, got {}",
                            token
                        ))
                    })?;
                RippleAmount::issued(code, address::decode(issuer)?, amount)?
            }
        };

        let account_address = address::encode_account_id(&account);
        let info = retry_once(|| self.client.account_info(&account_address)).await?;
        let fee_drops = retry_once(|| self.client.fee()).await?;

        let tx = RipplePayment {
            account,
            destination,
            amount,
            fee_drops,
            sequence: info.sequence,
            flags: TF_FULLY_CANONICAL_SIG,
            signing_pubkey: signing_pubkey.to_vec(),
            txn_signature: None,
        };

        debug!(
            account = %account_address,
            sequence = info.sequence,
            fee_drops,
            "Built ripple withdrawal"
        );

        Ok(UnsignedWithdrawal {
            serialized_tx: codec::encode_unsigned(&tx)?,
            signing_payload: codec::signing_preimage(&tx)?.to_vec(),
        })
    }

    fn pubkey_bytes_to_address(&self, pubkey: &[u8]) -> Result<String> {
        let pk: [u8; 32] = pubkey.try_into().map_err(|_| {
            AdapterError::address("ripple", "public key must be 32 bytes".to_string())
        })?;
        Ok(address::encode(&pk))
    }

    fn pubkey_bytes_to_pubkey_str(&self, pubkey: &[u8]) -> Result<String> {
        let pk: [u8; 32] = pubkey.try_into().map_err(|_| {
            AdapterError::address("ripple", "public key must be 32 bytes".to_string())
        })?;
        Ok(address::pubkey_str(&pk))
    }

    fn validate_address(&self, addr: &str) -> bool {
        address::validate(addr)
    }
}
