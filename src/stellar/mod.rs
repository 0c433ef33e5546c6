//! Stellar chain adapter
//!
//! XDR payment envelopes over Horizon. The signer signs
//! SHA-256(network-id ‖ envelope-type ‖ tx); the decorated signature carries
//! the last four bytes of the account key as its hint.

pub mod address;
pub mod client;
pub mod codec;
pub mod transfers;
pub mod xdr;

use async_trait::async_trait;
use base64::Engine as _;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::chain::Blockchain;
use crate::encoding::hash::sha256;
use crate::encoding::parse_units;
use crate::error::{AdapterError, Result};
use crate::http::{retry_once, HttpClientCache};
use crate::types::{
    ChainDescriptor, ChainFamily, ConfirmationStatus, KeyCurve, NetworkType, Transfer,
    UnsignedWithdrawal,
};

use client::StellarClient;
use codec::{Asset, PaymentOp, TimeBounds, Transaction};
use transfers::XLM_DECIMALS;

/// Envelope validity window
const TIMEOUT_SECS: u64 = 300;

/// Network passphrase per deployment
fn network_passphrase(network: NetworkType) -> &'static str {
    match network {
        NetworkType::Mainnet => "Public Global Stellar Network ; September 2015",
        NetworkType::Testnet => "Test SDF Network ; September 2015",
        NetworkType::Devnet => "Standalone Network ; February 2017",
    }
}

pub struct StellarAdapter {
    client: StellarClient,
    network_id: [u8; 32],
    signing_encoding: String,
    token_symbol: String,
}

impl StellarAdapter {
    pub fn new(descriptor: &ChainDescriptor, cache: &HttpClientCache) -> Result<Self> {
        let http = cache.get_or_create(
            &descriptor.node_url,
            Duration::from_secs(descriptor.request_timeout_secs),
        )?;
        Ok(Self {
            client: StellarClient::new(http, &descriptor.node_url),
            network_id: sha256(network_passphrase(descriptor.network).as_bytes()),
            signing_encoding: descriptor.signing_encoding.clone(),
            token_symbol: descriptor.token_symbol.clone(),
        })
    }
}

#[async_trait]
impl Blockchain for StellarAdapter {
    fn chain_name(&self) -> ChainFamily {
        ChainFamily::Stellar
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
            AdapterError::InvalidInput("stellar broadcast requires the signer public key".into())
        })?;
        let pubkey: [u8; 32] = pubkey.try_into().map_err(|_| {
            AdapterError::InvalidInput("stellar public key must be 32 bytes".into())
        })?;

        let signed = codec::attach_signature(serialized_tx, signature, &pubkey)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(signed);
        self.client.submit(&encoded).await
    }

    async fn get_transfers(&self, tx_id: &str) -> Result<Vec<Transfer>> {
        let records = retry_once(|| self.client.operations(tx_id)).await?;
        transfers::extract(&records, &self.token_symbol)
    }

    async fn is_confirmed(&self, tx_id: &str) -> Result<ConfirmationStatus> {
        match retry_once(|| self.client.transaction(tx_id)).await {
            Ok(record) if record.successful => Ok(ConfirmationStatus::Confirmed),
            Ok(_) => Ok(ConfirmationStatus::Failed),
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
        let source = address::decode(bridge)
            .map_err(|_| AdapterError::InvalidInput(format!("bad bridge address: {}", bridge)))?;
        let destination = address::decode(user)?;

        let asset = match token_address {
            None => Asset::Native,
            Some(token) => {
                let (code, issuer) = token.split_once(':').ok_or_else(|| {
                    AdapterError::InvalidInput(format!(
                        "stellar asset must be CODE:ISSUER, got {}",
                        token
                    ))
                })?;
                Asset::credit(code, address::decode(issuer)?)?
            }
        };
        let stroops = i64::try_from(parse_units(amount, XLM_DECIMALS)?)
            .map_err(|_| AdapterError::InvalidInput(format!("amount too large: {}", amount)))?;

        let account = retry_once(|| self.client.account(bridge)).await?;
        let base_fee = retry_once(|| self.client.base_fee()).await?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let tx = Transaction {
            source_account: source,
            fee: base_fee,
            seq_num: account.sequence_i64()? + 1,
            time_bounds: Some(TimeBounds {
                min_time: 0,
                max_time: now + TIMEOUT_SECS,
            }),
            operations: vec![PaymentOp {
                destination,
                asset,
                amount: stroops,
            }],
        };

        debug!(
            source = %bridge,
            seq_num = tx.seq_num,
            fee = tx.fee,
            "Built stellar withdrawal"
        );

        Ok(UnsignedWithdrawal {
            serialized_tx: codec::encode_unsigned(&tx),
            signing_payload: codec::signing_preimage(&tx, &self.network_id).to_vec(),
        })
    }

    fn pubkey_bytes_to_address(&self, pubkey: &[u8]) -> Result<String> {
        let pk: [u8; 32] = pubkey.try_into().map_err(|_| {
            AdapterError::address("stellar", "public key must be 32 bytes".to_string())
        })?;
        Ok(address::encode(&pk))
    }

    fn pubkey_bytes_to_pubkey_str(&self, pubkey: &[u8]) -> Result<String> {
        // StrKey form doubles as the public-key string
        self.pubkey_bytes_to_address(pubkey)
    }

    fn validate_address(&self, addr: &str) -> bool {
        address::validate(addr)
    }
}
