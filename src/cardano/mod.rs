//! Cardano chain adapter
//!
//! Shelley-era CBOR transactions over Blockfrost. The signer signs the
//! Blake2b-256 of the body; witnesses are `[vkey, signature]` pairs under
//! witness-set key 0.

pub mod address;
pub mod cbor;
pub mod client;
pub mod codec;
pub mod transfers;

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::chain::Blockchain;
use crate::encoding::parse_units;
use crate::error::{AdapterError, Result};
use crate::http::{retry_once, HttpClientCache};
use crate::types::{
    ChainDescriptor, ChainFamily, ConfirmationStatus, KeyCurve, NetworkType, Transfer,
    UnsignedWithdrawal,
};

use client::{AddressUtxo, CardanoClient, ProtocolParams};
use codec::{MultiAssetEntry, OutputValue, TxBody, TxInput, TxOutput};
use transfers::{ResolvedAsset, ADA_DECIMALS};

/// Withdrawals stay valid for two hours of slots
const TTL_SLOTS: u64 = 7200;

/// Size allowance for the single vkey witness added at signing time
const WITNESS_SIZE_ALLOWANCE: usize = 105;

/// Base size term of the min-UTXO calculation
const MIN_UTXO_BASE_SIZE: u64 = 160;

pub struct CardanoAdapter {
    client: CardanoClient,
    network: NetworkType,
    signing_encoding: String,
    token_symbol: String,
}

impl CardanoAdapter {
    pub fn new(descriptor: &ChainDescriptor, cache: &HttpClientCache) -> Result<Self> {
        let http = cache.get_or_create(
            &descriptor.node_url,
            Duration::from_secs(descriptor.request_timeout_secs),
        )?;
        Ok(Self {
            client: CardanoClient::new(
                http,
                &descriptor.node_url,
                descriptor.credentials.as_deref(),
            ),
            network: descriptor.network,
            signing_encoding: descriptor.signing_encoding.clone(),
            token_symbol: descriptor.token_symbol.clone(),
        })
    }

    /// Minimum lovelace an output of `encoded_len` bytes must carry
    fn min_ada(params: &ProtocolParams, encoded_len: usize) -> u64 {
        (MIN_UTXO_BASE_SIZE + encoded_len as u64) * params.coins_per_utxo_byte()
    }

    /// Group a UTXO's non-lovelace entries into multi-asset form, subtracting
    /// the withdrawn quantity from its unit
    fn remaining_assets(
        utxo: &AddressUtxo,
        subtract: Option<(&str, u64)>,
    ) -> Result<Vec<MultiAssetEntry>> {
        let mut grouped: Vec<([u8; 28], Vec<(Vec<u8>, u64)>)> = Vec::new();
        for entry in &utxo.amount {
            if entry.is_lovelace() {
                continue;
            }
            let mut quantity = entry.quantity_u64()?;
            if let Some((unit, amount)) = subtract {
                if entry.unit == unit {
                    quantity -= amount;
                }
            }
            if quantity == 0 {
                continue;
            }
            let (policy_id, name) = split_unit(&entry.unit)?;
            match grouped.iter_mut().find(|(p, _)| *p == policy_id) {
                Some((_, names)) => names.push((name, quantity)),
                None => grouped.push((policy_id, vec![(name, quantity)])),
            }
        }
        // Canonical ordering: policies and names sorted bytewise
        grouped.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(grouped
            .into_iter()
            .map(|(policy_id, mut assets)| {
                assets.sort_by(|a, b| a.0.cmp(&b.0));
                MultiAssetEntry { policy_id, assets }
            })
            .collect())
    }

    async fn resolve_asset(&self, unit: &str) -> ResolvedAsset {
        match retry_once(|| self.client.asset(unit)).await {
            Ok(info) => ResolvedAsset::from_registry(unit, Some(&info)),
            Err(_) => ResolvedAsset::from_registry(unit, None),
        }
    }
}

/// Split a Blockfrost unit into `(policy_id, asset_name)`
fn split_unit(unit: &str) -> Result<([u8; 28], Vec<u8>)> {
    if unit.len() < 56 {
        return Err(AdapterError::InvalidInput(format!("bad asset unit: {}", unit)));
    }
    let policy_id: [u8; 28] = hex::decode(&unit[..56])
        .map_err(|e| AdapterError::InvalidInput(format!("bad policy id: {}", e)))?
        .try_into()
        .map_err(|_| AdapterError::InvalidInput("policy id must be 28 bytes".into()))?;
    let name = hex::decode(&unit[56..])
        .map_err(|e| AdapterError::InvalidInput(format!("bad asset name: {}", e)))?;
    Ok((policy_id, name))
}

#[async_trait]
impl Blockchain for CardanoAdapter {
    fn chain_name(&self) -> ChainFamily {
        ChainFamily::Cardano
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
            AdapterError::InvalidInput("cardano broadcast requires the signer public key".into())
        })?;
        let signed = codec::attach_signature(serialized_tx, signature, pubkey)?;
        self.client.submit(signed).await
    }

    async fn get_transfers(&self, tx_id: &str) -> Result<Vec<Transfer>> {
        let utxos = retry_once(|| self.client.tx_utxos(tx_id)).await?;

        // Resolve every distinct non-lovelace unit before extraction
        let mut resolved: HashMap<String, ResolvedAsset> = HashMap::new();
        for output in &utxos.outputs {
            for entry in &output.amount {
                if !entry.is_lovelace() && !resolved.contains_key(&entry.unit) {
                    resolved.insert(entry.unit.clone(), self.resolve_asset(&entry.unit).await);
                }
            }
        }

        transfers::extract(&utxos, &self.token_symbol, |unit| {
            resolved
                .get(unit)
                .cloned()
                .unwrap_or_else(|| ResolvedAsset::from_registry(unit, None))
        })
    }

    async fn is_confirmed(&self, tx_id: &str) -> Result<ConfirmationStatus> {
        match retry_once(|| self.client.tx(tx_id)).await {
            Ok(summary) if summary.block.is_some() => Ok(ConfirmationStatus::Confirmed),
            Ok(_) => Ok(ConfirmationStatus::Pending),
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
        if !address::validate(user, self.network) {
            return Err(AdapterError::InvalidRecipient(user.to_string()));
        }
        let bridge_bytes = address::decode(bridge, self.network)
            .map_err(|_| AdapterError::InvalidInput(format!("bad bridge address: {}", bridge)))?;
        let user_bytes = address::decode(user, self.network)?;

        let params = retry_once(|| self.client.protocol_params()).await?;
        let slot = retry_once(|| self.client.latest_slot()).await?;
        let utxos = retry_once(|| self.client.address_utxos(bridge)).await?;

        let (selected, user_output, withdrawn) = match token_address {
            None => {
                let lovelace = u64::try_from(parse_units(amount, ADA_DECIMALS)?)
                    .map_err(|_| AdapterError::InvalidInput(format!("amount too large: {}", amount)))?;
                let selected = utxos
                    .iter()
                    .filter(|u| u.lovelace().map(|l| l > lovelace).unwrap_or(false))
                    .max_by_key(|u| u.lovelace().unwrap_or(0))
                    .ok_or_else(|| {
                        AdapterError::InvalidInput(format!(
                            "no single output covers {} lovelace",
                            lovelace
                        ))
                    })?;
                let user_output = TxOutput {
                    address: user_bytes,
                    value: OutputValue::Coin(lovelace),
                };
                (selected, user_output, None)
            }
            Some(unit) => {
                let asset = self.resolve_asset(unit).await;
                let quantity = u64::try_from(parse_units(amount, asset.decimals)?)
                    .map_err(|_| AdapterError::InvalidInput(format!("amount too large: {}", amount)))?;
                let selected = utxos
                    .iter()
                    .filter(|u| u.asset_quantity(unit).map(|q| q >= quantity).unwrap_or(false))
                    .max_by_key(|u| u.lovelace().unwrap_or(0))
                    .ok_or_else(|| {
                        AdapterError::InvalidInput(format!(
                            "no single output holds {} of {}",
                            quantity, unit
                        ))
                    })?;
                let (policy_id, name) = split_unit(unit)?;
                let mut user_output = TxOutput {
                    address: user_bytes,
                    value: OutputValue::Multi {
                        coin: 0,
                        assets: vec![MultiAssetEntry {
                            policy_id,
                            assets: vec![(name, quantity)],
                        }],
                    },
                };
                // Token outputs must carry the minimum lovelace for their size
                let encoded_len = codec::encode_body(&TxBody {
                    inputs: vec![],
                    outputs: vec![user_output.clone()],
                    fee: 0,
                    ttl: None,
                })
                .len();
                if let OutputValue::Multi { coin, .. } = &mut user_output.value {
                    *coin = Self::min_ada(&params, encoded_len);
                }
                (selected, user_output, Some((unit, quantity)))
            }
        };

        let input = TxInput {
            tx_id: hex::decode(&selected.tx_hash)
                .ok()
                .and_then(|b| <[u8; 32]>::try_from(b).ok())
                .ok_or_else(|| {
                    AdapterError::Codec(format!("bad utxo tx hash: {}", selected.tx_hash))
                })?,
            index: selected.output_index,
        };

        let utxo_lovelace = selected.lovelace()?;
        let change_assets = Self::remaining_assets(selected, withdrawn)?;
        let sent_lovelace = user_output.value.coin();

        // Draft with a placeholder fee to size the transaction, then rebuild
        // until the linear fee stops moving (the second pass settles unless
        // the fee's integer width changes)
        let mut fee = params.fee_for_size(300);
        for _ in 0..4 {
            let change_lovelace = utxo_lovelace
                .checked_sub(sent_lovelace + fee)
                .ok_or_else(|| {
                    AdapterError::InvalidInput(format!(
                        "selected output ({} lovelace) cannot cover {} + {} fee",
                        utxo_lovelace, sent_lovelace, fee
                    ))
                })?;

            let change_output = TxOutput {
                address: bridge_bytes.clone(),
                value: if change_assets.is_empty() {
                    OutputValue::Coin(change_lovelace)
                } else {
                    OutputValue::Multi {
                        coin: change_lovelace,
                        assets: change_assets.clone(),
                    }
                },
            };
            let change_len = codec::encode_body(&TxBody {
                inputs: vec![],
                outputs: vec![change_output.clone()],
                fee: 0,
                ttl: None,
            })
            .len();

            let mut outputs = vec![user_output.clone()];
            if change_lovelace >= Self::min_ada(&params, change_len) {
                outputs.push(change_output);
            } else if change_assets.is_empty() {
                // Sub-minimum pure-lovelace change is folded into the fee
            } else {
                return Err(AdapterError::InvalidInput(
                    "change with assets falls below the minimum lovelace".into(),
                ));
            }

            let body = TxBody {
                inputs: vec![input.clone()],
                outputs,
                fee,
                ttl: Some(slot + TTL_SLOTS),
            };
            let body_len = codec::encode_body(&body).len();
            let next_fee = params.fee_for_size(body_len + WITNESS_SIZE_ALLOWANCE);
            if next_fee == fee {
                let tx_bytes = codec::encode_unsigned(&body);
                let preimage = codec::signing_preimage(&tx_bytes)?;
                debug!(
                    utxo = %format!("{}#{}", selected.tx_hash, selected.output_index),
                    fee,
                    ttl = slot + TTL_SLOTS,
                    "Built cardano withdrawal"
                );
                return Ok(UnsignedWithdrawal {
                    serialized_tx: tx_bytes,
                    signing_payload: preimage.to_vec(),
                });
            }
            fee = next_fee;
        }

        Err(AdapterError::Codec("cardano fee calculation did not converge".into()))
    }

    fn pubkey_bytes_to_address(&self, pubkey: &[u8]) -> Result<String> {
        let pk: [u8; 32] = pubkey.try_into().map_err(|_| {
            AdapterError::address("cardano", "public key must be 32 bytes".to_string())
        })?;
        address::encode(&pk, self.network)
    }

    fn pubkey_bytes_to_pubkey_str(&self, pubkey: &[u8]) -> Result<String> {
        if pubkey.len() != 32 {
            return Err(AdapterError::address(
                "cardano",
                "public key must be 32 bytes".to_string(),
            ));
        }
        Ok(hex::encode(pubkey))
    }

    fn validate_address(&self, addr: &str) -> bool {
        address::validate(addr, self.network)
    }
}
