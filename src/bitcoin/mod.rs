//! Bitcoin chain adapter
//!
//! Legacy P2PKH spends from a single bridge UTXO. The unsigned handle
//! carries exactly one signing payload, so withdrawals select one spendable
//! output covering amount + fee.

pub mod address;
pub mod client;
pub mod codec;
pub mod transfers;

use async_trait::async_trait;
use bitcoin::absolute::LockTime;
use bitcoin::transaction::Version;
use bitcoin::{Amount, Network, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::chain::Blockchain;
use crate::encoding::parse_units;
use crate::error::{AdapterError, Result};
use crate::http::{retry_once, HttpClientCache};
use crate::types::{
    ChainDescriptor, ChainFamily, ConfirmationStatus, KeyCurve, Transfer, UnsignedWithdrawal,
};

use client::BitcoinClient;
use transfers::BTC_DECIMALS;

/// Blocks before a transaction counts as confirmed
const CONFIRMATION_THRESHOLD: u64 = 3;

/// Outputs below this are dust and are folded into the fee
const DUST_LIMIT_SATS: u64 = 546;

/// Estimated vsize of a 1-input 2-output P2PKH spend
const ESTIMATED_VSIZE: u64 = 148 + 2 * 34 + 10;

pub struct BitcoinAdapter {
    client: BitcoinClient,
    network: Network,
    signing_encoding: String,
    token_symbol: String,
}

impl BitcoinAdapter {
    pub fn new(descriptor: &ChainDescriptor, cache: &HttpClientCache) -> Result<Self> {
        let http = cache.get_or_create(
            &descriptor.node_url,
            Duration::from_secs(descriptor.request_timeout_secs),
        )?;
        Ok(Self {
            client: BitcoinClient::new(
                http,
                &descriptor.node_url,
                descriptor.credentials.as_deref(),
            ),
            network: address::to_bitcoin_network(descriptor.network),
            signing_encoding: descriptor.signing_encoding.clone(),
            token_symbol: descriptor.token_symbol.clone(),
        })
    }

    /// The scriptPubKey of the output spent by `input`
    async fn spent_script(&self, tx: &Transaction) -> Result<ScriptBuf> {
        let input = tx.input.first().ok_or_else(|| {
            AdapterError::EnvelopeMalformed("transaction has no inputs".into())
        })?;
        let prev = input.previous_output;
        let prev_txid = prev.txid.to_string();
        let hex = retry_once(|| self.client.output_script_hex(&prev_txid, prev.vout)).await?;
        codec::script_from_hex(&hex)
    }
}

#[async_trait]
impl Blockchain for BitcoinAdapter {
    fn chain_name(&self) -> ChainFamily {
        ChainFamily::Bitcoin
    }

    fn key_curve(&self) -> KeyCurve {
        KeyCurve::Secp256k1
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
        let script = self.spent_script(&tx).await?;

        // Without an accompanying key, recover it from the signature over
        // the recomputed digest and match it against the spent output
        let pubkey = match pubkey {
            Some(pk) => pk.to_vec(),
            None => {
                let sighash = codec::legacy_sighash(&tx, 0, &script)?;
                codec::recover_pubkey(signature, &sighash, &script)?
            }
        };

        let signed = codec::attach_signature(&tx, 0, signature, &pubkey)?;
        self.client
            .send_raw_transaction(&codec::encode_unsigned(&signed))
            .await
    }

    async fn get_transfers(&self, tx_id: &str) -> Result<Vec<Transfer>> {
        let tx = retry_once(|| self.client.get_transaction(tx_id)).await?;
        transfers::extract(&tx, &self.token_symbol)
    }

    async fn is_confirmed(&self, tx_id: &str) -> Result<ConfirmationStatus> {
        match retry_once(|| self.client.get_transaction(tx_id)).await {
            Ok(tx) if tx.confirmations.unwrap_or(0) >= CONFIRMATION_THRESHOLD => {
                Ok(ConfirmationStatus::Confirmed)
            }
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
        if token_address.is_some() {
            return Err(AdapterError::InvalidInput(
                "bitcoin withdrawals carry no token".into(),
            ));
        }
        if !address::validate(user, self.network) {
            return Err(AdapterError::InvalidRecipient(user.to_string()));
        }
        let bridge_address = address::decode(bridge, self.network)
            .map_err(|_| AdapterError::InvalidInput(format!("bad bridge address: {}", bridge)))?;
        let user_address = address::decode(user, self.network)?;
        let amount_sats = u64::try_from(parse_units(amount, BTC_DECIMALS)?)
            .map_err(|_| AdapterError::InvalidInput(format!("amount too large: {}", amount)))?;

        let fee_rate = retry_once(|| self.client.fee_rate_sat_vb()).await?;
        let fee = fee_rate * ESTIMATED_VSIZE;

        // One input means one signing payload; pick the largest output that
        // covers the spend on its own
        let unspents = retry_once(|| self.client.list_unspent(bridge)).await?;
        let mut best: Option<(&client::Unspent, u64)> = None;
        for unspent in &unspents {
            let value = unspent.value_sats()?;
            if best.map(|(_, v)| value > v).unwrap_or(true) {
                best = Some((unspent, value));
            }
        }
        let (selected, selected_value) = best.ok_or_else(|| {
            AdapterError::InvalidInput(format!("no spendable outputs for {}", bridge))
        })?;
        if selected_value < amount_sats + fee {
            return Err(AdapterError::InvalidInput(format!(
                "largest spendable output ({} sats) cannot cover {} + {} fee",
                selected_value, amount_sats, fee
            )));
        }

        let mut output = vec![TxOut {
            value: Amount::from_sat(amount_sats),
            script_pubkey: user_address.script_pubkey(),
        }];
        let change = selected_value - amount_sats - fee;
        if change > DUST_LIMIT_SATS {
            output.push(TxOut {
                value: Amount::from_sat(change),
                script_pubkey: bridge_address.script_pubkey(),
            });
        }

        let tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::new(
                    bitcoin::Txid::from_str(&selected.txid)
                        .map_err(|e| AdapterError::Codec(format!("bad txid: {}", e)))?,
                    selected.vout,
                ),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::default(),
            }],
            output,
        };

        let script_pubkey = codec::script_from_hex(&selected.script_pub_key)?;
        let sighash = codec::legacy_sighash(&tx, 0, &script_pubkey)?;
        debug!(
            utxo = %format!("{}:{}", selected.txid, selected.vout),
            amount_sats,
            fee,
            "Built bitcoin withdrawal"
        );

        Ok(UnsignedWithdrawal {
            serialized_tx: codec::encode_unsigned(&tx),
            signing_payload: sighash.to_vec(),
        })
    }

    fn pubkey_bytes_to_address(&self, pubkey: &[u8]) -> Result<String> {
        address::encode(pubkey, self.network)
    }

    fn pubkey_bytes_to_pubkey_str(&self, pubkey: &[u8]) -> Result<String> {
        let key = address::compress_pubkey(pubkey)?;
        Ok(key.to_string())
    }

    fn validate_address(&self, addr: &str) -> bool {
        address::validate(addr, self.network)
    }
}
