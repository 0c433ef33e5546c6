//! The uniform `Blockchain` contract
//!
//! One implementation per chain family. All methods are safe for concurrent
//! use; network-facing operations honor the per-chain request deadline and
//! surface [`crate::error::AdapterError::Timeout`] on expiry.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChainFamily, ConfirmationStatus, KeyCurve, Transfer, UnsignedWithdrawal};

/// Polymorphic per-chain adapter surface
#[async_trait]
pub trait Blockchain: Send + Sync {
    /// The chain family this adapter serves
    fn chain_name(&self) -> ChainFamily;

    /// Curve the external signer must use for this chain
    fn key_curve(&self) -> KeyCurve;

    /// Textual tag documenting how signing payloads are transported to the
    /// signer; informational only
    fn signing_encoding(&self) -> &str;

    /// Attach an externally produced signature to a previously built
    /// unsigned transaction and submit it
    ///
    /// `pubkey` is required by Ed25519 families to assemble the verifiable
    /// envelope; secp256k1 families recover the key from the signature and
    /// accept `None`. Executes decode → attach → encode → submit strictly
    /// in order; returns the chain-assigned transaction id.
    async fn broadcast(
        &self,
        serialized_tx: &[u8],
        signature: &[u8],
        pubkey: Option<&[u8]>,
    ) -> Result<String>;

    /// Extract the normalized transfers of a confirmed transaction
    async fn get_transfers(&self, tx_id: &str) -> Result<Vec<Transfer>>;

    /// Classify the status of a submitted transaction
    async fn is_confirmed(&self, tx_id: &str) -> Result<ConfirmationStatus>;

    /// Build an unsigned withdraw transaction from the bridge account to
    /// `user` and return its canonical bytes plus the signing payload
    ///
    /// `amount` is a decimal string in the asset's native denomination.
    /// `token_address` of `None` withdraws the chain's base coin.
    async fn build_withdraw(
        &self,
        bridge: &str,
        amount: &str,
        user: &str,
        token_address: Option<&str>,
    ) -> Result<UnsignedWithdrawal>;

    /// Derive the chain-native address for raw public key bytes
    fn pubkey_bytes_to_address(&self, pubkey: &[u8]) -> Result<String>;

    /// Render raw public key bytes in the chain's public-key string form
    fn pubkey_bytes_to_pubkey_str(&self, pubkey: &[u8]) -> Result<String>;

    /// Whether `address` is well-formed for this chain and network
    fn validate_address(&self, address: &str) -> bool;
}
