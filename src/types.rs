//! Shared types for the adapter core
//!
//! Chain descriptors are loaded by the host process at startup and never
//! mutated afterwards. Everything else here is a plain value type passed
//! across the [`crate::chain::Blockchain`] boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AdapterError;

/// All-zeros EVM address used as the `token_address` of native-coin
/// transfers on every chain
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

// ============================================================================
// Chain identity
// ============================================================================

/// Supported chain families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    Algorand,
    Aptos,
    Bitcoin,
    Cardano,
    Ripple,
    Stellar,
    Evm,
}

impl ChainFamily {
    /// Get the family as a lowercase string
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainFamily::Algorand => "algorand",
            ChainFamily::Aptos => "aptos",
            ChainFamily::Bitcoin => "bitcoin",
            ChainFamily::Cardano => "cardano",
            ChainFamily::Ripple => "ripple",
            ChainFamily::Stellar => "stellar",
            ChainFamily::Evm => "evm",
        }
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChainFamily {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "algorand" | "algo" => Ok(ChainFamily::Algorand),
            "aptos" | "apt" => Ok(ChainFamily::Aptos),
            "bitcoin" | "btc" => Ok(ChainFamily::Bitcoin),
            "cardano" | "ada" => Ok(ChainFamily::Cardano),
            "ripple" | "xrp" | "xrpl" => Ok(ChainFamily::Ripple),
            "stellar" | "xlm" => Ok(ChainFamily::Stellar),
            "evm" | "ethereum" | "eth" => Ok(ChainFamily::Evm),
            other => Err(AdapterError::InvalidInput(format!(
                "unknown chain family: {}",
                other
            ))),
        }
    }
}

/// Network variant of a chain deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Mainnet,
    Testnet,
    /// Covers regtest (Bitcoin), preprod (Cardano) and devnet (Aptos)
    Devnet,
}

impl NetworkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkType::Mainnet => "mainnet",
            NetworkType::Testnet => "testnet",
            NetworkType::Devnet => "devnet",
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Signing curve of a chain's accounts
///
/// Tags are canonicalized to `"ed25519"` and `"secp256k1"`; the legacy
/// `"ecdsa"`/`"eddsa"`/`"bitcoin_ecdsa"` spellings are accepted on parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyCurve {
    Ed25519,
    Secp256k1,
}

impl KeyCurve {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyCurve::Ed25519 => "ed25519",
            KeyCurve::Secp256k1 => "secp256k1",
        }
    }
}

impl fmt::Display for KeyCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for KeyCurve {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ed25519" | "eddsa" => Ok(KeyCurve::Ed25519),
            "secp256k1" | "ecdsa" | "bitcoin_ecdsa" => Ok(KeyCurve::Secp256k1),
            other => Err(AdapterError::InvalidInput(format!(
                "unknown key curve: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// Chain descriptor (startup configuration)
// ============================================================================

/// Immutable description of one chain deployment, loaded at startup
#[derive(Debug, Clone, Deserialize)]
pub struct ChainDescriptor {
    /// Stable string key (e.g., "algorand-mainnet")
    pub chain_id: String,
    pub family: ChainFamily,
    pub network: NetworkType,
    /// Node RPC endpoint
    pub node_url: String,
    /// Indexer/explorer endpoint where the family needs one
    #[serde(default)]
    pub indexer_url: Option<String>,
    /// API token or `user:pass` for the node endpoint
    #[serde(default)]
    pub credentials: Option<String>,
    pub key_curve: KeyCurve,
    /// Textual tag documenting how signing payloads are transported to the
    /// signer ("hex", "base64", "raw-32"); informational only
    pub signing_encoding: String,
    /// Native coin ticker
    pub token_symbol: String,
    /// Per-request deadline for this chain's endpoints
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

// ============================================================================
// Uniform output records
// ============================================================================

/// One asset movement extracted from a confirmed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Source address in chain-native encoding
    pub from: String,
    /// Destination address in chain-native encoding
    pub to: String,
    /// Decimal-formatted amount with the asset's native decimals
    pub amount: String,
    /// Integer amount in the smallest on-chain unit
    pub scaled_amount: String,
    /// Human symbol, ASA id, policy id, or currency code
    pub token: String,
    /// Whether this is the chain's base coin
    pub is_native: bool,
    /// [`ZERO_ADDRESS`] iff `is_native`, else the chain-specific token id
    pub token_address: String,
}

/// Status of a previously submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmationStatus {
    Confirmed,
    Pending,
    NotFound,
    Failed,
}

impl ConfirmationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationStatus::Confirmed => "confirmed",
            ConfirmationStatus::Pending => "pending",
            ConfirmationStatus::NotFound => "not_found",
            ConfirmationStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unsigned withdrawal handle: the canonical transaction bytes plus the
/// exact octet string the external signer must sign
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedWithdrawal {
    pub serialized_tx: Vec<u8>,
    pub signing_payload: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_roundtrip() {
        for family in [
            ChainFamily::Algorand,
            ChainFamily::Aptos,
            ChainFamily::Bitcoin,
            ChainFamily::Cardano,
            ChainFamily::Ripple,
            ChainFamily::Stellar,
            ChainFamily::Evm,
        ] {
            assert_eq!(family.as_str().parse::<ChainFamily>().unwrap(), family);
        }
    }

    #[test]
    fn test_family_aliases() {
        assert_eq!("XRP".parse::<ChainFamily>().unwrap(), ChainFamily::Ripple);
        assert_eq!("eth".parse::<ChainFamily>().unwrap(), ChainFamily::Evm);
        assert!("near".parse::<ChainFamily>().is_err());
    }

    #[test]
    fn test_key_curve_canonicalization() {
        assert_eq!("eddsa".parse::<KeyCurve>().unwrap(), KeyCurve::Ed25519);
        assert_eq!(
            "bitcoin_ecdsa".parse::<KeyCurve>().unwrap(),
            KeyCurve::Secp256k1
        );
        assert_eq!(KeyCurve::Secp256k1.as_str(), "secp256k1");
    }

    #[test]
    fn test_descriptor_deserialization() {
        let descriptor: ChainDescriptor = serde_json::from_value(serde_json::json!({
            "chain_id": "algorand-testnet",
            "family": "algorand",
            "network": "testnet",
            "node_url": "https://testnet-api.algonode.cloud",
            "indexer_url": "https://testnet-idx.algonode.cloud",
            "key_curve": "ed25519",
            "signing_encoding": "base64",
            "token_symbol": "ALGO"
        }))
        .unwrap();

        assert_eq!(descriptor.family, ChainFamily::Algorand);
        assert_eq!(descriptor.request_timeout_secs, 30);
        assert!(descriptor.credentials.is_none());
    }
}
