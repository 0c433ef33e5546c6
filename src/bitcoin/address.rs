//! Bitcoin address derivation and validation
//!
//! The bridge pays out to P2PKH addresses. Validation runs a cheap regex
//! prefilter first, then the authoritative base58check decode with version
//! and network checks.

use bitcoin::{Address, AddressType, Network, PublicKey};
use lazy_static::lazy_static;
use regex::Regex;
use std::str::FromStr;

use crate::error::{AdapterError, Result};
use crate::types::NetworkType;

lazy_static! {
    /// Prefilter for base58 P2PKH/P2SH shapes across mainnet and testnet
    static ref BASE58_ADDRESS_RE: Regex =
        Regex::new(r"^[13mn2][1-9A-HJ-NP-Za-km-z]{25,34}$").expect("static regex");
}

/// Map the descriptor network onto the bitcoin crate's network
pub fn to_bitcoin_network(network: NetworkType) -> Network {
    match network {
        NetworkType::Mainnet => Network::Bitcoin,
        NetworkType::Testnet => Network::Testnet,
        NetworkType::Devnet => Network::Regtest,
    }
}

/// Parse a compressed (33-byte) or uncompressed (65-byte) secp256k1 public
/// key, returning its compressed form
pub fn compress_pubkey(pubkey: &[u8]) -> Result<PublicKey> {
    let key = bitcoin::secp256k1::PublicKey::from_slice(pubkey)
        .map_err(|e| AdapterError::address("bitcoin", format!("bad public key: {}", e)))?;
    Ok(PublicKey::new(key))
}

/// Derive the P2PKH address of a public key on one network
pub fn encode(pubkey: &[u8], network: Network) -> Result<String> {
    let key = compress_pubkey(pubkey)?;
    Ok(Address::p2pkh(key.pubkey_hash(), network).to_string())
}

/// Derive the three network-variant addresses (mainnet, testnet, regtest)
pub fn network_addresses(pubkey: &[u8]) -> Result<[String; 3]> {
    Ok([
        encode(pubkey, Network::Bitcoin)?,
        encode(pubkey, Network::Testnet)?,
        encode(pubkey, Network::Regtest)?,
    ])
}

/// Authoritative decode of an address for one network
pub fn decode(address: &str, network: Network) -> Result<Address> {
    Address::from_str(address)
        .map_err(|e| AdapterError::address("bitcoin", format!("{}: {}", address, e)))?
        .require_network(network)
        .map_err(|e| AdapterError::address("bitcoin", format!("{}: {}", address, e)))
}

/// Whether `address` is a well-formed base58 address for `network`
pub fn validate(address: &str, network: Network) -> bool {
    if !BASE58_ADDRESS_RE.is_match(address) {
        return false;
    }
    match decode(address, network) {
        Ok(decoded) => matches!(
            decoded.address_type(),
            Some(AddressType::P2pkh) | Some(AddressType::P2sh)
        ),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Generator-point public key, compressed
    const PK_HEX: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    #[test]
    fn test_network_variants() {
        let pubkey = hex::decode(PK_HEX).unwrap();
        let [mainnet, testnet, regtest] = network_addresses(&pubkey).unwrap();

        assert!(mainnet.starts_with('1'));
        assert!(testnet.starts_with('m') || testnet.starts_with('n'));
        // Testnet and regtest share the 0x6f version byte
        assert_eq!(testnet, regtest);
        assert_ne!(mainnet, testnet);
    }

    #[test]
    fn test_uncompressed_key_compresses_to_same_address() {
        let compressed = hex::decode(PK_HEX).unwrap();
        let parsed = bitcoin::secp256k1::PublicKey::from_slice(&compressed).unwrap();
        let uncompressed = parsed.serialize_uncompressed();

        assert_eq!(
            encode(&compressed, Network::Bitcoin).unwrap(),
            encode(&uncompressed, Network::Bitcoin).unwrap()
        );
    }

    #[test]
    fn test_derive_then_validate() {
        let pubkey = hex::decode(PK_HEX).unwrap();
        for network in [Network::Bitcoin, Network::Testnet, Network::Regtest] {
            let address = encode(&pubkey, network).unwrap();
            assert!(validate(&address, network), "{}", address);
        }
    }

    #[test]
    fn test_validate_rejects_wrong_network_and_noise() {
        let pubkey = hex::decode(PK_HEX).unwrap();
        let mainnet = encode(&pubkey, Network::Bitcoin).unwrap();
        assert!(!validate(&mainnet, Network::Testnet));
        assert!(!validate("not-an-address", Network::Bitcoin));
        // 'l' and '0' are outside the base58 alphabet
        assert!(!validate("1l0l0l0l0l0l0l0l0l0l0l0l0l0", Network::Bitcoin));
    }
}
