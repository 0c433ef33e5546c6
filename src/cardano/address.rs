//! Cardano Shelley address codec
//!
//! The bridge uses key-hash enterprise addresses: one byte of header
//! (`0x61` mainnet, `0x60` testnet) followed by the Blake2b-224 of the
//! Ed25519 payment key, bech32-wrapped with HRP `addr`/`addr_test`.

use bech32::{FromBase32, ToBase32, Variant};

use crate::encoding::hash::blake2b224;
use crate::error::{AdapterError, Result};
use crate::types::NetworkType;

/// Enterprise key-hash header for a network
fn header_byte(network: NetworkType) -> u8 {
    match network {
        NetworkType::Mainnet => 0x61,
        _ => 0x60,
    }
}

/// Human-readable prefix for a network
pub fn hrp(network: NetworkType) -> &'static str {
    match network {
        NetworkType::Mainnet => "addr",
        _ => "addr_test",
    }
}

/// Derive the enterprise address of an Ed25519 public key
pub fn encode(pubkey: &[u8; 32], network: NetworkType) -> Result<String> {
    let mut payload = [0u8; 29];
    payload[0] = header_byte(network);
    payload[1..].copy_from_slice(&blake2b224(pubkey));

    bech32::encode(hrp(network), payload.to_base32(), Variant::Bech32)
        .map_err(|e| AdapterError::address("cardano", format!("bech32 encode: {}", e)))
}

/// Decode a Shelley address to its raw bytes, checking the HRP against the
/// network
pub fn decode(address: &str, network: NetworkType) -> Result<Vec<u8>> {
    let (found_hrp, data, variant) = bech32::decode(address)
        .map_err(|e| AdapterError::address("cardano", format!("bech32: {}", e)))?;
    if variant != Variant::Bech32 {
        return Err(AdapterError::address("cardano", "bech32m is not a Shelley address"));
    }
    if found_hrp != hrp(network) {
        return Err(AdapterError::address(
            "cardano",
            format!("expected hrp '{}', got '{}'", hrp(network), found_hrp),
        ));
    }
    let bytes = Vec::<u8>::from_base32(&data)
        .map_err(|e| AdapterError::address("cardano", format!("base32: {}", e)))?;
    // Enterprise (29) and base (57) payment addresses are accepted
    if bytes.len() != 29 && bytes.len() != 57 {
        return Err(AdapterError::address(
            "cardano",
            format!("unexpected payload length {}", bytes.len()),
        ));
    }
    Ok(bytes)
}

/// Whether `address` is a well-formed payment address for `network`
pub fn validate(address: &str, network: NetworkType) -> bool {
    decode(address, network).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Ed25519 base-point encoding, the reference key used across the
    // address-derivation tests
    const PK_HEX: &str = "5866666666666666666666666666666666666666666666666666666666666666";

    fn reference_key() -> [u8; 32] {
        hex::decode(PK_HEX).unwrap().try_into().unwrap()
    }

    #[test]
    fn test_mainnet_reference_address() {
        assert_eq!(
            encode(&reference_key(), NetworkType::Mainnet).unwrap(),
            "addr1vx8huzmqryfxf65e8f6mv6q87ce2thfsgp20pg96ea3x49cgg73d3"
        );
    }

    #[test]
    fn test_testnet_reference_address() {
        assert_eq!(
            encode(&reference_key(), NetworkType::Testnet).unwrap(),
            "addr_test1vz8huzmqryfxf65e8f6mv6q87ce2thfsgp20pg96ea3x49cnq2dz5"
        );
    }

    #[test]
    fn test_encode_then_validate() {
        for network in [NetworkType::Mainnet, NetworkType::Testnet] {
            let address = encode(&reference_key(), network).unwrap();
            assert!(validate(&address, network));
        }
    }

    #[test]
    fn test_network_mismatch_rejected() {
        let mainnet = encode(&reference_key(), NetworkType::Mainnet).unwrap();
        assert!(!validate(&mainnet, NetworkType::Testnet));
    }

    #[test]
    fn test_decoded_header_and_hash() {
        let address = encode(&reference_key(), NetworkType::Mainnet).unwrap();
        let bytes = decode(&address, NetworkType::Mainnet).unwrap();
        assert_eq!(bytes.len(), 29);
        assert_eq!(bytes[0], 0x61);
        assert_eq!(&bytes[1..], &blake2b224(&reference_key()));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(!validate("addr1qqqqq", NetworkType::Mainnet));
        assert!(!validate("stake1u9xxx", NetworkType::Mainnet));
        assert!(!validate("", NetworkType::Mainnet));
    }
}
