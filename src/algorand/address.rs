//! Algorand address encoding
//!
//! An address is the base32 (no padding) form of the 32-byte Ed25519 public
//! key followed by the trailing 4 bytes of its SHA-512/256 digest.

use data_encoding::BASE32_NOPAD;

use crate::encoding::hash::sha512_256;
use crate::error::{AdapterError, Result};

/// Encode an Ed25519 public key as an Algorand address
pub fn encode(pubkey: &[u8; 32]) -> String {
    let digest = sha512_256(pubkey);
    let mut payload = [0u8; 36];
    payload[..32].copy_from_slice(pubkey);
    payload[32..].copy_from_slice(&digest[28..32]);
    BASE32_NOPAD.encode(&payload)
}

/// Decode an Algorand address back to the public key, verifying the checksum
pub fn decode(address: &str) -> Result<[u8; 32]> {
    let payload = BASE32_NOPAD
        .decode(address.as_bytes())
        .map_err(|e| AdapterError::address("algorand", format!("base32: {}", e)))?;

    if payload.len() != 36 {
        return Err(AdapterError::address(
            "algorand",
            format!("expected 36 decoded bytes, got {}", payload.len()),
        ));
    }

    let mut pubkey = [0u8; 32];
    pubkey.copy_from_slice(&payload[..32]);

    let digest = sha512_256(&pubkey);
    if payload[32..] != digest[28..32] {
        return Err(AdapterError::address("algorand", "checksum mismatch"));
    }

    Ok(pubkey)
}

/// Whether `address` is a well-formed Algorand address
pub fn validate(address: &str) -> bool {
    address.len() == 58 && decode(address).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let pubkey = [7u8; 32];
        let address = encode(&pubkey);
        assert_eq!(address.len(), 58);
        assert_eq!(decode(&address).unwrap(), pubkey);
        assert!(validate(&address));
    }

    #[test]
    fn test_zero_key_known_address() {
        // The all-zero public key has a well-known encoding
        let address = encode(&[0u8; 32]);
        assert_eq!(
            address,
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ"
        );
    }

    #[test]
    fn test_validate_rejects_corruption() {
        let mut address = encode(&[7u8; 32]);
        // Flip one character; base32 decode still succeeds but the checksum fails
        let replacement = if address.ends_with('A') { "B" } else { "A" };
        address.replace_range(address.len() - 1.., replacement);
        assert!(!validate(&address));
        assert!(!validate("TOO-SHORT"));
    }
}
