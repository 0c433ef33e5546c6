//! Aptos account address derivation
//!
//! Single-key scheme: account address = SHA3-256(pubkey ‖ 0x00), rendered
//! as 0x-prefixed hex.

use crate::encoding::hash::sha3_256;
use crate::error::{AdapterError, Result};

/// Ed25519 single-signer scheme identifier
const SCHEME_ED25519: u8 = 0x00;

/// Derive the account address for an Ed25519 public key
pub fn encode(pubkey: &[u8; 32]) -> String {
    let mut preimage = [0u8; 33];
    preimage[..32].copy_from_slice(pubkey);
    preimage[32] = SCHEME_ED25519;
    format!("0x{}", hex::encode(sha3_256(&preimage)))
}

/// Parse an address string to its 32 raw bytes (short forms accepted)
pub fn decode(address: &str) -> Result<[u8; 32]> {
    let stripped = address.strip_prefix("0x").unwrap_or(address);
    if stripped.is_empty() || stripped.len() > 64 {
        return Err(AdapterError::address(
            "aptos",
            format!("bad address length: {}", address),
        ));
    }
    let padded = format!("{:0>64}", stripped);
    let bytes = hex::decode(&padded)
        .map_err(|e| AdapterError::address("aptos", format!("hex: {}", e)))?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Whether `address` is well-formed
pub fn validate(address: &str) -> bool {
    decode(address).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_address_shape() {
        let address = encode(&[1u8; 32]);
        assert!(address.starts_with("0x"));
        assert_eq!(address.len(), 66);
        assert!(validate(&address));
    }

    #[test]
    fn test_scheme_byte_matters() {
        // Appending the scheme byte must change the digest
        let with_scheme = encode(&[1u8; 32]);
        let bare = format!("0x{}", hex::encode(sha3_256(&[1u8; 32])));
        assert_ne!(with_scheme, bare);
    }

    #[test]
    fn test_decode_short_form() {
        let bytes = decode("0x1").unwrap();
        assert_eq!(bytes[31], 1);
        assert!(bytes[..31].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_validate_rejects_garbage() {
        assert!(!validate("0x"));
        assert!(!validate("xyz"));
        assert!(!validate(&format!("0x{}", "f".repeat(65))));
    }
}
