//! EVM address derivation and validation
//!
//! Address = last 20 bytes of keccak256 over the 64-byte uncompressed
//! public key (without the 0x04 tag), rendered with EIP-55 checksum casing.

use crate::encoding::hash::keccak256;
use crate::error::{AdapterError, Result};

/// Derive the checksummed address of a secp256k1 public key
///
/// Accepts the 64-byte raw coordinates, the 65-byte uncompressed form, or a
/// 33-byte compressed key (decompressed before hashing).
pub fn encode(pubkey: &[u8]) -> Result<String> {
    let raw: Vec<u8> = match pubkey.len() {
        64 => pubkey.to_vec(),
        65 if pubkey[0] == 0x04 => pubkey[1..].to_vec(),
        33 => {
            let key = bitcoin::secp256k1::PublicKey::from_slice(pubkey)
                .map_err(|e| AdapterError::address("evm", format!("bad public key: {}", e)))?;
            key.serialize_uncompressed()[1..].to_vec()
        }
        len => {
            return Err(AdapterError::address(
                "evm",
                format!("public key must be 33, 64 or 65 bytes, got {}", len),
            ))
        }
    };

    let digest = keccak256(&raw);
    Ok(to_checksum(&digest[12..]))
}

/// EIP-55 checksum casing over 20 address bytes
pub fn to_checksum(address: &[u8]) -> String {
    let lower = hex::encode(address);
    let digest = keccak256(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (digest[i / 2] >> (4 * (1 - i % 2))) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Whether `address` is well-formed; mixed-case addresses must carry a
/// valid EIP-55 checksum
pub fn validate(address: &str) -> bool {
    let Some(body) = address.strip_prefix("0x") else {
        return false;
    };
    if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }
    // All-lower and all-upper forms carry no checksum
    if body.chars().all(|c| !c.is_ascii_uppercase())
        || body.chars().all(|c| !c.is_ascii_lowercase())
    {
        return true;
    }
    match hex::decode(body) {
        Ok(bytes) => to_checksum(&bytes) == address,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eip55_reference_vectors() {
        // Casing vectors from the EIP-55 specification
        for expected in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ] {
            let bytes = hex::decode(&expected[2..]).unwrap();
            assert_eq!(to_checksum(&bytes), expected);
            assert!(validate(expected));
        }
    }

    #[test]
    fn test_derive_from_known_key() {
        // Generator point; the derived account is a fixed vector
        let compressed =
            hex::decode("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
                .unwrap();
        let address = encode(&compressed).unwrap();
        assert_eq!(
            address.to_lowercase(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
        assert!(validate(&address));
    }

    #[test]
    fn test_uncompressed_forms_agree() {
        let compressed =
            hex::decode("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
                .unwrap();
        let key = bitcoin::secp256k1::PublicKey::from_slice(&compressed).unwrap();
        let uncompressed = key.serialize_uncompressed();

        assert_eq!(encode(&compressed).unwrap(), encode(&uncompressed).unwrap());
        assert_eq!(
            encode(&compressed).unwrap(),
            encode(&uncompressed[1..]).unwrap()
        );
    }

    #[test]
    fn test_validate_rejects_bad_checksum_and_noise() {
        assert!(validate("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"));
        assert!(!validate("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAeD"));
        assert!(!validate("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
        assert!(!validate("0x123"));
    }
}
