//! Ripple account address codec
//!
//! The signing public key is `0xED ‖ pk32`. The classic address is the
//! base58check (Ripple alphabet) of version byte `0x00` followed by
//! HASH160 of the signing public key.

use bs58::Alphabet;

use crate::encoding::hash::hash160;
use crate::error::{AdapterError, Result};

/// Account-id version byte
const ACCOUNT_ID_VERSION: u8 = 0x00;

/// Ed25519 key-type prefix of the signing public key
pub const ED25519_PREFIX: u8 = 0xed;

/// Build the 33-byte signing public key for raw Ed25519 key bytes
pub fn signing_pubkey(pubkey: &[u8; 32]) -> [u8; 33] {
    let mut out = [0u8; 33];
    out[0] = ED25519_PREFIX;
    out[1..].copy_from_slice(pubkey);
    out
}

/// Uppercase-hex form of the signing public key (`ED…`)
pub fn pubkey_str(pubkey: &[u8; 32]) -> String {
    hex::encode_upper(signing_pubkey(pubkey))
}

/// Parse an `ED…` signing-public-key string back to its 33 bytes
pub fn parse_pubkey_str(text: &str) -> Result<[u8; 33]> {
    let bytes = hex::decode(text)
        .map_err(|e| AdapterError::address("ripple", format!("pubkey hex: {}", e)))?;
    let key: [u8; 33] = bytes
        .try_into()
        .map_err(|_| AdapterError::address("ripple", "signing pubkey must be 33 bytes"))?;
    if key[0] != ED25519_PREFIX {
        return Err(AdapterError::address(
            "ripple",
            format!("expected ED key-type prefix, got 0x{:02x}", key[0]),
        ));
    }
    Ok(key)
}

/// The 20-byte account id of a signing public key
pub fn account_id(signing_pubkey: &[u8; 33]) -> [u8; 20] {
    hash160(signing_pubkey)
}

/// Encode an account id as a classic `r…` address
pub fn encode_account_id(account: &[u8; 20]) -> String {
    let mut payload = [0u8; 21];
    payload[0] = ACCOUNT_ID_VERSION;
    payload[1..].copy_from_slice(account);
    bs58::encode(payload)
        .with_alphabet(Alphabet::RIPPLE)
        .with_check()
        .into_string()
}

/// Derive the classic address of a raw Ed25519 public key
pub fn encode(pubkey: &[u8; 32]) -> String {
    encode_account_id(&account_id(&signing_pubkey(pubkey)))
}

/// Decode a classic address to its 20-byte account id, verifying version
/// byte and checksum
pub fn decode(address: &str) -> Result<[u8; 20]> {
    let payload = bs58::decode(address)
        .with_alphabet(Alphabet::RIPPLE)
        .with_check(Some(ACCOUNT_ID_VERSION))
        .into_vec()
        .map_err(|e| AdapterError::address("ripple", format!("{}: {}", address, e)))?;
    if payload.len() != 21 {
        return Err(AdapterError::address(
            "ripple",
            format!("decoded to {} bytes, expected 21", payload.len()),
        ));
    }
    let mut account = [0u8; 20];
    account.copy_from_slice(&payload[1..]);
    Ok(account)
}

/// Whether `address` is a well-formed classic address
pub fn validate(address: &str) -> bool {
    (25..=35).contains(&address.len()) && address.starts_with('r') && decode(address).is_ok()
}
