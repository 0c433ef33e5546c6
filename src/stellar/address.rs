//! Stellar StrKey account-id codec
//!
//! `G…` addresses are base32 of `0x30 ‖ pk32 ‖ CRC16-XMODEM` with the
//! checksum appended little-endian.

use data_encoding::BASE32;

use crate::encoding::crc16_xmodem;
use crate::error::{AdapterError, Result};

/// Account-id version byte (`6 << 3`, renders as `G`)
const VERSION_ACCOUNT_ID: u8 = 0x30;

/// Encode an Ed25519 public key as a StrKey account id
pub fn encode(pubkey: &[u8; 32]) -> String {
    let mut payload = Vec::with_capacity(35);
    payload.push(VERSION_ACCOUNT_ID);
    payload.extend_from_slice(pubkey);
    let checksum = crc16_xmodem(&payload);
    payload.push((checksum & 0xff) as u8);
    payload.push((checksum >> 8) as u8);
    BASE32.encode(&payload)
}

/// Decode a StrKey account id, verifying version byte and checksum
pub fn decode(address: &str) -> Result<[u8; 32]> {
    let payload = BASE32
        .decode(address.as_bytes())
        .map_err(|e| AdapterError::address("stellar", format!("base32: {}", e)))?;
    if payload.len() != 35 {
        return Err(AdapterError::address(
            "stellar",
            format!("decoded to {} bytes, expected 35", payload.len()),
        ));
    }
    if payload[0] != VERSION_ACCOUNT_ID {
        return Err(AdapterError::address(
            "stellar",
            format!("bad version byte 0x{:02x}", payload[0]),
        ));
    }
    let expected = crc16_xmodem(&payload[..33]);
    let found = payload[33] as u16 | ((payload[34] as u16) << 8);
    if expected != found {
        return Err(AdapterError::address("stellar", "checksum mismatch"));
    }
    let mut pubkey = [0u8; 32];
    pubkey.copy_from_slice(&payload[1..33]);
    Ok(pubkey)
}

/// Whether `address` is a well-formed account id
pub fn validate(address: &str) -> bool {
    address.len() == 56 && address.starts_with('G') && decode(address).is_ok()
}
