//! Bitcoin transaction codec
//!
//! Legacy wire format throughout. The signing payload of an unsigned spend
//! is the SIGHASH_ALL digest of the transaction with the spent output's
//! scriptPubKey substituted into the input being signed; the attached
//! scriptSig is `PUSH(DER(sig)‖0x01) PUSH(pk33)`.

use bitcoin::consensus::encode;
use bitcoin::hashes::Hash;
use bitcoin::script::PushBytesBuf;
use bitcoin::secp256k1::ecdsa::{RecoverableSignature, RecoveryId, Signature};
use bitcoin::secp256k1::{Message, Secp256k1};
use bitcoin::sighash::SighashCache;
use bitcoin::{Script, ScriptBuf, Transaction};

use crate::error::{AdapterError, Result};

/// SIGHASH flag committed to by every bridge signature
pub const SIGHASH_ALL: u8 = 0x01;

/// Serialize a transaction to consensus bytes
pub fn encode_unsigned(tx: &Transaction) -> Vec<u8> {
    encode::serialize(tx)
}

/// Deserialize consensus bytes into a transaction
pub fn decode_unsigned(bytes: &[u8]) -> Result<Transaction> {
    encode::deserialize(bytes)
        .map_err(|e| AdapterError::Codec(format!("bitcoin tx decode: {}", e)))
}

/// Legacy SIGHASH_ALL digest for one input against the scriptPubKey of the
/// output it spends
pub fn legacy_sighash(
    tx: &Transaction,
    input_index: usize,
    script_pubkey: &Script,
) -> Result<[u8; 32]> {
    let cache = SighashCache::new(tx);
    let sighash = cache
        .legacy_signature_hash(input_index, script_pubkey, SIGHASH_ALL as u32)
        .map_err(|e| AdapterError::Codec(format!("sighash: {}", e)))?;
    Ok(sighash.to_byte_array())
}

/// DER-encode a raw `r‖s` signature with mandatory low-S normalization and
/// the SIGHASH_ALL byte appended
///
/// High-S signatures are non-standard since BIP66; `s > n/2` is replaced by
/// `n − s` before encoding. DER integers are minimally encoded with a 0x00
/// pad when the high bit is set.
pub fn der_encode_signature(raw: &[u8]) -> Result<Vec<u8>> {
    let compact: [u8; 64] = raw.try_into().map_err(|_| {
        AdapterError::InvalidInput(format!("signature must be 64 bytes, got {}", raw.len()))
    })?;
    let mut signature = Signature::from_compact(&compact)
        .map_err(|e| AdapterError::InvalidInput(format!("bad signature: {}", e)))?;
    signature.normalize_s();

    let mut out = signature.serialize_der().to_vec();
    out.push(SIGHASH_ALL);
    Ok(out)
}

/// Recover the compressed public key whose HASH160 matches the spent
/// scriptPubKey, trying both recovery ids over the signing digest
pub fn recover_pubkey(
    raw_signature: &[u8],
    sighash: &[u8; 32],
    script_pubkey: &Script,
) -> Result<Vec<u8>> {
    let compact: [u8; 64] = raw_signature.try_into().map_err(|_| {
        AdapterError::InvalidInput(format!(
            "signature must be 64 bytes, got {}",
            raw_signature.len()
        ))
    })?;
    let expected_hash = p2pkh_pubkey_hash(script_pubkey)?;

    let secp = Secp256k1::new();
    let message = Message::from_digest(*sighash);
    for rec_id in 0..=1 {
        let rec_id = RecoveryId::from_i32(rec_id).expect("0 and 1 are valid recovery ids");
        let Ok(signature) = RecoverableSignature::from_compact(&compact, rec_id) else {
            continue;
        };
        if let Ok(pubkey) = secp.recover_ecdsa(&message, &signature) {
            let serialized = pubkey.serialize();
            if crate::encoding::hash::hash160(&serialized) == expected_hash {
                return Ok(serialized.to_vec());
            }
        }
    }

    Err(AdapterError::InvalidInput(
        "no recoverable public key matches the spent output".into(),
    ))
}

/// Build the scriptSig and place it on `input_index`
pub fn attach_signature(
    tx: &Transaction,
    input_index: usize,
    raw_signature: &[u8],
    pubkey: &[u8],
) -> Result<Transaction> {
    if pubkey.len() != 33 {
        return Err(AdapterError::EnvelopeMalformed(format!(
            "compressed public key must be 33 bytes, got {}",
            pubkey.len()
        )));
    }
    let mut signed = tx.clone();
    let input = signed.input.get_mut(input_index).ok_or_else(|| {
        AdapterError::EnvelopeMalformed(format!("transaction has no input {}", input_index))
    })?;
    if !input.script_sig.is_empty() {
        return Err(AdapterError::EnvelopeMalformed(format!(
            "input {} already carries a scriptSig",
            input_index
        )));
    }

    let der = der_encode_signature(raw_signature)?;
    let sig_push = PushBytesBuf::try_from(der)
        .map_err(|_| AdapterError::Codec("signature push overflow".into()))?;
    let pk_push = PushBytesBuf::try_from(pubkey.to_vec())
        .map_err(|_| AdapterError::Codec("pubkey push overflow".into()))?;

    input.script_sig = bitcoin::script::Builder::new()
        .push_slice(sig_push)
        .push_slice(pk_push)
        .into_script();
    Ok(signed)
}

/// Extract the 20-byte pubkey hash of a P2PKH scriptPubKey
pub fn p2pkh_pubkey_hash(script: &Script) -> Result<[u8; 20]> {
    if !script.is_p2pkh() {
        return Err(AdapterError::EnvelopeMalformed(
            "spent output is not P2PKH".into(),
        ));
    }
    // OP_DUP OP_HASH160 PUSH20 <hash20> OP_EQUALVERIFY OP_CHECKSIG
    let bytes = script.as_bytes();
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&bytes[3..23]);
    Ok(hash)
}

/// ScriptBuf from RPC hex
pub fn script_from_hex(hex_str: &str) -> Result<ScriptBuf> {
    let bytes = hex::decode(hex_str)
        .map_err(|e| AdapterError::Codec(format!("script hex: {}", e)))?;
    Ok(ScriptBuf::from_bytes(bytes))
}
