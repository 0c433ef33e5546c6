//! Cardano Shelley transaction codec
//!
//! A transaction is the CBOR array `[body, witness_set, is_valid, aux]`.
//! The signing payload is the Blake2b-256 of the body's CBOR bytes, so the
//! attachment path re-emits the body span verbatim: only the witness set is
//! rebuilt, with the new vkey witness appended under map key 0 and every
//! other witness kind preserved untouched.

use super::cbor::{Reader, Writer};
use crate::encoding::hash::blake2b256;
use crate::error::{AdapterError, Result};

/// Witness-set map key of the vkey witness array
pub const VKEY_WITNESS_KEY: u64 = 0;

// ============================================================================
// Typed Shelley structures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    pub tx_id: [u8; 32],
    pub index: u64,
}

/// Quantities of one policy's assets: `(asset_name, amount)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiAssetEntry {
    pub policy_id: [u8; 28],
    pub assets: Vec<(Vec<u8>, u64)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputValue {
    /// Pure lovelace output
    Coin(u64),
    /// `[coin, {policy: {name: qty}}]`
    Multi {
        coin: u64,
        assets: Vec<MultiAssetEntry>,
    },
}

impl OutputValue {
    pub fn coin(&self) -> u64 {
        match self {
            OutputValue::Coin(c) => *c,
            OutputValue::Multi { coin, .. } => *coin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    /// Raw address bytes (header ‖ credentials)
    pub address: Vec<u8>,
    pub value: OutputValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxBody {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub fee: u64,
    pub ttl: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VkeyWitness {
    pub vkey: [u8; 32],
    pub signature: [u8; 64],
}

/// Witness set with unknown kinds carried as raw CBOR
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WitnessSet {
    pub vkey_witnesses: Vec<VkeyWitness>,
    /// `(map_key, raw_value)` for every non-vkey witness kind, in original order
    pub other: Vec<(u64, Vec<u8>)>,
}

// ============================================================================
// Body encoding
// ============================================================================

fn write_value(writer: &mut Writer, value: &OutputValue) {
    match value {
        OutputValue::Coin(coin) => writer.write_uint(*coin),
        OutputValue::Multi { coin, assets } => {
            writer.write_array_header(2);
            writer.write_uint(*coin);
            writer.write_map_header(assets.len());
            for entry in assets {
                writer.write_bytes(&entry.policy_id);
                writer.write_map_header(entry.assets.len());
                for (name, quantity) in &entry.assets {
                    writer.write_bytes(name);
                    writer.write_uint(*quantity);
                }
            }
        }
    }
}

/// Encode the body as a canonical CBOR map (keys 0..3)
pub fn encode_body(body: &TxBody) -> Vec<u8> {
    let mut writer = Writer::new();
    let entries = 3 + usize::from(body.ttl.is_some());
    writer.write_map_header(entries);

    writer.write_uint(0);
    writer.write_array_header(body.inputs.len());
    for input in &body.inputs {
        writer.write_array_header(2);
        writer.write_bytes(&input.tx_id);
        writer.write_uint(input.index);
    }

    writer.write_uint(1);
    writer.write_array_header(body.outputs.len());
    for output in &body.outputs {
        writer.write_array_header(2);
        writer.write_bytes(&output.address);
        write_value(&mut writer, &output.value);
    }

    writer.write_uint(2);
    writer.write_uint(body.fee);

    if let Some(ttl) = body.ttl {
        writer.write_uint(3);
        writer.write_uint(ttl);
    }

    writer.into_bytes()
}

fn read_value(reader: &mut Reader) -> Result<OutputValue> {
    // A bare uint is a pure-lovelace value; an array is [coin, multiasset]
    if reader.peek()? >> 5 == 4 {
        reader.read_array_len().and_then(|len| {
            if len != 2 {
                return Err(AdapterError::Codec("cbor: value array must have 2 items".into()));
            }
            let coin = reader.read_uint()?;
            let policies = reader.read_map_len()?;
            let mut assets = Vec::with_capacity(policies);
            for _ in 0..policies {
                let policy_id: [u8; 28] = reader
                    .read_bytes()?
                    .try_into()
                    .map_err(|_| AdapterError::Codec("cbor: policy id must be 28 bytes".into()))?;
                let names = reader.read_map_len()?;
                let mut amounts = Vec::with_capacity(names);
                for _ in 0..names {
                    let name = reader.read_bytes()?.to_vec();
                    amounts.push((name, reader.read_uint()?));
                }
                assets.push(MultiAssetEntry {
                    policy_id,
                    assets: amounts,
                });
            }
            Ok(OutputValue::Multi { coin, assets })
        })
    } else {
        Ok(OutputValue::Coin(reader.read_uint()?))
    }
}

/// Decode a body map produced by [`encode_body`]
pub fn decode_body(bytes: &[u8]) -> Result<TxBody> {
    let mut reader = Reader::new(bytes);
    let entries = reader.read_map_len()?;

    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    let mut fee = None;
    let mut ttl = None;

    for _ in 0..entries {
        match reader.read_uint()? {
            0 => {
                let count = reader.read_array_len()?;
                for _ in 0..count {
                    if reader.read_array_len()? != 2 {
                        return Err(AdapterError::Codec("cbor: input must be [id, index]".into()));
                    }
                    let tx_id: [u8; 32] = reader.read_bytes()?.try_into().map_err(|_| {
                        AdapterError::Codec("cbor: tx id must be 32 bytes".into())
                    })?;
                    inputs.push(TxInput {
                        tx_id,
                        index: reader.read_uint()?,
                    });
                }
            }
            1 => {
                let count = reader.read_array_len()?;
                for _ in 0..count {
                    if reader.read_array_len()? != 2 {
                        return Err(AdapterError::Codec(
                            "cbor: output must be [address, value]".into(),
                        ));
                    }
                    let address = reader.read_bytes()?.to_vec();
                    outputs.push(TxOutput {
                        address,
                        value: read_value(&mut reader)?,
                    });
                }
            }
            2 => fee = Some(reader.read_uint()?),
            3 => ttl = Some(reader.read_uint()?),
            other => {
                return Err(AdapterError::Codec(format!(
                    "cbor: unsupported body key {}",
                    other
                )))
            }
        }
    }

    Ok(TxBody {
        inputs,
        outputs,
        fee: fee.ok_or_else(|| AdapterError::Codec("cbor: body missing fee".into()))?,
        ttl,
    })
}

// ============================================================================
// Envelope
// ============================================================================

fn encode_witness_set(witness_set: &WitnessSet) -> Vec<u8> {
    let mut writer = Writer::new();
    let has_vkeys = !witness_set.vkey_witnesses.is_empty();
    writer.write_map_header(usize::from(has_vkeys) + witness_set.other.len());

    if has_vkeys {
        writer.write_uint(VKEY_WITNESS_KEY);
        writer.write_array_header(witness_set.vkey_witnesses.len());
        for witness in &witness_set.vkey_witnesses {
            writer.write_array_header(2);
            writer.write_bytes(&witness.vkey);
            writer.write_bytes(&witness.signature);
        }
    }
    for (key, raw) in &witness_set.other {
        writer.write_uint(*key);
        writer.write_raw(raw);
    }
    writer.into_bytes()
}

fn decode_witness_set(reader: &mut Reader) -> Result<WitnessSet> {
    let entries = reader.read_map_len()?;
    let mut witness_set = WitnessSet::default();
    for _ in 0..entries {
        let key = reader.read_uint()?;
        if key == VKEY_WITNESS_KEY {
            let count = reader.read_array_len()?;
            for _ in 0..count {
                if reader.read_array_len()? != 2 {
                    return Err(AdapterError::EnvelopeMalformed(
                        "vkey witness must be [vkey, signature]".into(),
                    ));
                }
                let vkey: [u8; 32] = reader.read_bytes()?.try_into().map_err(|_| {
                    AdapterError::EnvelopeMalformed("vkey must be 32 bytes".into())
                })?;
                let signature: [u8; 64] = reader.read_bytes()?.try_into().map_err(|_| {
                    AdapterError::EnvelopeMalformed("witness signature must be 64 bytes".into())
                })?;
                witness_set.vkey_witnesses.push(VkeyWitness { vkey, signature });
            }
        } else {
            witness_set.other.push((key, reader.read_raw_value()?.to_vec()));
        }
    }
    Ok(witness_set)
}

/// Parsed envelope with the body kept as its original bytes
#[derive(Debug, Clone)]
pub struct Envelope<'a> {
    pub body_raw: &'a [u8],
    pub witness_set: WitnessSet,
    pub is_valid: bool,
    pub aux_raw: Option<&'a [u8]>,
}

/// Parse `[body, witness_set, is_valid?, aux?]` without re-encoding the body
pub fn parse_envelope(bytes: &[u8]) -> Result<Envelope<'_>> {
    let mut reader = Reader::new(bytes);
    let len = reader.read_array_len()?;
    if !(2..=4).contains(&len) {
        return Err(AdapterError::EnvelopeMalformed(format!(
            "transaction array has {} items",
            len
        )));
    }
    let body_raw = reader.read_raw_value()?;
    let witness_set = decode_witness_set(&mut reader)?;
    let is_valid = if len >= 3 { reader.read_bool()? } else { true };
    let aux_raw = if len >= 4 {
        Some(reader.read_raw_value()?)
    } else {
        None
    };
    if !reader.is_at_end() {
        return Err(AdapterError::EnvelopeMalformed(
            "trailing bytes after transaction".into(),
        ));
    }
    Ok(Envelope {
        body_raw,
        witness_set,
        is_valid,
        aux_raw,
    })
}

fn encode_envelope(envelope: &Envelope<'_>) -> Vec<u8> {
    let mut writer = Writer::new();
    writer.write_array_header(4);
    writer.write_raw(envelope.body_raw);
    writer.write_raw(&encode_witness_set(&envelope.witness_set));
    writer.write_bool(envelope.is_valid);
    match envelope.aux_raw {
        Some(raw) => writer.write_raw(raw),
        None => writer.write_null(),
    }
    writer.into_bytes()
}

// ============================================================================
// Codec operations
// ============================================================================

/// Encode an unsigned transaction: body with an empty witness set
pub fn encode_unsigned(body: &TxBody) -> Vec<u8> {
    let body_raw = encode_body(body);
    encode_envelope(&Envelope {
        body_raw: &body_raw,
        witness_set: WitnessSet::default(),
        is_valid: true,
        aux_raw: None,
    })
}

/// Decode the body of an unsigned transaction
pub fn decode_unsigned(bytes: &[u8]) -> Result<TxBody> {
    let envelope = parse_envelope(bytes)?;
    decode_body(envelope.body_raw)
}

/// Blake2b-256 of the body's CBOR bytes
pub fn signing_preimage(tx_bytes: &[u8]) -> Result<[u8; 32]> {
    let envelope = parse_envelope(tx_bytes)?;
    Ok(blake2b256(envelope.body_raw))
}

/// Append one vkey witness, preserving the body bytes and any existing
/// witnesses in order
pub fn attach_signature(tx_bytes: &[u8], signature: &[u8], pubkey: &[u8]) -> Result<Vec<u8>> {
    let vkey: [u8; 32] = pubkey.try_into().map_err(|_| {
        AdapterError::EnvelopeMalformed(format!(
            "cardano vkey must be 32 bytes, got {}",
            pubkey.len()
        ))
    })?;
    let signature: [u8; 64] = signature.try_into().map_err(|_| {
        AdapterError::EnvelopeMalformed(format!(
            "cardano signature must be 64 bytes, got {}",
            signature.len()
        ))
    })?;

    let mut envelope = parse_envelope(tx_bytes)?;
    envelope
        .witness_set
        .vkey_witnesses
        .push(VkeyWitness { vkey, signature });
    Ok(encode_envelope(&envelope))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_fixture() -> TxBody {
        TxBody {
            inputs: vec![TxInput {
                tx_id: [0xab; 32],
                index: 1,
            }],
            outputs: vec![
                TxOutput {
                    address: vec![0x61; 29],
                    value: OutputValue::Coin(5_000_000),
                },
                TxOutput {
                    address: vec![0x60; 29],
                    value: OutputValue::Multi {
                        coin: 1_400_000,
                        assets: vec![MultiAssetEntry {
                            policy_id: [0x11; 28],
                            assets: vec![(b"TOKEN".to_vec(), 250)],
                        }],
                    },
                },
            ],
            fee: 170_000,
            ttl: Some(81_000_000),
        }
    }

    #[test]
    fn test_body_roundtrip() {
        let body = body_fixture();
        let bytes = encode_body(&body);
        assert_eq!(decode_body(&bytes).unwrap(), body);
    }

    #[test]
    fn test_unsigned_roundtrip() {
        let body = body_fixture();
        let bytes = encode_unsigned(&body);
        assert_eq!(decode_unsigned(&bytes).unwrap(), body);
    }

    #[test]
    fn test_preimage_is_body_hash() {
        let body = body_fixture();
        let tx = encode_unsigned(&body);
        assert_eq!(signing_preimage(&tx).unwrap(), blake2b256(&encode_body(&body)));
    }

    #[test]
    fn test_attach_preserves_body_bytes() {
        let tx = encode_unsigned(&body_fixture());
        let signed = attach_signature(&tx, &[0x22; 64], &[0x33; 32]).unwrap();

        let before = parse_envelope(&tx).unwrap();
        let after = parse_envelope(&signed).unwrap();
        assert_eq!(before.body_raw, after.body_raw);
        assert_eq!(after.witness_set.vkey_witnesses.len(), 1);
        assert_eq!(after.witness_set.vkey_witnesses[0].vkey, [0x33; 32]);
        assert!(after.is_valid);
    }

    #[test]
    fn test_attach_appends_after_existing_witnesses() {
        let tx = encode_unsigned(&body_fixture());
        let once = attach_signature(&tx, &[0x01; 64], &[0xaa; 32]).unwrap();
        let twice = attach_signature(&once, &[0x02; 64], &[0xbb; 32]).unwrap();

        let envelope = parse_envelope(&twice).unwrap();
        let witnesses = &envelope.witness_set.vkey_witnesses;
        assert_eq!(witnesses.len(), 2);
        assert_eq!(witnesses[0].vkey, [0xaa; 32]);
        assert_eq!(witnesses[1].vkey, [0xbb; 32]);
    }

    #[test]
    fn test_non_vkey_witnesses_survive() {
        // Hand-build an envelope whose witness set carries key 5 (plutus)
        let body_raw = encode_body(&body_fixture());
        let mut writer = Writer::new();
        writer.write_array_header(4);
        writer.write_raw(&body_raw);
        writer.write_map_header(1);
        writer.write_uint(5);
        writer.write_bytes(&[0xfe, 0xed]);
        writer.write_bool(true);
        writer.write_null();
        let tx = writer.into_bytes();

        let signed = attach_signature(&tx, &[0x01; 64], &[0xaa; 32]).unwrap();
        let envelope = parse_envelope(&signed).unwrap();
        assert_eq!(envelope.witness_set.vkey_witnesses.len(), 1);
        assert_eq!(envelope.witness_set.other, vec![(5, vec![0x42, 0xfe, 0xed])]);
    }

    #[test]
    fn test_malformed_envelope_rejected() {
        assert!(matches!(
            attach_signature(&[0x85, 0x00], &[0x01; 64], &[0xaa; 32]),
            Err(AdapterError::EnvelopeMalformed(_))
        ));
        let tx = encode_unsigned(&body_fixture());
        assert!(attach_signature(&tx, &[0x01; 63], &[0xaa; 32]).is_err());
        assert!(attach_signature(&tx, &[0x01; 64], &[0xaa; 31]).is_err());
    }
}
