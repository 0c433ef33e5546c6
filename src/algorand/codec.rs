//! Algorand transaction codec
//!
//! Transaction bodies are canonical MessagePack maps (keys sorted, zero
//! fields omitted). The signer signs the ASCII prefix `"TX"` followed by the
//! encoded body; the signed envelope is the map `{"sig": sig64, "txn": body}`.

use super::msgpack::{Reader, Value, Writer};
use crate::error::{AdapterError, Result};

/// Domain prefix prepended to the body before signing
pub const SIGNING_PREFIX: &[u8; 2] = b"TX";

/// Transaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxType {
    /// Native microAlgo payment (`"pay"`)
    Payment,
    /// ASA transfer (`"axfer"`)
    AssetTransfer,
}

impl TxType {
    fn as_str(&self) -> &'static str {
        match self {
            TxType::Payment => "pay",
            TxType::AssetTransfer => "axfer",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "pay" => Ok(TxType::Payment),
            "axfer" => Ok(TxType::AssetTransfer),
            other => Err(AdapterError::Codec(format!(
                "unsupported algorand tx type: {}",
                other
            ))),
        }
    }
}

/// Flat transaction body covering payments and asset transfers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorandTransaction {
    pub tx_type: TxType,
    pub sender: [u8; 32],
    pub receiver: [u8; 32],
    /// microAlgos for payments, base units for asset transfers
    pub amount: u64,
    pub fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    pub genesis_hash: [u8; 32],
    /// ASA id; nonzero only for asset transfers
    pub asset_id: u64,
}

/// Encode the unsigned transaction body as canonical MessagePack
///
/// Field keys are written in sorted order and zero/empty values are omitted,
/// per the canonical-map rule. The amount/receiver keys differ between the
/// two kinds (`amt`/`rcv` vs `aamt`/`arcv`).
pub fn encode_unsigned(tx: &AlgorandTransaction) -> Vec<u8> {
    // (key, value) pairs in lexicographic key order
    let mut fields: Vec<(&str, Value)> = Vec::new();

    match tx.tx_type {
        TxType::AssetTransfer => {
            if tx.amount > 0 {
                fields.push(("aamt", Value::Uint(tx.amount)));
            }
            fields.push(("arcv", Value::Bin(tx.receiver.to_vec())));
        }
        TxType::Payment => {
            if tx.amount > 0 {
                fields.push(("amt", Value::Uint(tx.amount)));
            }
        }
    }
    if tx.fee > 0 {
        fields.push(("fee", Value::Uint(tx.fee)));
    }
    if tx.first_valid > 0 {
        fields.push(("fv", Value::Uint(tx.first_valid)));
    }
    if !tx.genesis_id.is_empty() {
        fields.push(("gen", Value::Str(tx.genesis_id.clone())));
    }
    fields.push(("gh", Value::Bin(tx.genesis_hash.to_vec())));
    if tx.last_valid > 0 {
        fields.push(("lv", Value::Uint(tx.last_valid)));
    }
    if tx.tx_type == TxType::Payment {
        fields.push(("rcv", Value::Bin(tx.receiver.to_vec())));
    }
    fields.push(("snd", Value::Bin(tx.sender.to_vec())));
    fields.push(("type", Value::Str(tx.tx_type.as_str().to_string())));
    if tx.tx_type == TxType::AssetTransfer {
        fields.push(("xaid", Value::Uint(tx.asset_id)));
    }

    debug_assert!(fields.windows(2).all(|w| w[0].0 < w[1].0));

    let mut writer = Writer::new();
    writer.write_map_header(fields.len());
    for (key, value) in &fields {
        writer.write_str(key);
        write_value(&mut writer, value);
    }
    writer.into_bytes()
}

/// The bytes the external signer signs: `"TX" ‖ msgpack(body)`
pub fn signing_preimage(tx: &AlgorandTransaction) -> Vec<u8> {
    let body = encode_unsigned(tx);
    let mut preimage = Vec::with_capacity(2 + body.len());
    preimage.extend_from_slice(SIGNING_PREFIX);
    preimage.extend_from_slice(&body);
    preimage
}

/// Decode a canonical unsigned transaction body
pub fn decode_unsigned(bytes: &[u8]) -> Result<AlgorandTransaction> {
    let mut reader = Reader::new(bytes);
    let entries = reader.read_map()?;
    if !reader.is_at_end() {
        return Err(AdapterError::Codec(
            "trailing bytes after algorand transaction map".into(),
        ));
    }

    let get = |key: &str| entries.iter().find(|(k, _)| k == key).map(|(_, v)| v);

    let tx_type = TxType::parse(
        get("type")
            .ok_or_else(|| AdapterError::Codec("missing 'type' field".into()))?
            .as_str()?,
    )?;

    let receiver_key = match tx_type {
        TxType::Payment => "rcv",
        TxType::AssetTransfer => "arcv",
    };
    let amount_key = match tx_type {
        TxType::Payment => "amt",
        TxType::AssetTransfer => "aamt",
    };

    Ok(AlgorandTransaction {
        tx_type,
        sender: fixed32(get("snd"), "snd")?,
        receiver: fixed32(get(receiver_key), receiver_key)?,
        amount: get(amount_key).map(|v| v.as_uint()).transpose()?.unwrap_or(0),
        fee: get("fee").map(|v| v.as_uint()).transpose()?.unwrap_or(0),
        first_valid: get("fv").map(|v| v.as_uint()).transpose()?.unwrap_or(0),
        last_valid: get("lv").map(|v| v.as_uint()).transpose()?.unwrap_or(0),
        genesis_id: get("gen")
            .map(|v| v.as_str().map(str::to_string))
            .transpose()?
            .unwrap_or_default(),
        genesis_hash: fixed32(get("gh"), "gh")?,
        asset_id: get("xaid").map(|v| v.as_uint()).transpose()?.unwrap_or(0),
    })
}

/// Assemble the signed envelope `{"sig": sig, "txn": body}`
pub fn attach_signature(unsigned: &[u8], signature: &[u8]) -> Result<Vec<u8>> {
    if signature.len() != 64 {
        return Err(AdapterError::EnvelopeMalformed(format!(
            "algorand signature must be 64 bytes, got {}",
            signature.len()
        )));
    }
    // Re-encode through the typed body so a malformed carrier is rejected
    // rather than wrapped
    let tx = decode_unsigned(unsigned)?;
    let body = encode_unsigned(&tx);

    let mut writer = Writer::new();
    writer.write_map_header(2);
    writer.write_str("sig");
    writer.write_bin(signature);
    writer.write_str("txn");
    let mut bytes = writer.into_bytes();
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

fn write_value(writer: &mut Writer, value: &Value) {
    match value {
        Value::Uint(v) => writer.write_uint(*v),
        Value::Str(s) => writer.write_str(s),
        Value::Bin(b) => writer.write_bin(b),
        Value::Map(entries) => {
            writer.write_map_header(entries.len());
            for (key, val) in entries {
                writer.write_str(key);
                write_value(writer, val);
            }
        }
    }
}

fn fixed32(value: Option<&Value>, key: &str) -> Result<[u8; 32]> {
    let bin = value
        .ok_or_else(|| AdapterError::Codec(format!("missing '{}' field", key)))?
        .as_bin()?;
    bin.try_into()
        .map_err(|_| AdapterError::Codec(format!("'{}' must be 32 bytes, got {}", key, bin.len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment_fixture() -> AlgorandTransaction {
        AlgorandTransaction {
            tx_type: TxType::Payment,
            sender: [1u8; 32],
            receiver: [2u8; 32],
            amount: 1,
            fee: 1000,
            first_valid: 41_000_000,
            last_valid: 41_001_000,
            genesis_id: "testnet-v1.0".into(),
            genesis_hash: [3u8; 32],
            asset_id: 0,
        }
    }

    #[test]
    fn test_payment_roundtrip() {
        let tx = payment_fixture();
        let bytes = encode_unsigned(&tx);
        assert_eq!(decode_unsigned(&bytes).unwrap(), tx);
    }

    #[test]
    fn test_asset_transfer_roundtrip() {
        let tx = AlgorandTransaction {
            tx_type: TxType::AssetTransfer,
            asset_id: 31566704,
            ..payment_fixture()
        };
        let bytes = encode_unsigned(&tx);
        let decoded = decode_unsigned(&bytes).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.asset_id, 31566704);
    }

    #[test]
    fn test_preimage_has_tx_prefix() {
        let tx = payment_fixture();
        let preimage = signing_preimage(&tx);
        assert_eq!(&preimage[..2], b"TX");
        assert_eq!(&preimage[2..], encode_unsigned(&tx).as_slice());
    }

    #[test]
    fn test_zero_amount_omitted() {
        let tx = AlgorandTransaction {
            amount: 0,
            ..payment_fixture()
        };
        let bytes = encode_unsigned(&tx);
        // "amt" must not appear in the canonical encoding of a zero amount
        assert!(!bytes.windows(3).any(|w| w == b"amt"));
        assert_eq!(decode_unsigned(&bytes).unwrap().amount, 0);
    }

    #[test]
    fn test_envelope_layout() {
        let tx = payment_fixture();
        let unsigned = encode_unsigned(&tx);
        let envelope = attach_signature(&unsigned, &[0xaa; 64]).unwrap();

        // map2, "sig" first, then "txn" carrying the original body
        assert_eq!(envelope[0], 0x82);
        let mut reader = Reader::new(&envelope);
        let entries = reader.read_map().unwrap();
        assert_eq!(entries[0].0, "sig");
        assert_eq!(entries[0].1.as_bin().unwrap(), &[0xaa; 64]);
        assert_eq!(entries[1].0, "txn");
    }

    #[test]
    fn test_attach_rejects_short_signature() {
        let unsigned = encode_unsigned(&payment_fixture());
        assert!(matches!(
            attach_signature(&unsigned, &[0u8; 63]),
            Err(AdapterError::EnvelopeMalformed(_))
        ));
    }

    #[test]
    fn test_attach_rejects_garbage_body() {
        assert!(attach_signature(&[0xff, 0x00], &[0u8; 64]).is_err());
    }
}
