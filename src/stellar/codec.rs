//! Stellar transaction codec
//!
//! Canonical XDR for the payment envelopes the bridge emits, plus
//! discriminant-aware signature attachment: the decorated signature lands in
//! the signatures vector selected by the envelope type (V0, V1, or the
//! outer fee-bump vector).

use super::xdr::{Reader, Writer};
use crate::encoding::hash::sha256;
use crate::error::{AdapterError, Result};

/// Envelope discriminants
pub const ENVELOPE_TYPE_TX_V0: u32 = 0;
pub const ENVELOPE_TYPE_TX: u32 = 2;
pub const ENVELOPE_TYPE_TX_FEE_BUMP: u32 = 5;

const KEY_TYPE_ED25519: u32 = 0;
const MEMO_NONE: u32 = 0;
const PRECOND_NONE: u32 = 0;
const PRECOND_TIME: u32 = 1;
const OP_PAYMENT: u32 = 1;

const ASSET_NATIVE: u32 = 0;
const ASSET_ALPHANUM4: u32 = 1;
const ASSET_ALPHANUM12: u32 = 2;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    Native,
    Alphanum4 { code: [u8; 4], issuer: [u8; 32] },
    Alphanum12 { code: [u8; 12], issuer: [u8; 32] },
}

impl Asset {
    /// Build a credit asset from its code and issuer key
    pub fn credit(code: &str, issuer: [u8; 32]) -> Result<Self> {
        let bytes = code.as_bytes();
        match bytes.len() {
            1..=4 => {
                let mut fixed = [0u8; 4];
                fixed[..bytes.len()].copy_from_slice(bytes);
                Ok(Asset::Alphanum4 {
                    code: fixed,
                    issuer,
                })
            }
            5..=12 => {
                let mut fixed = [0u8; 12];
                fixed[..bytes.len()].copy_from_slice(bytes);
                Ok(Asset::Alphanum12 {
                    code: fixed,
                    issuer,
                })
            }
            len => Err(AdapterError::InvalidInput(format!(
                "asset code length {} out of range",
                len
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOp {
    pub destination: [u8; 32],
    pub asset: Asset,
    /// Stroops (7 decimals)
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBounds {
    pub min_time: u64,
    pub max_time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub source_account: [u8; 32],
    pub fee: u32,
    pub seq_num: i64,
    pub time_bounds: Option<TimeBounds>,
    pub operations: Vec<PaymentOp>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratedSignature {
    /// Last four bytes of the signing account's Ed25519 key
    pub hint: [u8; 4],
    pub signature: Vec<u8>,
}

/// The three envelope shapes; V0 carries its source key bare, fee-bump
/// wraps an inner V1
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionEnvelope {
    V0 {
        tx: Transaction,
        signatures: Vec<DecoratedSignature>,
    },
    V1 {
        tx: Transaction,
        signatures: Vec<DecoratedSignature>,
    },
    FeeBump {
        fee_source: [u8; 32],
        fee: i64,
        inner: Box<TransactionEnvelope>,
        signatures: Vec<DecoratedSignature>,
    },
}

// ============================================================================
// XDR encoding
// ============================================================================

fn write_account(w: &mut Writer, key: &[u8; 32]) {
    w.write_u32(KEY_TYPE_ED25519);
    w.write_opaque_fixed(key);
}

fn read_account(r: &mut Reader<'_>) -> Result<[u8; 32]> {
    match r.read_u32()? {
        KEY_TYPE_ED25519 => Ok(r.read_opaque_fixed(32)?.try_into().expect("32-byte read")),
        other => Err(AdapterError::Codec(format!(
            "unsupported account key type {}",
            other
        ))),
    }
}

fn write_asset(w: &mut Writer, asset: &Asset) {
    match asset {
        Asset::Native => w.write_u32(ASSET_NATIVE),
        Asset::Alphanum4 { code, issuer } => {
            w.write_u32(ASSET_ALPHANUM4);
            w.write_opaque_fixed(code);
            write_account(w, issuer);
        }
        Asset::Alphanum12 { code, issuer } => {
            w.write_u32(ASSET_ALPHANUM12);
            w.write_opaque_fixed(code);
            write_account(w, issuer);
        }
    }
}

fn read_asset(r: &mut Reader<'_>) -> Result<Asset> {
    match r.read_u32()? {
        ASSET_NATIVE => Ok(Asset::Native),
        ASSET_ALPHANUM4 => Ok(Asset::Alphanum4 {
            code: r.read_opaque_fixed(4)?.try_into().expect("4-byte read"),
            issuer: read_account(r)?,
        }),
        ASSET_ALPHANUM12 => Ok(Asset::Alphanum12 {
            code: r.read_opaque_fixed(12)?.try_into().expect("12-byte read"),
            issuer: read_account(r)?,
        }),
        other => Err(AdapterError::Codec(format!("unsupported asset type {}", other))),
    }
}

fn write_operations(w: &mut Writer, operations: &[PaymentOp]) {
    w.write_u32(operations.len() as u32);
    for op in operations {
        w.write_u32(0); // no per-operation source account
        w.write_u32(OP_PAYMENT);
        write_account(w, &op.destination);
        write_asset(w, &op.asset);
        w.write_i64(op.amount);
    }
}

fn read_operations(r: &mut Reader<'_>) -> Result<Vec<PaymentOp>> {
    let count = r.read_u32()? as usize;
    let mut operations = Vec::with_capacity(count);
    for _ in 0..count {
        if r.read_u32()? != 0 {
            return Err(AdapterError::Codec(
                "per-operation source accounts are not supported".into(),
            ));
        }
        if r.read_u32()? != OP_PAYMENT {
            return Err(AdapterError::Codec("unsupported operation type".into()));
        }
        operations.push(PaymentOp {
            destination: read_account(r)?,
            asset: read_asset(r)?,
            amount: r.read_i64()?,
        });
    }
    Ok(operations)
}

/// Encode the V1 transaction body (the part the network signs over)
fn write_tx(w: &mut Writer, tx: &Transaction) {
    write_account(w, &tx.source_account);
    w.write_u32(tx.fee);
    w.write_i64(tx.seq_num);
    match tx.time_bounds {
        Some(bounds) => {
            w.write_u32(PRECOND_TIME);
            w.write_u64(bounds.min_time);
            w.write_u64(bounds.max_time);
        }
        None => w.write_u32(PRECOND_NONE),
    }
    w.write_u32(MEMO_NONE);
    write_operations(w, &tx.operations);
    w.write_u32(0); // ext
}

fn read_tx(r: &mut Reader<'_>) -> Result<Transaction> {
    let source_account = read_account(r)?;
    let fee = r.read_u32()?;
    let seq_num = r.read_i64()?;
    let time_bounds = match r.read_u32()? {
        PRECOND_NONE => None,
        PRECOND_TIME => Some(TimeBounds {
            min_time: r.read_u64()?,
            max_time: r.read_u64()?,
        }),
        other => {
            return Err(AdapterError::Codec(format!(
                "unsupported precondition {}",
                other
            )))
        }
    };
    if r.read_u32()? != MEMO_NONE {
        return Err(AdapterError::Codec("memos are not supported".into()));
    }
    let operations = read_operations(r)?;
    if r.read_u32()? != 0 {
        return Err(AdapterError::Codec("unsupported tx extension".into()));
    }
    Ok(Transaction {
        source_account,
        fee,
        seq_num,
        time_bounds,
        operations,
    })
}

/// V0 bodies differ only in the bare source key and plain time bounds
fn read_tx_v0(r: &mut Reader<'_>) -> Result<Transaction> {
    let source_account: [u8; 32] = r.read_opaque_fixed(32)?.try_into().expect("32-byte read");
    let fee = r.read_u32()?;
    let seq_num = r.read_i64()?;
    let time_bounds = match r.read_u32()? {
        0 => None,
        1 => Some(TimeBounds {
            min_time: r.read_u64()?,
            max_time: r.read_u64()?,
        }),
        other => {
            return Err(AdapterError::Codec(format!(
                "bad optional marker {}",
                other
            )))
        }
    };
    if r.read_u32()? != MEMO_NONE {
        return Err(AdapterError::Codec("memos are not supported".into()));
    }
    let operations = read_operations(r)?;
    if r.read_u32()? != 0 {
        return Err(AdapterError::Codec("unsupported tx extension".into()));
    }
    Ok(Transaction {
        source_account,
        fee,
        seq_num,
        time_bounds,
        operations,
    })
}

fn write_tx_v0(w: &mut Writer, tx: &Transaction) {
    w.write_opaque_fixed(&tx.source_account);
    w.write_u32(tx.fee);
    w.write_i64(tx.seq_num);
    match tx.time_bounds {
        Some(bounds) => {
            w.write_u32(1);
            w.write_u64(bounds.min_time);
            w.write_u64(bounds.max_time);
        }
        None => w.write_u32(0),
    }
    w.write_u32(MEMO_NONE);
    write_operations(w, &tx.operations);
    w.write_u32(0);
}

fn write_signatures(w: &mut Writer, signatures: &[DecoratedSignature]) {
    w.write_u32(signatures.len() as u32);
    for sig in signatures {
        w.write_opaque_fixed(&sig.hint);
        w.write_opaque_var(&sig.signature);
    }
}

fn read_signatures(r: &mut Reader<'_>) -> Result<Vec<DecoratedSignature>> {
    let count = r.read_u32()? as usize;
    let mut signatures = Vec::with_capacity(count);
    for _ in 0..count {
        signatures.push(DecoratedSignature {
            hint: r.read_opaque_fixed(4)?.try_into().expect("4-byte read"),
            signature: r.read_opaque_var(64)?.to_vec(),
        });
    }
    Ok(signatures)
}

// ============================================================================
// Codec operations
// ============================================================================

/// Serialize an envelope with its discriminant
pub fn encode_envelope(envelope: &TransactionEnvelope) -> Vec<u8> {
    let mut w = Writer::new();
    match envelope {
        TransactionEnvelope::V0 { tx, signatures } => {
            w.write_u32(ENVELOPE_TYPE_TX_V0);
            write_tx_v0(&mut w, tx);
            write_signatures(&mut w, signatures);
        }
        TransactionEnvelope::V1 { tx, signatures } => {
            w.write_u32(ENVELOPE_TYPE_TX);
            write_tx(&mut w, tx);
            write_signatures(&mut w, signatures);
        }
        TransactionEnvelope::FeeBump {
            fee_source,
            fee,
            inner,
            signatures,
        } => {
            w.write_u32(ENVELOPE_TYPE_TX_FEE_BUMP);
            write_account(&mut w, fee_source);
            w.write_i64(*fee);
            w.write_raw(&encode_envelope(inner));
            w.write_u32(0); // ext
            write_signatures(&mut w, signatures);
        }
    }
    w.into_bytes()
}

/// Parse an envelope by its discriminant
pub fn decode_envelope(bytes: &[u8]) -> Result<TransactionEnvelope> {
    let mut reader = Reader::new(bytes);
    let envelope = read_envelope(&mut reader)?;
    if !reader.is_at_end() {
        return Err(AdapterError::Codec("trailing bytes after envelope".into()));
    }
    Ok(envelope)
}

fn read_envelope(r: &mut Reader<'_>) -> Result<TransactionEnvelope> {
    match r.read_u32()? {
        ENVELOPE_TYPE_TX_V0 => Ok(TransactionEnvelope::V0 {
            tx: read_tx_v0(r)?,
            signatures: read_signatures(r)?,
        }),
        ENVELOPE_TYPE_TX => Ok(TransactionEnvelope::V1 {
            tx: read_tx(r)?,
            signatures: read_signatures(r)?,
        }),
        ENVELOPE_TYPE_TX_FEE_BUMP => {
            let fee_source = read_account(r)?;
            let fee = r.read_i64()?;
            let inner = read_envelope(r)?;
            if !matches!(inner, TransactionEnvelope::V1 { .. }) {
                return Err(AdapterError::Codec(
                    "fee-bump inner transaction must be V1".into(),
                ));
            }
            if r.read_u32()? != 0 {
                return Err(AdapterError::Codec("unsupported fee-bump extension".into()));
            }
            Ok(TransactionEnvelope::FeeBump {
                fee_source,
                fee,
                inner: Box::new(inner),
                signatures: read_signatures(r)?,
            })
        }
        other => Err(AdapterError::EnvelopeMalformed(format!(
            "unknown envelope discriminant {}",
            other
        ))),
    }
}

/// Unsigned V1 envelope for a freshly built transaction
pub fn encode_unsigned(tx: &Transaction) -> Vec<u8> {
    encode_envelope(&TransactionEnvelope::V1 {
        tx: tx.clone(),
        signatures: vec![],
    })
}

/// SHA-256(network-id ‖ envelope-type ‖ XDR(tx))
pub fn signing_preimage(tx: &Transaction, network_id: &[u8; 32]) -> [u8; 32] {
    let mut w = Writer::new();
    w.write_opaque_fixed(network_id);
    w.write_u32(ENVELOPE_TYPE_TX);
    write_tx(&mut w, tx);
    sha256(&w.into_bytes())
}

/// Append a decorated signature to the vector the discriminant selects
pub fn attach_signature(
    envelope_bytes: &[u8],
    signature: &[u8],
    pubkey: &[u8; 32],
) -> Result<Vec<u8>> {
    if signature.len() != 64 {
        return Err(AdapterError::EnvelopeMalformed(format!(
            "stellar signature must be 64 bytes, got {}",
            signature.len()
        )));
    }
    let mut hint = [0u8; 4];
    hint.copy_from_slice(&pubkey[28..]);
    let decorated = DecoratedSignature {
        hint,
        signature: signature.to_vec(),
    };

    let mut envelope = decode_envelope(envelope_bytes)?;
    match &mut envelope {
        TransactionEnvelope::V0 { signatures, .. }
        | TransactionEnvelope::V1 { signatures, .. }
        | TransactionEnvelope::FeeBump { signatures, .. } => signatures.push(decorated),
    }
    Ok(encode_envelope(&envelope))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx_fixture() -> Transaction {
        Transaction {
            source_account: [0x11; 32],
            fee: 100,
            seq_num: 4_295_000_001,
            time_bounds: Some(TimeBounds {
                min_time: 0,
                max_time: 1_700_000_300,
            }),
            operations: vec![PaymentOp {
                destination: [0x22; 32],
                asset: Asset::Native,
                amount: 120_000_000,
            }],
        }
    }

    #[test]
    fn test_envelope_roundtrip() {
        let envelope = TransactionEnvelope::V1 {
            tx: tx_fixture(),
            signatures: vec![],
        };
        let bytes = encode_envelope(&envelope);
        assert_eq!(decode_envelope(&bytes).unwrap(), envelope);
    }

    #[test]
    fn test_attach_appends_hint_and_signature() {
        let mut pubkey = [0u8; 32];
        pubkey[28..].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        let unsigned = encode_unsigned(&tx_fixture());

        let signed = attach_signature(&unsigned, &[0x77; 64], &pubkey).unwrap();

        // Byte-identical up to the signatures vector
        assert_eq!(&signed[..unsigned.len() - 4], &unsigned[..unsigned.len() - 4]);
        match decode_envelope(&signed).unwrap() {
            TransactionEnvelope::V1 { signatures, .. } => {
                assert_eq!(signatures.len(), 1);
                assert_eq!(signatures[0].hint, [0xde, 0xad, 0xbe, 0xef]);
                assert_eq!(signatures[0].signature, vec![0x77; 64]);
            }
            other => panic!("unexpected envelope {:?}", other),
        }
    }

    #[test]
    fn test_attach_to_fee_bump_targets_outer_vector() {
        let inner = TransactionEnvelope::V1 {
            tx: tx_fixture(),
            signatures: vec![DecoratedSignature {
                hint: [1, 2, 3, 4],
                signature: vec![0x55; 64],
            }],
        };
        let envelope = TransactionEnvelope::FeeBump {
            fee_source: [0x99; 32],
            fee: 400,
            inner: Box::new(inner),
            signatures: vec![],
        };
        let bytes = encode_envelope(&envelope);

        let signed = attach_signature(&bytes, &[0x88; 64], &[0xaa; 32]).unwrap();
        match decode_envelope(&signed).unwrap() {
            TransactionEnvelope::FeeBump {
                inner, signatures, ..
            } => {
                assert_eq!(signatures.len(), 1);
                // The inner vector is untouched
                match *inner {
                    TransactionEnvelope::V1 { ref signatures, .. } => {
                        assert_eq!(signatures.len(), 1);
                        assert_eq!(signatures[0].signature, vec![0x55; 64]);
                    }
                    _ => panic!("inner must stay V1"),
                }
            }
            other => panic!("unexpected envelope {:?}", other),
        }
    }

    #[test]
    fn test_preimage_varies_with_network() {
        let tx = tx_fixture();
        let a = signing_preimage(&tx, &sha256(b"Public Global Stellar Network ; September 2015"));
        let b = signing_preimage(&tx, &sha256(b"Test SDF Network ; September 2015"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_unknown_discriminant_rejected() {
        let mut w = Writer::new();
        w.write_u32(9);
        assert!(matches!(
            attach_signature(&w.into_bytes(), &[0u8; 64], &[0u8; 32]),
            Err(AdapterError::EnvelopeMalformed(_))
        ));
    }

    #[test]
    fn test_credit_asset_codes() {
        assert!(matches!(
            Asset::credit("USDC", [0u8; 32]).unwrap(),
            Asset::Alphanum4 { .. }
        ));
        assert!(matches!(
            Asset::credit("LONGCODE", [0u8; 32]).unwrap(),
            Asset::Alphanum12 { .. }
        ));
        assert!(Asset::credit("", [0u8; 32]).is_err());
        assert!(Asset::credit("WAYTOOLONGCODE", [0u8; 32]).is_err());
    }
}
