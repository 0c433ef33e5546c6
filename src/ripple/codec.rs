//! XRPL binary transaction codec
//!
//! A transaction is a sequence of typed fields sorted by (type code, field
//! code). Only the Payment subset the bridge emits is supported. The signer
//! signs SHA-512Half(`"STX\0"` ‖ serialization-without-TxnSignature); the
//! signed blob is the same sequence with TxnSignature inserted in canonical
//! position.

use crate::encoding::hash::sha512_half;
use crate::error::{AdapterError, Result};

/// Single-signature signing prefix `"STX\0"`
pub const SIGNING_PREFIX: [u8; 4] = [0x53, 0x54, 0x58, 0x00];

/// Payment transaction type code
const TT_PAYMENT: u16 = 0;

/// Require fully-canonical signatures
pub const TF_FULLY_CANONICAL_SIG: u32 = 0x8000_0000;

// Field ids as (type_code, field_code)
const FIELD_TRANSACTION_TYPE: (u8, u8) = (1, 2);
const FIELD_FLAGS: (u8, u8) = (2, 2);
const FIELD_SEQUENCE: (u8, u8) = (2, 4);
const FIELD_AMOUNT: (u8, u8) = (6, 1);
const FIELD_FEE: (u8, u8) = (6, 8);
const FIELD_SIGNING_PUB_KEY: (u8, u8) = (7, 3);
const FIELD_TXN_SIGNATURE: (u8, u8) = (7, 4);
const FIELD_ACCOUNT: (u8, u8) = (8, 1);
const FIELD_DESTINATION: (u8, u8) = (8, 3);

/// XRP-or-issued amount
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RippleAmount {
    /// Native XRP in drops
    Drops(u64),
    /// Issued currency: 160-bit currency code, issuer account, and a
    /// mantissa/exponent decimal
    Issued {
        currency: [u8; 20],
        issuer: [u8; 20],
        mantissa: u64,
        exponent: i32,
    },
}

impl RippleAmount {
    /// Build an issued amount from a currency code, issuer account id and
    /// decimal value string
    pub fn issued(code: &str, issuer: [u8; 20], value: &str) -> Result<Self> {
        let currency = currency_code(code)?;
        let (mantissa, exponent) = normalize_value(value)?;
        Ok(RippleAmount::Issued {
            currency,
            issuer,
            mantissa,
            exponent,
        })
    }
}

/// Payment transaction body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RipplePayment {
    pub account: [u8; 20],
    pub destination: [u8; 20],
    pub amount: RippleAmount,
    pub fee_drops: u64,
    pub sequence: u32,
    pub flags: u32,
    /// 33-byte signing public key (`0xED ‖ pk32`), set at build time because
    /// the network's signing digest covers it
    pub signing_pubkey: Vec<u8>,
    pub txn_signature: Option<Vec<u8>>,
}

// ============================================================================
// Currency and value encoding
// ============================================================================

/// 160-bit currency field from a 3-character ISO-style code or 40 hex chars
pub fn currency_code(code: &str) -> Result<[u8; 20]> {
    let mut out = [0u8; 20];
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphanumeric()) {
        if code == "XRP" {
            return Err(AdapterError::InvalidInput(
                "XRP is not an issued currency".into(),
            ));
        }
        out[12..15].copy_from_slice(code.as_bytes());
        return Ok(out);
    }
    if code.len() == 40 {
        let bytes = hex::decode(code)
            .map_err(|e| AdapterError::InvalidInput(format!("currency hex: {}", e)))?;
        out.copy_from_slice(&bytes);
        return Ok(out);
    }
    Err(AdapterError::InvalidInput(format!(
        "currency must be 3 characters or 40 hex digits: {}",
        code
    )))
}

/// Normalize a positive decimal string to XRPL mantissa/exponent form
/// (16 significant digits, exponent in [-96, 80])
pub fn normalize_value(text: &str) -> Result<(u64, i32)> {
    let text = text.trim();
    if text.starts_with('-') {
        return Err(AdapterError::InvalidInput(
            "issued amounts must be positive".into(),
        ));
    }
    let (whole, frac) = text.split_once('.').unwrap_or((text, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(AdapterError::InvalidInput(format!("bad value: {}", text)));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(AdapterError::InvalidInput(format!("bad value: {}", text)));
    }

    let digits: String = whole.chars().chain(frac.chars()).collect();
    let mut exponent = -(frac.len() as i32);
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        // Zero has a dedicated wire form; mantissa 0 marks it
        return Ok((0, 0));
    }
    let mut mantissa: u64 = 0;
    let mut consumed = 0usize;
    for c in trimmed.chars() {
        if consumed == 16 {
            // Beyond 16 significant digits only zeros can be dropped
            if c != '0' {
                return Err(AdapterError::InvalidInput(format!(
                    "value exceeds 16 significant digits: {}",
                    text
                )));
            }
            exponent += 1;
            continue;
        }
        mantissa = mantissa * 10 + (c as u8 - b'0') as u64;
        consumed += 1;
    }
    while mantissa < 1_000_000_000_000_000 {
        mantissa *= 10;
        exponent -= 1;
    }
    if !(-96..=80).contains(&exponent) {
        return Err(AdapterError::InvalidInput(format!(
            "value out of range: {}",
            text
        )));
    }
    Ok((mantissa, exponent))
}

fn encode_amount(out: &mut Vec<u8>, amount: &RippleAmount) -> Result<()> {
    match amount {
        RippleAmount::Drops(drops) => {
            if *drops > 0x3fff_ffff_ffff_ffff {
                return Err(AdapterError::InvalidInput(format!(
                    "drops out of range: {}",
                    drops
                )));
            }
            out.extend_from_slice(&(0x4000_0000_0000_0000u64 | drops).to_be_bytes());
        }
        RippleAmount::Issued {
            currency,
            issuer,
            mantissa,
            exponent,
        } => {
            let head: u64 = if *mantissa == 0 {
                0x8000_0000_0000_0000
            } else {
                0x8000_0000_0000_0000
                    | 0x4000_0000_0000_0000
                    | (((exponent + 97) as u64) << 54)
                    | mantissa
            };
            out.extend_from_slice(&head.to_be_bytes());
            out.extend_from_slice(currency);
            out.extend_from_slice(issuer);
        }
    }
    Ok(())
}

fn decode_amount(reader: &mut SliceReader<'_>) -> Result<RippleAmount> {
    let head = reader.read_u64()?;
    if head & 0x8000_0000_0000_0000 == 0 {
        return Ok(RippleAmount::Drops(head & 0x3fff_ffff_ffff_ffff));
    }
    let currency: [u8; 20] = reader.read_exact(20)?.try_into().expect("20-byte read");
    let issuer: [u8; 20] = reader.read_exact(20)?.try_into().expect("20-byte read");
    if head == 0x8000_0000_0000_0000 {
        return Ok(RippleAmount::Issued {
            currency,
            issuer,
            mantissa: 0,
            exponent: 0,
        });
    }
    Ok(RippleAmount::Issued {
        currency,
        issuer,
        mantissa: head & 0x003f_ffff_ffff_ffff,
        exponent: (((head >> 54) & 0xff) as i32) - 97,
    })
}

// ============================================================================
// Field serialization
// ============================================================================

fn push_field_header(out: &mut Vec<u8>, (type_code, field_code): (u8, u8)) {
    // All emitted fields have type and field codes below 16
    out.push((type_code << 4) | field_code);
}

fn push_vl(out: &mut Vec<u8>, data: &[u8]) {
    debug_assert!(data.len() <= 192);
    out.push(data.len() as u8);
    out.extend_from_slice(data);
}

/// Serialize in canonical field order, optionally with the signature
fn serialize(tx: &RipplePayment, with_signature: bool) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(192);

    push_field_header(&mut out, FIELD_TRANSACTION_TYPE);
    out.extend_from_slice(&TT_PAYMENT.to_be_bytes());

    push_field_header(&mut out, FIELD_FLAGS);
    out.extend_from_slice(&tx.flags.to_be_bytes());

    push_field_header(&mut out, FIELD_SEQUENCE);
    out.extend_from_slice(&tx.sequence.to_be_bytes());

    push_field_header(&mut out, FIELD_AMOUNT);
    encode_amount(&mut out, &tx.amount)?;

    push_field_header(&mut out, FIELD_FEE);
    encode_amount(&mut out, &RippleAmount::Drops(tx.fee_drops))?;

    push_field_header(&mut out, FIELD_SIGNING_PUB_KEY);
    push_vl(&mut out, &tx.signing_pubkey);

    if with_signature {
        let signature = tx.txn_signature.as_ref().ok_or_else(|| {
            AdapterError::EnvelopeMalformed("transaction carries no signature".into())
        })?;
        push_field_header(&mut out, FIELD_TXN_SIGNATURE);
        push_vl(&mut out, signature);
    }

    push_field_header(&mut out, FIELD_ACCOUNT);
    push_vl(&mut out, &tx.account);

    push_field_header(&mut out, FIELD_DESTINATION);
    push_vl(&mut out, &tx.destination);

    Ok(out)
}

/// Unsigned serialization (no TxnSignature field)
pub fn encode_unsigned(tx: &RipplePayment) -> Result<Vec<u8>> {
    serialize(tx, false)
}

/// Signed serialization for submission
pub fn encode_signed(tx: &RipplePayment) -> Result<Vec<u8>> {
    serialize(tx, true)
}

/// SHA-512Half(`"STX\0"` ‖ unsigned serialization)
pub fn signing_preimage(tx: &RipplePayment) -> Result<[u8; 32]> {
    let body = serialize(tx, false)?;
    let mut buffer = Vec::with_capacity(4 + body.len());
    buffer.extend_from_slice(&SIGNING_PREFIX);
    buffer.extend_from_slice(&body);
    Ok(sha512_half(&buffer))
}

/// Insert the signature field
pub fn attach_signature(unsigned: &[u8], signature: &[u8]) -> Result<Vec<u8>> {
    if signature.len() != 64 {
        return Err(AdapterError::EnvelopeMalformed(format!(
            "ripple signature must be 64 bytes, got {}",
            signature.len()
        )));
    }
    let mut tx = decode_unsigned(unsigned)?;
    if tx.txn_signature.is_some() {
        return Err(AdapterError::EnvelopeMalformed(
            "transaction already carries a signature".into(),
        ));
    }
    tx.txn_signature = Some(signature.to_vec());
    encode_signed(&tx)
}

// ============================================================================
// Decoder
// ============================================================================

struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_at_end(&self) -> bool {
        self.pos == self.data.len()
    }

    fn read_exact(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return Err(AdapterError::Codec("xrpl: unexpected end of input".into()));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_exact(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let b = self.read_exact(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_exact(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let b = self.read_exact(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_be_bytes(arr))
    }

    fn read_vl(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u8()? as usize;
        if len > 192 {
            return Err(AdapterError::Codec("xrpl: unsupported VL length".into()));
        }
        self.read_exact(len)
    }
}

/// Decode a Payment produced by this codec (signed or unsigned)
pub fn decode_unsigned(bytes: &[u8]) -> Result<RipplePayment> {
    let mut reader = SliceReader::new(bytes);

    let mut amount = None;
    let mut fee = None;
    let mut sequence = None;
    let mut flags = 0u32;
    let mut signing_pubkey = None;
    let mut txn_signature = None;
    let mut account = None;
    let mut destination = None;

    while !reader.is_at_end() {
        let header = reader.read_u8()?;
        let field = (header >> 4, header & 0x0f);
        match field {
            FIELD_TRANSACTION_TYPE => {
                let tt = reader.read_u16()?;
                if tt != TT_PAYMENT {
                    return Err(AdapterError::Codec(format!(
                        "unsupported transaction type {}",
                        tt
                    )));
                }
            }
            FIELD_FLAGS => flags = reader.read_u32()?,
            FIELD_SEQUENCE => sequence = Some(reader.read_u32()?),
            FIELD_AMOUNT => amount = Some(decode_amount(&mut reader)?),
            FIELD_FEE => match decode_amount(&mut reader)? {
                RippleAmount::Drops(drops) => fee = Some(drops),
                _ => return Err(AdapterError::Codec("fee must be drops".into())),
            },
            FIELD_SIGNING_PUB_KEY => signing_pubkey = Some(reader.read_vl()?.to_vec()),
            FIELD_TXN_SIGNATURE => txn_signature = Some(reader.read_vl()?.to_vec()),
            FIELD_ACCOUNT => account = Some(fixed20(reader.read_vl()?)?),
            FIELD_DESTINATION => destination = Some(fixed20(reader.read_vl()?)?),
            (type_code, field_code) => {
                return Err(AdapterError::Codec(format!(
                    "unsupported field ({}, {})",
                    type_code, field_code
                )))
            }
        }
    }

    Ok(RipplePayment {
        account: account.ok_or_else(|| missing("Account"))?,
        destination: destination.ok_or_else(|| missing("Destination"))?,
        amount: amount.ok_or_else(|| missing("Amount"))?,
        fee_drops: fee.ok_or_else(|| missing("Fee"))?,
        sequence: sequence.ok_or_else(|| missing("Sequence"))?,
        flags,
        signing_pubkey: signing_pubkey.ok_or_else(|| missing("SigningPubKey"))?,
        txn_signature,
    })
}

fn missing(field: &str) -> AdapterError {
    AdapterError::Codec(format!("xrpl: missing {} field", field))
}

fn fixed20(bytes: &[u8]) -> Result<[u8; 20]> {
    bytes
        .try_into()
        .map_err(|_| AdapterError::Codec("xrpl: account field must be 20 bytes".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment_fixture() -> RipplePayment {
        RipplePayment {
            account: [0x11; 20],
            destination: [0x22; 20],
            amount: RippleAmount::Drops(25_000_000),
            fee_drops: 12,
            sequence: 845,
            flags: TF_FULLY_CANONICAL_SIG,
            signing_pubkey: {
                let mut pk = vec![0xed];
                pk.extend_from_slice(&[0x58; 32]);
                pk
            },
            txn_signature: None,
        }
    }

    #[test]
    fn test_roundtrip() {
        let tx = payment_fixture();
        let bytes = encode_unsigned(&tx).unwrap();
        assert_eq!(decode_unsigned(&bytes).unwrap(), tx);
    }

    #[test]
    fn test_field_order() {
        let bytes = encode_unsigned(&payment_fixture()).unwrap();
        // TransactionType (0x12) first; Account (0x81) after SigningPubKey (0x73)
        assert_eq!(bytes[0], 0x12);
        assert_eq!(&bytes[1..3], &[0, 0]);
        let signing_pos = bytes.iter().position(|&b| b == 0x73).unwrap();
        let account_pos = bytes.iter().rposition(|&b| b == 0x81).unwrap();
        assert!(signing_pos < account_pos);
    }

    #[test]
    fn test_drops_encoding_sets_positive_bit() {
        let mut out = Vec::new();
        encode_amount(&mut out, &RippleAmount::Drops(1)).unwrap();
        assert_eq!(out, vec![0x40, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_normalize_value() {
        // 1 → 1000000000000000 × 10^-15
        assert_eq!(normalize_value("1").unwrap(), (1_000_000_000_000_000, -15));
        // 123.45 → 1234500000000000 × 10^-13
        assert_eq!(
            normalize_value("123.45").unwrap(),
            (1_234_500_000_000_000, -13)
        );
        assert_eq!(normalize_value("0").unwrap(), (0, 0));
        assert!(normalize_value("-3").is_err());
        assert!(normalize_value("1.23456789012345678").is_err());
    }

    #[test]
    fn test_issued_amount_roundtrip() {
        let tx = RipplePayment {
            amount: RippleAmount::issued("USD", [0x77; 20], "123.45").unwrap(),
            ..payment_fixture()
        };
        let bytes = encode_unsigned(&tx).unwrap();
        let decoded = decode_unsigned(&bytes).unwrap();
        match decoded.amount {
            RippleAmount::Issued {
                currency,
                issuer,
                mantissa,
                exponent,
            } => {
                assert_eq!(&currency[12..15], b"USD");
                assert_eq!(issuer, [0x77; 20]);
                assert_eq!(mantissa, 1_234_500_000_000_000);
                assert_eq!(exponent, -13);
            }
            other => panic!("unexpected amount {:?}", other),
        }
    }

    #[test]
    fn test_preimage_prefix_and_signature_exclusion() {
        let tx = payment_fixture();
        let preimage = signing_preimage(&tx).unwrap();

        let mut manual = Vec::new();
        manual.extend_from_slice(&SIGNING_PREFIX);
        manual.extend_from_slice(&encode_unsigned(&tx).unwrap());
        assert_eq!(preimage, sha512_half(&manual));

        // Attaching must not change the signing preimage of the body
        let signed_bytes = attach_signature(&encode_unsigned(&tx).unwrap(), &[0x99; 64]).unwrap();
        let signed = decode_unsigned(&signed_bytes).unwrap();
        assert_eq!(signing_preimage(&signed).unwrap(), preimage);
        assert_eq!(signed.txn_signature.unwrap(), vec![0x99; 64]);
    }

    #[test]
    fn test_attach_rejects_double_signature() {
        let unsigned = encode_unsigned(&payment_fixture()).unwrap();
        let signed = attach_signature(&unsigned, &[0x99; 64]).unwrap();
        assert!(matches!(
            attach_signature(&signed, &[0x99; 64]),
            Err(AdapterError::EnvelopeMalformed(_))
        ));
    }

    #[test]
    fn test_currency_code_rules() {
        assert!(currency_code("XRP").is_err());
        assert_eq!(&currency_code("USD").unwrap()[12..15], b"USD");
        assert!(currency_code("TOOLONG").is_err());
        assert_eq!(
            currency_code(&"aa".repeat(20)).unwrap(),
            [0xaa; 20]
        );
    }
}
